//! HTTP client for the Booking service.

use std::time::Duration;

use reqwest::StatusCode;
use tracing::error;

use crate::error::{BookingError, BookingResult};
use crate::types::{GroupRequest, GroupResponse};

/// Value of the `clientReference` query parameter on mutating calls,
/// identifying changes made by this application so the Booking
/// service does not echo them back on the subscription.
pub const CLIENT_REFERENCE: &str = "roomsync";

/// Client for the Booking service REST surface.
#[derive(Debug, Clone)]
pub struct BookingClient {
    base_url: String,
    http: reqwest::Client,
}

impl BookingClient {
    /// Build a client with a 30 second request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::Http`] when the HTTP client cannot be
    /// constructed.
    pub fn new(base_url: impl Into<String>) -> BookingResult<Self> {
        Self::with_timeout(base_url, Duration::from_secs(30))
    }

    /// Build a client with an explicit request timeout.
    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> BookingResult<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.into(),
            http,
        })
    }

    pub(crate) fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Create or update a booking group. The response pairs with the
    /// request positionally: occurrence N of the response identifies
    /// occurrence N of the request.
    pub async fn book_group(&self, request: &GroupRequest) -> BookingResult<GroupResponse> {
        let response = self
            .http
            .post(format!("{}/bookings/group", self.base_url))
            .query(&[("clientReference", CLIENT_REFERENCE)])
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BookingError::UnexpectedStatus {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.json().await?)
    }

    /// Fetch one booking group.
    pub async fn get(&self, id: i32) -> BookingResult<GroupResponse> {
        let response = self
            .http
            .get(format!("{}/bookings/{id}", self.base_url))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BookingError::UnexpectedStatus {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.json().await?)
    }

    /// Cancel a booking group with a reason. An unknown booking (404)
    /// is tolerated; it is cancelled either way.
    pub async fn cancel(&self, id: i32, reason: &str) -> BookingResult<()> {
        let response = self
            .http
            .delete(format!("{}/bookings/{id}", self.base_url))
            .query(&[("clientReference", CLIENT_REFERENCE), ("reason", reason)])
            .send()
            .await?;

        match response.status() {
            StatusCode::NO_CONTENT => Ok(()),
            StatusCode::NOT_FOUND => {
                error!(booking = id, "booking not found while cancelling");
                Ok(())
            }
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(BookingError::UnexpectedStatus {
                    status: status.as_u16(),
                    body,
                })
            }
        }
    }
}
