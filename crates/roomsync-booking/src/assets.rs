//! HTTP client for the Asset service.
//!
//! Registers discovered rooms downstream, pushes the bookable flag
//! through the data interface and posts user notifications.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::client::CLIENT_REFERENCE;
use crate::error::{BookingError, BookingResult};

/// A room to register downstream.
#[derive(Debug, Clone, Serialize)]
pub struct CreateAssetRequest {
    pub name: String,
    pub email: String,
    #[serde(rename = "projectID")]
    pub project_id: String,
    #[serde(rename = "globalAssetID")]
    pub global_asset_id: String,
}

#[derive(Debug, Deserialize)]
struct CreateAssetResponse {
    id: i32,
}

#[derive(Debug, Serialize)]
struct AssetData {
    bookable: bool,
    #[serde(rename = "clientReference")]
    client_reference: &'static str,
}

#[derive(Debug, Serialize)]
struct Notification<'a> {
    user: &'a str,
    #[serde(rename = "projectID")]
    project_id: &'a str,
    message: String,
}

/// Client for the Asset service.
#[derive(Debug, Clone)]
pub struct AssetClient {
    base_url: String,
    http: reqwest::Client,
}

impl AssetClient {
    /// Build a client with a 30 second request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::Http`] when the HTTP client cannot be
    /// constructed.
    pub fn new(base_url: impl Into<String>) -> BookingResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            base_url: base_url.into(),
            http,
        })
    }

    /// Register a room and return its downstream asset id.
    pub async fn create_asset(&self, request: &CreateAssetRequest) -> BookingResult<i32> {
        let response = self
            .http
            .post(format!("{}/assets", self.base_url))
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
        let created: CreateAssetResponse = response.json().await?;
        debug!(asset = created.id, email = %request.email, "registered room downstream");
        Ok(created.id)
    }

    /// Mark an asset bookable through the data-push interface.
    pub async fn mark_bookable(&self, asset_id: i32) -> BookingResult<()> {
        let response = self
            .http
            .put(format!("{}/assets/{asset_id}/data", self.base_url))
            .query(&[("clientReference", CLIENT_REFERENCE)])
            .json(&AssetData {
                bookable: true,
                client_reference: CLIENT_REFERENCE,
            })
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
        Ok(())
    }

    /// Notify a user that rooms were registered on their behalf.
    pub async fn notify_user(
        &self,
        user_id: &str,
        project_id: &str,
        created: usize,
    ) -> BookingResult<()> {
        let notification = Notification {
            user: user_id,
            project_id,
            message: format!(
                "The Exchange sync added {created} new room(s). They are now available for booking."
            ),
        };
        let response = self
            .http
            .post(format!("{}/notifications", self.base_url))
            .json(&notification)
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
        Ok(())
    }
}
