//! WebSocket subscription to booking changes.

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::client::{BookingClient, CLIENT_REFERENCE};
use crate::error::{BookingError, BookingResult};
use crate::types::{GroupResponse, SubscriptionRequest};

impl BookingClient {
    /// Subscribe to booking changes for the given downstream asset
    /// ids.
    ///
    /// Opens the WebSocket, sends the subscription envelope and
    /// returns a bounded receiver of booking groups. The hand-off has
    /// capacity one, so a slow consumer exerts backpressure on the
    /// socket. Malformed messages are logged and skipped; the stream
    /// ends when `token` is cancelled, the server closes, or a read
    /// fails.
    pub async fn listen(
        &self,
        token: CancellationToken,
        asset_ids: Vec<i32>,
    ) -> BookingResult<mpsc::Receiver<GroupResponse>> {
        let ws_url = format!(
            "{}/sync/bookings-subscription",
            websocket_url(self.base_url())?
        );
        let (mut stream, _) = connect_async(ws_url.as_str()).await?;

        let envelope = serde_json::to_string(&SubscriptionRequest {
            asset_ids,
            client_reference: CLIENT_REFERENCE.to_string(),
        })?;
        stream.send(Message::Text(envelope.into())).await?;
        debug!(url = %ws_url, "booking subscription established");

        let (tx, rx) = mpsc::channel(1);
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    () = token.cancelled() => {
                        let _ = stream.close(None).await;
                        info!("booking subscription cancelled");
                        break;
                    }
                    message = stream.next() => match message {
                        Some(Ok(Message::Text(text))) => {
                            match serde_json::from_str::<GroupResponse>(text.as_str()) {
                                Ok(group) => {
                                    if tx.send(group).await.is_err() {
                                        // Consumer is gone; tear down.
                                        break;
                                    }
                                }
                                Err(e) => {
                                    error!(error = %e, "skipping malformed booking message");
                                }
                            }
                        }
                        Some(Ok(Message::Close(_))) | None => {
                            info!("booking subscription closed by server");
                            break;
                        }
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            error!(error = %e, "error reading from booking subscription");
                            break;
                        }
                    }
                }
            }
        });

        Ok(rx)
    }
}

/// Derive the WebSocket URL from the HTTP base URL.
fn websocket_url(base_url: &str) -> BookingResult<String> {
    base_url
        .strip_prefix("http")
        .map(|rest| format!("ws{rest}"))
        .ok_or_else(|| BookingError::InvalidUrl(base_url.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn websocket_url_rewrites_the_scheme() {
        assert_eq!(
            websocket_url("http://booking.test").unwrap(),
            "ws://booking.test"
        );
        assert_eq!(
            websocket_url("https://booking.test/api").unwrap(),
            "wss://booking.test/api"
        );
        assert!(websocket_url("ftp://booking.test").is_err());
    }
}
