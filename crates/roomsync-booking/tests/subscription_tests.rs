//! Tests for the booking subscription stream against a real
//! WebSocket server.

use futures_util::{SinkExt, StreamExt};
use roomsync_booking::BookingClient;
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;

/// Minimal Booking-service WebSocket: accepts one connection, checks
/// the subscription envelope, then sends the given messages.
async fn spawn_ws_server(messages: Vec<String>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let (socket, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(socket).await.unwrap();

        // First frame is the subscription envelope.
        let envelope = ws.next().await.unwrap().unwrap();
        let text = envelope.into_text().unwrap();
        let value: serde_json::Value = serde_json::from_str(text.as_str()).unwrap();
        assert_eq!(value["clientReference"], "roomsync");
        assert!(value["assetIDs"].is_array());

        for message in messages {
            if ws.send(Message::Text(message.into())).await.is_err() {
                return;
            }
        }
        // Keep the connection open until the client goes away.
        while let Some(Ok(_)) = ws.next().await {}
    });

    format!("http://{addr}")
}

#[tokio::test]
async fn subscription_yields_parsed_groups_and_skips_garbage() {
    let valid = serde_json::json!({
        "id": 9,
        "bookings": [{
            "id": 12,
            "assetIds": [7],
            "organizerID": "alice@x.test",
            "start": "2024-01-02T10:00:00Z",
            "end": "2024-01-02T10:30:00Z",
            "cancelled": false
        }]
    })
    .to_string();
    let base_url = spawn_ws_server(vec!["{not json".to_string(), valid]).await;

    let client = BookingClient::new(base_url).unwrap();
    let token = CancellationToken::new();
    let mut rx = client.listen(token.clone(), vec![7]).await.unwrap();

    // The malformed message is skipped; the valid one arrives.
    let group = rx.recv().await.expect("one group");
    assert_eq!(group.id, 9);
    assert_eq!(group.bookings[0].id, 12);

    token.cancel();
    assert!(rx.recv().await.is_none());
}

#[tokio::test]
async fn cancellation_terminates_the_stream() {
    let base_url = spawn_ws_server(Vec::new()).await;

    let client = BookingClient::new(base_url).unwrap();
    let token = CancellationToken::new();
    let mut rx = client.listen(token.clone(), vec![1, 2]).await.unwrap();

    token.cancel();
    assert!(rx.recv().await.is_none());
}
