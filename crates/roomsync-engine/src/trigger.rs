//! Re-subscribe signalling between the collector and the
//! subscription loop.
//!
//! A one-slot conflating mailbox: sends never block, a send into the
//! full slot is dropped, and at least one re-subscribe eventually
//! happens after any number of triggers. Exactly one waiting
//! subscription observes each trigger.

use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};

/// Create the trigger/listener pair.
#[must_use]
pub fn resubscribe_channel() -> (ResubscribeTrigger, ResubscribeListener) {
    let (tx, rx) = mpsc::channel(1);
    (
        ResubscribeTrigger { tx },
        ResubscribeListener {
            rx: Arc::new(Mutex::new(rx)),
        },
    )
}

/// Sending half, held by the collector.
#[derive(Clone)]
pub struct ResubscribeTrigger {
    tx: mpsc::Sender<()>,
}

impl ResubscribeTrigger {
    /// Signal that the watched-asset set grew. Non-blocking; when a
    /// trigger is already pending this is a no-op.
    pub fn fire(&self) {
        let _ = self.tx.try_send(());
    }
}

/// Receiving half, shared by the subscription tasks.
#[derive(Clone)]
pub struct ResubscribeListener {
    rx: Arc<Mutex<mpsc::Receiver<()>>>,
}

impl ResubscribeListener {
    /// Wait for the next trigger.
    pub async fn wait(&self) {
        let mut rx = self.rx.lock().await;
        if rx.recv().await.is_none() {
            // All triggers dropped; nothing will ever fire again.
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn duplicate_fires_conflate() {
        let (trigger, listener) = resubscribe_channel();
        trigger.fire();
        trigger.fire();
        trigger.fire();

        // One wait consumes the single pending trigger...
        tokio::time::timeout(Duration::from_millis(100), listener.wait())
            .await
            .expect("pending trigger");

        // ...and no duplicate is queued behind it.
        let second = tokio::time::timeout(Duration::from_millis(50), listener.wait()).await;
        assert!(second.is_err());
    }

    #[tokio::test]
    async fn fire_wakes_a_waiting_listener() {
        let (trigger, listener) = resubscribe_channel();
        let waiter = tokio::spawn(async move { listener.wait().await });
        tokio::time::sleep(Duration::from_millis(10)).await;
        trigger.fire();
        tokio::time::timeout(Duration::from_millis(100), waiter)
            .await
            .expect("woken")
            .unwrap();
    }
}
