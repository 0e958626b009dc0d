//! Broadcast notification sink

use tokio::sync::broadcast;

use dm_core::traits::NotificationSink;

/// Default capacity of the notification channel
pub const NOTIFICATION_CAPACITY: usize = 64;

/// Fans notifications out to every subscribed display
///
/// Messages sent while nobody is subscribed are dropped; slow subscribers
/// lose the oldest messages first.
#[derive(Debug, Clone)]
pub struct BroadcastNotifier {
    tx: broadcast::Sender<String>,
}

impl BroadcastNotifier {
    pub fn new() -> Self {
        Self::with_capacity(NOTIFICATION_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to future notifications
    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.tx.subscribe()
    }
}

impl Default for BroadcastNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationSink for BroadcastNotifier {
    fn notify(&self, message: &str) {
        // No receivers is fine: notifications are fire-and-forget
        let _ = self.tx.send(message.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscribers_receive_messages() {
        let notifier = BroadcastNotifier::new();
        let mut rx1 = notifier.subscribe();
        let mut rx2 = notifier.subscribe();

        notifier.notify("Desktop deleted!");

        assert_eq!(rx1.recv().await.unwrap(), "Desktop deleted!");
        assert_eq!(rx2.recv().await.unwrap(), "Desktop deleted!");
    }

    #[test]
    fn test_notify_without_subscribers() {
        let notifier = BroadcastNotifier::new();
        notifier.notify("nobody listening");
    }
}
