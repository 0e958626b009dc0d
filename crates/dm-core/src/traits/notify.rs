//! Notification sink capability

/// Receives human-readable status strings for display
///
/// Fire-and-forget: there is no acknowledgement and delivery failures are
/// the sink's concern.
pub trait NotificationSink: Send + Sync {
    /// Publish a message
    fn notify(&self, message: &str);
}
