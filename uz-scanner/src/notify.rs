//! Notification capability for resolved scans.

use async_trait::async_trait;

/// Receives the booking confirmation when a scan secures a seat.
///
/// The scanner only knows the opaque callback reference supplied at job
/// creation; routing it back to a chat, a webhook or a log is the
/// implementor's business.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver the provider session id for a resolved scan.
    async fn notify(&self, callback_ref: &str, session_id: &str);
}

/// Notifier that logs confirmations; the stand-in when no front-end is
/// wired up.
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, callback_ref: &str, session_id: &str) {
        tracing::info!(
            callback_ref,
            session_id,
            "ticket booked; proceed to checkout with this session id"
        );
    }
}
