//! User-facing notification seam
//!
//! The host provides toast-style notifications; this trait is the only part
//! of that surface the sync machinery needs.

use async_trait::async_trait;

/// Transient user-visible notification sink (the host's toast primitive)
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Show a transient message to the user
    async fn notify(&self, message: &str);
}

/// Fallback notifier that routes messages to the log
///
/// Used when no host UI is attached (headless tests, the demo binary).
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

#[async_trait]
impl Notifier for TracingNotifier {
    async fn notify(&self, message: &str) {
        tracing::warn!(message, "user notification");
    }
}
