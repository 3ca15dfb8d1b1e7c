//! In-process notification bus
//!
//! Replaces UI-toolkit event dispatch with an explicit publish/subscribe
//! channel carrying typed topics. Every notification optionally carries a
//! source tag so a view that originated an edit can ignore the resulting
//! notification instead of reloading twice.

use tokio::sync::broadcast;

/// Typed notification topics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    /// Task/reminder data changed
    ReminderUpdated,
    /// Project data changed
    ProjectUpdated,
    /// The person directory changed
    PersonUpdated,
}

/// A data-updated notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// What changed
    pub topic: Topic,
    /// Origin tag for self-suppression; `None` for untagged updates
    pub source: Option<String>,
}

impl Notification {
    /// Untagged notification
    #[inline]
    #[must_use]
    pub fn new(topic: Topic) -> Self {
        Self {
            topic,
            source: None,
        }
    }

    /// Notification tagged with its origin
    #[inline]
    #[must_use]
    pub fn with_source(topic: Topic, source: impl Into<String>) -> Self {
        Self {
            topic,
            source: Some(source.into()),
        }
    }

    /// Whether this notification originated from the given tag
    #[inline]
    #[must_use]
    pub fn is_from(&self, tag: &str) -> bool {
        self.source.as_deref() == Some(tag)
    }
}

/// Publish/subscribe bus for data-updated notifications
///
/// Backed by a [`tokio::sync::broadcast`] channel. Receivers that lag simply
/// skip missed notifications; since every consumer performs a full re-fetch
/// of current state, a lost notification is subsumed by the next one.
#[derive(Debug, Clone)]
pub struct NotificationBus {
    tx: broadcast::Sender<Notification>,
}

impl NotificationBus {
    /// Create a bus with the given channel capacity
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Publish a notification to all current subscribers
    ///
    /// Returns the number of subscribers the notification reached. Publishing
    /// with no subscribers is not an error.
    pub fn publish(&self, notification: Notification) -> usize {
        tracing::debug!(?notification, "publishing notification");
        self.tx.send(notification).unwrap_or(0)
    }

    /// Subscribe to all future notifications
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.tx.subscribe()
    }

    /// Number of live subscribers
    #[inline]
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for NotificationBus {
    fn default() -> Self {
        Self::new(64)
    }
}
