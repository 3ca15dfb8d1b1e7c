//! Broadcast channel client
//!
//! Subscribes to the refresh-broadcast channel and reconciles accepted
//! messages: every recognized scope is force-reloaded through the host store
//! and announced on the notification bus with the `broadcast` source tag, so
//! views that originated the edit locally can tell the two apart.
//!
//! Everything here is best-effort. A client that cannot connect keeps
//! operating in local-only mode, and a failed publish never rolls back the
//! local mutation that triggered it.

use std::sync::Arc;

use async_trait::async_trait;
use tn_core::{BroadcastMessage, Notification, NotificationBus, Scope};
use tn_store::HostStore;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::transport::BroadcastTransport;

/// Source tag carried by notifications that were triggered remotely
pub const BROADCAST_SOURCE: &str = "broadcast";

/// Default broadcast channel name
pub const DEFAULT_CHANNEL: &str = "task-note-sync";

/// Broadcast client configuration
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Channel name shared by all clients of the same backing store
    pub channel: String,
    /// This client's opaque session id, generated once per client lifetime
    pub sid: String,
}

impl SyncConfig {
    /// Default channel with a fresh session id
    #[must_use]
    pub fn new() -> Self {
        Self {
            channel: DEFAULT_CHANNEL.to_string(),
            sid: Uuid::new_v4().to_string(),
        }
    }

    /// Use a specific channel name
    #[inline]
    #[must_use]
    pub fn with_channel(mut self, channel: impl Into<String>) -> Self {
        self.channel = channel.into();
        self
    }

    /// Use a specific session id (tests, host-assigned ids)
    #[inline]
    #[must_use]
    pub fn with_sid(mut self, sid: impl Into<String>) -> Self {
        self.sid = sid.into();
        self
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Seam for announcing local mutations to other clients
///
/// Consumers that mutate data hold this instead of the whole client; a
/// deployment without a broadcast channel simply injects nothing.
#[async_trait]
pub trait RefreshPublisher: Send + Sync {
    /// Fire-and-forget announcement that the given scopes changed
    async fn publish_refresh(&self, scopes: &[Scope]);
}

/// Client side of the refresh-broadcast channel
pub struct BroadcastClient {
    config: SyncConfig,
    transport: Arc<dyn BroadcastTransport>,
    store: Arc<dyn HostStore>,
    bus: NotificationBus,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl BroadcastClient {
    /// Create a disconnected client
    #[must_use]
    pub fn new(
        config: SyncConfig,
        transport: Arc<dyn BroadcastTransport>,
        store: Arc<dyn HostStore>,
        bus: NotificationBus,
    ) -> Self {
        Self {
            config,
            transport,
            store,
            bus,
            listener: Mutex::new(None),
        }
    }

    /// This client's session id
    #[inline]
    #[must_use]
    pub fn sid(&self) -> &str {
        &self.config.sid
    }

    /// Open the channel subscription and start handling messages
    ///
    /// A connection failure is logged and swallowed: the client continues in
    /// local-only mode and never propagates the failure to the host.
    /// Reconnecting replaces any previous listener.
    pub async fn connect(self: &Arc<Self>) {
        let mut rx = match self.transport.subscribe(&self.config.channel).await {
            Ok(rx) => rx,
            Err(err) => {
                tracing::warn!(
                    %err,
                    channel = %self.config.channel,
                    "broadcast subscribe failed, continuing in local-only mode"
                );
                return;
            }
        };

        let client = Arc::clone(self);
        let handle = tokio::spawn(async move {
            while let Some(payload) = rx.recv().await {
                client.handle_payload(&payload).await;
            }
            tracing::debug!("broadcast listener finished");
        });

        if let Some(previous) = self.listener.lock().await.replace(handle) {
            previous.abort();
        }
    }

    /// Release the subscription; idempotent and safe to call repeatedly
    pub async fn disconnect(&self) {
        if let Some(handle) = self.listener.lock().await.take() {
            handle.abort();
            tracing::debug!(channel = %self.config.channel, "broadcast client disconnected");
        }
    }

    /// Handle one raw event payload
    ///
    /// Malformed JSON, self-originated messages, and non-refresh types are
    /// discarded without error. For each distinct recognized scope, in wire
    /// order, the scope's data is force-reloaded and the matching topic is
    /// published with the [`BROADCAST_SOURCE`] tag. A reload failure for one
    /// scope is logged and does not abort the remaining scopes.
    ///
    /// Returns the number of scopes that were reloaded and announced.
    pub async fn handle_payload(&self, payload: &str) -> usize {
        let message: BroadcastMessage = match serde_json::from_str(payload) {
            Ok(message) => message,
            Err(err) => {
                tracing::debug!(%err, "discarding malformed broadcast payload");
                return 0;
            }
        };

        if message.sid == self.config.sid {
            tracing::trace!("ignoring self-originated broadcast");
            return 0;
        }
        if !message.is_refresh() {
            tracing::trace!(kind = %message.kind, "ignoring broadcast of unknown type");
            return 0;
        }

        let mut handled = 0;
        for scope in message.scopes() {
            let reload = match scope {
                Scope::Reminder => self.store.load_reminder_data(true).await.map(|_| ()),
                Scope::Project => self.store.load_project_data(true).await.map(|_| ()),
            };
            match reload {
                Ok(()) => {
                    self.bus
                        .publish(Notification::with_source(scope.topic(), BROADCAST_SOURCE));
                    handled += 1;
                }
                Err(err) => {
                    tracing::warn!(%err, scope = scope.as_str(), "broadcast-triggered reload failed");
                }
            }
        }
        handled
    }
}

#[async_trait]
impl RefreshPublisher for BroadcastClient {
    async fn publish_refresh(&self, scopes: &[Scope]) {
        let message = BroadcastMessage::refresh(&self.config.sid, scopes);
        let payload = match serde_json::to_string(&message) {
            Ok(payload) => payload,
            Err(err) => {
                tracing::warn!(%err, "failed to encode refresh broadcast");
                return;
            }
        };
        if let Err(err) = self.transport.publish(&self.config.channel, payload).await {
            // fire-and-forget: the local mutation already succeeded
            tracing::warn!(%err, "refresh broadcast publish failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use mockall::mock;
    use mockall::predicate::eq;
    use tn_core::{Person, Topic};
    use tn_store::{JsonMap, MemoryHostStore, StoreError};
    use tokio::sync::mpsc;

    mock! {
        Store {}

        #[async_trait]
        impl HostStore for Store {
            async fn load_reminder_data(&self, force_reload: bool) -> Result<JsonMap, StoreError>;
            async fn save_reminder_data(&self, data: &JsonMap) -> Result<(), StoreError>;
            async fn load_project_data(&self, force_reload: bool) -> Result<JsonMap, StoreError>;
            async fn save_project_data(&self, data: &JsonMap) -> Result<(), StoreError>;
            async fn load_persons_data(&self) -> Result<Option<Vec<Person>>, StoreError>;
            async fn save_persons_data(&self, persons: &[Person]) -> Result<(), StoreError>;
            async fn open_block(&self, id: &str) -> Result<(), StoreError>;
        }
    }

    /// Transport test double delivering over a plain channel
    struct ChannelTransport {
        rx: Mutex<Option<mpsc::Receiver<String>>>,
        published: Mutex<Vec<(String, String)>>,
    }

    impl ChannelTransport {
        fn new() -> (mpsc::Sender<String>, Self) {
            let (tx, rx) = mpsc::channel(16);
            (
                tx,
                Self {
                    rx: Mutex::new(Some(rx)),
                    published: Mutex::new(Vec::new()),
                },
            )
        }
    }

    #[async_trait]
    impl BroadcastTransport for ChannelTransport {
        async fn subscribe(
            &self,
            _channel: &str,
        ) -> Result<mpsc::Receiver<String>, crate::SyncError> {
            self.rx
                .lock()
                .await
                .take()
                .ok_or_else(|| crate::SyncError::Transport("already subscribed".to_string()))
        }

        async fn publish(&self, channel: &str, payload: String) -> Result<(), crate::SyncError> {
            self.published
                .lock()
                .await
                .push((channel.to_string(), payload));
            Ok(())
        }
    }

    fn client_with(store: Arc<dyn HostStore>) -> (Arc<BroadcastClient>, NotificationBus) {
        let (_tx, transport) = ChannelTransport::new();
        let bus = NotificationBus::default();
        let client = Arc::new(BroadcastClient::new(
            SyncConfig::new().with_sid("client-b"),
            Arc::new(transport),
            store,
            bus.clone(),
        ));
        (client, bus)
    }

    #[tokio::test]
    async fn self_originated_messages_trigger_nothing() {
        let mut store = MockStore::new();
        store.expect_load_reminder_data().times(0);
        store.expect_load_project_data().times(0);
        let (client, _bus) = client_with(Arc::new(store));

        let payload = r#"{"sid":"client-b","type":"REFRESH_DATA","scope":["reminder"]}"#;
        assert_eq!(client.handle_payload(payload).await, 0);
    }

    #[tokio::test]
    async fn unknown_types_trigger_nothing() {
        let mut store = MockStore::new();
        store.expect_load_reminder_data().times(0);
        let (client, _bus) = client_with(Arc::new(store));

        let payload = r#"{"sid":"client-a","type":"PING","scope":["reminder"]}"#;
        assert_eq!(client.handle_payload(payload).await, 0);
    }

    #[tokio::test]
    async fn malformed_payloads_are_discarded_silently() {
        let mut store = MockStore::new();
        store.expect_load_reminder_data().times(0);
        let (client, _bus) = client_with(Arc::new(store));

        assert_eq!(client.handle_payload("{not json").await, 0);
        assert_eq!(client.handle_payload("").await, 0);
        assert_eq!(client.handle_payload(r#"{"type":"REFRESH_DATA"}"#).await, 0);
    }

    #[tokio::test]
    async fn reminder_scope_forces_one_reload_and_one_notification() {
        let mut store = MockStore::new();
        store
            .expect_load_reminder_data()
            .with(eq(true))
            .times(1)
            .returning(|_| Ok(JsonMap::new()));
        let (client, bus) = client_with(Arc::new(store));
        let mut rx = bus.subscribe();

        let payload = r#"{"sid":"client-a","type":"REFRESH_DATA","scope":["reminder"]}"#;
        assert_eq!(client.handle_payload(payload).await, 1);

        let seen = rx.recv().await.unwrap();
        assert_eq!(seen.topic, Topic::ReminderUpdated);
        assert!(seen.is_from(BROADCAST_SOURCE));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn duplicate_and_unknown_scopes_collapse() {
        let mut store = MockStore::new();
        store
            .expect_load_reminder_data()
            .with(eq(true))
            .times(1)
            .returning(|_| Ok(JsonMap::new()));
        store
            .expect_load_project_data()
            .with(eq(true))
            .times(1)
            .returning(|_| Ok(JsonMap::new()));
        let (client, bus) = client_with(Arc::new(store));
        let mut rx = bus.subscribe();

        let payload = r#"{"sid":"client-a","type":"REFRESH_DATA","scope":["reminder","weather","reminder","project"]}"#;
        assert_eq!(client.handle_payload(payload).await, 2);

        assert_eq!(rx.recv().await.unwrap().topic, Topic::ReminderUpdated);
        assert_eq!(rx.recv().await.unwrap().topic, Topic::ProjectUpdated);
    }

    #[tokio::test]
    async fn reload_failure_skips_notification_but_not_later_scopes() {
        let mut store = MockStore::new();
        store
            .expect_load_reminder_data()
            .with(eq(true))
            .times(1)
            .returning(|_| Err(StoreError::Unavailable("offline".to_string())));
        store
            .expect_load_project_data()
            .with(eq(true))
            .times(1)
            .returning(|_| Ok(JsonMap::new()));
        let (client, bus) = client_with(Arc::new(store));
        let mut rx = bus.subscribe();

        let payload = r#"{"sid":"client-a","type":"REFRESH_DATA","scope":["reminder","project"]}"#;
        assert_eq!(client.handle_payload(payload).await, 1);

        let seen = rx.recv().await.unwrap();
        assert_eq!(seen.topic, Topic::ProjectUpdated);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn connected_client_processes_channel_messages() {
        let (tx, transport) = ChannelTransport::new();
        let store = Arc::new(MemoryHostStore::new());
        let bus = NotificationBus::default();
        let client = Arc::new(BroadcastClient::new(
            SyncConfig::new().with_sid("client-b"),
            Arc::new(transport),
            store.clone() as Arc<dyn HostStore>,
            bus.clone(),
        ));
        let mut rx = bus.subscribe();

        client.connect().await;
        tx.send(r#"{"sid":"client-a","type":"REFRESH_DATA","scope":["reminder"]}"#.to_string())
            .await
            .unwrap();

        let seen = rx.recv().await.unwrap();
        assert_eq!(seen.topic, Topic::ReminderUpdated);
        assert_eq!(store.forced_reminder_loads(), 1);

        client.disconnect().await;
        client.disconnect().await; // idempotent
    }

    #[tokio::test]
    async fn publish_refresh_sends_wire_message() {
        let (_tx, transport) = ChannelTransport::new();
        let transport = Arc::new(transport);
        let bus = NotificationBus::default();
        let client = BroadcastClient::new(
            SyncConfig::new().with_sid("client-b").with_channel("c1"),
            transport.clone(),
            Arc::new(MemoryHostStore::new()),
            bus,
        );

        client.publish_refresh(&[Scope::Reminder, Scope::Project]).await;

        let published = transport.published.lock().await;
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].0, "c1");
        let message: BroadcastMessage = serde_json::from_str(&published[0].1).unwrap();
        assert_eq!(message, BroadcastMessage::refresh("client-b", &[Scope::Reminder, Scope::Project]));
    }

    #[tokio::test]
    async fn failed_subscribe_leaves_client_in_local_only_mode() {
        let (_tx, transport) = ChannelTransport::new();
        let transport = Arc::new(transport);
        let store = Arc::new(MemoryHostStore::new()) as Arc<dyn HostStore>;
        let bus = NotificationBus::default();
        let client = Arc::new(BroadcastClient::new(
            SyncConfig::new(),
            transport.clone(),
            store,
            bus,
        ));

        client.connect().await; // consumes the one receiver
        client.connect().await; // second subscribe fails, must not panic
        client.disconnect().await;
    }
}
