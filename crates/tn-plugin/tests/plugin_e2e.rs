//! End-to-end plugin tests over an in-memory host and a channel transport

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use tn_core::{Notifier, Topic};
use tn_plugin::TaskNotePlugin;
use tn_store::{HostStore, JsonMap, MemoryHostStore};
use tn_sync::{BroadcastTransport, SyncConfig, SyncError, BROADCAST_SOURCE};
use tokio::sync::{mpsc, Mutex};

struct SilentNotifier;

#[async_trait]
impl Notifier for SilentNotifier {
    async fn notify(&self, _message: &str) {}
}

/// Transport delivering payloads over a local channel instead of HTTP
struct ChannelTransport {
    rx: Mutex<Option<mpsc::Receiver<String>>>,
    published: Mutex<Vec<String>>,
}

impl ChannelTransport {
    fn new() -> (mpsc::Sender<String>, Arc<Self>) {
        let (tx, rx) = mpsc::channel(16);
        (
            tx,
            Arc::new(Self {
                rx: Mutex::new(Some(rx)),
                published: Mutex::new(Vec::new()),
            }),
        )
    }
}

#[async_trait]
impl BroadcastTransport for ChannelTransport {
    async fn subscribe(&self, _channel: &str) -> Result<mpsc::Receiver<String>, SyncError> {
        self.rx
            .lock()
            .await
            .take()
            .ok_or_else(|| SyncError::Transport("already subscribed".to_string()))
    }

    async fn publish(&self, _channel: &str, payload: String) -> Result<(), SyncError> {
        self.published.lock().await.push(payload);
        Ok(())
    }
}

async fn seeded_host() -> Arc<MemoryHostStore> {
    let host = Arc::new(MemoryHostStore::new());
    let mut data = JsonMap::new();
    data.insert(
        "t1".to_string(),
        serde_json::json!({"id": "t1", "title": "Pack for the trip"}),
    );
    host.save_reminder_data(&data).await.unwrap();
    host
}

fn plugin_over(
    host: Arc<MemoryHostStore>,
    transport: Arc<ChannelTransport>,
    sid: &str,
) -> TaskNotePlugin {
    TaskNotePlugin::new(
        host as Arc<dyn HostStore>,
        transport as Arc<dyn BroadcastTransport>,
        SyncConfig::new().with_sid(sid),
        Arc::new(SilentNotifier),
    )
}

#[tokio::test]
async fn remote_refresh_reloads_each_scope_once_in_order() {
    let host = seeded_host().await;
    let (tx, transport) = ChannelTransport::new();
    let plugin = plugin_over(Arc::clone(&host), transport, "local");
    plugin.activate().await.unwrap();
    let mut notifications = plugin.bus().subscribe();

    tx.send(r#"{"sid":"remote","type":"REFRESH_DATA","scope":["reminder","project"]}"#.to_string())
        .await
        .unwrap();

    let first = notifications.recv().await.unwrap();
    assert_eq!(first.topic, Topic::ReminderUpdated);
    assert!(first.is_from(BROADCAST_SOURCE));
    let second = notifications.recv().await.unwrap();
    assert_eq!(second.topic, Topic::ProjectUpdated);
    assert!(second.is_from(BROADCAST_SOURCE));

    // each scope was force-loaded exactly once
    assert_eq!(host.forced_reminder_loads(), 1);
    assert_eq!(host.forced_project_loads(), 1);

    plugin.deactivate().await;
}

#[tokio::test]
async fn own_messages_are_suppressed() {
    let host = seeded_host().await;
    let (tx, transport) = ChannelTransport::new();
    let plugin = plugin_over(Arc::clone(&host), transport, "local");
    plugin.activate().await.unwrap();

    tx.send(r#"{"sid":"local","type":"REFRESH_DATA","scope":["reminder"]}"#.to_string())
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(30)).await;

    assert_eq!(host.forced_reminder_loads(), 0);
    assert_eq!(host.forced_project_loads(), 0);

    plugin.deactivate().await;
}

#[tokio::test]
async fn remote_refresh_flows_through_to_the_board() {
    let host = seeded_host().await;
    let (tx, transport) = ChannelTransport::new();
    let plugin = plugin_over(Arc::clone(&host), transport, "local");
    plugin.activate().await.unwrap();
    let mut snapshots = plugin.board().subscribe();
    snapshots.mark_unchanged();

    // another client writes a task, then announces it
    let mut data = host.load_reminder_data(false).await.unwrap();
    data.insert(
        "t2".to_string(),
        serde_json::json!({"id": "t2", "title": "Book flights"}),
    );
    host.save_reminder_data(&data).await.unwrap();
    tx.send(r#"{"sid":"remote","type":"REFRESH_DATA","scope":["reminder"]}"#.to_string())
        .await
        .unwrap();

    tokio::time::timeout(Duration::from_secs(1), snapshots.changed())
        .await
        .unwrap()
        .unwrap();
    let snapshot = snapshots.borrow_and_update().clone();
    let mut titles: Vec<String> = snapshot.columns[0]
        .tasks
        .iter()
        .map(|n| n.task.title.clone())
        .collect();
    titles.sort();
    assert_eq!(titles, ["Book flights", "Pack for the trip"]);

    plugin.deactivate().await;
}

#[tokio::test]
async fn notification_bursts_converge_on_one_snapshot() {
    let host = seeded_host().await;
    let (tx, transport) = ChannelTransport::new();
    let plugin = plugin_over(Arc::clone(&host), transport, "local");
    plugin.activate().await.unwrap();

    for _ in 0..5 {
        tx.send(r#"{"sid":"remote","type":"REFRESH_DATA","scope":["reminder"]}"#.to_string())
            .await
            .unwrap();
    }
    tokio::time::sleep(Duration::from_millis(50)).await;

    // every message force-reloaded its scope, and the board settled on a
    // single consistent snapshot of the final state
    assert_eq!(host.forced_reminder_loads(), 5);
    let snapshot = plugin.board().snapshot();
    assert_eq!(snapshot.columns[0].tasks.len(), 1);

    plugin.deactivate().await;
}

#[tokio::test]
async fn board_mutations_are_announced_to_other_clients() {
    let host = seeded_host().await;
    let (_tx, transport) = ChannelTransport::new();
    let plugin = plugin_over(host, Arc::clone(&transport), "local");
    plugin.activate().await.unwrap();

    plugin.board().mark_completed("t1").await.unwrap();

    let published = transport.published.lock().await;
    assert_eq!(published.len(), 1);
    let message: serde_json::Value = serde_json::from_str(&published[0]).unwrap();
    assert_eq!(message["sid"], "local");
    assert_eq!(message["type"], "REFRESH_DATA");
    assert_eq!(message["scope"], serde_json::json!(["reminder"]));

    plugin.deactivate().await;
}

#[tokio::test]
async fn deactivate_is_idempotent_and_stops_handling() {
    let host = seeded_host().await;
    let (tx, transport) = ChannelTransport::new();
    let plugin = plugin_over(Arc::clone(&host), transport, "local");
    plugin.activate().await.unwrap();
    plugin.deactivate().await;
    plugin.deactivate().await;

    tx.send(r#"{"sid":"remote","type":"REFRESH_DATA","scope":["reminder"]}"#.to_string())
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert_eq!(host.forced_reminder_loads(), 0);
}
