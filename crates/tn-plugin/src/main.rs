//! Demo binary
//!
//! Runs the plugin against an in-memory host store seeded with sample data,
//! with the broadcast channel pointed at a real host endpoint. Prints a
//! one-line column summary every time the board publishes a new snapshot.

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tn_core::TracingNotifier;
use tn_plugin::TaskNotePlugin;
use tn_store::{HostStore, JsonMap, MemoryHostStore};
use tn_sync::{SseTransport, SyncConfig, DEFAULT_CHANNEL};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "tn-demo", about = "TaskNote plugin demo", version)]
struct Args {
    /// Host API base URL for the broadcast channel
    #[arg(long, default_value = "http://127.0.0.1:6806")]
    base_url: String,

    /// Broadcast channel name
    #[arg(long, default_value = DEFAULT_CHANNEL)]
    channel: String,

    /// Session id; generated when omitted
    #[arg(long)]
    sid: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();
    let mut config = SyncConfig::new().with_channel(args.channel);
    if let Some(sid) = args.sid {
        config = config.with_sid(sid);
    }

    let store = Arc::new(MemoryHostStore::new());
    seed(&store).await?;

    let plugin = TaskNotePlugin::new(
        Arc::clone(&store) as Arc<dyn HostStore>,
        Arc::new(SseTransport::new(args.base_url)),
        config,
        Arc::new(TracingNotifier),
    );
    plugin.directory().initialize().await?;
    plugin.directory().add_person("Alice").await?;
    plugin.directory().add_person("Bob").await?;
    plugin.activate().await?;

    let mut snapshots = plugin.board().subscribe();
    loop {
        tokio::select! {
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = snapshots.borrow_and_update().clone();
                let summary: Vec<String> = snapshot
                    .columns
                    .iter()
                    .map(|c| format!("{}: {}", c.name, c.tasks.len()))
                    .collect();
                println!("board: {}", summary.join(" | "));
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    plugin.deactivate().await;
    Ok(())
}

async fn seed(store: &Arc<MemoryHostStore>) -> Result<()> {
    let mut data = JsonMap::new();
    data.insert(
        "demo-1".to_string(),
        serde_json::json!({
            "id": "demo-1",
            "title": "Draft release notes",
            "priority": "high",
            "createdTime": "2026-08-20 09:00:00"
        }),
    );
    data.insert(
        "demo-2".to_string(),
        serde_json::json!({
            "id": "demo-2",
            "title": "Review onboarding doc",
            "note": "waiting on Bob",
            "priority": "medium",
            "createdTime": "2026-08-21 14:30:00"
        }),
    );
    store.save_reminder_data(&data).await?;
    Ok(())
}
