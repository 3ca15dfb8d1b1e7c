//! TaskNote Plugin
//!
//! The activation facade: wires the notification bus, person directory,
//! broadcast client, and kanban board together over an injected host store
//! and transport, and manages their shared lifecycle.
//!
//! ```no_run
//! use std::sync::Arc;
//! use tn_core::TracingNotifier;
//! use tn_plugin::TaskNotePlugin;
//! use tn_store::MemoryHostStore;
//! use tn_sync::{SseTransport, SyncConfig};
//!
//! # async fn run() -> Result<(), tn_plugin::PluginError> {
//! let plugin = TaskNotePlugin::new(
//!     Arc::new(MemoryHostStore::new()),
//!     Arc::new(SseTransport::new("http://127.0.0.1:6806")),
//!     SyncConfig::new(),
//!     Arc::new(TracingNotifier),
//! );
//! plugin.activate().await?;
//! // ... host keeps the plugin alive ...
//! plugin.deactivate().await;
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

use std::sync::Arc;

use tn_board::KanbanBoard;
use tn_core::{NotificationBus, Notifier};
use tn_store::{HostStore, PersonDirectory, StoreError};
use tn_sync::{BroadcastClient, BroadcastTransport, RefreshPublisher, SyncConfig};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Plugin lifecycle errors
#[derive(Debug, thiserror::Error)]
pub enum PluginError {
    /// Host storage failed during activation
    #[error("activation failed: {0}")]
    Activation(#[from] StoreError),
}

/// The assembled plugin
///
/// Construction wires the services; nothing touches storage or the network
/// until [`TaskNotePlugin::activate`]. All services are reference-counted,
/// so handles returned by the accessors stay valid across deactivation.
pub struct TaskNotePlugin {
    bus: NotificationBus,
    directory: Arc<PersonDirectory>,
    client: Arc<BroadcastClient>,
    board: Arc<KanbanBoard>,
}

impl TaskNotePlugin {
    /// Wire the plugin over the given host store and broadcast transport
    #[must_use]
    pub fn new(
        store: Arc<dyn HostStore>,
        transport: Arc<dyn BroadcastTransport>,
        config: SyncConfig,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let bus = NotificationBus::default();
        let directory = Arc::new(PersonDirectory::new(Arc::clone(&store), bus.clone()));
        let client = Arc::new(BroadcastClient::new(
            config,
            transport,
            Arc::clone(&store),
            bus.clone(),
        ));
        let board = Arc::new(
            KanbanBoard::new(
                store,
                Arc::clone(&directory),
                bus.clone(),
                notifier,
            )
            .with_publisher(Arc::clone(&client) as Arc<dyn RefreshPublisher>),
        );
        Self {
            bus,
            directory,
            client,
            board,
        }
    }

    /// Bring the plugin up
    ///
    /// Loads the person directory, opens the broadcast subscription (a
    /// connection failure degrades to local-only mode), and attaches the
    /// board, which runs its first reconciliation pass. Activating twice
    /// replaces the previous listeners.
    pub async fn activate(&self) -> Result<(), PluginError> {
        self.directory.initialize().await?;
        self.client.connect().await;
        self.board.attach().await;
        tracing::info!(sid = %self.client.sid(), "plugin activated");
        Ok(())
    }

    /// Tear the plugin down; idempotent
    pub async fn deactivate(&self) {
        self.client.disconnect().await;
        self.board.detach().await;
        tracing::info!("plugin deactivated");
    }

    /// The shared notification bus
    #[inline]
    #[must_use]
    pub fn bus(&self) -> &NotificationBus {
        &self.bus
    }

    /// The person directory service
    #[inline]
    #[must_use]
    pub fn directory(&self) -> &Arc<PersonDirectory> {
        &self.directory
    }

    /// The broadcast client
    #[inline]
    #[must_use]
    pub fn client(&self) -> &Arc<BroadcastClient> {
        &self.client
    }

    /// The kanban board view-model
    #[inline]
    #[must_use]
    pub fn board(&self) -> &Arc<KanbanBoard> {
        &self.board
    }
}
