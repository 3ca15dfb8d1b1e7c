//! The kanban reconciliation view-model
//!
//! [`KanbanBoard`] owns the filter state and rebuilds the whole board from
//! current storage on every pass: load, drop completed, filter, search,
//! group, sort, publish. Passes run under a [`ReloadGuard`], so notification
//! bursts collapse instead of queuing. The rendered output is an immutable
//! [`BoardSnapshot`] on a watch channel; consumers never see intermediate
//! state.

use std::sync::{Arc, Mutex};

use serde::Serialize;
use tn_core::{Notification, NotificationBus, Notifier, Priority, Scope, Task, Topic};
use tn_store::{HostStore, PersonDirectory, ReminderStore};
use tn_sync::{RefreshPublisher, ReloadGuard};
use tokio::sync::{broadcast, watch, Mutex as AsyncMutex};
use tokio::task::JoinHandle;

use crate::columns::{group_by_assignee, Column};
use crate::error::BoardError;
use crate::filter::{filter_by_categories, filter_by_search};
use crate::sort::{sort_columns, SortOrder};

/// Source tag for notifications originating from board mutations
pub const BOARD_SOURCE: &str = "person-kanban";

/// One fully computed board state
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BoardSnapshot {
    /// Columns in display order
    pub columns: Vec<Column>,
}

#[derive(Debug, Default)]
struct FilterState {
    selected_categories: Vec<String>,
    search_keyword: String,
    sort_order: SortOrder,
    done_sort_order: SortOrder,
}

/// The assignee kanban view-model
pub struct KanbanBoard {
    tasks: ReminderStore,
    store: Arc<dyn HostStore>,
    directory: Arc<PersonDirectory>,
    bus: NotificationBus,
    guard: Arc<ReloadGuard>,
    notifier: Arc<dyn Notifier>,
    publisher: Option<Arc<dyn RefreshPublisher>>,
    filters: Mutex<FilterState>,
    snapshot_tx: watch::Sender<BoardSnapshot>,
    listener: AsyncMutex<Option<JoinHandle<()>>>,
}

impl KanbanBoard {
    /// Create a detached board over the given services
    #[must_use]
    pub fn new(
        store: Arc<dyn HostStore>,
        directory: Arc<PersonDirectory>,
        bus: NotificationBus,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let (snapshot_tx, _rx) = watch::channel(BoardSnapshot::default());
        Self {
            tasks: ReminderStore::new(Arc::clone(&store)),
            store,
            directory,
            bus,
            guard: Arc::new(ReloadGuard::new(Arc::clone(&notifier))),
            notifier,
            publisher: None,
            filters: Mutex::new(FilterState::default()),
            snapshot_tx,
            listener: AsyncMutex::new(None),
        }
    }

    /// Announce local mutations through the given publisher (builder style)
    #[must_use]
    pub fn with_publisher(mut self, publisher: Arc<dyn RefreshPublisher>) -> Self {
        self.publisher = Some(publisher);
        self
    }

    /// Current snapshot
    #[must_use]
    pub fn snapshot(&self) -> BoardSnapshot {
        self.snapshot_tx.borrow().clone()
    }

    /// Watch future snapshots
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<BoardSnapshot> {
        self.snapshot_tx.subscribe()
    }

    /// Passes run to completion so far
    #[inline]
    #[must_use]
    pub fn completed_passes(&self) -> u64 {
        self.guard.completed_passes()
    }

    fn lock_filters(&self) -> std::sync::MutexGuard<'_, FilterState> {
        self.filters
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Start reacting to data-updated notifications
    ///
    /// Reminder and person notifications trigger a guarded refresh unless
    /// tagged with [`BOARD_SOURCE`]; those reloads already ran as part of the
    /// originating mutation. Re-attaching replaces the previous listener.
    pub async fn attach(self: &Arc<Self>) {
        let mut rx = self.bus.subscribe();
        let board = Arc::clone(self);
        let handle = tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(notification) => {
                        if board.wants(&notification) {
                            board.refresh().await;
                        }
                    }
                    // missed notifications are subsumed by a fresh pass
                    Err(broadcast::error::RecvError::Lagged(_)) => board.refresh().await,
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            tracing::debug!("board listener finished");
        });

        if let Some(previous) = self.listener.lock().await.replace(handle) {
            previous.abort();
        }
        self.refresh().await;
    }

    fn wants(&self, notification: &Notification) -> bool {
        matches!(
            notification.topic,
            Topic::ReminderUpdated | Topic::PersonUpdated
        ) && !notification.is_from(BOARD_SOURCE)
    }

    /// Stop reacting to notifications; idempotent
    pub async fn detach(&self) {
        if let Some(handle) = self.listener.lock().await.take() {
            handle.abort();
            tracing::debug!("board detached");
        }
    }

    /// Request a reconciliation pass through the guard
    pub async fn refresh(&self) {
        self.guard.request(|| self.reload_once()).await;
    }

    async fn reload_once(&self) -> Result<(), BoardError> {
        let mut tasks = self.tasks.tasks().await?;
        tasks.retain(|task| !task.completed);

        let (selected, keyword, order, done_order) = {
            let filters = self.lock_filters();
            (
                filters.selected_categories.clone(),
                filters.search_keyword.clone(),
                filters.sort_order,
                filters.done_sort_order,
            )
        };

        let tasks = filter_by_search(filter_by_categories(tasks, &selected), &keyword);
        let persons = self.directory.persons().await;
        let mut columns = group_by_assignee(tasks, &persons);
        sort_columns(&mut columns, order, done_order);

        tracing::debug!(columns = columns.len(), "board snapshot rebuilt");
        self.snapshot_tx.send_replace(BoardSnapshot { columns });
        Ok(())
    }

    /// Set the search keyword and refresh
    pub async fn set_search_keyword(&self, keyword: impl Into<String>) {
        self.lock_filters().search_keyword = keyword.into();
        self.refresh().await;
    }

    /// Set the category selection and refresh
    pub async fn set_selected_categories(&self, categories: Vec<String>) {
        self.lock_filters().selected_categories = categories;
        self.refresh().await;
    }

    /// Set the column sort direction and refresh
    pub async fn set_sort_order(&self, order: SortOrder) {
        self.lock_filters().sort_order = order;
        self.refresh().await;
    }

    /// Set the unassigned-column sort direction and refresh
    pub async fn set_done_sort_order(&self, order: SortOrder) {
        self.lock_filters().done_sort_order = order;
        self.refresh().await;
    }

    /// Mark a task completed from the board
    ///
    /// The write goes through the store transaction, the change is announced
    /// locally with the [`BOARD_SOURCE`] tag and remotely via the refresh
    /// publisher, and the board reloads itself once.
    pub async fn mark_completed(&self, id: &str) -> Result<Task, BoardError> {
        let task = self.tasks.mark_completed(id).await?;
        self.announce_mutation().await;
        Ok(task)
    }

    /// Change a task's priority from the board
    pub async fn set_priority(&self, id: &str, priority: Priority) -> Result<Task, BoardError> {
        let task = self.tasks.set_priority(id, priority).await?;
        self.announce_mutation().await;
        Ok(task)
    }

    async fn announce_mutation(&self) {
        self.bus
            .publish(Notification::with_source(Topic::ReminderUpdated, BOARD_SOURCE));
        if let Some(publisher) = &self.publisher {
            publisher.publish_refresh(&[Scope::Reminder]).await;
        }
        self.refresh().await;
    }

    /// Jump to the note block a task is bound to
    ///
    /// Tasks without a bound block notify the user instead of failing.
    pub async fn open_task(&self, task: &Task) -> Result<(), BoardError> {
        match task.block_id.as_deref().filter(|id| !id.is_empty()) {
            Some(block_id) => {
                self.store.open_block(block_id).await?;
                Ok(())
            }
            None => {
                self.notifier
                    .notify("This task is not linked to a note block")
                    .await;
                Ok(())
            }
        }
    }
}
