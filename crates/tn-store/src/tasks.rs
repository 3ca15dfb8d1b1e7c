//! Typed task access and read-modify-write transactions
//!
//! The reminder blob maps task id to a task record plus `_`-prefixed host
//! bookkeeping entries. Reads skip bookkeeping keys and records that fail to
//! deserialize (the host format may be newer than this plugin); writes go
//! through [`ReminderStore::with_task`], an explicit load-mutate-save
//! transaction that never leaves a partial write behind.

use std::sync::Arc;

use chrono::Local;
use tn_core::{Priority, Task};

use crate::error::StoreError;
use crate::host::{is_record_key, HostStore, JsonMap};

/// Host-local datetime format used for task timestamps
const LOCAL_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Typed reads and transactions over the reminder/task blob
#[derive(Clone)]
pub struct ReminderStore {
    store: Arc<dyn HostStore>,
}

impl ReminderStore {
    /// Create a reminder store over the given host accessor
    #[must_use]
    pub fn new(store: Arc<dyn HostStore>) -> Self {
        Self { store }
    }

    /// All tasks currently in the blob
    ///
    /// Bookkeeping keys and undecodable records are skipped, never an error.
    pub async fn tasks(&self) -> Result<Vec<Task>, StoreError> {
        self.collect_tasks(false).await
    }

    /// All tasks, bypassing any host-side cache
    pub async fn reload(&self) -> Result<Vec<Task>, StoreError> {
        self.collect_tasks(true).await
    }

    async fn collect_tasks(&self, force_reload: bool) -> Result<Vec<Task>, StoreError> {
        let data = self.store.load_reminder_data(force_reload).await?;
        let mut tasks = Vec::with_capacity(data.len());
        for (key, value) in &data {
            if !is_record_key(key) {
                continue;
            }
            match serde_json::from_value::<Task>(value.clone()) {
                Ok(task) => tasks.push(task),
                Err(err) => {
                    tracing::debug!(key = %key, %err, "skipping undecodable task record");
                }
            }
        }
        Ok(tasks)
    }

    /// Apply a mutation to one task inside a load-mutate-save transaction
    ///
    /// Returns the task as written. If the id is absent nothing is saved and
    /// `TaskNotFound` is returned.
    pub async fn with_task<F>(&self, id: &str, mutate: F) -> Result<Task, StoreError>
    where
        F: FnOnce(&mut Task) + Send,
    {
        let mut data = self.store.load_reminder_data(false).await?;
        let value = data
            .get(id)
            .filter(|_| is_record_key(id))
            .ok_or_else(|| StoreError::TaskNotFound(id.to_string()))?;

        let mut task: Task = serde_json::from_value(value.clone())?;
        mutate(&mut task);
        data.insert(id.to_string(), serde_json::to_value(&task)?);
        self.store.save_reminder_data(&data).await?;
        Ok(task)
    }

    /// Mark a task completed, stamping the completion time
    pub async fn mark_completed(&self, id: &str) -> Result<Task, StoreError> {
        let completed_time = Local::now().format(LOCAL_DATETIME_FORMAT).to_string();
        self.with_task(id, move |task| {
            task.completed = true;
            task.completed_time = Some(completed_time);
        })
        .await
    }

    /// Set a task's priority
    pub async fn set_priority(&self, id: &str, priority: Priority) -> Result<Task, StoreError> {
        self.with_task(id, move |task| task.priority = priority).await
    }

    /// Number of task records assigned to the given person
    pub async fn assignee_count(&self, person_id: &str) -> Result<usize, StoreError> {
        let data = self.store.load_reminder_data(false).await?;
        Ok(count_assignees(&data, person_id))
    }
}

/// Typed reads over the project blob
///
/// Projects keep their host format; the plugin only needs reloads and the
/// assignee usage scan.
#[derive(Clone)]
pub struct ProjectStore {
    store: Arc<dyn HostStore>,
}

impl ProjectStore {
    /// Create a project store over the given host accessor
    #[must_use]
    pub fn new(store: Arc<dyn HostStore>) -> Self {
        Self { store }
    }

    /// Re-fetch the project blob, bypassing any host-side cache
    pub async fn reload(&self) -> Result<JsonMap, StoreError> {
        self.store.load_project_data(true).await
    }

    /// Number of project records assigned to the given person
    pub async fn assignee_count(&self, person_id: &str) -> Result<usize, StoreError> {
        let data = self.store.load_project_data(false).await?;
        Ok(count_assignees(&data, person_id))
    }
}

fn count_assignees(data: &JsonMap, person_id: &str) -> usize {
    data.iter()
        .filter(|(key, _)| is_record_key(key))
        .filter(|(_, value)| value.get("assigneeId").and_then(|v| v.as_str()) == Some(person_id))
        .count()
}
