//! Host storage seam
//!
//! The note-taking host persists plugin data as opaque JSON blobs and owns
//! their format. Keys beginning with `_` are host bookkeeping entries and are
//! skipped by every typed read.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use tn_core::Person;
use tokio::sync::RwLock;

use crate::error::StoreError;

/// A host-persisted JSON object, keyed by record id
pub type JsonMap = serde_json::Map<String, serde_json::Value>;

/// Accessors the host provides to the plugin
///
/// `force_reload` asks the host to bypass its own cache and re-read the
/// backing file; implementations without a cache may ignore it.
#[async_trait]
pub trait HostStore: Send + Sync {
    /// Load the reminder/task blob
    async fn load_reminder_data(&self, force_reload: bool) -> Result<JsonMap, StoreError>;

    /// Replace the reminder/task blob
    async fn save_reminder_data(&self, data: &JsonMap) -> Result<(), StoreError>;

    /// Load the project blob
    async fn load_project_data(&self, force_reload: bool) -> Result<JsonMap, StoreError>;

    /// Replace the project blob
    async fn save_project_data(&self, data: &JsonMap) -> Result<(), StoreError>;

    /// Load the person directory; `None` when it has never been written
    async fn load_persons_data(&self) -> Result<Option<Vec<Person>>, StoreError>;

    /// Replace the person directory
    async fn save_persons_data(&self, persons: &[Person]) -> Result<(), StoreError>;

    /// Navigate the host UI to a content block
    async fn open_block(&self, id: &str) -> Result<(), StoreError>;
}

const REMINDER_DOMAIN: &str = "reminder";
const PROJECT_DOMAIN: &str = "project";

/// In-memory [`HostStore`] implementation
///
/// Serves tests, the demo binary, and local-only operation when no host
/// adapter is wired in. `force_reload` is a no-op (there is no cache layer),
/// but forced loads are counted separately so tests can assert how many
/// broadcast-triggered reloads actually happened.
#[derive(Debug, Default)]
pub struct MemoryHostStore {
    blobs: DashMap<String, JsonMap>,
    persons: RwLock<Option<Vec<Person>>>,
    opened_blocks: RwLock<Vec<String>>,
    forced_reminder_loads: AtomicUsize,
    forced_project_loads: AtomicUsize,
}

impl MemoryHostStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of forced reminder loads observed
    #[inline]
    #[must_use]
    pub fn forced_reminder_loads(&self) -> usize {
        self.forced_reminder_loads.load(Ordering::SeqCst)
    }

    /// Number of forced project loads observed
    #[inline]
    #[must_use]
    pub fn forced_project_loads(&self) -> usize {
        self.forced_project_loads.load(Ordering::SeqCst)
    }

    /// Blocks the host was asked to navigate to, in call order
    pub async fn opened_blocks(&self) -> Vec<String> {
        self.opened_blocks.read().await.clone()
    }

    fn blob(&self, domain: &str) -> JsonMap {
        self.blobs
            .get(domain)
            .map(|entry| entry.value().clone())
            .unwrap_or_default()
    }

    fn put_blob(&self, domain: &str, data: &JsonMap) {
        self.blobs.insert(domain.to_string(), data.clone());
    }
}

#[async_trait]
impl HostStore for MemoryHostStore {
    async fn load_reminder_data(&self, force_reload: bool) -> Result<JsonMap, StoreError> {
        if force_reload {
            self.forced_reminder_loads.fetch_add(1, Ordering::SeqCst);
        }
        Ok(self.blob(REMINDER_DOMAIN))
    }

    async fn save_reminder_data(&self, data: &JsonMap) -> Result<(), StoreError> {
        self.put_blob(REMINDER_DOMAIN, data);
        Ok(())
    }

    async fn load_project_data(&self, force_reload: bool) -> Result<JsonMap, StoreError> {
        if force_reload {
            self.forced_project_loads.fetch_add(1, Ordering::SeqCst);
        }
        Ok(self.blob(PROJECT_DOMAIN))
    }

    async fn save_project_data(&self, data: &JsonMap) -> Result<(), StoreError> {
        self.put_blob(PROJECT_DOMAIN, data);
        Ok(())
    }

    async fn load_persons_data(&self) -> Result<Option<Vec<Person>>, StoreError> {
        Ok(self.persons.read().await.clone())
    }

    async fn save_persons_data(&self, persons: &[Person]) -> Result<(), StoreError> {
        *self.persons.write().await = Some(persons.to_vec());
        Ok(())
    }

    async fn open_block(&self, id: &str) -> Result<(), StoreError> {
        self.opened_blocks.write().await.push(id.to_string());
        Ok(())
    }
}

/// Whether a blob key belongs to a real record (host bookkeeping keys start
/// with `_`)
#[inline]
#[must_use]
pub(crate) fn is_record_key(key: &str) -> bool {
    !key.starts_with('_')
}
