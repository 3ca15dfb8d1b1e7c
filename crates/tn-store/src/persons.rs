//! Person (assignee) directory
//!
//! An explicitly constructed, dependency-injected service whose lifetime is
//! tied to plugin activation. Name uniqueness is case-insensitive and
//! enforced at mutation time; every mutation persists through the host store
//! before the in-memory copy is committed, so a failed save never leaves the
//! directory and the blob disagreeing.

use std::sync::Arc;

use chrono::Utc;
use tn_core::{Notification, NotificationBus, Person, Topic};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{PersonError, StoreError};
use crate::host::{is_record_key, HostStore};

/// Maximum person name length in characters
pub const MAX_NAME_LEN: usize = 100;

/// How many task and project records reference a person
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UsageReport {
    /// Referencing task records
    pub tasks: usize,
    /// Referencing project records
    pub projects: usize,
}

impl UsageReport {
    /// Whether the person is referenced anywhere
    #[inline]
    #[must_use]
    pub fn in_use(&self) -> bool {
        self.tasks > 0 || self.projects > 0
    }
}

/// The assignee directory service
pub struct PersonDirectory {
    store: Arc<dyn HostStore>,
    bus: NotificationBus,
    persons: RwLock<Vec<Person>>,
}

impl PersonDirectory {
    /// Create an uninitialized directory over the given host accessor
    #[must_use]
    pub fn new(store: Arc<dyn HostStore>, bus: NotificationBus) -> Self {
        Self {
            store,
            bus,
            persons: RwLock::new(Vec::new()),
        }
    }

    /// Load the directory from host storage
    ///
    /// Absent or unreadable data falls back to an empty directory, which is
    /// persisted so later loads succeed.
    pub async fn initialize(&self) -> Result<(), StoreError> {
        match self.store.load_persons_data().await {
            Ok(Some(persons)) if !persons.is_empty() => {
                *self.persons.write().await = persons;
                Ok(())
            }
            Ok(_) => {
                self.store.save_persons_data(&[]).await?;
                self.persons.write().await.clear();
                Ok(())
            }
            Err(err) => {
                tracing::warn!(%err, "loading persons failed, falling back to empty directory");
                self.store.save_persons_data(&[]).await?;
                self.persons.write().await.clear();
                Ok(())
            }
        }
    }

    /// Snapshot of all persons, in directory order
    pub async fn persons(&self) -> Vec<Person> {
        self.persons.read().await.clone()
    }

    /// Look up a person by id
    pub async fn person_by_id(&self, id: &str) -> Option<Person> {
        self.persons.read().await.iter().find(|p| p.id == id).cloned()
    }

    /// Look up a person's display name by id
    pub async fn person_name(&self, id: &str) -> Option<String> {
        self.person_by_id(id).await.map(|p| p.name)
    }

    /// Add a person with the given name
    ///
    /// The name is trimmed; empty, over-long, and case-insensitively
    /// duplicate names are rejected before anything is written.
    pub async fn add_person(&self, name: &str) -> Result<Person, PersonError> {
        let mut persons = self.persons.write().await;
        let name = validate_name(&persons, name, None)?;

        let person = Person {
            id: format!("person-{}", Uuid::new_v4()),
            name,
            created_at: Utc::now().to_rfc3339(),
        };

        let mut next = persons.clone();
        next.push(person.clone());
        self.store.save_persons_data(&next).await?;
        *persons = next;
        drop(persons);

        self.bus.publish(Notification::new(Topic::PersonUpdated));
        Ok(person)
    }

    /// Rename an existing person, with the same validation as [`Self::add_person`]
    pub async fn rename_person(&self, id: &str, name: &str) -> Result<(), PersonError> {
        let mut persons = self.persons.write().await;
        let index = persons
            .iter()
            .position(|p| p.id == id)
            .ok_or_else(|| PersonError::NotFound(id.to_string()))?;
        let name = validate_name(&persons, name, Some(index))?;

        let mut next = persons.clone();
        next[index].name = name;
        self.store.save_persons_data(&next).await?;
        *persons = next;
        drop(persons);

        self.bus.publish(Notification::new(Topic::PersonUpdated));
        Ok(())
    }

    /// Remove a person from the directory
    ///
    /// Tasks referencing the removed id simply show up in the unassigned
    /// column on the next reload; references are not rewritten.
    pub async fn remove_person(&self, id: &str) -> Result<(), PersonError> {
        let mut persons = self.persons.write().await;
        let index = persons
            .iter()
            .position(|p| p.id == id)
            .ok_or_else(|| PersonError::NotFound(id.to_string()))?;

        let mut next = persons.clone();
        next.remove(index);
        self.store.save_persons_data(&next).await?;
        *persons = next;
        drop(persons);

        self.bus.publish(Notification::new(Topic::PersonUpdated));
        Ok(())
    }

    /// Reorder the directory to match the given id sequence
    ///
    /// The sequence must be a permutation of the current ids.
    pub async fn reorder(&self, ids: &[String]) -> Result<(), PersonError> {
        let mut persons = self.persons.write().await;
        if ids.len() != persons.len() {
            return Err(PersonError::ReorderMismatch);
        }

        let mut next = Vec::with_capacity(ids.len());
        for id in ids {
            let person = persons
                .iter()
                .find(|p| &p.id == id)
                .ok_or(PersonError::ReorderMismatch)?;
            if next.iter().any(|p: &Person| p.id == person.id) {
                return Err(PersonError::ReorderMismatch);
            }
            next.push(person.clone());
        }

        self.store.save_persons_data(&next).await?;
        *persons = next;
        drop(persons);

        self.bus.publish(Notification::new(Topic::PersonUpdated));
        Ok(())
    }

    /// Count task and project records referencing a person
    ///
    /// A storage failure degrades to "not in use" rather than blocking the
    /// caller (deletion confirmations still work offline).
    pub async fn check_person_in_use(&self, person_id: &str) -> UsageReport {
        let tasks = match self.store.load_reminder_data(false).await {
            Ok(data) => count_references(&data, person_id),
            Err(err) => {
                tracing::warn!(%err, "usage scan over reminder data failed");
                0
            }
        };
        let projects = match self.store.load_project_data(false).await {
            Ok(data) => count_references(&data, person_id),
            Err(err) => {
                tracing::warn!(%err, "usage scan over project data failed");
                0
            }
        };
        UsageReport { tasks, projects }
    }
}

fn count_references(data: &crate::host::JsonMap, person_id: &str) -> usize {
    data.iter()
        .filter(|(key, _)| is_record_key(key))
        .filter(|(_, value)| value.get("assigneeId").and_then(|v| v.as_str()) == Some(person_id))
        .count()
}

/// Trim and validate a candidate name against the current directory
///
/// `exclude` names an index whose current name may collide (renames to the
/// same person).
fn validate_name(
    persons: &[Person],
    name: &str,
    exclude: Option<usize>,
) -> Result<String, PersonError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(PersonError::EmptyName);
    }
    if trimmed.chars().count() > MAX_NAME_LEN {
        return Err(PersonError::NameTooLong);
    }
    let lowered = trimmed.to_lowercase();
    let duplicate = persons
        .iter()
        .enumerate()
        .any(|(idx, p)| Some(idx) != exclude && p.name.to_lowercase() == lowered);
    if duplicate {
        return Err(PersonError::DuplicateName(trimmed.to_string()));
    }
    Ok(trimmed.to_string())
}
