//! Core data model
//!
//! Task and person records mirror the host's camelCase JSON blobs; the
//! broadcast message mirrors the wire shape exactly. Unknown JSON fields are
//! tolerated everywhere since the host owns the persistence format.

use serde::{Deserialize, Serialize};

use crate::bus::Topic;

/// Task priority, ordered `high > medium > low > none`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Highest priority
    High,
    /// Medium priority
    Medium,
    /// Low priority
    Low,
    /// No priority assigned (default)
    #[default]
    None,
}

impl Priority {
    /// Numeric weight used by the board comparator
    #[inline]
    #[must_use]
    pub fn weight(self) -> u8 {
        match self {
            Self::High => 3,
            Self::Medium => 2,
            Self::Low => 1,
            Self::None => 0,
        }
    }
}

/// A task/reminder record as stored by the host
///
/// The component only ever holds copies; the host storage blob is the source
/// of truth and is fully re-fetched on every reload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Stable task identity (host-generated)
    pub id: String,
    /// Display title
    #[serde(default)]
    pub title: String,
    /// Priority, `none` when absent
    #[serde(default)]
    pub priority: Priority,
    /// Owning project, if any
    pub project_id: Option<String>,
    /// Completion flag
    #[serde(default)]
    pub completed: bool,
    /// Scheduled date (host-local `YYYY-MM-DD`)
    #[serde(default)]
    pub date: String,
    /// Optional scheduled time
    pub time: Option<String>,
    /// Optional free-form note
    pub note: Option<String>,
    /// Content block this task is bound to, if any
    pub block_id: Option<String>,
    /// Assignee reference into the person directory
    pub assignee_id: Option<String>,
    /// Parent task for sub-tasks
    pub parent_id: Option<String>,
    /// Completed pomodoro sessions
    #[serde(default)]
    pub pomodoro_count: u32,
    /// Accumulated focus time in seconds
    #[serde(default)]
    pub focus_time: u64,
    /// Explicit sort key (manual ordering)
    #[serde(default)]
    pub sort: i64,
    /// Creation timestamp (host-local `YYYY-MM-DD HH:MM:SS`)
    pub created_time: Option<String>,
    /// Completion timestamp, set when `completed` flips to true
    pub completed_time: Option<String>,
    /// Optional end date for ranged tasks
    pub end_date: Option<String>,
    /// Comma-separated category ids
    pub category_id: Option<String>,
}

impl Task {
    /// Create a minimal task with the given id and title
    #[must_use]
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            priority: Priority::None,
            project_id: None,
            completed: false,
            date: String::new(),
            time: None,
            note: None,
            block_id: None,
            assignee_id: None,
            parent_id: None,
            pomodoro_count: 0,
            focus_time: 0,
            sort: 0,
            created_time: None,
            completed_time: None,
            end_date: None,
            category_id: None,
        }
    }

    /// Set the priority (builder style)
    #[inline]
    #[must_use]
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Set the assignee (builder style)
    #[inline]
    #[must_use]
    pub fn with_assignee(mut self, assignee_id: impl Into<String>) -> Self {
        self.assignee_id = Some(assignee_id.into());
        self
    }

    /// Set the parent task (builder style)
    #[inline]
    #[must_use]
    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    /// Set the note (builder style)
    #[inline]
    #[must_use]
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    /// Whether the task has no assignee
    #[inline]
    #[must_use]
    pub fn is_unassigned(&self) -> bool {
        self.assignee_id.as_deref().map_or(true, str::is_empty)
    }
}

/// Assignee directory entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Person {
    /// Stable person identity
    pub id: String,
    /// Display name, unique case-insensitively within the directory
    pub name: String,
    /// RFC 3339 creation timestamp
    pub created_at: String,
}

/// A named data domain subject to reload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    /// Task/reminder data
    Reminder,
    /// Project data
    Project,
}

impl Scope {
    /// Parse a wire scope value; unknown values yield `None` and are ignored
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "reminder" => Some(Self::Reminder),
            "project" => Some(Self::Project),
            _ => None,
        }
    }

    /// Wire representation
    #[inline]
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Reminder => "reminder",
            Self::Project => "project",
        }
    }

    /// Bus topic announced after this scope has been reloaded
    #[inline]
    #[must_use]
    pub fn topic(self) -> Topic {
        match self {
            Self::Reminder => Topic::ReminderUpdated,
            Self::Project => Topic::ProjectUpdated,
        }
    }
}

/// Message exchanged over the host's broadcast channel
///
/// Exact wire shape:
/// `{ "sid": "<session id>", "type": "REFRESH_DATA", "scope": ["reminder", ...] }`
///
/// The message is transient - it exists only for the duration of handling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BroadcastMessage {
    /// Originating client session id, used for self-suppression
    pub sid: String,
    /// Message tag; only [`BroadcastMessage::REFRESH_DATA`] is acted upon
    #[serde(rename = "type")]
    pub kind: String,
    /// Data domains to reload, as raw wire strings
    pub scope: Vec<String>,
}

impl BroadcastMessage {
    /// The only message type that triggers reloads
    pub const REFRESH_DATA: &'static str = "REFRESH_DATA";

    /// Build a refresh message for the given scopes
    #[must_use]
    pub fn refresh(sid: impl Into<String>, scopes: &[Scope]) -> Self {
        Self {
            sid: sid.into(),
            kind: Self::REFRESH_DATA.to_string(),
            scope: scopes.iter().map(|s| s.as_str().to_string()).collect(),
        }
    }

    /// Whether this message should trigger reloads
    #[inline]
    #[must_use]
    pub fn is_refresh(&self) -> bool {
        self.kind == Self::REFRESH_DATA
    }

    /// Distinct recognized scopes, in order of first appearance
    ///
    /// Duplicates are collapsed and unknown scope values are skipped without
    /// error, preserving wire order for the remainder.
    #[must_use]
    pub fn scopes(&self) -> Vec<Scope> {
        let mut seen = Vec::new();
        for raw in &self.scope {
            if let Some(scope) = Scope::parse(raw) {
                if !seen.contains(&scope) {
                    seen.push(scope);
                }
            }
        }
        seen
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn priority_ordering_weights() {
        assert!(Priority::High.weight() > Priority::Medium.weight());
        assert!(Priority::Medium.weight() > Priority::Low.weight());
        assert!(Priority::Low.weight() > Priority::None.weight());
    }

    #[test]
    fn priority_serde_lowercase() {
        assert_eq!(serde_json::to_string(&Priority::High).unwrap(), "\"high\"");
        let p: Priority = serde_json::from_str("\"medium\"").unwrap();
        assert_eq!(p, Priority::Medium);
    }

    #[test]
    fn task_tolerates_unknown_and_missing_fields() {
        let task: Task = serde_json::from_str(
            r#"{"id":"t1","title":"Write report","repeat":{"kind":"weekly"},"isRepeatInstance":false}"#,
        )
        .unwrap();
        assert_eq!(task.id, "t1");
        assert_eq!(task.priority, Priority::None);
        assert!(!task.completed);
        assert_eq!(task.pomodoro_count, 0);
    }

    #[test]
    fn task_camel_case_round_trip() {
        let task = Task::new("t1", "Call Bob")
            .with_assignee("person-1")
            .with_parent("t0");
        let json = serde_json::to_value(&task).unwrap();
        assert_eq!(json["assigneeId"], "person-1");
        assert_eq!(json["parentId"], "t0");
        assert_eq!(json["pomodoroCount"], 0);
    }

    #[test]
    fn scope_parse_rejects_unknown() {
        assert_eq!(Scope::parse("reminder"), Some(Scope::Reminder));
        assert_eq!(Scope::parse("project"), Some(Scope::Project));
        assert_eq!(Scope::parse("calendar"), None);
        assert_eq!(Scope::parse(""), None);
    }

    #[test]
    fn message_wire_shape() {
        let msg = BroadcastMessage::refresh("sid-a", &[Scope::Reminder, Scope::Project]);
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["sid"], "sid-a");
        assert_eq!(json["type"], "REFRESH_DATA");
        assert_eq!(json["scope"][0], "reminder");
        assert_eq!(json["scope"][1], "project");
    }

    #[test]
    fn message_scopes_dedup_preserving_order() {
        let msg = BroadcastMessage {
            sid: "s".to_string(),
            kind: BroadcastMessage::REFRESH_DATA.to_string(),
            scope: vec![
                "project".to_string(),
                "reminder".to_string(),
                "project".to_string(),
                "weather".to_string(),
            ],
        };
        assert_eq!(msg.scopes(), vec![Scope::Project, Scope::Reminder]);
    }

    #[test]
    fn unassigned_treats_empty_as_missing() {
        let mut task = Task::new("t1", "x");
        assert!(task.is_unassigned());
        task.assignee_id = Some(String::new());
        assert!(task.is_unassigned());
        task.assignee_id = Some("p1".to_string());
        assert!(!task.is_unassigned());
    }
}
