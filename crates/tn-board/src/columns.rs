//! Grouping tasks into assignee columns
//!
//! Columns are rebuilt from scratch on every reconciliation pass. A task
//! whose parent survived filtering nests under it; a task whose parent was
//! filtered out (or never existed) is promoted to a root and placed directly.

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use tn_core::{Person, Task};

/// Column id for the aggregate column holding every root task
pub const COLUMN_ALL: &str = "all";

/// Column id for root tasks without an assignee
pub const COLUMN_UNASSIGNED: &str = "none";

/// A task with its surviving sub-tasks nested beneath it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskNode {
    /// The task itself
    pub task: Task,
    /// Direct sub-tasks, recursively nested
    pub children: Vec<TaskNode>,
}

impl TaskNode {
    fn leaf(task: Task) -> Self {
        Self {
            task,
            children: Vec::new(),
        }
    }
}

/// One kanban column
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Column {
    /// [`COLUMN_ALL`], [`COLUMN_UNASSIGNED`], or a person id
    pub id: String,
    /// Display name
    pub name: String,
    /// Root task trees in this column
    pub tasks: Vec<TaskNode>,
}

/// Group the filtered task set into columns
///
/// Produces, in order: the [`COLUMN_ALL`] column with every root, the
/// [`COLUMN_UNASSIGNED`] column, then one column per directory person in
/// directory order. A root task lands in exactly one assignee column (plus
/// the aggregate column); sub-tasks follow their root regardless of their
/// own assignee.
#[must_use]
pub fn group_by_assignee(tasks: Vec<Task>, persons: &[Person]) -> Vec<Column> {
    let present: HashSet<String> = tasks.iter().map(|t| t.id.clone()).collect();

    let mut children_of: HashMap<String, Vec<Task>> = HashMap::new();
    let mut root_tasks = Vec::new();
    for task in tasks {
        match task.parent_id.as_deref().filter(|p| present.contains(*p)) {
            Some(parent) => children_of.entry(parent.to_string()).or_default().push(task),
            None => root_tasks.push(task),
        }
    }

    let roots: Vec<TaskNode> = root_tasks
        .into_iter()
        .map(|task| build_node(task, &mut children_of))
        .collect();

    let mut columns = Vec::with_capacity(persons.len() + 2);
    columns.push(Column {
        id: COLUMN_ALL.to_string(),
        name: "All assignees".to_string(),
        tasks: roots.clone(),
    });
    columns.push(Column {
        id: COLUMN_UNASSIGNED.to_string(),
        name: "Unassigned".to_string(),
        tasks: roots
            .iter()
            .filter(|node| node.task.is_unassigned())
            .cloned()
            .collect(),
    });
    for person in persons {
        columns.push(Column {
            id: person.id.clone(),
            name: person.name.clone(),
            tasks: roots
                .iter()
                .filter(|node| node.task.assignee_id.as_deref() == Some(person.id.as_str()))
                .cloned()
                .collect(),
        });
    }
    columns
}

fn build_node(task: Task, children_of: &mut HashMap<String, Vec<Task>>) -> TaskNode {
    let mut node = TaskNode::leaf(task);
    if let Some(children) = children_of.remove(&node.task.id) {
        node.children = children
            .into_iter()
            .map(|child| build_node(child, children_of))
            .collect();
    }
    node
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn person(id: &str, name: &str) -> Person {
        Person {
            id: id.to_string(),
            name: name.to_string(),
            created_at: "2026-01-01T00:00:00Z".to_string(),
        }
    }

    fn column_ids(columns: &[Column]) -> Vec<&str> {
        columns.iter().map(|c| c.id.as_str()).collect()
    }

    fn root_ids(column: &Column) -> Vec<&str> {
        column.tasks.iter().map(|n| n.task.id.as_str()).collect()
    }

    #[test]
    fn column_layout_follows_directory_order() {
        let persons = vec![person("p1", "Alice"), person("p2", "Bob")];
        let columns = group_by_assignee(Vec::new(), &persons);
        assert_eq!(column_ids(&columns), ["all", "none", "p1", "p2"]);
        assert_eq!(columns[0].name, "All assignees");
        assert_eq!(columns[1].name, "Unassigned");
        assert_eq!(columns[2].name, "Alice");
    }

    #[test]
    fn roots_land_in_exactly_one_assignee_column() {
        let persons = vec![person("p1", "Alice")];
        let tasks = vec![
            Task::new("a", "mine").with_assignee("p1"),
            Task::new("b", "nobody's"),
        ];

        let columns = group_by_assignee(tasks, &persons);
        assert_eq!(root_ids(&columns[0]), ["a", "b"]);
        assert_eq!(root_ids(&columns[1]), ["b"]);
        assert_eq!(root_ids(&columns[2]), ["a"]);
    }

    #[test]
    fn children_nest_under_surviving_parents() {
        let tasks = vec![
            Task::new("root", "top").with_assignee("p1"),
            Task::new("child", "mid").with_parent("root"),
            Task::new("grandchild", "leaf").with_parent("child"),
        ];

        let columns = group_by_assignee(tasks, &[person("p1", "Alice")]);
        let alice = &columns[2];
        assert_eq!(root_ids(alice), ["root"]);
        assert_eq!(alice.tasks[0].children.len(), 1);
        assert_eq!(alice.tasks[0].children[0].task.id, "child");
        assert_eq!(alice.tasks[0].children[0].children[0].task.id, "grandchild");
    }

    #[test]
    fn orphans_are_promoted_to_roots() {
        // parent "gone" was filtered out before grouping
        let tasks = vec![Task::new("child", "stranded").with_parent("gone")];
        let columns = group_by_assignee(tasks, &[]);
        assert_eq!(root_ids(&columns[0]), ["child"]);
        assert_eq!(root_ids(&columns[1]), ["child"]);
    }

    #[test]
    fn sub_tasks_follow_their_root_column() {
        // child is assigned elsewhere but stays nested under its root
        let tasks = vec![
            Task::new("root", "top").with_assignee("p1"),
            Task::new("child", "mid").with_parent("root").with_assignee("p2"),
        ];
        let persons = vec![person("p1", "Alice"), person("p2", "Bob")];

        let columns = group_by_assignee(tasks, &persons);
        assert_eq!(root_ids(&columns[2]), ["root"]);
        assert!(columns[3].tasks.is_empty());
    }
}
