//! Column ordering
//!
//! The natural order is priority weight descending, then the explicit sort
//! key ascending, then creation time newest-first. [`SortOrder::Desc`] keeps
//! the natural order; [`SortOrder::Asc`] reverses it wholesale rather than
//! flipping each key independently, so priorities never invert.

use std::cmp::Ordering;

use chrono::{DateTime, NaiveDateTime};
use tn_core::Task;

use crate::columns::{Column, TaskNode, COLUMN_UNASSIGNED};

const LOCAL_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Direction applied to the natural task order
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    /// Natural order reversed
    Asc,
    /// Natural order (default)
    #[default]
    Desc,
}

fn created_timestamp(task: &Task) -> i64 {
    let Some(raw) = task.created_time.as_deref() else {
        return 0;
    };
    if let Ok(local) = NaiveDateTime::parse_from_str(raw, LOCAL_DATETIME_FORMAT) {
        return local.and_utc().timestamp();
    }
    DateTime::parse_from_rfc3339(raw).map_or(0, |dt| dt.timestamp())
}

fn natural(a: &Task, b: &Task) -> Ordering {
    b.priority
        .weight()
        .cmp(&a.priority.weight())
        .then_with(|| a.sort.cmp(&b.sort))
        .then_with(|| created_timestamp(b).cmp(&created_timestamp(a)))
}

fn by_pomodoros(a: &Task, b: &Task, order: SortOrder) -> Ordering {
    let cmp = b.pomodoro_count.cmp(&a.pomodoro_count);
    match order {
        SortOrder::Desc => cmp,
        SortOrder::Asc => cmp.reverse(),
    }
}

fn sort_nodes<F>(nodes: &mut [TaskNode], cmp: &F)
where
    F: Fn(&Task, &Task) -> Ordering,
{
    nodes.sort_by(|a, b| cmp(&a.task, &b.task));
    for node in nodes {
        sort_nodes(&mut node.children, cmp);
    }
}

/// Sort every column in place, recursing into sub-tasks
///
/// The unassigned column orders by completed pomodoro sessions under its own
/// direction toggle; every other column uses the natural task order under
/// `order`.
pub fn sort_columns(columns: &mut [Column], order: SortOrder, done_order: SortOrder) {
    for column in columns {
        if column.id == COLUMN_UNASSIGNED {
            sort_nodes(&mut column.tasks, &|a, b| by_pomodoros(a, b, done_order));
        } else {
            match order {
                SortOrder::Desc => sort_nodes(&mut column.tasks, &natural),
                SortOrder::Asc => sort_nodes(&mut column.tasks, &|a, b| natural(a, b).reverse()),
            }
        }
    }
}
