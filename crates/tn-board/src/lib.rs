//! TaskNote Board
//!
//! The kanban-style assignee board:
//! - pure filter/search/group/sort pipeline over the current task set
//! - [`KanbanBoard`]: the reconciliation view-model that reloads on
//!   data-updated notifications and publishes immutable [`BoardSnapshot`]s
//!
//! Rendering is out of scope; the watch channel of snapshots is the render
//! boundary. Each snapshot is computed from scratch and fully replaces the
//! previous one, so consumers never observe a partially updated board.

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod board;
pub mod columns;
pub mod error;
pub mod filter;
pub mod sort;

pub use board::{BoardSnapshot, KanbanBoard, BOARD_SOURCE};
pub use columns::{group_by_assignee, Column, TaskNode, COLUMN_ALL, COLUMN_UNASSIGNED};
pub use error::BoardError;
pub use filter::{filter_by_categories, filter_by_search, CATEGORY_ALL, CATEGORY_NONE};
pub use sort::{sort_columns, SortOrder};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
