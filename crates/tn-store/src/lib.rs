//! TaskNote Storage
//!
//! Accessors for host-owned data plus the services built directly on them:
//! - [`HostStore`]: the seam to the host's key-value plugin storage
//! - [`MemoryHostStore`]: in-memory implementation for tests and local-only use
//! - [`ReminderStore`] / [`ProjectStore`]: typed reads and read-modify-write
//!   transactions over the raw JSON blobs
//! - [`PersonDirectory`]: the assignee directory with name validation
//!
//! The host storage blob is always the source of truth; these services hold
//! copies and fully replace them on reload.

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod error;
pub mod host;
pub mod persons;
pub mod tasks;

pub use error::{PersonError, StoreError};
pub use host::{HostStore, JsonMap, MemoryHostStore};
pub use persons::{PersonDirectory, UsageReport, MAX_NAME_LEN};
pub use tasks::{ProjectStore, ReminderStore};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
