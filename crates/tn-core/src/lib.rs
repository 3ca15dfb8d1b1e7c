//! TaskNote Core
//!
//! Shared foundation for the TaskNote plugin workspace:
//! - Data model (tasks, persons, priorities, broadcast messages)
//! - In-process notification bus with typed topics
//! - Seams for host-provided UI primitives (toast notifications)
//!
//! # Example
//!
//! ```rust
//! use tn_core::{Notification, NotificationBus, Topic};
//!
//! let bus = NotificationBus::new(16);
//! let mut rx = bus.subscribe();
//!
//! bus.publish(Notification::with_source(Topic::ReminderUpdated, "broadcast"));
//!
//! let seen = rx.try_recv().unwrap();
//! assert_eq!(seen.topic, Topic::ReminderUpdated);
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

// Core modules
pub mod bus;
pub mod notify;
pub mod types;

// Re-exports for convenience
pub use bus::{Notification, NotificationBus, Topic};
pub use notify::{Notifier, TracingNotifier};
pub use types::{BroadcastMessage, Person, Priority, Scope, Task};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
