//! TaskNote Sync
//!
//! Client-side refresh-broadcast machinery:
//! - [`BroadcastTransport`]: the wire seam ([`SseTransport`] is the
//!   reqwest-backed implementation against the host's event-stream endpoint)
//! - [`BroadcastClient`]: subscribes to a named channel, filters out its own
//!   messages, and turns accepted `REFRESH_DATA` messages into forced reloads
//!   plus tagged bus notifications
//! - [`ReloadGuard`]: the coalescing state machine that keeps at most one
//!   reconciliation pass in flight without ever dropping a request
//!
//! Nothing here assumes ordered delivery: every reload is a full re-fetch of
//! current state, so out-of-order messages converge on the same result.

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod client;
pub mod error;
pub mod guard;
pub mod transport;

pub use client::{BroadcastClient, RefreshPublisher, SyncConfig, BROADCAST_SOURCE, DEFAULT_CHANNEL};
pub use error::SyncError;
pub use guard::{GuardState, ReloadGuard, ReloadOutcome};
pub use transport::{BroadcastTransport, SseTransport};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
