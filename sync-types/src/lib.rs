//! # sync-types
//!
//! Value types shared by all tidesync crates:
//! - [`SyncState`] - which synchronization strategy is currently running
//! - [`SyncSnapshot`] - read-only projection handed out by the orchestrator
//! - [`ParseSyncStateError`] - error for parsing state names

#![warn(missing_docs)]
#![warn(clippy::all)]

mod error;
mod state;

pub use error::ParseSyncStateError;
pub use state::{SyncSnapshot, SyncState};
