//! # sync-core
//!
//! Sync strategy orchestration for tidesync.
//!
//! A client keeps its local data in step with the server through three
//! strategies: a request/response sync, a long-poll sync and a realtime
//! channel. This crate decides which one runs, reacts to their outcomes and
//! moves between them as the app enters and leaves the foreground.
//!
//! ## Layout
//!
//! - [`machine`] is pure: `(machine, facts, event) -> (machine, actions)`.
//!   No I/O, no locks, instant tests.
//! - [`orchestrator`] interprets the machine against the [`collaborators`]
//!   under a single fair re-entrant lock.
//! - [`mock`] provides in-memory collaborators for tests and the CLI.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod collaborators;
pub mod machine;
pub mod mock;
pub mod orchestrator;

pub use collaborators::{
    AppForegroundListener, AppForegroundState, Collaborators, HttpSync, HttpSyncListener,
    Listeners, LoginState, LongSync, LongSyncListener, RealtimeSync, RealtimeSyncListener,
    SyncPreferences,
};
pub use machine::{transition_table, Action, Event, Facts, SyncMachine, Transition};
pub use mock::{HttpOutcome, ListenerCounts, LongSyncOutcome, MockCollaborators, RealtimeOutcome};
pub use orchestrator::SyncOrchestrator;
pub use sync_types::{SyncSnapshot, SyncState};
