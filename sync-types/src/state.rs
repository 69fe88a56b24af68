//! Sync state and snapshot types.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::ParseSyncStateError;

/// What the orchestrator is doing right now.
///
/// Exactly one value holds at any instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SyncState {
    /// Initial state. No listeners registered, nothing in flight.
    #[default]
    Idle,
    /// The one-time full bootstrap after the user's first login.
    FirstEverSync,
    /// The first request/response sync of a session.
    FirstSync,
    /// Realtime sync is operational.
    Realtime,
    /// Realtime sync is not operational; request/response sync is retried on demand.
    Fallback,
    /// A non-full long-poll sync following a timeout.
    PostTimeoutSync,
    /// A full long-poll sync following an "unsuccessful" response from the server.
    RecoverySync,
}

impl SyncState {
    /// All states in declaration order.
    pub const ALL: [SyncState; 7] = [
        SyncState::Idle,
        SyncState::FirstEverSync,
        SyncState::FirstSync,
        SyncState::Realtime,
        SyncState::Fallback,
        SyncState::PostTimeoutSync,
        SyncState::RecoverySync,
    ];

    /// Canonical upper-case name, as used in logs and scenario files.
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncState::Idle => "IDLE",
            SyncState::FirstEverSync => "FIRST_EVER_SYNC",
            SyncState::FirstSync => "FIRST_SYNC",
            SyncState::Realtime => "REALTIME",
            SyncState::Fallback => "FALLBACK",
            SyncState::PostTimeoutSync => "POST_TIMEOUT_SYNC",
            SyncState::RecoverySync => "RECOVERY_SYNC",
        }
    }

    /// Check if this is the initial state.
    pub fn is_idle(&self) -> bool {
        matches!(self, SyncState::Idle)
    }

    /// Check if being in this state by itself means an operation is outstanding.
    ///
    /// `Fallback` is a steady state and needs a separate in-flight flag;
    /// `Realtime` allows overlapping attempts and is never "busy".
    pub fn has_operation_in_flight(&self) -> bool {
        matches!(
            self,
            SyncState::FirstEverSync
                | SyncState::FirstSync
                | SyncState::PostTimeoutSync
                | SyncState::RecoverySync
        )
    }
}

impl fmt::Display for SyncState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyncState {
    type Err = ParseSyncStateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().replace('-', "_").to_ascii_uppercase();
        SyncState::ALL
            .into_iter()
            .find(|state| state.as_str() == normalized)
            .ok_or_else(|| ParseSyncStateError::new(s))
    }
}

/// Immutable copy of the orchestrator's state at the moment of the query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SyncSnapshot {
    /// The state when the snapshot was taken.
    pub state: SyncState,
}

impl SyncSnapshot {
    /// Create a snapshot of the given state.
    pub fn new(state: SyncState) -> Self {
        Self { state }
    }
}
