//! Error types for tidesync value types.

use thiserror::Error;

/// Returned when a string does not name a [`crate::SyncState`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown sync state: {input:?}")]
pub struct ParseSyncStateError {
    /// The rejected input.
    pub input: String,
}

impl ParseSyncStateError {
    pub(crate) fn new(input: &str) -> Self {
        Self {
            input: input.to_string(),
        }
    }
}
