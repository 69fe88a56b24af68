//! Assertion helpers for chaos testing.
//!
//! These are pure functions that verify orchestrator correctness after chaos
//! scenarios complete. They take observed state as input and return
//! pass/fail.

use sync_types::SyncState;

/// Number of collaborators the orchestrator registers a listener with.
pub const NOTIFYING_COLLABORATORS: usize = 4;

/// Kind of operation a collaborator was asked to start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    /// Request/response sync.
    Http,
    /// Long-poll sync.
    LongSync {
        /// Full (replacing) sync.
        full: bool,
    },
    /// Realtime channel initialization.
    RealtimeInit,
    /// Realtime sync attempt.
    RealtimeSync,
}

/// A start call, with the orchestrator state observed from inside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StartRecord {
    /// What was started.
    pub kind: OperationKind,
    /// Orchestrator state at the time of the call.
    pub state: SyncState,
}

/// Result of an assertion check.
#[derive(Debug, Clone)]
pub struct AssertionResult {
    /// Whether the assertion passed
    pub passed: bool,
    /// Description of what was checked
    pub description: String,
    /// Details on failure
    pub failure_details: Option<String>,
}

impl AssertionResult {
    /// Create a passing result.
    pub fn pass(description: &str) -> Self {
        Self {
            passed: true,
            description: description.into(),
            failure_details: None,
        }
    }

    /// Create a failing result.
    pub fn fail(description: &str, details: &str) -> Self {
        Self {
            passed: false,
            description: description.into(),
            failure_details: Some(details.into()),
        }
    }
}

/// Assert that listeners are registered exactly while the state is not idle.
///
/// Every notifying collaborator must hold exactly one registration outside
/// IDLE, and none inside it. Only meaningful after quiescence.
pub fn assert_listeners_match_state(state: SyncState, registrations: usize) -> AssertionResult {
    let expected = if state.is_idle() {
        0
    } else {
        NOTIFYING_COLLABORATORS
    };

    if registrations == expected {
        AssertionResult::pass(&format!(
            "{} listener registrations in {}",
            registrations, state
        ))
    } else {
        AssertionResult::fail(
            "Listener registration follows the idle boundary",
            &format!(
                "State {} expects {} registrations, found {}",
                state, expected, registrations
            ),
        )
    }
}

/// States in which starting `kind` is legitimate.
fn start_allowed(kind: OperationKind, state: SyncState) -> bool {
    match kind {
        OperationKind::Http => matches!(state, SyncState::FirstSync | SyncState::Fallback),
        OperationKind::LongSync { full: true } => matches!(
            state,
            SyncState::FirstEverSync | SyncState::RecoverySync
        ),
        OperationKind::LongSync { full: false } => state == SyncState::PostTimeoutSync,
        OperationKind::RealtimeInit => !matches!(state, SyncState::Idle | SyncState::Realtime),
        OperationKind::RealtimeSync => state == SyncState::Realtime,
    }
}

/// Assert that every start call happened in a state that owns it.
pub fn assert_starts_match_state(starts: &[StartRecord]) -> AssertionResult {
    for (i, start) in starts.iter().enumerate() {
        if !start_allowed(start.kind, start.state) {
            return AssertionResult::fail(
                "Starts match state",
                &format!(
                    "Start #{} ({:?}) issued in state {}",
                    i + 1,
                    start.kind,
                    start.state
                ),
            );
        }
    }

    AssertionResult::pass(&format!("All {} starts issued in owning states", starts.len()))
}

/// Assert that the orchestrator is not waiting for an operation.
///
/// Every waiting state is entered together with its start call, so once all
/// outcomes are delivered none of them may remain.
pub fn assert_not_stuck(state: SyncState, outstanding: usize) -> AssertionResult {
    if outstanding > 0 {
        return AssertionResult::fail(
            "Not stuck after quiescence",
            &format!("{} operations still outstanding", outstanding),
        );
    }
    if state.has_operation_in_flight() {
        return AssertionResult::fail(
            "Not stuck after quiescence",
            &format!("State {} waits for an operation that will never report", state),
        );
    }
    AssertionResult::pass(&format!("Settled in {}", state))
}

/// Assert that a sync request in Fallback starts a request/response sync.
///
/// Catches an in-flight flag left set with nothing outstanding.
pub fn assert_fallback_accepts_sync(
    state: SyncState,
    http_starts_before: usize,
    http_starts_after: usize,
) -> AssertionResult {
    if state != SyncState::Fallback {
        return AssertionResult::pass(&format!("Probe not applicable in {}", state));
    }
    if http_starts_after == http_starts_before + 1 {
        AssertionResult::pass("Fallback accepted a sync request")
    } else {
        AssertionResult::fail(
            "Fallback accepts sync requests after quiescence",
            &format!(
                "Expected one new request/response sync, got {}",
                http_starts_after.saturating_sub(http_starts_before)
            ),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn start(kind: OperationKind, state: SyncState) -> StartRecord {
        StartRecord { kind, state }
    }

    #[test]
    fn test_listeners_idle_pass() {
        assert!(assert_listeners_match_state(SyncState::Idle, 0).passed);
    }

    #[test]
    fn test_listeners_active_pass() {
        assert!(assert_listeners_match_state(SyncState::Realtime, 4).passed);
    }

    #[test]
    fn test_listeners_leak_fail() {
        let result = assert_listeners_match_state(SyncState::Idle, 2);
        assert!(!result.passed);
        assert!(result.failure_details.unwrap().contains("found 2"));
    }

    #[test]
    fn test_listeners_duplicate_fail() {
        assert!(!assert_listeners_match_state(SyncState::Fallback, 8).passed);
    }

    #[test]
    fn test_starts_pass() {
        let starts = [
            start(OperationKind::Http, SyncState::FirstSync),
            start(OperationKind::RealtimeInit, SyncState::FirstSync),
            start(OperationKind::RealtimeSync, SyncState::Realtime),
            start(OperationKind::LongSync { full: false }, SyncState::PostTimeoutSync),
            start(OperationKind::LongSync { full: true }, SyncState::RecoverySync),
            start(OperationKind::Http, SyncState::Fallback),
        ];
        assert!(assert_starts_match_state(&starts).passed);
    }

    #[test]
    fn test_starts_fail() {
        let starts = [
            start(OperationKind::Http, SyncState::FirstSync),
            start(OperationKind::Http, SyncState::Realtime),
        ];
        let result = assert_starts_match_state(&starts);
        assert!(!result.passed);
        assert!(result.failure_details.unwrap().contains("#2"));
    }

    #[test]
    fn test_partial_long_sync_only_after_timeout() {
        let starts = [start(OperationKind::LongSync { full: false }, SyncState::RecoverySync)];
        assert!(!assert_starts_match_state(&starts).passed);
    }

    #[test]
    fn test_not_stuck() {
        assert!(assert_not_stuck(SyncState::Realtime, 0).passed);
        assert!(assert_not_stuck(SyncState::Idle, 0).passed);
        assert!(!assert_not_stuck(SyncState::FirstSync, 0).passed);
        assert!(!assert_not_stuck(SyncState::Realtime, 1).passed);
    }

    #[test]
    fn test_fallback_probe() {
        assert!(assert_fallback_accepts_sync(SyncState::Fallback, 3, 4).passed);
        assert!(!assert_fallback_accepts_sync(SyncState::Fallback, 3, 3).passed);
        assert!(assert_fallback_accepts_sync(SyncState::Realtime, 3, 3).passed);
    }
}
