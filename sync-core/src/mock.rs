//! In-memory collaborators for testing.
//!
//! Each double is a cheap `Clone` handle over shared state, so a test keeps
//! one handle for arranging and asserting while the orchestrator owns
//! another. Scripted outcomes are delivered synchronously from inside the
//! start call, after the double's own lock has been released.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use crate::collaborators::{
    AppForegroundListener, AppForegroundState, Collaborators, HttpSync, HttpSyncListener,
    Listeners, LoginState, LongSync, LongSyncListener, RealtimeSync, RealtimeSyncListener,
    SyncPreferences,
};

/// Global start ordering. Strictly increasing across all doubles.
static START_SEQUENCE: AtomicU64 = AtomicU64::new(0);

fn next_sequence() -> u64 {
    START_SEQUENCE.fetch_add(1, Ordering::SeqCst) + 1
}

/// What a request/response sync does once started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HttpOutcome {
    /// Never completes on its own; see [`MockHttpSync::complete`].
    #[default]
    Pending,
    /// Reports completion.
    Completed,
    /// Reports an unsuccessful response.
    Unsuccessful,
    /// Reports a timeout.
    TimedOut,
}

/// What a long-poll sync does once started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LongSyncOutcome {
    /// Never completes on its own; see [`MockLongSync::complete`].
    #[default]
    Pending,
    /// Reports completion.
    Completed,
}

/// What a realtime sync attempt does once started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RealtimeOutcome {
    /// Succeeds silently.
    #[default]
    Quiet,
    /// Reports an unsuccessful response.
    Unsuccessful,
    /// Reports a timeout.
    TimedOut,
}

// ============================================================================
// Query collaborators
// ============================================================================

/// Login state double. Logged in by default.
#[derive(Debug, Clone)]
pub struct MockLoginState {
    logged_in: Arc<AtomicBool>,
}

impl MockLoginState {
    /// Create a double reporting a logged-in user.
    pub fn new() -> Self {
        Self {
            logged_in: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Change the reported login state.
    pub fn set_logged_in(&self, logged_in: bool) {
        self.logged_in.store(logged_in, Ordering::SeqCst);
    }
}

impl Default for MockLoginState {
    fn default() -> Self {
        Self::new()
    }
}

impl LoginState for MockLoginState {
    fn is_user_logged_in(&self) -> bool {
        self.logged_in.load(Ordering::SeqCst)
    }
}

/// Preferences double. First-ever sync already done by default.
#[derive(Debug, Clone, Default)]
pub struct MockSyncPreferences {
    waiting: Arc<AtomicBool>,
    completion_marks: Arc<AtomicUsize>,
}

impl MockSyncPreferences {
    /// Create a double with the first-ever sync already done.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the first-ever sync pending (or not).
    pub fn set_waiting_for_first_ever_sync(&self, waiting: bool) {
        self.waiting.store(waiting, Ordering::SeqCst);
    }

    /// Check if the first-ever sync is still pending.
    pub fn is_waiting(&self) -> bool {
        self.waiting.load(Ordering::SeqCst)
    }

    /// How many times completion was persisted.
    pub fn completion_marks(&self) -> usize {
        self.completion_marks.load(Ordering::SeqCst)
    }
}

impl SyncPreferences for MockSyncPreferences {
    fn is_waiting_for_first_ever_sync(&self) -> bool {
        self.is_waiting()
    }

    fn set_first_ever_sync_completed(&self) {
        self.completion_marks.fetch_add(1, Ordering::SeqCst);
        self.waiting.store(false, Ordering::SeqCst);
    }
}

// ============================================================================
// App foreground state
// ============================================================================

/// Foreground state double. In the foreground by default.
#[derive(Debug, Clone)]
pub struct MockAppForegroundState {
    in_foreground: Arc<AtomicBool>,
    listeners: Arc<Listeners<dyn AppForegroundListener>>,
}

impl MockAppForegroundState {
    /// Create a double reporting the app in the foreground.
    pub fn new() -> Self {
        Self {
            in_foreground: Arc::new(AtomicBool::new(true)),
            listeners: Arc::new(Listeners::new()),
        }
    }

    /// Change the reported visibility without notifying anyone.
    pub fn set_in_foreground(&self, in_foreground: bool) {
        self.in_foreground.store(in_foreground, Ordering::SeqCst);
    }

    /// Move to the foreground and notify listeners.
    pub fn notify_foreground(&self) {
        self.set_in_foreground(true);
        self.listeners.notify(|l| l.on_transition_to_foreground());
    }

    /// Move to the background and notify listeners.
    pub fn notify_background(&self) {
        self.set_in_foreground(false);
        self.listeners.notify(|l| l.on_transition_to_background());
    }

    /// Number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

impl Default for MockAppForegroundState {
    fn default() -> Self {
        Self::new()
    }
}

impl AppForegroundState for MockAppForegroundState {
    fn is_app_in_foreground(&self) -> bool {
        self.in_foreground.load(Ordering::SeqCst)
    }

    fn register_listener(&self, listener: Weak<dyn AppForegroundListener>) {
        self.listeners.register(listener);
    }

    fn unregister_listener(&self, listener: &Weak<dyn AppForegroundListener>) {
        self.listeners.unregister(listener);
    }
}

// ============================================================================
// Request/response sync
// ============================================================================

/// Request/response sync double.
#[derive(Debug, Clone, Default)]
pub struct MockHttpSync {
    inner: Arc<Mutex<MockHttpSyncInner>>,
    listeners: Arc<Listeners<dyn HttpSyncListener>>,
}

#[derive(Debug, Default)]
struct MockHttpSyncInner {
    outcome: HttpOutcome,
    calls: usize,
    last_started: Option<u64>,
}

impl MockHttpSync {
    /// Create a double whose syncs never complete on their own.
    pub fn new() -> Self {
        Self::default()
    }

    /// Script what subsequent starts report.
    pub fn set_outcome(&self, outcome: HttpOutcome) {
        self.inner.lock().outcome = outcome;
    }

    /// Number of starts.
    pub fn calls(&self) -> usize {
        self.inner.lock().calls
    }

    /// Sequence number of the last start.
    pub fn last_started(&self) -> Option<u64> {
        self.inner.lock().last_started
    }

    /// Report `outcome` to listeners now. `Pending` reports nothing.
    pub fn complete(&self, outcome: HttpOutcome) {
        match outcome {
            HttpOutcome::Pending => {}
            HttpOutcome::Completed => self.listeners.notify(|l| l.on_http_sync_completed()),
            HttpOutcome::Unsuccessful => {
                self.listeners.notify(|l| l.on_http_response_unsuccessful())
            }
            HttpOutcome::TimedOut => self.listeners.notify(|l| l.on_http_sync_timed_out()),
        }
    }

    /// Zero the counters, keeping the scripted outcome.
    pub fn reset_counters(&self) {
        let mut inner = self.inner.lock();
        inner.calls = 0;
        inner.last_started = None;
    }

    /// Zero the counters and go back to `Pending`.
    pub fn reset(&self) {
        *self.inner.lock() = MockHttpSyncInner::default();
    }

    /// Number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

impl HttpSync for MockHttpSync {
    fn start_http_sync(&self) {
        let outcome = {
            let mut inner = self.inner.lock();
            inner.calls += 1;
            inner.last_started = Some(next_sequence());
            inner.outcome
        };
        self.complete(outcome);
    }

    fn register_listener(&self, listener: Weak<dyn HttpSyncListener>) {
        self.listeners.register(listener);
    }

    fn unregister_listener(&self, listener: &Weak<dyn HttpSyncListener>) {
        self.listeners.unregister(listener);
    }
}

// ============================================================================
// Long-poll sync
// ============================================================================

/// Long-poll sync double.
#[derive(Debug, Clone, Default)]
pub struct MockLongSync {
    inner: Arc<Mutex<MockLongSyncInner>>,
    listeners: Arc<Listeners<dyn LongSyncListener>>,
}

#[derive(Debug, Default)]
struct MockLongSyncInner {
    outcome: LongSyncOutcome,
    calls: usize,
    last_full: Option<bool>,
    last_started: Option<u64>,
}

impl MockLongSync {
    /// Create a double whose syncs never complete on their own.
    pub fn new() -> Self {
        Self::default()
    }

    /// Script what subsequent starts report.
    pub fn set_outcome(&self, outcome: LongSyncOutcome) {
        self.inner.lock().outcome = outcome;
    }

    /// Number of starts.
    pub fn calls(&self) -> usize {
        self.inner.lock().calls
    }

    /// The `full` flag of the last start.
    pub fn last_full(&self) -> Option<bool> {
        self.inner.lock().last_full
    }

    /// Sequence number of the last start.
    pub fn last_started(&self) -> Option<u64> {
        self.inner.lock().last_started
    }

    /// Report completion to listeners now.
    pub fn complete(&self) {
        self.listeners.notify(|l| l.on_long_sync_completed());
    }

    /// Zero the counters, keeping the scripted outcome.
    pub fn reset_counters(&self) {
        let mut inner = self.inner.lock();
        inner.calls = 0;
        inner.last_full = None;
        inner.last_started = None;
    }

    /// Zero the counters and go back to `Pending`.
    pub fn reset(&self) {
        *self.inner.lock() = MockLongSyncInner::default();
    }

    /// Number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

impl LongSync for MockLongSync {
    fn start_long_sync(&self, full: bool) {
        let outcome = {
            let mut inner = self.inner.lock();
            inner.calls += 1;
            inner.last_full = Some(full);
            inner.last_started = Some(next_sequence());
            inner.outcome
        };
        if outcome == LongSyncOutcome::Completed {
            self.complete();
        }
    }

    fn register_listener(&self, listener: Weak<dyn LongSyncListener>) {
        self.listeners.register(listener);
    }

    fn unregister_listener(&self, listener: &Weak<dyn LongSyncListener>) {
        self.listeners.unregister(listener);
    }
}

// ============================================================================
// Realtime sync
// ============================================================================

/// Realtime sync double. Operational by default, init succeeds by default.
#[derive(Debug, Clone)]
pub struct MockRealtimeSync {
    inner: Arc<Mutex<MockRealtimeSyncInner>>,
    listeners: Arc<Listeners<dyn RealtimeSyncListener>>,
}

#[derive(Debug)]
struct MockRealtimeSyncInner {
    outcome: RealtimeOutcome,
    init_fails: bool,
    operational: bool,
    sync_calls: usize,
    init_calls: usize,
    shut_down_calls: usize,
    last_started: Option<u64>,
}

impl Default for MockRealtimeSyncInner {
    fn default() -> Self {
        Self {
            outcome: RealtimeOutcome::Quiet,
            init_fails: false,
            operational: true,
            sync_calls: 0,
            init_calls: 0,
            shut_down_calls: 0,
            last_started: None,
        }
    }
}

impl MockRealtimeSync {
    /// Create an operational double whose init succeeds.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(MockRealtimeSyncInner::default())),
            listeners: Arc::new(Listeners::new()),
        }
    }

    /// Script what subsequent sync attempts report.
    pub fn set_outcome(&self, outcome: RealtimeOutcome) {
        self.inner.lock().outcome = outcome;
    }

    /// Make subsequent inits fail (or succeed).
    pub fn set_init_fails(&self, fails: bool) {
        self.inner.lock().init_fails = fails;
    }

    /// Force the operational flag without notifying anyone.
    pub fn set_operational(&self, operational: bool) {
        self.inner.lock().operational = operational;
    }

    /// Current operational flag.
    pub fn operational(&self) -> bool {
        self.inner.lock().operational
    }

    /// Number of sync attempts.
    pub fn sync_calls(&self) -> usize {
        self.inner.lock().sync_calls
    }

    /// Number of init requests.
    pub fn init_calls(&self) -> usize {
        self.inner.lock().init_calls
    }

    /// Number of shut-down requests.
    pub fn shut_down_calls(&self) -> usize {
        self.inner.lock().shut_down_calls
    }

    /// Sequence number of the last sync attempt.
    pub fn last_started(&self) -> Option<u64> {
        self.inner.lock().last_started
    }

    /// Drop the channel unsolicited and notify listeners.
    pub fn spurious_shut_down(&self) {
        self.inner.lock().operational = false;
        self.listeners.notify(|l| l.on_realtime_shut_down());
    }

    /// Report `outcome` to listeners now. `Quiet` reports nothing.
    pub fn complete(&self, outcome: RealtimeOutcome) {
        match outcome {
            RealtimeOutcome::Quiet => {}
            RealtimeOutcome::Unsuccessful => self
                .listeners
                .notify(|l| l.on_realtime_response_unsuccessful()),
            RealtimeOutcome::TimedOut => self.listeners.notify(|l| l.on_realtime_sync_timed_out()),
        }
    }

    /// Zero the counters, keeping scripted behaviour and the operational flag.
    pub fn reset_counters(&self) {
        let mut inner = self.inner.lock();
        inner.sync_calls = 0;
        inner.init_calls = 0;
        inner.shut_down_calls = 0;
        inner.last_started = None;
    }

    /// Zero the counters and script quiet attempts with a succeeding init.
    ///
    /// The operational flag is left as is.
    pub fn reset(&self) {
        let mut inner = self.inner.lock();
        let operational = inner.operational;
        *inner = MockRealtimeSyncInner {
            operational,
            ..MockRealtimeSyncInner::default()
        };
    }

    /// Number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

impl Default for MockRealtimeSync {
    fn default() -> Self {
        Self::new()
    }
}

impl RealtimeSync for MockRealtimeSync {
    fn init_for_operation(&self) {
        let fails = {
            let mut inner = self.inner.lock();
            inner.init_calls += 1;
            inner.operational = !inner.init_fails;
            inner.init_fails
        };
        if fails {
            self.listeners.notify(|l| l.on_realtime_init_failed());
        } else {
            self.listeners.notify(|l| l.on_realtime_init_succeeded());
        }
    }

    fn shut_down(&self) {
        let mut inner = self.inner.lock();
        inner.shut_down_calls += 1;
        inner.operational = false;
    }

    fn is_operational(&self) -> bool {
        self.operational()
    }

    fn start_realtime_sync(&self) {
        let outcome = {
            let mut inner = self.inner.lock();
            inner.sync_calls += 1;
            inner.last_started = Some(next_sequence());
            inner.outcome
        };
        self.complete(outcome);
    }

    fn register_listener(&self, listener: Weak<dyn RealtimeSyncListener>) {
        self.listeners.register(listener);
    }

    fn unregister_listener(&self, listener: &Weak<dyn RealtimeSyncListener>) {
        self.listeners.unregister(listener);
    }
}

// ============================================================================
// Bundle
// ============================================================================

/// Registration counts per notifying collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ListenerCounts {
    /// Foreground state registrations.
    pub foreground: usize,
    /// Request/response sync registrations.
    pub http: usize,
    /// Long-poll sync registrations.
    pub long_sync: usize,
    /// Realtime sync registrations.
    pub realtime: usize,
}

impl ListenerCounts {
    /// Sum over all four collaborators.
    pub fn total(&self) -> usize {
        self.foreground + self.http + self.long_sync + self.realtime
    }
}

/// One double per collaborator.
#[derive(Debug, Clone, Default)]
pub struct MockCollaborators {
    /// Login state.
    pub login: MockLoginState,
    /// Preferences.
    pub preferences: MockSyncPreferences,
    /// Foreground state.
    pub foreground: MockAppForegroundState,
    /// Request/response sync.
    pub http: MockHttpSync,
    /// Long-poll sync.
    pub long_sync: MockLongSync,
    /// Realtime sync.
    pub realtime: MockRealtimeSync,
}

impl MockCollaborators {
    /// Create doubles in their default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Handles for [`crate::SyncOrchestrator::new`], sharing state with `self`.
    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            login: Arc::new(self.login.clone()),
            preferences: Arc::new(self.preferences.clone()),
            foreground: Arc::new(self.foreground.clone()),
            http: Arc::new(self.http.clone()),
            long_sync: Arc::new(self.long_sync.clone()),
            realtime: Arc::new(self.realtime.clone()),
        }
    }

    /// Current registration counts.
    pub fn listener_counts(&self) -> ListenerCounts {
        ListenerCounts {
            foreground: self.foreground.listener_count(),
            http: self.http.listener_count(),
            long_sync: self.long_sync.listener_count(),
            realtime: self.realtime.listener_count(),
        }
    }

    /// Reset the sync doubles' counters and scripted outcomes.
    ///
    /// Login, preferences, foreground state, the realtime operational flag
    /// and listener registrations are kept.
    pub fn reset_test_state(&self) {
        self.http.reset();
        self.long_sync.reset();
        self.realtime.reset();
    }
}
