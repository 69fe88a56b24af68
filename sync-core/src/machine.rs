//! Sync orchestration state machine for tidesync.
//!
//! This module provides a pure, side-effect-free state machine that decides
//! which synchronization strategy should run next. It takes an event plus the
//! synchronous answers of the query collaborators ([`Facts`]) as input and
//! produces a new machine value plus a list of actions to execute.
//!
//! Starting operations, (de)registering listeners and persisting the
//! first-ever-sync flag are performed by [`crate::SyncOrchestrator`], which
//! interprets the returned actions. This keeps the whole transition table
//! testable without collaborators.

use std::fmt;
use sync_types::SyncState;

/// Answers of the query collaborators at the moment an event is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Facts {
    /// A user is logged in.
    pub user_logged_in: bool,
    /// The one-time full bootstrap has never completed.
    pub waiting_for_first_ever_sync: bool,
    /// The host application is in the foreground.
    pub app_in_foreground: bool,
    /// The realtime channel reports itself operational.
    pub realtime_operational: bool,
}

impl Default for Facts {
    /// Logged in, foregrounded, first-ever sync already done, realtime down.
    fn default() -> Self {
        Self {
            user_logged_in: true,
            waiting_for_first_ever_sync: false,
            app_in_foreground: true,
            realtime_operational: false,
        }
    }
}

/// Everything the orchestrator reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Event {
    /// A caller asked for a sync cycle.
    SyncRequested,
    /// A caller forced the orchestrator back to idle (e.g. logout).
    Reset,
    /// Request/response sync finished successfully.
    HttpCompleted,
    /// Request/response sync got an "unsuccessful" answer from the server.
    HttpResponseUnsuccessful,
    /// Request/response sync timed out.
    HttpTimedOut,
    /// Long-poll sync finished.
    LongSyncCompleted,
    /// Realtime channel initialized.
    RealtimeInitSucceeded,
    /// Realtime channel could not be initialized.
    RealtimeInitFailed,
    /// Realtime sync got an "unsuccessful" answer from the server.
    RealtimeResponseUnsuccessful,
    /// Realtime sync timed out.
    RealtimeTimedOut,
    /// Realtime channel went down (possibly unsolicited).
    RealtimeShutDown,
    /// The host application came to the foreground.
    AppForegrounded,
    /// The host application went to the background.
    AppBackgrounded,
}

impl Event {
    /// All events, in declaration order.
    pub const ALL: [Event; 13] = [
        Event::SyncRequested,
        Event::Reset,
        Event::HttpCompleted,
        Event::HttpResponseUnsuccessful,
        Event::HttpTimedOut,
        Event::LongSyncCompleted,
        Event::RealtimeInitSucceeded,
        Event::RealtimeInitFailed,
        Event::RealtimeResponseUnsuccessful,
        Event::RealtimeTimedOut,
        Event::RealtimeShutDown,
        Event::AppForegrounded,
        Event::AppBackgrounded,
    ];

    /// Short snake_case name used in logs and the transition table.
    pub fn name(&self) -> &'static str {
        match self {
            Event::SyncRequested => "sync_requested",
            Event::Reset => "reset",
            Event::HttpCompleted => "http_completed",
            Event::HttpResponseUnsuccessful => "http_response_unsuccessful",
            Event::HttpTimedOut => "http_timed_out",
            Event::LongSyncCompleted => "long_sync_completed",
            Event::RealtimeInitSucceeded => "realtime_init_succeeded",
            Event::RealtimeInitFailed => "realtime_init_failed",
            Event::RealtimeResponseUnsuccessful => "realtime_response_unsuccessful",
            Event::RealtimeTimedOut => "realtime_timed_out",
            Event::RealtimeShutDown => "realtime_shut_down",
            Event::AppForegrounded => "app_foregrounded",
            Event::AppBackgrounded => "app_backgrounded",
        }
    }

    /// Check if this event asks for a sync cycle.
    pub fn is_sync_request(&self) -> bool {
        matches!(self, Event::SyncRequested | Event::AppForegrounded)
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Actions to be executed by the orchestrator.
///
/// These are instructions, not side effects. Within one transition the
/// listener actions come first and any `Start*`/`InitRealtime` action comes
/// last, so a collaborator completing synchronously inside its start call
/// already sees the committed state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Register the orchestrator with all four notifying collaborators.
    RegisterListeners,
    /// Remove the orchestrator from all four notifying collaborators.
    UnregisterListeners,
    /// Persist that the first-ever sync has completed.
    MarkFirstEverSyncCompleted,
    /// Ask the realtime collaborator to stop.
    ShutDownRealtime,
    /// Start a request/response sync.
    StartHttpSync,
    /// Start a long-poll sync.
    StartLongSync {
        /// Replace all local data with the server's.
        full: bool,
    },
    /// Ask the realtime collaborator to initialize.
    InitRealtime,
    /// Start a realtime sync attempt.
    StartRealtimeSync,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::RegisterListeners => f.write_str("register_listeners"),
            Action::UnregisterListeners => f.write_str("unregister_listeners"),
            Action::MarkFirstEverSyncCompleted => f.write_str("mark_first_ever_sync_completed"),
            Action::ShutDownRealtime => f.write_str("shut_down_realtime"),
            Action::StartHttpSync => f.write_str("start_http_sync"),
            Action::StartLongSync { full } => write!(f, "start_long_sync(full={})", full),
            Action::InitRealtime => f.write_str("init_realtime"),
            Action::StartRealtimeSync => f.write_str("start_realtime_sync"),
        }
    }
}

/// Orchestration state machine - NO I/O, just state transitions.
///
/// `fallback_attempt_in_progress` is only ever true while the state is
/// [`SyncState::Fallback`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SyncMachine {
    state: SyncState,
    fallback_attempt_in_progress: bool,
}

impl SyncMachine {
    /// Create a new machine in the Idle state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state.
    pub fn state(&self) -> SyncState {
        self.state
    }

    /// Check if a fallback request/response sync is outstanding.
    pub fn fallback_attempt_in_progress(&self) -> bool {
        self.fallback_attempt_in_progress
    }

    /// Process an event and return the new machine plus actions to execute.
    ///
    /// This is a pure function - no side effects. The caller is responsible
    /// for executing the returned actions in order.
    pub fn on_event(self, facts: Facts, event: Event) -> (Self, Vec<Action>) {
        let (next, actions) = self.decide(facts, event);
        let actions = with_listener_actions(self.state, next.state, actions);
        (next, actions)
    }

    fn decide(self, facts: Facts, event: Event) -> (Self, Vec<Action>) {
        use SyncState::*;

        match (self.state, event) {
            (_, Event::Reset) => (Self::new(), vec![Action::ShutDownRealtime]),

            // Sync requests
            (_, e) if e.is_sync_request() && !facts.user_logged_in => (self, vec![]),
            // Nothing is registered while idle, so a foreground notice is stale
            (Idle, Event::AppForegrounded) => (self, vec![]),
            (Idle, Event::SyncRequested) => {
                if facts.waiting_for_first_ever_sync {
                    (
                        self.entering(FirstEverSync),
                        vec![Action::StartLongSync { full: true }],
                    )
                } else {
                    (self.entering(FirstSync), vec![Action::StartHttpSync])
                }
            }
            (Realtime, e) if e.is_sync_request() => (self, vec![Action::StartRealtimeSync]),
            (Fallback, e) if e.is_sync_request() => {
                if self.fallback_attempt_in_progress {
                    (self, vec![])
                } else {
                    (
                        Self {
                            state: Fallback,
                            fallback_attempt_in_progress: true,
                        },
                        vec![Action::StartHttpSync],
                    )
                }
            }
            (_, e) if e.is_sync_request() => (self, vec![]),

            // Request/response outcomes
            (_, Event::HttpCompleted) if self.awaiting_http() => {
                let mut actions = Vec::new();
                if facts.waiting_for_first_ever_sync {
                    actions.push(Action::MarkFirstEverSyncCompleted);
                }
                self.settled().realtime_or_fallback(facts, actions)
            }
            (_, Event::HttpResponseUnsuccessful) if self.awaiting_http() => (
                self.entering(RecoverySync),
                vec![Action::StartLongSync { full: true }],
            ),
            (_, Event::HttpTimedOut) if self.awaiting_http() => (
                self.entering(PostTimeoutSync),
                vec![Action::StartLongSync { full: false }],
            ),

            // Long-poll outcome
            (FirstEverSync | PostTimeoutSync | RecoverySync, Event::LongSyncCompleted) => {
                let mut actions = Vec::new();
                if facts.waiting_for_first_ever_sync {
                    actions.push(Action::MarkFirstEverSyncCompleted);
                }
                self.realtime_or_fallback(facts, actions)
            }

            // Realtime outcomes
            (Idle, Event::RealtimeInitSucceeded | Event::RealtimeInitFailed) => (self, vec![]),
            (_, Event::RealtimeInitSucceeded) => (self.entering(Realtime), vec![]),
            (_, Event::RealtimeInitFailed) => (self.entering(Fallback), vec![]),
            (Realtime, Event::RealtimeResponseUnsuccessful) => {
                let mut actions = Vec::new();
                if facts.realtime_operational {
                    actions.push(Action::ShutDownRealtime);
                }
                actions.push(Action::StartLongSync { full: true });
                (self.entering(RecoverySync), actions)
            }
            (Realtime, Event::RealtimeTimedOut) => (
                self.entering(PostTimeoutSync),
                vec![
                    Action::ShutDownRealtime,
                    Action::StartLongSync { full: false },
                ],
            ),
            (Realtime, Event::RealtimeShutDown) => (self.entering(Fallback), vec![]),

            // Lifecycle
            (Realtime, Event::AppBackgrounded) => {
                (self.entering(Fallback), vec![Action::ShutDownRealtime])
            }

            // Stale or duplicate signals - stay in current state
            _ => (self, vec![]),
        }
    }

    /// Request/response outcomes are honoured only while one can be in flight.
    fn awaiting_http(&self) -> bool {
        match self.state {
            SyncState::FirstSync => true,
            SyncState::Fallback => self.fallback_attempt_in_progress,
            _ => false,
        }
    }

    /// Move to `state`. The in-flight flag survives only Fallback -> Fallback.
    fn entering(self, state: SyncState) -> Self {
        Self {
            state,
            fallback_attempt_in_progress: state == SyncState::Fallback
                && self.fallback_attempt_in_progress,
        }
    }

    fn settled(self) -> Self {
        Self {
            fallback_attempt_in_progress: false,
            ..self
        }
    }

    /// Initialize realtime if the app is visible, otherwise park in Fallback.
    ///
    /// The init outcome callback drives the Realtime/Fallback transition.
    fn realtime_or_fallback(self, facts: Facts, mut actions: Vec<Action>) -> (Self, Vec<Action>) {
        if self.state == SyncState::Realtime {
            return (self, actions);
        }
        if facts.app_in_foreground {
            actions.push(Action::InitRealtime);
            (self, actions)
        } else {
            (self.entering(SyncState::Fallback), actions)
        }
    }
}

/// Listener registration follows the Idle boundary and nothing else.
fn with_listener_actions(from: SyncState, to: SyncState, mut actions: Vec<Action>) -> Vec<Action> {
    if from.is_idle() && !to.is_idle() {
        actions.insert(0, Action::RegisterListeners);
    } else if !from.is_idle() && to.is_idle() {
        actions.insert(0, Action::UnregisterListeners);
    }
    actions
}

/// One row of the transition table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    /// Machine before the event.
    pub from: SyncMachine,
    /// The event.
    pub event: Event,
    /// Machine after the event.
    pub to: SyncMachine,
    /// Actions emitted.
    pub actions: Vec<Action>,
}

impl Transition {
    /// Check if the event changed nothing and emitted nothing.
    pub fn is_ignored(&self) -> bool {
        self.from == self.to && self.actions.is_empty()
    }
}

/// Enumerate every reachable machine value against every event under `facts`.
///
/// Fallback appears twice: with and without an attempt in flight.
pub fn transition_table(facts: Facts) -> Vec<Transition> {
    let mut machines: Vec<SyncMachine> = SyncState::ALL
        .into_iter()
        .map(|state| SyncMachine {
            state,
            fallback_attempt_in_progress: false,
        })
        .collect();
    machines.push(SyncMachine {
        state: SyncState::Fallback,
        fallback_attempt_in_progress: true,
    });

    machines
        .into_iter()
        .flat_map(|from| {
            Event::ALL.into_iter().map(move |event| {
                let (to, actions) = from.on_event(facts, event);
                Transition {
                    from,
                    event,
                    to,
                    actions,
                }
            })
        })
        .collect()
}
