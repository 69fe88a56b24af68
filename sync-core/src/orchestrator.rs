//! The sync orchestrator.
//!
//! [`SyncOrchestrator`] interprets the pure [`SyncMachine`]: for every event
//! it captures the query collaborators' answers, computes the transition,
//! commits the new machine value and executes the resulting actions against
//! the collaborators.
//!
//! # Locking
//!
//! All state reads, transitions and action dispatch happen under one
//! `parking_lot::ReentrantMutex`. Every public entry point locks it exactly
//! once, handles one event in a single `apply` routine, and releases it
//! with `unlock_fair` so waiting callers are admitted in order.
//!
//! The lock is re-entrant only so that a collaborator may report an outcome
//! synchronously from inside its start call on the calling thread. Actions
//! never block on a collaborator's result, so the lock is held just for the
//! decide-and-dispatch step.
//!
//! # Lifecycle
//!
//! One orchestrator per authenticated session. Call [`SyncOrchestrator::reset`]
//! at logout; it returns to idle and removes every listener registration.

use parking_lot::{ReentrantMutex, ReentrantMutexGuard};
use std::cell::Cell;
use std::fmt;
use std::sync::{Arc, Weak};
use sync_types::{SyncSnapshot, SyncState};

use crate::collaborators::{
    AppForegroundListener, Collaborators, HttpSyncListener, LongSyncListener,
    RealtimeSyncListener,
};
use crate::machine::{Action, Event, Facts, SyncMachine};

/// Decides which sync strategy runs and reacts to their outcomes.
pub struct SyncOrchestrator {
    collaborators: Collaborators,
    machine: ReentrantMutex<Cell<SyncMachine>>,
    this: Weak<SyncOrchestrator>,
}

impl SyncOrchestrator {
    /// Create an idle orchestrator for one session.
    ///
    /// Nothing is registered with the collaborators until the first
    /// transition away from idle.
    pub fn new(collaborators: Collaborators) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            collaborators,
            machine: ReentrantMutex::new(Cell::new(SyncMachine::new())),
            this: this.clone(),
        })
    }

    /// Request a sync cycle, if the current state allows one.
    ///
    /// Ignored when no user is logged in or an operation is already
    /// outstanding. In Realtime every call starts another realtime attempt.
    pub fn start_sync(&self) {
        self.dispatch(Event::SyncRequested);
    }

    /// Force the orchestrator back to idle.
    ///
    /// Shuts realtime down unconditionally, clears the in-flight flag and
    /// de-registers from every collaborator. Callable from any state.
    pub fn reset(&self) {
        self.dispatch(Event::Reset);
    }

    /// Current state.
    pub fn snapshot(&self) -> SyncSnapshot {
        let guard = self.machine.lock();
        let snapshot = SyncSnapshot::new(guard.get().state());
        ReentrantMutexGuard::unlock_fair(guard);
        snapshot
    }

    /// Shorthand for `snapshot().state`.
    pub fn state(&self) -> SyncState {
        self.snapshot().state
    }

    fn dispatch(&self, event: Event) {
        let guard = self.machine.lock();
        self.apply(&guard, event);
        ReentrantMutexGuard::unlock_fair(guard);
    }

    /// Handle one event. Must be called with the lock held.
    fn apply(&self, machine: &Cell<SyncMachine>, event: Event) {
        let current = machine.get();
        let facts = self.facts();
        tracing::debug!(state = %current.state(), %event, "handling event");

        let (next, actions) = current.on_event(facts, event);

        if next == current && actions.is_empty() {
            if event.is_sync_request() && !facts.user_logged_in {
                tracing::debug!("no logged in user - sync request ignored");
            } else {
                tracing::debug!(state = %current.state(), %event, "event ignored");
            }
            return;
        }

        machine.set(next);
        if next.state() != current.state() {
            tracing::info!(
                from = %current.state(),
                to = %next.state(),
                %event,
                "sync state changed"
            );
        }

        for action in actions {
            self.execute(action);
        }
    }

    fn facts(&self) -> Facts {
        let c = &self.collaborators;
        Facts {
            user_logged_in: c.login.is_user_logged_in(),
            waiting_for_first_ever_sync: c.preferences.is_waiting_for_first_ever_sync(),
            app_in_foreground: c.foreground.is_app_in_foreground(),
            realtime_operational: c.realtime.is_operational(),
        }
    }

    fn execute(&self, action: Action) {
        tracing::debug!(%action, "executing");
        let c = &self.collaborators;
        match action {
            Action::RegisterListeners => self.register_listeners(),
            Action::UnregisterListeners => self.unregister_listeners(),
            Action::MarkFirstEverSyncCompleted => {
                tracing::info!("first ever sync completed");
                c.preferences.set_first_ever_sync_completed();
            }
            Action::ShutDownRealtime => c.realtime.shut_down(),
            Action::StartHttpSync => c.http.start_http_sync(),
            Action::StartLongSync { full } => c.long_sync.start_long_sync(full),
            Action::InitRealtime => c.realtime.init_for_operation(),
            Action::StartRealtimeSync => c.realtime.start_realtime_sync(),
        }
    }

    fn register_listeners(&self) {
        let c = &self.collaborators;
        c.http.register_listener(self.this.clone());
        c.realtime.register_listener(self.this.clone());
        c.long_sync.register_listener(self.this.clone());
        c.foreground.register_listener(self.this.clone());
    }

    fn unregister_listeners(&self) {
        let c = &self.collaborators;
        let http: Weak<dyn HttpSyncListener> = self.this.clone();
        let realtime: Weak<dyn RealtimeSyncListener> = self.this.clone();
        let long_sync: Weak<dyn LongSyncListener> = self.this.clone();
        let foreground: Weak<dyn AppForegroundListener> = self.this.clone();
        c.http.unregister_listener(&http);
        c.realtime.unregister_listener(&realtime);
        c.long_sync.unregister_listener(&long_sync);
        c.foreground.unregister_listener(&foreground);
    }
}

impl fmt::Debug for SyncOrchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let guard = self.machine.lock();
        let machine = guard.get();
        drop(guard);
        f.debug_struct("SyncOrchestrator")
            .field("state", &machine.state())
            .field(
                "fallback_attempt_in_progress",
                &machine.fallback_attempt_in_progress(),
            )
            .finish()
    }
}

impl HttpSyncListener for SyncOrchestrator {
    fn on_http_sync_completed(&self) {
        self.dispatch(Event::HttpCompleted);
    }

    fn on_http_response_unsuccessful(&self) {
        self.dispatch(Event::HttpResponseUnsuccessful);
    }

    fn on_http_sync_timed_out(&self) {
        self.dispatch(Event::HttpTimedOut);
    }
}

impl LongSyncListener for SyncOrchestrator {
    fn on_long_sync_completed(&self) {
        self.dispatch(Event::LongSyncCompleted);
    }
}

impl RealtimeSyncListener for SyncOrchestrator {
    fn on_realtime_init_succeeded(&self) {
        self.dispatch(Event::RealtimeInitSucceeded);
    }

    fn on_realtime_init_failed(&self) {
        self.dispatch(Event::RealtimeInitFailed);
    }

    fn on_realtime_response_unsuccessful(&self) {
        self.dispatch(Event::RealtimeResponseUnsuccessful);
    }

    fn on_realtime_sync_timed_out(&self) {
        self.dispatch(Event::RealtimeTimedOut);
    }

    fn on_realtime_shut_down(&self) {
        self.dispatch(Event::RealtimeShutDown);
    }
}

impl AppForegroundListener for SyncOrchestrator {
    fn on_transition_to_foreground(&self) {
        self.dispatch(Event::AppForegrounded);
    }

    fn on_transition_to_background(&self) {
        self.dispatch(Event::AppBackgrounded);
    }
}
