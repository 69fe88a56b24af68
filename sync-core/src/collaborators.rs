//! Collaborator contracts consumed by the orchestrator.
//!
//! The orchestrator never talks to the network, the preferences store or the
//! host platform directly. Each of those is a collaborator behind a trait so
//! any conforming implementation (real transport, test double) can be
//! plugged in.
//!
//! # Design
//!
//! - Query collaborators (`LoginState`, `SyncPreferences`) are plain
//!   synchronous calls.
//! - Notifying collaborators (`AppForegroundState`, `HttpSync`, `LongSync`,
//!   `RealtimeSync`) accept listeners as `Weak` handles, so a collaborator
//!   never keeps an orchestrator alive. Listeners are identified by pointer.
//! - "Start" calls are fire-and-forget. Outcomes come back later through the
//!   listener, from any thread, possibly synchronously from inside the start
//!   call itself.

use parking_lot::Mutex;
use std::fmt;
use std::sync::{Arc, Weak};

/// Whether a user is authenticated.
pub trait LoginState: Send + Sync {
    /// Check if a user is currently logged in.
    fn is_user_logged_in(&self) -> bool;
}

/// Durable sync preferences.
pub trait SyncPreferences: Send + Sync {
    /// Check if the one-time full bootstrap has never completed.
    fn is_waiting_for_first_ever_sync(&self) -> bool;

    /// Persist that the first-ever sync completed. Idempotent.
    fn set_first_ever_sync_completed(&self);
}

/// Receives host application visibility changes.
pub trait AppForegroundListener: Send + Sync {
    /// The application became visible.
    fn on_transition_to_foreground(&self);
    /// The application was hidden.
    fn on_transition_to_background(&self);
}

/// Host application visibility.
pub trait AppForegroundState: Send + Sync {
    /// Check if the application is currently visible.
    fn is_app_in_foreground(&self) -> bool;
    /// Start delivering notifications to `listener`.
    fn register_listener(&self, listener: Weak<dyn AppForegroundListener>);
    /// Stop delivering notifications to `listener`.
    fn unregister_listener(&self, listener: &Weak<dyn AppForegroundListener>);
}

/// Receives request/response sync outcomes.
pub trait HttpSyncListener: Send + Sync {
    /// The sync finished successfully.
    fn on_http_sync_completed(&self);
    /// The server answered, but rejected the client's state.
    fn on_http_response_unsuccessful(&self);
    /// No answer in time.
    fn on_http_sync_timed_out(&self);
}

/// Request/response sync.
pub trait HttpSync: Send + Sync {
    /// Start a sync. Returns immediately.
    fn start_http_sync(&self);
    /// Start delivering outcomes to `listener`.
    fn register_listener(&self, listener: Weak<dyn HttpSyncListener>);
    /// Stop delivering outcomes to `listener`.
    fn unregister_listener(&self, listener: &Weak<dyn HttpSyncListener>);
}

/// Receives long-poll sync outcomes.
pub trait LongSyncListener: Send + Sync {
    /// The sync finished. Full and partial syncs report the same way.
    fn on_long_sync_completed(&self);
}

/// Long-poll sync: ask the server to prepare a response, then poll for it.
pub trait LongSync: Send + Sync {
    /// Start a sync. With `full`, local data is replaced by the server's.
    fn start_long_sync(&self, full: bool);
    /// Start delivering outcomes to `listener`.
    fn register_listener(&self, listener: Weak<dyn LongSyncListener>);
    /// Stop delivering outcomes to `listener`.
    fn unregister_listener(&self, listener: &Weak<dyn LongSyncListener>);
}

/// Receives realtime channel outcomes.
pub trait RealtimeSyncListener: Send + Sync {
    /// The channel is ready.
    fn on_realtime_init_succeeded(&self);
    /// The channel could not be established.
    fn on_realtime_init_failed(&self);
    /// The server rejected the client's state.
    fn on_realtime_response_unsuccessful(&self);
    /// No answer in time.
    fn on_realtime_sync_timed_out(&self);
    /// The channel went down. May arrive unsolicited.
    fn on_realtime_shut_down(&self);
}

/// Persistent low-latency sync channel.
pub trait RealtimeSync: Send + Sync {
    /// Establish the channel. The outcome arrives via the listener.
    fn init_for_operation(&self);
    /// Request the channel to stop. Safe to call when not operational.
    fn shut_down(&self);
    /// Check if the channel is currently usable.
    fn is_operational(&self) -> bool;
    /// Start a sync attempt over the channel.
    fn start_realtime_sync(&self);
    /// Start delivering outcomes to `listener`.
    fn register_listener(&self, listener: Weak<dyn RealtimeSyncListener>);
    /// Stop delivering outcomes to `listener`.
    fn unregister_listener(&self, listener: &Weak<dyn RealtimeSyncListener>);
}

/// Handles to every collaborator an orchestrator needs.
#[derive(Clone)]
pub struct Collaborators {
    /// Login state query.
    pub login: Arc<dyn LoginState>,
    /// First-ever-sync persistence.
    pub preferences: Arc<dyn SyncPreferences>,
    /// Application visibility.
    pub foreground: Arc<dyn AppForegroundState>,
    /// Request/response sync.
    pub http: Arc<dyn HttpSync>,
    /// Long-poll sync.
    pub long_sync: Arc<dyn LongSync>,
    /// Realtime sync.
    pub realtime: Arc<dyn RealtimeSync>,
}

impl fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collaborators").finish_non_exhaustive()
    }
}

/// Listener bookkeeping for collaborator implementations.
///
/// Registration is not de-duplicated: registering the same listener twice
/// delivers twice, which keeps duplicate registrations observable.
pub struct Listeners<L: ?Sized> {
    entries: Mutex<Vec<Weak<L>>>,
}

impl<L: ?Sized> Listeners<L> {
    /// Create an empty set.
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
        }
    }

    /// Add a listener.
    pub fn register(&self, listener: Weak<L>) {
        self.entries.lock().push(listener);
    }

    /// Remove every registration of `listener`.
    pub fn unregister(&self, listener: &Weak<L>) {
        self.entries
            .lock()
            .retain(|entry| !Weak::ptr_eq(entry, listener));
    }

    /// Number of registrations, live or not.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Check if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Strong handles to the listeners that are still alive.
    ///
    /// The internal lock is released before this returns, so callers may
    /// notify the listeners even if a listener re-enters the collaborator.
    pub fn live(&self) -> Vec<Arc<L>> {
        self.entries.lock().iter().filter_map(Weak::upgrade).collect()
    }

    /// Invoke `notify` on every live listener.
    pub fn notify(&self, mut notify: impl FnMut(&L)) {
        for listener in self.live() {
            notify(&listener);
        }
    }
}

impl<L: ?Sized> Default for Listeners<L> {
    fn default() -> Self {
        Self::new()
    }
}

impl<L: ?Sized> fmt::Debug for Listeners<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listeners")
            .field("len", &self.len())
            .finish()
    }
}
