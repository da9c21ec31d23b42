//! # Lifecycle Latch
//!
//! A small start/stop state machine shared by [`Worker`](crate::Worker) and
//! [`Logger`](crate::Logger):
//!
//! ```text
//! NotStarted ─► Starting ─► Started ─► Stopping ─► Stopped
//!                  ▲                                  │
//!                  └──────────────────────────────────┘
//! ```
//!
//! Every transition is idempotent. [`Latch::wait_started`] and
//! [`Latch::wait_stopped`] block until the matching state has been reached
//! and return immediately if it already was.

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

/// The lifecycle states a [`Latch`] moves through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    NotStarted,
    Starting,
    Started,
    Stopping,
    Stopped,
}

#[derive(Debug)]
struct Inner {
    state: State,
    /// Set when `Started` is reached, cleared on the next `Starting`.
    reached_started: bool,
    /// Set when `Stopped` is reached, cleared on the next `Starting`.
    reached_stopped: bool,
}

/// Reusable lifecycle state machine with blocking completion signals.
#[derive(Debug)]
pub struct Latch {
    inner: Mutex<Inner>,
    changed: Condvar,
}

impl Default for Latch {
    fn default() -> Self {
        Self::new()
    }
}

impl Latch {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                state: State::NotStarted,
                reached_started: false,
                reached_stopped: false,
            }),
            changed: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the current state.
    pub fn state(&self) -> State {
        self.lock().state
    }

    /// Moves to `Starting`. A no-op while already starting or started.
    pub fn starting(&self) {
        let mut inner = self.lock();
        if matches!(inner.state, State::Starting | State::Started) {
            return;
        }
        inner.state = State::Starting;
        inner.reached_started = false;
        inner.reached_stopped = false;
    }

    /// Moves to `Started` and wakes every [`wait_started`](Self::wait_started) caller.
    ///
    /// A no-op once stopping has begun; only [`starting`](Self::starting)
    /// leaves `Stopping` or `Stopped`.
    pub fn started(&self) {
        let mut inner = self.lock();
        if matches!(inner.state, State::Started | State::Stopping | State::Stopped) {
            return;
        }
        inner.state = State::Started;
        inner.reached_started = true;
        self.changed.notify_all();
    }

    /// Moves to `Stopping`. A no-op while already stopping or stopped.
    pub fn stopping(&self) {
        let mut inner = self.lock();
        if matches!(inner.state, State::Stopping | State::Stopped) {
            return;
        }
        inner.state = State::Stopping;
    }

    /// Moves to `Stopped` and wakes every [`wait_stopped`](Self::wait_stopped) caller.
    pub fn stopped(&self) {
        let mut inner = self.lock();
        if inner.state == State::Stopped {
            return;
        }
        inner.state = State::Stopped;
        inner.reached_stopped = true;
        self.changed.notify_all();
    }

    pub fn is_started(&self) -> bool {
        self.state() == State::Started
    }

    pub fn is_stopping(&self) -> bool {
        self.state() == State::Stopping
    }

    pub fn is_stopped(&self) -> bool {
        self.state() == State::Stopped
    }

    /// Blocks until `Started` has been reached, or `Stopped` if the latch
    /// was stopped before it ever started.
    pub fn wait_started(&self) {
        let inner = self.lock();
        let _inner = self
            .changed
            .wait_while(inner, |inner| !inner.reached_started && !inner.reached_stopped)
            .unwrap_or_else(PoisonError::into_inner);
    }

    /// Blocks until `Stopped` has been reached.
    pub fn wait_stopped(&self) {
        let inner = self.lock();
        let _inner = self
            .changed
            .wait_while(inner, |inner| !inner.reached_stopped)
            .unwrap_or_else(PoisonError::into_inner);
    }
}
