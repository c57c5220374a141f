//! Sealable latch: "signal now, or promise no more signals will ever come".
//!
//! A counting handoff for producers that do not know how much work there is. Waiters park while
//! nothing is pending and the latch is open; sealing releases every current and future waiter once
//! pending signals are drained.

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

#[derive(Debug, Default)]
struct LatchState {
    pending: usize,
    sealed: bool,
}

/// How a wait on a [`SealableLatch`] ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LatchWait {
    /// A pending signal was consumed.
    Signalled,
    /// Sealed with nothing pending.
    Sealed,
    TimedOut,
}

#[derive(Debug, Default)]
pub struct SealableLatch {
    state: Mutex<LatchState>,
    cond: Condvar,
}

impl SealableLatch {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, LatchState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record one unit of work and wake a waiter.
    pub fn signal(&self) {
        let mut state = self.lock();
        state.pending += 1;
        drop(state);
        self.cond.notify_one();
    }

    /// No more signals will come. Idempotent; wakes every waiter.
    pub fn seal(&self) {
        let mut state = self.lock();
        state.sealed = true;
        drop(state);
        self.cond.notify_all();
    }

    pub fn is_sealed(&self) -> bool {
        self.lock().sealed
    }

    /// Signals recorded but not yet consumed.
    pub fn pending(&self) -> usize {
        self.lock().pending
    }

    /// Block until a signal can be consumed or the latch is sealed. Never blocks once sealed.
    pub fn wait(&self) -> LatchWait {
        let state = self.lock();
        let mut state = self
            .cond
            .wait_while(state, |s| s.pending == 0 && !s.sealed)
            .unwrap_or_else(PoisonError::into_inner);
        Self::consume(&mut state)
    }

    /// [`wait`](Self::wait) bounded by `timeout`.
    pub fn wait_timeout(&self, timeout: Duration) -> LatchWait {
        let Some(deadline) = Instant::now().checked_add(timeout) else {
            return self.wait();
        };
        let mut state = self.lock();
        while state.pending == 0 && !state.sealed {
            let now = Instant::now();
            if now >= deadline {
                return LatchWait::TimedOut;
            }
            let (guard, _) = self
                .cond
                .wait_timeout(state, deadline - now)
                .unwrap_or_else(PoisonError::into_inner);
            state = guard;
        }
        Self::consume(&mut state)
    }

    fn consume(state: &mut LatchState) -> LatchWait {
        if state.pending > 0 {
            state.pending -= 1;
            LatchWait::Signalled
        } else {
            LatchWait::Sealed
        }
    }
}
