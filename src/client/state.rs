//! The allocation state machine of §4.4:
//!
//! ```text
//! NOT_GRANTED ──submit success──▶ GRANTED ──job-complete/scancel──▶ REVOKED
//!      │                              │
//!      └──submit failure / signal─────┴──complete()────────────────▶ REVOKED
//! ```
//!
//! Owned by a single actor ([`super::allocation::AllocationClient`])
//! behind a `Mutex`/`Condvar` pair so the supervisor cannot fork before
//! the listener has observed `GRANTED` (§9 ordering guarantee).

use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};

/// One point in the state machine above.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocState {
    NotGranted,
    Granted,
    Revoked,
}

/// Shared, lock-guarded allocation state plus the condition variable the
/// supervisor blocks on while waiting for `GRANTED`.
pub struct SharedAllocState {
    state: Mutex<AllocState>,
    cond: Condvar,
}

impl SharedAllocState {
    pub fn new() -> Self {
        SharedAllocState {
            state: Mutex::new(AllocState::NotGranted),
            cond: Condvar::new(),
        }
    }

    /// Current state, without waiting.
    pub fn get(&self) -> AllocState {
        *self.state.lock().unwrap()
    }

    /// `NOT_GRANTED -> GRANTED`, refusing the transition if already
    /// `REVOKED` (a job-complete notice raced the grant). Returns the
    /// resulting state so the caller can tell whether it actually won.
    pub fn mark_granted(&self) -> AllocState {
        let mut guard = self.state.lock().unwrap();
        if *guard == AllocState::NotGranted {
            *guard = AllocState::Granted;
        }
        self.cond.notify_all();
        *guard
    }

    /// Unconditional transition to `REVOKED`, from any prior state.
    pub fn mark_revoked(&self) {
        let mut guard = self.state.lock().unwrap();
        *guard = AllocState::Revoked;
        self.cond.notify_all();
    }

    /// Block until the state is no longer `NOT_GRANTED`, or `timeout`
    /// elapses. Returns the observed state; a timed-out wait reports
    /// whatever state was last seen (still `NOT_GRANTED` on timeout).
    pub fn wait_for_decision(&self, timeout: Duration) -> AllocState {
        let guard = self.state.lock().unwrap();
        let deadline = Instant::now() + timeout;
        let (guard, _) = self
            .cond
            .wait_timeout_while(guard, timeout, |s| {
                *s == AllocState::NotGranted && Instant::now() < deadline
            })
            .unwrap();
        *guard
    }
}

impl Default for SharedAllocState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn starts_not_granted() {
        let s = SharedAllocState::new();
        assert_eq!(s.get(), AllocState::NotGranted);
    }

    #[test]
    fn mark_granted_transitions_once() {
        let s = SharedAllocState::new();
        assert_eq!(s.mark_granted(), AllocState::Granted);
        assert_eq!(s.get(), AllocState::Granted);
    }

    #[test]
    fn revoked_before_grant_wins() {
        let s = SharedAllocState::new();
        s.mark_revoked();
        assert_eq!(s.mark_granted(), AllocState::Revoked);
    }

    #[test]
    fn waiting_thread_observes_grant_from_another_thread() {
        let s = Arc::new(SharedAllocState::new());
        let s2 = Arc::clone(&s);
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            s2.mark_granted();
        });
        let observed = s.wait_for_decision(Duration::from_secs(5));
        handle.join().unwrap();
        assert_eq!(observed, AllocState::Granted);
    }

    #[test]
    fn wait_times_out_while_still_not_granted() {
        let s = SharedAllocState::new();
        let observed = s.wait_for_decision(Duration::from_millis(10));
        assert_eq!(observed, AllocState::NotGranted);
    }
}
