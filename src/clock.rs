//! Time source and cancellation primitives.
//!
//! Every pause the client takes (pacing, jitter, backoff) goes through a
//! [`Clock`], so tests can swap in a [`ManualClock`] and assert on virtual time
//! instead of sleeping for real.

use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant, SystemTime};

use thiserror::Error;

use crate::util::lock_unpoisoned;

/// A sleep was cut short because its [`CancelToken`] fired.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Error)]
#[error("sleep interrupted by cancellation")]
pub struct Interrupted;

pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;

    fn now_system(&self) -> SystemTime;

    /// Blocks the calling thread for `duration`, returning early with
    /// [`Interrupted`] when `cancel` fires.
    fn sleep(&self, duration: Duration, cancel: &CancelToken) -> Result<(), Interrupted>;
}

#[derive(Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn now_system(&self) -> SystemTime {
        SystemTime::now()
    }

    fn sleep(&self, duration: Duration, cancel: &CancelToken) -> Result<(), Interrupted> {
        if cancel.wait_timeout(duration) {
            return Err(Interrupted);
        }
        Ok(())
    }
}

#[derive(Debug)]
struct ManualClockState {
    offset: Duration,
    sleeps: Vec<Duration>,
}

/// Virtual clock: sleeping advances time instantly.
#[derive(Debug)]
pub struct ManualClock {
    origin: Instant,
    system_origin: SystemTime,
    state: Mutex<ManualClockState>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            system_origin: SystemTime::now(),
            state: Mutex::new(ManualClockState {
                offset: Duration::ZERO,
                sleeps: Vec::new(),
            }),
        }
    }

    pub fn advance(&self, duration: Duration) {
        let mut state = lock_unpoisoned(&self.state);
        state.offset = state.offset.saturating_add(duration);
    }

    /// Virtual time elapsed since construction.
    pub fn elapsed(&self) -> Duration {
        lock_unpoisoned(&self.state).offset
    }

    /// Every non-zero pause requested through [`Clock::sleep`], in order.
    pub fn sleeps(&self) -> Vec<Duration> {
        lock_unpoisoned(&self.state).sleeps.clone()
    }

    pub fn total_slept(&self) -> Duration {
        lock_unpoisoned(&self.state).sleeps.iter().sum()
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + self.elapsed()
    }

    fn now_system(&self) -> SystemTime {
        self.system_origin + self.elapsed()
    }

    fn sleep(&self, duration: Duration, cancel: &CancelToken) -> Result<(), Interrupted> {
        if cancel.is_cancelled() {
            return Err(Interrupted);
        }
        if duration.is_zero() {
            return Ok(());
        }
        let mut state = lock_unpoisoned(&self.state);
        state.offset = state.offset.saturating_add(duration);
        state.sleeps.push(duration);
        Ok(())
    }
}

#[derive(Debug, Default)]
struct CancelState {
    cancelled: Mutex<bool>,
    condvar: Condvar,
}

/// Shared, one-way cancellation flag.
///
/// Clones observe the same flag. Cancelling wakes every thread currently
/// parked in [`SystemClock::sleep`] on this token.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    inner: Arc<CancelState>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        let mut cancelled = lock_unpoisoned(&self.inner.cancelled);
        *cancelled = true;
        self.inner.condvar.notify_all();
    }

    pub fn is_cancelled(&self) -> bool {
        *lock_unpoisoned(&self.inner.cancelled)
    }

    /// Waits up to `timeout`; returns `true` if the token was cancelled.
    pub(crate) fn wait_timeout(&self, timeout: Duration) -> bool {
        let started_at = Instant::now();
        let mut cancelled = lock_unpoisoned(&self.inner.cancelled);
        while !*cancelled {
            let elapsed = started_at.elapsed();
            if elapsed >= timeout {
                return false;
            }
            cancelled = match self.inner.condvar.wait_timeout(cancelled, timeout - elapsed) {
                Ok((guard, _)) => guard,
                Err(poisoned) => poisoned.into_inner().0,
            };
        }
        true
    }
}
