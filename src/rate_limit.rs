use std::sync::{Arc, Mutex, TryLockError};
use std::time::{Duration, Instant};

use rand::RngExt;

use crate::clock::{CancelToken, Clock, Interrupted};
use crate::util::lock_unpoisoned;

/// Source of the random extra delay added after pacing.
///
/// Returning `None` (entropy unavailable, source exhausted) degrades to zero
/// jitter; it never fails the wait.
pub trait JitterSource: Send + Sync {
    fn sample(&self, max: Duration) -> Option<Duration>;
}

#[derive(Debug, Default)]
pub struct RandomJitter;

impl JitterSource for RandomJitter {
    fn sample(&self, max: Duration) -> Option<Duration> {
        let max_nanos = max.as_nanos().min(u64::MAX as u128) as u64;
        if max_nanos == 0 {
            return None;
        }
        let mut rng = rand::rng();
        Some(Duration::from_nanos(rng.random_range(0..max_nanos)))
    }
}

/// Enforces a minimum spacing between outbound requests plus random jitter.
///
/// The whole wait, sleeps included, runs under one lock, so concurrent callers
/// queue up behind each other and the total request rate stays bounded no
/// matter how many threads share the limiter.
pub struct RateLimiter {
    min_delay: Duration,
    jitter_max: Duration,
    clock: Arc<dyn Clock>,
    jitter: Arc<dyn JitterSource>,
    last_request_at: Mutex<Option<Instant>>,
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("RateLimiter")
            .field("min_delay", &self.min_delay)
            .field("jitter_max", &self.jitter_max)
            .field("last_request_at", &self.peek_last_request_at())
            .finish()
    }
}

impl RateLimiter {
    pub fn new(min_delay: Duration, jitter_max: Duration, clock: Arc<dyn Clock>) -> Self {
        Self::with_jitter_source(min_delay, jitter_max, clock, Arc::new(RandomJitter))
    }

    pub fn with_jitter_source(
        min_delay: Duration,
        jitter_max: Duration,
        clock: Arc<dyn Clock>,
        jitter: Arc<dyn JitterSource>,
    ) -> Self {
        Self {
            min_delay,
            jitter_max,
            clock,
            jitter,
            last_request_at: Mutex::new(None),
        }
    }

    pub fn min_delay(&self) -> Duration {
        self.min_delay
    }

    pub fn jitter_max(&self) -> Duration {
        self.jitter_max
    }

    /// Blocks while another caller is inside [`RateLimiter::wait`].
    pub fn last_request_at(&self) -> Option<Instant> {
        *lock_unpoisoned(&self.last_request_at)
    }

    /// Blocks until the next request may go out and returns how long it slept.
    ///
    /// On cancellation the recorded request time is left untouched.
    pub fn wait(&self, cancel: &CancelToken) -> Result<Duration, Interrupted> {
        let mut last_request_at = lock_unpoisoned(&self.last_request_at);
        let mut waited = Duration::ZERO;

        if let Some(previous) = *last_request_at {
            let elapsed = self.clock.now().saturating_duration_since(previous);
            if elapsed < self.min_delay {
                let pause = self.min_delay - elapsed;
                self.clock.sleep(pause, cancel)?;
                waited += pause;
            }
        }

        let jitter = self.sample_jitter();
        if !jitter.is_zero() {
            self.clock.sleep(jitter, cancel)?;
            waited += jitter;
        }

        *last_request_at = Some(self.clock.now());
        Ok(waited)
    }

    pub fn reset(&self) {
        *lock_unpoisoned(&self.last_request_at) = None;
    }

    fn peek_last_request_at(&self) -> Result<Option<Instant>, &'static str> {
        match self.last_request_at.try_lock() {
            Ok(guard) => Ok(*guard),
            Err(TryLockError::Poisoned(poisoned)) => Ok(*poisoned.into_inner()),
            Err(TryLockError::WouldBlock) => Err("<caller waiting>"),
        }
    }

    fn sample_jitter(&self) -> Duration {
        if self.jitter_max.is_zero() {
            return Duration::ZERO;
        }
        self.jitter
            .sample(self.jitter_max)
            .filter(|jitter| *jitter < self.jitter_max)
            .unwrap_or(Duration::ZERO)
    }
}
