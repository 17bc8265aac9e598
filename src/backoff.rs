use std::collections::BTreeSet;
use std::time::Duration;

use http::StatusCode;

/// Exponential retry delay and status classification.
///
/// `delay(attempt) = min(base * multiplier^attempt, cap)`, computed with
/// integer arithmetic so large attempt numbers saturate at `cap` instead of
/// drifting.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BackoffPolicy {
    base: Duration,
    multiplier: u32,
    cap: Duration,
    retryable_status_codes: BTreeSet<u16>,
}

impl BackoffPolicy {
    pub fn standard() -> Self {
        Self {
            base: Duration::from_secs(1),
            multiplier: 2,
            cap: Duration::from_secs(60),
            retryable_status_codes: default_retryable_status_codes(),
        }
    }

    pub fn base(mut self, base: Duration) -> Self {
        self.base = base;
        self
    }

    pub fn multiplier(mut self, multiplier: u32) -> Self {
        self.multiplier = multiplier.max(1);
        self
    }

    pub fn cap(mut self, cap: Duration) -> Self {
        self.cap = cap;
        self
    }

    pub fn retryable_status_codes(mut self, codes: impl IntoIterator<Item = u16>) -> Self {
        self.retryable_status_codes = codes.into_iter().collect();
        self
    }

    pub fn configured_base(&self) -> Duration {
        self.base
    }

    pub fn configured_cap(&self) -> Duration {
        self.cap
    }

    pub fn delay(&self, attempt: usize) -> Duration {
        if self.base.is_zero() {
            return Duration::ZERO;
        }
        let exponent = u32::try_from(attempt).unwrap_or(u32::MAX);
        self.multiplier
            .checked_pow(exponent)
            .and_then(|factor| self.base.checked_mul(factor))
            .map_or(self.cap, |delay| delay.min(self.cap))
    }

    pub fn is_retryable_status(&self, status: StatusCode) -> bool {
        self.retryable_status_codes.contains(&status.as_u16())
    }

    /// `attempt` is zero-based; `max_retries` counts retries after the first
    /// attempt.
    pub fn should_retry(&self, status: StatusCode, attempt: usize, max_retries: usize) -> bool {
        attempt < max_retries && self.is_retryable_status(status)
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::standard()
    }
}

fn default_retryable_status_codes() -> BTreeSet<u16> {
    [429_u16, 503].into_iter().collect()
}
