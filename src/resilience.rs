use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tracing::{info, warn};

use crate::clock::Clock;
use crate::util::lock_unpoisoned;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CircuitBreakerPolicy {
    failure_threshold: usize,
    reset_timeout: Duration,
}

impl CircuitBreakerPolicy {
    pub const fn standard() -> Self {
        Self {
            failure_threshold: 5,
            reset_timeout: Duration::from_secs(60),
        }
    }

    pub const fn failure_threshold(mut self, failure_threshold: usize) -> Self {
        self.failure_threshold = failure_threshold;
        self
    }

    pub const fn reset_timeout(mut self, reset_timeout: Duration) -> Self {
        self.reset_timeout = reset_timeout;
        self
    }

    pub fn configured_failure_threshold(self) -> usize {
        self.failure_threshold.max(1)
    }

    pub const fn configured_reset_timeout(self) -> Duration {
        self.reset_timeout
    }
}

impl Default for CircuitBreakerPolicy {
    fn default() -> Self {
        Self::standard()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            Self::Closed => "closed",
            Self::Open => "open",
            Self::HalfOpen => "half_open",
        };
        formatter.write_str(text)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum PermitKind {
    Closed,
    HalfOpen,
}

#[derive(Debug)]
enum BreakerState {
    Closed {
        consecutive_failures: usize,
    },
    Open {
        opened_at: Instant,
        consecutive_failures: usize,
    },
    // The single trial is in flight for as long as this state holds.
    HalfOpen {
        opened_at: Instant,
        consecutive_failures: usize,
    },
}

/// Current state plus a counter bumped on every transition. A permit
/// remembers the phase it was issued in; outcomes from any other phase are
/// ignored.
#[derive(Debug)]
struct BreakerInner {
    state: BreakerState,
    phase: u64,
}

impl BreakerInner {
    fn transition(&mut self, state: BreakerState) {
        self.state = state;
        self.phase = self.phase.wrapping_add(1);
    }
}

/// Consecutive-failure circuit breaker shared by every request of a client.
///
/// Closed counts failures and opens at the threshold. Open rejects until the
/// reset timeout has passed; the first caller after that claims the one
/// half-open trial, and its outcome closes or reopens the circuit. The
/// Open→HalfOpen transition and claiming the trial happen under the same lock.
pub struct CircuitBreaker {
    policy: CircuitBreakerPolicy,
    clock: Arc<dyn Clock>,
    inner: Mutex<BreakerInner>,
}

impl std::fmt::Debug for CircuitBreaker {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("CircuitBreaker")
            .field("policy", &self.policy)
            .field("inner", &*lock_unpoisoned(&self.inner))
            .finish()
    }
}

impl CircuitBreaker {
    pub fn new(policy: CircuitBreakerPolicy, clock: Arc<dyn Clock>) -> Self {
        Self {
            policy,
            clock,
            inner: Mutex::new(BreakerInner {
                state: BreakerState::Closed {
                    consecutive_failures: 0,
                },
                phase: 0,
            }),
        }
    }

    pub fn policy(&self) -> CircuitBreakerPolicy {
        self.policy
    }

    pub fn state(&self) -> CircuitState {
        match lock_unpoisoned(&self.inner).state {
            BreakerState::Closed { .. } => CircuitState::Closed,
            BreakerState::Open { .. } => CircuitState::Open,
            BreakerState::HalfOpen { .. } => CircuitState::HalfOpen,
        }
    }

    pub fn failure_count(&self) -> usize {
        match lock_unpoisoned(&self.inner).state {
            BreakerState::Closed {
                consecutive_failures,
            }
            | BreakerState::Open {
                consecutive_failures,
                ..
            }
            | BreakerState::HalfOpen {
                consecutive_failures,
                ..
            } => consecutive_failures,
        }
    }

    /// Admits one request, or returns how long until a trial may be attempted.
    ///
    /// A rejected half-open caller gets `Duration::ZERO`: the trial already
    /// belongs to someone else and its outcome is pending.
    pub fn admit(self: &Arc<Self>) -> Result<CircuitPermit, Duration> {
        let mut guard = lock_unpoisoned(&self.inner);
        let inner = &mut *guard;
        match inner.state {
            BreakerState::Closed { .. } => Ok(self.permit(PermitKind::Closed, inner.phase)),
            BreakerState::Open {
                opened_at,
                consecutive_failures,
            } => {
                let elapsed = self.clock.now().saturating_duration_since(opened_at);
                let reset_timeout = self.policy.configured_reset_timeout();
                if elapsed < reset_timeout {
                    return Err(reset_timeout - elapsed);
                }
                inner.transition(BreakerState::HalfOpen {
                    opened_at,
                    consecutive_failures,
                });
                info!("circuit breaker half-open; admitting trial request");
                Ok(self.permit(PermitKind::HalfOpen, inner.phase))
            }
            BreakerState::HalfOpen { .. } => Err(Duration::ZERO),
        }
    }

    pub fn reset(&self) {
        lock_unpoisoned(&self.inner).transition(BreakerState::Closed {
            consecutive_failures: 0,
        });
    }

    fn permit(self: &Arc<Self>, kind: PermitKind, phase: u64) -> CircuitPermit {
        CircuitPermit {
            breaker: Arc::clone(self),
            kind,
            phase,
            completed: false,
        }
    }

    fn record_success(&self, kind: PermitKind, phase: u64) {
        let mut guard = lock_unpoisoned(&self.inner);
        let inner = &mut *guard;
        if inner.phase != phase {
            return;
        }
        match (&mut inner.state, kind) {
            (
                BreakerState::Closed {
                    consecutive_failures,
                },
                PermitKind::Closed,
            ) => {
                *consecutive_failures = 0;
            }
            (BreakerState::HalfOpen { .. }, PermitKind::HalfOpen) => {
                inner.transition(BreakerState::Closed {
                    consecutive_failures: 0,
                });
                info!("circuit breaker closed after successful trial");
            }
            _ => {}
        }
    }

    fn record_failure(&self, kind: PermitKind, phase: u64) {
        let mut guard = lock_unpoisoned(&self.inner);
        let inner = &mut *guard;
        if inner.phase != phase {
            return;
        }
        let threshold = self.policy.configured_failure_threshold();
        match (&mut inner.state, kind) {
            (
                BreakerState::Closed {
                    consecutive_failures,
                },
                PermitKind::Closed,
            ) => {
                *consecutive_failures = consecutive_failures.saturating_add(1);
                if *consecutive_failures >= threshold {
                    let failures = *consecutive_failures;
                    inner.transition(BreakerState::Open {
                        opened_at: self.clock.now(),
                        consecutive_failures: failures,
                    });
                    warn!(
                        failures,
                        reset_timeout_ms = self.policy.configured_reset_timeout().as_millis(),
                        "circuit breaker opened"
                    );
                }
            }
            (
                BreakerState::HalfOpen {
                    consecutive_failures,
                    ..
                },
                PermitKind::HalfOpen,
            ) => {
                let failures = consecutive_failures.saturating_add(1);
                inner.transition(BreakerState::Open {
                    opened_at: self.clock.now(),
                    consecutive_failures: failures,
                });
                warn!(failures, "circuit breaker trial failed; reopening");
            }
            _ => {}
        }
    }

    fn release(&self, kind: PermitKind, phase: u64) {
        if kind != PermitKind::HalfOpen {
            return;
        }
        let mut guard = lock_unpoisoned(&self.inner);
        let inner = &mut *guard;
        if inner.phase != phase {
            return;
        }
        if let BreakerState::HalfOpen {
            opened_at,
            consecutive_failures,
        } = inner.state
        {
            inner.transition(BreakerState::Open {
                opened_at,
                consecutive_failures,
            });
        }
    }
}

/// Admission ticket for one request.
///
/// Consumed by exactly one outcome. Dropping it unresolved counts as a
/// failure. Outcomes reported after the breaker has changed state since
/// admission are ignored.
#[must_use = "an admitted request must report its outcome"]
pub struct CircuitPermit {
    breaker: Arc<CircuitBreaker>,
    kind: PermitKind,
    phase: u64,
    completed: bool,
}

impl CircuitPermit {
    pub fn is_trial(&self) -> bool {
        self.kind == PermitKind::HalfOpen
    }

    pub fn record_success(mut self) {
        self.breaker.record_success(self.kind, self.phase);
        self.completed = true;
    }

    pub fn record_failure(mut self) {
        self.breaker.record_failure(self.kind, self.phase);
        self.completed = true;
    }

    /// Gives the admission back without an outcome, e.g. when the caller
    /// cancelled before the request went out. A half-open trial is handed to
    /// the next caller.
    pub fn abandon(mut self) {
        self.breaker.release(self.kind, self.phase);
        self.completed = true;
    }
}

impl Drop for CircuitPermit {
    fn drop(&mut self) {
        if !self.completed {
            self.breaker.record_failure(self.kind, self.phase);
            self.completed = true;
        }
    }
}
