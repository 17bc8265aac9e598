use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::error::Error;
use crate::response::Response;
use crate::util::lock_unpoisoned;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ClientMetricsSnapshot {
    pub requests_started: u64,
    pub requests_succeeded: u64,
    pub requests_failed: u64,
    pub attempts: u64,
    pub retries: u64,
    pub transport_errors: u64,
    pub http_status_errors: u64,
    pub blocked: u64,
    pub circuit_rejections: u64,
    pub cancelled: u64,
    pub deadline_exceeded: u64,
    pub response_body_too_large: u64,
    pub rate_limit_wait_ms: u64,
    pub latency_samples: u64,
    pub latency_total_ms: u64,
    pub latency_avg_ms: f64,
    pub status_counts: BTreeMap<u16, u64>,
    pub error_counts: BTreeMap<String, u64>,
}

#[derive(Clone, Debug, Default)]
pub(crate) struct ClientMetrics {
    inner: Option<Arc<ClientMetricsInner>>,
}

#[derive(Debug, Default)]
struct ClientMetricsInner {
    requests_started: AtomicU64,
    requests_succeeded: AtomicU64,
    requests_failed: AtomicU64,
    attempts: AtomicU64,
    retries: AtomicU64,
    transport_errors: AtomicU64,
    http_status_errors: AtomicU64,
    blocked: AtomicU64,
    circuit_rejections: AtomicU64,
    cancelled: AtomicU64,
    deadline_exceeded: AtomicU64,
    response_body_too_large: AtomicU64,
    rate_limit_wait_ms: AtomicU64,
    latency_total_ms: AtomicU64,
    latency_samples: AtomicU64,
    status_counts: Mutex<BTreeMap<u16, u64>>,
    error_counts: Mutex<BTreeMap<String, u64>>,
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

impl ClientMetrics {
    pub(crate) fn enabled() -> Self {
        Self {
            inner: Some(Arc::new(ClientMetricsInner::default())),
        }
    }

    pub(crate) fn disabled() -> Self {
        Self::default()
    }

    pub(crate) fn with_enabled(enabled: bool) -> Self {
        if enabled {
            Self::enabled()
        } else {
            Self::disabled()
        }
    }

    pub(crate) fn record_request_started(&self) {
        let Some(inner) = &self.inner else {
            return;
        };
        inner.requests_started.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_attempt(&self) {
        let Some(inner) = &self.inner else {
            return;
        };
        inner.attempts.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_retry(&self) {
        let Some(inner) = &self.inner else {
            return;
        };
        inner.retries.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_rate_limit_wait(&self, waited: Duration) {
        let Some(inner) = &self.inner else {
            return;
        };
        inner
            .rate_limit_wait_ms
            .fetch_add(duration_ms(waited), Ordering::Relaxed);
    }

    pub(crate) fn record_request_completed(&self, result: &Result<Response, Error>, latency: Duration) {
        let Some(inner) = &self.inner else {
            return;
        };
        self.record_latency(latency);
        match result {
            Ok(response) => {
                inner.requests_succeeded.fetch_add(1, Ordering::Relaxed);
                self.add_status_count(response.status().as_u16());
            }
            Err(error) => {
                inner.requests_failed.fetch_add(1, Ordering::Relaxed);
                self.record_error(inner, error);
            }
        }
    }

    fn record_error(&self, inner: &ClientMetricsInner, error: &Error) {
        match error {
            Error::Transport { kind, .. } => {
                inner.transport_errors.fetch_add(1, Ordering::Relaxed);
                self.add_error_count(format!("transport:{kind}"));
                return;
            }
            Error::RetryableStatus { status, .. } | Error::HttpStatus { status, .. } => {
                inner.http_status_errors.fetch_add(1, Ordering::Relaxed);
                self.add_status_count(*status);
                self.add_error_count(format!("http_status:{status}"));
                return;
            }
            Error::Blocked { status, .. } => {
                inner.blocked.fetch_add(1, Ordering::Relaxed);
                self.add_status_count(*status);
            }
            Error::CircuitOpen { .. } => {
                inner.circuit_rejections.fetch_add(1, Ordering::Relaxed);
            }
            Error::Cancelled { .. } => {
                inner.cancelled.fetch_add(1, Ordering::Relaxed);
            }
            Error::DeadlineExceeded { .. } => {
                inner.deadline_exceeded.fetch_add(1, Ordering::Relaxed);
            }
            Error::ResponseBodyTooLarge { .. } => {
                inner
                    .response_body_too_large
                    .fetch_add(1, Ordering::Relaxed);
            }
            _ => {}
        }
        self.add_error_count(error.code().as_str().to_owned());
    }

    pub(crate) fn snapshot(&self) -> ClientMetricsSnapshot {
        let Some(inner) = &self.inner else {
            return ClientMetricsSnapshot::default();
        };

        let latency_samples = inner.latency_samples.load(Ordering::Relaxed);
        let latency_total_ms = inner.latency_total_ms.load(Ordering::Relaxed);
        let latency_avg_ms = if latency_samples == 0 {
            0.0
        } else {
            latency_total_ms as f64 / latency_samples as f64
        };

        ClientMetricsSnapshot {
            requests_started: inner.requests_started.load(Ordering::Relaxed),
            requests_succeeded: inner.requests_succeeded.load(Ordering::Relaxed),
            requests_failed: inner.requests_failed.load(Ordering::Relaxed),
            attempts: inner.attempts.load(Ordering::Relaxed),
            retries: inner.retries.load(Ordering::Relaxed),
            transport_errors: inner.transport_errors.load(Ordering::Relaxed),
            http_status_errors: inner.http_status_errors.load(Ordering::Relaxed),
            blocked: inner.blocked.load(Ordering::Relaxed),
            circuit_rejections: inner.circuit_rejections.load(Ordering::Relaxed),
            cancelled: inner.cancelled.load(Ordering::Relaxed),
            deadline_exceeded: inner.deadline_exceeded.load(Ordering::Relaxed),
            response_body_too_large: inner.response_body_too_large.load(Ordering::Relaxed),
            rate_limit_wait_ms: inner.rate_limit_wait_ms.load(Ordering::Relaxed),
            latency_samples,
            latency_total_ms,
            latency_avg_ms,
            status_counts: lock_unpoisoned(&inner.status_counts).clone(),
            error_counts: lock_unpoisoned(&inner.error_counts).clone(),
        }
    }

    fn record_latency(&self, latency: Duration) {
        let Some(inner) = &self.inner else {
            return;
        };
        inner
            .latency_total_ms
            .fetch_add(duration_ms(latency), Ordering::Relaxed);
        inner.latency_samples.fetch_add(1, Ordering::Relaxed);
    }

    fn add_status_count(&self, status: u16) {
        let Some(inner) = &self.inner else {
            return;
        };
        let mut status_counts = lock_unpoisoned(&inner.status_counts);
        *status_counts.entry(status).or_insert(0) += 1;
    }

    fn add_error_count(&self, key: String) {
        let Some(inner) = &self.inner else {
            return;
        };
        let mut error_counts = lock_unpoisoned(&inner.error_counts);
        *error_counts.entry(key).or_insert(0) += 1;
    }
}
