use std::time::Duration;

use http::{Method, StatusCode};

use crate::error::Error;

/// Identifies one attempt of a logical call. The uri is already redacted.
#[derive(Clone, Debug)]
pub struct RequestContext {
    method: Method,
    uri: String,
    attempt: usize,
    max_attempts: usize,
}

impl RequestContext {
    pub(crate) fn new(method: Method, uri: String, attempt: usize, max_attempts: usize) -> Self {
        Self {
            method,
            uri,
            attempt,
            max_attempts,
        }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// One-based attempt number.
    pub fn attempt(&self) -> usize {
        self.attempt
    }

    pub fn max_attempts(&self) -> usize {
        self.max_attempts
    }
}

/// Hooks into the retry loop. Every method defaults to a no-op.
pub trait Observer: Send + Sync {
    fn on_attempt_start(&self, _context: &RequestContext) {}

    fn on_retry_scheduled(&self, _context: &RequestContext, _error: &Error, _delay: Duration) {}

    fn on_blocked(&self, _context: &RequestContext, _status: StatusCode, _marker: &str) {}

    fn on_circuit_rejected(&self, _context: &RequestContext, _retry_after: Duration) {}
}
