use std::time::{Duration, Instant};

use bytes::Bytes;
use http::{HeaderMap, Method, StatusCode, Uri};
use tracing::{debug, info_span, warn};

use crate::clock::CancelToken;
use crate::config::StatusPolicy;
use crate::error::Error;
use crate::observe::RequestContext;
use crate::resilience::CircuitPermit;
use crate::response::Response;
use crate::util::{
    bounded_retry_delay, deadline_exceeded_error, merge_headers, parse_retry_after, phase_timeout,
    redact_uri_for_logs, truncate_body,
};

use super::transport::{SendOptions, TransportFailure, TransportResponse};
use super::{Client, RequestOptions};

/// Everything fixed for the lifetime of one logical call.
struct Call<'a> {
    method: Method,
    uri: Uri,
    redacted_uri: String,
    headers: HeaderMap,
    body: Bytes,
    max_retries: usize,
    request_timeout: Duration,
    total_timeout: Option<Duration>,
    status_policy: StatusPolicy,
    started_at: Instant,
    cancel: &'a CancelToken,
}

impl Call<'_> {
    fn context(&self, attempt: usize) -> RequestContext {
        RequestContext::new(
            self.method.clone(),
            self.redacted_uri.clone(),
            attempt + 1,
            self.max_retries.saturating_add(1),
        )
    }

    fn cancelled(&self) -> Error {
        Error::Cancelled {
            method: self.method.clone(),
            uri: self.redacted_uri.clone(),
        }
    }

    fn deadline_exceeded(&self) -> Error {
        deadline_exceeded_error(self.total_timeout, &self.method, &self.redacted_uri)
    }
}

enum AttemptOutcome {
    Complete(crate::Result<Response>),
    /// Only produced while attempts remain.
    Retry { error: Error, delay: Duration },
}

fn parse_target_uri(uri_text: &str) -> crate::Result<Uri> {
    let invalid = || Error::InvalidUri {
        uri: redact_uri_for_logs(uri_text),
    };
    let uri: Uri = uri_text.parse().map_err(|_| invalid())?;
    let supported_scheme = matches!(uri.scheme_str(), Some("http" | "https"));
    if !supported_scheme || uri.host().is_none() {
        return Err(invalid());
    }
    Ok(uri)
}

fn is_failure_status(status: StatusCode) -> bool {
    status.is_client_error() || status.is_server_error()
}

impl Client {
    pub(super) fn send_request(
        &self,
        method: Method,
        uri_text: String,
        headers: HeaderMap,
        body: Bytes,
        options: RequestOptions,
        cancel: &CancelToken,
    ) -> crate::Result<Response> {
        let uri = parse_target_uri(&uri_text)?;
        let call = Call {
            method,
            uri,
            redacted_uri: redact_uri_for_logs(&uri_text),
            headers: merge_headers(&self.default_headers, &headers),
            body,
            max_retries: options.max_retries.unwrap_or(self.max_retries),
            request_timeout: options
                .request_timeout
                .unwrap_or(self.request_timeout)
                .max(Duration::from_millis(1)),
            total_timeout: options.total_timeout.or(self.total_timeout),
            status_policy: options.status_policy.unwrap_or(self.status_policy),
            started_at: self.clock.now(),
            cancel,
        };

        self.metrics.record_request_started();
        let result = self.run_with_retries(&call);
        self.metrics
            .record_request_completed(&result, self.elapsed_since(call.started_at));
        result
    }

    fn run_with_retries(&self, call: &Call<'_>) -> crate::Result<Response> {
        let mut attempt = 0_usize;
        loop {
            match self.run_attempt(call, attempt) {
                AttemptOutcome::Complete(result) => return result,
                AttemptOutcome::Retry { error, delay } => {
                    self.pause_before_retry(call, attempt, &error, delay)?;
                    attempt += 1;
                }
            }
        }
    }

    fn pause_before_retry(
        &self,
        call: &Call<'_>,
        attempt: usize,
        error: &Error,
        delay: Duration,
    ) -> crate::Result<()> {
        let elapsed = self.elapsed_since(call.started_at);
        let Some(delay) = bounded_retry_delay(delay, call.total_timeout, elapsed) else {
            return Err(call.deadline_exceeded());
        };

        let context = call.context(attempt);
        for observer in &self.observers {
            observer.on_retry_scheduled(&context, error, delay);
        }
        warn!(
            method = %call.method,
            uri = %call.redacted_uri,
            attempt = attempt + 1,
            delay_ms = delay.as_millis() as u64,
            error = %error,
            "retrying request"
        );
        self.metrics.record_retry();
        self.clock
            .sleep(delay, call.cancel)
            .map_err(|_| call.cancelled())
    }

    fn run_attempt(&self, call: &Call<'_>, attempt: usize) -> AttemptOutcome {
        let span = info_span!(
            "reqpace.request",
            method = %call.method,
            uri = %call.redacted_uri,
            attempt = attempt + 1,
            max_attempts = call.max_retries.saturating_add(1)
        );
        let _enter = span.enter();
        let context = call.context(attempt);

        let permit = match self.circuit_breaker.admit() {
            Ok(permit) => permit,
            Err(retry_after) => {
                warn!(
                    retry_after_ms = retry_after.as_millis() as u64,
                    "circuit breaker open; rejecting request"
                );
                for observer in &self.observers {
                    observer.on_circuit_rejected(&context, retry_after);
                }
                return AttemptOutcome::Complete(Err(Error::CircuitOpen {
                    method: call.method.clone(),
                    uri: call.redacted_uri.clone(),
                    retry_after_ms: retry_after.as_millis(),
                }));
            }
        };

        match self.rate_limiter.wait(call.cancel) {
            Ok(waited) => self.metrics.record_rate_limit_wait(waited),
            Err(_) => {
                permit.abandon();
                return AttemptOutcome::Complete(Err(call.cancelled()));
            }
        }
        if call.cancel.is_cancelled() {
            permit.abandon();
            return AttemptOutcome::Complete(Err(call.cancelled()));
        }

        let elapsed = self.elapsed_since(call.started_at);
        let Some(timeout) = phase_timeout(call.request_timeout, call.total_timeout, elapsed) else {
            permit.abandon();
            return AttemptOutcome::Complete(Err(call.deadline_exceeded()));
        };

        let mut headers = call.headers.clone();
        self.identity_pool.apply(&mut headers);
        let mut request = http::Request::new(call.body.clone());
        *request.method_mut() = call.method.clone();
        *request.uri_mut() = call.uri.clone();
        *request.headers_mut() = headers;

        for observer in &self.observers {
            observer.on_attempt_start(&context);
        }
        self.metrics.record_attempt();
        debug!("sending request");

        let options = SendOptions {
            timeout,
            max_response_body_bytes: self.max_response_body_bytes,
        };
        match self.transport.send(request, &options) {
            Ok(response) => self.classify_response(call, attempt, &context, permit, response),
            Err(TransportFailure::BodyTooLarge {
                limit_bytes,
                actual_bytes,
            }) => {
                permit.record_failure();
                AttemptOutcome::Complete(Err(Error::ResponseBodyTooLarge {
                    limit_bytes,
                    actual_bytes,
                    method: call.method.clone(),
                    uri: call.redacted_uri.clone(),
                }))
            }
            Err(TransportFailure::Io { kind, source }) => {
                permit.record_failure();
                let error = Error::Transport {
                    kind,
                    method: call.method.clone(),
                    uri: call.redacted_uri.clone(),
                    attempts: attempt + 1,
                    source,
                };
                if attempt < call.max_retries {
                    AttemptOutcome::Retry {
                        error,
                        delay: self.backoff.delay(attempt),
                    }
                } else {
                    AttemptOutcome::Complete(Err(error))
                }
            }
        }
    }

    fn classify_response(
        &self,
        call: &Call<'_>,
        attempt: usize,
        context: &RequestContext,
        permit: CircuitPermit,
        response: TransportResponse,
    ) -> AttemptOutcome {
        let TransportResponse {
            status,
            headers,
            body,
        } = response;
        let attempts = attempt + 1;
        debug!(status = status.as_u16(), body_bytes = body.len(), "response received");

        if let Some(marker) = self.block_detector.detect(&body) {
            permit.record_failure();
            warn!(
                status = status.as_u16(),
                marker, "remote service answered with a challenge page"
            );
            for observer in &self.observers {
                observer.on_blocked(context, status, marker);
            }
            return AttemptOutcome::Complete(Err(Error::Blocked {
                marker: marker.to_owned(),
                status: status.as_u16(),
                method: call.method.clone(),
                uri: call.redacted_uri.clone(),
            }));
        }

        if self.backoff.should_retry(status, attempt, call.max_retries) {
            permit.record_failure();
            return AttemptOutcome::Retry {
                delay: self.retry_delay(attempt, &headers),
                error: Error::RetryableStatus {
                    status: status.as_u16(),
                    method: call.method.clone(),
                    uri: call.redacted_uri.clone(),
                    attempts,
                    body: truncate_body(&body),
                },
            };
        }

        if !is_failure_status(status) {
            permit.record_success();
            return AttemptOutcome::Complete(Ok(Response::new(status, headers, body, attempts)));
        }

        permit.record_failure();
        if call.status_policy == StatusPolicy::Response {
            return AttemptOutcome::Complete(Ok(Response::new(status, headers, body, attempts)));
        }
        let error = if self.backoff.is_retryable_status(status) {
            Error::RetryableStatus {
                status: status.as_u16(),
                method: call.method.clone(),
                uri: call.redacted_uri.clone(),
                attempts,
                body: truncate_body(&body),
            }
        } else {
            Error::HttpStatus {
                status: status.as_u16(),
                method: call.method.clone(),
                uri: call.redacted_uri.clone(),
                body: truncate_body(&body),
            }
        };
        AttemptOutcome::Complete(Err(error))
    }

    fn retry_delay(&self, attempt: usize, headers: &HeaderMap) -> Duration {
        let delay = self.backoff.delay(attempt);
        if !self.respect_retry_after {
            return delay;
        }
        parse_retry_after(headers, self.clock.now_system()).map_or(delay, |retry_after| {
            delay.max(retry_after.min(self.backoff.configured_cap()))
        })
    }

    fn elapsed_since(&self, started_at: Instant) -> Duration {
        self.clock.now().saturating_duration_since(started_at)
    }
}
