use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http::{HeaderMap, Method};

use crate::backoff::BackoffPolicy;
use crate::block::BlockDetector;
use crate::clock::{CancelToken, Clock};
use crate::config::{ClientConfig, StatusPolicy};
use crate::identity::IdentityPool;
use crate::metrics::{ClientMetrics, ClientMetricsSnapshot};
use crate::observe::Observer;
use crate::rate_limit::{JitterSource, RateLimiter};
use crate::resilience::{CircuitBreaker, CircuitState};
use crate::response::Response;

mod builder;
mod execute;
mod request;
mod transport;

pub use request::RequestBuilder;
pub use transport::{SendOptions, Transport, TransportFailure, TransportResponse, UreqTransport};

#[derive(Clone, Debug, Default)]
pub(crate) struct RequestOptions {
    pub(crate) max_retries: Option<usize>,
    pub(crate) request_timeout: Option<Duration>,
    pub(crate) total_timeout: Option<Duration>,
    pub(crate) status_policy: Option<StatusPolicy>,
}

pub struct ClientBuilder {
    config: ClientConfig,
    default_headers: HeaderMap,
    block_detector: BlockDetector,
    identity_pool: IdentityPool,
    clock: Option<Arc<dyn Clock>>,
    jitter_source: Option<Arc<dyn JitterSource>>,
    transport: Option<Arc<dyn Transport>>,
    metrics_enabled: bool,
    observers: Vec<Arc<dyn Observer>>,
}

/// Paced, retrying, circuit-protected blocking HTTP client.
///
/// Clones share one rate limiter and one circuit breaker, so every clone
/// counts against the same pacing and failure budget.
#[derive(Clone)]
pub struct Client {
    default_headers: HeaderMap,
    max_retries: usize,
    backoff: BackoffPolicy,
    request_timeout: Duration,
    total_timeout: Option<Duration>,
    max_response_body_bytes: usize,
    status_policy: StatusPolicy,
    respect_retry_after: bool,
    rate_limiter: Arc<RateLimiter>,
    circuit_breaker: Arc<CircuitBreaker>,
    block_detector: BlockDetector,
    identity_pool: IdentityPool,
    clock: Arc<dyn Clock>,
    transport: Arc<dyn Transport>,
    metrics: ClientMetrics,
    observers: Vec<Arc<dyn Observer>>,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("Client")
            .field("max_retries", &self.max_retries)
            .field("backoff", &self.backoff)
            .field("rate_limiter", &self.rate_limiter)
            .field("circuit_breaker", &self.circuit_breaker)
            .field("status_policy", &self.status_policy)
            .finish_non_exhaustive()
    }
}

impl Client {
    /// Builds a client with the five pacing and protection knobs and defaults
    /// for everything else.
    pub fn new(
        min_delay: Duration,
        max_jitter: Duration,
        max_retries: usize,
        failure_threshold: usize,
        reset_timeout: Duration,
    ) -> Self {
        Self::from_config(ClientConfig::new(
            min_delay,
            max_jitter,
            max_retries,
            failure_threshold,
            reset_timeout,
        ))
    }

    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    pub fn from_config(config: ClientConfig) -> Self {
        ClientBuilder::new().config(config).build()
    }

    pub fn execute(&self, request: http::Request<Bytes>) -> crate::Result<Response> {
        self.execute_with_cancel(request, &CancelToken::new())
    }

    /// Like [`Client::execute`], aborting queued waits, backoff sleeps and
    /// pending attempts once `cancel` fires.
    pub fn execute_with_cancel(
        &self,
        request: http::Request<Bytes>,
        cancel: &CancelToken,
    ) -> crate::Result<Response> {
        let (parts, body) = request.into_parts();
        self.send_request(
            parts.method,
            parts.uri.to_string(),
            parts.headers,
            body,
            RequestOptions::default(),
            cancel,
        )
    }

    pub fn get(&self, uri: impl Into<String>) -> RequestBuilder<'_> {
        self.request(Method::GET, uri)
    }

    pub fn post(&self, uri: impl Into<String>) -> RequestBuilder<'_> {
        self.request(Method::POST, uri)
    }

    pub fn request(&self, method: Method, uri: impl Into<String>) -> RequestBuilder<'_> {
        RequestBuilder::new(self, method, uri.into())
    }

    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.rate_limiter
    }

    pub fn circuit_breaker(&self) -> &CircuitBreaker {
        &self.circuit_breaker
    }

    pub fn circuit_state(&self) -> CircuitState {
        self.circuit_breaker.state()
    }

    pub fn max_retries(&self) -> usize {
        self.max_retries
    }

    pub fn backoff_policy(&self) -> &BackoffPolicy {
        &self.backoff
    }

    pub fn metrics_snapshot(&self) -> ClientMetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Forgets pacing history and closes the circuit.
    pub fn reset(&self) {
        self.rate_limiter.reset();
        self.circuit_breaker.reset();
    }
}
