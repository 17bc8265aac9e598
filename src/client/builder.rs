use std::sync::Arc;
use std::time::Duration;

use http::HeaderMap;
use http::header::{HeaderName, HeaderValue};

use crate::backoff::BackoffPolicy;
use crate::block::BlockDetector;
use crate::clock::{Clock, SystemClock};
use crate::config::{ClientConfig, ClientProfile, StatusPolicy};
use crate::identity::IdentityPool;
use crate::metrics::ClientMetrics;
use crate::observe::Observer;
use crate::rate_limit::{JitterSource, RandomJitter, RateLimiter};
use crate::resilience::{CircuitBreaker, CircuitBreakerPolicy};
use crate::util::{parse_header_name, parse_header_value};

use super::transport::{Transport, UreqTransport};
use super::{Client, ClientBuilder};

impl ClientBuilder {
    pub(crate) fn new() -> Self {
        Self {
            config: ClientConfig::default(),
            default_headers: HeaderMap::new(),
            block_detector: BlockDetector::standard(),
            identity_pool: IdentityPool::standard(),
            clock: None,
            jitter_source: None,
            transport: None,
            metrics_enabled: true,
            observers: Vec::new(),
        }
    }

    pub fn min_delay(mut self, min_delay: Duration) -> Self {
        self.config.min_delay = min_delay;
        self
    }

    pub fn jitter_max(mut self, jitter_max: Duration) -> Self {
        self.config.jitter_max = jitter_max;
        self
    }

    pub fn max_retries(mut self, max_retries: usize) -> Self {
        self.config.max_retries = max_retries;
        self
    }

    pub fn backoff_policy(mut self, backoff: BackoffPolicy) -> Self {
        self.config.backoff = backoff;
        self
    }

    pub fn circuit_breaker_policy(mut self, policy: CircuitBreakerPolicy) -> Self {
        self.config.circuit_breaker = policy;
        self
    }

    pub fn failure_threshold(mut self, failure_threshold: usize) -> Self {
        self.config.circuit_breaker = self
            .config
            .circuit_breaker
            .failure_threshold(failure_threshold.max(1));
        self
    }

    pub fn reset_timeout(mut self, reset_timeout: Duration) -> Self {
        self.config.circuit_breaker = self.config.circuit_breaker.reset_timeout(reset_timeout);
        self
    }

    pub fn request_timeout(mut self, request_timeout: Duration) -> Self {
        self.config.request_timeout = request_timeout.max(Duration::from_millis(1));
        self
    }

    pub fn connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.config.connect_timeout = connect_timeout.max(Duration::from_millis(1));
        self
    }

    pub fn total_timeout(mut self, total_timeout: Duration) -> Self {
        self.config.total_timeout = Some(total_timeout.max(Duration::from_millis(1)));
        self
    }

    pub fn max_response_body_bytes(mut self, max_response_body_bytes: usize) -> Self {
        self.config.max_response_body_bytes = max_response_body_bytes.max(1);
        self
    }

    pub fn status_policy(mut self, status_policy: StatusPolicy) -> Self {
        self.config.status_policy = status_policy;
        self
    }

    /// Stretches the backoff on 429/503 to the server's `Retry-After`, never
    /// beyond the backoff cap.
    pub fn respect_retry_after(mut self, enabled: bool) -> Self {
        self.config.respect_retry_after = enabled;
        self
    }

    pub fn block_detector(mut self, block_detector: BlockDetector) -> Self {
        self.block_detector = block_detector;
        self
    }

    pub fn identity_pool(mut self, identity_pool: IdentityPool) -> Self {
        self.identity_pool = identity_pool;
        self
    }

    pub fn try_user_agents<I, S>(self, user_agents: I) -> crate::Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let identity_pool = IdentityPool::new(user_agents)?;
        Ok(self.identity_pool(identity_pool))
    }

    pub fn default_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.default_headers.insert(name, value);
        self
    }

    pub fn try_default_header(self, name: &str, value: &str) -> crate::Result<Self> {
        let name = parse_header_name(name)?;
        let value = parse_header_value(name.as_str(), value)?;
        Ok(self.default_header(name, value))
    }

    pub fn clock_arc(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn clock<C>(self, clock: C) -> Self
    where
        C: Clock + 'static,
    {
        self.clock_arc(Arc::new(clock))
    }

    pub fn jitter_source_arc(mut self, jitter_source: Arc<dyn JitterSource>) -> Self {
        self.jitter_source = Some(jitter_source);
        self
    }

    pub fn transport_arc(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn transport<T>(self, transport: T) -> Self
    where
        T: Transport + 'static,
    {
        self.transport_arc(Arc::new(transport))
    }

    pub fn metrics_enabled(mut self, enabled: bool) -> Self {
        self.metrics_enabled = enabled;
        self
    }

    pub fn observer_arc(mut self, observer: Arc<dyn Observer>) -> Self {
        self.observers.push(observer);
        self
    }

    pub fn observer<O>(self, observer: O) -> Self
    where
        O: Observer + 'static,
    {
        self.observer_arc(Arc::new(observer))
    }

    pub fn profile(mut self, profile: ClientProfile) -> Self {
        self.config = profile.defaults();
        self
    }

    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Client {
        let config = self.config;
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let jitter_source = self
            .jitter_source
            .unwrap_or_else(|| Arc::new(RandomJitter));
        let transport = self
            .transport
            .unwrap_or_else(|| Arc::new(UreqTransport::new(config.connect_timeout)));

        Client {
            default_headers: self.default_headers,
            max_retries: config.max_retries,
            backoff: config.backoff,
            request_timeout: config.request_timeout.max(Duration::from_millis(1)),
            total_timeout: config.total_timeout,
            max_response_body_bytes: config.max_response_body_bytes.max(1),
            status_policy: config.status_policy,
            respect_retry_after: config.respect_retry_after,
            rate_limiter: Arc::new(RateLimiter::with_jitter_source(
                config.min_delay,
                config.jitter_max,
                Arc::clone(&clock),
                jitter_source,
            )),
            circuit_breaker: Arc::new(CircuitBreaker::new(
                config.circuit_breaker,
                Arc::clone(&clock),
            )),
            block_detector: self.block_detector,
            identity_pool: self.identity_pool,
            clock,
            transport,
            metrics: ClientMetrics::with_enabled(self.metrics_enabled),
            observers: self.observers,
        }
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
