use std::time::Duration;

use crate::backoff::BackoffPolicy;
use crate::resilience::CircuitBreakerPolicy;

pub(crate) const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
pub(crate) const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
pub(crate) const DEFAULT_MAX_RESPONSE_BODY_BYTES: usize = 8 * 1024 * 1024;
pub(crate) const DEFAULT_MIN_DELAY: Duration = Duration::from_secs(1);
pub(crate) const DEFAULT_JITTER_MAX: Duration = Duration::from_millis(500);
pub(crate) const DEFAULT_MAX_RETRIES: usize = 3;

/// What the executor hands back for a failing status it will not retry.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StatusPolicy {
    /// 4xx/5xx become [`Error::HttpStatus`](crate::Error::HttpStatus), or
    /// [`Error::RetryableStatus`](crate::Error::RetryableStatus) once retries
    /// run out.
    #[default]
    Error,
    /// The failing response is returned as-is for the caller to interpret.
    Response,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ClientProfile {
    /// One request per second with half a second of jitter and slow backoff.
    /// Suited to scraping sites that ban aggressively.
    #[default]
    Polite,
    Standard,
    /// Short pacing and backoff for services with generous limits.
    Eager,
}

impl ClientProfile {
    pub fn defaults(self) -> ClientConfig {
        match self {
            Self::Polite => ClientConfig::default(),
            Self::Standard => ClientConfig {
                min_delay: Duration::from_millis(250),
                jitter_max: Duration::from_millis(250),
                max_retries: 3,
                backoff: BackoffPolicy::standard()
                    .base(Duration::from_millis(500))
                    .cap(Duration::from_secs(30)),
                circuit_breaker: CircuitBreakerPolicy::standard()
                    .reset_timeout(Duration::from_secs(30)),
                ..ClientConfig::default()
            },
            Self::Eager => ClientConfig {
                min_delay: Duration::from_millis(50),
                jitter_max: Duration::from_millis(50),
                max_retries: 2,
                backoff: BackoffPolicy::standard()
                    .base(Duration::from_millis(100))
                    .cap(Duration::from_secs(5)),
                circuit_breaker: CircuitBreakerPolicy::standard()
                    .failure_threshold(10)
                    .reset_timeout(Duration::from_secs(10)),
                request_timeout: Duration::from_secs(10),
                total_timeout: Some(Duration::from_secs(60)),
                ..ClientConfig::default()
            },
        }
    }
}

/// Plain configuration values for a [`Client`](crate::Client).
///
/// Everything here is caller supplied; nothing is read from the environment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientConfig {
    pub min_delay: Duration,
    pub jitter_max: Duration,
    pub max_retries: usize,
    pub backoff: BackoffPolicy,
    pub circuit_breaker: CircuitBreakerPolicy,
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
    pub total_timeout: Option<Duration>,
    pub max_response_body_bytes: usize,
    pub status_policy: StatusPolicy,
    pub respect_retry_after: bool,
}

impl ClientConfig {
    pub fn new(
        min_delay: Duration,
        jitter_max: Duration,
        max_retries: usize,
        failure_threshold: usize,
        reset_timeout: Duration,
    ) -> Self {
        Self {
            min_delay,
            jitter_max,
            max_retries,
            circuit_breaker: CircuitBreakerPolicy::standard()
                .failure_threshold(failure_threshold)
                .reset_timeout(reset_timeout),
            ..Self::default()
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            min_delay: DEFAULT_MIN_DELAY,
            jitter_max: DEFAULT_JITTER_MAX,
            max_retries: DEFAULT_MAX_RETRIES,
            backoff: BackoffPolicy::standard(),
            circuit_breaker: CircuitBreakerPolicy::standard(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            total_timeout: None,
            max_response_body_bytes: DEFAULT_MAX_RESPONSE_BODY_BYTES,
            status_policy: StatusPolicy::Error,
            respect_retry_after: false,
        }
    }
}
