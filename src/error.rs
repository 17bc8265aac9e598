use http::Method;
use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TransportErrorKind {
    Dns,
    Connect,
    Tls,
    Timeout,
    Read,
    Other,
}

impl std::fmt::Display for TransportErrorKind {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            Self::Dns => "dns",
            Self::Connect => "connect",
            Self::Tls => "tls",
            Self::Timeout => "timeout",
            Self::Read => "read",
            Self::Other => "other",
        };
        formatter.write_str(text)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ErrorCode {
    InvalidUri,
    InvalidConfig,
    InvalidHeaderName,
    InvalidHeaderValue,
    Transport,
    ResponseBodyTooLarge,
    RetryableStatus,
    HttpStatus,
    Blocked,
    CircuitOpen,
    Cancelled,
    DeadlineExceeded,
    Deserialize,
}

impl ErrorCode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvalidUri => "invalid_uri",
            Self::InvalidConfig => "invalid_config",
            Self::InvalidHeaderName => "invalid_header_name",
            Self::InvalidHeaderValue => "invalid_header_value",
            Self::Transport => "transport",
            Self::ResponseBodyTooLarge => "response_body_too_large",
            Self::RetryableStatus => "retryable_status",
            Self::HttpStatus => "http_status",
            Self::Blocked => "blocked",
            Self::CircuitOpen => "circuit_open",
            Self::Cancelled => "cancelled",
            Self::DeadlineExceeded => "deadline_exceeded",
            Self::Deserialize => "deserialize",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Terminal outcome of a failed logical call.
///
/// Intermediate attempts are never surfaced: a caller only sees the error that
/// ended the retry loop. `Blocked` and `CircuitOpen` deserve their own
/// user-facing messages; the first needs a human to look at the remote
/// service, the second only needs time.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("invalid request uri: {uri}")]
    InvalidUri { uri: String },
    #[error("invalid client configuration for {field}: {message}")]
    InvalidConfig {
        field: &'static str,
        message: &'static str,
    },
    #[error("invalid header name {name}: {source}")]
    InvalidHeaderName {
        name: String,
        #[source]
        source: http::header::InvalidHeaderName,
    },
    #[error("invalid header value for {name}: {source}")]
    InvalidHeaderValue {
        name: String,
        #[source]
        source: http::header::InvalidHeaderValue,
    },
    #[error("http transport error ({kind}) for {method} {uri} after {attempts} attempt(s): {source}")]
    Transport {
        kind: TransportErrorKind,
        method: Method,
        uri: String,
        attempts: usize,
        #[source]
        source: BoxError,
    },
    #[error(
        "response body too large ({actual_bytes} bytes > {limit_bytes} bytes) for {method} {uri}"
    )]
    ResponseBodyTooLarge {
        limit_bytes: usize,
        actual_bytes: usize,
        method: Method,
        uri: String,
    },
    #[error("http status {status} for {method} {uri} persisted after {attempts} attempt(s): {body}")]
    RetryableStatus {
        status: u16,
        method: Method,
        uri: String,
        attempts: usize,
        body: String,
    },
    #[error("http status error {status} for {method} {uri}: {body}")]
    HttpStatus {
        status: u16,
        method: Method,
        uri: String,
        body: String,
    },
    #[error(
        "remote service is blocking automated access ({marker:?} in {status} response) for {method} {uri}"
    )]
    Blocked {
        marker: String,
        status: u16,
        method: Method,
        uri: String,
    },
    #[error("circuit breaker is open for {method} {uri}; retry after {retry_after_ms}ms")]
    CircuitOpen {
        method: Method,
        uri: String,
        retry_after_ms: u128,
    },
    #[error("request cancelled for {method} {uri}")]
    Cancelled { method: Method, uri: String },
    #[error("request deadline exceeded after {timeout_ms}ms for {method} {uri}")]
    DeadlineExceeded {
        timeout_ms: u128,
        method: Method,
        uri: String,
    },
    #[error("failed to decode response json: {source}; body={body}")]
    Deserialize {
        #[source]
        source: serde_json::Error,
        body: String,
    },
}

impl Error {
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidUri { .. } => ErrorCode::InvalidUri,
            Self::InvalidConfig { .. } => ErrorCode::InvalidConfig,
            Self::InvalidHeaderName { .. } => ErrorCode::InvalidHeaderName,
            Self::InvalidHeaderValue { .. } => ErrorCode::InvalidHeaderValue,
            Self::Transport { .. } => ErrorCode::Transport,
            Self::ResponseBodyTooLarge { .. } => ErrorCode::ResponseBodyTooLarge,
            Self::RetryableStatus { .. } => ErrorCode::RetryableStatus,
            Self::HttpStatus { .. } => ErrorCode::HttpStatus,
            Self::Blocked { .. } => ErrorCode::Blocked,
            Self::CircuitOpen { .. } => ErrorCode::CircuitOpen,
            Self::Cancelled { .. } => ErrorCode::Cancelled,
            Self::DeadlineExceeded { .. } => ErrorCode::DeadlineExceeded,
            Self::Deserialize { .. } => ErrorCode::Deserialize,
        }
    }

    /// Status code of the response that ended the call, if there was one.
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::RetryableStatus { status, .. }
            | Self::HttpStatus { status, .. }
            | Self::Blocked { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub const fn is_blocked(&self) -> bool {
        matches!(self, Self::Blocked { .. })
    }

    pub const fn is_circuit_open(&self) -> bool {
        matches!(self, Self::CircuitOpen { .. })
    }

    /// Whether the executor would have retried this failure had attempts
    /// remained.
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport { .. } | Self::RetryableStatus { .. })
    }
}
