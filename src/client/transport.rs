use std::io::Read;
use std::time::Duration;

use bytes::Bytes;
use http::{HeaderMap, StatusCode};
use thiserror::Error;

use crate::error::{BoxError, TransportErrorKind};

/// Per-attempt limits handed to a [`Transport`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SendOptions {
    pub timeout: Duration,
    pub max_response_body_bytes: usize,
}

/// Status, headers and fully buffered body of one attempt.
#[derive(Clone, Debug)]
pub struct TransportResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl TransportResponse {
    pub fn new(status: StatusCode, headers: HeaderMap, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers,
            body: body.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum TransportFailure {
    #[error("{kind} failure: {source}")]
    Io {
        kind: TransportErrorKind,
        #[source]
        source: BoxError,
    },
    #[error("response body exceeded {limit_bytes} bytes (read {actual_bytes})")]
    BodyTooLarge {
        limit_bytes: usize,
        actual_bytes: usize,
    },
}

impl TransportFailure {
    pub fn io(
        kind: TransportErrorKind,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::Io {
            kind,
            source: source.into(),
        }
    }
}

/// Performs one HTTP exchange and buffers the response body.
///
/// Implementations must not follow any retry or pacing logic of their own;
/// the client owns both.
pub trait Transport: Send + Sync {
    fn send(
        &self,
        request: http::Request<Bytes>,
        options: &SendOptions,
    ) -> Result<TransportResponse, TransportFailure>;
}

/// Pooled blocking transport backed by a `ureq` agent.
#[derive(Clone, Debug)]
pub struct UreqTransport {
    agent: ureq::Agent,
    connect_timeout: Duration,
}

impl UreqTransport {
    pub fn new(connect_timeout: Duration) -> Self {
        Self {
            agent: make_agent(),
            connect_timeout: connect_timeout.max(Duration::from_millis(1)),
        }
    }
}

fn make_agent() -> ureq::Agent {
    ureq::Agent::config_builder()
        .http_status_as_error(false)
        .build()
        .new_agent()
}

impl Transport for UreqTransport {
    fn send(
        &self,
        request: http::Request<Bytes>,
        options: &SendOptions,
    ) -> Result<TransportResponse, TransportFailure> {
        let (parts, body) = request.into_parts();
        let request = http::Request::from_parts(parts, body.to_vec());
        let timeout = options.timeout.max(Duration::from_millis(1));

        let configured_request = self
            .agent
            .configure_request(request)
            .timeout_global(Some(timeout))
            .timeout_connect(Some(self.connect_timeout.min(timeout)))
            .timeout_recv_response(Some(timeout))
            .timeout_recv_body(Some(timeout))
            .build();

        let mut response = self
            .agent
            .run(configured_request)
            .map_err(|source| TransportFailure::Io {
                kind: classify_ureq_transport_error(&source),
                source: Box::new(source),
            })?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = read_all_body_limited(&mut response, options.max_response_body_bytes)?;
        Ok(TransportResponse {
            status,
            headers,
            body,
        })
    }
}

fn classify_ureq_transport_error(error: &ureq::Error) -> TransportErrorKind {
    match error {
        ureq::Error::Timeout(_) => TransportErrorKind::Timeout,
        ureq::Error::HostNotFound => TransportErrorKind::Dns,
        ureq::Error::Tls(_) | ureq::Error::Rustls(_) => TransportErrorKind::Tls,
        ureq::Error::ConnectProxyFailed(_) | ureq::Error::ConnectionFailed => {
            TransportErrorKind::Connect
        }
        ureq::Error::Io(source) => classify_io_error(source),
        _ => TransportErrorKind::Other,
    }
}

fn classify_io_error(error: &std::io::Error) -> TransportErrorKind {
    match error.kind() {
        std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock => {
            TransportErrorKind::Timeout
        }
        std::io::ErrorKind::NotFound => TransportErrorKind::Dns,
        std::io::ErrorKind::ConnectionRefused
        | std::io::ErrorKind::ConnectionAborted
        | std::io::ErrorKind::NotConnected
        | std::io::ErrorKind::AddrNotAvailable => TransportErrorKind::Connect,
        std::io::ErrorKind::ConnectionReset
        | std::io::ErrorKind::BrokenPipe
        | std::io::ErrorKind::UnexpectedEof => TransportErrorKind::Read,
        _ => TransportErrorKind::Read,
    }
}

fn wrapped_ureq_error(io_error: &std::io::Error) -> Option<&ureq::Error> {
    io_error
        .get_ref()
        .and_then(|source| source.downcast_ref::<ureq::Error>())
}

fn read_all_body_limited(
    response: &mut http::Response<ureq::Body>,
    max_bytes: usize,
) -> Result<Bytes, TransportFailure> {
    let mut reader = response.body_mut().as_reader();
    let mut collected = Vec::new();
    let mut chunk = [0_u8; 8192];
    let mut total_len = 0_usize;

    loop {
        let read = reader.read(&mut chunk).map_err(|source| {
            let kind = wrapped_ureq_error(&source)
                .map_or_else(|| classify_io_error(&source), classify_ureq_transport_error);
            TransportFailure::Io {
                kind,
                source: Box::new(source),
            }
        })?;
        if read == 0 {
            break;
        }
        total_len = total_len.saturating_add(read);
        if total_len > max_bytes {
            return Err(TransportFailure::BodyTooLarge {
                limit_bytes: max_bytes,
                actual_bytes: total_len,
            });
        }
        collected.extend_from_slice(&chunk[..read]);
    }

    Ok(Bytes::from(collected))
}
