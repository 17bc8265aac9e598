//! `reqpace` is a blocking HTTP client for third-party web services that
//! throttle or challenge automated traffic.
//!
//! Every logical call goes through the same pipeline: a shared circuit breaker
//! gate, a pacing rate limiter with jitter, a rotated browser identity, the
//! transport call, challenge-page detection and status classification, and
//! bounded exponential backoff for 429/503 and transport failures.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::time::Duration;
//! use reqpace::prelude::{Client, Error};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = Client::builder()
//!         .min_delay(Duration::from_secs(1))
//!         .jitter_max(Duration::from_millis(500))
//!         .max_retries(3)
//!         .failure_threshold(5)
//!         .reset_timeout(Duration::from_secs(60))
//!         .total_timeout(Duration::from_secs(120))
//!         .build();
//!
//!     match client.get("https://www.example.com/book/show/42").send_text() {
//!         Ok(page) => println!("{} bytes", page.len()),
//!         Err(Error::Blocked { marker, .. }) => {
//!             eprintln!("the site is asking for a captcha ({marker}); try again later by hand");
//!         }
//!         Err(Error::CircuitOpen { retry_after_ms, .. }) => {
//!             eprintln!("too many recent failures; retry in {retry_after_ms}ms");
//!         }
//!         Err(other) => return Err(other.into()),
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Recommended Defaults
//!
//! - Share one [`Client`] (or its clones) per remote service so pacing and the
//!   circuit breaker see all traffic.
//! - Treat [`Error::Blocked`] as a stop signal, never as something to retry.
//! - Set a total timeout when callers cannot wait for the full backoff ladder.

mod backoff;
mod block;
mod client;
mod clock;
mod config;
mod error;
mod identity;
mod metrics;
mod observe;
mod rate_limit;
mod resilience;
mod response;
mod util;

pub use crate::backoff::BackoffPolicy;
pub use crate::block::BlockDetector;
pub use crate::client::{
    Client, ClientBuilder, RequestBuilder, SendOptions, Transport, TransportFailure,
    TransportResponse, UreqTransport,
};
pub use crate::clock::{CancelToken, Clock, Interrupted, ManualClock, SystemClock};
pub use crate::config::{ClientConfig, ClientProfile, StatusPolicy};
pub use crate::error::{BoxError, Error, ErrorCode, TransportErrorKind};
pub use crate::identity::IdentityPool;
pub use crate::metrics::ClientMetricsSnapshot;
pub use crate::observe::{Observer, RequestContext};
pub use crate::rate_limit::{JitterSource, RandomJitter, RateLimiter};
pub use crate::resilience::{CircuitBreaker, CircuitBreakerPolicy, CircuitPermit, CircuitState};
pub use crate::response::Response;

pub type Result<T> = std::result::Result<T, Error>;

pub mod prelude {
    pub use crate::{
        BackoffPolicy, BlockDetector, CancelToken, CircuitBreakerPolicy, CircuitState, Client,
        ClientBuilder, ClientConfig, ClientProfile, Error, ErrorCode, Response, Result,
        StatusPolicy,
    };
}

#[cfg(test)]
mod tests;
