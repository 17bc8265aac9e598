use std::collections::{BTreeSet, VecDeque};
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use http::header::{ACCEPT_LANGUAGE, HeaderValue, USER_AGENT};
use http::{HeaderMap, Method, StatusCode};

use crate::client::{ClientBuilder, SendOptions, Transport, TransportFailure, TransportResponse};
use crate::clock::{CancelToken, ManualClock};
use crate::error::{Error, ErrorCode, TransportErrorKind};
use crate::identity::IdentityPool;
use crate::observe::{Observer, RequestContext};
use crate::resilience::CircuitState;
use crate::{Client, StatusPolicy};

const CHALLENGE_PAGE: &str =
    "<html><head><title>Just a moment...</title></head><body>Checking your browser</body></html>";
const BOOK_PAGE: &str = "<html><head><title>Dune</title></head><body>4.27 avg rating</body></html>";

#[derive(Clone, Debug)]
enum Step {
    Status {
        status: u16,
        body: &'static str,
        headers: Vec<(&'static str, &'static str)>,
    },
    Fail(TransportErrorKind),
    TooLarge,
}

fn status(status: u16, body: &'static str) -> Step {
    Step::Status {
        status,
        body,
        headers: Vec::new(),
    }
}

fn status_with_header(
    status: u16,
    body: &'static str,
    name: &'static str,
    value: &'static str,
) -> Step {
    Step::Status {
        status,
        body,
        headers: vec![(name, value)],
    }
}

#[derive(Clone, Debug)]
struct RecordedRequest {
    method: Method,
    uri: String,
    headers: HeaderMap,
    timeout: Duration,
}

/// Plays back a fixed script; the last step repeats forever.
#[derive(Debug, Default)]
struct ScriptedTransport {
    steps: Mutex<VecDeque<Step>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl ScriptedTransport {
    fn new(steps: impl IntoIterator<Item = Step>) -> Arc<Self> {
        Arc::new(Self {
            steps: Mutex::new(steps.into_iter().collect()),
            requests: Mutex::new(Vec::new()),
        })
    }

    fn replace(&self, steps: impl IntoIterator<Item = Step>) {
        *self.steps.lock().expect("lock steps") = steps.into_iter().collect();
    }

    fn calls(&self) -> usize {
        self.requests.lock().expect("lock requests").len()
    }

    fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().expect("lock requests").clone()
    }

    fn next_step(&self) -> Step {
        let mut steps = self.steps.lock().expect("lock steps");
        if steps.len() > 1 {
            return steps.pop_front().expect("script has steps");
        }
        steps
            .front()
            .cloned()
            .expect("script should never be empty")
    }
}

impl Transport for ScriptedTransport {
    fn send(
        &self,
        request: http::Request<Bytes>,
        options: &SendOptions,
    ) -> Result<TransportResponse, TransportFailure> {
        self.requests
            .lock()
            .expect("lock requests")
            .push(RecordedRequest {
                method: request.method().clone(),
                uri: request.uri().to_string(),
                headers: request.headers().clone(),
                timeout: options.timeout,
            });

        match self.next_step() {
            Step::Status {
                status,
                body,
                headers,
            } => {
                let mut header_map = HeaderMap::new();
                for (name, value) in headers {
                    header_map.insert(name, HeaderValue::from_static(value));
                }
                Ok(TransportResponse::new(
                    StatusCode::from_u16(status).expect("valid status"),
                    header_map,
                    Bytes::from_static(body.as_bytes()),
                ))
            }
            Step::Fail(kind) => Err(TransportFailure::io(
                kind,
                io::Error::new(io::ErrorKind::ConnectionRefused, "scripted failure"),
            )),
            Step::TooLarge => Err(TransportFailure::BodyTooLarge {
                limit_bytes: options.max_response_body_bytes,
                actual_bytes: options.max_response_body_bytes + 1,
            }),
        }
    }
}

fn scripted_client(
    transport: &Arc<ScriptedTransport>,
    configure: impl FnOnce(ClientBuilder) -> ClientBuilder,
) -> (Arc<ManualClock>, Client) {
    let clock = Arc::new(ManualClock::new());
    let builder = Client::builder()
        .min_delay(Duration::ZERO)
        .jitter_max(Duration::ZERO)
        .max_retries(3)
        .failure_threshold(100)
        .reset_timeout(Duration::from_secs(60))
        .clock_arc(clock.clone())
        .transport_arc(transport.clone());
    (clock, configure(builder).build())
}

const BOOK_URI: &str = "https://www.example.com/book/show/234225";

#[test]
fn sequential_calls_are_paced_by_min_delay() {
    let transport = ScriptedTransport::new([status(200, BOOK_PAGE)]);
    let (clock, client) = scripted_client(&transport, |builder| {
        builder.min_delay(Duration::from_millis(100))
    });

    for _ in 0..5 {
        client.get(BOOK_URI).send().expect("request should succeed");
    }

    assert_eq!(transport.calls(), 5);
    assert!(clock.elapsed() >= Duration::from_millis(400));
    assert_eq!(clock.sleeps(), vec![Duration::from_millis(100); 4]);
}

#[test]
fn persistent_429_exhausts_retries_with_exponential_backoff() {
    let transport = ScriptedTransport::new([status(429, "slow down")]);
    let (clock, client) = scripted_client(&transport, |builder| builder);

    let error = client
        .get(BOOK_URI)
        .send()
        .expect_err("429 should eventually fail");

    match error {
        Error::RetryableStatus {
            status,
            attempts,
            ref body,
            ..
        } => {
            assert_eq!(status, 429);
            assert_eq!(attempts, 4);
            assert_eq!(body, "slow down");
        }
        other => panic!("unexpected error variant: {other}"),
    }
    assert_eq!(transport.calls(), 4);
    assert_eq!(
        clock.sleeps(),
        vec![
            Duration::from_secs(1),
            Duration::from_secs(2),
            Duration::from_secs(4)
        ]
    );
    assert_eq!(client.circuit_breaker().failure_count(), 4);

    let metrics = client.metrics_snapshot();
    assert_eq!(metrics.requests_started, 1);
    assert_eq!(metrics.requests_failed, 1);
    assert_eq!(metrics.attempts, 4);
    assert_eq!(metrics.retries, 3);
    assert_eq!(metrics.http_status_errors, 1);
    assert_eq!(metrics.status_counts.get(&429), Some(&1));
}

#[test]
fn retryable_status_recovers_before_exhaustion() {
    let transport = ScriptedTransport::new([
        status(503, "maintenance"),
        status(429, "slow down"),
        status(200, BOOK_PAGE),
    ]);
    let (clock, client) = scripted_client(&transport, |builder| builder);

    let response = client.get(BOOK_URI).send().expect("third attempt succeeds");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.attempts(), 3);
    assert_eq!(response.text_lossy(), BOOK_PAGE);
    assert_eq!(clock.total_slept(), Duration::from_secs(3));
    assert_eq!(client.circuit_breaker().failure_count(), 0);
}

#[test]
fn challenge_page_is_blocked_without_retry() {
    let transport = ScriptedTransport::new([status(200, CHALLENGE_PAGE)]);
    let (clock, client) = scripted_client(&transport, |builder| builder);

    let error = client.get(BOOK_URI).send().expect_err("challenge page");

    assert!(error.is_blocked());
    assert_eq!(error.status(), Some(200));
    assert_eq!(transport.calls(), 1);
    assert!(clock.sleeps().is_empty());
    assert_eq!(client.circuit_breaker().failure_count(), 1);
    assert_eq!(client.metrics_snapshot().blocked, 1);
}

#[test]
fn challenge_page_with_retryable_status_is_still_blocked() {
    let transport = ScriptedTransport::new([status(503, CHALLENGE_PAGE)]);
    let (_clock, client) = scripted_client(&transport, |builder| builder);

    let error = client.get(BOOK_URI).send().expect_err("challenge page");

    assert_eq!(error.code(), ErrorCode::Blocked);
    assert_eq!(error.status(), Some(503));
    assert_eq!(transport.calls(), 1);
}

#[test]
fn transport_error_is_retried_then_succeeds() {
    let transport = ScriptedTransport::new([
        Step::Fail(TransportErrorKind::Connect),
        status(200, BOOK_PAGE),
    ]);
    let (clock, client) = scripted_client(&transport, |builder| builder);

    let response = client.get(BOOK_URI).send().expect("retry should succeed");

    assert_eq!(response.attempts(), 2);
    assert_eq!(clock.sleeps(), vec![Duration::from_secs(1)]);
    assert_eq!(client.circuit_breaker().failure_count(), 0);
}

#[test]
fn transport_errors_exhaust_retries() {
    let transport = ScriptedTransport::new([Step::Fail(TransportErrorKind::Timeout)]);
    let (_clock, client) = scripted_client(&transport, |builder| builder.max_retries(2));

    let error = client.get(BOOK_URI).send().expect_err("transport keeps failing");

    match error {
        Error::Transport { kind, attempts, .. } => {
            assert_eq!(kind, TransportErrorKind::Timeout);
            assert_eq!(attempts, 3);
        }
        other => panic!("unexpected error variant: {other}"),
    }
    assert_eq!(transport.calls(), 3);
    assert_eq!(client.metrics_snapshot().transport_errors, 1);
}

#[test]
fn other_failing_statuses_are_not_retried() {
    for code in [400_u16, 403, 404, 500, 502] {
        let transport = ScriptedTransport::new([status(code, "nope")]);
        let (clock, client) = scripted_client(&transport, |builder| builder);

        let error = client.get(BOOK_URI).send().expect_err("failing status");

        match error {
            Error::HttpStatus { status, .. } => assert_eq!(status, code),
            other => panic!("unexpected error variant for {code}: {other}"),
        }
        assert_eq!(transport.calls(), 1, "status {code}");
        assert!(clock.sleeps().is_empty(), "status {code}");
        assert_eq!(client.circuit_breaker().failure_count(), 1);
    }
}

#[test]
fn response_status_policy_returns_failing_response() {
    let transport = ScriptedTransport::new([status(404, "missing")]);
    let (_clock, client) = scripted_client(&transport, |builder| {
        builder.status_policy(StatusPolicy::Response)
    });

    let response = client.get(BOOK_URI).send().expect("404 as response");

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(!response.is_success());
    assert_eq!(client.circuit_breaker().failure_count(), 1);

    let strict = client
        .get(BOOK_URI)
        .status_policy(StatusPolicy::Error)
        .send()
        .expect_err("per-request policy overrides client default");
    assert_eq!(strict.status(), Some(404));
}

#[test]
fn exhausted_429_with_response_policy_returns_last_response() {
    let transport = ScriptedTransport::new([status(429, "slow down")]);
    let (_clock, client) = scripted_client(&transport, |builder| builder.max_retries(1));

    let response = client
        .get(BOOK_URI)
        .send_with_status()
        .expect("exhausted retryable status as response");

    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(response.attempts(), 2);
}

#[test]
fn circuit_opens_after_threshold_and_rejects_without_network() {
    let transport = ScriptedTransport::new([status(500, "boom")]);
    let (clock, client) = scripted_client(&transport, |builder| {
        builder
            .max_retries(0)
            .failure_threshold(2)
            .reset_timeout(Duration::from_secs(30))
            .min_delay(Duration::from_millis(10))
    });

    for _ in 0..2 {
        let error = client.get(BOOK_URI).send().expect_err("500");
        assert_eq!(error.code(), ErrorCode::HttpStatus);
    }
    assert_eq!(client.circuit_state(), CircuitState::Open);
    let last_request_at = client.rate_limiter().last_request_at();
    let sleeps_before = clock.sleeps().len();

    let error = client.get(BOOK_URI).send().expect_err("circuit open");
    match error {
        Error::CircuitOpen { retry_after_ms, .. } => assert_eq!(retry_after_ms, 30_000),
        other => panic!("unexpected error variant: {other}"),
    }
    assert_eq!(transport.calls(), 2);
    assert_eq!(client.rate_limiter().last_request_at(), last_request_at);
    assert_eq!(clock.sleeps().len(), sleeps_before);

    clock.advance(Duration::from_secs(30));
    transport.replace([status(200, BOOK_PAGE)]);
    let response = client.get(BOOK_URI).send().expect("half-open trial succeeds");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(client.circuit_state(), CircuitState::Closed);
    assert_eq!(client.circuit_breaker().failure_count(), 0);
    assert_eq!(client.metrics_snapshot().circuit_rejections, 1);
}

#[test]
fn failed_half_open_trial_reopens_circuit() {
    let transport = ScriptedTransport::new([status(500, "boom")]);
    let (clock, client) = scripted_client(&transport, |builder| {
        builder
            .max_retries(0)
            .failure_threshold(1)
            .reset_timeout(Duration::from_secs(10))
    });

    client.get(BOOK_URI).send().expect_err("first failure opens");
    clock.advance(Duration::from_secs(10));

    let trial = client.get(BOOK_URI).send().expect_err("trial fails");
    assert_eq!(trial.code(), ErrorCode::HttpStatus);
    assert_eq!(transport.calls(), 2);
    assert_eq!(client.circuit_state(), CircuitState::Open);

    let rejected = client.get(BOOK_URI).send().expect_err("reopened");
    assert!(rejected.is_circuit_open());
    assert_eq!(transport.calls(), 2);
}

#[test]
fn circuit_opening_mid_retry_stops_the_loop() {
    let transport = ScriptedTransport::new([status(429, "slow down")]);
    let (_clock, client) = scripted_client(&transport, |builder| {
        builder.max_retries(3).failure_threshold(2)
    });

    let error = client.get(BOOK_URI).send().expect_err("breaker trips");

    assert!(error.is_circuit_open());
    assert_eq!(transport.calls(), 2);
}

#[test]
fn cancelled_token_stops_before_any_attempt() {
    let transport = ScriptedTransport::new([status(200, BOOK_PAGE)]);
    let (_clock, client) = scripted_client(&transport, |builder| builder);
    let cancel = CancelToken::new();
    cancel.cancel();

    let error = client
        .get(BOOK_URI)
        .cancel_token(cancel)
        .send()
        .expect_err("cancelled");

    assert_eq!(error.code(), ErrorCode::Cancelled);
    assert_eq!(transport.calls(), 0);
    assert_eq!(client.circuit_state(), CircuitState::Closed);
    assert_eq!(client.circuit_breaker().failure_count(), 0);
    assert_eq!(client.metrics_snapshot().cancelled, 1);
}

struct CancelOnRetry {
    cancel: CancelToken,
}

impl Observer for CancelOnRetry {
    fn on_retry_scheduled(&self, _context: &RequestContext, _error: &Error, _delay: Duration) {
        self.cancel.cancel();
    }
}

#[test]
fn cancellation_interrupts_backoff_sleep() {
    let cancel = CancelToken::new();
    let transport = ScriptedTransport::new([status(503, "maintenance")]);
    let (clock, client) = scripted_client(&transport, |builder| {
        builder.observer(CancelOnRetry {
            cancel: cancel.clone(),
        })
    });

    let error = client
        .execute_with_cancel(
            http::Request::get(BOOK_URI)
                .body(Bytes::new())
                .expect("valid request"),
            &cancel,
        )
        .expect_err("cancelled during backoff");

    assert_eq!(error.code(), ErrorCode::Cancelled);
    assert_eq!(transport.calls(), 1);
    assert!(clock.sleeps().is_empty());
}

#[test]
fn identity_rotates_and_browser_headers_are_added() {
    let transport = ScriptedTransport::new([status(200, BOOK_PAGE)]);
    let pool = IdentityPool::new(["agent-one", "agent-two", "agent-three"]).expect("valid pool");
    let (_clock, client) = scripted_client(&transport, |builder| builder.identity_pool(pool));

    for _ in 0..64 {
        client.get(BOOK_URI).send().expect("request should succeed");
    }

    let agents: BTreeSet<String> = transport
        .requests()
        .iter()
        .map(|request| {
            request
                .headers
                .get(USER_AGENT)
                .expect("user agent set")
                .to_str()
                .expect("ascii user agent")
                .to_owned()
        })
        .collect();
    assert!(agents.len() > 1);
    assert!(agents.is_subset(&BTreeSet::from([
        "agent-one".to_owned(),
        "agent-two".to_owned(),
        "agent-three".to_owned(),
    ])));
    assert!(
        transport
            .requests()
            .iter()
            .all(|request| request.headers.contains_key(ACCEPT_LANGUAGE))
    );
}

#[test]
fn caller_headers_and_defaults_reach_the_transport() {
    let transport = ScriptedTransport::new([status(200, BOOK_PAGE)]);
    let (_clock, client) = scripted_client(&transport, |builder| {
        builder
            .try_default_header("x-shelf-session", "abc123")
            .expect("valid default header")
    });

    client
        .request(Method::POST, "https://www.example.com/review/new?book=42")
        .try_header("user-agent", "shelf-cli/0.3")
        .expect("valid header")
        .form_body("rating=5")
        .timeout(Duration::from_secs(7))
        .send()
        .expect("request should succeed");

    let request = transport.requests().pop().expect("one request");
    assert_eq!(request.method, Method::POST);
    assert_eq!(request.uri, "https://www.example.com/review/new?book=42");
    assert_eq!(request.headers.get(USER_AGENT).expect("ua"), "shelf-cli/0.3");
    assert_eq!(
        request.headers.get("x-shelf-session").expect("default header"),
        "abc123"
    );
    assert_eq!(request.timeout, Duration::from_secs(7));
}

#[test]
fn execute_preserves_repeated_request_headers() {
    let transport = ScriptedTransport::new([status(200, BOOK_PAGE)]);
    let (_clock, client) = scripted_client(&transport, |builder| {
        builder
            .try_default_header("x-tag", "default")
            .expect("valid default header")
    });

    client
        .execute(
            http::Request::get(BOOK_URI)
                .header("x-tag", "a")
                .header("x-tag", "b")
                .body(Bytes::new())
                .expect("valid request"),
        )
        .expect("request should succeed");

    let request = transport.requests().pop().expect("one request");
    let tags: Vec<_> = request
        .headers
        .get_all("x-tag")
        .iter()
        .map(|value| value.to_str().expect("ascii tag").to_owned())
        .collect();
    assert_eq!(tags, vec!["a".to_owned(), "b".to_owned()]);
}

#[test]
fn retry_after_raises_backoff_when_enabled() {
    let transport = ScriptedTransport::new([
        status_with_header(429, "slow down", "retry-after", "5"),
        status_with_header(429, "slow down", "retry-after", "3600"),
        status(200, BOOK_PAGE),
    ]);
    let (clock, client) = scripted_client(&transport, |builder| builder.respect_retry_after(true));

    client.get(BOOK_URI).send().expect("eventually succeeds");

    assert_eq!(
        clock.sleeps(),
        vec![Duration::from_secs(5), Duration::from_secs(60)]
    );
}

#[test]
fn retry_after_is_ignored_by_default() {
    let transport = ScriptedTransport::new([
        status_with_header(429, "slow down", "retry-after", "30"),
        status(200, BOOK_PAGE),
    ]);
    let (clock, client) = scripted_client(&transport, |builder| builder);

    client.get(BOOK_URI).send().expect("eventually succeeds");

    assert_eq!(clock.sleeps(), vec![Duration::from_secs(1)]);
}

#[test]
fn total_timeout_stops_backoff_that_would_overrun() {
    let transport = ScriptedTransport::new([status(503, "maintenance")]);
    let (_clock, client) = scripted_client(&transport, |builder| {
        builder
            .max_retries(5)
            .total_timeout(Duration::from_millis(2_500))
    });

    let error = client.get(BOOK_URI).send().expect_err("deadline");

    assert_eq!(error.code(), ErrorCode::DeadlineExceeded);
    assert_eq!(transport.calls(), 2);
    let timeouts: Vec<_> = transport
        .requests()
        .iter()
        .map(|request| request.timeout)
        .collect();
    assert_eq!(
        timeouts,
        vec![Duration::from_millis(2_500), Duration::from_millis(1_500)]
    );
}

#[test]
fn oversized_body_fails_without_retry() {
    let transport = ScriptedTransport::new([Step::TooLarge]);
    let (_clock, client) = scripted_client(&transport, |builder| {
        builder.max_response_body_bytes(1_024)
    });

    let error = client.get(BOOK_URI).send().expect_err("too large");

    match error {
        Error::ResponseBodyTooLarge { limit_bytes, .. } => assert_eq!(limit_bytes, 1_024),
        other => panic!("unexpected error variant: {other}"),
    }
    assert_eq!(transport.calls(), 1);
    assert_eq!(client.circuit_breaker().failure_count(), 1);
}

#[test]
fn invalid_uri_never_touches_limiter_or_breaker() {
    let transport = ScriptedTransport::new([status(200, BOOK_PAGE)]);
    let (_clock, client) = scripted_client(&transport, |builder| builder);

    let error = client.get("/book/show/1").send().expect_err("relative uri");

    assert_eq!(error.code(), ErrorCode::InvalidUri);
    assert_eq!(transport.calls(), 0);
    assert_eq!(client.rate_limiter().last_request_at(), None);
}

#[derive(Default)]
struct CountingObserver {
    attempts: AtomicUsize,
    retries: AtomicUsize,
    blocked: AtomicUsize,
    rejected: AtomicUsize,
}

impl Observer for CountingObserver {
    fn on_attempt_start(&self, _context: &RequestContext) {
        self.attempts.fetch_add(1, Ordering::Relaxed);
    }

    fn on_retry_scheduled(&self, context: &RequestContext, _error: &Error, _delay: Duration) {
        assert!(context.attempt() < context.max_attempts());
        self.retries.fetch_add(1, Ordering::Relaxed);
    }

    fn on_blocked(&self, _context: &RequestContext, _status: StatusCode, marker: &str) {
        assert!(!marker.is_empty());
        self.blocked.fetch_add(1, Ordering::Relaxed);
    }

    fn on_circuit_rejected(&self, _context: &RequestContext, _retry_after: Duration) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }
}

#[test]
fn observers_see_each_stage() {
    let observer = Arc::new(CountingObserver::default());
    let transport = ScriptedTransport::new([
        status(429, "slow down"),
        status(200, CHALLENGE_PAGE),
    ]);
    let (_clock, client) = scripted_client(&transport, |builder| {
        builder.failure_threshold(2).observer_arc(observer.clone())
    });

    client.get(BOOK_URI).send().expect_err("blocked");
    client.get(BOOK_URI).send().expect_err("circuit open");

    assert_eq!(observer.attempts.load(Ordering::Relaxed), 2);
    assert_eq!(observer.retries.load(Ordering::Relaxed), 1);
    assert_eq!(observer.blocked.load(Ordering::Relaxed), 1);
    assert_eq!(observer.rejected.load(Ordering::Relaxed), 1);
}

#[test]
fn reset_clears_limiter_and_breaker() {
    let transport = ScriptedTransport::new([status(500, "boom")]);
    let (_clock, client) = scripted_client(&transport, |builder| {
        builder.max_retries(0).failure_threshold(1)
    });

    client.get(BOOK_URI).send().expect_err("opens circuit");
    assert_eq!(client.circuit_state(), CircuitState::Open);

    client.reset();
    assert_eq!(client.circuit_state(), CircuitState::Closed);
    assert_eq!(client.rate_limiter().last_request_at(), None);
}

#[test]
fn clones_share_pacing_and_circuit() {
    let transport = ScriptedTransport::new([status(500, "boom")]);
    let (_clock, client) = scripted_client(&transport, |builder| {
        builder.max_retries(0).failure_threshold(2)
    });
    let clone = client.clone();

    client.get(BOOK_URI).send().expect_err("first failure");
    clone.get(BOOK_URI).send().expect_err("second failure");

    assert_eq!(client.circuit_state(), CircuitState::Open);
    assert!(clone.get(BOOK_URI).send().expect_err("open").is_circuit_open());
}

#[test]
fn construction_matches_five_knobs() {
    let client = Client::new(
        Duration::from_millis(250),
        Duration::from_millis(50),
        2,
        4,
        Duration::from_secs(15),
    );

    assert_eq!(client.rate_limiter().min_delay(), Duration::from_millis(250));
    assert_eq!(client.rate_limiter().jitter_max(), Duration::from_millis(50));
    assert_eq!(client.max_retries(), 2);
    let policy = client.circuit_breaker().policy();
    assert_eq!(policy.configured_failure_threshold(), 4);
    assert_eq!(policy.configured_reset_timeout(), Duration::from_secs(15));
}
