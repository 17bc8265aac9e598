use std::time::Duration;

use bytes::Bytes;
use http::header::{CONTENT_TYPE, HeaderName, HeaderValue};
use http::{HeaderMap, Method};
use serde::de::DeserializeOwned;

use crate::clock::CancelToken;
use crate::config::StatusPolicy;
use crate::response::Response;
use crate::util::{parse_header_name, parse_header_value};

use super::{Client, RequestOptions};

pub struct RequestBuilder<'a> {
    client: &'a Client,
    method: Method,
    uri: String,
    headers: HeaderMap,
    body: Bytes,
    options: RequestOptions,
    cancel: Option<CancelToken>,
}

impl<'a> RequestBuilder<'a> {
    pub(crate) fn new(client: &'a Client, method: Method, uri: String) -> Self {
        Self {
            client,
            method,
            uri,
            headers: HeaderMap::new(),
            body: Bytes::new(),
            options: RequestOptions::default(),
            cancel: None,
        }
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn try_header(self, name: &str, value: &str) -> crate::Result<Self> {
        let name = parse_header_name(name)?;
        let value = parse_header_value(name.as_str(), value)?;
        Ok(self.header(name, value))
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn form_body(self, encoded: impl Into<Bytes>) -> Self {
        self.body(encoded).header(
            CONTENT_TYPE,
            HeaderValue::from_static("application/x-www-form-urlencoded"),
        )
    }

    pub fn max_retries(mut self, max_retries: usize) -> Self {
        self.options.max_retries = Some(max_retries);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.options.request_timeout = Some(timeout.max(Duration::from_millis(1)));
        self
    }

    pub fn total_timeout(mut self, total_timeout: Duration) -> Self {
        self.options.total_timeout = Some(total_timeout.max(Duration::from_millis(1)));
        self
    }

    pub fn status_policy(mut self, status_policy: StatusPolicy) -> Self {
        self.options.status_policy = Some(status_policy);
        self
    }

    pub fn cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn send(self) -> crate::Result<Response> {
        let cancel = self.cancel.unwrap_or_default();
        self.client.send_request(
            self.method,
            self.uri,
            self.headers,
            self.body,
            self.options,
            &cancel,
        )
    }

    pub fn send_text(self) -> crate::Result<String> {
        Ok(self.send()?.text_lossy())
    }

    pub fn send_json<T>(self) -> crate::Result<T>
    where
        T: DeserializeOwned,
    {
        self.send()?.json()
    }

    /// Sends with [`StatusPolicy::Response`], so non-retryable failing
    /// statuses come back as responses.
    pub fn send_with_status(self) -> crate::Result<Response> {
        self.status_policy(StatusPolicy::Response).send()
    }
}
