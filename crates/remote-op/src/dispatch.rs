//! Request dispatch
//!
//! Sends one `RequestDescriptor` and waits for the response. No retry and,
//! unless configured, no timeout: a hung endpoint blocks the run.

use std::str::FromStr;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde_json::Value;
use tracing::{debug, instrument};

use crate::outcome::{FailureRecord, RequestError, parse_body};
use crate::request::RequestDescriptor;

/// Sends authorized requests over a shared HTTP client.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    client: reqwest::Client,
    timeout: Option<Duration>,
}

impl Dispatcher {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            timeout: None,
        }
    }

    /// Per-request timeout; `None` waits indefinitely.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Send the request. A 2xx yields the parsed body (JSON, or the raw text
    /// as a string, or `Null` when empty); anything else is a `RequestError`.
    #[instrument(skip_all, fields(operation = %request.operation(), method = %request.method(), url = %request.url()))]
    pub async fn send(&self, request: &RequestDescriptor) -> crate::Result<Value> {
        if !request.is_authorized() {
            return Err(RequestError::Transport(FailureRecord::transport(
                "refusing to send request without a bearer token",
            )));
        }

        let mut headers = HeaderMap::new();
        for (name, value) in request.headers() {
            let name = HeaderName::from_str(name).map_err(|e| {
                RequestError::Transport(FailureRecord::transport(format!(
                    "invalid header name {name}: {e}"
                )))
            })?;
            let value = HeaderValue::from_str(value).map_err(|e| {
                RequestError::Transport(FailureRecord::transport(format!(
                    "invalid value for header {name}: {e}"
                )))
            })?;
            headers.insert(name, value);
        }

        let mut builder = self
            .client
            .request(request.method().clone(), request.url())
            .headers(headers);
        if !request.query().is_empty() {
            builder = builder.query(request.query());
        }
        if let Some(body) = request.body() {
            builder = builder.body(body.to_string());
        }
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| RequestError::Transport(FailureRecord::transport(e.to_string())))?;

        let status = response.status();
        let bytes = response.bytes().await.map_err(|e| {
            RequestError::Transport(FailureRecord::transport(format!(
                "failed to read response body: {e}"
            )))
        })?;
        debug!(status = status.as_u16(), bytes = bytes.len(), "response received");

        if !status.is_success() {
            return Err(RequestError::Status(FailureRecord::from_response(
                status, &bytes,
            )));
        }

        Ok(parse_body(&bytes))
    }
}
