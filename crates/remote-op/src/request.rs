//! Request descriptors
//!
//! A `RequestDescriptor` can only be built with a bearer token, so an
//! unauthenticated request is unrepresentable. Fields are private and
//! there are no setters: once built, a descriptor is sent as-is.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use reqwest::Method;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderName, HeaderValue};
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use crate::operation::Operation;

/// Extra header from config (name + value pair).
#[derive(Debug, Clone, Deserialize)]
pub struct HeaderInjection {
    pub name: String,
    pub value: String,
}

/// Immutable, authorized request for one operation.
#[derive(Clone, PartialEq)]
pub struct RequestDescriptor {
    operation: String,
    method: Method,
    url: String,
    query: Vec<(String, String)>,
    headers: BTreeMap<String, String>,
    body: Option<Value>,
}

impl RequestDescriptor {
    /// Build the request for `operation` against `url`, authorized with `token`.
    ///
    /// Extra headers are applied first; `authorization` and `content-type`
    /// are always set last and cannot be overridden by config.
    pub fn authorized(
        url: &str,
        operation: &Operation,
        token: &str,
        extra_headers: &[HeaderInjection],
    ) -> Self {
        let mut headers = BTreeMap::new();
        for injection in extra_headers {
            let name = match HeaderName::from_str(&injection.name) {
                Ok(n) => n,
                Err(e) => {
                    warn!(header = %injection.name, error = %e, "skipping invalid header name");
                    continue;
                }
            };
            if name == AUTHORIZATION || name == CONTENT_TYPE {
                warn!(header = %injection.name, "refusing to override protected header");
                continue;
            }
            if let Err(e) = HeaderValue::from_str(&injection.value) {
                warn!(header = %injection.name, error = %e, "skipping invalid header value");
                continue;
            }
            headers.insert(name.as_str().to_string(), injection.value.clone());
        }

        headers.insert(AUTHORIZATION.as_str().to_string(), format!("Bearer {token}"));
        headers.insert(
            CONTENT_TYPE.as_str().to_string(),
            "application/json".to_string(),
        );

        Self {
            operation: operation.name().to_string(),
            method: operation.method(),
            url: url.to_string(),
            query: operation.query(),
            headers,
            body: operation.body(),
        }
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn query(&self) -> &[(String, String)] {
        &self.query
    }

    /// Header map keyed by lowercase header name.
    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    pub fn body(&self) -> Option<&Value> {
        self.body.as_ref()
    }

    /// Whether the descriptor carries a non-empty bearer token.
    pub fn is_authorized(&self) -> bool {
        self.headers
            .get(AUTHORIZATION.as_str())
            .and_then(|v| v.strip_prefix("Bearer "))
            .is_some_and(|t| !t.is_empty())
    }
}

impl fmt::Debug for RequestDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let headers: BTreeMap<&str, &str> = self
            .headers
            .iter()
            .map(|(k, v)| {
                if k == AUTHORIZATION.as_str() {
                    (k.as_str(), "Bearer [REDACTED]")
                } else {
                    (k.as_str(), v.as_str())
                }
            })
            .collect();
        f.debug_struct("RequestDescriptor")
            .field("operation", &self.operation)
            .field("method", &self.method)
            .field("url", &self.url)
            .field("query", &self.query)
            .field("headers", &headers)
            .field("body", &self.body)
            .finish()
    }
}
