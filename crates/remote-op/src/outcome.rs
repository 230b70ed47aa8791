//! Operation outcomes and failure records

use reqwest::StatusCode;
use serde::Serialize;
use serde_json::Value;

/// Placeholder used when a failed response carries no `details` field.
pub const NO_ADDITIONAL_DETAILS: &str = "No additional details";

/// Structured description of a failed operation.
///
/// Serialized with the field names operators already grep for:
/// `message`, `status`, `statusText`, `details`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailureRecord {
    /// Parsed response body, or the transport error text
    pub message: Value,
    pub status: Option<u16>,
    pub status_text: Option<String>,
    pub details: Value,
}

impl FailureRecord {
    /// Record for a non-2xx response.
    ///
    /// An empty body falls back to a generic "request failed" message so the
    /// record always says something.
    pub fn from_response(status: StatusCode, body: &[u8]) -> Self {
        let parsed = parse_body(body);
        let details = parsed
            .get("details")
            .filter(|d| !d.is_null())
            .cloned()
            .unwrap_or_else(|| Value::String(NO_ADDITIONAL_DETAILS.to_string()));
        let message = match parsed {
            Value::Null => Value::String(format!(
                "request failed with status code {}",
                status.as_u16()
            )),
            other => other,
        };
        Self {
            message,
            status: Some(status.as_u16()),
            status_text: status.canonical_reason().map(str::to_string),
            details,
        }
    }

    /// Record for a failure that never produced a response.
    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            message: Value::String(message.into()),
            status: None,
            status_text: None,
            details: Value::String(NO_ADDITIONAL_DETAILS.to_string()),
        }
    }

    /// "404 Not Found", or "no response" for transport failures.
    pub fn status_line(&self) -> String {
        match (self.status, &self.status_text) {
            (Some(code), Some(text)) => format!("{code} {text}"),
            (Some(code), None) => code.to_string(),
            (None, _) => "no response".to_string(),
        }
    }

    /// Message rendered for display: strings bare, everything else as JSON.
    pub fn message_text(&self) -> String {
        match &self.message {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

/// Failure of a single authenticated request.
#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    #[error("endpoint returned {}: {}", .0.status_line(), .0.message_text())]
    Status(FailureRecord),

    #[error("transport failure: {}", .0.message_text())]
    Transport(FailureRecord),
}

impl RequestError {
    pub fn record(&self) -> &FailureRecord {
        match self {
            RequestError::Status(record) | RequestError::Transport(record) => record,
        }
    }

    pub fn status(&self) -> Option<u16> {
        self.record().status
    }
}

/// Result of one operation, as reported to the operator.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Success(Value),
    Failure(FailureRecord),
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }
}

impl From<&crate::Result<Value>> for Outcome {
    fn from(result: &crate::Result<Value>) -> Self {
        match result {
            Ok(body) => Outcome::Success(body.clone()),
            Err(e) => Outcome::Failure(e.record().clone()),
        }
    }
}

/// Decode a response body: JSON when it parses, otherwise the raw text.
/// Empty bodies become `Null`.
pub fn parse_body(body: &[u8]) -> Value {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Value::Null;
    }
    serde_json::from_slice(body)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(body).into_owned()))
}
