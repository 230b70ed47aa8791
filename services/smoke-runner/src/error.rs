//! Run-level error type
//!
//! A run fails in exactly one of two ways: the token could not be obtained,
//! or an endpoint request failed. Both end the run with exit code 1.
//! Config and input problems are reported by `main` before a run starts.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RunError {
    #[error("authentication failed: {0}")]
    Auth(#[from] identity_auth::Error),

    #[error("request failed: {0}")]
    Request(#[from] remote_op::RequestError),
}

impl RunError {
    /// Kind label used in structured logs
    pub fn kind(&self) -> &'static str {
        match self {
            RunError::Auth(_) => "AuthError",
            RunError::Request(_) => "RequestError",
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            RunError::Auth(e) => e.status(),
            RunError::Request(e) => e.status(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use remote_op::{FailureRecord, RequestError};

    #[test]
    fn auth_error_kind_and_status() {
        let err = RunError::from(identity_auth::Error::InvalidCredentials {
            status: 400,
            message: "INVALID_PASSWORD".into(),
        });
        assert_eq!(err.kind(), "AuthError");
        assert_eq!(err.status(), Some(400));
        assert!(err.to_string().contains("INVALID_PASSWORD"));
    }

    #[test]
    fn request_error_kind_and_status() {
        let err = RunError::from(RequestError::Status(FailureRecord::from_response(
            reqwest::StatusCode::NOT_FOUND,
            b"",
        )));
        assert_eq!(err.kind(), "RequestError");
        assert_eq!(err.status(), Some(404));
    }

    #[test]
    fn error_debug_includes_variant_name() {
        let err = RunError::from(identity_auth::Error::Http("connection refused".into()));
        let debug = format!("{err:?}");
        assert!(
            debug.contains("Auth"),
            "Debug output must include variant name, got: {debug}"
        );
    }
}
