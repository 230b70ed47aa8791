//! Error types for identity-provider operations

/// Errors from sign-in, sign-up, and token refresh.
///
/// Every variant is fatal to a run: there is no retry at this layer.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("identity provider unreachable: {0}")]
    Http(String),

    #[error("invalid credentials ({status}): {message}")]
    InvalidCredentials { status: u16, message: String },

    #[error("token exchange failed: {0}")]
    TokenExchange(String),
}

impl Error {
    /// HTTP status returned by the provider, if the failure came from a response.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::InvalidCredentials { status, .. } => Some(*status),
            Error::Http(_) | Error::TokenExchange(_) => None,
        }
    }
}

/// Result alias for identity operations.
pub type Result<T> = std::result::Result<T, Error>;
