//! Token sources
//!
//! A run needs exactly one bearer token before its first request. The
//! `TokenSource` trait hides how that token is obtained:
//! - `PasswordSignIn` signs in with existing credentials (the normal path)
//! - `PasswordSignUp` creates the account first and uses its session
//! - `StaticToken` hands out a pre-issued token (tests, emulators)
//!
//! Uses `Pin<Box<dyn Future>>` return types for dyn-compatibility
//! (`&dyn TokenSource`).

use std::future::Future;
use std::pin::Pin;

use tracing::info;

use crate::client::{Credentials, IdentityClient};
use crate::error::Result;
use crate::token::{IdToken, now_millis};

/// Obtains the bearer token for one run. Implementations must not cache
/// across calls.
pub trait TokenSource: Send + Sync {
    /// Identifier for logging (e.g. "password-sign-in")
    fn id(&self) -> &str;

    fn acquire(&self) -> Pin<Box<dyn Future<Output = Result<IdToken>> + Send + '_>>;
}

/// Email/password sign-in, optionally followed by a forced refresh.
pub struct PasswordSignIn {
    client: IdentityClient,
    credentials: Credentials,
    force_refresh: bool,
}

impl PasswordSignIn {
    pub fn new(client: IdentityClient, credentials: Credentials, force_refresh: bool) -> Self {
        Self {
            client,
            credentials,
            force_refresh,
        }
    }
}

impl TokenSource for PasswordSignIn {
    fn id(&self) -> &str {
        "password-sign-in"
    }

    fn acquire(&self) -> Pin<Box<dyn Future<Output = Result<IdToken>> + Send + '_>> {
        Box::pin(
            self.client
                .acquire_token(&self.credentials, self.force_refresh),
        )
    }
}

/// Account creation; the sign-up response doubles as the run's session.
pub struct PasswordSignUp {
    client: IdentityClient,
    credentials: Credentials,
}

impl PasswordSignUp {
    pub fn new(client: IdentityClient, credentials: Credentials) -> Self {
        Self {
            client,
            credentials,
        }
    }
}

impl TokenSource for PasswordSignUp {
    fn id(&self) -> &str {
        "password-sign-up"
    }

    fn acquire(&self) -> Pin<Box<dyn Future<Output = Result<IdToken>> + Send + '_>> {
        Box::pin(async move {
            let session = self.client.sign_up(&self.credentials).await?;
            let token = IdToken::from_sign_in(session, now_millis())?;
            info!(user_id = token.user_id(), "account created");
            Ok(token)
        })
    }
}

/// Pre-issued token, cloned on every acquire.
pub struct StaticToken(IdToken);

impl StaticToken {
    pub fn new(token: IdToken) -> Self {
        Self(token)
    }
}

impl TokenSource for StaticToken {
    fn id(&self) -> &str {
        "static"
    }

    fn acquire(&self) -> Pin<Box<dyn Future<Output = Result<IdToken>> + Send + '_>> {
        let token = self.0.clone();
        Box::pin(async move { Ok(token) })
    }
}
