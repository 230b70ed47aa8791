//! Identity-provider authentication library
//!
//! Obtains bearer tokens from a Firebase-style identity provider using the
//! Identity Toolkit REST protocol. The client is an explicitly constructed
//! value with no process-wide state; callers build one at the start of a
//! run and drop it at exit.
//!
//! Token flow:
//! 1. `IdentityClient::sign_in_with_password()` verifies email/password
//! 2. `IdentityClient::refresh_id_token()` exchanges the refresh token for
//!    a freshly minted ID token (the "force refresh" step)
//! 3. The resulting `IdToken` is attached as `Authorization: Bearer <token>`
//!    by the caller
//!
//! `TokenSource` abstracts over how a run obtains its token so the runner
//! can be driven by sign-in, sign-up, or a fixed token in tests.

pub mod client;
pub mod constants;
pub mod error;
pub mod source;
pub mod token;

#[cfg(any(test, feature = "test-util"))]
pub mod test_support;

pub use client::{Credentials, IdentityClient};
pub use constants::*;
pub use error::{Error, Result};
pub use source::{PasswordSignIn, PasswordSignUp, StaticToken, TokenSource};
pub use token::{IdToken, RefreshResponse, SignInResponse, now_millis};
