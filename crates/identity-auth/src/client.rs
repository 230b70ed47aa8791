//! Identity provider client
//!
//! Handles the three provider interactions:
//! 1. Email/password sign-in (`accounts:signInWithPassword`)
//! 2. Account creation (`accounts:signUp`)
//! 3. Refresh-token exchange (secure token service)
//!
//! Every call carries the project API key as the `key` query parameter.

use common::Secret;
use tracing::{debug, info, instrument};

use crate::constants::{
    DEFAULT_IDENTITY_URL, DEFAULT_TOKEN_URL, REFRESH_PATH, SIGN_IN_PATH, SIGN_UP_PATH,
};
use crate::error::{Error, Result};
use crate::token::{
    IdToken, PasswordRequest, ProviderErrorBody, RefreshResponse, SignInResponse, now_millis,
};

/// Email/password credentials for the identity provider.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub email: String,
    pub password: Secret<String>,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: Secret<String>) -> Self {
        Self {
            email: email.into(),
            password,
        }
    }
}

/// Client for the identity provider's REST API.
#[derive(Debug, Clone)]
pub struct IdentityClient {
    http: reqwest::Client,
    api_key: Secret<String>,
    identity_url: String,
    token_url: String,
}

impl IdentityClient {
    /// Client against the public provider endpoints.
    pub fn new(http: reqwest::Client, api_key: Secret<String>) -> Self {
        Self {
            http,
            api_key,
            identity_url: DEFAULT_IDENTITY_URL.to_string(),
            token_url: DEFAULT_TOKEN_URL.to_string(),
        }
    }

    /// Override the provider base URLs (emulators, tests).
    pub fn with_endpoints(
        mut self,
        identity_url: impl Into<String>,
        token_url: impl Into<String>,
    ) -> Self {
        self.identity_url = identity_url.into();
        self.token_url = token_url.into();
        self
    }

    /// Verify email/password and return the provider's session tokens.
    ///
    /// Any 4xx is reported as `InvalidCredentials` carrying the provider's
    /// reason code (e.g. `INVALID_PASSWORD`, `EMAIL_NOT_FOUND`).
    #[instrument(skip_all, fields(email = %credentials.email))]
    pub async fn sign_in_with_password(&self, credentials: &Credentials) -> Result<SignInResponse> {
        let url = endpoint(&self.identity_url, SIGN_IN_PATH);
        self.password_call(&url, credentials, "sign-in").await
    }

    /// Create a new account with email/password. The response has the
    /// same shape as sign-in, so the new account is signed in immediately.
    #[instrument(skip_all, fields(email = %credentials.email))]
    pub async fn sign_up(&self, credentials: &Credentials) -> Result<SignInResponse> {
        let url = endpoint(&self.identity_url, SIGN_UP_PATH);
        self.password_call(&url, credentials, "sign-up").await
    }

    /// Exchange a refresh token for a freshly minted ID token.
    pub async fn refresh_id_token(&self, refresh: &Secret<String>) -> Result<RefreshResponse> {
        let url = endpoint(&self.token_url, REFRESH_PATH);
        let response = self
            .http
            .post(&url)
            .query(&[("key", self.api_key.expose().as_str())])
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh.expose().as_str()),
            ])
            .send()
            .await
            .map_err(|e| Error::Http(format!("token refresh request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let message = provider_message(response).await;
            // 4xx means the refresh token is revoked, expired, or the key is wrong
            if status.is_client_error() {
                return Err(Error::InvalidCredentials {
                    status: status.as_u16(),
                    message,
                });
            }
            return Err(Error::TokenExchange(format!(
                "token refresh returned {status}: {message}"
            )));
        }

        response
            .json::<RefreshResponse>()
            .await
            .map_err(|e| Error::TokenExchange(format!("invalid refresh response: {e}")))
    }

    /// Sign in and, when `force_refresh` is set, immediately exchange the
    /// refresh token so the bearer token is freshly issued.
    ///
    /// Nothing is cached: every call goes to the provider.
    pub async fn acquire_token(
        &self,
        credentials: &Credentials,
        force_refresh: bool,
    ) -> Result<IdToken> {
        let session = self.sign_in_with_password(credentials).await?;
        let token = IdToken::from_sign_in(session, now_millis())?;
        info!(user_id = token.user_id(), "signed in");

        if !force_refresh {
            return Ok(token);
        }

        let refreshed = self.refresh_id_token(token.refresh_token()).await?;
        let token = IdToken::from_refresh(refreshed, now_millis())?;
        debug!(
            user_id = token.user_id(),
            expires_at = token.expires_at_millis(),
            "token force-refreshed"
        );
        Ok(token)
    }

    async fn password_call(
        &self,
        url: &str,
        credentials: &Credentials,
        action: &str,
    ) -> Result<SignInResponse> {
        let body = PasswordRequest {
            email: &credentials.email,
            password: credentials.password.expose(),
            return_secure_token: true,
        };

        let response = self
            .http
            .post(url)
            .query(&[("key", self.api_key.expose().as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Http(format!("{action} request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let message = provider_message(response).await;
            if status.is_client_error() {
                return Err(Error::InvalidCredentials {
                    status: status.as_u16(),
                    message,
                });
            }
            return Err(Error::TokenExchange(format!(
                "{action} returned {status}: {message}"
            )));
        }

        response
            .json::<SignInResponse>()
            .await
            .map_err(|e| Error::TokenExchange(format!("invalid {action} response: {e}")))
    }
}

fn endpoint(base: &str, path: &str) -> String {
    format!("{}{}", base.trim_end_matches('/'), path)
}

/// Pull the provider's reason code out of an error response, falling back
/// to the raw body.
async fn provider_message(response: reqwest::Response) -> String {
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| String::from("<no body>"));
    match serde_json::from_str::<ProviderErrorBody>(&body) {
        Ok(parsed) => parsed.error.message,
        Err(_) => body,
    }
}
