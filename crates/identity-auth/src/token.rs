//! Token wire types and the in-memory ID token
//!
//! The provider reports lifetimes as `expiresIn`, a string holding a delta
//! in seconds. `IdToken` converts this to an absolute unix millisecond
//! timestamp at acquisition time. Tokens are never written to disk.

use common::Secret;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// JSON body for sign-in and sign-up.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PasswordRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
    pub return_secure_token: bool,
}

/// Response from `accounts:signInWithPassword` and `accounts:signUp`.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignInResponse {
    pub id_token: String,
    pub refresh_token: String,
    /// Provider-assigned user id (uid)
    pub local_id: String,
    /// Seconds until the ID token expires, as a decimal string
    pub expires_in: String,
}

/// Response from the secure token refresh grant.
#[derive(Deserialize)]
pub struct RefreshResponse {
    pub id_token: String,
    pub refresh_token: String,
    pub user_id: String,
    /// Seconds until the ID token expires, as a decimal string
    pub expires_in: String,
}

/// Provider error envelope: `{"error": {"code": 400, "message": "INVALID_PASSWORD"}}`
#[derive(Deserialize)]
pub(crate) struct ProviderErrorBody {
    pub error: ProviderErrorDetail,
}

#[derive(Deserialize)]
pub(crate) struct ProviderErrorDetail {
    pub message: String,
}

/// Bearer token for one run.
#[derive(Debug, Clone)]
pub struct IdToken {
    value: Secret<String>,
    refresh: Secret<String>,
    user_id: String,
    /// Expiration as unix timestamp in milliseconds
    expires_at: u64,
}

impl IdToken {
    /// Build a token from raw parts. `expires_in` is the provider's seconds delta.
    pub fn new(
        value: String,
        refresh: String,
        user_id: String,
        expires_in: &str,
        now_millis: u64,
    ) -> Result<Self> {
        let secs: u64 = expires_in.trim().parse().map_err(|e| {
            Error::TokenExchange(format!("invalid expiresIn {expires_in:?}: {e}"))
        })?;
        let expires_at = secs
            .checked_mul(1000)
            .and_then(|ms| now_millis.checked_add(ms))
            .ok_or_else(|| Error::TokenExchange(format!("expiresIn out of range: {secs}")))?;
        Ok(Self {
            value: Secret::new(value),
            refresh: Secret::new(refresh),
            user_id,
            expires_at,
        })
    }

    pub fn from_sign_in(response: SignInResponse, now_millis: u64) -> Result<Self> {
        Self::new(
            response.id_token,
            response.refresh_token,
            response.local_id,
            &response.expires_in,
            now_millis,
        )
    }

    pub fn from_refresh(response: RefreshResponse, now_millis: u64) -> Result<Self> {
        Self::new(
            response.id_token,
            response.refresh_token,
            response.user_id,
            &response.expires_in,
            now_millis,
        )
    }

    pub fn value(&self) -> &Secret<String> {
        &self.value
    }

    pub fn refresh_token(&self) -> &Secret<String> {
        &self.refresh
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn expires_at_millis(&self) -> u64 {
        self.expires_at
    }

    pub fn is_expired_at(&self, now_millis: u64) -> bool {
        now_millis >= self.expires_at
    }

    /// `Authorization` header value for this token.
    pub fn bearer_header(&self) -> String {
        self.value.bearer_header()
    }
}

/// Current wall-clock time as unix milliseconds.
pub fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_in_response_deserializes_camel_case() {
        let json = r#"{
            "kind": "identitytoolkit#VerifyPasswordResponse",
            "localId": "uid-123",
            "email": "test@example.com",
            "idToken": "id-abc",
            "registered": true,
            "refreshToken": "rt-def",
            "expiresIn": "3600"
        }"#;
        let response: SignInResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.id_token, "id-abc");
        assert_eq!(response.refresh_token, "rt-def");
        assert_eq!(response.local_id, "uid-123");
        assert_eq!(response.expires_in, "3600");
    }

    #[test]
    fn refresh_response_deserializes_snake_case() {
        let json = r#"{
            "expires_in": "3600",
            "token_type": "Bearer",
            "refresh_token": "rt-new",
            "id_token": "id-new",
            "user_id": "uid-123",
            "project_id": "531274461726"
        }"#;
        let response: RefreshResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.id_token, "id-new");
        assert_eq!(response.user_id, "uid-123");
    }

    #[test]
    fn password_request_serializes_return_secure_token() {
        let body = PasswordRequest {
            email: "test@example.com",
            password: "123456",
            return_secure_token: true,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["email"], "test@example.com");
        assert_eq!(json["password"], "123456");
        assert_eq!(json["returnSecureToken"], true);
    }

    #[test]
    fn id_token_computes_absolute_expiry() {
        let token = IdToken::new("id".into(), "rt".into(), "uid".into(), "3600", 1_000).unwrap();
        assert_eq!(token.expires_at_millis(), 1_000 + 3_600_000);
        assert!(!token.is_expired_at(1_000));
        assert!(token.is_expired_at(1_000 + 3_600_000));
    }

    #[test]
    fn id_token_rejects_non_numeric_expiry() {
        let result = IdToken::new("id".into(), "rt".into(), "uid".into(), "soon", 0);
        assert!(matches!(result, Err(Error::TokenExchange(_))));
    }

    #[test]
    fn id_token_rejects_overflowing_expiry() {
        let result = IdToken::new(
            "id".into(),
            "rt".into(),
            "uid".into(),
            "18446744073709551",
            now_millis(),
        );
        assert!(matches!(result, Err(Error::TokenExchange(_))));

        let result = IdToken::new("id".into(), "rt".into(), "uid".into(), "1", u64::MAX);
        assert!(matches!(result, Err(Error::TokenExchange(_))));
    }

    #[test]
    fn id_token_debug_redacts_value() {
        let token =
            IdToken::new("id-secret".into(), "rt-secret".into(), "uid".into(), "60", 0).unwrap();
        let debug = format!("{token:?}");
        assert!(!debug.contains("id-secret"), "got: {debug}");
        assert!(!debug.contains("rt-secret"), "got: {debug}");
        assert!(debug.contains("uid"));
        assert_eq!(token.bearer_header(), "Bearer id-secret");
    }
}
