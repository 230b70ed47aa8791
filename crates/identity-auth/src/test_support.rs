//! In-process identity provider for tests
//!
//! Answers sign-in, sign-up, and refresh on a single loopback port. Valid
//! credentials are any email with password `VALID_PASSWORD`; the API key
//! must be `TEST_API_KEY`. Refreshed tokens are numbered so callers can
//! tell a fresh token from a reused one.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use axum::body::Body;
use axum::http::{Request, StatusCode};
use tokio::net::TcpListener;

pub const TEST_API_KEY: &str = "test-api-key";
pub const VALID_PASSWORD: &str = "123456";

/// Mock provider answering sign-in, sign-up, and refresh on one port.
pub struct MockProvider {
    pub url: String,
    sign_ins: Arc<AtomicUsize>,
    refreshes: Arc<AtomicUsize>,
}

impl MockProvider {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        let sign_ins = Arc::new(AtomicUsize::new(0));
        let refreshes = Arc::new(AtomicUsize::new(0));

        let app = {
            let sign_ins = sign_ins.clone();
            let refreshes = refreshes.clone();
            axum::Router::new().fallback(move |request: Request<Body>| {
                let sign_ins = sign_ins.clone();
                let refreshes = refreshes.clone();
                async move { respond(request, &sign_ins, &refreshes).await }
            })
        };
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            url,
            sign_ins,
            refreshes,
        }
    }

    pub fn sign_ins(&self) -> usize {
        self.sign_ins.load(Ordering::SeqCst)
    }

    pub fn refreshes(&self) -> usize {
        self.refreshes.load(Ordering::SeqCst)
    }
}

fn provider_error(message: &str) -> (StatusCode, String) {
    (
        StatusCode::BAD_REQUEST,
        serde_json::json!({"error": {"code": 400, "message": message}}).to_string(),
    )
}

async fn respond(
    request: Request<Body>,
    sign_ins: &AtomicUsize,
    refreshes: &AtomicUsize,
) -> (StatusCode, String) {
    let path = request.uri().path().to_string();
    let query = request.uri().query().unwrap_or("").to_string();
    let bytes = axum::body::to_bytes(request.into_body(), 1024 * 1024)
        .await
        .unwrap();
    let body = String::from_utf8_lossy(&bytes).to_string();

    if !query.contains(&format!("key={TEST_API_KEY}")) {
        return provider_error("API_KEY_INVALID");
    }

    match path.as_str() {
        "/v1/accounts:signInWithPassword" => {
            let json: serde_json::Value = serde_json::from_str(&body).unwrap();
            if json["password"] != VALID_PASSWORD {
                return provider_error("INVALID_PASSWORD");
            }
            sign_ins.fetch_add(1, Ordering::SeqCst);
            (
                StatusCode::OK,
                serde_json::json!({
                    "localId": "uid-123",
                    "email": json["email"],
                    "idToken": "id-signin",
                    "refreshToken": "rt-1",
                    "expiresIn": "3600",
                    "registered": true,
                })
                .to_string(),
            )
        }
        "/v1/accounts:signUp" => {
            let json: serde_json::Value = serde_json::from_str(&body).unwrap();
            if json["email"] == "taken@example.com" {
                return provider_error("EMAIL_EXISTS");
            }
            (
                StatusCode::OK,
                serde_json::json!({
                    "localId": "uid-new",
                    "email": json["email"],
                    "idToken": "id-signup",
                    "refreshToken": "rt-new",
                    "expiresIn": "3600",
                })
                .to_string(),
            )
        }
        "/v1/token" => {
            if !body.contains("grant_type=refresh_token") || !body.contains("refresh_token=rt-1")
            {
                return provider_error("INVALID_REFRESH_TOKEN");
            }
            let n = refreshes.fetch_add(1, Ordering::SeqCst) + 1;
            (
                StatusCode::OK,
                serde_json::json!({
                    "id_token": format!("id-refreshed-{n}"),
                    "refresh_token": "rt-1",
                    "user_id": "uid-123",
                    "expires_in": "3600",
                    "token_type": "Bearer",
                })
                .to_string(),
            )
        }
        _ => (StatusCode::NOT_FOUND, String::from("not found")),
    }
}
