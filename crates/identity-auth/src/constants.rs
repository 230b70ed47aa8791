//! Identity provider endpoints
//!
//! Public base URLs of the Firebase identity services. Only the base is
//! configurable; the paths are fixed by the provider's REST protocol.

/// Identity Toolkit base URL (sign-in, sign-up)
pub const DEFAULT_IDENTITY_URL: &str = "https://identitytoolkit.googleapis.com";

/// Secure Token service base URL (refresh-token exchange)
pub const DEFAULT_TOKEN_URL: &str = "https://securetoken.googleapis.com";

/// Email/password sign-in
pub const SIGN_IN_PATH: &str = "/v1/accounts:signInWithPassword";

/// Email/password account creation
pub const SIGN_UP_PATH: &str = "/v1/accounts:signUp";

/// Refresh-token grant
pub const REFRESH_PATH: &str = "/v1/token";
