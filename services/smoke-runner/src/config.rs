//! Configuration types and loading
//!
//! Config precedence: CLI args > env vars > config file > defaults.
//! The API key and password are loaded from IDENTITY_API_KEY /
//! IDENTITY_PASSWORD or from `api_key_file` / `password_file`, never from
//! the TOML directly, so the file can be committed alongside the smoke tests.

use common::Secret;
use identity_auth::{Credentials, DEFAULT_IDENTITY_URL, DEFAULT_TOKEN_URL};
use remote_op::HeaderInjection;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const API_KEY_ENV: &str = "IDENTITY_API_KEY";
pub const PASSWORD_ENV: &str = "IDENTITY_PASSWORD";
pub const EMAIL_ENV: &str = "IDENTITY_EMAIL";

/// Root configuration
#[derive(Debug, Deserialize)]
pub struct Config {
    pub identity: IdentityConfig,
    #[serde(default)]
    pub endpoints: EndpointsConfig,
    #[serde(default)]
    pub request: RequestConfig,
    /// Added to every endpoint request
    #[serde(default)]
    pub headers: Vec<HeaderInjection>,
    #[serde(default)]
    pub buckets: BucketsConfig,
}

/// Identity provider settings
#[derive(Debug, Deserialize)]
pub struct IdentityConfig {
    #[serde(default)]
    pub email: String,
    #[serde(skip)]
    pub api_key: Option<Secret<String>>,
    /// Path to a file containing the API key (alternative to IDENTITY_API_KEY)
    #[serde(default)]
    pub api_key_file: Option<PathBuf>,
    #[serde(skip)]
    pub password: Option<Secret<String>>,
    /// Path to a file containing the password (alternative to IDENTITY_PASSWORD)
    #[serde(default)]
    pub password_file: Option<PathBuf>,
    #[serde(default = "default_identity_url")]
    pub identity_url: String,
    #[serde(default = "default_token_url")]
    pub token_url: String,
    /// Exchange the refresh token right after sign-in so the bearer token
    /// is freshly minted.
    #[serde(default = "default_force_refresh")]
    pub force_refresh: bool,
}

/// Remote endpoints, one per cloud function. Each scenario requires only
/// the ones it calls.
#[derive(Debug, Default, Deserialize)]
pub struct EndpointsConfig {
    pub bucket_operations: Option<String>,
    pub code_update: Option<String>,
    pub data_update: Option<String>,
    pub destroy: Option<String>,
    pub output_workspace: Option<String>,
}

/// Per-request settings
#[derive(Debug, Default, Deserialize)]
pub struct RequestConfig {
    /// Unset means wait indefinitely
    pub timeout_secs: Option<u64>,
}

/// Files for the bucket scenario
#[derive(Debug, Deserialize)]
pub struct BucketsConfig {
    #[serde(default)]
    pub uploads: Vec<UploadSpec>,
    /// Every file under this directory is uploaded to `<data_prefix>/<relative path>`
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
    #[serde(default = "default_data_prefix")]
    pub data_prefix: String,
}

impl Default for BucketsConfig {
    fn default() -> Self {
        Self {
            uploads: Vec::new(),
            data_dir: None,
            data_prefix: default_data_prefix(),
        }
    }
}

/// One local file and where it lands in the bucket
#[derive(Debug, Clone, Deserialize)]
pub struct UploadSpec {
    pub file: PathBuf,
    pub path: String,
}

fn default_identity_url() -> String {
    DEFAULT_IDENTITY_URL.to_string()
}

fn default_token_url() -> String {
    DEFAULT_TOKEN_URL.to_string()
}

fn default_force_refresh() -> bool {
    true
}

fn default_data_prefix() -> String {
    "data".to_string()
}

fn validate_url(field: &str, url: &str) -> common::Result<()> {
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(common::Error::Config(format!(
            "{field} must start with http:// or https://, got: {url}"
        )));
    }
    Ok(())
}

/// Trimmed value of an env var, treating blank as unset.
fn env_value(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

/// Env var wins; otherwise read the file if one is configured.
fn resolve_secret(env: &str, file: Option<&Path>) -> common::Result<Option<Secret<String>>> {
    if let Some(value) = env_value(env) {
        return Ok(Some(Secret::new(value)));
    }
    match file {
        Some(path) => Secret::from_file(path).map_err(|e| {
            common::Error::Config(format!("failed to read {}: {e}", path.display()))
        }),
        None => Ok(None),
    }
}

impl Config {
    /// Load configuration from a TOML file, then overlay environment variables.
    pub fn load(path: &Path) -> common::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&contents)?;

        if let Some(email) = env_value(EMAIL_ENV) {
            config.identity.email = email;
        }
        if config.identity.email.trim().is_empty() {
            return Err(common::Error::Config(format!(
                "identity.email must be set (or {EMAIL_ENV})"
            )));
        }

        validate_url("identity.identity_url", &config.identity.identity_url)?;
        validate_url("identity.token_url", &config.identity.token_url)?;
        for (field, url) in config.endpoints.iter() {
            validate_url(field, url)?;
        }

        if config.request.timeout_secs == Some(0) {
            return Err(common::Error::Config(
                "request.timeout_secs must be greater than 0".into(),
            ));
        }

        config.identity.api_key =
            resolve_secret(API_KEY_ENV, config.identity.api_key_file.as_deref())?;
        config.identity.password =
            resolve_secret(PASSWORD_ENV, config.identity.password_file.as_deref())?;

        Ok(config)
    }

    /// Resolve config file path from CLI arg or CONFIG_PATH env var.
    pub fn resolve_path(cli_path: Option<&str>) -> PathBuf {
        if let Some(p) = cli_path {
            return PathBuf::from(p);
        }
        if let Ok(p) = std::env::var("CONFIG_PATH") {
            return PathBuf::from(p);
        }
        PathBuf::from("smoke-runner.toml")
    }

    pub fn api_key(&self) -> common::Result<Secret<String>> {
        self.identity
            .api_key
            .clone()
            .ok_or(common::Error::MissingSecret {
                env: API_KEY_ENV,
                file_key: "identity.api_key_file",
            })
    }

    pub fn credentials(&self) -> common::Result<Credentials> {
        let password = self
            .identity
            .password
            .clone()
            .ok_or(common::Error::MissingSecret {
                env: PASSWORD_ENV,
                file_key: "identity.password_file",
            })?;
        Ok(Credentials::new(self.identity.email.clone(), password))
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.request.timeout_secs.map(Duration::from_secs)
    }
}

impl EndpointsConfig {
    /// Configured endpoints as (config key, url) pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> {
        [
            ("endpoints.bucket_operations", &self.bucket_operations),
            ("endpoints.code_update", &self.code_update),
            ("endpoints.data_update", &self.data_update),
            ("endpoints.destroy", &self.destroy),
            ("endpoints.output_workspace", &self.output_workspace),
        ]
        .into_iter()
        .filter_map(|(field, url)| url.as_deref().map(|u| (field, u)))
    }
}

/// Look up an endpoint a scenario needs, failing with the config key name.
pub fn require<'a>(url: &'a Option<String>, field: &str) -> common::Result<&'a str> {
    url.as_deref()
        .ok_or_else(|| common::Error::Config(format!("{field} is not set")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Mutex to serialize tests that mutate environment variables, preventing
    /// data races when tests run in parallel.
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    /// SAFETY: Callers must hold ENV_MUTEX to prevent concurrent env mutation.
    unsafe fn set_env(key: &str, val: &str) {
        unsafe { std::env::set_var(key, val) };
    }

    unsafe fn remove_env(key: &str) {
        unsafe { std::env::remove_var(key) };
    }

    fn clear_identity_env() {
        unsafe {
            remove_env(API_KEY_ENV);
            remove_env(PASSWORD_ENV);
            remove_env(EMAIL_ENV);
        }
    }

    fn write_config(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join("smoke-runner.toml");
        std::fs::write(&path, body).unwrap();
        path
    }

    fn valid_toml() -> &'static str {
        r#"
[identity]
email = "test@example.com"

[endpoints]
bucket_operations = "https://us-central1-example.cloudfunctions.net/bucket_operations"
code_update = "https://code-update.example.run.app"
data_update = "https://data-update.example.run.app"
destroy = "https://destroy-resources.example.run.app"

[[headers]]
name = "x-smoke-run"
value = "nightly"

[buckets]
uploads = [
    { file = "mnist_test.py", path = "src/mnist_test.py" },
    { file = "config.json", path = "config.json" },
]
"#
    }

    #[test]
    fn test_load_valid_config() {
        let _lock = ENV_MUTEX.lock().unwrap();
        clear_identity_env();
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(dir.path(), valid_toml());

        let config = Config::load(&path).unwrap();
        assert_eq!(config.identity.email, "test@example.com");
        assert_eq!(config.identity.identity_url, DEFAULT_IDENTITY_URL);
        assert_eq!(config.identity.token_url, DEFAULT_TOKEN_URL);
        assert!(config.identity.force_refresh);
        assert_eq!(
            config.endpoints.destroy.as_deref(),
            Some("https://destroy-resources.example.run.app")
        );
        assert!(config.endpoints.output_workspace.is_none());
        assert_eq!(config.buckets.uploads.len(), 2);
        assert_eq!(config.buckets.uploads[0].path, "src/mnist_test.py");
        assert_eq!(config.buckets.data_prefix, "data");
        assert_eq!(config.headers[0].name, "x-smoke-run");
        assert!(config.timeout().is_none());
        assert!(config.identity.api_key.is_none());
        assert!(config.identity.password.is_none());
    }

    #[test]
    fn test_load_missing_file() {
        let result = Config::load(Path::new("/nonexistent/path/smoke-runner.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_invalid_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(dir.path(), "not valid {{{{ toml");
        assert!(Config::load(&path).is_err());
    }

    #[test]
    fn test_secrets_from_files() {
        let _lock = ENV_MUTEX.lock().unwrap();
        clear_identity_env();
        let dir = tempfile::tempdir().unwrap();
        let key_path = dir.path().join("api_key");
        let pw_path = dir.path().join("password");
        std::fs::write(&key_path, "AIza-file-key\n").unwrap();
        std::fs::write(&pw_path, "pw-from-file\n").unwrap();

        let body = format!(
            r#"
[identity]
email = "test@example.com"
api_key_file = "{}"
password_file = "{}"
"#,
            key_path.display(),
            pw_path.display()
        );
        let path = write_config(dir.path(), &body);

        let config = Config::load(&path).unwrap();
        assert_eq!(config.api_key().unwrap().expose(), "AIza-file-key");
        let creds = config.credentials().unwrap();
        assert_eq!(creds.email, "test@example.com");
        assert_eq!(creds.password.expose(), "pw-from-file");
    }

    #[test]
    fn test_env_overrides_files_and_email() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let pw_path = dir.path().join("password");
        std::fs::write(&pw_path, "pw-from-file").unwrap();

        let body = format!(
            r#"
[identity]
email = "file@example.com"
password_file = "{}"
"#,
            pw_path.display()
        );
        let path = write_config(dir.path(), &body);

        unsafe {
            set_env(API_KEY_ENV, "AIza-env-key");
            set_env(PASSWORD_ENV, "pw-from-env");
            set_env(EMAIL_ENV, "env@example.com");
        }
        let config = Config::load(&path).unwrap();
        clear_identity_env();

        assert_eq!(config.api_key().unwrap().expose(), "AIza-env-key");
        let creds = config.credentials().unwrap();
        assert_eq!(creds.email, "env@example.com");
        assert_eq!(
            creds.password.expose(),
            "pw-from-env",
            "IDENTITY_PASSWORD must take precedence over password_file"
        );
    }

    #[test]
    fn test_missing_secrets_reported_on_access() {
        let _lock = ENV_MUTEX.lock().unwrap();
        clear_identity_env();
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(dir.path(), valid_toml());

        let config = Config::load(&path).unwrap();
        let err = config.api_key().unwrap_err().to_string();
        assert!(err.contains(API_KEY_ENV), "got: {err}");
        let err = config.credentials().unwrap_err().to_string();
        assert!(err.contains(PASSWORD_ENV), "got: {err}");
    }

    #[test]
    fn test_missing_password_file_is_error() {
        let _lock = ENV_MUTEX.lock().unwrap();
        clear_identity_env();
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            dir.path(),
            r#"
[identity]
email = "test@example.com"
password_file = "/nonexistent/path/password"
"#,
        );
        assert!(Config::load(&path).is_err());
    }

    #[test]
    fn test_empty_email_rejected() {
        let _lock = ENV_MUTEX.lock().unwrap();
        clear_identity_env();
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(dir.path(), "[identity]\nemail = \"\"\n");

        let err = Config::load(&path).unwrap_err().to_string();
        assert!(err.contains("identity.email"), "got: {err}");
    }

    #[test]
    fn test_invalid_endpoint_url_rejected() {
        let _lock = ENV_MUTEX.lock().unwrap();
        clear_identity_env();
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            dir.path(),
            r#"
[identity]
email = "test@example.com"

[endpoints]
destroy = "destroy-resources.example.run.app"
"#,
        );

        let err = Config::load(&path).unwrap_err().to_string();
        assert!(
            err.contains("endpoints.destroy must start with http"),
            "error message should name the field, got: {err}"
        );
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let _lock = ENV_MUTEX.lock().unwrap();
        clear_identity_env();
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            dir.path(),
            r#"
[identity]
email = "test@example.com"

[request]
timeout_secs = 0
"#,
        );
        assert!(Config::load(&path).is_err());
    }

    #[test]
    fn test_custom_timeout() {
        let _lock = ENV_MUTEX.lock().unwrap();
        clear_identity_env();
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            dir.path(),
            r#"
[identity]
email = "test@example.com"
force_refresh = false

[request]
timeout_secs = 30
"#,
        );
        let config = Config::load(&path).unwrap();
        assert_eq!(config.timeout(), Some(Duration::from_secs(30)));
        assert!(!config.identity.force_refresh);
    }

    #[test]
    fn test_require_names_missing_field() {
        let endpoints = EndpointsConfig::default();
        let err = require(&endpoints.destroy, "endpoints.destroy")
            .unwrap_err()
            .to_string();
        assert_eq!(err, "Configuration error: endpoints.destroy is not set");
    }

    #[test]
    fn test_resolve_path_cli_arg() {
        let path = Config::resolve_path(Some("/custom/path.toml"));
        assert_eq!(path, PathBuf::from("/custom/path.toml"));
    }

    #[test]
    fn test_resolve_path_env_var() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { set_env("CONFIG_PATH", "/env/path.toml") };
        let path = Config::resolve_path(None);
        assert_eq!(path, PathBuf::from("/env/path.toml"));
        unsafe { remove_env("CONFIG_PATH") };
    }

    #[test]
    fn test_resolve_path_default() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { remove_env("CONFIG_PATH") };
        let path = Config::resolve_path(None);
        assert_eq!(path, PathBuf::from("smoke-runner.toml"));
    }
}
