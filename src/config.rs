//! Application configuration.
//!
//! All endpoints and the signing salt live in one explicit [`AppConfig`]
//! value handed to [`crate::ApiClient`] at construction; nothing reads
//! ambient globals. Each field can be overridden through an environment
//! variable, falling back to the documented defaults.
//!
//! Environment variables:
//! - `WXCHECKIN_API_URL`: main REST API base URL
//! - `WXCHECKIN_A1_API_URL`: A1 (checkin catalogue) API base URL
//! - `WXCHECKIN_CLOUD_ENV`: cloud object-storage environment id
//! - `WXCHECKIN_HASH_SALT`: shared secret for signed local-refresh requests

/// Fallback values used when an environment variable is unset.
const DEFAULT_API_URL: &str = "https://x.4mr.cn/v2";
const DEFAULT_A1_API_URL: &str = "https://a1.4mr.cn/v1";
const DEFAULT_CLOUD_ENV: &str = "game-9ghhigyq57e00dc3";
const DEFAULT_HASH_SALT: &str = "buj1aban.c0m";

/// Runtime configuration for API clients and the request signer.
#[derive(Clone)]
pub struct AppConfig {
    /// Main REST API base URL
    pub api_url: String,
    /// A1 API base URL (checkin catalogue endpoints)
    pub a1_api_url: String,
    /// Cloud object-storage environment id
    pub cloud_env: String,
    /// Shared secret mixed into local-refresh signatures
    pub hash_salt: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            a1_api_url: DEFAULT_A1_API_URL.to_string(),
            cloud_env: DEFAULT_CLOUD_ENV.to_string(),
            hash_salt: DEFAULT_HASH_SALT.to_string(),
        }
    }
}

impl AppConfig {
    /// Build a config from the environment, defaulting unset fields.
    pub fn from_env() -> Self {
        Self {
            api_url: env_or("WXCHECKIN_API_URL", DEFAULT_API_URL),
            a1_api_url: env_or("WXCHECKIN_A1_API_URL", DEFAULT_A1_API_URL),
            cloud_env: env_or("WXCHECKIN_CLOUD_ENV", DEFAULT_CLOUD_ENV),
            hash_salt: env_or("WXCHECKIN_HASH_SALT", DEFAULT_HASH_SALT),
        }
    }

    /// Override the main API base URL.
    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    /// Override the A1 API base URL.
    pub fn with_a1_api_url(mut self, url: impl Into<String>) -> Self {
        self.a1_api_url = url.into();
        self
    }

    /// Override the signing salt.
    pub fn with_hash_salt(mut self, salt: impl Into<String>) -> Self {
        self.hash_salt = salt.into();
        self
    }
}

// The salt is a shared secret; keep it out of Debug output.
impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_url", &self.api_url)
            .field("a1_api_url", &self.a1_api_url)
            .field("cloud_env", &self.cloud_env)
            .field("hash_salt", &"[redacted]")
            .finish()
    }
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}
