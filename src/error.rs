//! Unified error type for the crate.
//!
//! HTTP status handling follows the backend's taxonomy:
//! - 2xx: success, body decoded as JSON
//! - 401: unauthenticated, caller should run the login flow again
//! - 403: unauthorized, not retryable
//! - 5xx: server error, surfaced as-is with no automatic retry
//! - anything else: generic status error carrying a truncated body
//!
//! Envelope endpoints (`{ success, message, data }`) additionally map a 2xx
//! response with `success = false` to [`Error::Api`]. No retry or backoff is
//! attempted anywhere; every failure is terminal for that call.

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum Error {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid url: {0}")]
    InvalidUrl(String),

    #[error("unauthenticated (401): login required")]
    Unauthorized,

    #[error("forbidden (403)")]
    Forbidden,

    #[error("server error ({status})")]
    Server { status: u16 },

    #[error("request failed ({status}): {body}")]
    Status { status: u16, body: String },

    #[error("api error: {message}")]
    Api { message: String },

    #[error("unexpected response (status {status}): {error}; body: {body}")]
    UnexpectedResponse {
        status: u16,
        error: String,
        body: String,
    },

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("platform error: {0}")]
    Platform(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// True when the caller should re-run the login exchange before retrying.
    pub fn requires_login(&self) -> bool {
        matches!(self, Error::Unauthorized)
    }

    /// True for 5xx responses; the user gets a generic failure message.
    pub fn is_server(&self) -> bool {
        matches!(self, Error::Server { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unauthorized_requires_login() {
        assert!(Error::Unauthorized.requires_login());
        assert!(!Error::Forbidden.requires_login());
        assert!(!Error::Server { status: 502 }.requires_login());
    }

    #[test]
    fn server_classification() {
        assert!(Error::Server { status: 500 }.is_server());
        assert!(!Error::Unauthorized.is_server());
    }
}
