//! Logged-in identity: tokens, user profile, expiry policy.
//!
//! The backend's login exchange returns one [`IdentityRecord`] bundling the
//! access/refresh tokens, the user profile, and the WeChat ids. The record is
//! persisted as a whole and replaced as a whole on every successful exchange;
//! no field is ever mutated in place.
//!
//! Expiry uses a 3-second safety buffer: a token whose `expires` lies within
//! the next 3 seconds already counts as expired, so a request never departs
//! with a token that dies mid-flight.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Safety buffer applied before the server-declared expiry.
const EXPIRY_BUFFER_SECS: i64 = 3;

/// Access/refresh token pair with the server-declared expiry.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TokenInfo {
    #[serde(rename = "accessToken")]
    pub access_token: String,
    #[serde(rename = "refreshToken")]
    pub refresh_token: String,
    /// Expiry timestamp as sent by the server (RFC 3339 or
    /// `YYYY-MM-DD HH:MM:SS`, both read as UTC)
    pub expires: String,
}

impl TokenInfo {
    /// Whether the token is expired right now (with the safety buffer).
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Whether the token is expired as of `now`.
    ///
    /// An unparseable `expires` counts as expired, forcing a fresh login
    /// instead of sending a request with an unknown-lifetime token.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        match parse_expiry(&self.expires) {
            Some(expires_at) => now + chrono::Duration::seconds(EXPIRY_BUFFER_SECS) > expires_at,
            None => true,
        }
    }

    /// `Authorization` header value for this token.
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.access_token)
    }
}

/// Backend user profile.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: i64,
    pub avatar: String,
    pub nickname: String,
    pub role: String,
    pub tel: String,
}

/// The persisted login session: tokens plus WeChat identifiers.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IdentityRecord {
    pub token: TokenInfo,
    pub user: Option<UserProfile>,
    pub openid: String,
    pub unionid: String,
}

fn parse_expiry(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(t) = DateTime::parse_from_rfc3339(raw) {
        return Some(t.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|t| t.and_utc())
}

/// Keep first and last two chars of an id for logs.
pub(crate) fn redact_id(id: &str) -> String {
    if id.len() <= 4 {
        format!("{}***", id)
    } else {
        format!("{}***{}", &id[..2], &id[id.len().saturating_sub(2)..])
    }
}
