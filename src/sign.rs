//! Request signing for local-refresh endpoints.
//!
//! Endpoints that run before any bearer token exists (a device reporting its
//! state, an applet refreshing checkin status) authenticate each request with
//! a per-request hash instead: the server recomputes the same digest from the
//! shared salt and rejects mismatches.
//!
//! Canonical digest input, in byte order:
//!
//! ```text
//! token + time + identifier + salt
//! ```
//!
//! where `token` is the checkin/device token, `time` is the unix timestamp in
//! seconds as a decimal string, `identifier` is the value of the caller's
//! [`Identifier`], and `salt` is the shared secret from
//! [`AppConfig::hash_salt`](crate::AppConfig). The digest is MD5, rendered as
//! 32 lowercase hex characters. The same inputs always produce the same
//! output; the server re-verifies by recomputation.
//!
//! The salt never appears in logs or `Debug` output.

use std::time::{SystemTime, UNIX_EPOCH};

use tracing::debug;

use crate::config::AppConfig;

/// The caller-supplied identifier a signature binds to.
///
/// Exactly one kind is present by construction; the server pairs the hash
/// with the matching request field.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Identifier {
    /// Device UUID reported by hardware
    Device(String),
    /// WeChat openid of the current user
    OpenId(String),
    /// Object-storage key of an uploaded file
    Key(String),
}

impl Identifier {
    /// The raw value fed into the digest.
    pub fn value(&self) -> &str {
        match self {
            Identifier::Device(v) | Identifier::OpenId(v) | Identifier::Key(v) => v,
        }
    }
}

/// A `time`/`hash` query-parameter pair ready to attach to a request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignedQuery {
    /// Unix timestamp in seconds, decimal string
    pub time: String,
    /// 32-char lowercase hex MD5 digest
    pub hash: String,
}

/// Computes request signatures from the shared salt.
#[derive(Clone)]
pub struct Signer {
    salt: String,
}

impl Signer {
    pub fn new(salt: impl Into<String>) -> Self {
        Self { salt: salt.into() }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.hash_salt.clone())
    }

    /// Compute the signature for an explicit timestamp.
    ///
    /// Always succeeds; the output is deterministic for identical inputs.
    pub fn sign(&self, token: &str, time: &str, identifier: &Identifier) -> String {
        let input = format!("{token}{time}{}{}", identifier.value(), self.salt);
        let hash = format!("{:x}", md5::compute(input.as_bytes()));
        debug!(%time, hash = %hash, "computed request signature");
        hash
    }

    /// Stamp the current time and sign it.
    pub fn signed_query(&self, token: &str, identifier: &Identifier) -> SignedQuery {
        let time = unix_time_secs().to_string();
        let hash = self.sign(token, &time, identifier);
        SignedQuery { time, hash }
    }
}

// Same rationale as AppConfig: the salt is a shared secret.
impl std::fmt::Debug for Signer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signer").field("salt", &"[redacted]").finish()
    }
}

fn unix_time_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
