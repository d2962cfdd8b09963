//! Login exchange and identity lifecycle.
//!
//! Flow:
//! 1. Ask the platform for a one-time login code (behind the [`CodeSource`]
//!    port; on device that is the SDK login call, in tests a fake).
//! 2. `POST /site/login` exchanges the code for an [`IdentityRecord`].
//! 3. The record is persisted wholesale and returned.
//!
//! [`Authenticator::login`] short-circuits when a cached, unexpired record
//! exists and no refresh is forced: the cached identity comes back without
//! any network traffic. Any failure along the exchange leaves the store
//! untouched, so a failed refresh never clobbers a still-valid session.
//!
//! Racing refreshes are not coordinated; the later write wins, and the
//! overwritten record was valid anyway.
//!
//! The account endpoints the exchange unlocks (`/wechat/phone`,
//! `/wechat/bind-phone`, `/wechat/profile`) live here too.

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, instrument, warn};

use crate::client::{ApiClient, ApiEnvelope};
use crate::error::Result;
use crate::identity::{redact_id, IdentityRecord, UserProfile};

/// Port for one-time platform login code acquisition.
///
/// Implementations call the platform SDK; a failed acquisition (no code
/// returned) surfaces as [`Error::Platform`](crate::Error::Platform).
#[async_trait]
pub trait CodeSource: Send + Sync {
    async fn login_code(&self) -> Result<String>;
}

/// Phone-number binding payload.
///
/// New clients send the one-time phone code; older clients still send the
/// encrypted blob, optionally with a code alongside. Exactly one mode is
/// chosen by construction.
#[derive(Clone, Debug, Serialize)]
#[serde(untagged)]
pub enum PhonePayload {
    Code {
        code: String,
    },
    Encrypted {
        #[serde(rename = "encryptedData")]
        encrypted_data: String,
        iv: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        code: Option<String>,
    },
}

#[derive(Clone, Debug, serde::Deserialize)]
struct ProfileData {
    user: Option<UserProfile>,
}

#[derive(Serialize)]
struct CodeBody<'a> {
    code: &'a str,
}

impl ApiClient {
    /// Exchange a one-time platform code for an identity record.
    ///
    /// `POST /site/login` with `{ "code": ... }`. Nothing is persisted here;
    /// callers decide what to do with the record.
    #[instrument(level = "debug", skip(self, code))]
    pub async fn site_login(&self, code: &str) -> Result<IdentityRecord> {
        let url = self.endpoint("/site/login")?;
        let env: ApiEnvelope<IdentityRecord> = self.post_json(url, &CodeBody { code }).await?;
        let record = env.into_data()?;
        debug!(openid = %redact_id(&record.openid), "login exchange succeeded");
        Ok(record)
    }

    /// Bind or verify the user's phone number.
    ///
    /// `POST /wechat/phone`.
    #[instrument(level = "debug", skip(self, payload))]
    pub async fn bind_phone(&self, payload: &PhonePayload) -> Result<Option<UserProfile>> {
        let url = self.endpoint("/wechat/phone")?;
        let env: ApiEnvelope<ProfileData> = self.post_json(url, payload).await?;
        Ok(env.into_data()?.user)
    }

    /// Register the account from a one-time phone code.
    ///
    /// `POST /wechat/bind-phone`.
    #[instrument(level = "debug", skip(self, code))]
    pub async fn register(&self, code: &str) -> Result<Option<UserProfile>> {
        let url = self.endpoint("/wechat/bind-phone")?;
        let env: ApiEnvelope<ProfileData> = self.post_json(url, &CodeBody { code }).await?;
        Ok(env.into_data()?.user)
    }

    /// Report the user's nickname and avatar.
    ///
    /// `POST /wechat/profile`.
    #[instrument(level = "debug", skip(self, nickname, avatar))]
    pub async fn update_profile(&self, nickname: &str, avatar: &str) -> Result<Option<UserProfile>> {
        #[derive(Serialize)]
        struct Body<'a> {
            nickname: &'a str,
            avatar: &'a str,
        }
        let url = self.endpoint("/wechat/profile")?;
        let env: ApiEnvelope<ProfileData> =
            self.post_json(url, &Body { nickname, avatar }).await?;
        Ok(env.into_data()?.user)
    }
}

/// Drives the cached-or-exchange login decision.
pub struct Authenticator<S> {
    client: ApiClient,
    code_source: S,
}

impl<S: CodeSource> Authenticator<S> {
    pub fn new(client: ApiClient, code_source: S) -> Self {
        Self {
            client,
            code_source,
        }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    /// Return the current identity, exchanging a fresh login when needed.
    ///
    /// With `refresh = false` a cached, unexpired record is returned as-is
    /// (no network). Otherwise a new code is acquired and exchanged, and the
    /// store is overwritten on success. On any failure the cached record is
    /// left alone and the error propagates.
    #[instrument(level = "debug", skip(self))]
    pub async fn login(&self, refresh: bool) -> Result<IdentityRecord> {
        if !refresh {
            match self.client.store().load() {
                Ok(Some(record)) if !record.token.is_expired() => {
                    debug!(openid = %redact_id(&record.openid), "using cached identity");
                    return Ok(record);
                }
                Ok(Some(_)) => debug!("cached identity expired; re-login"),
                Ok(None) => debug!("no cached identity; login"),
                Err(e) => warn!("cached identity unreadable, re-login: {e}"),
            }
        }

        let code = self.code_source.login_code().await?;
        let record = self.client.site_login(&code).await?;
        if let Err(e) = self.client.store().save(&record) {
            // The session is still usable this run; only persistence failed.
            warn!("failed to persist identity: {e}");
        }
        Ok(record)
    }
}
