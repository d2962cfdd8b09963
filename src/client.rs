//! Base REST client.
//!
//! - Wraps `reqwest::Client` (gzip enabled)
//! - Joins paths onto the configured base URLs
//! - Merges the bearer header from the identity store into every request
//! - Maps the backend's status taxonomy onto [`Error`]
//!
//! Endpoint wrappers live in their own modules (`device`, `checkin`, `login`,
//! `pay`) as further `impl ApiClient` blocks; this module only carries the
//! shared plumbing.

use std::sync::Arc;

use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::AppConfig;
use crate::error::{Error, Result};
use crate::sign::Signer;
use crate::store::{auth_header, IdentityStore};

/// Standard `{ success, message, data }` response wrapper.
///
/// A 2xx response with `success = false` still carries a user-facing message
/// (and usually `data: null`); [`ApiEnvelope::into_data`] turns that case
/// into [`Error::Api`].
#[derive(Clone, Debug, Deserialize)]
#[serde(bound(deserialize = "T: serde::de::DeserializeOwned"))]
pub struct ApiEnvelope<T> {
    pub success: bool,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub data: Option<T>,
}

impl<T> ApiEnvelope<T> {
    pub fn into_data(self) -> Result<T> {
        if !self.success {
            return Err(Error::Api {
                message: self.message,
            });
        }
        self.data.ok_or_else(|| Error::Api {
            message: "response carried no data".into(),
        })
    }
}

/// Base client for the checkin/device backend
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    config: AppConfig,
    store: Arc<dyn IdentityStore>,
}

impl ApiClient {
    pub fn new(config: AppConfig, store: Arc<dyn IdentityStore>) -> Self {
        let http = reqwest::Client::builder()
            .gzip(true)
            .build()
            .expect("reqwest::Client build must succeed");
        Self {
            http,
            config,
            store,
        }
    }

    /// Use a custom `reqwest::Client`
    pub fn with_http(
        http: reqwest::Client,
        config: AppConfig,
        store: Arc<dyn IdentityStore>,
    ) -> Self {
        Self {
            http,
            config,
            store,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn store(&self) -> &dyn IdentityStore {
        self.store.as_ref()
    }

    /// Signer bound to the configured salt.
    pub fn signer(&self) -> Signer {
        Signer::from_config(&self.config)
    }

    /// Resolve a path against the main API base URL.
    pub(crate) fn endpoint(&self, path: &str) -> Result<Url> {
        join_url(&self.config.api_url, path)
    }

    /// Resolve a path against the A1 API base URL.
    pub(crate) fn a1_endpoint(&self, path: &str) -> Result<Url> {
        join_url(&self.config.a1_api_url, path)
    }

    pub(crate) async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        debug!(%url, "GET");
        let resp = self
            .http
            .get(url)
            .headers(auth_header(self.store.as_ref()))
            .send()
            .await?;
        decode(resp).await
    }

    pub(crate) async fn post_json<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        url: Url,
        body: &B,
    ) -> Result<T> {
        debug!(%url, "POST");
        let resp = self
            .http
            .post(url)
            .headers(auth_header(self.store.as_ref()))
            .json(body)
            .send()
            .await?;
        decode(resp).await
    }

    pub(crate) async fn put_json<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        url: Url,
        body: &B,
    ) -> Result<T> {
        debug!(%url, "PUT");
        let resp = self
            .http
            .put(url)
            .headers(auth_header(self.store.as_ref()))
            .json(body)
            .send()
            .await?;
        decode(resp).await
    }

    /// POST where only the status matters (the body is discarded).
    pub(crate) async fn post_unit<B: Serialize + ?Sized>(&self, url: Url, body: &B) -> Result<()> {
        debug!(%url, "POST");
        let resp = self
            .http
            .post(url)
            .headers(auth_header(self.store.as_ref()))
            .json(body)
            .send()
            .await?;
        check_status(resp).await
    }

    /// DELETE where only the status matters.
    pub(crate) async fn delete_unit<B: Serialize + ?Sized>(
        &self,
        url: Url,
        body: Option<&B>,
    ) -> Result<()> {
        debug!(%url, "DELETE");
        let mut req = self
            .http
            .delete(url)
            .headers(auth_header(self.store.as_ref()));
        if let Some(body) = body {
            req = req.json(body);
        }
        let resp = req.send().await?;
        check_status(resp).await
    }
}

fn join_url(base: &str, path: &str) -> Result<Url> {
    let joined = format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    );
    Url::parse(&joined).map_err(|e| Error::InvalidUrl(e.to_string()))
}

async fn decode<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T> {
    let status = resp.status();
    let bytes = resp.bytes().await?;
    if status.is_success() {
        serde_json::from_slice(&bytes).map_err(|e| Error::UnexpectedResponse {
            status: status.as_u16(),
            error: e.to_string(),
            body: truncated(&bytes),
        })
    } else {
        Err(status_error(status, &bytes))
    }
}

async fn check_status(resp: reqwest::Response) -> Result<()> {
    let status = resp.status();
    if status.is_success() {
        return Ok(());
    }
    let bytes = resp.bytes().await?;
    Err(status_error(status, &bytes))
}

fn status_error(status: StatusCode, bytes: &[u8]) -> Error {
    match status.as_u16() {
        401 => Error::Unauthorized,
        403 => Error::Forbidden,
        s if status.is_server_error() => Error::Server { status: s },
        s => Error::Status {
            status: s,
            body: truncated(bytes),
        },
    }
}

// Keep error payloads log-sized.
fn truncated(bytes: &[u8]) -> String {
    let mut body = String::from_utf8_lossy(bytes).to_string();
    if body.len() > 2048 {
        body.truncate(2048);
        body.push_str("...");
    }
    body
}
