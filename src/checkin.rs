//! Checkin status reporting over the signed local-refresh endpoint.
//!
//! `POST /server/applet` is callable before any bearer token exists: the
//! `time`/`hash` query pair from [`Signer::signed_query`](crate::Signer)
//! stands in for it. The bearer header is still merged when a session is
//! present, so a logged-in applet gets both. The response expands the full
//! status bundle (token, file, device, setup, applet) in one round trip.
//!
//! `ready`/`over`/`linked` are the three applet-driven status transitions;
//! each is a thin shortcut over [`ApiClient::local_refresh`].

use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::client::{ApiClient, ApiEnvelope};
use crate::error::Result;
use crate::sign::Identifier;

/// Checkin row as the server reports it.
#[derive(Clone, Debug, Deserialize)]
pub struct CheckinInfo {
    pub created_at: String,
    pub id: String,
    pub status: String,
    pub updated_at: String,
}

/// Device-side report attached to a checkin.
#[derive(Clone, Debug, Deserialize)]
pub struct ReportInfo {
    pub token: String,
    pub device: String,
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
    #[serde(default)]
    pub data: Option<String>,
}

/// Display setup snapshot for the device.
#[derive(Clone, Debug, Deserialize)]
pub struct SetupInfo {
    pub money: i64,
    pub slogans: Vec<String>,
    pub shots: Vec<u32>,
    pub thumbs: Vec<String>,
}

/// Uploaded-file pointer.
#[derive(Clone, Debug, Deserialize)]
pub struct FileMeta {
    pub key: String,
    pub created_at: String,
}

/// Full status bundle returned by the local-refresh endpoint.
#[derive(Clone, Debug, Deserialize)]
pub struct StatusData {
    pub token: String,
    #[serde(default)]
    pub applet: Option<CheckinInfo>,
    #[serde(default)]
    pub device: Option<ReportInfo>,
    #[serde(default)]
    pub file: Option<FileMeta>,
    #[serde(default)]
    pub setup: Option<SetupInfo>,
}

/// Checkin catalogue entry from the A1 API.
#[derive(Clone, Debug, Deserialize)]
pub struct Verse {
    pub verse_id: i64,
    #[serde(default)]
    pub name: String,
}

#[derive(Serialize)]
struct RefreshBody<'a> {
    token: &'a str,
    id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<&'a str>,
    data: String,
}

impl ApiClient {
    /// Report status and pull the expanded bundle in one signed call.
    ///
    /// `data` rides along as a string: string values pass through, other
    /// JSON values are serialized, absent means empty.
    #[instrument(level = "debug", skip(self, token, data))]
    pub async fn local_refresh(
        &self,
        token: &str,
        identifier: &Identifier,
        status: Option<&str>,
        data: Option<serde_json::Value>,
    ) -> Result<StatusData> {
        let signed = self.signer().signed_query(token, identifier);
        let mut url = self.endpoint("/server/applet")?;
        {
            let mut qp = url.query_pairs_mut();
            qp.append_pair("time", &signed.time);
            qp.append_pair("hash", &signed.hash);
            qp.append_pair("expand", "token,file,device,setup,applet");
        }

        let data = match data {
            None => String::new(),
            Some(serde_json::Value::String(s)) => s,
            Some(other) => other.to_string(),
        };
        let body = RefreshBody {
            token,
            id: identifier.value(),
            status,
            data,
        };

        let env: ApiEnvelope<StatusData> = self.post_json(url, &body).await?;
        env.into_data()
    }

    /// Mark the checkin ready for the device.
    pub async fn set_ready(&self, token: &str, identifier: &Identifier) -> Result<StatusData> {
        self.local_refresh(token, identifier, Some("ready"), None).await
    }

    /// Mark the checkin finished.
    pub async fn set_over(&self, token: &str, identifier: &Identifier) -> Result<StatusData> {
        self.local_refresh(token, identifier, Some("over"), None).await
    }

    /// Mark the checkin linked to a device.
    pub async fn set_linked(&self, token: &str, identifier: &Identifier) -> Result<StatusData> {
        self.local_refresh(token, identifier, Some("linked"), None).await
    }

    /// List the checkin catalogue from the A1 API.
    ///
    /// `GET /checkin/list?expand=verse_id,name`; plain array, no envelope.
    #[instrument(level = "debug", skip(self))]
    pub async fn verse_list(&self) -> Result<Vec<Verse>> {
        let mut url = self.a1_endpoint("/checkin/list")?;
        {
            let mut qp = url.query_pairs_mut();
            qp.append_pair("expand", "verse_id,name");
        }
        self.get_json(url).await
    }
}

/// Pull a single query parameter out of a URL or scene string.
///
/// Accepts full URLs, bare query strings, and the `a=1&b=2` scene payloads
/// the platform hands to a launched applet.
pub fn extract_query_param(url: &str, name: &str) -> Option<String> {
    let query = match url.split_once('?') {
        Some((_, q)) => q,
        None => url,
    };
    for pair in query.split('&') {
        if let Some((k, v)) = pair.split_once('=') {
            if k == name {
                return Some(v.to_string());
            }
        }
    }
    None
}
