//! Device and setup resource endpoints.
//!
//! Plain Yii2-style REST resources under `/devices` and `/setups`: no
//! envelope, bearer auth, `expand` query parameters for relations, and
//! `page`/`per-page` pagination on the list endpoint.

use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::client::ApiClient;
use crate::error::Result;
use crate::identity::UserProfile;

/// Display configuration attached to a device.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Setup {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_id: Option<i64>,
    pub money: i64,
    pub scene_id: Option<i64>,
    pub shots: Vec<u32>,
    pub slogans: Vec<String>,
    pub thumbs: Vec<String>,
    pub pictures: Vec<String>,
    pub title: String,
}

/// A registered device.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Device {
    pub id: i64,
    pub uuid: String,
    pub tag: String,
    pub ip: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub setup: Option<Setup>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin: Option<Vec<UserProfile>>,
}

/// Filters for the device list.
#[derive(Clone, Debug, Default)]
pub struct DeviceQuery {
    pub tag: Option<String>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

/// Partial device update.
#[derive(Clone, Debug, Default, Serialize)]
pub struct DevicePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
}

/// Partial setup update.
#[derive(Clone, Debug, Default, Serialize)]
pub struct SetupPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub money: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scene_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shots: Option<Vec<u32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slogans: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbs: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pictures: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

#[derive(Serialize)]
struct AssignBody<'a> {
    device_id: i64,
    phone: &'a str,
}

impl ApiClient {
    /// List devices with their admins, optionally filtered and paginated.
    ///
    /// `GET /devices?expand=admin[&tag=..][&page=..][&per-page=..]`
    #[instrument(level = "debug", skip(self, query))]
    pub async fn list_devices(&self, query: &DeviceQuery) -> Result<Vec<Device>> {
        let mut url = self.endpoint("/devices")?;
        {
            let mut qp = url.query_pairs_mut();
            qp.append_pair("expand", "admin");
            if let Some(tag) = &query.tag {
                qp.append_pair("tag", tag);
            }
            if let Some(page) = query.page {
                qp.append_pair("page", &page.to_string());
            }
            if let Some(size) = query.page_size {
                qp.append_pair("per-page", &size.to_string());
            }
        }
        self.get_json(url).await
    }

    /// Fetch a single device.
    #[instrument(level = "debug", skip(self))]
    pub async fn get_device(&self, id: i64) -> Result<Device> {
        let url = self.endpoint(&format!("/devices/{id}"))?;
        self.get_json(url).await
    }

    /// Fetch a device with its setup expanded.
    #[instrument(level = "debug", skip(self))]
    pub async fn get_device_with_setup(&self, id: i64) -> Result<Device> {
        let mut url = self.endpoint(&format!("/devices/{id}"))?;
        {
            let mut qp = url.query_pairs_mut();
            qp.append_pair("expand", "setup");
        }
        self.get_json(url).await
    }

    /// Register a device.
    #[instrument(level = "debug", skip(self, device))]
    pub async fn create_device(&self, device: &Device) -> Result<Device> {
        let url = self.endpoint("/devices")?;
        self.post_json(url, device).await
    }

    /// Update device fields.
    #[instrument(level = "debug", skip(self, patch))]
    pub async fn update_device(&self, id: i64, patch: &DevicePatch) -> Result<Device> {
        let url = self.endpoint(&format!("/devices/{id}"))?;
        self.put_json(url, patch).await
    }

    /// Update a device's setup.
    #[instrument(level = "debug", skip(self, patch))]
    pub async fn update_setup(&self, id: i64, patch: &SetupPatch) -> Result<Setup> {
        let url = self.endpoint(&format!("/setups/{id}"))?;
        self.put_json(url, patch).await
    }

    /// Remove a device.
    #[instrument(level = "debug", skip(self))]
    pub async fn delete_device(&self, id: i64) -> Result<()> {
        let url = self.endpoint(&format!("/devices/{id}"))?;
        self.delete_unit::<()>(url, None).await
    }

    /// Devices the current user administers, setups expanded.
    ///
    /// `GET /devices/manage?expand=setup`
    #[instrument(level = "debug", skip(self))]
    pub async fn managed_devices(&self) -> Result<Vec<Device>> {
        let mut url = self.endpoint("/devices/manage")?;
        {
            let mut qp = url.query_pairs_mut();
            qp.append_pair("expand", "setup");
        }
        self.get_json(url).await
    }

    /// Grant a user (by phone) admin rights on a device.
    ///
    /// `POST /devices/{id}/assign`
    #[instrument(level = "debug", skip(self, phone))]
    pub async fn assign_admin(&self, device_id: i64, phone: &str) -> Result<()> {
        let url = self.endpoint(&format!("/devices/{device_id}/assign"))?;
        self.post_unit(url, &AssignBody { device_id, phone }).await
    }

    /// Revoke a user's admin rights on a device.
    ///
    /// `DELETE /devices/{id}/assign`
    #[instrument(level = "debug", skip(self, phone))]
    pub async fn unassign_admin(&self, device_id: i64, phone: &str) -> Result<()> {
        let url = self.endpoint(&format!("/devices/{device_id}/assign"))?;
        self.delete_unit(url, Some(&AssignBody { device_id, phone }))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_round_trip_without_relations() {
        let json = r#"{ "id": 7, "uuid": "u-7", "tag": "hall", "ip": "10.0.0.7" }"#;
        let device: Device = serde_json::from_str(json).unwrap();
        assert_eq!(device.id, 7);
        assert!(device.setup.is_none());
        assert!(device.admin.is_none());

        let back = serde_json::to_value(&device).unwrap();
        assert!(back.get("setup").is_none());
    }

    #[test]
    fn setup_patch_serializes_only_set_fields() {
        let patch = SetupPatch {
            money: Some(300),
            title: Some("lobby".into()),
            ..Default::default()
        };
        let json = serde_json::to_value(&patch).unwrap();
        assert_eq!(json, serde_json::json!({ "money": 300, "title": "lobby" }));
    }
}
