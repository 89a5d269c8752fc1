//! Wire types for the site imports API

use crate::models::{CustomData, EntityProgress, ErrorData, SiteId};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// Import session as sent and received by the server
///
/// # Examples
///
/// ```
/// use importer_common::api::RawImporterStatus;
///
/// let raw: RawImporterStatus = serde_json::from_str(
///     r#"{"importId": 7, "importStatus": "importing", "type": "wordpress", "siteId": 12}"#,
/// ).unwrap();
///
/// assert_eq!(raw.import_id, "7");
/// assert_eq!(raw.site_id, Some(12));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawImporterStatus {
    /// Server ids arrive as numbers or strings depending on the endpoint
    #[serde(deserialize_with = "deserialize_import_id")]
    pub import_id: String,

    /// Wire state (`importing`, `uploadSuccess`, `expired`, ...)
    pub import_status: String,

    /// Bare importer name (`wordpress`, `medium`, ...)
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub importer_type: Option<String>,

    /// Absent on upload responses; filled in from the request site
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site_id: Option<SiteId>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<BTreeMap<String, EntityProgress>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_data: Option<CustomData>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_data: Option<ErrorData>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_message: Option<String>,
}

impl RawImporterStatus {
    /// True if the server already expired this session
    pub fn is_expired(&self) -> bool {
        self.import_status == super::state_to_api(crate::models::ImporterState::Expired)
    }
}

fn deserialize_import_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum IdRepr {
        Text(String),
        Number(u64),
    }

    Ok(match IdRepr::deserialize(deserializer)? {
        IdRepr::Text(s) => s,
        IdRepr::Number(n) => n.to_string(),
    })
}
