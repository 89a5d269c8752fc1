//! Normalized importer status

use super::{ImporterId, ImporterState, ImporterType, SiteId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Nested site reference (`site: { ID }`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteRef {
    #[serde(rename = "ID")]
    pub id: SiteId,
}

/// Per-entity import progress (posts, pages, attachments, ...)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EntityProgress {
    pub completed: u64,
    pub total: u64,
}

/// Author found in the export file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceAuthor {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    /// Target author id on the destination site
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mapped_to: Option<String>,
}

/// Importer-specific data reported by the server
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site_title: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub source_authors: Vec<SourceAuthor>,
}

/// Server-reported error details
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorData {
    #[serde(rename = "type")]
    pub kind: String,
    pub description: String,
}

/// Normalized import session status
///
/// This is the internal shape; `crate::api::to_api` converts it to the flat
/// wire record and `crate::api::from_api` converts back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImporterStatus {
    pub importer_id: ImporterId,
    pub importer_state: ImporterState,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub importer_type: Option<ImporterType>,
    pub site: SiteRef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<BTreeMap<String, EntityProgress>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_data: Option<CustomData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_data: Option<ErrorData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_message: Option<String>,
}

impl ImporterStatus {
    /// Minimal status used to build state-change orders
    pub fn order(site_id: SiteId, importer_id: ImporterId, importer_state: ImporterState) -> Self {
        Self {
            importer_id,
            importer_state,
            importer_type: None,
            site: SiteRef { id: site_id },
            progress: None,
            custom_data: None,
            error_data: None,
            status_message: None,
        }
    }

    pub fn site_id(&self) -> SiteId {
        self.site.id
    }

    /// Same status with a different state
    pub fn with_state(&self, importer_state: ImporterState) -> Self {
        Self {
            importer_state,
            ..self.clone()
        }
    }
}
