//! Import session record (store-side view of one import attempt)

use super::{
    CustomData, EntityProgress, ErrorData, ImporterId, ImporterState, ImporterStatus,
    ImporterType, SiteId, SiteRef,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Bytes sent so far during an export file upload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UploadProgress {
    pub loaded: u64,
    pub total: u64,
}

impl UploadProgress {
    /// Percentage complete (0.0 - 100.0)
    pub fn percentage(&self) -> f64 {
        if self.total > 0 {
            (self.loaded as f64 / self.total as f64) * 100.0
        } else {
            0.0
        }
    }
}

/// One tracked import attempt for a site
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportSession {
    pub importer_id: ImporterId,
    pub importer_type: Option<ImporterType>,
    pub site_id: SiteId,
    pub state: ImporterState,
    /// Advisory lock, consulted by callers before issuing mutations
    pub locked: bool,
    pub upload_progress: Option<UploadProgress>,
    /// Source author → target author
    pub author_mapping: Option<BTreeMap<String, String>>,
    pub filename: Option<String>,
    pub error: Option<String>,
    pub progress: Option<BTreeMap<String, EntityProgress>>,
    pub custom_data: Option<CustomData>,
    pub error_data: Option<ErrorData>,
    pub status_message: Option<String>,
}

impl ImportSession {
    /// Optimistic local session with a placeholder id
    pub fn local(site_id: SiteId, importer_type: ImporterType) -> Self {
        Self {
            importer_id: ImporterId::generate_local(),
            importer_type: Some(importer_type),
            site_id,
            state: ImporterState::Inactive,
            locked: false,
            upload_progress: None,
            author_mapping: None,
            filename: None,
            error: None,
            progress: None,
            custom_data: None,
            error_data: None,
            status_message: None,
        }
    }

    pub fn from_status(status: &ImporterStatus) -> Self {
        let mut session = Self {
            importer_id: status.importer_id.clone(),
            importer_type: None,
            site_id: status.site_id(),
            state: status.importer_state,
            locked: false,
            upload_progress: None,
            author_mapping: None,
            filename: None,
            error: None,
            progress: None,
            custom_data: None,
            error_data: None,
            status_message: None,
        };
        session.apply_status(status);
        session
    }

    /// Replace server-owned fields with a freshly received status
    ///
    /// Local-only fields (author mapping, filename) survive; upload
    /// progress is dropped because the upload is over once a status arrives.
    pub fn apply_status(&mut self, status: &ImporterStatus) {
        self.importer_id = status.importer_id.clone();
        self.site_id = status.site_id();
        self.state = status.importer_state;
        if status.importer_type.is_some() {
            self.importer_type = status.importer_type.clone();
        }
        self.upload_progress = None;
        self.progress = status.progress.clone();
        self.custom_data = status.custom_data.clone();
        self.error_data = status.error_data.clone();
        self.status_message = status.status_message.clone();
    }

    /// Record one source → target author pairing
    pub fn map_author(&mut self, source_author: &str, target_author: &str) {
        self.author_mapping
            .get_or_insert_with(BTreeMap::new)
            .insert(source_author.to_string(), target_author.to_string());

        if let Some(custom) = self.custom_data.as_mut() {
            for author in custom
                .source_authors
                .iter_mut()
                .filter(|a| a.id == source_author)
            {
                author.mapped_to = Some(target_author.to_string());
            }
        }
    }

    /// Normalized status for this session, as sent with uploads and updates
    pub fn to_status(&self) -> ImporterStatus {
        ImporterStatus {
            importer_id: self.importer_id.clone(),
            importer_state: self.state,
            importer_type: self.importer_type.clone(),
            site: SiteRef { id: self.site_id },
            progress: self.progress.clone(),
            custom_data: self.custom_data.clone(),
            error_data: self.error_data.clone(),
            status_message: self.status_message.clone(),
        }
    }
}
