//! Import session state machine
//!
//! inactive (local) → ready-for-upload → uploading → upload-processing →
//! upload-success | upload-failure → map-authors → importing →
//! import-success | import-failure | cancel-pending → cancelled |
//! expire-pending → expired | clear → cleared

use serde::{Deserialize, Serialize};
use std::fmt;

/// Import session state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ImporterState {
    /// Created locally, not yet known to the server
    Inactive,
    /// Server session exists and waits for an export file
    ReadyForUpload,
    /// Export file upload in progress
    Uploading,
    /// Server is processing the uploaded file
    UploadProcessing,
    /// Upload accepted by the server
    UploadSuccess,
    /// Upload rejected or interrupted
    UploadFailure,
    /// Waiting for source authors to be mapped
    MapAuthors,
    /// Server-side import running
    Importing,
    /// Import finished successfully
    ImportSuccess,
    /// Import failed on the server
    ImportFailure,
    /// Cancel requested
    CancelPending,
    /// Cancelled by the server
    Cancelled,
    /// Reset (expiry) requested
    ExpirePending,
    /// Expired by the server
    Expired,
    /// Clear requested
    Clear,
    /// Cleared by the server
    Cleared,
    /// Importer stopped on the server
    Defunct,
    /// Importer not available for this site
    Disabled,
}

impl ImporterState {
    /// Terminal sessions are dropped from active tracking
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ImporterState::Expired | ImporterState::Cancelled | ImporterState::Cleared
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ImporterState::Inactive => "inactive",
            ImporterState::ReadyForUpload => "ready-for-upload",
            ImporterState::Uploading => "uploading",
            ImporterState::UploadProcessing => "upload-processing",
            ImporterState::UploadSuccess => "upload-success",
            ImporterState::UploadFailure => "upload-failure",
            ImporterState::MapAuthors => "map-authors",
            ImporterState::Importing => "importing",
            ImporterState::ImportSuccess => "import-success",
            ImporterState::ImportFailure => "import-failure",
            ImporterState::CancelPending => "cancel-pending",
            ImporterState::Cancelled => "cancelled",
            ImporterState::ExpirePending => "expire-pending",
            ImporterState::Expired => "expired",
            ImporterState::Clear => "clear",
            ImporterState::Cleared => "cleared",
            ImporterState::Defunct => "defunct",
            ImporterState::Disabled => "disabled",
        }
    }
}

impl fmt::Display for ImporterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
