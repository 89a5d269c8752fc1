//! Transport seam between the coordinator and the site imports API
//!
//! The coordinator only depends on `ImportTransport`; `HttpTransport` is the
//! production implementation, tests plug in recording fakes.

mod http;

pub use http::HttpTransport;

use crate::error::TransportResult;
use async_trait::async_trait;
use importer_common::api::RawImporterStatus;
use importer_common::models::{SiteId, UploadProgress};
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Called once per chunk handed to the network, in order
pub type ProgressCallback = Arc<dyn Fn(UploadProgress) + Send + Sync>;

/// Export file to upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportFile {
    pub name: String,
    pub contents: Vec<u8>,
}

impl ExportFile {
    pub fn new(name: impl Into<String>, contents: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            contents,
        }
    }

    /// Read an export file from disk, keeping its file name
    pub async fn from_path(path: &Path) -> TransportResult<Self> {
        let contents = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "export".to_string());
        Ok(Self { name, contents })
    }

    pub fn len(&self) -> u64 {
        self.contents.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.contents.is_empty()
    }
}

/// Everything needed for one export file upload
pub struct UploadRequest {
    /// Current session status, already in wire shape
    pub import_status: RawImporterStatus,
    pub file: ExportFile,
    pub on_progress: ProgressCallback,
    /// Cancelling this token ends the upload with `TransportError::Aborted`
    pub abort: CancellationToken,
}

/// Site imports API operations
#[async_trait]
pub trait ImportTransport: Send + Sync {
    /// All import sessions for a site
    async fn fetch_sessions(&self, site_id: SiteId) -> TransportResult<Vec<RawImporterStatus>>;

    /// Send a state-change order for one session
    async fn update_session(
        &self,
        site_id: SiteId,
        order: RawImporterStatus,
    ) -> TransportResult<RawImporterStatus>;

    /// Upload an export file for a session
    async fn upload_file(
        &self,
        site_id: SiteId,
        request: UploadRequest,
    ) -> TransportResult<RawImporterStatus>;
}
