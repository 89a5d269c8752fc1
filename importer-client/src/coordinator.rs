//! Import session coordinator
//!
//! Maps user intents (start, cancel, reset, clear, upload, map authors) onto
//! site imports API requests, and API responses onto normalized status
//! events published through the ImportStore.
//!
//! Locking discipline: every mutating request is preceded by a lock event
//! for its importer id. Locks are advisory flags in the store; the
//! coordinator does not serialize concurrent intents itself.
//!
//! Transport failures never surface as `Err` to the caller. They are
//! published as `FetchFailed` / `UploadFailed` events and optimistic local
//! state is left as is.

use crate::error::TransportError;
use crate::store::{ImportStore, ImportsState};
use crate::transport::{ExportFile, ImportTransport, ProgressCallback, UploadRequest};
use chrono::Utc;
use importer_common::api::{from_api_for_site, to_api};
use importer_common::events::{EventBus, ImportEvent};
use importer_common::models::{
    ImportSession, ImporterId, ImporterState, ImporterStatus, ImporterType, SiteId,
    UploadProgress,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Import session coordinator
#[derive(Clone)]
pub struct ImportCoordinator {
    transport: Arc<dyn ImportTransport>,
    store: Arc<ImportStore>,
    /// Abort tokens for in-flight uploads, tagged with the upload number
    upload_tokens: Arc<RwLock<HashMap<ImporterId, (u64, CancellationToken)>>>,
    upload_seq: Arc<AtomicU64>,
}

impl ImportCoordinator {
    pub fn new(transport: Arc<dyn ImportTransport>, event_bus: EventBus) -> Self {
        Self {
            transport,
            store: Arc::new(ImportStore::new(event_bus)),
            upload_tokens: Arc::new(RwLock::new(HashMap::new())),
            upload_seq: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn store(&self) -> &ImportStore {
        &self.store
    }

    pub fn event_bus(&self) -> &EventBus {
        self.store.event_bus()
    }

    pub fn snapshot(&self) -> ImportsState {
        self.store.snapshot()
    }

    pub fn session(&self, importer_id: &ImporterId) -> Option<ImportSession> {
        self.store.session(importer_id)
    }

    pub fn is_importer_locked(&self, importer_id: &ImporterId) -> bool {
        self.store.is_importer_locked(importer_id)
    }

    /// Fetch all import sessions of a site
    ///
    /// Expired sessions are dropped before normalization; every remaining
    /// session is published as `StatusReceived`. Returns the published
    /// statuses (empty when the fetch failed).
    pub async fn fetch_all_sessions(&self, site_id: SiteId) -> Vec<ImporterStatus> {
        tracing::info!(site_id, "Fetching import sessions");
        self.publish_fetch(site_id);

        let raw_sessions = match self.transport.fetch_sessions(site_id).await {
            Ok(raw_sessions) => raw_sessions,
            Err(e) => {
                self.publish_fetch_failed(site_id, &e);
                return Vec::new();
            }
        };

        self.store.publish(ImportEvent::FetchCompleted {
            site_id,
            timestamp: Utc::now(),
        });

        let mut received = Vec::new();
        for raw in raw_sessions.into_iter().filter(|raw| !raw.is_expired()) {
            match from_api_for_site(raw, site_id) {
                Ok(status) => {
                    self.receive_importer_status(status.clone());
                    received.push(status);
                }
                Err(e) => {
                    tracing::warn!(site_id, "Skipping import session: {}", e);
                }
            }
        }

        tracing::debug!(site_id, count = received.len(), "Import sessions received");
        received
    }

    /// Create an optimistic local session
    ///
    /// The returned record carries the generated placeholder id.
    pub fn start_session(&self, site_id: SiteId, importer_type: ImporterType) -> ImportSession {
        let session = ImportSession::local(site_id, importer_type);

        tracing::info!(
            site_id,
            importer_id = %session.importer_id,
            importer_type = ?session.importer_type,
            "Starting import session"
        );

        self.store.publish(ImportEvent::ImportStarted {
            session: session.clone(),
            timestamp: Utc::now(),
        });

        session
    }

    /// Ask the server to start importing
    ///
    /// Unlocks the session and publishes `StartedImporting` right away; the
    /// update request runs in the background and its result is only logged.
    /// Must be called from within a tokio runtime.
    pub fn begin_importing(&self, importer_status: &ImporterStatus) -> JoinHandle<()> {
        let importer_id = importer_status.importer_id.clone();
        let site_id = importer_status.site_id();

        tracing::info!(site_id, importer_id = %importer_id, "Beginning import");

        self.store.publish(ImportEvent::ImportUnlocked {
            importer_id: importer_id.clone(),
            timestamp: Utc::now(),
        });
        self.store.publish(ImportEvent::StartedImporting {
            importer_id: importer_id.clone(),
            timestamp: Utc::now(),
        });

        let order = to_api(&importer_status.with_state(ImporterState::Importing));
        let transport = Arc::clone(&self.transport);

        tokio::spawn(async move {
            if let Err(e) = transport.update_session(site_id, order).await {
                tracing::warn!(site_id, importer_id = %importer_id, "Start importing request failed: {}", e);
            }
        })
    }

    /// Cancel a session
    ///
    /// Placeholder sessions were never sent to the server, so only the
    /// local lock and cancel events are published for them.
    pub async fn cancel_session(&self, site_id: SiteId, importer_id: &ImporterId) {
        tracing::info!(site_id, importer_id = %importer_id, "Cancelling import session");

        self.lock(importer_id);
        self.store.publish(ImportEvent::ImportCancelled {
            importer_id: importer_id.clone(),
            site_id,
            timestamp: Utc::now(),
        });

        if importer_id.is_local() {
            tracing::debug!(importer_id = %importer_id, "Local session, nothing to cancel on server");
            return;
        }

        self.send_order(site_id, importer_id, ImporterState::CancelPending)
            .await;
    }

    /// Reset a session (server state `expire-pending`)
    pub async fn reset_session(&self, site_id: SiteId, importer_id: &ImporterId) {
        tracing::info!(site_id, importer_id = %importer_id, "Resetting import session");
        self.retire_session(site_id, importer_id, ImporterState::ExpirePending)
            .await;
    }

    /// Clear a session (server state `clear`)
    pub async fn clear_session(&self, site_id: SiteId, importer_id: &ImporterId) {
        tracing::info!(site_id, importer_id = %importer_id, "Clearing import session");
        self.retire_session(site_id, importer_id, ImporterState::Clear)
            .await;
    }

    /// Lock the session and enter the author mapping sub-flow
    pub fn start_author_mapping(&self, importer_id: &ImporterId) {
        tracing::info!(importer_id = %importer_id, "Starting author mapping");

        self.lock(importer_id);
        self.store.publish(ImportEvent::AuthorMappingStarted {
            importer_id: importer_id.clone(),
            timestamp: Utc::now(),
        });
    }

    /// Record one source → target author pairing
    pub fn set_author_mapping(
        &self,
        importer_id: &ImporterId,
        source_author: &str,
        target_author: &str,
    ) {
        tracing::debug!(
            importer_id = %importer_id,
            source_author,
            target_author,
            "Mapping author"
        );

        self.store.publish(ImportEvent::AuthorMapped {
            importer_id: importer_id.clone(),
            source_author: source_author.to_string(),
            target_author: target_author.to_string(),
            timestamp: Utc::now(),
        });
    }

    /// Upload an export file for a session
    ///
    /// Publishes `UploadStarted`, one `UploadProgress` per transmitted chunk,
    /// then `UploadCompleted` or `UploadFailed`. An upload aborted through
    /// `abort_upload` also cancels the session. Returns the normalized
    /// server status on success.
    pub async fn upload_export_file(
        &self,
        importer_status: &ImporterStatus,
        file: ExportFile,
    ) -> Option<ImporterStatus> {
        let importer_id = importer_status.importer_id.clone();
        let site_id = importer_status.site_id();

        tracing::info!(
            site_id,
            importer_id = %importer_id,
            filename = %file.name,
            size = file.len(),
            "Uploading export file"
        );

        self.store.publish(ImportEvent::UploadStarted {
            importer_id: importer_id.clone(),
            filename: file.name.clone(),
            timestamp: Utc::now(),
        });

        // A newer upload for the same id takes over abort_upload
        let abort = CancellationToken::new();
        let upload_no = self.upload_seq.fetch_add(1, Ordering::Relaxed);
        self.upload_tokens
            .write()
            .await
            .insert(importer_id.clone(), (upload_no, abort.clone()));

        let store = Arc::clone(&self.store);
        let progress_id = importer_id.clone();
        let on_progress: ProgressCallback = Arc::new(move |progress: UploadProgress| {
            store.publish(ImportEvent::UploadProgress {
                importer_id: progress_id.clone(),
                progress,
                timestamp: Utc::now(),
            });
        });

        let request = UploadRequest {
            import_status: to_api(importer_status),
            file,
            on_progress,
            abort,
        };

        let result = self.transport.upload_file(site_id, request).await;
        {
            let mut tokens = self.upload_tokens.write().await;
            if matches!(tokens.get(&importer_id), Some((no, _)) if *no == upload_no) {
                tokens.remove(&importer_id);
            }
        }

        let error = match result {
            Ok(raw) => match from_api_for_site(raw, site_id) {
                Ok(status) => {
                    tracing::info!(
                        site_id,
                        importer_id = %status.importer_id,
                        state = %status.importer_state,
                        "Upload completed"
                    );
                    self.store.publish(ImportEvent::UploadCompleted {
                        importer_id,
                        importer_status: status.clone(),
                        timestamp: Utc::now(),
                    });
                    return Some(status);
                }
                Err(e) => e.to_string(),
            },
            Err(TransportError::Aborted) => {
                self.publish_upload_failed(&importer_id, TransportError::Aborted.to_string());
                self.cancel_session(site_id, &importer_id).await;
                return None;
            }
            Err(e) => e.to_string(),
        };

        self.publish_upload_failed(&importer_id, error);
        None
    }

    /// Abort the in-flight upload of a session
    ///
    /// Returns false if no upload is running for `importer_id`.
    pub async fn abort_upload(&self, importer_id: &ImporterId) -> bool {
        match self.upload_tokens.read().await.get(importer_id) {
            Some((_, token)) => {
                tracing::info!(importer_id = %importer_id, "Aborting upload");
                token.cancel();
                true
            }
            None => false,
        }
    }

    async fn retire_session(
        &self,
        site_id: SiteId,
        importer_id: &ImporterId,
        target_state: ImporterState,
    ) {
        self.lock(importer_id);
        self.store.publish(ImportEvent::ImportReset {
            importer_id: importer_id.clone(),
            site_id,
            timestamp: Utc::now(),
        });

        self.send_order(site_id, importer_id, target_state).await;
    }

    /// Send a state-change order and publish the normalized response
    async fn send_order(
        &self,
        site_id: SiteId,
        importer_id: &ImporterId,
        target_state: ImporterState,
    ) {
        self.publish_fetch(site_id);

        let order = to_api(&ImporterStatus::order(
            site_id,
            importer_id.clone(),
            target_state,
        ));

        match self.transport.update_session(site_id, order).await {
            Ok(raw) => {
                self.store.publish(ImportEvent::FetchCompleted {
                    site_id,
                    timestamp: Utc::now(),
                });
                match from_api_for_site(raw, site_id) {
                    Ok(status) => self.receive_importer_status(status),
                    Err(e) => {
                        tracing::warn!(site_id, importer_id = %importer_id, "Ignoring update response: {}", e);
                    }
                }
            }
            Err(e) => self.publish_fetch_failed(site_id, &e),
        }
    }

    fn receive_importer_status(&self, importer_status: ImporterStatus) {
        self.store.publish_status(importer_status);
    }

    fn lock(&self, importer_id: &ImporterId) {
        self.store.publish(ImportEvent::ImportLocked {
            importer_id: importer_id.clone(),
            timestamp: Utc::now(),
        });
    }

    fn publish_fetch(&self, site_id: SiteId) {
        self.store.publish(ImportEvent::Fetch {
            site_id,
            timestamp: Utc::now(),
        });
    }

    fn publish_fetch_failed(&self, site_id: SiteId, error: &TransportError) {
        tracing::warn!(site_id, "Import API request failed: {}", error);
        self.store.publish(ImportEvent::FetchFailed {
            site_id,
            error: error.to_string(),
            timestamp: Utc::now(),
        });
    }

    fn publish_upload_failed(&self, importer_id: &ImporterId, error: String) {
        tracing::warn!(importer_id = %importer_id, "Upload failed: {}", error);
        self.store.publish(ImportEvent::UploadFailed {
            importer_id: importer_id.clone(),
            error,
            timestamp: Utc::now(),
        });
    }
}
