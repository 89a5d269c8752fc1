//! Import store: the single composition point for published events
//!
//! Every event goes through `ImportStore::publish`, which folds it into the
//! `ImportsState` snapshot and then broadcasts it on the EventBus while the
//! write lock is held. Readers therefore see a consistent snapshot between
//! events, and subscribers receive events in the order they were applied.

use chrono::Utc;
use importer_common::events::{EventBus, ImportEvent};
use importer_common::models::{ImportSession, ImporterId, ImporterState, ImporterStatus, SiteId};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

/// Snapshot of all tracked import sessions
#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportsState {
    pub importers: BTreeMap<ImporterId, ImportSession>,
    /// Lock flags, kept even for sessions no longer tracked so a late
    /// status cannot resurrect a cancelled or reset session
    pub locked_imports: BTreeMap<ImporterId, bool>,
    pub is_fetching: bool,
    /// True once at least one fetch completed
    pub is_hydrated: bool,
    pub last_error: Option<String>,
}

impl ImportsState {
    pub fn is_importer_locked(&self, importer_id: &ImporterId) -> bool {
        self.locked_imports.get(importer_id).copied().unwrap_or(false)
    }

    pub fn session(&self, importer_id: &ImporterId) -> Option<&ImportSession> {
        self.importers.get(importer_id)
    }

    pub fn sessions_for_site(&self, site_id: SiteId) -> Vec<&ImportSession> {
        self.importers
            .values()
            .filter(|s| s.site_id == site_id)
            .collect()
    }

    /// Fold one event into the snapshot
    pub fn apply(&mut self, event: &ImportEvent) {
        match event {
            ImportEvent::Fetch { .. } => {
                self.is_fetching = true;
            }
            ImportEvent::FetchCompleted { .. } => {
                self.is_fetching = false;
                self.is_hydrated = true;
                self.last_error = None;
            }
            ImportEvent::FetchFailed { error, .. } => {
                self.is_fetching = false;
                self.last_error = Some(error.clone());
            }
            ImportEvent::ImportLocked { importer_id, .. } => {
                self.set_lock(importer_id, true);
            }
            ImportEvent::ImportUnlocked { importer_id, .. } => {
                self.set_lock(importer_id, false);
            }
            ImportEvent::ImportStarted { session, .. } => {
                self.insert(session.clone());
            }
            ImportEvent::StartedImporting { importer_id, .. } => {
                if let Some(session) = self.importers.get_mut(importer_id) {
                    session.state = ImporterState::Importing;
                }
            }
            ImportEvent::StatusReceived {
                importer_status,
                is_importer_locked,
                ..
            } => {
                if *is_importer_locked || self.is_importer_locked(&importer_status.importer_id) {
                    debug!(importer_id = %importer_status.importer_id, "Ignoring status for locked importer");
                    return;
                }
                self.receive_status(importer_status, None);
            }
            ImportEvent::ImportCancelled { importer_id, .. }
            | ImportEvent::ImportReset { importer_id, .. } => {
                self.importers.remove(importer_id);
            }
            ImportEvent::AuthorMappingStarted { importer_id, .. } => {
                if let Some(session) = self.importers.get_mut(importer_id) {
                    session.state = ImporterState::MapAuthors;
                    session.author_mapping.get_or_insert_with(BTreeMap::new);
                }
            }
            ImportEvent::AuthorMapped {
                importer_id,
                source_author,
                target_author,
                ..
            } => {
                if let Some(session) = self.importers.get_mut(importer_id) {
                    session.map_author(source_author, target_author);
                }
            }
            ImportEvent::UploadStarted {
                importer_id,
                filename,
                ..
            } => {
                if let Some(session) = self.importers.get_mut(importer_id) {
                    session.state = ImporterState::Uploading;
                    session.filename = Some(filename.clone());
                    session.upload_progress = Some(Default::default());
                    session.error = None;
                }
                self.set_lock(importer_id, true);
            }
            ImportEvent::UploadProgress {
                importer_id,
                progress,
                ..
            } => {
                if let Some(session) = self.importers.get_mut(importer_id) {
                    session.upload_progress = Some(*progress);
                }
            }
            ImportEvent::UploadCompleted {
                importer_id,
                importer_status,
                ..
            } => {
                self.set_lock(importer_id, false);
                let previous = self.importers.remove(importer_id);
                self.receive_status(importer_status, previous);
            }
            ImportEvent::UploadFailed {
                importer_id, error, ..
            } => {
                if let Some(session) = self.importers.get_mut(importer_id) {
                    session.state = ImporterState::UploadFailure;
                    session.upload_progress = None;
                    session.error = Some(error.clone());
                }
                self.set_lock(importer_id, false);
            }
        }
    }

    fn set_lock(&mut self, importer_id: &ImporterId, locked: bool) {
        self.locked_imports.insert(importer_id.clone(), locked);
        if let Some(session) = self.importers.get_mut(importer_id) {
            session.locked = locked;
        }
    }

    fn insert(&mut self, mut session: ImportSession) {
        session.locked = self.is_importer_locked(&session.importer_id);
        self.importers.insert(session.importer_id.clone(), session);
    }

    /// Upsert a server status
    ///
    /// `previous` is the record the status supersedes when its id changed
    /// (a local placeholder confirmed by an upload response). Terminal
    /// statuses drop the session instead.
    fn receive_status(&mut self, status: &ImporterStatus, previous: Option<ImportSession>) {
        if status.importer_state.is_terminal() {
            self.importers.remove(&status.importer_id);
            return;
        }

        // A server id replaces the optimistic placeholder for the same site and importer
        let placeholder = if previous.is_none() && !status.importer_id.is_local() {
            let placeholder_id = self
                .importers
                .values()
                .find(|s| {
                    s.importer_id.is_local()
                        && s.site_id == status.site_id()
                        && (status.importer_type.is_none() || s.importer_type == status.importer_type)
                })
                .map(|s| s.importer_id.clone());
            placeholder_id.and_then(|id| self.importers.remove(&id))
        } else {
            None
        };

        let base = previous
            .or(placeholder)
            .or_else(|| self.importers.remove(&status.importer_id));

        let session = match base {
            Some(mut session) => {
                session.apply_status(status);
                session
            }
            None => ImportSession::from_status(status),
        };
        self.insert(session);
    }
}

/// Thread-safe owner of the snapshot and the EventBus
pub struct ImportStore {
    state: RwLock<ImportsState>,
    event_bus: EventBus,
}

impl ImportStore {
    pub fn new(event_bus: EventBus) -> Self {
        Self {
            state: RwLock::new(ImportsState::default()),
            event_bus,
        }
    }

    /// Apply an event to the snapshot, then broadcast it
    pub fn publish(&self, event: ImportEvent) {
        let mut state = self.write();
        state.apply(&event);
        debug!(
            event_type = event.event_type(),
            importer_id = ?event.importer_id(),
            "Publishing import event"
        );
        self.event_bus.emit_lossy(event);
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    /// Copy of the current snapshot
    pub fn snapshot(&self) -> ImportsState {
        self.read().clone()
    }

    pub fn session(&self, importer_id: &ImporterId) -> Option<ImportSession> {
        self.read().session(importer_id).cloned()
    }

    pub fn is_importer_locked(&self, importer_id: &ImporterId) -> bool {
        self.read().is_importer_locked(importer_id)
    }

    /// Publish a `StatusReceived` event stamped with the lock flag
    ///
    /// The flag is read under the same write guard that applies the event.
    pub fn publish_status(&self, importer_status: ImporterStatus) {
        let mut state = self.write();
        let event = ImportEvent::StatusReceived {
            is_importer_locked: state.is_importer_locked(&importer_status.importer_id),
            importer_status,
            timestamp: Utc::now(),
        };
        state.apply(&event);
        debug!(
            event_type = event.event_type(),
            importer_id = ?event.importer_id(),
            "Publishing import event"
        );
        self.event_bus.emit_lossy(event);
    }

    // Poisoned locks are recovered: apply never panics midway
    fn read(&self) -> RwLockReadGuard<'_, ImportsState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, ImportsState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }
}
