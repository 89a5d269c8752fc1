//! Test Helper Utilities
//!
//! Shared utilities for testing importer-client

use async_trait::async_trait;
use importer_client::{ImportCoordinator, ImportTransport, TransportError, TransportResult, UploadRequest};
use importer_common::api::RawImporterStatus;
use importer_common::events::{EventBus, ImportEvent};
use importer_common::models::{SiteId, UploadProgress};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::{broadcast, Notify};

/// One call observed by the recording transport
#[derive(Debug, Clone, PartialEq)]
pub enum TransportCall {
    Fetch(SiteId),
    Update(SiteId, RawImporterStatus),
    Upload(SiteId, RawImporterStatus, String),
}

/// Scripted `ImportTransport` that records every call
///
/// Responses are popped in order; an empty queue answers with a generic
/// network error.
#[derive(Default)]
pub struct RecordingTransport {
    calls: Mutex<Vec<TransportCall>>,
    fetch_responses: Mutex<VecDeque<TransportResult<Vec<RawImporterStatus>>>>,
    update_responses: Mutex<VecDeque<TransportResult<RawImporterStatus>>>,
    upload_responses: Mutex<VecDeque<TransportResult<RawImporterStatus>>>,
    /// Upload progress steps reported before answering
    upload_steps: Mutex<Vec<UploadProgress>>,
    /// Hold uploads open until aborted
    wait_for_abort: Mutex<bool>,
    /// Per-upload gates, popped in call order; an upload waits for its gate
    upload_gates: Mutex<VecDeque<Arc<Notify>>>,
}

impl RecordingTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push_fetch(&self, response: TransportResult<Vec<RawImporterStatus>>) {
        self.fetch_responses.lock().unwrap().push_back(response);
    }

    pub fn push_update(&self, response: TransportResult<RawImporterStatus>) {
        self.update_responses.lock().unwrap().push_back(response);
    }

    pub fn push_upload(&self, response: TransportResult<RawImporterStatus>) {
        self.upload_responses.lock().unwrap().push_back(response);
    }

    pub fn set_upload_steps(&self, steps: Vec<UploadProgress>) {
        *self.upload_steps.lock().unwrap() = steps;
    }

    pub fn hold_uploads_until_abort(&self) {
        *self.wait_for_abort.lock().unwrap() = true;
    }

    /// Hold the next upload until the returned gate is notified or it is aborted
    pub fn gate_next_upload(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.upload_gates.lock().unwrap().push_back(Arc::clone(&gate));
        gate
    }

    pub fn calls(&self) -> Vec<TransportCall> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: TransportCall) {
        self.calls.lock().unwrap().push(call);
    }
}

fn exhausted<T>() -> TransportResult<T> {
    Err(TransportError::Network("no scripted response".to_string()))
}

#[async_trait]
impl ImportTransport for RecordingTransport {
    async fn fetch_sessions(&self, site_id: SiteId) -> TransportResult<Vec<RawImporterStatus>> {
        self.record(TransportCall::Fetch(site_id));
        let response = self.fetch_responses.lock().unwrap().pop_front();
        response.unwrap_or_else(exhausted)
    }

    async fn update_session(
        &self,
        site_id: SiteId,
        order: RawImporterStatus,
    ) -> TransportResult<RawImporterStatus> {
        self.record(TransportCall::Update(site_id, order));
        let response = self.update_responses.lock().unwrap().pop_front();
        response.unwrap_or_else(exhausted)
    }

    async fn upload_file(
        &self,
        site_id: SiteId,
        request: UploadRequest,
    ) -> TransportResult<RawImporterStatus> {
        self.record(TransportCall::Upload(
            site_id,
            request.import_status.clone(),
            request.file.name.clone(),
        ));

        let steps = self.upload_steps.lock().unwrap().clone();
        for step in steps {
            (request.on_progress)(step);
        }

        let gate = self.upload_gates.lock().unwrap().pop_front();
        if let Some(gate) = gate {
            tokio::select! {
                _ = gate.notified() => {}
                _ = request.abort.cancelled() => return Err(TransportError::Aborted),
            }
        }

        let wait_for_abort = *self.wait_for_abort.lock().unwrap();
        if wait_for_abort {
            request.abort.cancelled().await;
            return Err(TransportError::Aborted);
        }

        let response = self.upload_responses.lock().unwrap().pop_front();
        response.unwrap_or_else(exhausted)
    }
}

/// Coordinator wired to a recording transport, plus a subscriber
pub fn coordinator_with(
    transport: Arc<RecordingTransport>,
) -> (ImportCoordinator, broadcast::Receiver<ImportEvent>) {
    let event_bus = EventBus::new(256);
    let rx = event_bus.subscribe();
    (ImportCoordinator::new(transport, event_bus), rx)
}

/// Everything published so far
pub fn drain(rx: &mut broadcast::Receiver<ImportEvent>) -> Vec<ImportEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

/// Event type names, for order assertions
pub fn event_types(events: &[ImportEvent]) -> Vec<String> {
    events.iter().map(|e| e.event_type().to_string()).collect()
}

/// Wire record as the server would send it
pub fn raw_status(import_id: &str, import_status: &str, site_id: Option<SiteId>) -> RawImporterStatus {
    RawImporterStatus {
        import_id: import_id.to_string(),
        import_status: import_status.to_string(),
        importer_type: Some("wordpress".to_string()),
        site_id,
        progress: None,
        custom_data: None,
        error_data: None,
        status_message: None,
    }
}
