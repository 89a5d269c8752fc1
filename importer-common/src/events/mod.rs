//! Event types for the import session event system
//!
//! Provides the ImportEvent enum and the EventBus that fans events out to
//! every subscriber (store projections, CLI printers, UIs).

use crate::models::{ImportSession, ImporterId, ImporterStatus, SiteId, UploadProgress};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Import session events
///
/// Every coordinator operation publishes one or more of these. Each event
/// carries enough data for a subscriber to update its state without further
/// lookups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ImportEvent {
    /// A request to the imports API started
    ///
    /// Triggers:
    /// - Store: mark fetch in flight
    Fetch {
        site_id: SiteId,
        timestamp: DateTime<Utc>,
    },

    /// A request to the imports API succeeded
    FetchCompleted {
        site_id: SiteId,
        timestamp: DateTime<Utc>,
    },

    /// A request to the imports API failed
    ///
    /// Optimistic local state is NOT rolled back; subscribers re-fetch to
    /// reconcile.
    FetchFailed {
        site_id: SiteId,
        /// Transport error message
        error: String,
        timestamp: DateTime<Utc>,
    },

    /// Session locked ahead of a mutating request
    ImportLocked {
        importer_id: ImporterId,
        timestamp: DateTime<Utc>,
    },

    /// Session unlocked
    ImportUnlocked {
        importer_id: ImporterId,
        timestamp: DateTime<Utc>,
    },

    /// Optimistic local session created
    ImportStarted {
        session: ImportSession,
        timestamp: DateTime<Utc>,
    },

    /// Server-side import requested
    StartedImporting {
        importer_id: ImporterId,
        timestamp: DateTime<Utc>,
    },

    /// Normalized status received from the server
    ///
    /// Triggers:
    /// - Store: upsert session unless it is locked
    StatusReceived {
        importer_status: ImporterStatus,
        /// Lock flag at publication time
        is_importer_locked: bool,
        timestamp: DateTime<Utc>,
    },

    /// Cancel intent
    ImportCancelled {
        importer_id: ImporterId,
        site_id: SiteId,
        timestamp: DateTime<Utc>,
    },

    /// Reset or clear intent
    ImportReset {
        importer_id: ImporterId,
        site_id: SiteId,
        timestamp: DateTime<Utc>,
    },

    /// Author mapping sub-flow started
    AuthorMappingStarted {
        importer_id: ImporterId,
        timestamp: DateTime<Utc>,
    },

    /// One source author mapped to a target author
    AuthorMapped {
        importer_id: ImporterId,
        source_author: String,
        target_author: String,
        timestamp: DateTime<Utc>,
    },

    /// Export file upload started
    UploadStarted {
        importer_id: ImporterId,
        filename: String,
        timestamp: DateTime<Utc>,
    },

    /// Upload progress update
    UploadProgress {
        importer_id: ImporterId,
        progress: UploadProgress,
        timestamp: DateTime<Utc>,
    },

    /// Upload finished, server status normalized
    UploadCompleted {
        importer_id: ImporterId,
        importer_status: ImporterStatus,
        timestamp: DateTime<Utc>,
    },

    /// Upload failed
    UploadFailed {
        importer_id: ImporterId,
        /// Error message details
        error: String,
        timestamp: DateTime<Utc>,
    },
}

impl ImportEvent {
    /// Get event type as string for filtering
    pub fn event_type(&self) -> &str {
        match self {
            ImportEvent::Fetch { .. } => "Fetch",
            ImportEvent::FetchCompleted { .. } => "FetchCompleted",
            ImportEvent::FetchFailed { .. } => "FetchFailed",
            ImportEvent::ImportLocked { .. } => "ImportLocked",
            ImportEvent::ImportUnlocked { .. } => "ImportUnlocked",
            ImportEvent::ImportStarted { .. } => "ImportStarted",
            ImportEvent::StartedImporting { .. } => "StartedImporting",
            ImportEvent::StatusReceived { .. } => "StatusReceived",
            ImportEvent::ImportCancelled { .. } => "ImportCancelled",
            ImportEvent::ImportReset { .. } => "ImportReset",
            ImportEvent::AuthorMappingStarted { .. } => "AuthorMappingStarted",
            ImportEvent::AuthorMapped { .. } => "AuthorMapped",
            ImportEvent::UploadStarted { .. } => "UploadStarted",
            ImportEvent::UploadProgress { .. } => "UploadProgress",
            ImportEvent::UploadCompleted { .. } => "UploadCompleted",
            ImportEvent::UploadFailed { .. } => "UploadFailed",
        }
    }

    /// Session this event concerns, if any
    pub fn importer_id(&self) -> Option<&ImporterId> {
        match self {
            ImportEvent::Fetch { .. }
            | ImportEvent::FetchCompleted { .. }
            | ImportEvent::FetchFailed { .. } => None,
            ImportEvent::ImportStarted { session, .. } => Some(&session.importer_id),
            ImportEvent::StatusReceived { importer_status, .. } => {
                Some(&importer_status.importer_id)
            }
            ImportEvent::ImportLocked { importer_id, .. }
            | ImportEvent::ImportUnlocked { importer_id, .. }
            | ImportEvent::StartedImporting { importer_id, .. }
            | ImportEvent::ImportCancelled { importer_id, .. }
            | ImportEvent::ImportReset { importer_id, .. }
            | ImportEvent::AuthorMappingStarted { importer_id, .. }
            | ImportEvent::AuthorMapped { importer_id, .. }
            | ImportEvent::UploadStarted { importer_id, .. }
            | ImportEvent::UploadProgress { importer_id, .. }
            | ImportEvent::UploadCompleted { importer_id, .. }
            | ImportEvent::UploadFailed { importer_id, .. } => Some(importer_id),
        }
    }
}

// ========================================
// EventBus Implementation
// ========================================

/// Central distribution bus for import events
///
/// The EventBus uses tokio::broadcast internally, providing:
/// - Non-blocking publish (slow subscribers don't block producers)
/// - Multiple concurrent subscribers
/// - Lagged message detection for slow subscribers
///
/// # Examples
///
/// ```
/// use importer_common::events::{EventBus, ImportEvent};
///
/// let event_bus = EventBus::new(100);
/// let mut rx = event_bus.subscribe();
///
/// event_bus.emit_lossy(ImportEvent::Fetch {
///     site_id: 1,
///     timestamp: chrono::Utc::now(),
/// });
///
/// let event = rx.try_recv().unwrap();
/// assert_eq!(event.event_type(), "Fetch");
/// ```
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<ImportEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// # Arguments
    ///
    /// * `capacity` - Number of events to buffer before lagging subscribers
    ///   start missing old events
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<ImportEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists.
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: ImportEvent,
    ) -> Result<usize, broadcast::error::SendError<ImportEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: ImportEvent) {
        let _ = self.tx.send(event);
    }

    /// Get the current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Get the configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ImporterState, ImporterType};

    #[test]
    fn test_eventbus_new() {
        let bus = EventBus::new(100);
        assert_eq!(bus.capacity(), 100);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn test_eventbus_subscribe() {
        let bus = EventBus::new(10);
        let _rx = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 1);

        let _rx2 = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);
    }

    #[test]
    fn test_eventbus_emit_without_subscribers() {
        let bus = EventBus::new(10);
        let event = ImportEvent::Fetch {
            site_id: 1,
            timestamp: Utc::now(),
        };

        assert!(bus.emit(event.clone()).is_err());
        bus.emit_lossy(event); // Should not panic
    }

    #[test]
    fn test_eventbus_multiple_subscribers() {
        let bus = EventBus::new(10);
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        let event = ImportEvent::ImportLocked {
            importer_id: ImporterId::from("7"),
            timestamp: Utc::now(),
        };
        assert_eq!(bus.emit(event).expect("emit should succeed"), 2);

        assert_eq!(rx1.try_recv().unwrap().event_type(), "ImportLocked");
        assert_eq!(rx2.try_recv().unwrap().event_type(), "ImportLocked");
    }

    #[test]
    fn test_eventbus_emit_lossy_small_capacity() {
        let bus = EventBus::new(2);
        let _rx = bus.subscribe(); // Subscribe but don't receive

        for loaded in 0..10 {
            bus.emit_lossy(ImportEvent::UploadProgress {
                importer_id: ImporterId::from("1"),
                progress: UploadProgress { loaded, total: 10 },
                timestamp: Utc::now(),
            });
        }

        assert_eq!(bus.capacity(), 2);
    }

    #[test]
    fn test_event_serialization_is_tagged() {
        let status = ImporterStatus::order(4, ImporterId::from("11"), ImporterState::Importing);
        let event = ImportEvent::StatusReceived {
            importer_status: status,
            is_importer_locked: false,
            timestamp: Utc::now(),
        };

        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "StatusReceived");
        assert_eq!(value["importer_status"]["importerId"], "11");

        let back: ImportEvent = serde_json::from_value(value).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn test_importer_id_accessor() {
        let session = ImportSession::local(1, ImporterType::new("wordpress"));
        let id = session.importer_id.clone();
        let started = ImportEvent::ImportStarted {
            session,
            timestamp: Utc::now(),
        };
        let fetch = ImportEvent::FetchCompleted {
            site_id: 1,
            timestamp: Utc::now(),
        };

        assert_eq!(started.importer_id(), Some(&id));
        assert_eq!(fetch.importer_id(), None);
    }
}
