//! importer-client library interface
//!
//! Client-side coordination of server-tracked site import sessions:
//! intents go out through an `ImportTransport`, normalized responses come
//! back as `ImportEvent`s published through the `ImportStore`.

pub mod coordinator;
pub mod error;
pub mod store;
pub mod transport;

pub use crate::coordinator::ImportCoordinator;
pub use crate::error::{TransportError, TransportResult};
pub use crate::store::{ImportStore, ImportsState};
pub use crate::transport::{ExportFile, HttpTransport, ImportTransport, UploadRequest};
