//! # Site Importer Common Library
//!
//! Shared code for the site importer crates including:
//! - Import session models (ids, states, normalized status)
//! - Wire types and `from_api`/`to_api` normalization
//! - Event types (ImportEvent enum) and the EventBus
//! - Configuration loading

pub mod api;
pub mod config;
pub mod error;
pub mod events;
pub mod models;

pub use error::{Error, Result};
pub use events::{EventBus, ImportEvent};
pub use models::{ImporterId, ImporterState, ImporterStatus, SiteId};
