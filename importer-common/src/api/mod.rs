//! Site imports API wire types and normalization
//!
//! The server speaks a flat record (`importId`, `importStatus`, `siteId`, ...).
//! Everything inside the importer crates works on the nested, normalized
//! `ImporterStatus` (`importerId`, `importerState`, `site: { ID }`).
//!
//! # Design Principle
//!
//! This module contains ONLY pure conversions and shared types. Transport
//! code lives in `importer-client`.

mod normalize;
pub mod types;

pub use normalize::{
    from_api, from_api_for_site, state_from_api, state_to_api, to_api, NormalizeError,
};
pub use types::RawImporterStatus;
