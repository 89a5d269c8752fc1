//! Import session data models
//!
//! - `ImporterId`: server-assigned or local placeholder identifier
//! - `ImporterState`: import session state machine
//! - `ImporterStatus`: normalized server record
//! - `ImportSession`: store record for one import attempt

mod ids;
mod session;
mod state;
mod status;

pub use ids::{ImporterId, ImporterType, SiteId, LOCAL_ID_PREFIX};
pub use session::{ImportSession, UploadProgress};
pub use state::ImporterState;
pub use status::{CustomData, EntityProgress, ErrorData, ImporterStatus, SiteRef, SourceAuthor};
