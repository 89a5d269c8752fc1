//! Identifier types for import sessions

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Site identifier as used by the site imports API
pub type SiteId = u64;

/// Prefix marking an importer id generated on the client
///
/// Server-assigned ids never carry this prefix.
pub const LOCAL_ID_PREFIX: &str = "local-generated-id-";

const IMPORTER_TYPE_PREFIX: &str = "importer-type-";

/// Import session identifier
///
/// Either assigned by the server or a local placeholder used before the
/// first server round trip completes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImporterId(String);

impl ImporterId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh placeholder id (`local-generated-id-<uuid v4>`)
    pub fn generate_local() -> Self {
        Self(format!("{}{}", LOCAL_ID_PREFIX, Uuid::new_v4()))
    }

    /// True if this id was generated locally and is unknown to the server
    pub fn is_local(&self) -> bool {
        self.0.contains(LOCAL_ID_PREFIX)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ImporterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ImporterId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ImporterId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Which importer implementation handles a session
///
/// Normalized form is `importer-type-<name>`; the wire carries `<name>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct ImporterType(String);

impl ImporterType {
    /// Build from a bare importer name (`wordpress`) or an already
    /// prefixed value (`importer-type-wordpress`)
    pub fn new(name: &str) -> Self {
        if name.starts_with(IMPORTER_TYPE_PREFIX) {
            Self(name.to_string())
        } else {
            Self(format!("{}{}", IMPORTER_TYPE_PREFIX, name))
        }
    }

    /// Name as sent on the wire, without the `importer-type-` prefix
    pub fn api_name(&self) -> &str {
        self.0
            .strip_prefix(IMPORTER_TYPE_PREFIX)
            .unwrap_or(&self.0)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ImporterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for ImporterType {
    fn from(name: String) -> Self {
        Self::new(&name)
    }
}

impl From<ImporterType> for String {
    fn from(importer_type: ImporterType) -> Self {
        importer_type.0
    }
}
