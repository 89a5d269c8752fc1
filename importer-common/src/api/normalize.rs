//! `from_api` / `to_api` conversion between wire and normalized records

use super::types::RawImporterStatus;
use crate::models::{ImporterId, ImporterState, ImporterStatus, ImporterType, SiteId, SiteRef};
use thiserror::Error;

/// Normalization errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum NormalizeError {
    #[error("Unknown import status '{status}' for importer {import_id}")]
    UnknownStatus { import_id: String, status: String },

    #[error("Importer {0} has no site id")]
    MissingSite(String),
}

/// Application state ↔ wire state
const STATE_MAP: [(ImporterState, &str); 18] = [
    (ImporterState::Inactive, "inactive"),
    (ImporterState::ReadyForUpload, "uploadReady"),
    (ImporterState::Uploading, "uploading"),
    (ImporterState::UploadProcessing, "uploadProcessing"),
    (ImporterState::UploadSuccess, "uploadSuccess"),
    (ImporterState::UploadFailure, "uploadFailure"),
    (ImporterState::MapAuthors, "importReady"),
    (ImporterState::Importing, "importing"),
    (ImporterState::ImportSuccess, "importSuccess"),
    (ImporterState::ImportFailure, "importFailure"),
    (ImporterState::CancelPending, "cancel"),
    (ImporterState::Cancelled, "cancelled"),
    (ImporterState::ExpirePending, "expire"),
    (ImporterState::Expired, "expired"),
    (ImporterState::Clear, "clear"),
    (ImporterState::Cleared, "cleared"),
    (ImporterState::Defunct, "importStopped"),
    (ImporterState::Disabled, "disabled"),
];

/// Wire name for an application state
pub fn state_to_api(state: ImporterState) -> &'static str {
    STATE_MAP
        .iter()
        .find(|(s, _)| *s == state)
        .map(|(_, api)| *api)
        // STATE_MAP covers every variant
        .unwrap_or("inactive")
}

/// Application state for a wire name
pub fn state_from_api(status: &str) -> Option<ImporterState> {
    STATE_MAP
        .iter()
        .find(|(_, api)| *api == status)
        .map(|(s, _)| *s)
}

/// Normalize a wire record
pub fn from_api(raw: RawImporterStatus) -> Result<ImporterStatus, NormalizeError> {
    let site_id = raw
        .site_id
        .ok_or_else(|| NormalizeError::MissingSite(raw.import_id.clone()))?;
    from_api_for_site(raw, site_id)
}

/// Normalize a wire record, using `site_id` when the record carries none
///
/// Upload responses omit the site id; the caller knows which site it
/// uploaded to.
pub fn from_api_for_site(
    raw: RawImporterStatus,
    site_id: SiteId,
) -> Result<ImporterStatus, NormalizeError> {
    let importer_state =
        state_from_api(&raw.import_status).ok_or_else(|| NormalizeError::UnknownStatus {
            import_id: raw.import_id.clone(),
            status: raw.import_status.clone(),
        })?;

    Ok(ImporterStatus {
        importer_id: ImporterId::new(raw.import_id),
        importer_state,
        importer_type: raw.importer_type.as_deref().map(ImporterType::new),
        site: SiteRef {
            id: raw.site_id.unwrap_or(site_id),
        },
        progress: raw.progress,
        custom_data: raw.custom_data,
        error_data: raw.error_data,
        status_message: raw.status_message,
    })
}

/// Convert a normalized status into the wire record
pub fn to_api(status: &ImporterStatus) -> RawImporterStatus {
    RawImporterStatus {
        import_id: status.importer_id.as_str().to_string(),
        import_status: state_to_api(status.importer_state).to_string(),
        importer_type: status
            .importer_type
            .as_ref()
            .map(|t| t.api_name().to_string()),
        site_id: Some(status.site.id),
        progress: status.progress.clone(),
        custom_data: status.custom_data.clone(),
        error_data: status.error_data.clone(),
        status_message: status.status_message.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CustomData, EntityProgress, ErrorData, SourceAuthor};
    use std::collections::BTreeMap;

    const ALL_STATES: [ImporterState; 18] = [
        ImporterState::Inactive,
        ImporterState::ReadyForUpload,
        ImporterState::Uploading,
        ImporterState::UploadProcessing,
        ImporterState::UploadSuccess,
        ImporterState::UploadFailure,
        ImporterState::MapAuthors,
        ImporterState::Importing,
        ImporterState::ImportSuccess,
        ImporterState::ImportFailure,
        ImporterState::CancelPending,
        ImporterState::Cancelled,
        ImporterState::ExpirePending,
        ImporterState::Expired,
        ImporterState::Clear,
        ImporterState::Cleared,
        ImporterState::Defunct,
        ImporterState::Disabled,
    ];

    fn full_status(state: ImporterState) -> ImporterStatus {
        let mut progress = BTreeMap::new();
        progress.insert("post".to_string(), EntityProgress { completed: 3, total: 10 });
        progress.insert("attachment".to_string(), EntityProgress { completed: 0, total: 4 });

        ImporterStatus {
            importer_id: ImporterId::from("1234"),
            importer_state: state,
            importer_type: Some(ImporterType::new("wordpress")),
            site: SiteRef { id: 77 },
            progress: Some(progress),
            custom_data: Some(CustomData {
                source_type: Some("wordpress".to_string()),
                site_title: Some("Old blog".to_string()),
                source_authors: vec![SourceAuthor {
                    id: "alice".to_string(),
                    name: "Alice".to_string(),
                    icon: None,
                    mapped_to: Some("5".to_string()),
                }],
            }),
            error_data: Some(ErrorData {
                kind: "uploadError".to_string(),
                description: "bad file".to_string(),
            }),
            status_message: Some("working".to_string()),
        }
    }

    #[test]
    fn test_state_map_is_bijective() {
        for state in ALL_STATES {
            let api = state_to_api(state);
            assert_eq!(state_from_api(api), Some(state), "state {} via {}", state, api);
        }

        let mut names: Vec<_> = STATE_MAP.iter().map(|(_, api)| *api).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), STATE_MAP.len());
    }

    #[test]
    fn test_round_trip_every_state() {
        for state in ALL_STATES {
            let status = full_status(state);
            assert_eq!(from_api(to_api(&status)), Ok(status));
        }
    }

    #[test]
    fn test_round_trip_minimal_order() {
        let order = ImporterStatus::order(5, ImporterId::from("88"), ImporterState::CancelPending);
        let raw = to_api(&order);

        assert_eq!(raw.import_status, "cancel");
        assert_eq!(raw.site_id, Some(5));
        assert_eq!(from_api(raw), Ok(order));
    }

    #[test]
    fn test_from_api_prefixes_type() {
        let raw: RawImporterStatus = serde_json::from_value(serde_json::json!({
            "importId": 3,
            "importStatus": "uploadSuccess",
            "type": "medium",
            "siteId": 9,
        }))
        .unwrap();

        let status = from_api(raw).unwrap();
        assert_eq!(status.importer_type, Some(ImporterType::new("importer-type-medium")));
        assert_eq!(status.importer_state, ImporterState::UploadSuccess);
        assert_eq!(status.site_id(), 9);
    }

    #[test]
    fn test_from_api_unknown_status() {
        let raw = RawImporterStatus {
            import_id: "1".to_string(),
            import_status: "teleporting".to_string(),
            importer_type: None,
            site_id: Some(1),
            progress: None,
            custom_data: None,
            error_data: None,
            status_message: None,
        };

        assert_eq!(
            from_api(raw),
            Err(NormalizeError::UnknownStatus {
                import_id: "1".to_string(),
                status: "teleporting".to_string(),
            })
        );
    }

    #[test]
    fn test_from_api_for_site_fills_missing_site() {
        let mut raw = to_api(&full_status(ImporterState::UploadSuccess));
        raw.site_id = None;

        assert_eq!(from_api(raw.clone()), Err(NormalizeError::MissingSite("1234".to_string())));

        let status = from_api_for_site(raw, 77).unwrap();
        assert_eq!(status, full_status(ImporterState::UploadSuccess));
    }

    #[test]
    fn test_round_trip_of_deserialized_status_with_bare_type() {
        let status: ImporterStatus = serde_json::from_str(
            r#"{"importerId": "31", "importerState": "importing", "type": "wordpress", "site": {"ID": 7}}"#,
        )
        .unwrap();

        assert_eq!(status.importer_type, Some(ImporterType::new("wordpress")));
        assert_eq!(from_api(to_api(&status)).unwrap(), status);
    }
}
