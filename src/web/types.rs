// src/web/types.rs
use rocket::serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::clients::campaign::Destination;
use crate::import::ImportRequest;
use crate::settings::ImportSettings;

#[derive(Deserialize)]
#[serde(crate = "rocket::serde", rename_all = "camelCase")]
pub struct StartImportRequest {
    pub source_id: Option<String>,
    pub owner_key: Option<String>,
    pub destination_tag: Option<String>,
    pub destination_list_ids: Option<Vec<String>>,
    pub max_records: Option<u64>,
    pub chunk_size: Option<usize>,
    pub pause_ms: Option<u64>,
}

impl StartImportRequest {
    /// Check required fields and fold optional overrides into the default
    /// settings. Field names in the error message match the wire format.
    pub fn validate(self, defaults: &ImportSettings) -> Result<ImportRequest, String> {
        let mut missing = Vec::new();

        let source_id = self.source_id.unwrap_or_default();
        if source_id.trim().is_empty() {
            missing.push("sourceId");
        }

        let owner_key = self.owner_key.unwrap_or_default();
        if owner_key.trim().is_empty() {
            missing.push("ownerKey");
        }

        let destination = Destination {
            tag: self.destination_tag.filter(|tag| !tag.trim().is_empty()),
            list_ids: self.destination_list_ids.filter(|ids| !ids.is_empty()),
        };
        if !destination.is_configured() {
            missing.push("destinationTag or destinationListIds");
        }

        if !missing.is_empty() {
            return Err(format!("Missing required fields: {}", missing.join(", ")));
        }

        let mut settings = defaults.clone();
        if let Some(chunk_size) = self.chunk_size {
            settings = settings.with_chunk_size(chunk_size);
        }
        if let Some(pause_ms) = self.pause_ms {
            settings = settings.with_pause_ms(pause_ms);
        }
        if let Some(max_records) = self.max_records {
            settings = settings.with_max_records(max_records);
        }

        Ok(ImportRequest {
            source_id,
            owner_key,
            destination,
            settings,
        })
    }
}

#[derive(Serialize)]
#[serde(crate = "rocket::serde", rename_all = "camelCase")]
pub struct StartImportResponse {
    pub job_id: Uuid,
}

#[derive(Serialize)]
#[serde(crate = "rocket::serde")]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    pub error_code: String,
    pub suggestions: Vec<String>,
}

impl ErrorResponse {
    pub fn new(error: String, error_code: String, suggestions: Vec<String>) -> Self {
        Self {
            success: false,
            error,
            error_code,
            suggestions,
        }
    }
}

/// Terminal event emitted on the progress stream for ids the registry does
/// not know.
#[derive(Serialize)]
#[serde(crate = "rocket::serde", rename_all = "camelCase")]
pub struct NotFoundEvent {
    pub status: &'static str,
    pub job_id: String,
}

impl NotFoundEvent {
    pub fn new(job_id: String) -> Self {
        Self {
            status: "not-found",
            job_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_request() -> StartImportRequest {
        StartImportRequest {
            source_id: Some("pool-7".to_string()),
            owner_key: Some("owner-1".to_string()),
            destination_tag: Some("q3-outreach".to_string()),
            destination_list_ids: None,
            max_records: None,
            chunk_size: None,
            pause_ms: None,
        }
    }

    #[test]
    fn test_valid_request_uses_defaults() {
        let request = full_request().validate(&ImportSettings::new()).unwrap();
        assert_eq!(request.source_id, "pool-7");
        assert_eq!(request.settings.chunk_size, 250);
        assert!(request.settings.max_records.is_none());
    }

    #[test]
    fn test_missing_source_id_rejected() {
        let mut request = full_request();
        request.source_id = None;
        let error = request.validate(&ImportSettings::new()).unwrap_err();
        assert!(error.contains("sourceId"));
    }

    #[test]
    fn test_blank_owner_key_rejected() {
        let mut request = full_request();
        request.owner_key = Some("   ".to_string());
        let error = request.validate(&ImportSettings::new()).unwrap_err();
        assert!(error.contains("ownerKey"));
    }

    #[test]
    fn test_some_destination_is_required() {
        let mut request = full_request();
        request.destination_tag = None;
        request.destination_list_ids = Some(vec![]);
        let error = request.validate(&ImportSettings::new()).unwrap_err();
        assert!(error.contains("destinationTag or destinationListIds"));
    }

    #[test]
    fn test_list_ids_alone_are_enough() {
        let mut request = full_request();
        request.destination_tag = None;
        request.destination_list_ids = Some(vec!["12".to_string()]);
        assert!(request.validate(&ImportSettings::new()).is_ok());
    }

    #[test]
    fn test_overrides_are_clamped() {
        let mut request = full_request();
        request.chunk_size = Some(50_000);
        request.max_records = Some(100);
        let validated = request.validate(&ImportSettings::new()).unwrap();
        assert_eq!(validated.settings.chunk_size, 1_000);
        assert_eq!(validated.settings.max_records, Some(100));
    }
}
