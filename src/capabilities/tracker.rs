// src/capabilities/tracker.rs
//! Deterministic application-tracker capability: turns validated job intel
//! plus artifact references into one tracker row. Unknown fields stay blank.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::PipelineError;

use super::types::{TrackerRequest, TrackerRow};
use super::Capability;

#[derive(Debug, Default)]
pub struct LocalTracker;

impl LocalTracker {
    pub fn new() -> Self {
        Self
    }

    fn build_row(request: &TrackerRequest) -> TrackerRow {
        let intel = &request.job_intel;

        let location = [intel.location.city.as_str(), intel.location.country.as_str()]
            .iter()
            .filter(|part| !part.is_empty())
            .cloned()
            .collect::<Vec<_>>()
            .join(", ");

        TrackerRow {
            job_id: intel.job_id.clone(),
            company: intel.company.name.clone(),
            role_title: intel.role.title.clone(),
            location,
            remote_policy: intel.location.remote_policy.clone(),
            job_url: intel.source.job_url.clone(),
            date_applied: request.date_applied.clone(),
            status: String::new(),
            visa_sponsorship: intel.location.visa_sponsorship.clone(),
            keywords: intel.keywords_for_ats.clone(),
            updated_resume_ref: request.resume_ref.clone(),
            cover_letter_ref: request.cover_letter_ref.clone(),
            notes: request.notes.clone(),
        }
    }
}

#[async_trait]
impl Capability for LocalTracker {
    fn name(&self) -> &'static str {
        "application_tracker"
    }

    async fn call(&self, request: Value) -> Result<Value, PipelineError> {
        let request: TrackerRequest =
            serde_json::from_value(request).map_err(|e| PipelineError::CapabilityValidationFailed {
                stage: "application_tracker",
                reason: format!("malformed request: {}", e),
            })?;

        let row = Self::build_row(&request);
        serde_json::to_value(&row).map_err(|e| PipelineError::CapabilityValidationFailed {
            stage: "application_tracker",
            reason: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::types::JobIntelligence;

    fn request() -> TrackerRequest {
        let mut intel = JobIntelligence {
            job_id: "j123".to_string(),
            keywords_for_ats: vec!["rust".to_string(), "go".to_string()],
            ..Default::default()
        };
        intel.company.name = "Acme".to_string();
        intel.role.title = "Backend Engineer".to_string();
        intel.location.city = "Berlin".to_string();
        intel.location.country = "Germany".to_string();
        intel.location.remote_policy = "hybrid".to_string();
        intel.location.visa_sponsorship = "Unknown".to_string();
        intel.source.job_url = "https://example.com/jobs/123".to_string();

        TrackerRequest {
            job_intel: intel,
            resume_ref: "j123_backend_engineer/resume_j123_backend_engineer.tex".to_string(),
            cover_letter_ref: "j123_backend_engineer/cover_letter_j123.txt".to_string(),
            date_applied: String::new(),
            notes: "referred by J.".to_string(),
        }
    }

    #[tokio::test]
    async fn test_row_mirrors_intel_and_refs() {
        let tracker = LocalTracker::new();
        let value = tracker
            .call(serde_json::to_value(request()).unwrap())
            .await
            .unwrap();
        let row: TrackerRow = serde_json::from_value(value).unwrap();

        assert_eq!(row.job_id, "j123");
        assert_eq!(row.company, "Acme");
        assert_eq!(row.location, "Berlin, Germany");
        assert_eq!(row.resolved_status(), "Not Applied");
        assert_eq!(row.joined_keywords(), "rust;go");
        assert!(row.updated_resume_ref.ends_with(".tex"));
    }

    #[test]
    fn test_location_skips_blank_parts() {
        let mut req = request();
        req.job_intel.location.city.clear();
        let row = LocalTracker::build_row(&req);
        assert_eq!(row.location, "Germany");
    }
}
