// src/capabilities/validate.rs
//! Per-stage response validators. The controller never inspects a
//! capability's reasoning - only whether its declared output shape holds.

use crate::error::PipelineError;

use super::types::{CoverLetterResponse, JobIntelligence, TailorResponse, TrackerRow};

/// Job intel is usable once it carries an id, classified must-have
/// requirements, ATS keywords, and resume-focus guidance.
pub fn validate_intel(intel: &JobIntelligence) -> Result<(), PipelineError> {
    let mut missing = Vec::new();

    if intel.job_id.trim().is_empty() {
        missing.push("job_id");
    }
    if intel.requirements.must_have.is_empty() {
        missing.push("requirements.must_have");
    }
    if intel.keywords_for_ats.is_empty() {
        missing.push("keywords_for_ats");
    }
    if intel.tailoring_guidance.resume_focus.is_empty() {
        missing.push("tailoring_guidance.resume_focus");
    }

    if missing.is_empty() {
        Ok(())
    } else {
        Err(PipelineError::CapabilityValidationFailed {
            stage: "job_intel",
            reason: format!("missing or empty fields: {}", missing.join(", ")),
        })
    }
}

/// Tailored output is rejected outright when the backend flags fabrication
/// risk, and when no ATS keyword could be matched against verified content.
pub fn validate_tailor(response: &TailorResponse) -> Result<(), PipelineError> {
    if !response.risk_flags.is_empty() {
        return Err(PipelineError::FabricationRejected {
            stage: "resume_tailor",
            reason: format!("risk_flags: {}", response.risk_flags.join("; ")),
        });
    }

    if response.ats_keyword_coverage.matched_keywords.is_empty() {
        return Err(PipelineError::CapabilityValidationFailed {
            stage: "resume_tailor",
            reason: "ats_keyword_coverage.matched_keywords is empty".to_string(),
        });
    }

    if response.updated_resume_latex.trim().is_empty() {
        return Err(PipelineError::CapabilityValidationFailed {
            stage: "resume_tailor",
            reason: "updated_resume_latex is empty".to_string(),
        });
    }

    Ok(())
}

pub fn validate_cover_letter(response: &CoverLetterResponse) -> Result<(), PipelineError> {
    if response.cover_letter.trim().is_empty() {
        return Err(PipelineError::CapabilityValidationFailed {
            stage: "cover_letter",
            reason: "cover_letter is empty".to_string(),
        });
    }
    Ok(())
}

/// Tracker rows must reference a job id; everything else may legitimately be
/// blank ("leave unknown fields blank, do not guess").
pub fn validate_tracker_row(row: &TrackerRow) -> Result<(), PipelineError> {
    if row.job_id.trim().is_empty() {
        return Err(PipelineError::CapabilityValidationFailed {
            stage: "application_tracker",
            reason: "job_id is empty".to_string(),
        });
    }
    Ok(())
}
