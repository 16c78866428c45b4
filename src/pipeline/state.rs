// src/pipeline/state.rs
//! Pipeline run states and the structured outcomes a run can end in.

use serde::Serialize;

use crate::capabilities::types::JobIntelligence;
use crate::error::RunError;

/// Stages execute strictly in this order; `Failed` and `WaitingForInput`
/// are terminal and reachable from any point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    AwaitingInputs,
    Extracting,
    ValidatingIntel,
    Tailoring,
    ValidatingTailor,
    ExtractingFacts,
    WritingCoverLetter,
    Scoring,
    Tracking,
    Done,
    Failed,
    WaitingForInput,
}

/// Consolidated success bundle - the four top-level keys of the final JSON.
#[derive(Debug, Clone, Serialize)]
pub struct Bundle {
    pub job_intel_json: JobIntelligence,
    pub updated_resume_latex: String,
    pub cover_letter: String,
    pub application_tracker_csv: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct WaitingForInput {
    pub status: String,
    pub missing_fields: Vec<String>,
    pub message: String,
}

impl WaitingForInput {
    pub fn new(field: &str, message: &str) -> Self {
        Self {
            status: "waiting_for_input".to_string(),
            missing_fields: vec![field.to_string()],
            message: message.to_string(),
        }
    }
}

/// Every run ends in exactly one of these; all three serialize to the
/// machine-parseable JSON shapes of the external contract.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum PipelineOutcome {
    Done(Bundle),
    WaitingForInput(WaitingForInput),
    Failed(RunError),
}

impl PipelineOutcome {
    pub fn is_done(&self) -> bool {
        matches!(self, PipelineOutcome::Done(_))
    }
}
