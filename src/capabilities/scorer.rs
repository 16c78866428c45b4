// src/capabilities/scorer.rs
//! Deterministic scoring capability: hash-based version ids, keyword and
//! must-have coverage, diff size. Persists metrics.json into the job folder.

use async_trait::async_trait;
use serde_json::Value;
use std::path::Path;
use tracing::info;

use crate::core::{unified_diff, FsOps, DEFAULT_MAX_READ_BYTES};
use crate::error::PipelineError;
use crate::utils::{coverage_percent, match_phrases};

use super::types::{ScoreRecord, ScorerRequest};
use super::Capability;

const DIFF_CONTEXT_LINES: usize = 3;

#[derive(Debug, Default)]
pub struct LocalScorer;

impl LocalScorer {
    pub fn new() -> Self {
        Self
    }

    async fn score(&self, request: ScorerRequest) -> Result<ScoreRecord, PipelineError> {
        let base = FsOps::read_text(Path::new(&request.resume_base_path), DEFAULT_MAX_READ_BYTES)
            .await?;
        let tailored = FsOps::read_text(
            Path::new(&request.resume_tailored_path),
            DEFAULT_MAX_READ_BYTES,
        )
        .await?;

        let resume_base_hash = FsOps::sha256(&base.path).await?;
        let resume_tailored_hash = FsOps::sha256(&tailored.path).await?;

        let keywords = &request.job_intel.keywords_for_ats;
        let (matched_keywords, _) = match_phrases(&tailored.content, keywords);
        let keyword_coverage = coverage_percent(matched_keywords.len(), keywords.len());

        let must_have: Vec<String> = request
            .job_intel
            .requirements
            .must_have
            .iter()
            .map(|req| req.item.clone())
            .collect();
        let (matched_must, _) = match_phrases(&tailored.content, &must_have);
        let must_have_coverage = coverage_percent(matched_must.len(), must_have.len());

        let diff = unified_diff(
            &base.content,
            &tailored.content,
            "base",
            "tailored",
            DIFF_CONTEXT_LINES,
        );

        let mut record = ScoreRecord {
            job_id: request.job_intel.job_id.clone(),
            resume_base_hash,
            resume_tailored_hash,
            keyword_coverage,
            must_have_coverage,
            diff_size: Some(diff.approx_changed_lines),
            metrics_path: String::new(),
        };

        // Metrics are regenerated on every scoring pass for the same job
        // folder, so overwrite is intentional here.
        if !request.job_folder_path.is_empty() {
            let metrics_path = Path::new(&request.job_folder_path).join("metrics.json");
            let json = serde_json::to_string_pretty(&record).map_err(|e| {
                PipelineError::WriteFailed {
                    path: metrics_path.clone(),
                    reason: e.to_string(),
                }
            })?;
            let written = FsOps::write_text(&metrics_path, &json, true).await?;
            record.metrics_path = written.path.display().to_string();
        }

        info!(
            "Scored {}: keyword_coverage={:.1}% must_have_coverage={:.1}% diff_size={:?}",
            record.job_id, record.keyword_coverage, record.must_have_coverage, record.diff_size
        );
        Ok(record)
    }
}

#[async_trait]
impl Capability for LocalScorer {
    fn name(&self) -> &'static str {
        "scorer"
    }

    async fn call(&self, request: Value) -> Result<Value, PipelineError> {
        let request: ScorerRequest =
            serde_json::from_value(request).map_err(|e| PipelineError::CapabilityValidationFailed {
                stage: "scorer",
                reason: format!("malformed request: {}", e),
            })?;

        let record = self.score(request).await?;
        serde_json::to_value(&record).map_err(|e| PipelineError::CapabilityValidationFailed {
            stage: "scorer",
            reason: e.to_string(),
        })
    }
}
