// src/pipeline/mod.rs
//! Pipeline controller: validates inputs, sequences the capability stages in
//! fixed order, enforces per-stage validation with a single bounded retry,
//! and assembles the consolidated bundle.

pub mod state;

pub use state::{Bundle, PipelineOutcome, PipelineState, WaitingForInput};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::capabilities::types::{
    CoverLetterPrefs, CoverLetterRequest, CoverLetterResponse, FactExtractRequest,
    JobIntelRequest, JobIntelligence, ScoreRecord, ScorerRequest, TailorRequest, TailorResponse,
    TrackerRequest, TrackerRow, VerifiedFacts, TRACKER_HEADER,
};
use crate::capabilities::{validate, Capability, CapabilitySet};
use crate::config::PipelineConfig;
use crate::core::{CsvLedger, FsOps};
use crate::error::{PipelineError, RunError};
use crate::fetch::{FetchResult, WebFetcher};
use crate::utils::{make_folder_name, resolve_path, resume_file_name};

/// Constraints restated verbatim on the single retry of a reasoning stage.
const FACTS_ONLY_CONSTRAINTS: [&str; 2] = [
    "Use only facts present in the supplied inputs; do not invent roles, metrics, skills, or certifications.",
    "Output must be strictly valid JSON matching the declared schema, with no extra prose.",
];

const STRICT_INTEL_CONSTRAINTS: [&str; 3] = [
    "Extract strictly from the posting text; use \"Unknown\" rather than guessing.",
    "requirements.must_have and keywords_for_ats must be non-empty.",
    "tailoring_guidance.resume_focus must list concrete focus points.",
];

/// One job-application request. Empty strings mean "not provided".
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RunRequest {
    pub base_resume_path: String,
    pub job_url: String,
    pub raw_jd_text: String,
    pub company_name: String,
    pub role_title: String,
    pub location: String,
    pub prefs: CoverLetterPrefs,
    pub date_applied: String,
    pub notes: String,
}

pub struct PipelineController {
    config: PipelineConfig,
    capabilities: CapabilitySet,
    fetcher: WebFetcher,
    ledger: CsvLedger,
}

impl PipelineController {
    pub fn new(config: PipelineConfig, capabilities: CapabilitySet) -> Self {
        Self {
            config,
            capabilities,
            fetcher: WebFetcher::new(),
            ledger: CsvLedger::new(),
        }
    }

    /// Run the full pipeline for one request. Every outcome is structured
    /// JSON: the success bundle, a waiting_for_input object, or an error
    /// object. Nothing here panics on backend misbehavior.
    pub async fn run(&self, request: RunRequest, cancel: CancellationToken) -> PipelineOutcome {
        let run_id = Uuid::new_v4();
        info!("Starting pipeline run {}", run_id);

        // Entry guards run before any capability is invoked; first-found
        // condition wins when both are missing.
        if request.base_resume_path.trim().is_empty() {
            info!("Run {} waiting for input: base_resume_path", run_id);
            return PipelineOutcome::WaitingForInput(WaitingForInput::new(
                "base_resume_path",
                "Please provide the file path to your base LaTeX resume (e.g., ./resume.tex).",
            ));
        }
        if request.job_url.trim().is_empty() && request.raw_jd_text.trim().is_empty() {
            info!("Run {} waiting for input: job source", run_id);
            return PipelineOutcome::WaitingForInput(WaitingForInput::new(
                "job_url_or_raw_jd_text",
                "Please provide a job URL or paste the job description text.",
            ));
        }

        match self.execute(&request, &cancel).await {
            Ok(bundle) => {
                info!("Run {} completed", run_id);
                PipelineOutcome::Done(bundle)
            }
            Err(e) => {
                error!("Run {} failed: {}", run_id, e);
                PipelineOutcome::Failed(RunError::from(&e))
            }
        }
    }

    async fn execute(
        &self,
        request: &RunRequest,
        cancel: &CancellationToken,
    ) -> Result<Bundle, PipelineError> {
        let mut state = PipelineState::AwaitingInputs;

        // The base resume must be readable before any capability spends work.
        let base = FsOps::read_text(
            request.base_resume_path.as_ref(),
            self.config.max_read_bytes,
        )
        .await?;

        // Pre-fetch the posting when only a URL was supplied.
        let mut jd_text = request.raw_jd_text.clone();
        if jd_text.trim().is_empty() {
            match self.fetcher.fetch_html(&request.job_url).await {
                FetchResult::Success { html, .. } => {
                    jd_text = WebFetcher::extract_job_text(&html);
                }
                FetchResult::Error { error_message } => {
                    return Err(PipelineError::CapabilityUnreachable {
                        stage: "web_fetch",
                        reason: error_message,
                    })
                }
            }
        }

        // Stage: job intelligence extraction.
        self.advance(&mut state, PipelineState::Extracting, cancel)?;
        let intel_request = to_request_value(&JobIntelRequest {
            job_url: request.job_url.clone(),
            raw_jd_text: jd_text,
            company_name: request.company_name.clone(),
            role_title: request.role_title.clone(),
            location: request.location.clone(),
            constraints: Vec::new(),
        })?;
        let intel: JobIntelligence = self
            .stage_with_retry(
                self.capabilities.job_intel.as_ref(),
                intel_request,
                &STRICT_INTEL_CONSTRAINTS,
                "IntelExtractionInsufficient",
                validate::validate_intel,
            )
            .await?;

        // Intel is read-only from here on; derive the job folder from it.
        self.advance(&mut state, PipelineState::ValidatingIntel, cancel)?;
        let folder_name = make_folder_name(&intel.job_id, &intel.role.title);
        let job_folder = self.config.output_root.join(&folder_name);
        FsOps::mkdir(&job_folder).await?;

        // Stage: resume tailoring.
        self.advance(&mut state, PipelineState::Tailoring, cancel)?;
        let tailor_request = to_request_value(&TailorRequest {
            base_resume_path: base.path.display().to_string(),
            base_resume_latex: base.content.clone(),
            job_intel: intel.clone(),
            constraints: Vec::new(),
        })?;
        let tailor: TailorResponse = self
            .stage_with_retry(
                self.capabilities.resume_tailor.as_ref(),
                tailor_request,
                &FACTS_ONLY_CONSTRAINTS,
                "TailoringRejected",
                validate::validate_tailor,
            )
            .await?;

        // The controller owns artifact persistence: the tailored document is
        // written into the job folder and must never replace the base resume.
        self.advance(&mut state, PipelineState::ValidatingTailor, cancel)?;
        let resume_name = resume_file_name(&intel.job_id, &intel.company.name, &intel.role.title);
        let resume_path = job_folder.join(&resume_name);
        if resolve_path(&resume_path) == base.path {
            return Err(PipelineError::WriteFailed {
                path: resume_path,
                reason: "tailored output would overwrite the base resume".to_string(),
            });
        }
        let written = FsOps::write_text(
            &resume_path,
            &tailor.updated_resume_latex,
            self.config.overwrite_artifacts,
        )
        .await?;

        // Stage: verified fact extraction from the tailored document.
        self.advance(&mut state, PipelineState::ExtractingFacts, cancel)?;
        let facts_request = to_request_value(&FactExtractRequest {
            resume_latex: tailor.updated_resume_latex.clone(),
        })?;
        let facts: VerifiedFacts = self
            .stage_with_retry(
                self.capabilities.fact_extractor.as_ref(),
                facts_request,
                &FACTS_ONLY_CONSTRAINTS,
                "FactExtractionRejected",
                |_: &VerifiedFacts| Ok(()),
            )
            .await?;

        // Stage: cover letter.
        self.advance(&mut state, PipelineState::WritingCoverLetter, cancel)?;
        let letter_request = to_request_value(&CoverLetterRequest {
            job_intel: intel.clone(),
            resume_verified_facts: facts.resume_verified_facts.clone(),
            prefs: request.prefs,
            constraints: Vec::new(),
        })?;
        let letter: CoverLetterResponse = self
            .stage_with_retry(
                self.capabilities.cover_letter.as_ref(),
                letter_request,
                &FACTS_ONLY_CONSTRAINTS,
                "CoverLetterRejected",
                validate::validate_cover_letter,
            )
            .await?;
        let letter_path = job_folder.join(format!("cover_letter_{}.txt", intel.job_id));
        FsOps::write_text(
            &letter_path,
            &letter.cover_letter,
            self.config.overwrite_artifacts,
        )
        .await?;

        // Stage: scoring, skipped when no scorer is configured.
        if let Some(scorer) = &self.capabilities.scorer {
            self.advance(&mut state, PipelineState::Scoring, cancel)?;
            let score_request = to_request_value(&ScorerRequest {
                job_intel: intel.clone(),
                resume_base_path: base.path.display().to_string(),
                resume_tailored_path: written.path.display().to_string(),
                job_folder_path: job_folder.display().to_string(),
            })?;
            let score: ScoreRecord = self
                .stage_with_retry(
                    scorer.as_ref(),
                    score_request,
                    &[],
                    "ScoringRejected",
                    |_: &ScoreRecord| Ok(()),
                )
                .await?;
            info!(
                "Scored {}: keyword {:.1}%, must-have {:.1}%",
                score.job_id, score.keyword_coverage, score.must_have_coverage
            );
        } else {
            info!("No scorer configured, skipping scoring stage");
        }

        // Stage: application tracking.
        self.advance(&mut state, PipelineState::Tracking, cancel)?;
        let tracker_request = to_request_value(&TrackerRequest {
            job_intel: intel.clone(),
            resume_ref: format!("{}/{}", folder_name, resume_name),
            cover_letter_ref: format!("{}/cover_letter_{}.txt", folder_name, intel.job_id),
            date_applied: request.date_applied.clone(),
            notes: request.notes.clone(),
        })?;
        let row: TrackerRow = self
            .stage_with_retry(
                self.capabilities.application_tracker.as_ref(),
                tracker_request,
                &[],
                "TrackingRejected",
                validate::validate_tracker_row,
            )
            .await?;
        self.ledger
            .append_row(
                &self.config.tracker_csv_path,
                &TRACKER_HEADER,
                &row.to_row_map(),
            )
            .await?;

        self.advance(&mut state, PipelineState::Done, cancel)?;
        Ok(Bundle {
            job_intel_json: intel,
            updated_resume_latex: tailor.updated_resume_latex,
            cover_letter: letter.cover_letter,
            application_tracker_csv: row.to_csv_text(),
        })
    }

    /// Between-stage checkpoint: honours caller cancellation and logs the
    /// transition. Capability calls already in flight are not interrupted.
    fn advance(
        &self,
        state: &mut PipelineState,
        next: PipelineState,
        cancel: &CancellationToken,
    ) -> Result<(), PipelineError> {
        if cancel.is_cancelled() {
            warn!("Run cancelled between stages ({:?} -> {:?})", state, next);
            return Err(PipelineError::Cancelled);
        }
        info!("Pipeline state: {:?} -> {:?}", state, next);
        *state = next;
        Ok(())
    }

    /// One capability invocation plus response validation, re-invoked at
    /// most once with explicit facts-only constraints when the first attempt
    /// fails validation or is rejected for fabrication. A second failure is
    /// fatal to the run.
    async fn stage_with_retry<Resp, V>(
        &self,
        capability: &dyn Capability,
        request: Value,
        retry_constraints: &[&str],
        fatal_label: &str,
        validate: V,
    ) -> Result<Resp, PipelineError>
    where
        Resp: DeserializeOwned,
        V: Fn(&Resp) -> Result<(), PipelineError>,
    {
        match self.attempt(capability, request.clone(), &validate).await {
            Ok(response) => Ok(response),
            Err(e) if e.grants_retry() => {
                warn!(
                    "{} rejected ({}); re-invoking once with explicit constraints",
                    capability.name(),
                    e
                );
                let mut retry_request = request;
                if let Value::Object(map) = &mut retry_request {
                    map.insert("constraints".to_string(), json!(retry_constraints));
                }
                self.attempt(capability, retry_request, &validate)
                    .await
                    .map_err(|second| fatal_stage_failure(second, fatal_label))
            }
            Err(e) => Err(e),
        }
    }

    async fn attempt<Resp, V>(
        &self,
        capability: &dyn Capability,
        request: Value,
        validate: &V,
    ) -> Result<Resp, PipelineError>
    where
        Resp: DeserializeOwned,
        V: Fn(&Resp) -> Result<(), PipelineError>,
    {
        let stage = capability.name();
        let value = tokio::time::timeout(self.config.call_timeout, capability.call(request))
            .await
            .map_err(|_| PipelineError::CapabilityUnreachable {
                stage,
                reason: format!("no response within {:?}", self.config.call_timeout),
            })??;

        let response: Resp =
            serde_json::from_value(value).map_err(|e| PipelineError::CapabilityValidationFailed {
                stage,
                reason: format!("response does not match declared schema: {}", e),
            })?;
        validate(&response)?;
        Ok(response)
    }
}

fn to_request_value<T: Serialize>(request: &T) -> Result<Value, PipelineError> {
    serde_json::to_value(request).map_err(|e| PipelineError::CapabilityValidationFailed {
        stage: "controller",
        reason: format!("failed to serialize request: {}", e),
    })
}

/// Preserve the error variant but prefix the stage's terminal reason
/// ("IntelExtractionInsufficient", "TailoringRejected", ...).
fn fatal_stage_failure(err: PipelineError, label: &str) -> PipelineError {
    match err {
        PipelineError::CapabilityValidationFailed { stage, reason } => {
            PipelineError::CapabilityValidationFailed {
                stage,
                reason: format!("{}: {}", label, reason),
            }
        }
        PipelineError::FabricationRejected { stage, reason } => {
            PipelineError::FabricationRejected {
                stage,
                reason: format!("{}: {}", label, reason),
            }
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::types::{KeywordCoverage, RequirementItem};
    use crate::capabilities::{LocalScorer, LocalTracker};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    /// Scripted capability: pops one canned response per call and records
    /// every request it saw.
    struct ScriptedCapability {
        stage: &'static str,
        responses: Mutex<VecDeque<Result<Value, PipelineError>>>,
        requests: Mutex<Vec<Value>>,
        calls: AtomicUsize,
    }

    impl ScriptedCapability {
        fn new(stage: &'static str, responses: Vec<Result<Value, PipelineError>>) -> Arc<Self> {
            Arc::new(Self {
                stage,
                responses: Mutex::new(responses.into()),
                requests: Mutex::new(Vec::new()),
                calls: AtomicUsize::new(0),
            })
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn request_at(&self, index: usize) -> Value {
            self.requests.lock().unwrap()[index].clone()
        }
    }

    #[async_trait]
    impl Capability for ScriptedCapability {
        fn name(&self) -> &'static str {
            self.stage
        }

        async fn call(&self, request: Value) -> Result<Value, PipelineError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.requests.lock().unwrap().push(request);
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| {
                    Err(PipelineError::CapabilityUnreachable {
                        stage: self.stage,
                        reason: "script exhausted".to_string(),
                    })
                })
        }
    }

    fn good_intel() -> JobIntelligence {
        let mut intel = JobIntelligence {
            job_id: "j123".to_string(),
            keywords_for_ats: vec![
                "rust".to_string(),
                "kubernetes".to_string(),
                "postgresql".to_string(),
            ],
            ..Default::default()
        };
        intel.role.title = "Senior Backend Engineer".to_string();
        intel.company.name = "Acme".to_string();
        intel.location.city = "Berlin".to_string();
        intel.location.country = "Germany".to_string();
        intel.requirements.must_have = vec![RequirementItem {
            item: "Rust".to_string(),
            evidence_phrase: "5+ years of Rust".to_string(),
        }];
        intel
            .tailoring_guidance
            .resume_focus
            .push("systems experience".to_string());
        intel
    }

    fn good_tailor() -> TailorResponse {
        TailorResponse {
            updated_resume_latex:
                "\\documentclass{article} Rust Kubernetes PostgreSQL engineer".to_string(),
            ats_keyword_coverage: KeywordCoverage {
                matched_keywords: vec!["rust".to_string(), "kubernetes".to_string()],
                missing_unverifiable: vec![],
            },
            ..Default::default()
        }
    }

    fn ok(value: impl Serialize) -> Result<Value, PipelineError> {
        Ok(serde_json::to_value(value).unwrap())
    }

    struct Harness {
        controller: PipelineController,
        intel: Arc<ScriptedCapability>,
        tailor: Arc<ScriptedCapability>,
        facts: Arc<ScriptedCapability>,
        letter: Arc<ScriptedCapability>,
        _dir: tempfile::TempDir,
        base_resume: std::path::PathBuf,
        tracker_csv: std::path::PathBuf,
        output_root: std::path::PathBuf,
    }

    fn harness(
        intel_script: Vec<Result<Value, PipelineError>>,
        tailor_script: Vec<Result<Value, PipelineError>>,
        with_scorer: bool,
    ) -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let base_resume = dir.path().join("resume.tex");
        std::fs::write(&base_resume, "\\documentclass{article} generalist resume").unwrap();

        let output_root = dir.path().to_path_buf();
        let tracker_csv = dir.path().join("applications.csv");

        let intel = ScriptedCapability::new("job_intel", intel_script);
        let tailor = ScriptedCapability::new("resume_tailor", tailor_script);
        let facts = ScriptedCapability::new(
            "resume_fact_extractor",
            vec![ok(VerifiedFacts {
                resume_verified_facts: vec!["Shipped Rust services".to_string()],
            })],
        );
        let letter = ScriptedCapability::new(
            "cover_letter",
            vec![ok(CoverLetterResponse {
                cover_letter: "Dear hiring team, I build Rust services.".to_string(),
                ..Default::default()
            })],
        );

        let capabilities = CapabilitySet {
            job_intel: intel.clone(),
            resume_tailor: tailor.clone(),
            fact_extractor: facts.clone(),
            cover_letter: letter.clone(),
            scorer: with_scorer.then(|| Arc::new(LocalScorer::new()) as Arc<dyn Capability>),
            application_tracker: Arc::new(LocalTracker::new()),
        };

        let config = PipelineConfig::new()
            .with_output_root(output_root.clone())
            .with_tracker_csv(tracker_csv.clone());

        Harness {
            controller: PipelineController::new(config, capabilities),
            intel,
            tailor,
            facts,
            letter,
            _dir: dir,
            base_resume,
            tracker_csv,
            output_root,
        }
    }

    fn request_for(h: &Harness) -> RunRequest {
        RunRequest {
            base_resume_path: h.base_resume.display().to_string(),
            raw_jd_text:
                "Senior Backend Engineer at Acme. Must have Rust, Kubernetes, PostgreSQL."
                    .to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_missing_base_resume_halts_before_any_capability() {
        let h = harness(vec![ok(good_intel())], vec![ok(good_tailor())], true);
        let request = RunRequest {
            raw_jd_text: "some posting".to_string(),
            ..Default::default()
        };

        let outcome = h.controller.run(request, CancellationToken::new()).await;
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "waiting_for_input");
        assert_eq!(json["missing_fields"][0], "base_resume_path");
        assert_eq!(h.intel.call_count(), 0);
        assert_eq!(h.tailor.call_count(), 0);
    }

    #[tokio::test]
    async fn test_missing_job_source_halts_before_any_capability() {
        let h = harness(vec![ok(good_intel())], vec![ok(good_tailor())], true);
        let request = RunRequest {
            base_resume_path: h.base_resume.display().to_string(),
            ..Default::default()
        };

        let outcome = h.controller.run(request, CancellationToken::new()).await;
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["missing_fields"][0], "job_url_or_raw_jd_text");
        assert_eq!(h.intel.call_count(), 0);
    }

    #[tokio::test]
    async fn test_happy_path_produces_bundle_and_artifacts() {
        let h = harness(vec![ok(good_intel())], vec![ok(good_tailor())], true);

        let outcome = h
            .controller
            .run(request_for(&h), CancellationToken::new())
            .await;
        assert!(outcome.is_done(), "unexpected outcome: {:?}", outcome);

        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["job_intel_json"]["job_id"], "j123");
        assert!(!json["updated_resume_latex"].as_str().unwrap().is_empty());
        assert!(!json["cover_letter"].as_str().unwrap().is_empty());
        assert!(json["application_tracker_csv"]
            .as_str()
            .unwrap()
            .starts_with("job_id,company"));

        let folder = h.output_root.join("j123_senior_backend_engineer");
        assert!(folder.is_dir());
        assert!(folder.join("resume_j123_senior_backend_engineer.tex").is_file());
        assert!(folder.join("cover_letter_j123.txt").is_file());
        assert!(folder.join("metrics.json").is_file());

        let csv = std::fs::read_to_string(&h.tracker_csv).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("job_id,company,role_title"));
        assert!(lines[1].contains("Not Applied"));
        assert!(lines[1].contains("rust;kubernetes;postgresql"));

        assert_eq!(h.facts.call_count(), 1);
        assert_eq!(h.letter.call_count(), 1);
    }

    #[tokio::test]
    async fn test_weak_intel_retried_once_with_constraints() {
        let weak = JobIntelligence {
            job_id: "j123".to_string(),
            ..Default::default()
        };
        let h = harness(
            vec![ok(weak), ok(good_intel())],
            vec![ok(good_tailor())],
            false,
        );

        let outcome = h
            .controller
            .run(request_for(&h), CancellationToken::new())
            .await;
        assert!(outcome.is_done());
        assert_eq!(h.intel.call_count(), 2);

        let retry = h.intel.request_at(1);
        let constraints = retry["constraints"].as_array().unwrap();
        assert!(!constraints.is_empty());
        assert!(constraints
            .iter()
            .any(|c| c.as_str().unwrap().contains("must be non-empty")));
    }

    #[tokio::test]
    async fn test_weak_intel_twice_is_fatal_and_stops_pipeline() {
        let weak = JobIntelligence::default();
        let h = harness(
            vec![ok(weak.clone()), ok(weak)],
            vec![ok(good_tailor())],
            false,
        );

        let outcome = h
            .controller
            .run(request_for(&h), CancellationToken::new())
            .await;
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["error"], "CapabilityValidationFailed");
        assert!(json["details"]
            .as_str()
            .unwrap()
            .contains("IntelExtractionInsufficient"));
        assert_eq!(h.intel.call_count(), 2);
        assert_eq!(h.tailor.call_count(), 0);
    }

    #[tokio::test]
    async fn test_fabrication_rejected_twice_is_fatal() {
        let risky = TailorResponse {
            updated_resume_latex: "\\documentclass{article}".to_string(),
            risk_flags: vec!["unverifiable certification".to_string()],
            ..Default::default()
        };
        let h = harness(
            vec![ok(good_intel())],
            vec![ok(risky.clone()), ok(risky)],
            false,
        );

        let outcome = h
            .controller
            .run(request_for(&h), CancellationToken::new())
            .await;
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["error"], "FabricationRejected");
        assert!(json["details"].as_str().unwrap().contains("TailoringRejected"));
        assert_eq!(h.tailor.call_count(), 2);
        assert_eq!(h.facts.call_count(), 0);
    }

    #[tokio::test]
    async fn test_unreachable_capability_is_not_retried() {
        let h = harness(
            vec![Err(PipelineError::CapabilityUnreachable {
                stage: "job_intel",
                reason: "connection refused".to_string(),
            })],
            vec![ok(good_tailor())],
            false,
        );

        let outcome = h
            .controller
            .run(request_for(&h), CancellationToken::new())
            .await;
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["error"], "CapabilityUnreachable");
        assert_eq!(h.intel.call_count(), 1);
    }

    #[tokio::test]
    async fn test_cancellation_between_stages() {
        let h = harness(vec![ok(good_intel())], vec![ok(good_tailor())], false);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let outcome = h.controller.run(request_for(&h), cancel).await;
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["error"], "Cancelled");
        assert_eq!(h.intel.call_count(), 0);
    }

    #[tokio::test]
    async fn test_scorer_absent_skips_scoring() {
        let h = harness(vec![ok(good_intel())], vec![ok(good_tailor())], false);

        let outcome = h
            .controller
            .run(request_for(&h), CancellationToken::new())
            .await;
        assert!(outcome.is_done());
        assert!(!h
            .output_root
            .join("j123_senior_backend_engineer/metrics.json")
            .exists());
    }

    #[tokio::test]
    async fn test_second_run_appends_without_duplicate_header() {
        let dir = tempfile::tempdir().unwrap();
        let base_resume = dir.path().join("resume.tex");
        std::fs::write(&base_resume, "base resume").unwrap();
        let tracker_csv = dir.path().join("applications.csv");

        for _ in 0..2 {
            let intel = ScriptedCapability::new("job_intel", vec![ok(good_intel())]);
            let tailor = ScriptedCapability::new("resume_tailor", vec![ok(good_tailor())]);
            let facts = ScriptedCapability::new(
                "resume_fact_extractor",
                vec![ok(VerifiedFacts::default())],
            );
            let letter = ScriptedCapability::new(
                "cover_letter",
                vec![ok(CoverLetterResponse {
                    cover_letter: "Dear team,".to_string(),
                    ..Default::default()
                })],
            );
            let capabilities = CapabilitySet {
                job_intel: intel,
                resume_tailor: tailor,
                fact_extractor: facts,
                cover_letter: letter,
                scorer: None,
                application_tracker: Arc::new(LocalTracker::new()),
            };
            // Re-runs target the same deterministic folder, so artifact
            // overwrite must be allowed.
            let config = PipelineConfig::new()
                .with_output_root(dir.path().to_path_buf())
                .with_tracker_csv(tracker_csv.clone())
                .with_overwrite(true);
            let controller = PipelineController::new(config, capabilities);

            let request = RunRequest {
                base_resume_path: base_resume.display().to_string(),
                raw_jd_text: "Senior Backend Engineer posting".to_string(),
                date_applied: "2024-01-01".to_string(),
                ..Default::default()
            };
            let outcome = controller.run(request, CancellationToken::new()).await;
            assert!(outcome.is_done());
        }

        let csv = std::fs::read_to_string(&tracker_csv).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines.iter().filter(|l| l.starts_with("job_id,")).count(), 1);
        assert!(lines[1].contains("Applied"));
    }

    #[tokio::test]
    async fn test_rerun_without_overwrite_surfaces_collision() {
        let h = harness(
            vec![ok(good_intel()), ok(good_intel())],
            vec![ok(good_tailor()), ok(good_tailor())],
            false,
        );

        let outcome = h
            .controller
            .run(request_for(&h), CancellationToken::new())
            .await;
        assert!(outcome.is_done());

        let outcome = h
            .controller
            .run(request_for(&h), CancellationToken::new())
            .await;
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["error"], "FileAlreadyExists");
    }
}
