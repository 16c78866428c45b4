// src/capabilities/mod.rs
//! Agent capability interface. Each reasoning stage is an opaque service
//! behind the same trait: strict JSON in, strict JSON out, tagged failure.
//! Backends can be remote reasoning services, local rules, or test scripts.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use crate::error::PipelineError;

pub mod client;
pub mod scorer;
pub mod tracker;
pub mod types;
pub mod validate;

pub use client::CapabilityClient;
pub use scorer::LocalScorer;
pub use tracker::LocalTracker;

#[async_trait]
pub trait Capability: Send + Sync {
    /// Stage name used in endpoints, logs and error tags.
    fn name(&self) -> &'static str;

    async fn call(&self, request: Value) -> Result<Value, PipelineError>;
}

/// The six pipeline stages. The scorer is optional; a run without one skips
/// the scoring step instead of failing.
#[derive(Clone)]
pub struct CapabilitySet {
    pub job_intel: Arc<dyn Capability>,
    pub resume_tailor: Arc<dyn Capability>,
    pub fact_extractor: Arc<dyn Capability>,
    pub cover_letter: Arc<dyn Capability>,
    pub scorer: Option<Arc<dyn Capability>>,
    pub application_tracker: Arc<dyn Capability>,
}

impl CapabilitySet {
    /// Default wiring: the four language-dependent stages talk to a remote
    /// reasoning backend, while scoring and tracking are deterministic and
    /// run locally against the artifact store.
    pub fn over_http(base_url: &str, timeout: Duration) -> Result<Self, PipelineError> {
        Ok(Self {
            job_intel: Arc::new(CapabilityClient::new(base_url, "job_intel", timeout)?),
            resume_tailor: Arc::new(CapabilityClient::new(base_url, "resume_tailor", timeout)?),
            fact_extractor: Arc::new(CapabilityClient::new(
                base_url,
                "resume_fact_extractor",
                timeout,
            )?),
            cover_letter: Arc::new(CapabilityClient::new(base_url, "cover_letter", timeout)?),
            scorer: Some(Arc::new(LocalScorer::new())),
            application_tracker: Arc::new(LocalTracker::new()),
        })
    }

    pub fn without_scorer(mut self) -> Self {
        self.scorer = None;
        self
    }
}
