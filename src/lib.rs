// src/lib.rs
//! Job-application pipeline: turns a base LaTeX resume plus a job posting
//! into a tailored resume, a grounded cover letter, scoring metrics and a
//! tracker ledger row, driven by a fixed sequence of agent capabilities.

use anyhow::Result;
use tokio_util::sync::CancellationToken;

pub mod capabilities;
pub mod config;
pub mod core;
pub mod error;
pub mod fetch;
pub mod pipeline;
pub mod utils;

pub use capabilities::{Capability, CapabilitySet};
pub use config::PipelineConfig;
pub use error::PipelineError;
pub use pipeline::{Bundle, PipelineController, PipelineOutcome, RunRequest, WaitingForInput};

/// Convenience entry point: load configuration, wire the default capability
/// set against the configured backend and run one request to completion.
pub async fn run_application(request: RunRequest) -> Result<PipelineOutcome> {
    let config = PipelineConfig::load()?;
    run_application_with(config, request, CancellationToken::new()).await
}

/// Run one request against an explicit configuration and cancellation token.
pub async fn run_application_with(
    config: PipelineConfig,
    request: RunRequest,
    cancel: CancellationToken,
) -> Result<PipelineOutcome> {
    let capabilities = CapabilitySet::over_http(&config.backend_url, config.call_timeout)?;
    let controller = PipelineController::new(config, capabilities);
    Ok(controller.run(request, cancel).await)
}
