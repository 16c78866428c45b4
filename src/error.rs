// src/error.rs
//! Tagged error taxonomy for the pipeline - every failure surfaces as a
//! structured variant, never as a free-text panic.

use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("missing required input: {0}")]
    InputMissing(String),

    #[error("file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("file too large: {size} > {max_bytes} bytes ({path})")]
    FileTooLarge {
        path: PathBuf,
        size: u64,
        max_bytes: u64,
    },

    #[error("file exists and overwrite=false: {0}")]
    FileAlreadyExists(PathBuf),

    #[error("file is not valid UTF-8: {0}")]
    DecodeError(PathBuf),

    #[error("{stage} output failed validation: {reason}")]
    CapabilityValidationFailed { stage: &'static str, reason: String },

    #[error("{stage} produced unverifiable claims: {reason}")]
    FabricationRejected { stage: &'static str, reason: String },

    #[error("{stage} unreachable: {reason}")]
    CapabilityUnreachable { stage: &'static str, reason: String },

    #[error("write failed for {path}: {reason}")]
    WriteFailed { path: PathBuf, reason: String },

    #[error("pipeline cancelled by caller")]
    Cancelled,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    /// Stages get exactly one extra attempt for validation and fabrication
    /// failures. Everything else is fatal to the run.
    pub fn grants_retry(&self) -> bool {
        matches!(
            self,
            PipelineError::CapabilityValidationFailed { .. }
                | PipelineError::FabricationRejected { .. }
        )
    }

    /// Short machine-readable tag for the JSON error object.
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::InputMissing(_) => "InputMissing",
            PipelineError::FileNotFound(_) => "FileNotFound",
            PipelineError::FileTooLarge { .. } => "FileTooLarge",
            PipelineError::FileAlreadyExists(_) => "FileAlreadyExists",
            PipelineError::DecodeError(_) => "DecodeError",
            PipelineError::CapabilityValidationFailed { .. } => "CapabilityValidationFailed",
            PipelineError::FabricationRejected { .. } => "FabricationRejected",
            PipelineError::CapabilityUnreachable { .. } => "CapabilityUnreachable",
            PipelineError::WriteFailed { .. } => "WriteFailed",
            PipelineError::Cancelled => "Cancelled",
            PipelineError::Io(_) => "Io",
        }
    }
}

/// Terminal JSON error object returned when a run fails.
#[derive(Debug, Clone, Serialize)]
pub struct RunError {
    pub error: String,
    pub details: String,
}

impl From<&PipelineError> for RunError {
    fn from(err: &PipelineError) -> Self {
        Self {
            error: err.kind().to_string(),
            details: err.to_string(),
        }
    }
}
