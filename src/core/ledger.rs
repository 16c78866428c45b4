// src/core/ledger.rs
//! Append-only CSV ledger for application tracking.
//!
//! Appends from one process are serialized through an internal mutex;
//! concurrent appends to the same file from independent processes are a
//! deployment concern and are not locked here.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::info;

use crate::error::PipelineError;
use crate::utils::resolve_path;

#[derive(Debug, Clone)]
pub struct AppendOutcome {
    pub path: PathBuf,
    pub created: bool,
}

#[derive(Debug, Default)]
pub struct CsvLedger {
    write_lock: Mutex<()>,
}

impl CsvLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one row. Creates the file with a header line when absent;
    /// never duplicates the header on subsequent appends. Row keys not in
    /// `header` are dropped, header keys missing from `row` become empty.
    pub async fn append_row(
        &self,
        path: &Path,
        header: &[&str],
        row: &HashMap<String, String>,
    ) -> Result<AppendOutcome, PipelineError> {
        let _guard = self.write_lock.lock().await;

        let p = resolve_path(path);
        let created = !p.exists();

        if let Some(parent) = p.parent() {
            std::fs::create_dir_all(parent).map_err(|e| PipelineError::WriteFailed {
                path: parent.to_path_buf(),
                reason: e.to_string(),
            })?;
        }

        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&p)
            .map_err(|e| PipelineError::WriteFailed {
                path: p.clone(),
                reason: e.to_string(),
            })?;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);

        if created {
            writer
                .write_record(header)
                .map_err(|e| PipelineError::WriteFailed {
                    path: p.clone(),
                    reason: e.to_string(),
                })?;
        }

        let record: Vec<String> = header
            .iter()
            .map(|key| row.get(*key).cloned().unwrap_or_default())
            .collect();
        writer
            .write_record(&record)
            .map_err(|e| PipelineError::WriteFailed {
                path: p.clone(),
                reason: e.to_string(),
            })?;
        writer.flush().map_err(|e| PipelineError::WriteFailed {
            path: p.clone(),
            reason: e.to_string(),
        })?;

        info!("Appended tracker row to {} (created: {})", p.display(), created);
        Ok(AppendOutcome { path: p, created })
    }
}
