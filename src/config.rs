// src/config.rs
//! Pipeline configuration: builder-style defaults, optional config.yaml,
//! environment variable overrides.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

use crate::core::DEFAULT_MAX_READ_BYTES;

const DEFAULT_BACKEND_URL: &str = "http://127.0.0.1:8700";
const DEFAULT_TRACKER_CSV: &str = "applications.csv";
const DEFAULT_CALL_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Base URL of the reasoning backend serving the capability endpoints.
    pub backend_url: String,
    /// Directory under which per-job folders are created.
    pub output_root: PathBuf,
    /// Append-only application ledger.
    pub tracker_csv_path: PathBuf,
    /// Per-capability-call timeout.
    pub call_timeout: Duration,
    /// Size guard for text reads.
    pub max_read_bytes: u64,
    /// Allow replacing artifacts from a previous run of the same job.
    pub overwrite_artifacts: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            output_root: PathBuf::from("."),
            tracker_csv_path: PathBuf::from(DEFAULT_TRACKER_CSV),
            call_timeout: Duration::from_secs(DEFAULT_CALL_TIMEOUT_SECS),
            max_read_bytes: DEFAULT_MAX_READ_BYTES,
            overwrite_artifacts: false,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ConfigFile {
    backend_url: Option<String>,
    output_root: Option<PathBuf>,
    tracker_csv: Option<PathBuf>,
    call_timeout_secs: Option<u64>,
    max_read_bytes: Option<u64>,
}

impl PipelineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_backend_url(mut self, url: &str) -> Self {
        self.backend_url = url.to_string();
        self
    }

    pub fn with_output_root(mut self, dir: PathBuf) -> Self {
        self.output_root = dir;
        self
    }

    pub fn with_tracker_csv(mut self, path: PathBuf) -> Self {
        self.tracker_csv_path = path;
        self
    }

    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite_artifacts = overwrite;
        self
    }

    /// Load configuration: defaults, then config.yaml when present, then
    /// environment variables on top.
    pub fn load() -> Result<Self> {
        let mut config = Self::default();

        let config_path = PathBuf::from("config.yaml");
        if config_path.exists() {
            info!("Loading configuration from {}", config_path.display());
            let content = std::fs::read_to_string(&config_path)
                .context("Failed to read config.yaml")?;
            let file: ConfigFile =
                serde_yaml::from_str(&content).context("Failed to parse config.yaml")?;

            if let Some(url) = file.backend_url {
                config.backend_url = url;
            }
            if let Some(dir) = file.output_root {
                config.output_root = dir;
            }
            if let Some(path) = file.tracker_csv {
                config.tracker_csv_path = path;
            }
            if let Some(secs) = file.call_timeout_secs {
                config.call_timeout = Duration::from_secs(secs);
            }
            if let Some(bytes) = file.max_read_bytes {
                config.max_read_bytes = bytes;
            }
        }

        if let Ok(url) = std::env::var("JOBFORGE_BACKEND_URL") {
            config.backend_url = url;
        }
        if let Ok(path) = std::env::var("JOBFORGE_TRACKER_CSV") {
            config.tracker_csv_path = PathBuf::from(path);
        }
        if let Ok(dir) = std::env::var("JOBFORGE_OUTPUT_ROOT") {
            config.output_root = PathBuf::from(dir);
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.max_read_bytes, 2_000_000);
        assert_eq!(config.call_timeout, Duration::from_secs(60));
        assert!(!config.overwrite_artifacts);
    }

    #[test]
    fn test_builder_chain() {
        let config = PipelineConfig::new()
            .with_backend_url("http://backend:9000")
            .with_tracker_csv(PathBuf::from("ledger/apps.csv"))
            .with_overwrite(true);
        assert_eq!(config.backend_url, "http://backend:9000");
        assert_eq!(config.tracker_csv_path, PathBuf::from("ledger/apps.csv"));
        assert!(config.overwrite_artifacts);
    }

    #[test]
    fn test_config_file_parses_partial_yaml() {
        let file: ConfigFile = serde_yaml::from_str("backend_url: http://x:1\n").unwrap();
        assert_eq!(file.backend_url.as_deref(), Some("http://x:1"));
        assert!(file.tracker_csv.is_none());
    }
}
