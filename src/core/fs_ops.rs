// src/core/fs_ops.rs
//! Artifact store file operations - every failure is a tagged error variant

use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncReadExt;
use tracing::info;

use crate::error::PipelineError;
use crate::utils::resolve_path;

/// Safety limit for text reads.
pub const DEFAULT_MAX_READ_BYTES: u64 = 2_000_000;

const HASH_CHUNK_BYTES: usize = 1024 * 1024;

#[derive(Debug, Clone)]
pub struct ReadOutcome {
    pub path: PathBuf,
    pub content: String,
}

#[derive(Debug, Clone)]
pub struct WriteOutcome {
    pub path: PathBuf,
    pub bytes: u64,
}

pub struct FsOps;

impl FsOps {
    /// Read a UTF-8 text file, guarding against oversized inputs.
    pub async fn read_text(path: &Path, max_bytes: u64) -> Result<ReadOutcome, PipelineError> {
        let p = resolve_path(path);

        let meta = match fs::metadata(&p).await {
            Ok(meta) if meta.is_file() => meta,
            _ => return Err(PipelineError::FileNotFound(p)),
        };

        if meta.len() > max_bytes {
            return Err(PipelineError::FileTooLarge {
                path: p,
                size: meta.len(),
                max_bytes,
            });
        }

        let bytes = fs::read(&p).await?;
        let content = String::from_utf8(bytes).map_err(|_| PipelineError::DecodeError(p.clone()))?;

        Ok(ReadOutcome { path: p, content })
    }

    /// Write a UTF-8 text file, creating parent directories as needed.
    /// Refuses to replace an existing file unless `overwrite` is set.
    pub async fn write_text(
        path: &Path,
        content: &str,
        overwrite: bool,
    ) -> Result<WriteOutcome, PipelineError> {
        let p = resolve_path(path);

        if !overwrite && fs::try_exists(&p).await.unwrap_or(false) {
            return Err(PipelineError::FileAlreadyExists(p));
        }

        if let Some(parent) = p.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| PipelineError::WriteFailed {
                    path: parent.to_path_buf(),
                    reason: e.to_string(),
                })?;
        }

        let bytes = content.as_bytes();
        fs::write(&p, bytes)
            .await
            .map_err(|e| PipelineError::WriteFailed {
                path: p.clone(),
                reason: e.to_string(),
            })?;

        info!("Written file: {} ({} bytes)", p.display(), bytes.len());
        Ok(WriteOutcome {
            path: p,
            bytes: bytes.len() as u64,
        })
    }

    /// Create a directory recursively. Returns whether it was newly created;
    /// an already existing directory is not an error.
    pub async fn mkdir(path: &Path) -> Result<bool, PipelineError> {
        let p = resolve_path(path);
        let existed = fs::try_exists(&p).await.unwrap_or(false);

        fs::create_dir_all(&p)
            .await
            .map_err(|e| PipelineError::WriteFailed {
                path: p.clone(),
                reason: e.to_string(),
            })?;

        if !existed {
            info!("Created directory: {}", p.display());
        }
        Ok(!existed)
    }

    /// SHA-256 of a file as a lowercase hex digest, streamed in 1 MiB chunks
    /// to bound memory on large inputs.
    pub async fn sha256(path: &Path) -> Result<String, PipelineError> {
        let p = resolve_path(path);

        let mut file = match fs::File::open(&p).await {
            Ok(f) => f,
            Err(_) => return Err(PipelineError::FileNotFound(p)),
        };

        let mut hasher = Sha256::new();
        let mut buf = vec![0u8; HASH_CHUNK_BYTES];
        loop {
            let n = file.read(&mut buf).await?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
        }

        Ok(format!("{:x}", hasher.finalize()))
    }
}
