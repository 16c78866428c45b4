// src/core/mod.rs
//! Artifact store: file operations, unified diff, CSV ledger.

pub mod diff;
pub mod fs_ops;
pub mod ledger;

pub use diff::{unified_diff, DiffOutcome};
pub use fs_ops::{FsOps, ReadOutcome, WriteOutcome, DEFAULT_MAX_READ_BYTES};
pub use ledger::{AppendOutcome, CsvLedger};
