// src/files/mod.rs

//! Controlled mutation of files under a managed root.
//!
//! - [`paths`] normalises producer paths and rejects unsafe ones.
//! - [`backup`] names and enumerates prior versions.
//! - [`history`] is the persisted per-path write log.
//! - [`diff`] produces and replays unified diffs.
//! - [`manager`] ties them together in [`FileManager`].

pub mod backup;
pub mod diff;
pub mod history;
pub mod manager;
pub mod paths;

pub use backup::{BackupEntry, BackupName};
pub use diff::{DiffError, DiffSummary, apply_diff, summarize, unified_diff};
pub use history::{FileHistory, WriteRecord};
pub use manager::{
    BatchResult, FailedFile, FailureKind, FileManager, FileManagerOptions, RollbackResult,
};
