// src/files/manager.rs

//! The file mutation engine: applies batches of generated files under one
//! managed root and can undo a work unit's changes.
//!
//! Every write of an existing file is preceded by a backup, and every
//! committed write is recorded in the history before the next file of the
//! batch is touched. Failures are per file: one bad record never stops the
//! rest of its batch.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::collab::FileRecord;
use crate::config::ConfigFile;
use crate::errors::{AgentDevError, Result};
use crate::files::backup::{BackupEntry, BackupStore, validate_work_unit};
use crate::files::diff::unified_diff;
use crate::files::history::{FileHistory, HISTORY_FILE, WriteRecord, content_hash};
use crate::files::paths::{STATE_DIR, normalize_relative, relative_str};
use crate::fs::FileSystem;

const BACKUP_DIR: &str = "backups";
const TMP_SUFFIX: &str = ".agentdev-tmp";

/// Behaviour of a [`FileManager`], fixed for its lifetime.
#[derive(Debug, Clone)]
pub struct FileManagerOptions {
    /// Compute diffs and report, never touch the disk.
    pub dry_run: bool,
    /// Write records kept per path; `None` keeps everything.
    pub history_cap: Option<usize>,
    /// Files larger than this many bytes are rejected.
    pub max_file_size: Option<u64>,
    /// Glob patterns of relative paths that are never written.
    pub protect: Vec<String>,
}

impl Default for FileManagerOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            history_cap: Some(100),
            max_file_size: None,
            protect: Vec::new(),
        }
    }
}

impl FileManagerOptions {
    pub fn from_config(cfg: &ConfigFile) -> Self {
        Self {
            dry_run: cfg.config.dry_run,
            history_cap: Some(cfg.files.history_cap),
            max_file_size: Some(cfg.files.max_file_size_kb.saturating_mul(1024)),
            protect: cfg.files.protect.clone(),
        }
    }
}

/// Whether a per-file failure came from the record itself or from the disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Config,
    Io,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedFile {
    pub path: String,
    pub kind: FailureKind,
    pub error: String,
}

impl FailedFile {
    fn new(path: &str, kind: FailureKind, error: impl ToString) -> Self {
        Self {
            path: path.to_string(),
            kind,
            error: error.to_string(),
        }
    }

    fn from_error(path: &str, err: &AgentDevError) -> Self {
        let kind = if err.is_configuration() {
            FailureKind::Config
        } else {
            FailureKind::Io
        };
        Self::new(path, kind, err)
    }
}

/// Outcome of [`FileManager::apply_batch`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchResult {
    pub work_unit_id: String,
    pub dry_run: bool,
    /// Normalised paths written (or, in dry-run, that would be written).
    pub succeeded: Vec<String>,
    pub failed: Vec<FailedFile>,
    /// Backups of succeeded paths, relative to the managed root. A backup
    /// taken before a failed write stays on disk but is not listed here.
    pub backups_created: Vec<String>,
    /// Unified diff per valid path; empty for new files and unchanged
    /// content.
    pub diffs: BTreeMap<String, String>,
}

impl BatchResult {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    /// Some files were written and some were not.
    pub fn is_partial(&self) -> bool {
        !self.succeeded.is_empty() && !self.failed.is_empty()
    }
}

/// Outcome of [`FileManager::rollback`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RollbackResult {
    pub work_unit_id: String,
    pub dry_run: bool,
    /// Paths restored from a backup.
    pub restored: Vec<String>,
    /// Paths the work unit created that were deleted again.
    pub removed: Vec<String>,
    pub failed: Vec<FailedFile>,
}

impl RollbackResult {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Applies generated files under a managed root.
///
/// Single owner: batches and rollbacks take `&mut self`, so at most one runs
/// at a time against a given history.
#[derive(Debug)]
pub struct FileManager {
    fs: Arc<dyn FileSystem>,
    root: PathBuf,
    options: FileManagerOptions,
    protect: GlobSet,
    backups: BackupStore,
    history: FileHistory,
    history_path: PathBuf,
}

impl FileManager {
    /// Open the managed root, loading any existing history.
    ///
    /// Outside dry-run the root and its state directory are created.
    pub fn open(
        fs: Arc<dyn FileSystem>,
        root: impl Into<PathBuf>,
        options: FileManagerOptions,
    ) -> Result<Self> {
        let root = root.into();
        let protect = build_protect_set(&options.protect)?;
        let state_dir = root.join(STATE_DIR);
        let backup_dir = state_dir.join(BACKUP_DIR);
        let history_path = state_dir.join(HISTORY_FILE);

        if !options.dry_run {
            fs.create_dir_all(&backup_dir)?;
        }
        let history = FileHistory::load(fs.as_ref(), &history_path)?;

        info!(
            root = ?root,
            dry_run = options.dry_run,
            tracked_paths = history.len(),
            "file manager ready"
        );

        Ok(Self {
            backups: BackupStore::new(fs.clone(), backup_dir),
            fs,
            root,
            options,
            protect,
            history,
            history_path,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn is_dry_run(&self) -> bool {
        self.options.dry_run
    }

    pub fn history(&self) -> &FileHistory {
        &self.history
    }

    pub fn state_dir(&self) -> PathBuf {
        self.root.join(STATE_DIR)
    }

    /// Normalise `raw` and return it with its absolute location.
    ///
    /// Rejects paths escaping the root (lexically or through a symlink),
    /// reserved paths and protected paths.
    pub fn resolve(&self, raw: &str) -> Result<(String, PathBuf)> {
        let rel = normalize_relative(raw)?;
        if self.protect.is_match(&rel) {
            return Err(AgentDevError::ReservedPath(rel));
        }
        let abs = self.root.join(&rel);
        self.ensure_within_root(&rel, &abs)?;
        Ok((rel, abs))
    }

    /// Compare the deepest existing ancestor of `abs` against the root after
    /// resolving symlinks.
    fn ensure_within_root(&self, rel: &str, abs: &Path) -> Result<()> {
        if !self.fs.exists(&self.root) {
            return Ok(());
        }
        let Some(existing) = abs.ancestors().find(|p| self.fs.exists(p)) else {
            return Ok(());
        };
        let canonical_root = self.fs.canonicalize(&self.root)?;
        let canonical = self.fs.canonicalize(existing)?;
        if canonical.starts_with(&canonical_root) {
            Ok(())
        } else {
            Err(AgentDevError::PathEscapesRoot(rel.to_string()))
        }
    }

    /// Apply `files` in order under `work_unit_id`.
    ///
    /// Only an invalid work-unit id fails the whole call; every other problem
    /// is reported per file in the result.
    pub fn apply_batch(&mut self, files: &[FileRecord], work_unit_id: &str) -> Result<BatchResult> {
        validate_work_unit(work_unit_id)?;

        let mut result = BatchResult {
            work_unit_id: work_unit_id.to_string(),
            dry_run: self.options.dry_run,
            ..BatchResult::default()
        };

        for file in files {
            if let Err(failure) = self.apply_one(file, work_unit_id, &mut result) {
                warn!(
                    path = %failure.path,
                    work_unit = %work_unit_id,
                    kind = ?failure.kind,
                    error = %failure.error,
                    "file write failed"
                );
                result.failed.push(failure);
            }
        }

        info!(
            work_unit = %work_unit_id,
            succeeded = result.succeeded.len(),
            failed = result.failed.len(),
            backups = result.backups_created.len(),
            dry_run = result.dry_run,
            "batch applied"
        );
        Ok(result)
    }

    fn apply_one(
        &mut self,
        file: &FileRecord,
        work_unit_id: &str,
        result: &mut BatchResult,
    ) -> std::result::Result<(), FailedFile> {
        let (rel, abs) = self
            .resolve(&file.path)
            .map_err(|e| FailedFile::from_error(&file.path, &e))?;

        if let Some(limit) = self.options.max_file_size {
            let size = file.content.len() as u64;
            if size > limit {
                return Err(FailedFile::new(
                    &rel,
                    FailureKind::Config,
                    format!("content is {size} bytes, limit is {limit}"),
                ));
            }
        }

        let previous = if self.fs.exists(&abs) {
            if !self.fs.is_file(&abs) {
                return Err(FailedFile::new(&rel, FailureKind::Io, "target is not a regular file"));
            }
            let content = self
                .fs
                .read_to_string(&abs)
                .map_err(|e| FailedFile::new(&rel, FailureKind::Io, format!("{e:#}")))?;
            Some(content)
        } else {
            None
        };

        let diff = previous
            .as_deref()
            .map(|old| unified_diff(old, &file.content, &rel))
            .unwrap_or_default();
        result.diffs.insert(rel.clone(), diff);

        if self.options.dry_run {
            debug!(path = %rel, work_unit = %work_unit_id, "dry-run: would write file");
            result.succeeded.push(rel);
            return Ok(());
        }

        let now = Utc::now();
        let backup = match &previous {
            Some(old) => {
                let entry = self
                    .backups
                    .create(&rel, old, work_unit_id, now)
                    .map_err(|e| FailedFile::new(&rel, FailureKind::Io, e))?;
                Some(
                    relative_str(&self.root, &entry.location)
                        .unwrap_or_else(|| entry.location.display().to_string()),
                )
            }
            None => None,
        };

        self.write_atomic(&abs, &file.content)
            .map_err(|e| FailedFile::new(&rel, FailureKind::Io, e))?;

        self.history.record(
            &rel,
            WriteRecord {
                work_unit_id: work_unit_id.to_string(),
                timestamp: now,
                size: file.content.len(),
                created: previous.is_none(),
                hash: content_hash(&file.content),
            },
            self.options.history_cap,
        );

        if let Err(e) = self.history.save(self.fs.as_ref(), &self.history_path) {
            // The write cannot stay without its history entry.
            self.history.pop(&rel);
            let undo = match &previous {
                Some(old) => self.write_atomic(&abs, old),
                None => self.fs.remove_file(&abs).map_err(AgentDevError::from),
            };
            if let Err(undo_err) = undo {
                warn!(path = %rel, error = %undo_err, "failed to undo write after history save failure");
            }
            return Err(FailedFile::new(&rel, FailureKind::Io, format!("saving history: {e}")));
        }

        debug!(path = %rel, work_unit = %work_unit_id, created = previous.is_none(), "file written");
        result.backups_created.extend(backup);
        result.succeeded.push(rel);
        Ok(())
    }

    /// Write through a temporary sibling and rename it over the target.
    fn write_atomic(&self, target: &Path, content: &str) -> Result<()> {
        let name = target
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let tmp = target.with_file_name(format!(".{name}{TMP_SUFFIX}"));

        self.fs.write(&tmp, content.as_bytes())?;
        if let Err(e) = self.fs.rename(&tmp, target) {
            if let Err(cleanup) = self.fs.remove_file(&tmp) {
                debug!(tmp = ?tmp, error = %cleanup, "failed to remove temporary file");
            }
            return Err(e.into());
        }
        Ok(())
    }

    /// Undo every change made under `work_unit_id`.
    ///
    /// Each path the work unit overwrote gets the content from before the
    /// work unit's first write to it. Files the work unit created are
    /// removed when they still hold what the work unit wrote; otherwise they
    /// are left in place and reported as failed. History is not modified, so
    /// running this twice is harmless.
    pub fn rollback(&mut self, work_unit_id: &str) -> Result<RollbackResult> {
        validate_work_unit(work_unit_id)?;

        let mut result = RollbackResult {
            work_unit_id: work_unit_id.to_string(),
            dry_run: self.options.dry_run,
            ..RollbackResult::default()
        };

        let mut earliest: BTreeMap<String, BackupEntry> = BTreeMap::new();
        for entry in self.backups.for_work_unit(work_unit_id)? {
            earliest.entry(entry.name.path.clone()).or_insert(entry);
        }

        // A path the work unit created may also have a backup of the work
        // unit's own first write; removal wins over restoring that.
        let touches = self.history.touched_by(work_unit_id);
        let created: BTreeSet<&str> = touches
            .iter()
            .filter(|t| t.created)
            .map(|t| t.path.as_str())
            .collect();

        for (path, entry) in &earliest {
            if created.contains(path.as_str()) {
                continue;
            }
            match self.restore(path, entry) {
                Ok(()) => result.restored.push(path.clone()),
                Err(failure) => result.failed.push(failure),
            }
        }

        for touch in touches.iter().filter(|t| t.created) {
            match self.remove_created(&touch.path, &touch.last_hash) {
                Ok(true) => result.removed.push(touch.path.clone()),
                Ok(false) => {}
                Err(failure) => result.failed.push(failure),
            }
        }

        info!(
            work_unit = %work_unit_id,
            restored = result.restored.len(),
            removed = result.removed.len(),
            failed = result.failed.len(),
            dry_run = result.dry_run,
            "rollback finished"
        );
        Ok(result)
    }

    fn restore(&self, path: &str, entry: &BackupEntry) -> std::result::Result<(), FailedFile> {
        let rel = normalize_relative(path).map_err(|e| FailedFile::from_error(path, &e))?;
        let abs = self.root.join(&rel);
        if self.options.dry_run {
            debug!(path = %rel, backup = ?entry.location, "dry-run: would restore file");
            return Ok(());
        }
        let content = self
            .backups
            .read(entry)
            .map_err(|e| FailedFile::new(&rel, FailureKind::Io, e))?;
        self.write_atomic(&abs, &content)
            .map_err(|e| FailedFile::new(&rel, FailureKind::Io, e))?;
        debug!(path = %rel, backup = ?entry.location, "file restored");
        Ok(())
    }

    /// Returns whether the file was (or in dry-run would be) removed.
    fn remove_created(&self, path: &str, expected_hash: &str) -> std::result::Result<bool, FailedFile> {
        let abs = self.root.join(path);
        if !self.fs.exists(&abs) {
            return Ok(false);
        }
        let current = self
            .fs
            .read_to_string(&abs)
            .map_err(|e| FailedFile::new(path, FailureKind::Io, format!("{e:#}")))?;
        if content_hash(&current) != expected_hash {
            return Err(FailedFile::new(
                path,
                FailureKind::Io,
                "modified since the work unit created it; left in place",
            ));
        }
        if !self.options.dry_run {
            self.fs
                .remove_file(&abs)
                .map_err(|e| FailedFile::new(path, FailureKind::Io, format!("{e:#}")))?;
        }
        debug!(path = %path, dry_run = self.options.dry_run, "created file removed");
        Ok(true)
    }

    /// Write `contents` to `<root>/.agentdev/<name>`. A no-op in dry-run.
    pub fn write_state_file(&self, name: &str, contents: &str) -> Result<PathBuf> {
        let path = self.state_dir().join(name);
        if !self.options.dry_run {
            self.write_atomic(&path, contents)?;
        }
        Ok(path)
    }

    /// Every stored prior version of `path`, oldest first.
    pub fn versions(&self, path: &str) -> Result<Vec<BackupEntry>> {
        let rel = normalize_relative(path)?;
        self.backups.for_path(&rel)
    }

    pub fn read_backup(&self, entry: &BackupEntry) -> Result<String> {
        self.backups.read(entry)
    }
}

fn build_protect_set(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|e| {
            AgentDevError::ConfigError(format!("invalid protect pattern '{pattern}': {e}"))
        })?;
        builder.add(glob);
    }
    builder
        .build()
        .map_err(|e| AgentDevError::ConfigError(format!("building protect patterns: {e}")))
}
