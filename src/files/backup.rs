// src/files/backup.rs

//! Immutable copies of file content taken before an overwrite.
//!
//! Each backup is a single file under the backup directory named
//!
//! `<relative path>.<stamp>[-<n>].<work unit>.bak`
//!
//! where `<stamp>` is the UTC time as `%Y%m%dT%H%M%S%6fZ`. The `-<n>` suffix
//! only appears when a name is already taken, so an existing backup is never
//! overwritten.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, warn};

use crate::errors::{AgentDevError, Result};
use crate::files::paths::relative_str;
use crate::fs::FileSystem;

pub const BACKUP_EXTENSION: &str = ".bak";

const STAMP_FORMAT: &str = "%Y%m%dT%H%M%S%6fZ";
const STAMP_LEN: usize = 22;

/// Work-unit ids end up in file names, so they are restricted to
/// `[A-Za-z0-9_-]+`.
pub fn validate_work_unit(id: &str) -> Result<()> {
    let valid = !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(AgentDevError::InvalidWorkUnit(id.to_string()))
    }
}

pub fn format_stamp(ts: DateTime<Utc>) -> String {
    ts.format(STAMP_FORMAT).to_string()
}

/// Parsed backup file name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackupName {
    /// Logical path of the backed-up file, relative to the managed root.
    pub path: String,
    pub stamp: String,
    /// Collision counter; 0 for the first backup with a given stamp.
    pub seq: u32,
    pub work_unit_id: String,
}

impl BackupName {
    /// File name relative to the backup directory.
    pub fn to_relative(&self) -> String {
        let stamp = match self.seq {
            0 => self.stamp.clone(),
            n => format!("{}-{}", self.stamp, n),
        };
        format!(
            "{}.{}.{}{}",
            self.path, stamp, self.work_unit_id, BACKUP_EXTENSION
        )
    }

    pub fn parse(relative: &str) -> Option<Self> {
        let rest = relative.strip_suffix(BACKUP_EXTENSION)?;
        let (rest, work_unit_id) = rest.rsplit_once('.')?;
        validate_work_unit(work_unit_id).ok()?;
        let (path, stamp_field) = rest.rsplit_once('.')?;

        let (stamp, seq) = match stamp_field.split_once('-') {
            Some((stamp, seq)) => (stamp, seq.parse().ok()?),
            None => (stamp_field, 0),
        };
        if path.is_empty() || !is_stamp(stamp) {
            return None;
        }

        Some(Self {
            path: path.to_string(),
            stamp: stamp.to_string(),
            seq,
            work_unit_id: work_unit_id.to_string(),
        })
    }

    /// Chronological ordering key.
    pub fn order_key(&self) -> (&str, u32) {
        (&self.stamp, self.seq)
    }
}

fn is_stamp(s: &str) -> bool {
    s.len() == STAMP_LEN
        && s.char_indices().all(|(i, c)| match i {
            8 => c == 'T',
            21 => c == 'Z',
            _ => c.is_ascii_digit(),
        })
}

/// A backup present on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackupEntry {
    pub name: BackupName,
    pub location: PathBuf,
}

/// Creates and enumerates backups under one directory.
#[derive(Debug, Clone)]
pub struct BackupStore {
    fs: Arc<dyn FileSystem>,
    dir: PathBuf,
}

impl BackupStore {
    pub fn new(fs: Arc<dyn FileSystem>, dir: PathBuf) -> Self {
        Self { fs, dir }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Store `content` as the prior version of `path`.
    pub fn create(
        &self,
        path: &str,
        content: &str,
        work_unit_id: &str,
        now: DateTime<Utc>,
    ) -> Result<BackupEntry> {
        validate_work_unit(work_unit_id)?;

        let mut name = BackupName {
            path: path.to_string(),
            stamp: format_stamp(now),
            seq: 0,
            work_unit_id: work_unit_id.to_string(),
        };
        let mut location = self.dir.join(name.to_relative());
        while self.fs.exists(&location) {
            name.seq += 1;
            location = self.dir.join(name.to_relative());
        }

        self.fs
            .write(&location, content.as_bytes())
            .with_context(|| format!("creating backup of '{path}'"))?;
        debug!(path = %path, backup = ?location, work_unit = %work_unit_id, "backup created");

        Ok(BackupEntry { name, location })
    }

    pub fn read(&self, entry: &BackupEntry) -> Result<String> {
        Ok(self.fs.read_to_string(&entry.location)?)
    }

    /// Every backup on disk, oldest first.
    pub fn list(&self) -> Result<Vec<BackupEntry>> {
        let mut entries = Vec::new();
        if !self.fs.is_dir(&self.dir) {
            return Ok(entries);
        }

        let mut stack = vec![self.dir.clone()];
        while let Some(dir) = stack.pop() {
            for child in self.fs.read_dir(&dir)? {
                if self.fs.is_dir(&child) {
                    stack.push(child);
                    continue;
                }
                let Some(relative) = relative_str(&self.dir, &child) else {
                    continue;
                };
                match BackupName::parse(&relative) {
                    Some(name) => entries.push(BackupEntry {
                        name,
                        location: child,
                    }),
                    None => warn!(file = ?child, "ignoring unrecognised file in backup directory"),
                }
            }
        }

        entries.sort_by(|a, b| {
            a.name
                .order_key()
                .cmp(&b.name.order_key())
                .then_with(|| a.name.path.cmp(&b.name.path))
        });
        Ok(entries)
    }

    /// Backups tagged with `work_unit_id`, oldest first.
    pub fn for_work_unit(&self, work_unit_id: &str) -> Result<Vec<BackupEntry>> {
        Ok(self
            .list()?
            .into_iter()
            .filter(|e| e.name.work_unit_id == work_unit_id)
            .collect())
    }

    /// Every stored prior version of `path`, oldest first.
    pub fn for_path(&self, path: &str) -> Result<Vec<BackupEntry>> {
        Ok(self
            .list()?
            .into_iter()
            .filter(|e| e.name.path == path)
            .collect())
    }
}
