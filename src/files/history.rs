// src/files/history.rs

//! Append-only per-path write history, persisted as JSON.

use std::collections::BTreeMap;
use std::path::Path;

use blake3::Hasher;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::{AgentDevError, Result};
use crate::fs::FileSystem;

/// File name of the history inside the state directory.
pub const HISTORY_FILE: &str = "history.json";

/// blake3 hex digest of written content.
pub fn content_hash(content: &str) -> String {
    let mut hasher = Hasher::new();
    hasher.update(content.as_bytes());
    hasher.finalize().to_hex().to_string()
}

/// One committed write of a path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteRecord {
    pub work_unit_id: String,
    pub timestamp: DateTime<Utc>,
    /// Bytes written.
    pub size: usize,
    /// The path did not exist before this record's work unit first wrote
    /// it. Survives eviction of that first record.
    #[serde(default)]
    pub created: bool,
    #[serde(default)]
    pub hash: String,
}

/// What one work unit did to one path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkUnitTouch {
    pub path: String,
    /// The work unit's first write to the path created it.
    pub created: bool,
    /// Hash of the work unit's last write to the path.
    pub last_hash: String,
}

/// Ordered write records per logical path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileHistory {
    entries: BTreeMap<String, Vec<WriteRecord>>,
}

impl FileHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the history file; a missing file is an empty history.
    pub fn load(fs: &dyn FileSystem, path: &Path) -> Result<Self> {
        if !fs.exists(path) {
            return Ok(Self::new());
        }
        let contents = fs.read_to_string(path)?;
        serde_json::from_str(&contents).map_err(|e| AgentDevError::HistoryCorrupt {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
    }

    /// Persist via a sibling temporary file and rename.
    pub fn save(&self, fs: &dyn FileSystem, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        let tmp = path.with_extension("json.tmp");
        fs.write(&tmp, json.as_bytes())?;
        fs.rename(&tmp, path)?;
        debug!(paths = self.entries.len(), file = ?path, "history saved");
        Ok(())
    }

    /// Append a record, keeping at most `cap` records for the path.
    pub fn record(&mut self, path: &str, record: WriteRecord, cap: Option<usize>) {
        let records = self.entries.entry(path.to_string()).or_default();
        records.push(record);
        if let Some(cap) = cap {
            while records.len() > cap.max(1) {
                let evicted = records.remove(0);
                // Rollback needs to know the work unit created the path.
                if let Some(next) = records.first_mut() {
                    if evicted.created && next.work_unit_id == evicted.work_unit_id {
                        next.created = true;
                    }
                }
            }
        }
    }

    /// Drop the most recent record of `path` (used to undo a write that
    /// could not be persisted).
    pub(crate) fn pop(&mut self, path: &str) {
        if let Some(records) = self.entries.get_mut(path) {
            records.pop();
            if records.is_empty() {
                self.entries.remove(path);
            }
        }
    }

    pub fn records_for(&self, path: &str) -> &[WriteRecord] {
        self.entries.get(path).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Paths written by `work_unit_id`, ordered by path.
    pub fn touched_by(&self, work_unit_id: &str) -> Vec<WorkUnitTouch> {
        self.entries
            .iter()
            .filter_map(|(path, records)| {
                let mut mine = records.iter().filter(|r| r.work_unit_id == work_unit_id);
                let first = mine.next()?;
                let last = mine.last().unwrap_or(first);
                Some(WorkUnitTouch {
                    path: path.clone(),
                    created: first.created,
                    last_hash: last.hash.clone(),
                })
            })
            .collect()
    }
}
