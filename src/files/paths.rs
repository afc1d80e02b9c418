// src/files/paths.rs

//! Resolution of producer-supplied paths under the managed root.

use std::path::Path;

use crate::errors::{AgentDevError, Result};

/// Directory under the managed root holding engine state (history, backups).
pub const STATE_DIR: &str = ".agentdev";

const UNSAFE_CHARS: [char; 8] = ['<', '>', ':', '"', '|', '?', '*', '\0'];

const RESERVED_NAMES: [&str; 22] = [
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

/// Normalise a relative path lexically, returning it with `/` separators.
///
/// Rejects absolute paths and any `..` that climbs above the root, as well
/// as empty paths, paths into [`STATE_DIR`], unsafe characters and reserved
/// device names. `a/./b/../c` becomes `a/c`.
pub fn normalize_relative(raw: &str) -> Result<String> {
    let unified = raw.replace('\\', "/");

    if unified.starts_with('/') || has_drive_prefix(&unified) {
        return Err(AgentDevError::PathEscapesRoot(raw.to_string()));
    }

    let mut parts: Vec<&str> = Vec::new();
    for part in unified.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                if parts.pop().is_none() {
                    return Err(AgentDevError::PathEscapesRoot(raw.to_string()));
                }
            }
            name => parts.push(name),
        }
    }

    if parts.is_empty() || parts[0] == STATE_DIR {
        return Err(AgentDevError::ReservedPath(raw.to_string()));
    }

    for part in &parts {
        if part.chars().any(|c| UNSAFE_CHARS.contains(&c) || c.is_control()) {
            return Err(AgentDevError::ReservedPath(raw.to_string()));
        }
        let stem = part.split('.').next().unwrap_or(part).to_ascii_uppercase();
        if RESERVED_NAMES.contains(&stem.as_str()) {
            return Err(AgentDevError::ReservedPath(raw.to_string()));
        }
    }

    Ok(parts.join("/"))
}

fn has_drive_prefix(path: &str) -> bool {
    let bytes = path.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

/// `path` relative to `root` with forward slashes, if it lies under it.
pub fn relative_str(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let parts: Vec<String> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    Some(parts.join("/"))
}
