#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use agentdev::collab::FileRecord;
use agentdev::files::{FileManager, FileManagerOptions};
use agentdev::fs::mock::MockFileSystem;

pub use agentdev_test_utils::init_tracing;

/// Managed root used with the in-memory filesystem.
pub const ROOT: &str = "/work/out";

pub fn root() -> PathBuf {
    PathBuf::from(ROOT)
}

pub fn at_root(rel: &str) -> PathBuf {
    root().join(rel)
}

/// A file manager over a fresh mock filesystem.
pub fn mock_manager(options: FileManagerOptions) -> (MockFileSystem, FileManager) {
    let fs = MockFileSystem::new();
    let manager = FileManager::open(Arc::new(fs.clone()), root(), options)
        .expect("open file manager");
    (fs, manager)
}

pub fn file(path: &str, content: &str) -> FileRecord {
    FileRecord::new(path, content)
}

pub fn read(fs: &MockFileSystem, rel: &str) -> Option<String> {
    fs.file_contents(at_root(rel))
        .map(|bytes| String::from_utf8(bytes).expect("utf-8"))
}
