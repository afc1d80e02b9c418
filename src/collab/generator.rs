// src/collab/generator.rs

//! Pluggable code-generation backends.
//!
//! The pipeline talks to a [`Generator`] instead of a concrete collaborator,
//! so tests can swap in a fake while production uses either an external
//! command or a directory of pre-generated files.

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::process::Stdio;
use std::sync::Arc;

use anyhow::{Context, anyhow};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::collab::records::{FileRecord, TaskRecord, parse_file_records};
use crate::dag::Task;
use crate::errors::{AgentDevError, Result};
use crate::files::paths::relative_str;
use crate::fs::FileSystem;

pub type GenerateFuture<'a> = Pin<Box<dyn Future<Output = Result<Vec<FileRecord>>> + Send + 'a>>;

/// Produces the files for one task.
pub trait Generator: Send {
    fn generate<'a>(&'a mut self, task: &'a Task) -> GenerateFuture<'a>;
}

/// Runs a shell command per task.
///
/// The task is written as a JSON [`TaskRecord`] to the command's stdin; the
/// command prints a JSON array of [`FileRecord`]s on stdout.
#[derive(Debug, Clone)]
pub struct CommandGenerator {
    cmd: String,
    workdir: Option<PathBuf>,
}

impl CommandGenerator {
    pub fn new(cmd: impl Into<String>) -> Self {
        Self {
            cmd: cmd.into(),
            workdir: None,
        }
    }

    pub fn with_workdir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.workdir = Some(dir.into());
        self
    }

    async fn run(&self, task: &Task) -> Result<Vec<FileRecord>> {
        info!(task = %task.id(), cmd = %self.cmd, "running generator");

        let payload = serde_json::to_vec(&TaskRecord::from(task))?;

        let mut cmd = if cfg!(windows) {
            let mut c = Command::new("cmd");
            c.arg("/C").arg(&self.cmd);
            c
        } else {
            let mut c = Command::new("sh");
            c.arg("-c").arg(&self.cmd);
            c
        };
        if let Some(dir) = &self.workdir {
            cmd.current_dir(dir);
        }
        cmd.env("AGENTDEV_TASK_ID", task.id())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd
            .spawn()
            .with_context(|| format!("spawning generator for task '{}'", task.id()))?;

        // Feed stdin concurrently so a chatty child cannot deadlock on a full
        // stdout pipe.
        if let Some(mut stdin) = child.stdin.take() {
            let task_id = task.id().to_string();
            tokio::spawn(async move {
                if let Err(e) = stdin.write_all(&payload).await {
                    warn!(task = %task_id, error = %e, "failed to write task to generator stdin");
                }
            });
        }

        let output = child
            .wait_with_output()
            .await
            .with_context(|| format!("waiting for generator of task '{}'", task.id()))?;

        for line in String::from_utf8_lossy(&output.stderr).lines() {
            debug!(task = %task.id(), "generator stderr: {}", line);
        }

        if !output.status.success() {
            let code = output.status.code().unwrap_or(-1);
            return Err(AgentDevError::Other(anyhow!(
                "generator for task '{}' exited with code {}",
                task.id(),
                code
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let files = parse_file_records(&stdout).map_err(anyhow::Error::new)?;
        info!(task = %task.id(), files = files.len(), "generator finished");
        Ok(files)
    }
}

impl Generator for CommandGenerator {
    fn generate<'a>(&'a mut self, task: &'a Task) -> GenerateFuture<'a> {
        Box::pin(self.run(task))
    }
}

/// Serves pre-generated files from `<dir>/<task id>/**`.
///
/// A task without a staging directory produces no files.
#[derive(Debug, Clone)]
pub struct StagedGenerator {
    fs: Arc<dyn FileSystem>,
    dir: PathBuf,
}

impl StagedGenerator {
    pub fn new(fs: Arc<dyn FileSystem>, dir: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            dir: dir.into(),
        }
    }

    fn collect(&self, task: &Task) -> Result<Vec<FileRecord>> {
        let task_dir = self.dir.join(task.id());
        if !self.fs.is_dir(&task_dir) {
            warn!(task = %task.id(), dir = ?task_dir, "no staged files for task");
            return Ok(Vec::new());
        }

        let mut files = Vec::new();
        let mut stack = vec![task_dir.clone()];
        while let Some(dir) = stack.pop() {
            for child in self.fs.read_dir(&dir)? {
                if self.fs.is_dir(&child) {
                    stack.push(child);
                    continue;
                }
                let Some(path) = relative_str(&task_dir, &child) else {
                    continue;
                };
                let content = self.fs.read_to_string(&child)?;
                files.push(FileRecord { path, content });
            }
        }

        files.sort_by(|a, b| a.path.cmp(&b.path));
        debug!(task = %task.id(), files = files.len(), "collected staged files");
        Ok(files)
    }
}

impl Generator for StagedGenerator {
    fn generate<'a>(&'a mut self, task: &'a Task) -> GenerateFuture<'a> {
        let result = self.collect(task);
        Box::pin(async move { result })
    }
}
