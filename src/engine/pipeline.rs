// src/engine/pipeline.rs

use std::collections::BTreeMap;
use std::fmt;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::config::ConfigFile;
use crate::collab::Generator;
use crate::dag::{Scheduler, Task, TaskId};
use crate::engine::report::{REPORT_FILE, RunReport, TaskRun};
use crate::errors::Result;
use crate::files::FileManager;
use crate::types::TaskStatus;

/// Loop bounds and failure policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineOptions {
    pub max_iterations: usize,
    pub tasks_per_iteration: usize,
    /// Extra attempts for a failed task.
    pub max_retries: u32,
    pub rollback_on_failure: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            tasks_per_iteration: 3,
            max_retries: 0,
            rollback_on_failure: true,
        }
    }
}

impl PipelineOptions {
    pub fn from_config(cfg: &ConfigFile) -> Self {
        Self {
            max_iterations: cfg.config.max_iterations,
            tasks_per_iteration: cfg.config.tasks_per_iteration,
            max_retries: cfg.config.max_retries,
            rollback_on_failure: cfg.config.rollback_on_failure,
        }
    }
}

/// Drives tasks from ready to completed: generate, apply the batch under the
/// task's id, then record the outcome.
///
/// The scheduler and file manager are owned exclusively, so every status
/// change and every batch happens from this one loop.
pub struct Pipeline<G: Generator> {
    scheduler: Scheduler,
    files: FileManager,
    generator: G,
    options: PipelineOptions,
    runs: BTreeMap<TaskId, TaskRun>,
}

impl<G: Generator> fmt::Debug for Pipeline<G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("scheduler", &self.scheduler)
            .field("files", &self.files)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl<G: Generator> Pipeline<G> {
    pub fn new(scheduler: Scheduler, files: FileManager, generator: G, options: PipelineOptions) -> Self {
        Self {
            scheduler,
            files,
            generator,
            options,
            runs: BTreeMap::new(),
        }
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn files(&self) -> &FileManager {
        &self.files
    }

    pub fn generator(&self) -> &G {
        &self.generator
    }

    /// Run until nothing is ready or the iteration bound is hit.
    pub async fn run(&mut self) -> Result<RunReport> {
        let started_at = Utc::now();
        info!(
            tasks = self.scheduler.len(),
            max_iterations = self.options.max_iterations,
            tasks_per_iteration = self.options.tasks_per_iteration,
            dry_run = self.files.is_dry_run(),
            "pipeline started"
        );

        let mut iterations = 0;
        while iterations < self.options.max_iterations {
            let mut batch = self.next_batch();
            if batch.is_empty() {
                self.scheduler.recompute_blocked();
                batch = self.next_batch();
                if batch.is_empty() {
                    debug!("no ready tasks left");
                    break;
                }
            }

            iterations += 1;
            let ids: Vec<&str> = batch.iter().map(Task::id).collect();
            info!(iteration = iterations, tasks = ?ids, "processing tasks");

            for task in &batch {
                self.process(task).await;
            }
        }

        if iterations == self.options.max_iterations && !self.next_batch().is_empty() {
            warn!(iterations, "iteration limit reached with tasks still ready");
        }

        let report = RunReport::build(
            &self.scheduler,
            started_at,
            self.files.is_dry_run(),
            iterations,
            self.runs.clone(),
        );
        report.log();

        let json = serde_json::to_string_pretty(&report)?;
        let path = self.files.write_state_file(REPORT_FILE, &json)?;
        if !self.files.is_dry_run() {
            info!(report = ?path, "run report written");
        }
        Ok(report)
    }

    /// Ready tasks first, then failed tasks with retries left, bounded by
    /// `tasks_per_iteration`.
    fn next_batch(&self) -> Vec<Task> {
        let mut batch = self.scheduler.get_ready_tasks();

        let mut retryable: Vec<Task> = self
            .scheduler
            .tasks()
            .filter(|t| t.status() == TaskStatus::Failed)
            .filter(|t| {
                let attempts = self.runs.get(t.id()).map_or(0, |r| r.attempts);
                attempts <= self.options.max_retries
            })
            .cloned()
            .collect();
        retryable.sort_by(|a, b| a.priority().cmp(&b.priority()).then_with(|| a.id().cmp(b.id())));

        batch.extend(retryable);
        batch.truncate(self.options.tasks_per_iteration);
        batch
    }

    async fn process(&mut self, task: &Task) {
        let id = task.id().to_string();
        if !self.scheduler.update_status(&id, TaskStatus::InProgress) {
            warn!(task = %id, status = %task.status(), "task could not be started; skipping");
            return;
        }

        let run = self.runs.entry(id.clone()).or_default();
        run.attempts += 1;
        let attempt = run.attempts;
        info!(task = %id, attempt, "task started");

        let files = match self.generator.generate(task).await {
            Ok(files) => files,
            Err(e) => {
                warn!(task = %id, error = %e, "generation failed");
                self.fail(&id, e.to_string(), false);
                return;
            }
        };

        let batch = match self.files.apply_batch(&files, &id) {
            Ok(batch) => batch,
            Err(e) => {
                warn!(task = %id, error = %e, "batch rejected");
                self.fail(&id, e.to_string(), false);
                return;
            }
        };

        let run = self.runs.entry(id.clone()).or_default();
        run.files_written += batch.succeeded.len();
        run.files_failed += batch.failed.len();

        if batch.is_success() {
            self.scheduler.update_status(&id, TaskStatus::Completed);
            info!(task = %id, files = batch.succeeded.len(), "task completed");
            return;
        }

        let reason = batch
            .failed
            .iter()
            .map(|f| format!("{}: {}", f.path, f.error))
            .collect::<Vec<_>>()
            .join("; ");
        let rollback = self.options.rollback_on_failure && !batch.succeeded.is_empty();
        self.fail(&id, reason, rollback);
    }

    fn fail(&mut self, id: &str, reason: String, rollback: bool) {
        self.scheduler.update_status(id, TaskStatus::Failed);

        let downstream = self.scheduler.blocked_downstream_of(id);
        if !downstream.is_empty() {
            warn!(task = %id, waiting = ?downstream, "task failed; dependents keep waiting");
        }

        let mut rolled_back = false;
        if rollback {
            match self.files.rollback(id) {
                Ok(result) => {
                    rolled_back = result.is_success();
                    for failure in &result.failed {
                        warn!(task = %id, path = %failure.path, error = %failure.error, "rollback could not restore file");
                    }
                }
                Err(e) => warn!(task = %id, error = %e, "rollback failed"),
            }
        }

        let run = self.runs.entry(id.to_string()).or_default();
        run.last_error = Some(reason);
        run.rolled_back |= rolled_back;
    }
}
