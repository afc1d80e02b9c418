// src/lib.rs

pub mod cli;
pub mod collab;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod files;
pub mod fs;
pub mod logging;
pub mod types;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use tracing::{info, warn};

use crate::cli::CliArgs;
use crate::collab::{CommandGenerator, Generator, StagedGenerator, parse_task_records};
use crate::config::loader::{load_and_validate, resolve_output_dir};
use crate::config::{ConfigFile, RawConfigFile};
use crate::dag::{Scheduler, Task};
use crate::engine::{Pipeline, PipelineOptions, RunReport};
use crate::files::{FileManager, FileManagerOptions, RollbackResult};
use crate::fs::{FileSystem, RealFileSystem};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading (plus an optional JSON task list)
/// - the scheduler
/// - the file manager over the configured output directory
/// - the generator backend and the pipeline loop
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = PathBuf::from(&args.config);
    let mut cfg = load_config(&config_path, args.tasks_json.is_some())?;
    if args.dry_run {
        cfg.config.dry_run = true;
    }

    let scheduler = build_scheduler(&cfg, args.tasks_json.as_deref())?;

    if args.plan {
        print_plan(&scheduler);
        return Ok(());
    }

    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
    let root = resolve_output_dir(&config_path, &cfg);
    let mut files = FileManager::open(fs.clone(), &root, FileManagerOptions::from_config(&cfg))
        .with_context(|| format!("opening output directory {:?}", root))?;

    if let Some(work_unit) = args.rollback.as_deref() {
        let result = files.rollback(work_unit)?;
        print_rollback(&result);
        return Ok(());
    }

    let options = PipelineOptions::from_config(&cfg);
    let base = config_root_dir(&config_path);
    let staging = args.staging.as_deref().or(cfg.generator.staging_dir.as_deref());

    let report = match (staging, cfg.generator.cmd.as_deref()) {
        (Some(dir), _) => {
            let generator = StagedGenerator::new(fs, base.join(dir));
            drive(scheduler, files, generator, options).await?
        }
        (None, Some(cmd)) => {
            let generator = CommandGenerator::new(cmd).with_workdir(base);
            drive(scheduler, files, generator, options).await?
        }
        (None, None) => bail!(
            "no generator configured: set [generator].cmd or [generator].staging_dir, or pass --staging"
        ),
    };

    if !report.is_complete() {
        warn!(
            completed = report.count(crate::types::TaskStatus::Completed),
            total = report.total_tasks,
            "not every task completed"
        );
    }
    Ok(())
}

async fn drive<G: Generator>(
    scheduler: Scheduler,
    files: FileManager,
    generator: G,
    options: PipelineOptions,
) -> Result<RunReport> {
    let mut pipeline = Pipeline::new(scheduler, files, generator, options);
    Ok(pipeline.run().await?)
}

/// Load the config file. When tasks come from a JSON list the file is
/// optional and defaults apply.
fn load_config(path: &Path, tasks_from_json: bool) -> Result<ConfigFile> {
    if tasks_from_json && !path.exists() {
        info!(config = ?path, "no config file; using defaults");
        return Ok(ConfigFile::try_from(RawConfigFile::default())?);
    }
    load_and_validate(path).with_context(|| format!("loading config {:?}", path))
}

fn build_scheduler(cfg: &ConfigFile, tasks_json: Option<&str>) -> Result<Scheduler> {
    let scheduler = match tasks_json {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("reading task list {path:?}"))?;
            let records = parse_task_records(&raw)
                .with_context(|| format!("parsing task list {path:?}"))?;
            let mut scheduler = Scheduler::new();
            scheduler.add_tasks(records.into_iter().map(Task::from).collect())?;
            scheduler
        }
        None => Scheduler::from_config(cfg)?,
    };

    if scheduler.is_empty() {
        bail!("no tasks defined: add [task.<id>] sections or pass --tasks-json");
    }
    Ok(scheduler)
}

/// Directory relative paths in the config are resolved against.
///
/// A bare file name like "agentdev.toml" (parent = "") falls back to the
/// current working directory.
fn config_root_dir(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}

fn print_plan(scheduler: &Scheduler) {
    println!("agentdev plan");
    println!();

    println!("tasks ({}):", scheduler.len());
    for task in scheduler.tasks() {
        println!("  - {} [{}]", task.id(), task.status());
        if !task.description().is_empty() {
            println!("      description: {}", task.description());
        }
        println!(
            "      priority: {}, effort: {}, kind: {:?}",
            task.priority(),
            task.estimated_effort(),
            task.payload().kind
        );
        if !task.dependencies().is_empty() {
            println!("      after: {:?}", task.dependencies());
        }
        if !task.payload().target_files.is_empty() {
            println!("      target_files: {:?}", task.payload().target_files);
        }
    }
    println!();

    let ready: Vec<String> = scheduler
        .get_ready_tasks()
        .iter()
        .map(|t| t.id().to_string())
        .collect();
    println!("roots: {}", scheduler.graph().roots().join(", "));
    println!("ready: {}", ready.join(", "));

    let path = scheduler.critical_path();
    let effort: f64 = path.iter().map(Task::estimated_effort).sum();
    let ids: Vec<&str> = path.iter().map(Task::id).collect();
    println!("critical path ({effort}): {}", ids.join(" -> "));
}

fn print_rollback(result: &RollbackResult) {
    let mode = if result.dry_run { " (dry-run)" } else { "" };
    println!("rollback of {}{mode}", result.work_unit_id);
    for path in &result.restored {
        println!("  restored {path}");
    }
    for path in &result.removed {
        println!("  removed  {path}");
    }
    for failure in &result.failed {
        println!("  FAILED   {}: {}", failure.path, failure.error);
    }
}
