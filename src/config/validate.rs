// src/config/validate.rs

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::dag::graph::find_cycle;
use crate::dag::task::check_id_charset;
use crate::errors::{AgentDevError, Result};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::AgentDevError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(
            raw.config,
            raw.files,
            raw.generator,
            raw.task,
        ))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    validate_global_config(cfg)?;
    validate_files_config(cfg)?;
    validate_generator_config(cfg)?;
    validate_tasks(cfg)?;
    validate_dag(cfg)?;
    Ok(())
}

fn validate_global_config(cfg: &RawConfigFile) -> Result<()> {
    if cfg.config.output_dir.trim().is_empty() {
        return Err(AgentDevError::ConfigError(
            "[config].output_dir must not be empty".to_string(),
        ));
    }
    if cfg.config.max_iterations == 0 {
        return Err(AgentDevError::ConfigError(
            "[config].max_iterations must be >= 1 (got 0)".to_string(),
        ));
    }
    if cfg.config.tasks_per_iteration == 0 {
        return Err(AgentDevError::ConfigError(
            "[config].tasks_per_iteration must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}

fn validate_files_config(cfg: &RawConfigFile) -> Result<()> {
    if cfg.files.history_cap == 0 {
        return Err(AgentDevError::ConfigError(
            "[files].history_cap must be >= 1 (got 0)".to_string(),
        ));
    }
    for pattern in &cfg.files.protect {
        globset::Glob::new(pattern).map_err(|e| {
            AgentDevError::ConfigError(format!("[files].protect: invalid glob '{pattern}': {e}"))
        })?;
    }
    Ok(())
}

fn validate_generator_config(cfg: &RawConfigFile) -> Result<()> {
    if cfg.generator.cmd.is_some() && cfg.generator.staging_dir.is_some() {
        return Err(AgentDevError::ConfigError(
            "[generator] accepts either `cmd` or `staging_dir`, not both".to_string(),
        ));
    }
    Ok(())
}

fn validate_tasks(cfg: &RawConfigFile) -> Result<()> {
    for (name, task) in cfg.task.iter() {
        check_id_charset(name)?;
        for dep in task.after.iter() {
            if dep == name {
                return Err(AgentDevError::SelfDependency(name.clone()));
            }
            if !cfg.task.contains_key(dep) {
                return Err(AgentDevError::UnknownDependency {
                    task: name.clone(),
                    dependency: dep.clone(),
                });
            }
        }
        if !task.estimated_effort.is_finite() || task.estimated_effort < 0.0 {
            return Err(AgentDevError::InvalidTask {
                task: name.clone(),
                reason: format!(
                    "estimated_effort must be a finite, non-negative number (got {})",
                    task.estimated_effort
                ),
            });
        }
    }
    Ok(())
}

fn validate_dag(cfg: &RawConfigFile) -> Result<()> {
    // Edge direction: dep -> task. For
    //   [task.B]
    //   after = ["A"]
    // we add edge A -> B.
    let edges = cfg
        .task
        .iter()
        .flat_map(|(name, task)| task.after.iter().map(move |dep| (dep.as_str(), name.as_str())));

    match find_cycle(cfg.task.keys().map(|s| s.as_str()), edges) {
        Some(cycle) => Err(AgentDevError::DagCycle(cycle)),
        None => Ok(()),
    }
}
