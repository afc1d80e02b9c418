// src/engine/mod.rs

//! Driver loop for agentdev.
//!
//! [`pipeline`] repeatedly takes ready tasks from the scheduler, asks the
//! generator for their files and applies them through the file manager.
//! [`report`] summarises the run.

pub mod pipeline;
pub mod report;

pub use pipeline::{Pipeline, PipelineOptions};
pub use report::{REPORT_FILE, RunReport, TaskRun};
