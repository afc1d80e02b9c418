// src/config/mod.rs

//! Configuration loading and validation for agentdev.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate invariants like DAG correctness (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, load_from_path};
pub use model::{
    ConfigFile, ConfigSection, FilesSection, GeneratorSection, RawConfigFile, TaskConfig,
};
