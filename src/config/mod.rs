// src/config/mod.rs

//! Configuration for asyncrun.
//!
//! Responsibilities:
//! - Define the typed option set and its merge rules (`model.rs`).
//! - Load an optional TOML file from disk (`loader.rs`).
//! - Validate runner settings (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, load_from_path, resolve_config};
pub use model::{
    ConfigFile, ExitCallback, OptionOverrides, RawConfigFile, ResolvedOptions, RunnerSection,
};
