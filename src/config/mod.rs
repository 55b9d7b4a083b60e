// src/config/mod.rs

//! Configuration loading and validation for rigwatch.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`), including the
//!   [`WorkloadConfig`] handed to an adapter on every `start`.
//! - Load a config file from disk (`loader.rs`).
//! - Validate basic invariants like a usable pool endpoint (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path};
pub use model::{
    AdapterSection, ConfigFile, RawConfigFile, SettingValue, WorkloadConfig, WorkloadSettings,
};
pub use validate::validate_workload;
