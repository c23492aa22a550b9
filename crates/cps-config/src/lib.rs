//! CDR CPS settings loading and validation.
//!
//! This crate provides:
//! - A typed Rust struct for the optional `cps.json` settings file
//! - Settings resolution (CLI → env → XDG → defaults)
//! - Semantic validation

pub mod resolve;
pub mod settings;
pub mod validate;

pub use resolve::{resolve_config, ConfigPath, ConfigSource};
pub use settings::{load_settings, LoadedSettings, Settings};
pub use validate::{validate_settings, ValidationError, ValidationResult};

/// Schema version for settings files.
pub const CONFIG_SCHEMA_VERSION: &str = "1.0.0";
