//! Settings file model.

use std::path::{Path, PathBuf};

use cps_common::Layout;
use serde::{Deserialize, Serialize};

use crate::resolve::{resolve_config, ConfigSource};
use crate::validate::{validate_settings, ValidationError, ValidationResult};

/// Contents of `cps.json`.
///
/// Every field is optional in the file; missing fields take the defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub schema_version: String,

    /// Capacities simulated by `analyze` when none are given on the command line.
    pub capacities: Vec<f64>,

    /// Default CDR layout hint for `count` and `detect`.
    pub layout: Layout,

    /// Default explicit start column (name or 1-based number).
    pub start_column: Option<String>,

    /// Header names tried after the built-in start-time aliases.
    pub extra_start_aliases: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            schema_version: crate::CONFIG_SCHEMA_VERSION.to_string(),
            capacities: Vec::new(),
            layout: Layout::Auto,
            start_column: None,
            extra_start_aliases: Vec::new(),
        }
    }
}

impl Settings {
    /// Read and parse a settings file without semantic validation.
    pub fn from_file(path: &Path) -> ValidationResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ValidationError::IoError {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        serde_json::from_str(&content).map_err(|e| ValidationError::ParseError {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }
}

/// Settings with provenance information.
#[derive(Debug, Clone)]
pub struct LoadedSettings {
    pub settings: Settings,
    /// Path the settings came from (None if using defaults).
    pub path: Option<PathBuf>,
    pub source: ConfigSource,
}

/// Resolve, load and validate settings.
pub fn load_settings(cli_path: Option<&Path>) -> ValidationResult<LoadedSettings> {
    let resolved = resolve_config(cli_path);

    let settings = match &resolved.path {
        Some(path) => Settings::from_file(path)?,
        None => Settings::default(),
    };
    validate_settings(&settings)?;

    Ok(LoadedSettings {
        settings,
        path: resolved.path,
        source: resolved.source,
    })
}
