//! CDR table layout hints.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// How the caller says the start date/time column should be located.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layout {
    /// Autodetect header presence and the start column.
    #[default]
    Auto,

    /// The table has a header row; the column is given by name.
    Header,

    /// The table has no header row; the column is given by 1-based position.
    Positional,
}

impl std::fmt::Display for Layout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Layout::Auto => write!(f, "auto"),
            Layout::Header => write!(f, "header"),
            Layout::Positional => write!(f, "positional"),
        }
    }
}
