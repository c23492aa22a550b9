//! Error types for the CDR CPS tools.
//!
//! This module provides structured error handling with:
//! - Stable error codes for machine parsing
//! - Category classification matching the pipeline stages
//! - Remediation suggestions for humans
//!
//! Every error is terminal for the run. The tools work over a closed,
//! already-captured dataset, so the only recovery is to correct the input
//! or configuration and run again.
//!
//! # Human-Facing Output
//!
//! ```text
//! ✗ Row Parse Error
//!   Reason: problem parsing line 17 (column DateCreated): ...
//!   Fix: Check the offending row in the CDR file ...
//! ```
//!
//! # Agent-Facing Output
//!
//! ```json
//! {
//!   "code": 20,
//!   "category": "row_parse",
//!   "message": "problem parsing line 17 ...",
//!   "recoverable": false,
//!   "context": { "line": 17, "row": "..." }
//! }
//! ```

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Result type alias for CDR CPS operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error categories for grouping related errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// The CDR table layout could not be determined or contradicts the caller.
    Format,
    /// A kept row failed to parse.
    RowParse,
    /// The analysis window is empty, inverted or has no events.
    Window,
    /// Invalid queue simulation input.
    Simulation,
    /// Settings file errors.
    Config,
    /// File I/O and serialization errors.
    Io,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCategory::Format => write!(f, "format"),
            ErrorCategory::RowParse => write!(f, "row_parse"),
            ErrorCategory::Window => write!(f, "window"),
            ErrorCategory::Simulation => write!(f, "simulation"),
            ErrorCategory::Config => write!(f, "config"),
            ErrorCategory::Io => write!(f, "io"),
        }
    }
}

/// Unified error type for the CDR CPS tools.
#[derive(Error, Debug)]
pub enum Error {
    // Format errors (10-19)
    #[error("CDR file is empty")]
    EmptySource,

    #[error("CDR file has a header row but contains no call records")]
    NoDataRows,

    #[error("CDR file contains no recognizable call records: no column on line {line} is a date/time")]
    NoTimestampColumn { line: u64 },

    #[error("no such column '{column}' in the CDR file")]
    UnknownColumn { column: String },

    #[error("column {column} does not contain date/time values")]
    ColumnNotTimestamp { column: String },

    #[error("CDR layout mismatch: {0}")]
    LayoutMismatch(String),

    // Row parse errors (20-29)
    #[error("problem parsing line {line} ({field}): {reason}")]
    RowParse {
        line: u64,
        field: String,
        reason: String,
        row: String,
    },

    // Window errors (30-39)
    #[error("empty or inverted time window: start {start}, end {end}")]
    EmptyWindow {
        start: NaiveDateTime,
        end: NaiveDateTime,
    },

    #[error("time window {start} to {end} is not a whole number of seconds")]
    FractionalWindow {
        start: NaiveDateTime,
        end: NaiveDateTime,
    },

    #[error("time window {start} to {end} spans {seconds} seconds, more than the {limit} second limit")]
    WindowTooLong {
        start: NaiveDateTime,
        end: NaiveDateTime,
        seconds: i64,
        limit: i64,
    },

    #[error("no records found in the specified time period")]
    NoEvents,

    #[error("timestamp {timestamp} appears more than once in the time series (counts {first} and {second})")]
    DuplicateTimestamp {
        timestamp: NaiveDateTime,
        first: u32,
        second: u32,
    },

    // Simulation errors (40-49)
    #[error("capacity must be a positive number of calls per second, got {capacity}")]
    InvalidCapacity { capacity: f64 },

    // Configuration errors (50-59)
    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid settings: {0}")]
    InvalidSettings(String),

    // I/O errors (60-69)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Convenience constructor for a row that failed to parse.
    pub fn row_parse(
        line: u64,
        field: impl Into<String>,
        reason: impl Into<String>,
        row: impl Into<String>,
    ) -> Self {
        Error::RowParse {
            line,
            field: field.into(),
            reason: reason.into(),
            row: row.into(),
        }
    }

    /// Returns the error code for this error type.
    ///
    /// Error codes are stable and grouped by category:
    /// - 10-19: Format errors
    /// - 20-29: Row parse errors
    /// - 30-39: Window errors
    /// - 40-49: Simulation input errors
    /// - 50-59: Configuration errors
    /// - 60-69: I/O errors
    pub fn code(&self) -> u32 {
        match self {
            Error::EmptySource => 10,
            Error::NoDataRows => 11,
            Error::NoTimestampColumn { .. } => 12,
            Error::UnknownColumn { .. } => 13,
            Error::ColumnNotTimestamp { .. } => 14,
            Error::LayoutMismatch(_) => 15,
            Error::RowParse { .. } => 20,
            Error::EmptyWindow { .. } => 30,
            Error::FractionalWindow { .. } => 31,
            Error::NoEvents => 32,
            Error::DuplicateTimestamp { .. } => 33,
            Error::WindowTooLong { .. } => 34,
            Error::InvalidCapacity { .. } => 40,
            Error::Config(_) => 50,
            Error::InvalidSettings(_) => 51,
            Error::Io(_) => 60,
            Error::Csv(_) => 61,
            Error::Json(_) => 62,
        }
    }

    /// Returns the error category for grouping and filtering.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::EmptySource
            | Error::NoDataRows
            | Error::NoTimestampColumn { .. }
            | Error::UnknownColumn { .. }
            | Error::ColumnNotTimestamp { .. }
            | Error::LayoutMismatch(_) => ErrorCategory::Format,

            Error::RowParse { .. } => ErrorCategory::RowParse,

            Error::EmptyWindow { .. }
            | Error::FractionalWindow { .. }
            | Error::NoEvents
            | Error::DuplicateTimestamp { .. }
            | Error::WindowTooLong { .. } => ErrorCategory::Window,

            Error::InvalidCapacity { .. } => ErrorCategory::Simulation,

            Error::Config(_) | Error::InvalidSettings(_) => ErrorCategory::Config,

            Error::Io(_) | Error::Csv(_) | Error::Json(_) => ErrorCategory::Io,
        }
    }

    /// Returns whether the run could continue after this error.
    ///
    /// Always false: there is no retry tier for an offline batch run.
    pub fn is_recoverable(&self) -> bool {
        false
    }

    /// Returns a human-readable remediation hint.
    pub fn remediation(&self) -> &'static str {
        match self {
            Error::EmptySource => "Check that the CDR export finished and the file is not truncated.",
            Error::NoDataRows => {
                "The file only has a header row. Re-export the CDRs for a period that contains calls."
            }
            Error::NoTimestampColumn { .. } => {
                "No recognized date/time format was found. Specify the start column with '-t header -c <name>' or '-t positional -c <n>'."
            }
            Error::UnknownColumn { .. } => {
                "Check the column name against the header row, or the column number against the row width."
            }
            Error::ColumnNotTimestamp { .. } => {
                "Pick the column holding the call start date/time, or let autodetection choose with '-t auto'."
            }
            Error::LayoutMismatch(_) => {
                "Use '-t header' for files with a header row and '-t positional' for files without one."
            }

            Error::RowParse { .. } => {
                "Check the offending row in the CDR file. Every kept row must carry a valid start time, filter value and queue time."
            }

            Error::EmptyWindow { .. } => "Make sure --end is later than --start.",
            Error::FractionalWindow { .. } => {
                "Give --start and --end with whole-second precision (YYYY-MM-DD HH:MM:SS)."
            }
            Error::NoEvents => "Widen the --start/--end period, or check that the input contains outbound calls.",
            Error::DuplicateTimestamp { .. } => {
                "The time series file is inconsistent. Regenerate it with 'cps-core count'."
            }

            Error::WindowTooLong { .. } => {
                "Narrow the period with --start/--end, or check the time series for stray far-off timestamps."
            }

            Error::InvalidCapacity { .. } => "Capacity is calls per second and must be greater than zero.",

            Error::Config(_) => "Check the settings file path and JSON syntax.",
            Error::InvalidSettings(_) => {
                "Fix the reported field in the settings file, or remove the file to use built-in defaults."
            }

            Error::Io(_) => "Check that the file exists and is readable, and that the output directory is writable.",
            Error::Csv(_) => "The file is not valid CSV. Check quoting and line endings.",
            Error::Json(_) => "Invalid JSON. Check the file syntax with 'jq . <file>'.",
        }
    }

    /// Returns a short headline for human-readable output.
    pub fn headline(&self) -> &'static str {
        match self {
            Error::EmptySource => "Empty CDR File",
            Error::NoDataRows => "No Call Records",
            Error::NoTimestampColumn { .. } => "No Date/Time Column",
            Error::UnknownColumn { .. } => "Unknown Column",
            Error::ColumnNotTimestamp { .. } => "Column Is Not a Date/Time",
            Error::LayoutMismatch(_) => "CDR Layout Mismatch",

            Error::RowParse { .. } => "Row Parse Error",

            Error::EmptyWindow { .. } => "Empty Time Window",
            Error::FractionalWindow { .. } => "Fractional Time Window",
            Error::NoEvents => "No Records in Period",
            Error::DuplicateTimestamp { .. } => "Duplicate Timestamp",
            Error::WindowTooLong { .. } => "Time Window Too Long",

            Error::InvalidCapacity { .. } => "Invalid Capacity",

            Error::Config(_) => "Configuration Error",
            Error::InvalidSettings(_) => "Invalid Settings",

            Error::Io(_) => "I/O Error",
            Error::Csv(_) => "CSV Error",
            Error::Json(_) => "JSON Error",
        }
    }
}

/// Structured error response for JSON output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredError {
    /// Stable error code.
    pub code: u32,

    /// Error category for grouping.
    pub category: ErrorCategory,

    /// Human-readable error message.
    pub message: String,

    /// Whether the error is potentially recoverable.
    pub recoverable: bool,

    /// Remediation hint.
    pub remediation: String,

    /// Additional structured context (e.g., line number, raw row).
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub context: HashMap<String, serde_json::Value>,
}

impl From<&Error> for StructuredError {
    fn from(err: &Error) -> Self {
        let mut context = HashMap::new();

        match err {
            Error::NoTimestampColumn { line } => {
                context.insert("line".to_string(), serde_json::json!(line));
            }
            Error::UnknownColumn { column } | Error::ColumnNotTimestamp { column } => {
                context.insert("column".to_string(), serde_json::json!(column));
            }
            Error::RowParse {
                line, field, row, ..
            } => {
                context.insert("line".to_string(), serde_json::json!(line));
                context.insert("field".to_string(), serde_json::json!(field));
                context.insert("row".to_string(), serde_json::json!(row));
            }
            Error::EmptyWindow { start, end } | Error::FractionalWindow { start, end } => {
                context.insert("start".to_string(), serde_json::json!(start));
                context.insert("end".to_string(), serde_json::json!(end));
            }
            Error::WindowTooLong {
                start,
                end,
                seconds,
                limit,
            } => {
                context.insert("start".to_string(), serde_json::json!(start));
                context.insert("end".to_string(), serde_json::json!(end));
                context.insert("seconds".to_string(), serde_json::json!(seconds));
                context.insert("limit".to_string(), serde_json::json!(limit));
            }
            Error::DuplicateTimestamp { timestamp, .. } => {
                context.insert("timestamp".to_string(), serde_json::json!(timestamp));
            }
            Error::InvalidCapacity { capacity } => {
                context.insert("capacity".to_string(), serde_json::json!(capacity));
            }
            _ => {}
        }

        StructuredError {
            code: err.code(),
            category: err.category(),
            message: err.to_string(),
            recoverable: err.is_recoverable(),
            remediation: err.remediation().to_string(),
            context,
        }
    }
}

impl StructuredError {
    /// Add additional context to the error.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        if let Ok(v) = serde_json::to_value(value) {
            self.context.insert(key.into(), v);
        }
        self
    }

    /// Serialize to JSON string.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            format!(r#"{{"code":{},"error":"serialization_failed"}}"#, self.code)
        })
    }
}

/// Format an error for human-readable stderr output.
///
/// Row parse errors also print the raw offending row.
pub fn format_error_human(err: &Error, use_color: bool) -> String {
    let (red, cyan, reset) = if use_color {
        ("\x1b[31m", "\x1b[36m", "\x1b[0m")
    } else {
        ("", "", "")
    };

    let mut out = format!(
        "{red}✗{reset} {headline}\n  Reason: {message}",
        headline = err.headline(),
        message = err,
    );
    if let Error::RowParse { row, .. } = err {
        out.push_str(&format!("\n  Row: {}", row));
    }
    out.push_str(&format!(
        "\n  {cyan}Fix:{reset} {remediation}",
        remediation = err.remediation()
    ));
    out
}
