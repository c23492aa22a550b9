//! Exit codes for the cps-core CLI.
//!
//! Exit code ranges:
//! - 0: Clean run
//! - 10-19: Input or configuration errors (fixable by the caller)
//! - 20-29: Internal and I/O errors

use cps_common::{Error, ErrorCategory};

/// Process exit codes. Stable for automation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Run completed.
    Clean = 0,

    // ========================================================================
    // Caller Errors (10-19)
    // ========================================================================
    /// Invalid arguments or settings.
    ArgsError = 10,

    /// The CDR layout could not be determined or contradicts the arguments.
    FormatError = 11,

    /// A kept CDR row failed to parse.
    RowParseError = 12,

    /// Empty or inverted window, or no events inside it.
    WindowError = 13,

    /// Invalid queue capacity.
    SimulationError = 14,

    // ========================================================================
    // Internal Errors (20-29)
    // ========================================================================
    /// Internal error (bug).
    InternalError = 20,

    /// File could not be read or written.
    IoError = 21,
}

impl ExitCode {
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    pub fn is_internal_error(self) -> bool {
        (self as i32) >= 20
    }

    /// Name used in JSON output.
    pub fn code_name(&self) -> &'static str {
        match self {
            ExitCode::Clean => "OK_CLEAN",
            ExitCode::ArgsError => "ERR_ARGS",
            ExitCode::FormatError => "ERR_FORMAT",
            ExitCode::RowParseError => "ERR_ROW_PARSE",
            ExitCode::WindowError => "ERR_WINDOW",
            ExitCode::SimulationError => "ERR_SIMULATION",
            ExitCode::InternalError => "ERR_INTERNAL",
            ExitCode::IoError => "ERR_IO",
        }
    }
}

impl From<&Error> for ExitCode {
    fn from(err: &Error) -> Self {
        match err.category() {
            ErrorCategory::Format => ExitCode::FormatError,
            ErrorCategory::RowParse => ExitCode::RowParseError,
            ErrorCategory::Window => ExitCode::WindowError,
            ErrorCategory::Simulation => ExitCode::SimulationError,
            ErrorCategory::Config => ExitCode::ArgsError,
            ErrorCategory::Io => ExitCode::IoError,
        }
    }
}
