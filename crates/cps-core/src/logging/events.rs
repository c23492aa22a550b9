//! Structured event definitions.
//!
//! Every event carries the run ID and the pipeline stage that emitted it.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<tracing::Level> for Level {
    fn from(level: tracing::Level) -> Self {
        match level {
            tracing::Level::TRACE => Level::Trace,
            tracing::Level::DEBUG => Level::Debug,
            tracing::Level::INFO => Level::Info,
            tracing::Level::WARN => Level::Warn,
            tracing::Level::ERROR => Level::Error,
        }
    }
}

/// Pipeline stages, in data-flow order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Startup and settings resolution.
    Init,
    /// CDR format profile detection.
    Detect,
    /// Row filtering and timestamp adjustment.
    Normalize,
    /// Per-second counting and histograms.
    Aggregate,
    /// Dense series construction.
    Materialize,
    /// Queue delay simulation.
    Simulate,
    /// Output rendering.
    Report,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Stage::Init => "init",
            Stage::Detect => "detect",
            Stage::Normalize => "normalize",
            Stage::Aggregate => "aggregate",
            Stage::Materialize => "materialize",
            Stage::Simulate => "simulate",
            Stage::Report => "report",
        };
        write!(f, "{}", s)
    }
}

/// Stable event names, used as tracing targets.
pub mod event_names {
    pub const RUN_STARTED: &str = "run.started";
    pub const RUN_FINISHED: &str = "run.finished";

    pub const CONFIG_LOADED: &str = "config.loaded";
    pub const CONFIG_DEFAULT_USED: &str = "config.default_used";
    pub const CONFIG_ERROR: &str = "config.error";

    pub const DETECT_FINISHED: &str = "detect.finished";
    pub const DETECT_FAILED: &str = "detect.failed";

    pub const NORMALIZE_ROW_SKIPPED: &str = "normalize.row_skipped";
    pub const NORMALIZE_ROW_FAILED: &str = "normalize.row_failed";
    pub const NORMALIZE_FINISHED: &str = "normalize.finished";

    pub const AGGREGATE_FINISHED: &str = "aggregate.finished";
    pub const CANONICAL_WRITTEN: &str = "aggregate.canonical_written";
    pub const CANONICAL_LOADED: &str = "aggregate.canonical_loaded";

    pub const MATERIALIZE_OUT_OF_RANGE: &str = "materialize.out_of_range";
    pub const MATERIALIZE_FINISHED: &str = "materialize.finished";

    pub const SIMULATE_FINISHED: &str = "simulate.finished";
    pub const SIMULATE_REJECTED: &str = "simulate.rejected";

    pub const REPORT_WRITTEN: &str = "report.written";

    pub const INTERNAL_ERROR: &str = "internal_error";
}

/// Correlation context shared by every event of one invocation.
#[derive(Debug, Clone)]
pub struct LogContext {
    pub run_id: String,
}

impl LogContext {
    pub fn new(run_id: impl Into<String>) -> Self {
        LogContext {
            run_id: run_id.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_keeps_run_id() {
        let ctx = LogContext::new("run-abc");
        assert_eq!(ctx.run_id, "run-abc");
    }

    #[test]
    fn stage_display_matches_serde() {
        for stage in [
            Stage::Init,
            Stage::Detect,
            Stage::Normalize,
            Stage::Aggregate,
            Stage::Materialize,
            Stage::Simulate,
            Stage::Report,
        ] {
            let json = serde_json::to_string(&stage).unwrap();
            assert_eq!(json.trim_matches('"'), stage.to_string());
        }
    }
}
