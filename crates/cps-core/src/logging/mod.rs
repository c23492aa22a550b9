//! Structured logging for cps-core.
//!
//! Two output modes, both on stderr:
//! - Human-readable console lines for interactive use
//! - JSONL for scripted runs and log collection
//!
//! stdout is reserved for command payloads (reports, JSON documents).
//!
//! # Usage
//!
//! ```ignore
//! use cps_core::logging::{init_logging, LogConfig, LogContext, Stage, event_names};
//! use cps_core::log_event;
//!
//! init_logging(&LogConfig::from_env(None, None));
//! let ctx = LogContext::new(generate_run_id());
//! log_event!(ctx, INFO, event_names::DETECT_FINISHED, Stage::Detect, "profile detected",
//!     start_column = %"DateCreated");
//! ```

pub mod config;
pub mod events;
pub mod layer;

pub use config::{LogConfig, LogFormat, LogLevel};
pub use events::{event_names, Level, LogContext, Stage};
pub use layer::JsonlLayer;

use std::io::IsTerminal;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Install the global subscriber.
///
/// Call once at startup. `RUST_LOG`, when it holds a valid filter, wins over
/// the configured level.
pub fn init_logging(config: &LogConfig) {
    // Event targets are event names ("detect.finished"), so filter by level only.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.to_string()));

    match config.format {
        LogFormat::Human => {
            let fmt_layer = fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_ansi(std::io::stderr().is_terminal());

            if config.timestamps {
                tracing_subscriber::registry()
                    .with(filter)
                    .with(fmt_layer)
                    .init();
            } else {
                tracing_subscriber::registry()
                    .with(filter)
                    .with(fmt_layer.without_time())
                    .init();
            }
        }
        LogFormat::Jsonl => {
            tracing_subscriber::registry()
                .with(filter)
                .with(JsonlLayer::stderr())
                .init();
        }
    }
}

/// Generate a unique run ID for this invocation.
pub fn generate_run_id() -> String {
    let uuid = uuid::Uuid::new_v4().simple().to_string();
    format!("run-{}", &uuid[..12])
}

/// Emit a tracing event stamped with the run context and pipeline stage.
///
/// ```ignore
/// log_event!(ctx, INFO, event_names::NORMALIZE_FINISHED, Stage::Normalize, "rows read",
///     rows = 120u64, kept = 97u64);
/// log_event!(ctx, DEBUG, event_names::NORMALIZE_ROW_SKIPPED, Stage::Normalize, "not outbound",
///     line = 4u64, value = %direction);
/// ```
#[macro_export]
macro_rules! log_event {
    ($ctx:expr, INFO, $event:expr, $stage:expr, $msg:expr $(, $($fields:tt)+)?) => {
        tracing::info!(
            target: $event,
            run_id = %$ctx.run_id,
            stage = %$stage,
            $($($fields)+,)?
            message = %$msg
        )
    };
    ($ctx:expr, DEBUG, $event:expr, $stage:expr, $msg:expr $(, $($fields:tt)+)?) => {
        tracing::debug!(
            target: $event,
            run_id = %$ctx.run_id,
            stage = %$stage,
            $($($fields)+,)?
            message = %$msg
        )
    };
    ($ctx:expr, WARN, $event:expr, $stage:expr, $msg:expr $(, $($fields:tt)+)?) => {
        tracing::warn!(
            target: $event,
            run_id = %$ctx.run_id,
            stage = %$stage,
            $($($fields)+,)?
            message = %$msg
        )
    };
    ($ctx:expr, ERROR, $event:expr, $stage:expr, $msg:expr $(, $($fields:tt)+)?) => {
        tracing::error!(
            target: $event,
            run_id = %$ctx.run_id,
            stage = %$stage,
            $($($fields)+,)?
            message = %$msg
        )
    };
}
