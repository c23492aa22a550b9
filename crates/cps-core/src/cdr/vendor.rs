//! Known CDR export conventions.
//!
//! Each convention pairs a header alias set with a rule for recognizing
//! real outbound API calls. Exports from unknown sources carry neither
//! column and must already be filtered to outbound traffic.

use serde::{Deserialize, Serialize};

use super::datetime::DateTimeFormat;

/// Header names for the call start time, in preference order.
pub const START_TIME_ALIASES: &[&str] = &["DateCreated", "date_created", "StartTime", "start_time"];

/// Header names for the recorded pre-queue wait (milliseconds).
pub const QUEUE_TIME_ALIASES: &[&str] = &["QueueTime", "queue_time"];

/// Bit set in the `Flags` column for outbound API calls.
pub const FLAG_OUTBOUND_API: i64 = 0x0002;

/// `Direction` values marking outbound API calls.
pub const OUTBOUND_DIRECTIONS: &[&str] = &["Outgoing API", "outbound-api"];

/// How to test a row for outbound API traffic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutboundConvention {
    /// Integer `Flags` column; keep rows with the outbound API bit set.
    FlagsBitmask,
    /// `Direction` column; keep rows whose value names outbound API calls.
    DirectionLabel,
}

impl OutboundConvention {
    /// Lookup order when both columns exist.
    pub const PRIORITY: [OutboundConvention; 2] = [
        OutboundConvention::FlagsBitmask,
        OutboundConvention::DirectionLabel,
    ];

    pub fn aliases(&self) -> &'static [&'static str] {
        match self {
            OutboundConvention::FlagsBitmask => &["Flags", "flags"],
            OutboundConvention::DirectionLabel => &["Direction", "direction"],
        }
    }

    /// Whether `value` marks an outbound API call.
    ///
    /// Errors when a flags value is not an integer.
    pub fn is_outbound(&self, value: &str) -> Result<bool, String> {
        match self {
            OutboundConvention::FlagsBitmask => {
                let value = value.trim();
                let flags: i64 = value
                    .parse()
                    .map_err(|_| format!("flags value '{}' is not an integer", value))?;
                Ok(flags & FLAG_OUTBOUND_API == FLAG_OUTBOUND_API)
            }
            OutboundConvention::DirectionLabel => Ok(OUTBOUND_DIRECTIONS.contains(&value)),
        }
    }
}

impl std::fmt::Display for OutboundConvention {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutboundConvention::FlagsBitmask => write!(f, "flags bitmask"),
            OutboundConvention::DirectionLabel => write!(f, "direction label"),
        }
    }
}

/// Likely origin of a CDR export, inferred from its columns and timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Vendor {
    /// Monkey or Looker download (`Flags` column).
    MonkeyOrLooker,
    /// Console or API export (`Direction` column).
    Console,
    /// Anything else; assumed pre-filtered.
    Generic,
}

impl Vendor {
    pub fn infer(format: DateTimeFormat, filter: Option<OutboundConvention>) -> Self {
        match (filter, format) {
            (Some(OutboundConvention::FlagsBitmask), _) | (None, DateTimeFormat::Monkey) => {
                Vendor::MonkeyOrLooker
            }
            (Some(OutboundConvention::DirectionLabel), _) | (None, DateTimeFormat::Console) => {
                Vendor::Console
            }
            (None, DateTimeFormat::Iso) => Vendor::Generic,
        }
    }
}

impl std::fmt::Display for Vendor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Vendor::MonkeyOrLooker => write!(f, "Monkey or Looker"),
            Vendor::Console => write!(f, "Console or API export"),
            Vendor::Generic => write!(f, "generic"),
        }
    }
}

/// First alias present in `header`, with its 0-based index.
pub fn find_header<'a, S: AsRef<str>>(
    header: &[S],
    aliases: impl IntoIterator<Item = &'a str>,
) -> Option<(usize, &'a str)> {
    aliases.into_iter().find_map(|alias| {
        header
            .iter()
            .position(|h| h.as_ref() == alias)
            .map(|i| (i, alias))
    })
}
