//! Timestamp formats found in CDR exports.
//!
//! Three closed formats are recognized, tried in a fixed priority order:
//!
//! | Format    | Example                           | Zone                |
//! |-----------|-----------------------------------|---------------------|
//! | `monkey`  | `Sat, 12 Sep 2020 10:30:05 -0700` | numeric offset      |
//! | `console` | `14:52:06 EDT 2020-09-10`         | abbreviation        |
//! | `iso`     | `2020-09-10 14:52:06.000`         | optional offset     |
//!
//! All parses are truncated to whole seconds.

use chrono::{
    DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, SubsecRound, TimeDelta,
};
use serde::{Deserialize, Serialize};

const MONKEY_PATTERN: &str = "%a, %d %b %Y %H:%M:%S %z";

const ISO_AWARE_PATTERNS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%.f%z",
];

const ISO_NAIVE_PATTERNS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// A timestamp layout recognized by the detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DateTimeFormat {
    /// RFC 2822 style with numeric offset, as exported by Monkey.
    Monkey,
    /// `HH:MM:SS ZONE YYYY-MM-DD`, as exported by the Console.
    Console,
    /// Generic ISO-8601 date or date-time.
    Iso,
}

/// A parsed timestamp: wall-clock time plus the offset it was written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedTimestamp {
    pub wall: NaiveDateTime,
    pub offset: Option<FixedOffset>,
}

impl ParsedTimestamp {
    /// Wall-clock time in `zone`.
    ///
    /// Aware timestamps are shifted into `zone`; naive ones, or any
    /// timestamp when `zone` is None, keep their own wall-clock time.
    pub fn in_zone(&self, zone: Option<FixedOffset>) -> NaiveDateTime {
        match (self.offset, zone) {
            (Some(own), Some(target)) => {
                let shift = target.local_minus_utc() - own.local_minus_utc();
                self.wall + TimeDelta::seconds(i64::from(shift))
            }
            _ => self.wall,
        }
    }
}

impl DateTimeFormat {
    /// Detection order.
    pub const PRIORITY: [DateTimeFormat; 3] = [
        DateTimeFormat::Monkey,
        DateTimeFormat::Console,
        DateTimeFormat::Iso,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            DateTimeFormat::Monkey => "monkey",
            DateTimeFormat::Console => "console",
            DateTimeFormat::Iso => "iso",
        }
    }

    /// Example value, for diagnostics.
    pub fn example(&self) -> &'static str {
        match self {
            DateTimeFormat::Monkey => "Sat, 12 Sep 2020 10:30:05 -0700",
            DateTimeFormat::Console => "14:52:06 EDT 2020-09-10",
            DateTimeFormat::Iso => "2020-09-10 14:52:06",
        }
    }

    pub fn parse(&self, value: &str) -> Option<ParsedTimestamp> {
        let value = value.trim();
        if value.is_empty() {
            return None;
        }
        let parsed = match self {
            DateTimeFormat::Monkey => parse_monkey(value),
            DateTimeFormat::Console => parse_console(value),
            DateTimeFormat::Iso => parse_iso(value),
        }?;
        Some(ParsedTimestamp {
            wall: parsed.wall.trunc_subsecs(0),
            offset: parsed.offset,
        })
    }
}

impl std::fmt::Display for DateTimeFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

fn aware(dt: DateTime<FixedOffset>) -> ParsedTimestamp {
    ParsedTimestamp {
        wall: dt.naive_local(),
        offset: Some(*dt.offset()),
    }
}

fn parse_monkey(value: &str) -> Option<ParsedTimestamp> {
    DateTime::parse_from_str(value, MONKEY_PATTERN).ok().map(aware)
}

fn parse_console(value: &str) -> Option<ParsedTimestamp> {
    let mut parts = value.split_whitespace();
    let (time, zone, date) = (parts.next()?, parts.next()?, parts.next()?);
    if parts.next().is_some() || !zone.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    let time = NaiveTime::parse_from_str(time, "%H:%M:%S").ok()?;
    let date = NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()?;
    Some(ParsedTimestamp {
        wall: date.and_time(time),
        offset: zone_offset(zone),
    })
}

/// Fixed offset for the zone abbreviations seen in Console exports.
pub fn zone_offset(abbreviation: &str) -> Option<FixedOffset> {
    let hours = match abbreviation.to_ascii_uppercase().as_str() {
        "UTC" | "GMT" | "Z" => 0,
        "EDT" => -4,
        "EST" | "CDT" => -5,
        "CST" | "MDT" => -6,
        "MST" | "PDT" => -7,
        "PST" => -8,
        _ => return None,
    };
    FixedOffset::east_opt(hours * 3600)
}

fn parse_iso(value: &str) -> Option<ParsedTimestamp> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(aware(dt));
    }
    for pattern in ISO_AWARE_PATTERNS {
        if let Ok(dt) = DateTime::parse_from_str(value, pattern) {
            return Some(aware(dt));
        }
    }
    parse_naive(value).map(|wall| ParsedTimestamp { wall, offset: None })
}

/// Parse a naive ISO-8601 date-time, or a bare date at midnight.
pub fn parse_naive(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    for pattern in ISO_NAIVE_PATTERNS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, pattern) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .map(|d| d.and_time(NaiveTime::MIN))
}

/// Parse a caller-supplied window bound.
///
/// Accepts `YYYY-MM-DD` or `YYYY-MM-DD HH:MM[:SS]` (space or `T`). Bounds
/// are wall-clock times in the zone of the CDR source.
pub fn parse_bound(value: &str) -> Result<NaiveDateTime, String> {
    parse_naive(value).ok_or_else(|| {
        format!(
            "invalid date/time '{}': expected YYYY-MM-DD or YYYY-MM-DD HH:MM:SS",
            value
        )
    })
}
