//! Canonical time-series file.
//!
//! One line per observed second, `<timestamp>,<count>`, no header. The
//! timestamp is naive local time with second resolution, e.g.
//! `2024-01-01 00:00:05,3`. Readers must not assume the lines are sorted.

use std::io::{Read, Write};

use chrono::NaiveDateTime;
use csv::{ReaderBuilder, WriterBuilder};

use cps_common::{Error, Result};

use super::aggregate::SparseCounts;
use super::window::Bounds;
use crate::cdr::datetime::parse_naive;
use crate::cdr::normalize::join_record;

/// Entries read from a canonical file, already filtered to the bounds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CanonicalSeries {
    /// In file order; duplicates are preserved for the materializer to reject.
    pub entries: Vec<(NaiveDateTime, u32)>,
    pub earliest: Option<NaiveDateTime>,
    pub latest: Option<NaiveDateTime>,
    pub lines_read: u64,
}

/// Write `counts` in ascending time order. Returns the number of lines.
pub fn write_canonical<W: Write>(writer: W, counts: &SparseCounts) -> Result<u64> {
    let mut out = WriterBuilder::new().has_headers(false).from_writer(writer);
    let mut lines = 0u64;
    for (timestamp, count) in counts.iter() {
        out.write_record([
            timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
            count.to_string(),
        ])?;
        lines += 1;
    }
    out.flush()?;
    Ok(lines)
}

/// Read a canonical file, dropping lines outside `bounds`.
///
/// `earliest`/`latest` track only the kept lines.
pub fn read_canonical<R: Read>(reader: R, bounds: Bounds) -> Result<CanonicalSeries> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    let mut series = CanonicalSeries::default();
    for (i, record) in rdr.records().enumerate() {
        let record = record?;
        let line = record.position().map(|p| p.line()).unwrap_or(i as u64 + 1);
        series.lines_read += 1;

        if record.len() != 2 {
            return Err(Error::row_parse(
                line,
                "line",
                format!("expected 2 fields (timestamp,count), found {}", record.len()),
                join_record(&record),
            ));
        }

        let timestamp = parse_naive(&record[0]).ok_or_else(|| {
            Error::row_parse(
                line,
                "timestamp",
                format!("'{}' is not an ISO-8601 date/time", &record[0]),
                join_record(&record),
            )
        })?;
        let count: u32 = record[1].trim().parse().map_err(|_| {
            Error::row_parse(
                line,
                "count",
                format!("'{}' is not a non-negative integer", &record[1]),
                join_record(&record),
            )
        })?;

        if !bounds.contains(timestamp) {
            continue;
        }
        series.earliest = Some(series.earliest.map_or(timestamp, |e| e.min(timestamp)));
        series.latest = Some(series.latest.map_or(timestamp, |l| l.max(timestamp)));
        series.entries.push((timestamp, count));
    }
    Ok(series)
}
