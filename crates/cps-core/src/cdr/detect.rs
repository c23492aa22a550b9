//! FormatProfile detection.
//!
//! Detection looks at no more than the first two records: the first decides
//! whether the table has a header, and the first data row decides which
//! columns hold timestamps and in which format.

use chrono::FixedOffset;
use csv::StringRecord;
use serde::{Serialize, Serializer};

use cps_common::{Error, Layout, Result};

use super::datetime::DateTimeFormat;
use super::vendor::{find_header, OutboundConvention, Vendor, QUEUE_TIME_ALIASES, START_TIME_ALIASES};

/// How a column was identified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum ColumnRef {
    /// 1-based position, for headerless tables.
    Ordinal(usize),
    /// Header name.
    Name(String),
}

impl std::fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ColumnRef::Ordinal(n) => write!(f, "column {}", n),
            ColumnRef::Name(name) => write!(f, "column {}", name),
        }
    }
}

/// A column reference resolved against the table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Column {
    pub reference: ColumnRef,
    /// 0-based field index.
    pub index: usize,
}

impl Column {
    fn named(name: &str, index: usize) -> Self {
        Column {
            reference: ColumnRef::Name(name.to_string()),
            index,
        }
    }

    fn ordinal(index: usize) -> Self {
        Column {
            reference: ColumnRef::Ordinal(index + 1),
            index,
        }
    }

    fn for_table(has_header: bool, header: &StringRecord, index: usize) -> Self {
        match header.get(index) {
            Some(name) if has_header => Column::named(name, index),
            _ => Column::ordinal(index),
        }
    }
}

impl std::fmt::Display for Column {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.reference.fmt(f)
    }
}

/// Outbound filter column and the rule applied to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutboundFilter {
    pub column: Column,
    pub convention: OutboundConvention,
}

/// Everything the normalizer needs to know about a CDR table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormatProfile {
    pub has_header: bool,
    pub start_column: Column,
    pub datetime_format: DateTimeFormat,
    /// Offset embedded in the start column of the first data row.
    #[serde(serialize_with = "serialize_offset")]
    pub timezone: Option<FixedOffset>,
    pub outbound_filter: Option<OutboundFilter>,
    pub queue_wait_column: Option<Column>,
    pub vendor: Vendor,
}

fn serialize_offset<S: Serializer>(
    offset: &Option<FixedOffset>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    match offset {
        Some(o) => serializer.serialize_some(&o.to_string()),
        None => serializer.serialize_none(),
    }
}

/// Caller hints for detection.
#[derive(Debug, Clone, Default)]
pub struct DetectOptions {
    pub layout: Layout,
    /// Explicit start column: a header name, or a 1-based ordinal.
    pub column: Option<String>,
    /// Start-time header names tried after the built-in aliases.
    pub extra_start_aliases: Vec<String>,
}

impl DetectOptions {
    /// Start-time aliases in lookup order.
    pub fn start_aliases(&self) -> impl Iterator<Item = &str> {
        START_TIME_ALIASES
            .iter()
            .copied()
            .chain(self.extra_start_aliases.iter().map(String::as_str))
    }
}

/// Timestamp columns found in one row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimestampScan {
    pub format: DateTimeFormat,
    /// 0-based indices of the columns that parsed, left to right.
    pub columns: Vec<usize>,
}

/// Try each format in priority order; the first with any match wins.
pub fn scan_row(row: &StringRecord) -> Option<TimestampScan> {
    DateTimeFormat::PRIORITY.into_iter().find_map(|format| {
        let columns: Vec<usize> = row
            .iter()
            .enumerate()
            .filter(|(_, field)| format.parse(field).is_some())
            .map(|(i, _)| i)
            .collect();
        (!columns.is_empty()).then_some(TimestampScan { format, columns })
    })
}

/// Line a record started on; `fallback` for records built outside a reader.
fn line_of(record: &StringRecord, fallback: u64) -> u64 {
    record.position().map_or(fallback, |p| p.line())
}

/// Infer a FormatProfile from the first two records of a table.
pub fn detect_format(
    first: Option<&StringRecord>,
    second: Option<&StringRecord>,
    options: &DetectOptions,
) -> Result<FormatProfile> {
    let first = first.ok_or(Error::EmptySource)?;

    let (has_header, sample, scan) = match scan_row(first) {
        Some(scan) => (false, first, scan),
        None => {
            let sample = second.ok_or(Error::NoDataRows)?;
            let scan = scan_row(sample).ok_or_else(|| Error::NoTimestampColumn {
                line: line_of(sample, 2),
            })?;
            (true, sample, scan)
        }
    };

    match (options.layout, has_header) {
        (Layout::Positional, true) => {
            return Err(Error::LayoutMismatch(
                "CDR file has a header row, but the start column was given by position".into(),
            ))
        }
        (Layout::Header, false) => {
            return Err(Error::LayoutMismatch(
                "CDR file has no header row, but the start column was given by name".into(),
            ))
        }
        _ => {}
    }

    let header = first;
    let start_column = match options.column.as_deref() {
        Some(column) => explicit_start_column(column, has_header, header, sample, &scan)?,
        None => auto_start_column(options, has_header, header, &scan, line_of(sample, 1))?,
    };

    let timezone = sample
        .get(start_column.index)
        .and_then(|value| scan.format.parse(value))
        .and_then(|parsed| parsed.offset);

    let (outbound_filter, queue_wait_column) = if has_header {
        let names: Vec<&str> = header.iter().collect();
        let filter = OutboundConvention::PRIORITY.into_iter().find_map(|convention| {
            find_header(&names, convention.aliases().iter().copied()).map(|(index, name)| {
                OutboundFilter {
                    column: Column::named(name, index),
                    convention,
                }
            })
        });
        let queue = find_header(&names, QUEUE_TIME_ALIASES.iter().copied())
            .map(|(index, name)| Column::named(name, index));
        (filter, queue)
    } else {
        (None, None)
    };

    let vendor = Vendor::infer(
        scan.format,
        outbound_filter.as_ref().map(|f| f.convention),
    );

    Ok(FormatProfile {
        has_header,
        start_column,
        datetime_format: scan.format,
        timezone,
        outbound_filter,
        queue_wait_column,
        vendor,
    })
}

fn explicit_start_column(
    column: &str,
    has_header: bool,
    header: &StringRecord,
    sample: &StringRecord,
    scan: &TimestampScan,
) -> Result<Column> {
    let resolved = if has_header {
        let index = header
            .iter()
            .position(|h| h == column)
            .ok_or_else(|| Error::UnknownColumn {
                column: column.to_string(),
            })?;
        Column::named(column, index)
    } else {
        let ordinal: usize = column.trim().parse().map_err(|_| {
            Error::LayoutMismatch(format!(
                "CDR file has no header row, so the start column must be a number, not '{}'",
                column
            ))
        })?;
        if ordinal == 0 || ordinal > sample.len() {
            return Err(Error::UnknownColumn {
                column: column.to_string(),
            });
        }
        Column::ordinal(ordinal - 1)
    };

    if scan.columns.contains(&resolved.index) {
        Ok(resolved)
    } else {
        Err(Error::ColumnNotTimestamp {
            column: column.to_string(),
        })
    }
}

fn auto_start_column(
    options: &DetectOptions,
    has_header: bool,
    header: &StringRecord,
    scan: &TimestampScan,
    sample_line: u64,
) -> Result<Column> {
    if has_header {
        let names: Vec<&str> = header.iter().collect();
        if let Some((index, name)) = find_header(&names, options.start_aliases()) {
            return if scan.columns.contains(&index) {
                Ok(Column::named(name, index))
            } else {
                Err(Error::ColumnNotTimestamp {
                    column: name.to_string(),
                })
            };
        }
    }

    // scan_row only returns non-empty column sets.
    let index = scan
        .columns
        .first()
        .copied()
        .ok_or(Error::NoTimestampColumn { line: sample_line })?;
    Ok(Column::for_table(has_header, header, index))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(fields: &[&str]) -> StringRecord {
        StringRecord::from(fields.to_vec())
    }

    fn detect(rows: &[&[&str]], options: &DetectOptions) -> Result<FormatProfile> {
        let records: Vec<StringRecord> = rows.iter().map(|r| rec(r)).collect();
        detect_format(records.first(), records.get(1), options)
    }

    #[test]
    fn empty_source_is_fatal() {
        assert!(matches!(
            detect(&[], &DetectOptions::default()),
            Err(Error::EmptySource)
        ));
    }

    #[test]
    fn header_without_rows_is_fatal() {
        assert!(matches!(
            detect(&[&["DateCreated", "Flags"]], &DetectOptions::default()),
            Err(Error::NoDataRows)
        ));
    }

    #[test]
    fn header_with_untimestamped_row_is_fatal() {
        assert!(matches!(
            detect(&[&["a", "b"], &["x", "y"]], &DetectOptions::default()),
            Err(Error::NoTimestampColumn { line: 2 })
        ));
    }

    #[test]
    fn monkey_export_detected() {
        let profile = detect(
            &[
                &["Sid", "DateCreated", "Flags", "QueueTime"],
                &["CA1", "Sat, 12 Sep 2020 10:30:05 -0700", "2", "1500"],
            ],
            &DetectOptions::default(),
        )
        .unwrap();

        assert!(profile.has_header);
        assert_eq!(profile.datetime_format, DateTimeFormat::Monkey);
        assert_eq!(profile.start_column, Column::named("DateCreated", 1));
        assert_eq!(profile.timezone, FixedOffset::west_opt(7 * 3600));
        let filter = profile.outbound_filter.unwrap();
        assert_eq!(filter.convention, OutboundConvention::FlagsBitmask);
        assert_eq!(filter.column.index, 2);
        assert_eq!(profile.queue_wait_column, Some(Column::named("QueueTime", 3)));
        assert_eq!(profile.vendor, Vendor::MonkeyOrLooker);
    }

    #[test]
    fn console_export_detected() {
        let profile = detect(
            &[
                &["Date", "Direction", "From"],
                &["14:52:06 EDT 2020-09-10", "Outgoing API", "+15550100"],
            ],
            &DetectOptions::default(),
        )
        .unwrap();
        assert_eq!(profile.datetime_format, DateTimeFormat::Console);
        // No start alias: first timestamp column.
        assert_eq!(profile.start_column, Column::named("Date", 0));
        assert_eq!(
            profile.outbound_filter.unwrap().convention,
            OutboundConvention::DirectionLabel
        );
        assert_eq!(profile.vendor, Vendor::Console);
    }

    #[test]
    fn flags_win_over_direction() {
        let profile = detect(
            &[
                &["StartTime", "Direction", "Flags"],
                &["2020-09-10 14:52:06", "inbound", "2"],
            ],
            &DetectOptions::default(),
        )
        .unwrap();
        let filter = profile.outbound_filter.unwrap();
        assert_eq!(filter.convention, OutboundConvention::FlagsBitmask);
        assert_eq!(filter.column, Column::named("Flags", 2));
    }

    #[test]
    fn start_alias_beats_earlier_timestamp_column() {
        let profile = detect(
            &[
                &["EndTime", "StartTime"],
                &["2020-09-10 14:55:00", "2020-09-10 14:52:06"],
            ],
            &DetectOptions::default(),
        )
        .unwrap();
        assert_eq!(profile.start_column, Column::named("StartTime", 1));
    }

    #[test]
    fn configured_alias_is_used() {
        let options = DetectOptions {
            extra_start_aliases: vec!["CallStart".into()],
            ..Default::default()
        };
        let profile = detect(
            &[
                &["EndTime", "CallStart"],
                &["2020-09-10 14:55:00", "2020-09-10 14:52:06"],
            ],
            &options,
        )
        .unwrap();
        assert_eq!(profile.start_column, Column::named("CallStart", 1));
    }

    #[test]
    fn start_alias_without_timestamps_is_fatal() {
        let err = detect(
            &[
                &["DateCreated", "When"],
                &["n/a", "2020-09-10 14:52:06"],
            ],
            &DetectOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::ColumnNotTimestamp { .. }));
    }

    #[test]
    fn headerless_picks_first_timestamp_column() {
        let profile = detect(
            &[&["x", "2020-09-10 14:52:06", "2020-09-10 14:53:00"]],
            &DetectOptions::default(),
        )
        .unwrap();
        assert!(!profile.has_header);
        assert_eq!(profile.start_column, Column::ordinal(1));
        assert_eq!(profile.start_column.reference, ColumnRef::Ordinal(2));
        assert!(profile.outbound_filter.is_none());
        assert_eq!(profile.vendor, Vendor::Generic);
    }

    #[test]
    fn positional_hint_validated() {
        let rows: &[&[&str]] = &[&["x", "2020-09-10 14:52:06", "2020-09-10 14:53:00"]];
        let pick = |c: &str| DetectOptions {
            layout: Layout::Positional,
            column: Some(c.into()),
            ..Default::default()
        };

        let profile = detect(rows, &pick("3")).unwrap();
        assert_eq!(profile.start_column, Column::ordinal(2));

        assert!(matches!(
            detect(rows, &pick("1")),
            Err(Error::ColumnNotTimestamp { .. })
        ));
        assert!(matches!(
            detect(rows, &pick("9")),
            Err(Error::UnknownColumn { .. })
        ));
    }

    #[test]
    fn layout_hint_contradicting_header_is_fatal() {
        let headered: &[&[&str]] = &[&["DateCreated"], &["2020-09-10 14:52:06"]];
        let positional = DetectOptions {
            layout: Layout::Positional,
            column: Some("1".into()),
            ..Default::default()
        };
        assert!(matches!(
            detect(headered, &positional),
            Err(Error::LayoutMismatch(_))
        ));

        let headerless: &[&[&str]] = &[&["2020-09-10 14:52:06"]];
        let header = DetectOptions {
            layout: Layout::Header,
            column: Some("DateCreated".into()),
            ..Default::default()
        };
        assert!(matches!(
            detect(headerless, &header),
            Err(Error::LayoutMismatch(_))
        ));
    }

    #[test]
    fn header_hint_validated() {
        let rows: &[&[&str]] = &[
            &["Sid", "When", "Other"],
            &["CA1", "2020-09-10 14:52:06", "x"],
        ];
        let pick = |c: &str| DetectOptions {
            layout: Layout::Header,
            column: Some(c.into()),
            ..Default::default()
        };
        assert_eq!(
            detect(rows, &pick("When")).unwrap().start_column,
            Column::named("When", 1)
        );
        assert!(matches!(
            detect(rows, &pick("Missing")),
            Err(Error::UnknownColumn { .. })
        ));
        assert!(matches!(
            detect(rows, &pick("Other")),
            Err(Error::ColumnNotTimestamp { .. })
        ));
    }

    #[test]
    fn profile_serializes_offset_as_string() {
        let profile = detect(
            &[&["DateCreated"], &["2020-09-10 14:52:06+02:00"]],
            &DetectOptions::default(),
        )
        .unwrap();
        let json = serde_json::to_value(&profile).unwrap();
        assert_eq!(json["timezone"], "+02:00");
        assert_eq!(json["start_column"]["reference"]["kind"], "name");
        assert_eq!(json["datetime_format"], "iso");
    }
}
