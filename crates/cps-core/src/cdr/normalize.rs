//! Record normalization: outbound filtering, wait adjustment, windowing.

use chrono::{NaiveDateTime, TimeDelta};
use csv::StringRecord;

use cps_common::{Error, Result};

use super::detect::{Column, FormatProfile};
use crate::series::window::Bounds;

/// One accepted call arrival.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CanonicalEvent {
    /// Start time minus the whole seconds of any recorded wait.
    pub arrival_time: NaiveDateTime,
    pub recorded_wait_seconds: Option<f64>,
}

/// What became of one input row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RowOutcome {
    /// Not an outbound API call.
    NotOutbound,
    /// Parsed, but the arrival falls outside the caller's window.
    OutsideWindow(CanonicalEvent),
    Accepted(CanonicalEvent),
}

impl RowOutcome {
    pub fn event(&self) -> Option<&CanonicalEvent> {
        match self {
            RowOutcome::NotOutbound => None,
            RowOutcome::OutsideWindow(e) | RowOutcome::Accepted(e) => Some(e),
        }
    }
}

/// Turns raw rows into canonical events under a fixed profile and window.
#[derive(Debug, Clone)]
pub struct Normalizer<'a> {
    profile: &'a FormatProfile,
    bounds: Bounds,
}

impl<'a> Normalizer<'a> {
    pub fn new(profile: &'a FormatProfile, bounds: Bounds) -> Self {
        Normalizer { profile, bounds }
    }

    /// Normalize the record found on 1-based `line`.
    ///
    /// Any parse failure in a row that passed the outbound filter is fatal.
    pub fn normalize(&self, line: u64, record: &StringRecord) -> Result<RowOutcome> {
        if let Some(filter) = &self.profile.outbound_filter {
            let value = field(line, record, &filter.column)?;
            let outbound = filter
                .convention
                .is_outbound(value)
                .map_err(|reason| row_error(line, &filter.column, reason, record))?;
            if !outbound {
                return Ok(RowOutcome::NotOutbound);
            }
        }

        let start_column = &self.profile.start_column;
        let raw_start = field(line, record, start_column)?;
        let format = self.profile.datetime_format;
        let started = format
            .parse(raw_start)
            .ok_or_else(|| {
                row_error(
                    line,
                    start_column,
                    format!(
                        "'{}' is not a {} date/time (expected e.g. '{}')",
                        raw_start,
                        format,
                        format.example()
                    ),
                    record,
                )
            })?
            .in_zone(self.profile.timezone);

        let mut event = CanonicalEvent {
            arrival_time: started,
            recorded_wait_seconds: None,
        };

        if let Some(column) = &self.profile.queue_wait_column {
            let wait = parse_wait(field(line, record, column)?)
                .map_err(|reason| row_error(line, column, reason, record))?;
            if wait > 0.0 {
                event.arrival_time = shift_back(event.arrival_time, wait)
                    .ok_or_else(|| row_error(line, column, "queue time out of range", record))?;
            }
            event.recorded_wait_seconds = Some(wait);
        }

        if self.bounds.contains(event.arrival_time) {
            Ok(RowOutcome::Accepted(event))
        } else {
            Ok(RowOutcome::OutsideWindow(event))
        }
    }
}

/// `start` moved back by the whole seconds of `wait`, if representable.
fn shift_back(start: NaiveDateTime, wait: f64) -> Option<NaiveDateTime> {
    let whole = wait.trunc();
    if whole >= i64::MAX as f64 {
        return None;
    }
    let delta = TimeDelta::try_seconds(whole as i64)?;
    start.checked_sub_signed(delta)
}

/// Queue wait in seconds from a millisecond value.
fn parse_wait(value: &str) -> std::result::Result<f64, String> {
    let value = value.trim();
    let millis: f64 = value
        .parse()
        .map_err(|_| format!("queue time '{}' is not a number", value))?;
    if !millis.is_finite() || millis < 0.0 {
        return Err(format!("queue time '{}' must be a non-negative number", value));
    }
    Ok(millis / 1000.0)
}

fn field<'r>(line: u64, record: &'r StringRecord, column: &Column) -> Result<&'r str> {
    record.get(column.index).ok_or_else(|| {
        row_error(
            line,
            column,
            format!("row has {} fields, {} is missing", record.len(), column),
            record,
        )
    })
}

fn row_error(line: u64, column: &Column, reason: impl Into<String>, record: &StringRecord) -> Error {
    Error::row_parse(line, column.to_string(), reason, join_record(record))
}

/// Raw row text for diagnostics.
pub fn join_record(record: &StringRecord) -> String {
    record.iter().collect::<Vec<_>>().join(",")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cdr::detect::{detect_format, DetectOptions};
    use chrono::NaiveDate;

    fn rec(fields: &[&str]) -> StringRecord {
        StringRecord::from(fields.to_vec())
    }

    fn ts(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2020, 9, 10)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    fn profile(header: &[&str], sample: &[&str]) -> FormatProfile {
        detect_format(Some(&rec(header)), Some(&rec(sample)), &DetectOptions::default()).unwrap()
    }

    #[test]
    fn flags_filter_drops_inbound() {
        let p = profile(&["DateCreated", "Flags"], &["2020-09-10 10:00:00", "2"]);
        let n = Normalizer::new(&p, Bounds::default());

        assert!(matches!(
            n.normalize(2, &rec(&["2020-09-10 10:00:00", "2"])).unwrap(),
            RowOutcome::Accepted(_)
        ));
        assert_eq!(
            n.normalize(3, &rec(&["2020-09-10 10:00:00", "1"])).unwrap(),
            RowOutcome::NotOutbound
        );
    }

    #[test]
    fn filtered_rows_are_not_parsed() {
        let p = profile(&["DateCreated", "Direction"], &["2020-09-10 10:00:00", "outbound-api"]);
        let n = Normalizer::new(&p, Bounds::default());
        // Garbage timestamp, but the row is inbound and never parsed.
        assert_eq!(
            n.normalize(2, &rec(&["garbage", "inbound"])).unwrap(),
            RowOutcome::NotOutbound
        );
    }

    #[test]
    fn queue_wait_shifts_arrival_back() {
        let p = profile(&["StartTime", "QueueTime"], &["2020-09-10 10:00:10", "0"]);
        let n = Normalizer::new(&p, Bounds::default());

        let outcome = n.normalize(2, &rec(&["2020-09-10 10:00:10", "2750"])).unwrap();
        let event = outcome.event().unwrap();
        assert_eq!(event.arrival_time, ts(10, 0, 8));
        assert_eq!(event.recorded_wait_seconds, Some(2.75));

        let outcome = n.normalize(3, &rec(&["2020-09-10 10:00:10", "0"])).unwrap();
        assert_eq!(outcome.event().unwrap().arrival_time, ts(10, 0, 10));
    }

    #[test]
    fn window_applies_to_adjusted_arrival() {
        let p = profile(&["StartTime", "QueueTime"], &["2020-09-10 10:00:10", "0"]);
        let bounds = Bounds {
            start: Some(ts(10, 0, 10)),
            end: None,
        };
        let n = Normalizer::new(&p, bounds);

        // Starts inside the window, but arrived a second before it.
        let outcome = n.normalize(2, &rec(&["2020-09-10 10:00:10", "1000"])).unwrap();
        assert!(matches!(outcome, RowOutcome::OutsideWindow(_)));
        assert_eq!(outcome.event().unwrap().recorded_wait_seconds, Some(1.0));
    }

    #[test]
    fn end_bound_is_exclusive() {
        let p = profile(&["StartTime"], &["2020-09-10 10:00:00"]);
        let n = Normalizer::new(
            &p,
            Bounds {
                start: None,
                end: Some(ts(11, 0, 0)),
            },
        );
        assert!(matches!(
            n.normalize(2, &rec(&["2020-09-10 11:00:00"])).unwrap(),
            RowOutcome::OutsideWindow(_)
        ));
        assert!(matches!(
            n.normalize(3, &rec(&["2020-09-10 10:59:59"])).unwrap(),
            RowOutcome::Accepted(_)
        ));
    }

    #[test]
    fn bad_timestamp_reports_row() {
        let p = profile(&["Sid", "StartTime"], &["CA1", "2020-09-10 10:00:00"]);
        let n = Normalizer::new(&p, Bounds::default());
        let err = n.normalize(7, &rec(&["CA9", "not a date"])).unwrap_err();
        match err {
            Error::RowParse { line, field, row, .. } => {
                assert_eq!(line, 7);
                assert_eq!(field, "column StartTime");
                assert_eq!(row, "CA9,not a date");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn bad_flags_and_wait_are_fatal() {
        let p = profile(
            &["StartTime", "Flags", "QueueTime"],
            &["2020-09-10 10:00:00", "2", "0"],
        );
        let n = Normalizer::new(&p, Bounds::default());
        assert!(n
            .normalize(2, &rec(&["2020-09-10 10:00:00", "two", "0"]))
            .is_err());
        assert!(n
            .normalize(3, &rec(&["2020-09-10 10:00:00", "2", "-5"]))
            .is_err());
        assert!(n
            .normalize(4, &rec(&["2020-09-10 10:00:00", "2", "soon"]))
            .is_err());
    }

    #[test]
    fn huge_wait_is_a_row_error() {
        let p = profile(&["StartTime", "QueueTime"], &["2020-09-10 10:00:10", "0"]);
        let n = Normalizer::new(&p, Bounds::default());
        for wait in ["1e20", "1e15", "1e300"] {
            match n.normalize(2, &rec(&["2020-09-10 10:00:10", wait])) {
                Err(Error::RowParse { line, reason, row, .. }) => {
                    assert_eq!(line, 2);
                    assert!(reason.contains("out of range"));
                    assert!(row.contains(wait));
                }
                other => panic!("unexpected outcome for {wait}: {other:?}"),
            }
        }
    }

    #[test]
    fn short_row_is_fatal() {
        let p = profile(&["Sid", "StartTime"], &["CA1", "2020-09-10 10:00:00"]);
        let n = Normalizer::new(&p, Bounds::default());
        assert!(matches!(
            n.normalize(2, &rec(&["CA1"])),
            Err(Error::RowParse { .. })
        ));
    }

    #[test]
    fn aware_rows_convert_to_profile_zone() {
        // Profile offset comes from the first data row (-07:00).
        let p = profile(&["DateCreated"], &["Sat, 12 Sep 2020 10:30:05 -0700"]);
        let n = Normalizer::new(&p, Bounds::default());
        let outcome = n
            .normalize(3, &rec(&["Sat, 12 Sep 2020 18:30:05 +0000"]))
            .unwrap();
        let expected = NaiveDate::from_ymd_opt(2020, 9, 12)
            .unwrap()
            .and_hms_opt(11, 30, 5)
            .unwrap();
        assert_eq!(outcome.event().unwrap().arrival_time, expected);
    }
}
