//! End-to-end pipelines behind the `count` and `analyze` commands.
//!
//! All configuration arrives through the option structs; the only ambient
//! state is the tracing subscriber.

use std::io::Read;

use serde::Serialize;

use cps_common::Result;
use cps_math::{daily_maxima, simulate_delay, summarize, DailyMaximum, SeriesSummary};

use crate::cdr::{CdrSource, DetectOptions, FormatProfile, Normalizer, RowOutcome};
use crate::log_event;
use crate::logging::{event_names, LogContext, Stage};
use crate::series::{
    materialize, read_canonical, Aggregation, Bounds, DenseSeries, TimeWindow,
};

/// Options for turning a CDR table into per-second counts.
#[derive(Debug, Clone, Default)]
pub struct CountOptions {
    pub detect: DetectOptions,
    pub bounds: Bounds,
}

/// Result of a count run.
#[derive(Debug, Clone)]
pub struct CountOutcome {
    pub profile: FormatProfile,
    pub aggregation: Aggregation,
}

/// Detect the FormatProfile of a CDR table.
pub fn detect_profile<R: Read>(
    reader: R,
    options: &DetectOptions,
    ctx: &LogContext,
) -> Result<FormatProfile> {
    let source = CdrSource::from_reader(reader)?;
    detect_logged(&source, options, ctx)
}

fn detect_logged<R: Read>(
    source: &CdrSource<R>,
    options: &DetectOptions,
    ctx: &LogContext,
) -> Result<FormatProfile> {
    match source.detect(options) {
        Ok(profile) => {
            log_event!(ctx, INFO, event_names::DETECT_FINISHED, Stage::Detect,
                format!("CDR file looks like a {} export", profile.vendor),
                has_header = profile.has_header,
                start_column = %profile.start_column,
                datetime_format = %profile.datetime_format,
                timezone = ?profile.timezone);
            Ok(profile)
        }
        Err(err) => {
            log_event!(ctx, ERROR, event_names::DETECT_FAILED, Stage::Detect,
                err.to_string(), code = err.code());
            Err(err)
        }
    }
}

/// Detect, normalize and aggregate a CDR table in one pass.
pub fn count_calls<R: Read>(
    reader: R,
    options: &CountOptions,
    ctx: &LogContext,
) -> Result<CountOutcome> {
    let source = CdrSource::from_reader(reader)?;
    let profile = detect_logged(&source, &options.detect, ctx)?;

    let normalizer = Normalizer::new(&profile, options.bounds);
    let mut aggregation = Aggregation::new();

    for row in source.into_rows(profile.has_header) {
        let (line, record) = row?;
        let outcome = normalizer.normalize(line, &record).inspect_err(|err| {
            log_event!(ctx, ERROR, event_names::NORMALIZE_ROW_FAILED, Stage::Normalize,
                err.to_string(), line = line);
        })?;
        if outcome == RowOutcome::NotOutbound {
            log_event!(ctx, DEBUG, event_names::NORMALIZE_ROW_SKIPPED, Stage::Normalize,
                "not an outbound API call", line = line);
        }
        aggregation.observe(&outcome);
    }

    let tally = aggregation.tally;
    log_event!(ctx, INFO, event_names::NORMALIZE_FINISHED, Stage::Normalize,
        format!("{} records read, {} records counted", tally.rows_read, tally.counted),
        rows_read = tally.rows_read,
        not_outbound = tally.not_outbound,
        outside_window = tally.outside_window,
        counted = tally.counted);
    log_event!(ctx, INFO, event_names::AGGREGATE_FINISHED, Stage::Aggregate,
        format!("{} distinct seconds with arrivals", aggregation.counts.len()),
        seconds = aggregation.counts.len() as u64,
        recorded_waits = aggregation.waits.total());

    Ok(CountOutcome {
        profile,
        aggregation,
    })
}

/// A dense series loaded from a canonical file.
#[derive(Debug, Clone)]
pub struct LoadedSeries {
    pub series: DenseSeries,
    pub lines_read: u64,
    pub lines_kept: u64,
}

/// Read a canonical file, resolve the window and materialize it.
pub fn load_series<R: Read>(reader: R, bounds: Bounds, ctx: &LogContext) -> Result<LoadedSeries> {
    let canonical = read_canonical(reader, bounds)?;
    let lines_kept = canonical.entries.len() as u64;
    log_event!(ctx, INFO, event_names::CANONICAL_LOADED, Stage::Aggregate,
        format!("{} entries read, {} kept", canonical.lines_read, lines_kept),
        earliest = ?canonical.earliest,
        latest = ?canonical.latest);

    let window = TimeWindow::resolve(bounds, canonical.earliest, canonical.latest)?;
    let materialized = materialize(canonical.entries, window)?;
    if materialized.out_of_range > 0 {
        log_event!(ctx, WARN, event_names::MATERIALIZE_OUT_OF_RANGE, Stage::Materialize,
            format!("ignored {} entries outside the window", materialized.out_of_range),
            ignored = materialized.out_of_range as u64);
    }
    log_event!(ctx, INFO, event_names::MATERIALIZE_FINISHED, Stage::Materialize,
        format!("series covers {} seconds", materialized.series.len()),
        start = %window.start(),
        end = %window.end());

    Ok(LoadedSeries {
        series: materialized.series,
        lines_read: canonical.lines_read,
        lines_kept,
    })
}

/// Simulation results for one capacity.
#[derive(Debug, Clone, Serialize)]
pub struct CapacityReport {
    pub capacity: f64,
    pub daily_maxima: Vec<DailyMaximum>,
    /// Largest daily maximum (earliest day on ties).
    pub worst: Option<DailyMaximum>,
    #[serde(skip)]
    pub delays: Vec<f64>,
}

/// Simulate the queue at `capacity` and extract daily maxima.
pub fn analyze_capacity(
    series: &DenseSeries,
    capacity: f64,
    ctx: &LogContext,
) -> Result<CapacityReport> {
    let delays = simulate_delay(series.counts(), capacity).inspect_err(|err| {
        log_event!(ctx, ERROR, event_names::SIMULATE_REJECTED, Stage::Simulate,
            err.to_string(), capacity = capacity);
    })?;
    let daily_maxima = daily_maxima(&delays, series.window().start());

    let mut worst: Option<&DailyMaximum> = None;
    for m in &daily_maxima {
        if worst.map_or(true, |w| m.peak_delay_seconds > w.peak_delay_seconds) {
            worst = Some(m);
        }
    }
    let worst = worst.cloned();

    log_event!(ctx, INFO, event_names::SIMULATE_FINISHED, Stage::Simulate,
        format!("simulated {} seconds at {} CPS", delays.len(), capacity),
        capacity = capacity,
        days = daily_maxima.len() as u64,
        worst_delay = worst.as_ref().map_or(0.0, |w| w.peak_delay_seconds));

    Ok(CapacityReport {
        capacity,
        daily_maxima,
        worst,
        delays,
    })
}

/// Summary statistics for a loaded series.
pub fn summarize_series(series: &DenseSeries) -> SeriesSummary {
    summarize(series.counts(), series.window().start())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime};
    use cps_common::Error;

    fn ctx() -> LogContext {
        LogContext::new("run-test00000000")
    }

    fn t(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2020, 9, 10)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    const CONSOLE: &str = "\
Date,Direction,To
14:52:06 EDT 2020-09-10,Outgoing API,+1555
14:52:06 EDT 2020-09-10,Outgoing API,+1556
14:52:06 EDT 2020-09-10,Incoming,+1557
14:52:09 EDT 2020-09-10,outbound-api,+1558
";

    #[test]
    fn count_console_export() {
        let outcome = count_calls(CONSOLE.as_bytes(), &CountOptions::default(), &ctx()).unwrap();
        let agg = &outcome.aggregation;
        assert_eq!(agg.counts.get(&t(14, 52, 6)), 2);
        assert_eq!(agg.counts.get(&t(14, 52, 9)), 1);
        assert_eq!(agg.tally.rows_read, 4);
        assert_eq!(agg.tally.not_outbound, 1);
        assert_eq!(agg.tally.counted, 3);
    }

    #[test]
    fn count_stops_at_first_bad_row() {
        let data = "StartTime\n2020-09-10 10:00:00\nnope\n2020-09-10 10:00:01\n";
        let err = count_calls(data.as_bytes(), &CountOptions::default(), &ctx()).unwrap_err();
        assert!(matches!(err, Error::RowParse { line: 3, .. }));
    }

    #[test]
    fn load_series_derives_window() {
        let data = "2020-09-10 10:00:04,1\n2020-09-10 10:00:00,2\n";
        let loaded = load_series(data.as_bytes(), Bounds::default(), &ctx()).unwrap();
        assert_eq!(loaded.series.counts(), &[2, 0, 0, 0, 1]);
        assert_eq!(loaded.series.window().start(), t(10, 0, 0));
        assert_eq!(loaded.lines_read, 2);
    }

    #[test]
    fn load_series_rejects_duplicates() {
        let data = "2020-09-10 10:00:05,3\n2020-09-10 10:00:05,3\n";
        assert!(matches!(
            load_series(data.as_bytes(), Bounds::default(), &ctx()),
            Err(Error::DuplicateTimestamp { .. })
        ));
    }

    #[test]
    fn load_series_with_no_events_in_bounds() {
        let data = "2020-09-10 10:00:05,3\n";
        let bounds = Bounds::new(Some(t(11, 0, 0)), Some(t(12, 0, 0)));
        assert!(matches!(
            load_series(data.as_bytes(), bounds, &ctx()),
            Err(Error::NoEvents)
        ));
    }

    #[test]
    fn load_series_rejects_centuries_wide_window() {
        let data = "0001-01-01 00:00:00,1\n9999-12-31 23:59:59,1\n";
        assert!(matches!(
            load_series(data.as_bytes(), Bounds::default(), &ctx()),
            Err(Error::WindowTooLong { .. })
        ));
    }

    #[test]
    fn capacity_report_picks_worst_day() {
        let data = "2020-09-10 10:00:02,5\n2020-09-10 10:00:04,0\n";
        let loaded = load_series(data.as_bytes(), Bounds::new(Some(t(10, 0, 0)), None), &ctx()).unwrap();
        let report = analyze_capacity(&loaded.series, 1.0, &ctx()).unwrap();
        assert_eq!(report.delays, vec![0.0, 0.0, 4.0, 3.0, 2.0]);
        assert_eq!(report.daily_maxima.len(), 1);
        let worst = report.worst.unwrap();
        assert_eq!(worst.peak_delay_seconds, 4.0);
        assert_eq!(worst.peak_time, t(10, 0, 2));
    }

    #[test]
    fn non_positive_capacity_rejected() {
        let data = "2020-09-10 10:00:02,5\n";
        let loaded = load_series(data.as_bytes(), Bounds::default(), &ctx()).unwrap();
        assert!(matches!(
            analyze_capacity(&loaded.series, 0.0, &ctx()),
            Err(Error::InvalidCapacity { .. })
        ));
    }
}
