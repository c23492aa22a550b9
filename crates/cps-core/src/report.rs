//! Rendering of command results.
//!
//! Markdown-ish text goes to humans, JSON documents to scripts, summaries
//! to one-line status checks. Every renderer returns a string; printing is
//! left to the binary.

use std::io::Write;

use chrono::Utc;
use serde::Serialize;

use cps_common::{OutputFormat, Result};
use cps_math::{HistogramRow, SeriesSummary, Spread, WaitHistogram};

use crate::cdr::FormatProfile;
use crate::pipeline::{CapacityReport, CountOutcome};
use crate::series::{DenseSeries, RowTally, TimeWindow};

/// Version of the JSON documents emitted on stdout.
pub const REPORT_SCHEMA_VERSION: &str = "1.0.0";

const RULE: &str = "-----------------------------------------";

/// Wrap a payload in the standard JSON envelope.
pub fn json_envelope(command: &str, run_id: &str, payload: impl Serialize) -> Result<String> {
    let mut doc = serde_json::json!({
        "schema_version": REPORT_SCHEMA_VERSION,
        "command": command,
        "run_id": run_id,
        "generated_at": Utc::now().to_rfc3339(),
    });
    if let (Some(obj), serde_json::Value::Object(extra)) =
        (doc.as_object_mut(), serde_json::to_value(payload)?)
    {
        obj.extend(extra);
    }
    Ok(serde_json::to_string_pretty(&doc)?)
}

// ============================================================================
// detect
// ============================================================================

pub fn render_profile(profile: &FormatProfile, format: OutputFormat, run_id: &str) -> Result<String> {
    match format {
        OutputFormat::Json => json_envelope("detect", run_id, serde_json::json!({ "profile": profile })),
        OutputFormat::Summary => Ok(format!(
            "detect: {} export, start {} ({}), header {}",
            profile.vendor,
            profile.start_column,
            profile.datetime_format,
            if profile.has_header { "yes" } else { "no" }
        )),
        OutputFormat::Md => {
            let mut out = String::from("# CDR Format\n\n");
            out.push_str(&format!("Source:        {}\n", profile.vendor));
            out.push_str(&format!(
                "Header row:    {}\n",
                if profile.has_header { "yes" } else { "no" }
            ));
            out.push_str(&format!("Start time:    {}\n", profile.start_column));
            out.push_str(&format!(
                "Format:        {} (e.g. {})\n",
                profile.datetime_format,
                profile.datetime_format.example()
            ));
            out.push_str(&format!(
                "Timezone:      {}\n",
                profile
                    .timezone
                    .map_or_else(|| "none (naive local time)".to_string(), |o| o.to_string())
            ));
            match &profile.outbound_filter {
                Some(f) => out.push_str(&format!("Outbound:      {} ({})\n", f.column, f.convention)),
                None => out.push_str("Outbound:      no filter column; assuming pre-filtered\n"),
            }
            out.push_str(&format!(
                "Queue time:    {}\n",
                profile
                    .queue_wait_column
                    .as_ref()
                    .map_or_else(|| "none".to_string(), |c| c.to_string())
            ));
            Ok(out)
        }
    }
}

// ============================================================================
// count
// ============================================================================

#[derive(Debug, Serialize)]
struct CountDocument<'a> {
    profile: &'a FormatProfile,
    tally: RowTally,
    seconds_written: u64,
    output: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    spread: Option<Vec<HistogramRow<u32>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    queue_times: Option<Vec<HistogramRow<f64>>>,
}

/// Which optional histograms to include in a count report.
#[derive(Debug, Clone, Copy, Default)]
pub struct CountSections {
    pub spread: bool,
    pub queue_times: bool,
}

pub fn render_count(
    outcome: &CountOutcome,
    seconds_written: u64,
    output: &str,
    sections: CountSections,
    format: OutputFormat,
    run_id: &str,
) -> Result<String> {
    let agg = &outcome.aggregation;
    let spread = agg.counts.spread();
    match format {
        OutputFormat::Json => json_envelope(
            "count",
            run_id,
            CountDocument {
                profile: &outcome.profile,
                tally: agg.tally,
                seconds_written,
                output,
                spread: sections.spread.then(|| spread.to_rows()),
                queue_times: sections.queue_times.then(|| agg.waits.to_rows()),
            },
        ),
        OutputFormat::Summary => Ok(format!(
            "count: {} records read, {} counted, {} seconds written to {}",
            agg.tally.rows_read, agg.tally.counted, seconds_written, output
        )),
        OutputFormat::Md => {
            let mut out = format!(
                "{} records read, {} records counted, {} seconds written to {}\n",
                agg.tally.rows_read, agg.tally.counted, seconds_written, output
            );
            if sections.spread {
                out.push_str(&render_spread(&spread));
            }
            if sections.queue_times {
                out.push_str(&render_queue_times(&agg.waits));
            }
            Ok(out)
        }
    }
}

pub fn render_spread(spread: &Spread) -> String {
    let mut out = String::from("\nSpread\n------\n");
    for (cps, seconds) in spread.iter() {
        out.push_str(&format!("{:4} CPS: x {}\n", cps, seconds));
    }
    out
}

pub fn render_queue_times(waits: &WaitHistogram) -> String {
    if waits.is_empty() {
        return "\nNo queue times were recorded\n".to_string();
    }
    let mut out = String::from("\nQueue Time Estimates\n--------------------\n");
    for (wait, n) in waits.iter() {
        out.push_str(&format!("{:6.2} secs: x {}\n", wait.into_inner(), n));
    }
    out
}

// ============================================================================
// analyze
// ============================================================================

/// Everything `analyze` reports for one series.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub window: TimeWindow,
    pub summary: SeriesSummary,
    pub capacities: Vec<CapacityReport>,
}

pub fn render_analysis(report: &AnalysisReport, format: OutputFormat, run_id: &str) -> Result<String> {
    match format {
        OutputFormat::Json => json_envelope("analyze", run_id, report),
        OutputFormat::Summary => {
            let s = &report.summary;
            let mut out = format!(
                "analyze: {} seconds, {} calls, peak {} CPS at {}",
                s.seconds, s.total_calls, s.peak_cps, s.peak_time
            );
            for c in &report.capacities {
                if let Some(w) = &c.worst {
                    out.push_str(&format!(
                        "; {} CPS worst {:.1} s at {}",
                        c.capacity, w.peak_delay_seconds, w.peak_time
                    ));
                }
            }
            Ok(out)
        }
        OutputFormat::Md => {
            let mut out = render_summary(&report.summary);
            for c in &report.capacities {
                out.push('\n');
                out.push_str(&render_maxima(c));
            }
            Ok(out)
        }
    }
}

/// Render one capacity on its own, as the interactive prompt does.
pub fn render_capacity(report: &CapacityReport, format: OutputFormat, run_id: &str) -> Result<String> {
    match format {
        OutputFormat::Json => json_envelope("analyze", run_id, serde_json::json!({ "capacity": report })),
        OutputFormat::Summary => Ok(match &report.worst {
            Some(w) => format!(
                "{} CPS: worst {:.1} s at {}",
                report.capacity, w.peak_delay_seconds, w.peak_time
            ),
            None => format!("{} CPS: no delay", report.capacity),
        }),
        OutputFormat::Md => Ok(render_maxima(report)),
    }
}

pub fn render_summary(s: &SeriesSummary) -> String {
    let mut out = String::new();
    out.push_str(&format!("Period:        {} to {} ({} seconds)\n", s.start, s.end, s.seconds));
    out.push_str(&format!("Total calls:   {}\n", s.total_calls));
    out.push_str(&format!("Peak:          {} CPS at {}\n", s.peak_cps, s.peak_time));
    out.push_str(&format!("Mean:          {:.3} CPS\n", s.mean_cps));
    out.push_str(&format!("Busy seconds:  {}\n", s.busy_seconds));
    out
}

/// Daily maxima block for one capacity.
pub fn render_maxima(report: &CapacityReport) -> String {
    let mut out = format!("{RULE}\nDaily maximum call queue times at {} CPS:\n{RULE}\n", report.capacity);
    for m in &report.daily_maxima {
        out.push_str(&format!(
            "{}: {:6.1} seconds at {}\n",
            m.peak_time.format("%a %Y-%m-%d"),
            m.peak_delay_seconds,
            m.peak_time.format("%H:%M:%S")
        ));
    }
    out
}

/// Write the full per-second series as CSV, one delay column per capacity.
///
/// Header: `timestamp,arrivals,delay_<capacity>...`.
pub fn write_delay_series<W: Write>(
    writer: W,
    series: &DenseSeries,
    reports: &[CapacityReport],
) -> Result<u64> {
    let mut out = csv::Writer::from_writer(writer);

    let mut header = vec!["timestamp".to_string(), "arrivals".to_string()];
    header.extend(reports.iter().map(|r| format!("delay_{}", r.capacity)));
    out.write_record(&header)?;

    let mut rows = 0u64;
    for (i, (timestamp, arrivals)) in series.iter().enumerate() {
        let mut record = vec![
            timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
            arrivals.to_string(),
        ];
        record.extend(
            reports
                .iter()
                .map(|r| r.delays.get(i).map_or_else(String::new, |d| format!("{:.3}", d))),
        );
        out.write_record(&record)?;
        rows += 1;
    }
    out.flush()?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::LogContext;
    use crate::pipeline::{analyze_capacity, load_series, summarize_series};
    use crate::series::Bounds;

    fn analysis() -> (DenseSeries, AnalysisReport) {
        let ctx = LogContext::new("run-report000000");
        let data = "2024-01-01 00:00:02,5\n2024-01-01 00:00:00,0\n2024-01-01 00:00:04,0\n";
        let loaded = load_series(data.as_bytes(), Bounds::default(), &ctx).unwrap();
        let report = analyze_capacity(&loaded.series, 1.0, &ctx).unwrap();
        let analysis = AnalysisReport {
            window: loaded.series.window(),
            summary: summarize_series(&loaded.series),
            capacities: vec![report],
        };
        (loaded.series, analysis)
    }

    #[test]
    fn profile_layout_has_one_field_per_line() {
        use crate::cdr::{detect_format, DetectOptions};
        use csv::StringRecord;

        let header = StringRecord::from(vec!["Sid", "DateCreated", "Flags", "QueueTime"]);
        let row = StringRecord::from(vec!["CA1", "Sat, 12 Sep 2020 10:30:05 -0700", "2", "1500"]);
        let profile = detect_format(Some(&header), Some(&row), &DetectOptions::default()).unwrap();

        let text = render_profile(&profile, OutputFormat::Md, "run-report000000").unwrap();
        assert!(text.ends_with('\n'));
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 9);
        assert_eq!(lines[0], "# CDR Format");
        assert_eq!(lines[1], "");
        assert_eq!(lines[3], "Header row:    yes");
        assert_eq!(lines[4], "Start time:    column DateCreated");
        assert!(lines[7].starts_with("Outbound:      column Flags ("));
        assert_eq!(lines[8], "Queue time:    column QueueTime");
    }

    #[test]
    fn maxima_block_layout() {
        let (_, analysis) = analysis();
        let text = render_maxima(&analysis.capacities[0]);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], RULE);
        assert_eq!(lines[1], "Daily maximum call queue times at 1 CPS:");
        assert_eq!(lines[3], "Mon 2024-01-01:    4.0 seconds at 00:00:02");
    }

    #[test]
    fn spread_and_queue_layout() {
        let spread = Spread::from_counts([1, 1, 12]);
        assert_eq!(render_spread(&spread), "\nSpread\n------\n   1 CPS: x 2\n  12 CPS: x 1\n");

        let mut waits = WaitHistogram::new();
        assert_eq!(render_queue_times(&waits), "\nNo queue times were recorded\n");
        waits.record_wait(1.5);
        assert!(render_queue_times(&waits).contains("  1.50 secs: x 1"));
    }

    #[test]
    fn json_analysis_has_envelope_and_maxima() {
        let (_, analysis) = analysis();
        let json = render_analysis(&analysis, OutputFormat::Json, "run-report000000").unwrap();
        let v: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(v["schema_version"], REPORT_SCHEMA_VERSION);
        assert_eq!(v["command"], "analyze");
        assert_eq!(v["run_id"], "run-report000000");
        assert_eq!(v["summary"]["total_calls"], 5);
        let maxima = &v["capacities"][0]["daily_maxima"];
        assert_eq!(maxima[0]["peak_delay_seconds"], 4.0);
        assert_eq!(maxima[0]["day_index"], 0);
        assert!(v["capacities"][0].get("delays").is_none());
    }

    #[test]
    fn summary_is_one_line() {
        let (_, analysis) = analysis();
        let line = render_analysis(&analysis, OutputFormat::Summary, "r").unwrap();
        assert!(!line.contains('\n'));
        assert!(line.contains("peak 5 CPS"));
        assert!(line.contains("1 CPS worst 4.0 s"));
    }

    #[test]
    fn delay_csv_covers_every_second() {
        let (series, analysis) = analysis();
        let mut buf = Vec::new();
        let rows = write_delay_series(&mut buf, &series, &analysis.capacities).unwrap();
        assert_eq!(rows, 5);
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "timestamp,arrivals,delay_1");
        assert_eq!(lines[3], "2024-01-01 00:00:02,5,4.000");
        assert_eq!(lines.len(), 6);
    }
}
