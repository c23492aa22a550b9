//! Descriptive statistics for a dense CPS series.

use chrono::{NaiveDateTime, TimeDelta};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesSummary {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub seconds: usize,
    pub total_calls: u64,
    pub peak_cps: u32,
    /// First second reaching `peak_cps`.
    pub peak_time: NaiveDateTime,
    pub mean_cps: f64,
    pub busy_seconds: usize,
}

/// Summarize `counts`, where index 0 corresponds to `start`.
pub fn summarize(counts: &[u32], start: NaiveDateTime) -> SeriesSummary {
    let total_calls: u64 = counts.iter().map(|&c| u64::from(c)).sum();

    let mut peak_cps = 0u32;
    let mut peak_index = 0usize;
    for (i, &c) in counts.iter().enumerate() {
        if c > peak_cps {
            peak_cps = c;
            peak_index = i;
        }
    }

    let mean_cps = if counts.is_empty() {
        0.0
    } else {
        total_calls as f64 / counts.len() as f64
    };

    SeriesSummary {
        start,
        end: start + TimeDelta::seconds(counts.len() as i64),
        seconds: counts.len(),
        total_calls,
        peak_cps,
        peak_time: start + TimeDelta::seconds(peak_index as i64),
        mean_cps,
        busy_seconds: counts.iter().filter(|&&c| c > 0).count(),
    }
}
