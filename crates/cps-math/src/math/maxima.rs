//! Windowed maxima over a delay series.

use chrono::{NaiveDateTime, TimeDelta};
use serde::Serialize;

/// Length of a day window in seconds.
pub const SECONDS_PER_DAY: usize = 86_400;

/// The largest delay within one day window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyMaximum {
    /// Zero-based index of the window from the start of the series.
    pub day_index: usize,
    /// Second at which the peak occurred (earliest on ties).
    pub peak_time: NaiveDateTime,
    pub peak_delay_seconds: f64,
}

/// Index of the largest value; the first index wins on ties.
///
/// Returns None for an empty slice.
pub fn first_argmax(values: &[f64]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, &v) in values.iter().enumerate() {
        match best {
            Some((_, b)) if v <= b => {}
            _ => best = Some((i, v)),
        }
    }
    best.map(|(i, _)| i)
}

/// Maxima of consecutive windows of `window_len` seconds tiling the series.
///
/// Windows start at offset 0; the last one may be shorter. An all-zero
/// window still reports its first second.
pub fn windowed_maxima(
    delays: &[f64],
    series_start: NaiveDateTime,
    window_len: usize,
) -> Vec<DailyMaximum> {
    if window_len == 0 {
        return Vec::new();
    }

    delays
        .chunks(window_len)
        .enumerate()
        .filter_map(|(day_index, window)| {
            let local = first_argmax(window)?;
            let index = day_index * window_len + local;
            Some(DailyMaximum {
                day_index,
                peak_time: series_start + TimeDelta::seconds(index as i64),
                peak_delay_seconds: window[local],
            })
        })
        .collect()
}

/// One maximum per 24-hour window, aligned to the start of the series.
pub fn daily_maxima(delays: &[f64], series_start: NaiveDateTime) -> Vec<DailyMaximum> {
    windowed_maxima(delays, series_start, SECONDS_PER_DAY)
}
