//! Dense, gap-filled per-second series.

use chrono::NaiveDateTime;

use cps_common::{Error, Result};

use super::window::TimeWindow;

/// One arrival count per second of a window; idle seconds are zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DenseSeries {
    window: TimeWindow,
    counts: Vec<u32>,
}

/// Result of materializing sparse entries into a window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Materialized {
    pub series: DenseSeries,
    /// Entries that fell outside the window and were ignored.
    pub out_of_range: usize,
}

impl DenseSeries {
    pub fn window(&self) -> TimeWindow {
        self.window
    }

    pub fn counts(&self) -> &[u32] {
        &self.counts
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// `(timestamp, count)` for every second of the window.
    pub fn iter(&self) -> impl Iterator<Item = (NaiveDateTime, u32)> + '_ {
        self.counts
            .iter()
            .enumerate()
            .map(|(i, &c)| (self.window.timestamp_at(i), c))
    }

    /// Non-zero slots as sparse entries, in time order.
    pub fn to_sparse(&self) -> Vec<(NaiveDateTime, u32)> {
        self.iter().filter(|&(_, c)| c > 0).collect()
    }
}

/// Expand sparse `(second, count)` entries over `window`.
///
/// Entries outside the window are skipped and counted. A second that appears
/// twice is an error, as is a window with no entries in range.
pub fn materialize<I>(entries: I, window: TimeWindow) -> Result<Materialized>
where
    I: IntoIterator<Item = (NaiveDateTime, u32)>,
{
    let len = window.len_seconds();
    let mut counts = vec![0u32; len];
    let mut seen = vec![false; len];
    let mut out_of_range = 0usize;
    let mut written = 0usize;

    for (timestamp, count) in entries {
        let Some(i) = window.offset_of(timestamp) else {
            out_of_range += 1;
            continue;
        };
        if seen[i] {
            return Err(Error::DuplicateTimestamp {
                timestamp,
                first: counts[i],
                second: count,
            });
        }
        seen[i] = true;
        counts[i] = count;
        written += 1;
    }

    if written == 0 {
        return Err(Error::NoEvents);
    }

    Ok(Materialized {
        series: DenseSeries { window, counts },
        out_of_range,
    })
}
