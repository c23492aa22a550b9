//! Arrival aggregation into per-second counts.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::Serialize;

use cps_math::{Spread, WaitHistogram};

use crate::cdr::RowOutcome;

/// Arrival count per whole second; only seconds with arrivals are present.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SparseCounts {
    counts: BTreeMap<NaiveDateTime, u32>,
}

impl SparseCounts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment(&mut self, t: NaiveDateTime) {
        *self.counts.entry(t).or_insert(0) += 1;
    }

    pub fn get(&self, t: &NaiveDateTime) -> u32 {
        self.counts.get(t).copied().unwrap_or(0)
    }

    /// Distinct seconds.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn total(&self) -> u64 {
        self.counts.values().map(|&c| u64::from(c)).sum()
    }

    /// Entries in ascending time order.
    pub fn iter(&self) -> impl Iterator<Item = (NaiveDateTime, u32)> + '_ {
        self.counts.iter().map(|(t, c)| (*t, *c))
    }

    /// Spread over the seconds that saw traffic.
    pub fn spread(&self) -> Spread {
        Spread::from_counts(self.counts.values().copied())
    }
}

impl FromIterator<(NaiveDateTime, u32)> for SparseCounts {
    fn from_iter<I: IntoIterator<Item = (NaiveDateTime, u32)>>(iter: I) -> Self {
        let mut counts = BTreeMap::new();
        for (t, c) in iter {
            *counts.entry(t).or_insert(0) += c;
        }
        SparseCounts { counts }
    }
}

/// Row tallies from one normalization pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RowTally {
    pub rows_read: u64,
    pub not_outbound: u64,
    pub outside_window: u64,
    pub counted: u64,
}

/// Running aggregation over normalized rows.
#[derive(Debug, Clone, Default)]
pub struct Aggregation {
    pub counts: SparseCounts,
    /// Recorded waits, collected before the window filter.
    pub waits: WaitHistogram,
    /// Earliest and latest accepted arrivals.
    pub earliest: Option<NaiveDateTime>,
    pub latest: Option<NaiveDateTime>,
    pub tally: RowTally,
}

impl Aggregation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, outcome: &RowOutcome) {
        self.tally.rows_read += 1;

        if let Some(wait) = outcome.event().and_then(|e| e.recorded_wait_seconds) {
            self.waits.record_wait(wait);
        }

        match outcome {
            RowOutcome::NotOutbound => self.tally.not_outbound += 1,
            RowOutcome::OutsideWindow(_) => self.tally.outside_window += 1,
            RowOutcome::Accepted(event) => {
                let t = event.arrival_time;
                self.tally.counted += 1;
                self.counts.increment(t);
                self.earliest = Some(self.earliest.map_or(t, |e| e.min(t)));
                self.latest = Some(self.latest.map_or(t, |l| l.max(t)));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cdr::CanonicalEvent;
    use chrono::NaiveDate;

    fn t(s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, s)
            .unwrap()
    }

    fn accepted(s: u32, wait: Option<f64>) -> RowOutcome {
        RowOutcome::Accepted(CanonicalEvent {
            arrival_time: t(s),
            recorded_wait_seconds: wait,
        })
    }

    #[test]
    fn counts_and_extremes() {
        let mut agg = Aggregation::new();
        for outcome in [accepted(7, None), accepted(3, None), accepted(7, None)] {
            agg.observe(&outcome);
        }
        assert_eq!(agg.counts.get(&t(7)), 2);
        assert_eq!(agg.counts.get(&t(3)), 1);
        assert_eq!(agg.counts.len(), 2);
        assert_eq!(agg.earliest, Some(t(3)));
        assert_eq!(agg.latest, Some(t(7)));
        assert_eq!(agg.tally.counted, 3);
    }

    #[test]
    fn waits_counted_before_window_filter() {
        let mut agg = Aggregation::new();
        agg.observe(&RowOutcome::OutsideWindow(CanonicalEvent {
            arrival_time: t(50),
            recorded_wait_seconds: Some(1.5),
        }));
        agg.observe(&accepted(1, Some(1.5)));
        agg.observe(&accepted(2, Some(0.0)));
        agg.observe(&RowOutcome::NotOutbound);

        let waits = agg.waits.to_rows();
        assert_eq!(waits.len(), 2);
        assert_eq!(waits[1].value, 1.5);
        assert_eq!(waits[1].count, 2);

        // Out-of-window arrivals don't move the extremes.
        assert_eq!(agg.latest, Some(t(2)));
        assert_eq!(
            agg.tally,
            RowTally {
                rows_read: 4,
                not_outbound: 1,
                outside_window: 1,
                counted: 2
            }
        );
    }

    #[test]
    fn spread_excludes_idle_seconds() {
        let counts: SparseCounts = [(t(0), 2), (t(5), 2), (t(9), 1)].into_iter().collect();
        let spread: Vec<_> = counts.spread().iter().collect();
        assert_eq!(spread, vec![(1, 1), (2, 2)]);
        assert_eq!(counts.total(), 5);
    }
}
