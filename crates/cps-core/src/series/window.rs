//! Closed-open analysis windows.

use chrono::{NaiveDateTime, TimeDelta};
use serde::Serialize;

use cps_common::{Error, Result};

/// Optional caller bounds: inclusive start, exclusive end.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Bounds {
    pub start: Option<NaiveDateTime>,
    pub end: Option<NaiveDateTime>,
}

impl Bounds {
    pub fn new(start: Option<NaiveDateTime>, end: Option<NaiveDateTime>) -> Self {
        Bounds { start, end }
    }

    pub fn contains(&self, t: NaiveDateTime) -> bool {
        self.start.map_or(true, |s| t >= s) && self.end.map_or(true, |e| t < e)
    }

}

/// Longest window a series may cover: one leap year of seconds.
pub const MAX_WINDOW_SECONDS: i64 = 366 * 86_400;

/// `[start, end)` covering a whole number of seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeWindow {
    start: NaiveDateTime,
    end: NaiveDateTime,
}

impl TimeWindow {
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Result<Self> {
        if end <= start {
            return Err(Error::EmptyWindow { start, end });
        }
        let span = end - start;
        if span.subsec_nanos() != 0 {
            return Err(Error::FractionalWindow { start, end });
        }
        if span.num_seconds() > MAX_WINDOW_SECONDS {
            return Err(Error::WindowTooLong {
                start,
                end,
                seconds: span.num_seconds(),
                limit: MAX_WINDOW_SECONDS,
            });
        }
        Ok(TimeWindow { start, end })
    }

    /// Fill missing bounds from observed data.
    ///
    /// `earliest` and `latest` are the extreme accepted arrivals; the derived
    /// end is one second past `latest`. No accepted arrivals is an error even
    /// when both bounds are given.
    pub fn resolve(
        bounds: Bounds,
        earliest: Option<NaiveDateTime>,
        latest: Option<NaiveDateTime>,
    ) -> Result<Self> {
        let (earliest, latest) = match (earliest, latest) {
            (Some(e), Some(l)) => (e, l),
            _ => return Err(Error::NoEvents),
        };
        let start = bounds.start.unwrap_or(earliest);
        let end = bounds.end.unwrap_or_else(|| {
            latest
                .checked_add_signed(TimeDelta::seconds(1))
                .unwrap_or(NaiveDateTime::MAX)
        });
        Self::new(start, end)
    }

    pub fn start(&self) -> NaiveDateTime {
        self.start
    }

    pub fn end(&self) -> NaiveDateTime {
        self.end
    }

    pub fn len_seconds(&self) -> usize {
        usize::try_from((self.end - self.start).num_seconds()).unwrap_or(0)
    }

    pub fn contains(&self, t: NaiveDateTime) -> bool {
        t >= self.start && t < self.end
    }

    /// Slot index of `t`, if it lies on a whole second inside the window.
    pub fn offset_of(&self, t: NaiveDateTime) -> Option<usize> {
        if !self.contains(t) {
            return None;
        }
        let delta = t - self.start;
        if delta.subsec_nanos() != 0 {
            return None;
        }
        usize::try_from(delta.num_seconds()).ok()
    }

    pub fn timestamp_at(&self, index: usize) -> NaiveDateTime {
        self.start + TimeDelta::seconds(index as i64)
    }
}
