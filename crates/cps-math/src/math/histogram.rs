//! Ordered frequency histograms.
//!
//! Used for the CPS spread (how many seconds saw N calls) and for the
//! distribution of recorded queue waits.

use ordered_float::OrderedFloat;
use serde::Serialize;
use std::collections::BTreeMap;

/// Count of occurrences per key, iterated in ascending key order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Histogram<K: Ord> {
    bins: BTreeMap<K, u64>,
}

impl<K: Ord> Default for Histogram<K> {
    fn default() -> Self {
        Self {
            bins: BTreeMap::new(),
        }
    }
}

impl<K: Ord + Copy> Histogram<K> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, key: K) {
        self.record_n(key, 1);
    }

    pub fn record_n(&mut self, key: K, n: u64) {
        *self.bins.entry(key).or_insert(0) += n;
    }

    pub fn count(&self, key: &K) -> u64 {
        self.bins.get(key).copied().unwrap_or(0)
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.bins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    /// Sum of all counts.
    pub fn total(&self) -> u64 {
        self.bins.values().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (K, u64)> + '_ {
        self.bins.iter().map(|(k, n)| (*k, *n))
    }
}

/// One serialized bin.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistogramRow<V> {
    pub value: V,
    pub count: u64,
}

/// Calls-per-second value to number of seconds with that value.
pub type Spread = Histogram<u32>;

/// Queue wait in seconds to number of rows reporting it.
pub type WaitHistogram = Histogram<OrderedFloat<f64>>;

impl Spread {
    /// Build a spread from per-second counts.
    ///
    /// Pass sparse counts to describe only the seconds that saw traffic, or a
    /// dense series to include the idle seconds as a zero bin.
    pub fn from_counts(counts: impl IntoIterator<Item = u32>) -> Self {
        let mut spread = Self::new();
        for c in counts {
            spread.record(c);
        }
        spread
    }

    pub fn to_rows(&self) -> Vec<HistogramRow<u32>> {
        self.iter()
            .map(|(value, count)| HistogramRow { value, count })
            .collect()
    }
}

impl WaitHistogram {
    pub fn record_wait(&mut self, seconds: f64) {
        self.record(OrderedFloat(seconds));
    }

    pub fn to_rows(&self) -> Vec<HistogramRow<f64>> {
        self.iter()
            .map(|(value, count)| HistogramRow {
                value: value.into_inner(),
                count,
            })
            .collect()
    }
}
