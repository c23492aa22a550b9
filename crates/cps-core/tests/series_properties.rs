//! Property tests for series materialization.

use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use proptest::prelude::*;
use std::collections::BTreeMap;

use cps_core::series::{materialize, TimeWindow};

fn base() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 3, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

/// Sparse offsets with positive counts, keyed by second.
fn sparse_entries() -> impl Strategy<Value = BTreeMap<i64, u32>> {
    prop::collection::btree_map(0i64..5_000, 1u32..200, 1..64)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(300))]

    #[test]
    fn materialize_round_trips_sparse_counts(entries in sparse_entries(), slack in 0i64..100) {
        let last = *entries.keys().next_back().unwrap();
        let window = TimeWindow::new(base(), base() + TimeDelta::seconds(last + 1 + slack)).unwrap();
        let sparse: Vec<(NaiveDateTime, u32)> = entries
            .iter()
            .map(|(&s, &c)| (base() + TimeDelta::seconds(s), c))
            .collect();

        let materialized = materialize(sparse.iter().rev().copied(), window).unwrap();
        prop_assert_eq!(materialized.out_of_range, 0);
        prop_assert_eq!(materialized.series.len() as i64, last + 1 + slack);
        prop_assert_eq!(materialized.series.to_sparse(), sparse);
    }

    #[test]
    fn window_length_is_whole_seconds(start in 0i64..100_000, len in 1i64..100_000) {
        let window = TimeWindow::new(
            base() + TimeDelta::seconds(start),
            base() + TimeDelta::seconds(start + len),
        ).unwrap();
        prop_assert_eq!(window.len_seconds() as i64, len);
    }

    #[test]
    fn out_of_window_entries_are_counted(entries in sparse_entries(), cut in 1i64..5_000) {
        let window = TimeWindow::new(base(), base() + TimeDelta::seconds(cut)).unwrap();
        let outside = entries.keys().filter(|&&s| s >= cut).count();
        let sparse = entries.iter().map(|(&s, &c)| (base() + TimeDelta::seconds(s), c));

        match materialize(sparse, window) {
            Ok(m) => prop_assert_eq!(m.out_of_range, outside),
            Err(_) => prop_assert_eq!(outside, entries.len()),
        }
    }
}

#[test]
fn sub_second_window_is_rejected() {
    let start = base();
    let end = start + TimeDelta::milliseconds(1_500);
    assert!(TimeWindow::new(start, end).is_err());
}
