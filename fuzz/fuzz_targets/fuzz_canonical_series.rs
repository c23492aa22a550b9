//! Fuzz target for canonical series loading and simulation.
//!
//! Run with `-rss_limit_mb`: a series spanning decades is allocated in full.

#![no_main]

use cps_core::logging::LogContext;
use cps_core::pipeline::{analyze_capacity, load_series};
use cps_core::series::Bounds;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let ctx = LogContext::new("run-fuzz");
    if let Ok(loaded) = load_series(data, Bounds::default(), &ctx) {
        let _ = analyze_capacity(&loaded.series, 1.0, &ctx);
    }
});
