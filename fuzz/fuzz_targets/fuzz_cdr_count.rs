//! Fuzz target for CDR detection and counting.
//!
//! Arbitrary tables must yield a profile and counts or an error, never a panic.

#![no_main]

use cps_core::logging::LogContext;
use cps_core::pipeline::{count_calls, CountOptions};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let ctx = LogContext::new("run-fuzz");
    let _ = count_calls(data, &CountOptions::default(), &ctx);
});
