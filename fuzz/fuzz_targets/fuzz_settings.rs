//! Fuzz target for cps.json settings parsing and validation.

#![no_main]

use cps_config::{validate_settings, Settings};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(settings) = serde_json::from_slice::<Settings>(data) {
        let _ = validate_settings(&settings);
    }
});
