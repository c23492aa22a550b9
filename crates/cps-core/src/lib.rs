//! CDR CPS Core Library
//!
//! This library provides the pipeline behind the `cps-core` binary:
//! - CDR format detection and row normalization
//! - Per-second arrival aggregation and the canonical series file
//! - Dense series materialization and capacity analysis
//! - Report rendering, structured logging and exit codes
//!
//! The binary entry point is in `main.rs`.

pub mod cdr;
pub mod exit_codes;
pub mod logging;
pub mod pipeline;
pub mod report;
pub mod series;
