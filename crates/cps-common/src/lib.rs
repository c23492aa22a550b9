//! CDR CPS common types and errors.
//!
//! This crate provides foundational types shared across the cps crates:
//! - The error taxonomy used by every pipeline stage
//! - Output format specifications
//! - CDR layout hints shared by configuration and detection

pub mod error;
pub mod layout;
pub mod output;

pub use error::{format_error_human, Error, ErrorCategory, Result, StructuredError};
pub use layout::Layout;
pub use output::OutputFormat;
