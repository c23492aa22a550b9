//! Core math modules.

pub mod histogram;
pub mod maxima;
pub mod queue;
pub mod summary;
