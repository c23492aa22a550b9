//! CDR CPS math utilities.
//!
//! Pure functions over dense per-second arrays: the queue delay recurrence,
//! windowed maxima, and the summary histograms.

pub mod math;

pub use math::histogram::*;
pub use math::maxima::*;
pub use math::queue::*;
pub use math::summary::*;
