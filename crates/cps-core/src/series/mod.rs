//! Per-second arrival series: aggregation, windowing and materialization.

pub mod aggregate;
pub mod canonical;
pub mod dense;
pub mod window;

pub use aggregate::{Aggregation, RowTally, SparseCounts};
pub use canonical::{read_canonical, write_canonical, CanonicalSeries};
pub use dense::{materialize, DenseSeries, Materialized};
pub use window::{Bounds, TimeWindow};
