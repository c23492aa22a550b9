//! Fixed-capacity FIFO queue delay simulation.
//!
//! The queue starts empty. Each second, the calls offered are added to the
//! backlog and `capacity` calls are served; the backlog never goes below
//! zero and has no upper bound. The delay reported for a second is the
//! backlog expressed in seconds of service at that capacity.

use cps_common::{Error, Result};

/// Reject capacities that cannot drive the recurrence.
pub fn validate_capacity(capacity: f64) -> Result<()> {
    if capacity.is_finite() && capacity > 0.0 {
        Ok(())
    } else {
        Err(Error::InvalidCapacity { capacity })
    }
}

/// Backlog (calls waiting) after each second.
///
/// `queue(-1) = 0`, `queue(i) = max(0, queue(i-1) + arrivals[i] - capacity)`.
pub fn simulate_backlog(arrivals: &[u32], capacity: f64) -> Result<Vec<f64>> {
    validate_capacity(capacity)?;

    let mut backlog = Vec::with_capacity(arrivals.len());
    let mut queue = 0.0_f64;
    for &offered in arrivals {
        queue = (queue + f64::from(offered) - capacity).max(0.0);
        backlog.push(queue);
    }
    Ok(backlog)
}

/// Queue delay in seconds for each second of the series.
///
/// Same length and indexing as `arrivals`. Re-run from scratch for each
/// capacity; nothing is carried between calls.
pub fn simulate_delay(arrivals: &[u32], capacity: f64) -> Result<Vec<f64>> {
    let mut delays = simulate_backlog(arrivals, capacity)?;
    for d in delays.iter_mut() {
        *d /= capacity;
    }
    Ok(delays)
}
