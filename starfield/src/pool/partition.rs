//! Dataset partitioning across workers.

use std::ops::Range;

use super::PoolError;

/// Splits `total` items into `workers` contiguous ranges.
///
/// Every range but the last holds `total / workers` items; the last one
/// absorbs the remainder. The ranges cover `0..total` exactly once.
pub fn partition(total: usize, workers: usize) -> Result<Vec<Range<usize>>, PoolError> {
    if workers == 0 {
        return Err(PoolError::NoWorkers);
    }
    let chunk = total / workers;
    Ok((0..workers)
        .map(|i| {
            let start = i * chunk;
            let end = if i + 1 == workers { total } else { start + chunk };
            start..end
        })
        .collect())
}
