//! Destination for projected points.

use crate::coord::ProjectedPoint;

/// Receives each worker's points as its PROJECT response arrives.
///
/// This is where a host draws to its canvas. Calls happen on the task
/// awaiting the pool, once per worker per frame.
pub trait PointSink {
    fn draw_points(&self, worker: usize, points: &[ProjectedPoint]);
}

impl<F> PointSink for F
where
    F: Fn(usize, &[ProjectedPoint]),
{
    fn draw_points(&self, worker: usize, points: &[ProjectedPoint]) {
        self(worker, points)
    }
}

/// Discards every point.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl PointSink for NullSink {
    fn draw_points(&self, _worker: usize, _points: &[ProjectedPoint]) {}
}
