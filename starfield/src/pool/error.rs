//! Pool errors.

/// Errors surfaced by the worker pool.
///
/// Liveness problems are deliberately absent: a worker that never answers
/// leaves the waiting future pending rather than producing an error.
#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    #[error("pool needs at least one worker")]
    NoWorkers,

    #[error("failed to spawn worker {index}: {source}")]
    Spawn {
        index: usize,
        #[source]
        source: std::io::Error,
    },

    #[error("worker {worker} failed to initialize: {reason}")]
    WorkerInit { worker: usize, reason: String },

    /// A command was aimed at a worker that is still processing.
    #[error("worker {0} is still processing")]
    WorkerBusy(usize),

    #[error("worker {worker} failed: {reason}")]
    Worker { worker: usize, reason: String },
}
