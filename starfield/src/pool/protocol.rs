//! Messages exchanged between the coordinator and its workers.

use std::fmt;
use std::sync::Arc;

use crate::coord::{Coordinate, ProjectedPoint};
use crate::sandbox::ResultBuffers;

/// Coordinator to worker.
#[derive(Debug, Clone)]
pub enum WorkerCommand {
    /// Load the kernel and this worker's catalog rows (newline-joined).
    Init { kernel: Arc<[u8]>, stars: String },

    /// Project the catalog for an observer.
    ///
    /// `buffers` is `None` the first time; the worker then allocates them
    /// and reports them back for caching.
    Project {
        coordinate: Coordinate,
        timestamp_ms: i64,
        buffers: Option<ResultBuffers>,
    },

    FindWaypoints {
        start: Coordinate,
        end: Coordinate,
        count: u32,
    },

    /// Stop the worker thread after the current command.
    Shutdown,
}

impl WorkerCommand {
    pub fn kind(&self) -> CommandKind {
        match self {
            Self::Init { .. } => CommandKind::Init,
            Self::Project { .. } => CommandKind::Project,
            Self::FindWaypoints { .. } => CommandKind::FindWaypoints,
            Self::Shutdown => CommandKind::Shutdown,
        }
    }
}

/// Discriminant of a [`WorkerCommand`], for logs and failure reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    Init,
    Project,
    FindWaypoints,
    Shutdown,
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Init => "INIT",
            Self::Project => "PROJECT",
            Self::FindWaypoints => "FIND_WAYPOINTS",
            Self::Shutdown => "SHUTDOWN",
        };
        f.write_str(name)
    }
}

/// Worker to coordinator.
#[derive(Debug, Clone)]
pub enum WorkerResponse {
    /// INIT succeeded; `stars` is the number of rows in the partition.
    InitComplete { stars: usize },

    InitFailed { reason: String },

    /// The drawPoints response to PROJECT, with the buffers to cache.
    Projected {
        points: Vec<ProjectedPoint>,
        buffers: ResultBuffers,
    },

    Waypoints { waypoints: Vec<Coordinate> },

    /// A PROJECT or FIND_WAYPOINTS command failed inside the worker.
    Failed { command: CommandKind, reason: String },
}

/// A response tagged with the worker that sent it.
#[derive(Debug, Clone)]
pub struct WorkerMessage {
    pub worker: usize,
    pub response: WorkerResponse,
}
