//! The worker thread: one kernel, one catalog partition.

use std::sync::Arc;

use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tracing::{debug, info_span, warn};

use super::protocol::{CommandKind, WorkerCommand, WorkerMessage, WorkerResponse};
use crate::coord::Coordinate;
use crate::sandbox::{KernelLoader, ResultBuffers, SandboxError, SandboxHandle};

/// Per-thread state.
struct Worker {
    loader: Arc<dyn KernelLoader>,
    sandbox: Option<SandboxHandle>,
    /// Rows in this worker's partition.
    rows: usize,
}

/// Runs commands in arrival order until SHUTDOWN or the coordinator goes
/// away.
pub(crate) fn run(
    index: usize,
    loader: Arc<dyn KernelLoader>,
    mut commands: UnboundedReceiver<WorkerCommand>,
    responses: UnboundedSender<WorkerMessage>,
) {
    let span = info_span!("worker", worker = index);
    let _enter = span.enter();

    let mut worker = Worker {
        loader,
        sandbox: None,
        rows: 0,
    };

    while let Some(command) = commands.blocking_recv() {
        let response = match command {
            WorkerCommand::Shutdown => break,
            WorkerCommand::Init { kernel, stars } => worker.init(&kernel, &stars),
            WorkerCommand::Project {
                coordinate,
                timestamp_ms,
                buffers,
            } => worker.project(coordinate, timestamp_ms, buffers),
            WorkerCommand::FindWaypoints { start, end, count } => {
                worker.find_waypoints(start, end, count)
            }
        };

        let message = WorkerMessage {
            worker: index,
            response,
        };
        if responses.send(message).is_err() {
            debug!("Coordinator dropped, stopping");
            break;
        }
    }
    debug!("Worker stopped");
}

impl Worker {
    fn init(&mut self, kernel: &[u8], stars: &str) -> WorkerResponse {
        let loaded = SandboxHandle::load(self.loader.as_ref(), kernel).and_then(|mut sandbox| {
            sandbox.initialize(stars)?;
            Ok(sandbox)
        });

        match loaded {
            Ok(sandbox) => {
                self.rows = stars.lines().count();
                self.sandbox = Some(sandbox);
                debug!(
                    backend = self.loader.name(),
                    rows = self.rows,
                    "Kernel initialized"
                );
                WorkerResponse::InitComplete { stars: self.rows }
            }
            Err(e) => WorkerResponse::InitFailed {
                reason: e.to_string(),
            },
        }
    }

    fn project(
        &mut self,
        coordinate: Coordinate,
        timestamp_ms: i64,
        cached: Option<ResultBuffers>,
    ) -> WorkerResponse {
        let rows = self.rows;
        let Some(sandbox) = self.sandbox.as_mut() else {
            return not_initialized(CommandKind::Project);
        };

        let buffers = match cached {
            Some(buffers) => buffers,
            None => match sandbox.alloc_result_buffers(rows.max(1)) {
                Ok(buffers) => {
                    warn!(capacity = buffers.capacity, "Allocated array for canvas points");
                    buffers
                }
                Err(e) => return failed(CommandKind::Project, e),
            },
        };

        match sandbox.project_stars(coordinate, timestamp_ms, &buffers) {
            Ok(points) => WorkerResponse::Projected { points, buffers },
            Err(e) => {
                // Fresh buffers were never reported back, so nobody else
                // will free them.
                if cached.is_none() {
                    if let Err(free_err) = sandbox.free_result_buffers(buffers) {
                        debug!(error = %free_err, "Failed to free result buffers");
                    }
                }
                failed(CommandKind::Project, e)
            }
        }
    }

    fn find_waypoints(&mut self, start: Coordinate, end: Coordinate, count: u32) -> WorkerResponse {
        let Some(sandbox) = self.sandbox.as_mut() else {
            return not_initialized(CommandKind::FindWaypoints);
        };
        match sandbox.find_waypoints(start, end, count) {
            Ok(waypoints) => WorkerResponse::Waypoints { waypoints },
            Err(e) => failed(CommandKind::FindWaypoints, e),
        }
    }
}

fn failed(command: CommandKind, error: SandboxError) -> WorkerResponse {
    warn!(command = %command, error = %error, "Command failed");
    WorkerResponse::Failed {
        command,
        reason: error.to_string(),
    }
}

fn not_initialized(command: CommandKind) -> WorkerResponse {
    WorkerResponse::Failed {
        command,
        reason: "worker is not initialized".to_string(),
    }
}
