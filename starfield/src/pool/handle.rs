//! Coordinator-side view of one worker.

use std::collections::VecDeque;
use std::thread::JoinHandle;

use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, error};

use super::protocol::{CommandKind, WorkerCommand};
use super::PoolError;
use crate::coord::Coordinate;
use crate::sandbox::ResultBuffers;

/// Unclaimed results kept per worker before the oldest is dropped.
const MAX_UNCLAIMED: usize = 4;

/// Result of one dispatched command, waiting to be claimed by its caller.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Outcome {
    /// Number of points drawn for a PROJECT.
    Projected(usize),
    Waypoints(Vec<Coordinate>),
    Failed(String),
}

/// Per-worker scratch area.
#[derive(Debug, Default)]
pub(crate) struct SavedData {
    /// Result buffers inside the worker's kernel, reused every frame.
    pub projection: Option<ResultBuffers>,
    /// Completed results keyed by dispatch ticket.
    pub results: VecDeque<(u64, Outcome)>,
}

impl SavedData {
    pub fn store(&mut self, ticket: u64, outcome: Outcome) {
        if self.results.len() == MAX_UNCLAIMED {
            if let Some((stale, _)) = self.results.pop_front() {
                debug!(ticket = stale, "Dropping unclaimed worker result");
            }
        }
        self.results.push_back((ticket, outcome));
    }

    /// Removes and returns the result for `ticket`.
    pub fn claim(&mut self, ticket: u64) -> Option<Outcome> {
        let position = self.results.iter().position(|(t, _)| *t == ticket)?;
        self.results.remove(position).map(|(_, outcome)| outcome)
    }
}

/// Idle/Processing state machine for one worker.
///
/// ```text
///           dispatch(PROJECT | FIND_WAYPOINTS)
///   Idle ───────────────────────────────────────▶ Processing
///    ▲                                               │
///    └──────────────── complete(response) ◀──────────┘
/// ```
///
/// Each dispatch gets a ticket, the running count of dispatches. Because a
/// worker answers in FIFO order and never has two commands outstanding,
/// ticket `n` is complete once `n` responses have arrived. The kind of the
/// outstanding command is kept so a reply of the wrong kind is caught
/// instead of being filed as its result.
#[derive(Debug)]
pub(crate) struct WorkerHandle {
    index: usize,
    commands: UnboundedSender<WorkerCommand>,
    thread: Option<JoinHandle<()>>,
    outstanding: Option<CommandKind>,
    dispatched: u64,
    completed: u64,
    initialized: bool,
    pub saved_data: SavedData,
}

impl WorkerHandle {
    pub fn new(
        index: usize,
        commands: UnboundedSender<WorkerCommand>,
        thread: JoinHandle<()>,
    ) -> Self {
        Self {
            index,
            commands,
            thread: Some(thread),
            outstanding: None,
            dispatched: 0,
            completed: 0,
            initialized: false,
            saved_data: SavedData::default(),
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn is_processing(&self) -> bool {
        self.outstanding.is_some()
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn mark_initialized(&mut self) {
        self.initialized = true;
    }

    /// Sends a PROJECT or FIND_WAYPOINTS and moves to Processing.
    ///
    /// Returns the dispatch ticket. If the worker's channel is closed the
    /// worker still counts as Processing: it will never answer, exactly like
    /// a worker that hangs.
    pub fn dispatch(&mut self, command: WorkerCommand) -> Result<u64, PoolError> {
        let kind = command.kind();
        if let Some(outstanding) = self.outstanding {
            error!(
                worker = self.index,
                command = %kind,
                outstanding = %outstanding,
                "Protocol violation: dispatch to a worker that is still processing"
            );
            return Err(PoolError::WorkerBusy(self.index));
        }

        self.outstanding = Some(kind);
        self.dispatched += 1;
        if self.commands.send(command).is_err() {
            error!(
                worker = self.index,
                command = %kind,
                "Worker channel closed; command will never complete"
            );
        }
        Ok(self.dispatched)
    }

    /// Sends a command that does not take part in the busy/idle protocol.
    pub fn send(&self, command: WorkerCommand) {
        let kind = command.kind();
        if self.commands.send(command).is_err() {
            debug!(worker = self.index, command = %kind, "Worker channel already closed");
        }
    }

    /// Records a response and moves back to Idle.
    ///
    /// Returns the completed ticket when `kind` answers the outstanding
    /// command. Returns `None` after logging if the worker was not
    /// processing. A reply of the wrong kind still completes the ticket,
    /// which then holds a failure, and also returns `None`.
    pub fn complete(&mut self, kind: CommandKind) -> Option<u64> {
        let Some(expected) = self.outstanding.take() else {
            error!(
                worker = self.index,
                command = %kind,
                "Protocol violation: response from a worker that is not processing"
            );
            return None;
        };
        self.completed += 1;
        if expected != kind {
            error!(
                worker = self.index,
                command = %kind,
                expected = %expected,
                "Protocol violation: response does not answer the outstanding command"
            );
            self.saved_data.store(
                self.completed,
                Outcome::Failed(format!("{} response to a {} command", kind, expected)),
            );
            return None;
        }
        Some(self.completed)
    }

    pub fn has_completed(&self, ticket: u64) -> bool {
        self.completed >= ticket
    }

    /// Takes the thread handle for joining.
    pub fn take_thread(&mut self) -> Option<JoinHandle<()>> {
        self.thread.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn handle() -> (WorkerHandle, mpsc::UnboundedReceiver<WorkerCommand>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let thread = std::thread::spawn(|| {});
        (WorkerHandle::new(0, tx, thread), rx)
    }

    fn waypoints() -> WorkerCommand {
        WorkerCommand::FindWaypoints {
            start: Coordinate::default(),
            end: Coordinate::default(),
            count: 1,
        }
    }

    #[test]
    fn test_processing_spans_dispatch_to_response() {
        let (mut worker, mut rx) = handle();
        assert!(!worker.is_processing());

        let ticket = worker.dispatch(waypoints()).unwrap();
        assert_eq!(ticket, 1);
        assert!(worker.is_processing());
        assert!(!worker.has_completed(ticket));
        assert!(rx.try_recv().is_ok());

        assert_eq!(worker.complete(CommandKind::FindWaypoints), Some(1));
        assert!(!worker.is_processing());
        assert!(worker.has_completed(ticket));
    }

    #[test]
    fn test_no_second_dispatch_while_processing() {
        let (mut worker, mut rx) = handle();
        worker.dispatch(waypoints()).unwrap();
        assert!(matches!(
            worker.dispatch(waypoints()),
            Err(PoolError::WorkerBusy(0))
        ));
        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_err(), "second command never reached the channel");
    }

    #[test]
    fn test_unexpected_response_is_ignored() {
        let (mut worker, _rx) = handle();
        assert_eq!(worker.complete(CommandKind::Project), None);
        assert!(!worker.is_processing());
    }

    #[test]
    fn test_mismatched_response_fails_the_ticket() {
        let (mut worker, _rx) = handle();
        let ticket = worker.dispatch(waypoints()).unwrap();

        assert_eq!(worker.complete(CommandKind::Project), None);
        assert!(!worker.is_processing());
        assert!(worker.has_completed(ticket));
        match worker.saved_data.claim(ticket) {
            Some(Outcome::Failed(reason)) => {
                assert_eq!(reason, "PROJECT response to a FIND_WAYPOINTS command")
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_closed_channel_leaves_worker_processing() {
        let (mut worker, rx) = handle();
        drop(rx);
        let ticket = worker.dispatch(waypoints()).unwrap();
        assert!(worker.is_processing());
        assert!(!worker.has_completed(ticket));
    }

    #[test]
    fn test_results_are_claimed_once() {
        let mut saved = SavedData::default();
        saved.store(1, Outcome::Projected(10));
        saved.store(2, Outcome::Waypoints(vec![Coordinate::default()]));

        assert_eq!(saved.claim(2), Some(Outcome::Waypoints(vec![Coordinate::default()])));
        assert_eq!(saved.claim(2), None, "claimed results are cleared");
        assert_eq!(saved.claim(1), Some(Outcome::Projected(10)));
    }

    #[test]
    fn test_unclaimed_results_are_bounded() {
        let mut saved = SavedData::default();
        for ticket in 1..=6 {
            saved.store(ticket, Outcome::Projected(0));
        }
        assert_eq!(saved.results.len(), MAX_UNCLAIMED);
        assert_eq!(saved.claim(1), None);
        assert!(saved.claim(6).is_some());
    }
}
