//! The worker pool coordinator.

use std::cell::RefCell;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc::{self, UnboundedReceiver};
use tracing::{debug, error, info, warn};

use super::handle::{Outcome, WorkerHandle};
use super::protocol::{CommandKind, WorkerCommand, WorkerMessage, WorkerResponse};
use super::{partition, worker, FrameTicker, PointSink, PoolConfig, PoolError, Ticker};
use crate::catalog::PoolAssets;
use crate::coord::{Coordinate, ProjectedPoint};
use crate::sandbox::{KernelLoader, ResultBuffers};

/// What one broadcast projection produced.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectionSummary {
    /// Points handed to the sink across all workers.
    pub points: usize,
    /// Workers whose PROJECT failed, with the reason.
    pub failed: Vec<(usize, String)>,
    pub elapsed: Duration,
}

/// Builds and initializes a [`WorkerPool`].
pub struct PoolBuilder {
    config: PoolConfig,
    loader: Arc<dyn KernelLoader>,
    sink: Box<dyn PointSink>,
    ticker: Option<Box<dyn Ticker>>,
}

impl PoolBuilder {
    pub fn new(config: PoolConfig, loader: Arc<dyn KernelLoader>) -> Self {
        Self {
            config,
            loader,
            sink: Box::new(super::NullSink),
            ticker: None,
        }
    }

    /// Where projected points go. Defaults to [`NullSink`](super::NullSink).
    pub fn sink(mut self, sink: impl PointSink + 'static) -> Self {
        self.sink = Box::new(sink);
        self
    }

    /// Tick source for the polling loops. Defaults to a [`FrameTicker`] at
    /// the configured frame interval.
    pub fn ticker(mut self, ticker: impl Ticker + 'static) -> Self {
        self.ticker = Some(Box::new(ticker));
        self
    }

    /// Partitions the catalog, starts one worker per partition and waits
    /// until every worker has answered INIT.
    ///
    /// A worker that reports an INIT failure fails the whole pool with
    /// [`PoolError::WorkerInit`]. A worker that never answers keeps this
    /// future pending.
    pub async fn init(self, assets: &PoolAssets) -> Result<WorkerPool, PoolError> {
        let ranges = partition(assets.stars.len(), self.config.num_workers)?;
        let (responses_tx, responses) = mpsc::unbounded_channel();

        let mut workers = Vec::with_capacity(ranges.len());
        for (index, range) in ranges.iter().enumerate() {
            let (commands, commands_rx) = mpsc::unbounded_channel();
            let loader = Arc::clone(&self.loader);
            let responses_tx = responses_tx.clone();
            let thread = std::thread::Builder::new()
                .name(format!("starfield-worker-{}", index))
                .spawn(move || worker::run(index, loader, commands_rx, responses_tx))
                .map_err(|source| PoolError::Spawn { index, source })?;

            let handle = WorkerHandle::new(index, commands, thread);
            handle.send(WorkerCommand::Init {
                kernel: Arc::clone(&assets.kernel),
                stars: assets.stars[range.clone()].join("\n"),
            });
            workers.push(handle);
        }

        info!(
            workers = workers.len(),
            stars = assets.stars.len(),
            backend = self.loader.name(),
            "Starting worker pool"
        );

        let ticker = self.ticker.unwrap_or_else(|| {
            Box::new(FrameTicker::new(self.config.frame_interval)) as Box<dyn Ticker>
        });
        let pool = WorkerPool {
            config: self.config,
            state: RefCell::new(PoolState {
                workers,
                responses,
                init_failures: Vec::new(),
            }),
            sink: self.sink,
            ticker,
        };

        pool.poll_until(CommandKind::Init, |state| {
            if let Some((worker, reason)) = state.init_failures.first() {
                return Some(Err(PoolError::WorkerInit {
                    worker: *worker,
                    reason: reason.clone(),
                }));
            }
            state
                .workers
                .iter()
                .all(WorkerHandle::is_initialized)
                .then_some(Ok(()))
        })
        .await?;

        info!(workers = pool.num_workers(), "Worker pool ready");
        Ok(pool)
    }
}

struct PoolState {
    workers: Vec<WorkerHandle>,
    responses: UnboundedReceiver<WorkerMessage>,
    init_failures: Vec<(usize, String)>,
}

/// A fixed set of workers, each owning one kernel and one catalog
/// partition.
///
/// All methods take `&self` and run on the caller's task. Waiting is a
/// cooperative poll: responses are drained and worker flags re-checked once
/// per tick, so a broadcast and a singleton request can be awaited together
/// with `tokio::join!`.
///
/// Dropping the pool sends SHUTDOWN to every worker without waiting; use
/// [`shutdown`](Self::shutdown) to also join the threads.
pub struct WorkerPool {
    config: PoolConfig,
    state: RefCell<PoolState>,
    sink: Box<dyn PointSink>,
    ticker: Box<dyn Ticker>,
}

impl WorkerPool {
    pub fn num_workers(&self) -> usize {
        self.state.borrow().workers.len()
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Whether `worker` has a command outstanding.
    pub fn is_processing(&self, worker: usize) -> bool {
        self.state
            .borrow()
            .workers
            .get(worker)
            .is_some_and(WorkerHandle::is_processing)
    }

    /// Result buffers cached for `worker`, once it has projected once.
    pub fn cached_buffers(&self, worker: usize) -> Option<ResultBuffers> {
        self.state
            .borrow()
            .workers
            .get(worker)
            .and_then(|w| w.saved_data.projection)
    }

    /// Projects the catalog on every worker and resolves once all of them
    /// have answered.
    ///
    /// Idle workers get PROJECT right away. A worker still busy with an
    /// earlier command is skipped until that command's response arrives,
    /// then dispatched. Each worker's points are passed to the sink as they
    /// come in.
    pub async fn project_all(
        &self,
        coordinate: Coordinate,
        timestamp_ms: i64,
    ) -> ProjectionSummary {
        let started = Instant::now();
        let mut tickets: Vec<Option<u64>> = vec![None; self.num_workers()];
        let mut outcomes: Vec<Option<Outcome>> = vec![None; tickets.len()];

        self.poll_until(CommandKind::Project, |state| {
            for (i, ticket) in tickets.iter_mut().enumerate() {
                let worker = &mut state.workers[i];
                match *ticket {
                    None if !worker.is_processing() => {
                        let command = WorkerCommand::Project {
                            coordinate,
                            timestamp_ms,
                            buffers: worker.saved_data.projection,
                        };
                        *ticket = worker.dispatch(command).ok();
                    }
                    Some(t) if outcomes[i].is_none() && worker.has_completed(t) => {
                        outcomes[i] = Some(worker.saved_data.claim(t).unwrap_or_else(|| {
                            Outcome::Failed("result was discarded before it was claimed".into())
                        }));
                    }
                    _ => {}
                }
            }
            outcomes.iter().all(Option::is_some).then_some(())
        })
        .await;

        let mut summary = ProjectionSummary {
            points: 0,
            failed: Vec::new(),
            elapsed: started.elapsed(),
        };
        for (worker, outcome) in outcomes.into_iter().enumerate() {
            match outcome {
                Some(Outcome::Projected(n)) => summary.points += n,
                Some(Outcome::Failed(reason)) => summary.failed.push((worker, reason)),
                other => error!(worker, outcome = ?other, "Unexpected PROJECT outcome"),
            }
        }
        debug!(
            points = summary.points,
            failed = summary.failed.len(),
            elapsed_ms = summary.elapsed.as_millis() as u64,
            "Projection complete"
        );
        summary
    }

    /// Finds waypoints from `start` to `end` on the first idle worker.
    ///
    /// If every worker is busy this keeps re-scanning each tick until one
    /// frees up. There is no fairness guarantee: a steady stream of
    /// broadcasts can starve it indefinitely.
    pub async fn find_waypoints(
        &self,
        start: Coordinate,
        end: Coordinate,
    ) -> Result<Vec<Coordinate>, PoolError> {
        let count = self.config.waypoint_count;

        let (worker, ticket) = self
            .poll_until(CommandKind::FindWaypoints, |state| {
                let handle = state.workers.iter_mut().find(|w| !w.is_processing())?;
                let ticket = handle
                    .dispatch(WorkerCommand::FindWaypoints { start, end, count })
                    .ok()?;
                Some((handle.index(), ticket))
            })
            .await;
        debug!(worker, "Dispatched FIND_WAYPOINTS");

        let outcome = self
            .poll_until(CommandKind::FindWaypoints, |state| {
                let handle = &mut state.workers[worker];
                handle
                    .has_completed(ticket)
                    .then(|| handle.saved_data.claim(ticket))
            })
            .await;

        match outcome {
            Some(Outcome::Waypoints(waypoints)) => Ok(waypoints),
            Some(Outcome::Failed(reason)) => Err(PoolError::Worker { worker, reason }),
            other => Err(PoolError::Worker {
                worker,
                reason: format!("unexpected FIND_WAYPOINTS outcome: {:?}", other),
            }),
        }
    }

    /// Drains every response that has arrived, without waiting.
    ///
    /// Returns the number of responses handled.
    pub fn pump(&self) -> usize {
        let mut draws: Vec<(usize, Vec<ProjectedPoint>)> = Vec::new();
        let mut handled = 0;
        {
            let mut state = self.state.borrow_mut();
            while let Ok(message) = state.responses.try_recv() {
                handled += 1;
                handle_message(&mut state, message, &mut draws);
            }
        }
        for (worker, points) in draws {
            self.sink.draw_points(worker, &points);
        }
        handled
    }

    /// Stops every worker and joins its thread.
    ///
    /// A worker stuck inside a kernel call is joined only once that call
    /// returns.
    pub fn shutdown(self) {
        let threads: Vec<_> = {
            let mut state = self.state.borrow_mut();
            state
                .workers
                .iter_mut()
                .map(|w| {
                    w.send(WorkerCommand::Shutdown);
                    (w.index(), w.take_thread())
                })
                .collect()
        };
        for (index, thread) in threads {
            if let Some(thread) = thread {
                if thread.join().is_err() {
                    error!(worker = index, "Worker thread panicked");
                }
            }
        }
        info!("Worker pool shut down");
    }

    /// Pumps responses and runs `step` once per tick until it yields a
    /// value.
    ///
    /// Waiting has no timeout. Past the configured stall threshold a
    /// warning is logged once, naming the workers still busy.
    async fn poll_until<T>(
        &self,
        operation: CommandKind,
        mut step: impl FnMut(&mut PoolState) -> Option<T>,
    ) -> T {
        let started = Instant::now();
        let mut warned = false;
        loop {
            self.pump();
            let ready = step(&mut self.state.borrow_mut());
            if let Some(value) = ready {
                return value;
            }

            if !warned && started.elapsed() >= self.config.stall_warning {
                warned = true;
                let state = self.state.borrow();
                let busy: Vec<usize> = state
                    .workers
                    .iter()
                    .filter(|w| w.is_processing() || !w.is_initialized())
                    .map(WorkerHandle::index)
                    .collect();
                warn!(
                    operation = %operation,
                    waited_secs = started.elapsed().as_secs(),
                    busy = ?busy,
                    "STALL: still waiting on workers; no timeout applies"
                );
            }

            self.ticker.tick().await;
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        for worker in &self.state.get_mut().workers {
            worker.send(WorkerCommand::Shutdown);
        }
    }
}

fn handle_message(
    state: &mut PoolState,
    message: WorkerMessage,
    draws: &mut Vec<(usize, Vec<ProjectedPoint>)>,
) {
    let index = message.worker;
    let Some(worker) = state.workers.get_mut(index) else {
        error!(worker = index, "Response from unknown worker");
        return;
    };

    match message.response {
        WorkerResponse::InitComplete { stars } => {
            worker.mark_initialized();
            info!(worker = index, stars, "Worker initialized");
        }
        WorkerResponse::InitFailed { reason } => {
            error!(worker = index, reason = %reason, "Worker failed to initialize");
            state.init_failures.push((index, reason));
        }
        WorkerResponse::Projected { points, buffers } => {
            let Some(ticket) = worker.complete(CommandKind::Project) else {
                return;
            };
            if worker.saved_data.projection != Some(buffers) {
                debug!(worker = index, buffers = ?buffers, "Caching result buffers");
                worker.saved_data.projection = Some(buffers);
            }
            worker.saved_data.store(ticket, Outcome::Projected(points.len()));
            draws.push((index, points));
        }
        WorkerResponse::Waypoints { waypoints } => {
            if let Some(ticket) = worker.complete(CommandKind::FindWaypoints) {
                worker.saved_data.store(ticket, Outcome::Waypoints(waypoints));
            }
        }
        WorkerResponse::Failed { command, reason } => {
            warn!(worker = index, command = %command, reason = %reason, "Worker command failed");
            if let Some(ticket) = worker.complete(command) {
                worker.saved_data.store(ticket, Outcome::Failed(reason));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::ManualTicker;
    use crate::sandbox::NativeLoader;
    use std::cell::Cell;
    use std::rc::Rc;

    fn assets(rows: usize) -> PoolAssets {
        let stars = (0..rows)
            .map(|i| format!("{},{},0.5", (i * 7) % 360, (i as f64 * 1.3) % 90.0))
            .collect();
        PoolAssets::native(stars)
    }

    async fn pool(workers: usize, rows: usize) -> WorkerPool {
        let config = PoolConfig::default().with_workers(workers);
        PoolBuilder::new(config, Arc::new(NativeLoader))
            .ticker(FrameTicker::new(Duration::from_millis(1)))
            .init(&assets(rows))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_init_marks_every_worker_ready() {
        let pool = pool(3, 30).await;
        assert_eq!(pool.num_workers(), 3);
        let state = pool.state.borrow();
        assert!(state.workers.iter().all(|w| w.is_initialized()));
        assert!(state.workers.iter().all(|w| !w.is_processing()));
    }

    #[tokio::test]
    async fn test_zero_workers_is_rejected() {
        let result = PoolBuilder::new(PoolConfig::default().with_workers(0), Arc::new(NativeLoader))
            .init(&assets(10))
            .await;
        assert!(matches!(result, Err(PoolError::NoWorkers)));
    }

    #[tokio::test]
    async fn test_project_all_leaves_every_worker_idle() {
        let drawn = Rc::new(Cell::new(0usize));
        let sink_count = Rc::clone(&drawn);
        let config = PoolConfig::default().with_workers(4);
        let pool = PoolBuilder::new(config, Arc::new(NativeLoader))
            .ticker(FrameTicker::new(Duration::from_millis(1)))
            .sink(move |_worker: usize, points: &[ProjectedPoint]| {
                sink_count.set(sink_count.get() + points.len());
            })
            .init(&assets(400))
            .await
            .unwrap();

        let summary = pool.project_all(Coordinate::new(0.6, 1.0), 1_700_000_000_000).await;
        assert!(summary.failed.is_empty());
        assert!(summary.points > 0);
        assert_eq!(summary.points, drawn.get());
        for i in 0..4 {
            assert!(!pool.is_processing(i));
            assert!(pool.cached_buffers(i).is_some());
        }
    }

    #[tokio::test]
    async fn test_cached_buffers_are_reused() {
        let pool = pool(2, 20).await;
        pool.project_all(Coordinate::new(0.1, 0.2), 0).await;
        let first: Vec<_> = (0..2).map(|i| pool.cached_buffers(i)).collect();
        pool.project_all(Coordinate::new(0.3, 0.4), 60_000).await;
        let second: Vec<_> = (0..2).map(|i| pool.cached_buffers(i)).collect();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_waypoint_result_is_cleared_after_read() {
        let pool = pool(2, 10).await;
        let start = Coordinate::new(0.1, 0.1);
        let end = Coordinate::new(0.5, 0.9);
        let waypoints = pool.find_waypoints(start, end).await.unwrap();
        assert_eq!(waypoints.len(), 75);

        let state = pool.state.borrow();
        assert!(state.workers.iter().all(|w| w.saved_data.results.is_empty()));
    }

    #[tokio::test]
    async fn test_find_waypoints_takes_first_idle_worker() {
        let pool = pool(3, 10).await;
        {
            // Stop worker 0, then dispatch to it: it stays Processing forever.
            let mut state = pool.state.borrow_mut();
            let stuck = &mut state.workers[0];
            stuck.send(WorkerCommand::Shutdown);
            stuck.take_thread().unwrap().join().unwrap();
            stuck
                .dispatch(WorkerCommand::FindWaypoints {
                    start: Coordinate::default(),
                    end: Coordinate::default(),
                    count: 1,
                })
                .unwrap();
        }

        let waypoints = pool
            .find_waypoints(Coordinate::new(0.0, 0.0), Coordinate::new(0.2, 0.2))
            .await
            .unwrap();
        assert_eq!(waypoints.len(), 75);

        assert!(pool.is_processing(0));
        let state = pool.state.borrow();
        assert!(state.workers[1].has_completed(1));
        assert!(!state.workers[2].has_completed(1));
    }

    #[tokio::test]
    async fn test_mismatched_response_is_not_filed_as_result() {
        use crate::sandbox::Pointer;

        let pool = pool(2, 10).await;
        let mut state = pool.state.borrow_mut();
        let ticket = {
            let stuck = &mut state.workers[0];
            stuck.send(WorkerCommand::Shutdown);
            stuck.take_thread().unwrap().join().unwrap();
            stuck
                .dispatch(WorkerCommand::FindWaypoints {
                    start: Coordinate::default(),
                    end: Coordinate::default(),
                    count: 2,
                })
                .unwrap()
        };

        let buffers = ResultBuffers {
            len_ptr: Pointer::new(8).unwrap(),
            result_ptr: Pointer::new(16).unwrap(),
            capacity: 1,
        };
        let message = WorkerMessage {
            worker: 0,
            response: WorkerResponse::Projected {
                points: vec![ProjectedPoint::new(0.0, 0.0, 1.0)],
                buffers,
            },
        };
        let mut draws = Vec::new();
        handle_message(&mut state, message, &mut draws);

        let worker = &mut state.workers[0];
        assert!(draws.is_empty());
        assert!(!worker.is_processing());
        assert_eq!(worker.saved_data.projection, None);
        assert!(matches!(worker.saved_data.claim(ticket), Some(Outcome::Failed(_))));
    }

    #[tokio::test]
    async fn test_manual_ticker_drives_completion() {
        let ticker = ManualTicker::new();
        let config = PoolConfig::default().with_workers(2);
        let driver = ticker.clone();
        let assets = assets(10);
        let init = PoolBuilder::new(config, Arc::new(NativeLoader))
            .ticker(ticker)
            .init(&assets);

        let drive = async {
            loop {
                tokio::time::sleep(Duration::from_millis(1)).await;
                driver.advance();
            }
        };
        let pool = tokio::select! {
            pool = init => pool.unwrap(),
            _ = drive => unreachable!(),
        };
        assert_eq!(pool.num_workers(), 2);

        let drive = async {
            loop {
                tokio::time::sleep(Duration::from_millis(1)).await;
                driver.advance();
            }
        };
        let summary = tokio::select! {
            summary = pool.project_all(Coordinate::new(0.5, 0.5), 0) => summary,
            _ = drive => unreachable!(),
        };
        assert!(summary.failed.is_empty());
    }

    #[tokio::test]
    async fn test_shutdown_joins_workers() {
        let pool = pool(2, 4).await;
        pool.shutdown();
    }
}
