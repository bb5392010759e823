//! Integration tests for the worker pool.
//!
//! These tests drive a full pool end to end:
//! - Catalog partitioning → INIT → broadcast PROJECT → sink
//! - FIND_WAYPOINTS on the first idle worker
//! - A busy worker is never sent a second command
//! - No timeouts: a silent worker keeps INIT, PROJECT and FIND_WAYPOINTS
//!   pending, and a waiting FIND_WAYPOINTS can be starved
//! - Kernel failures at INIT and PROJECT
//!
//! Run with: `cargo test --test pool_integration`

use std::cell::{Cell, RefCell};
use std::collections::BTreeSet;
use std::rc::Rc;
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

use starfield::catalog::PoolAssets;
use starfield::coord::{Coordinate, ProjectedPoint};
use starfield::pool::{FrameTicker, PoolBuilder, PoolConfig, PoolError, WorkerPool};
use starfield::sandbox::{Kernel, KernelLoader, NativeKernel, NativeLoader, SandboxError};

// ============================================================================
// Test Helpers
// ============================================================================

/// Sink log of `(worker, point count)` per PROJECT response.
type DrawLog = Rc<RefCell<Vec<(usize, usize)>>>;

/// Catalog rows spread over the whole sky.
fn catalog(rows: usize) -> Vec<String> {
    (0..rows)
        .map(|i| {
            let ra = (i * 37) % 360;
            let dec = ((i * 53) % 170) as f64 - 85.0;
            format!("{},{},{:.2}", ra, dec, (i % 10) as f64 / 10.0)
        })
        .collect()
}

async fn start_pool(
    loader: Arc<dyn KernelLoader>,
    workers: usize,
    rows: usize,
) -> Result<(WorkerPool, DrawLog), PoolError> {
    let draws: DrawLog = Rc::default();
    let sink_log = Rc::clone(&draws);
    let pool = PoolBuilder::new(PoolConfig::default().with_workers(workers), loader)
        .sink(move |worker: usize, points: &[ProjectedPoint]| {
            sink_log.borrow_mut().push((worker, points.len()));
        })
        .ticker(FrameTicker::new(Duration::from_millis(1)))
        .init(&PoolAssets::native(catalog(rows)))
        .await?;
    Ok((pool, draws))
}

fn observer() -> Coordinate {
    Coordinate::from_degrees(40.0, -75.0).unwrap()
}

/// Delegates the whole ABI to a [`NativeKernel`].
macro_rules! delegate_kernel {
    () => {
        fn alloc(&mut self, len: u32) -> Result<u32, SandboxError> {
            self.inner.alloc(len)
        }

        fn free(&mut self, ptr: u32, len: u32) -> Result<(), SandboxError> {
            self.inner.free(ptr, len)
        }

        fn memory(&self) -> &[u8] {
            self.inner.memory()
        }

        fn memory_mut(&mut self) -> &mut [u8] {
            self.inner.memory_mut()
        }

        fn initialize(&mut self, ptr: u32, len: u32) -> Result<(), SandboxError> {
            self.inner.initialize(ptr, len)
        }
    };
}

// ============================================================================
// Gated kernel: FIND_WAYPOINTS blocks until the test opens the gate
// ============================================================================

#[derive(Default)]
struct Gate {
    open: Mutex<bool>,
    opened: Condvar,
}

impl Gate {
    fn wait(&self) {
        let mut open = self.open.lock().unwrap();
        while !*open {
            open = self.opened.wait(open).unwrap();
        }
    }

    fn open(&self) {
        *self.open.lock().unwrap() = true;
        self.opened.notify_all();
    }
}

struct GatedKernel {
    inner: NativeKernel,
    gate: Arc<Gate>,
}

impl Kernel for GatedKernel {
    delegate_kernel!();

    fn project_stars(
        &mut self,
        latitude: f64,
        longitude: f64,
        timestamp_ms: i64,
        len_ptr: u32,
        result_ptr: u32,
    ) -> Result<(), SandboxError> {
        self.inner
            .project_stars(latitude, longitude, timestamp_ms, len_ptr, result_ptr)
    }

    fn find_waypoints(&mut self, start: u32, end: u32, count: u32) -> Result<u32, SandboxError> {
        self.gate.wait();
        self.inner.find_waypoints(start, end, count)
    }
}

struct GatedLoader {
    gate: Arc<Gate>,
}

impl KernelLoader for GatedLoader {
    fn name(&self) -> &str {
        "gated"
    }

    fn load(&self, _binary: &[u8]) -> Result<Box<dyn Kernel>, SandboxError> {
        Ok(Box::new(GatedKernel {
            inner: NativeKernel::new(),
            gate: Arc::clone(&self.gate),
        }))
    }
}

/// Loading blocks until the gate opens, so INIT goes unanswered.
struct StalledLoader {
    gate: Arc<Gate>,
}

impl KernelLoader for StalledLoader {
    fn name(&self) -> &str {
        "stalled"
    }

    fn load(&self, _binary: &[u8]) -> Result<Box<dyn Kernel>, SandboxError> {
        self.gate.wait();
        Ok(Box::new(NativeKernel::new()))
    }
}

// ============================================================================
// Failing kernels
// ============================================================================

struct RejectingLoader;

impl KernelLoader for RejectingLoader {
    fn name(&self) -> &str {
        "rejecting"
    }

    fn load(&self, _binary: &[u8]) -> Result<Box<dyn Kernel>, SandboxError> {
        Err(SandboxError::Load("not a kernel".into()))
    }
}

/// PROJECT always traps.
struct TrappingKernel {
    inner: NativeKernel,
}

impl Kernel for TrappingKernel {
    delegate_kernel!();

    fn project_stars(
        &mut self,
        _latitude: f64,
        _longitude: f64,
        _timestamp_ms: i64,
        _len_ptr: u32,
        _result_ptr: u32,
    ) -> Result<(), SandboxError> {
        Err(SandboxError::Trap {
            entry: "projectStarsWasm",
            reason: "unreachable".into(),
        })
    }

    fn find_waypoints(&mut self, start: u32, end: u32, count: u32) -> Result<u32, SandboxError> {
        self.inner.find_waypoints(start, end, count)
    }
}

struct TrappingLoader;

impl KernelLoader for TrappingLoader {
    fn name(&self) -> &str {
        "trapping"
    }

    fn load(&self, _binary: &[u8]) -> Result<Box<dyn Kernel>, SandboxError> {
        Ok(Box::new(TrappingKernel {
            inner: NativeKernel::new(),
        }))
    }
}

// ============================================================================
// End to end
// ============================================================================

#[tokio::test]
async fn test_projection_reaches_sink_once_per_worker() {
    let (pool, draws) = start_pool(Arc::new(NativeLoader), 4, 200).await.unwrap();
    assert_eq!(pool.num_workers(), 4);

    let summary = pool.project_all(observer(), 946_728_000_000).await;

    assert!(summary.failed.is_empty());
    let draws = draws.borrow();
    let workers: BTreeSet<usize> = draws.iter().map(|&(w, _)| w).collect();
    assert_eq!(workers, (0..4).collect());
    assert_eq!(draws.len(), 4);
    assert_eq!(draws.iter().map(|&(_, n)| n).sum::<usize>(), summary.points);
    // Roughly half the sky is above any horizon.
    assert!(summary.points > 0 && summary.points < 200);
}

#[tokio::test]
async fn test_consecutive_frames_reuse_buffers() {
    let (pool, draws) = start_pool(Arc::new(NativeLoader), 3, 90).await.unwrap();

    let first = pool.project_all(observer(), 0).await;
    let cached: Vec<_> = (0..3).map(|w| pool.cached_buffers(w)).collect();
    assert!(cached.iter().all(Option::is_some));

    let second = pool.project_all(observer(), 0).await;
    assert_eq!(first.points, second.points);
    for (w, buffers) in cached.iter().enumerate() {
        assert_eq!(pool.cached_buffers(w), *buffers);
    }
    assert_eq!(draws.borrow().len(), 6);
}

#[tokio::test]
async fn test_waypoints_end_to_end() {
    let (pool, _) = start_pool(Arc::new(NativeLoader), 2, 10).await.unwrap();
    let start = Coordinate::from_degrees(51.47, -0.45).unwrap();
    let end = Coordinate::from_degrees(40.64, -73.78).unwrap();

    let waypoints = pool.find_waypoints(start, end).await.unwrap();

    assert_eq!(waypoints.len(), 75);
    let (lat0, lon0) = waypoints[0].to_degrees();
    let (lat1, lon1) = waypoints[74].to_degrees();
    assert!((lat0 - 51.47).abs() < 1e-6 && (lon0 + 0.45).abs() < 1e-6);
    assert!((lat1 - 40.64).abs() < 1e-6 && (lon1 + 73.78).abs() < 1e-6);
    // The great circle from London to New York bulges north.
    let max_lat = waypoints
        .iter()
        .map(|w| w.to_degrees().0)
        .fold(f64::MIN, f64::max);
    assert!(max_lat > 51.47);
    assert!(!pool.is_processing(0) && !pool.is_processing(1));
}

#[tokio::test]
async fn test_busy_worker_is_not_redispatched() {
    let gate = Arc::new(Gate::default());
    let loader = Arc::new(GatedLoader {
        gate: Arc::clone(&gate),
    });
    let (pool, draws) = start_pool(loader, 4, 120).await.unwrap();
    let start = Coordinate::from_degrees(10.0, 10.0).unwrap();
    let end = Coordinate::from_degrees(20.0, 20.0).unwrap();

    // Worker 0 takes FIND_WAYPOINTS and blocks inside the kernel. The
    // broadcast must finish on workers 1..4 and wait for worker 0.
    let watcher = async {
        loop {
            let seen: BTreeSet<usize> = draws.borrow().iter().map(|&(w, _)| w).collect();
            if seen == (1..4).collect() {
                break;
            }
            assert!(!seen.contains(&0), "worker 0 projected while busy");
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
        assert!(pool.is_processing(0));
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(draws.borrow().iter().all(|&(w, _)| w != 0));
        gate.open();
    };

    let (waypoints, summary, ()) = tokio::time::timeout(Duration::from_secs(10), async {
        tokio::join!(
            pool.find_waypoints(start, end),
            pool.project_all(observer(), 0),
            watcher
        )
    })
    .await
    .expect("pool operations did not finish");

    assert_eq!(waypoints.unwrap().len(), 75);
    assert!(summary.failed.is_empty());
    let draws = draws.borrow();
    assert_eq!(draws.len(), 4);
    assert_eq!(draws.last().map(|&(w, _)| w), Some(0));
}

// ============================================================================
// Liveness: no timeouts, no fairness
// ============================================================================

/// A FIND_WAYPOINTS that finds every worker busy keeps re-scanning and is
/// only served once a worker frees up. Nothing bounds how long that takes:
/// while workers stay busy the request starves.
#[tokio::test]
async fn test_waypoint_request_starves_while_workers_are_busy() {
    let gate = Arc::new(Gate::default());
    let loader = Arc::new(GatedLoader {
        gate: Arc::clone(&gate),
    });
    let (pool, _) = start_pool(loader, 1, 10).await.unwrap();
    let start = Coordinate::from_degrees(10.0, 10.0).unwrap();
    let end = Coordinate::from_degrees(20.0, 20.0).unwrap();
    let finished = Cell::new(0);
    let (pool, finished) = (&pool, &finished);

    let request = || async move {
        let waypoints = pool.find_waypoints(start, end).await;
        finished.set(finished.get() + 1);
        waypoints
    };
    let release = async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(pool.is_processing(0));
        assert_eq!(finished.get(), 0, "a request finished while the worker was stuck");
        gate.open();
    };

    let (first, second, ()) = tokio::time::timeout(Duration::from_secs(10), async {
        tokio::join!(request(), request(), release)
    })
    .await
    .expect("requests never finished after the worker was released");

    assert_eq!(first.unwrap().len(), 75);
    assert_eq!(second.unwrap().len(), 75);
    assert_eq!(finished.get(), 2);
    assert!(!pool.is_processing(0));
}

#[tokio::test]
async fn test_broadcast_stays_pending_behind_stuck_worker() {
    let gate = Arc::new(Gate::default());
    let loader = Arc::new(GatedLoader {
        gate: Arc::clone(&gate),
    });
    let (pool, draws) = start_pool(loader, 3, 90).await.unwrap();
    let start = Coordinate::from_degrees(0.0, 0.0).unwrap();
    let end = Coordinate::from_degrees(5.0, 5.0).unwrap();

    // Worker 0 takes FIND_WAYPOINTS and never answers while the gate is
    // shut, so the broadcast cannot finish.
    let broadcast = async {
        let waited =
            tokio::time::timeout(Duration::from_millis(100), pool.project_all(observer(), 0))
                .await;
        assert!(waited.is_err(), "broadcast finished without worker 0");

        let seen: BTreeSet<usize> = draws.borrow().iter().map(|&(w, _)| w).collect();
        assert_eq!(seen, BTreeSet::from([1, 2]));
        assert!(pool.is_processing(0));
        gate.open();
    };

    let (waypoints, ()) = tokio::time::timeout(Duration::from_secs(10), async {
        tokio::join!(pool.find_waypoints(start, end), broadcast)
    })
    .await
    .expect("waypoints never finished after the worker was released");

    assert_eq!(waypoints.unwrap().len(), 75);
    assert!(draws.borrow().iter().all(|&(w, _)| w != 0));
}

#[tokio::test]
async fn test_init_stays_pending_without_answer() {
    let gate = Arc::new(Gate::default());
    let loader = Arc::new(StalledLoader {
        gate: Arc::clone(&gate),
    });

    let waited = tokio::time::timeout(Duration::from_millis(100), start_pool(loader, 2, 10)).await;
    assert!(waited.is_err(), "pool started before any worker answered INIT");

    // Let the stranded workers finish loading and exit.
    gate.open();
}

#[tokio::test]
async fn test_init_failure_fails_pool() {
    let result = start_pool(Arc::new(RejectingLoader), 2, 10).await;
    match result {
        Err(PoolError::WorkerInit { reason, .. }) => assert!(reason.contains("not a kernel")),
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("pool started with a kernel that cannot load"),
    }
}

#[tokio::test]
async fn test_project_failure_is_reported_per_worker() {
    let (pool, draws) = start_pool(Arc::new(TrappingLoader), 2, 10).await.unwrap();

    let summary = pool.project_all(observer(), 0).await;

    assert_eq!(summary.points, 0);
    let failed: Vec<usize> = summary.failed.iter().map(|(w, _)| *w).collect();
    assert_eq!(failed, vec![0, 1]);
    assert!(summary.failed[0].1.contains("unreachable"));
    assert!(draws.borrow().is_empty());

    // The workers are idle again and still serve other commands.
    let a = Coordinate::from_degrees(0.0, 0.0).unwrap();
    let b = Coordinate::from_degrees(0.0, 90.0).unwrap();
    assert_eq!(pool.find_waypoints(a, b).await.unwrap().len(), 75);
}

#[tokio::test]
async fn test_shutdown_joins_workers() {
    let (pool, _) = start_pool(Arc::new(NativeLoader), 3, 30).await.unwrap();
    pool.project_all(observer(), 0).await;
    pool.shutdown();
}
