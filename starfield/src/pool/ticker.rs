//! Tick sources that drive the coordinator's polling loops.
//!
//! The pool never blocks while it waits on workers. It re-checks worker
//! state once per tick, and what a tick is depends on the host: a display
//! frame, a timer, or a test harness stepping by hand.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

/// Default frame interval (about 60 Hz).
pub const DEFAULT_FRAME_INTERVAL: Duration = Duration::from_millis(16);

/// Yields until the next scheduling tick.
pub trait Ticker: Send + Sync {
    fn tick(&self) -> Pin<Box<dyn Future<Output = ()> + Send + '_>>;
}

/// Ticks once per frame interval using the tokio timer.
#[derive(Debug, Clone)]
pub struct FrameTicker {
    interval: Duration,
}

impl FrameTicker {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl Default for FrameTicker {
    fn default() -> Self {
        Self::new(DEFAULT_FRAME_INTERVAL)
    }
}

impl Ticker for FrameTicker {
    fn tick(&self) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        Box::pin(tokio::time::sleep(self.interval))
    }
}

/// Ticks only when [`advance`](Self::advance) is called.
///
/// Clones share the same tick source.
#[derive(Debug, Clone)]
pub struct ManualTicker {
    ticks: Arc<watch::Sender<u64>>,
}

impl ManualTicker {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(0);
        Self { ticks: Arc::new(tx) }
    }

    /// Releases everything currently waiting on a tick.
    pub fn advance(&self) {
        self.ticks.send_modify(|n| *n += 1);
    }

    /// Number of ticks issued so far.
    pub fn count(&self) -> u64 {
        *self.ticks.borrow()
    }
}

impl Default for ManualTicker {
    fn default() -> Self {
        Self::new()
    }
}

impl Ticker for ManualTicker {
    fn tick(&self) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        // Subscribing marks the current tick as seen, so this waits for the
        // next one.
        let mut rx = self.ticks.subscribe();
        Box::pin(async move {
            let _ = rx.changed().await;
        })
    }
}
