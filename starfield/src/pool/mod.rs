//! Worker pool coordinator.
//!
//! The pool splits the star catalog across a fixed set of workers once, at
//! startup. Each worker is a thread owning one sandboxed kernel and its
//! partition; the coordinator talks to it only through messages.
//!
//! ```text
//!                       ┌──────────────────────────────┐
//!   project_all ───────▶│          WorkerPool          │
//!   find_waypoints ────▶│  WorkerHandle[i]: Idle/Busy  │
//!                       └──────┬───────────────▲───────┘
//!                  WorkerCommand│               │WorkerMessage
//!                  (per worker) ▼               │(shared channel)
//!                  ┌───────────┐ ┌───────────┐ ┌───────────┐
//!                  │ worker 0  │ │ worker 1  │ │ worker N  │
//!                  │ kernel    │ │ kernel    │ │ kernel    │
//!                  │ rows 0..k │ │ rows k..  │ │ ..total   │
//!                  └───────────┘ └───────────┘ └───────────┘
//! ```
//!
//! # Waiting
//!
//! Nothing blocks the caller's thread. The async operations drain the
//! response channel and re-check worker flags once per [`Ticker`] tick
//! ([`FrameTicker`] for a frame clock, [`ManualTicker`] for tests).
//!
//! # Liveness
//!
//! There are no timeouts. A worker that never answers keeps its caller
//! pending forever; past [`PoolConfig::stall_warning`] a warning is logged
//! once per wait.

mod config;
mod coordinator;
mod error;
mod handle;
mod partition;
mod protocol;
mod sink;
mod ticker;
mod worker;

pub use config::{PoolConfig, DEFAULT_NUM_WORKERS, DEFAULT_STALL_WARNING, DEFAULT_WAYPOINT_COUNT};
pub use coordinator::{PoolBuilder, ProjectionSummary, WorkerPool};
pub use error::PoolError;
pub use partition::partition;
pub use protocol::{CommandKind, WorkerCommand, WorkerMessage, WorkerResponse};
pub use sink::{NullSink, PointSink};
pub use ticker::{FrameTicker, ManualTicker, Ticker, DEFAULT_FRAME_INTERVAL};
