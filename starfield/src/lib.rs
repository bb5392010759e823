//! Starfield - star projection offloaded to sandboxed numeric kernels
//!
//! A catalog of stars is split across a pool of workers. Each worker owns
//! one kernel instance (a compiled WebAssembly module, or the in-process
//! native kernel) and talks to it through a typed marshaling layer over the
//! kernel's linear memory.
//!
//! # High-Level API
//!
//! ```ignore
//! use std::sync::Arc;
//! use starfield::catalog::PoolAssets;
//! use starfield::coord::Coordinate;
//! use starfield::pool::{PoolBuilder, PoolConfig};
//! use starfield::sandbox::NativeLoader;
//!
//! let assets = PoolAssets::load(&catalog_path, None).await?;
//! let pool = PoolBuilder::new(PoolConfig::default(), Arc::new(NativeLoader))
//!     .sink(|worker: usize, points: &[ProjectedPoint]| draw(worker, points))
//!     .init(&assets)
//!     .await?;
//!
//! let summary = pool.project_all(Coordinate::from_degrees(51.5, -0.1)?, now_ms).await;
//! ```
//!
//! # Layers
//!
//! - [`layout`] and [`marshal`] describe and encode records in linear memory
//! - [`sandbox`] wraps a kernel instance with typed entry points
//! - [`pool`] coordinates workers and the request/response protocol

pub mod catalog;
pub mod config;
pub mod coord;
pub mod layout;
pub mod logging;
pub mod marshal;
pub mod pool;
pub mod sandbox;

/// Version of the starfield library and CLI.
///
/// This is synchronized across all components in the workspace.
/// The version is defined in `Cargo.toml` and injected at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
