//! CLI runner for common setup and operations.
//!
//! Encapsulates config loading, logging initialization and worker pool
//! construction to reduce duplication across command handlers.

use std::future::Future;
use std::sync::Arc;

use starfield::catalog::PoolAssets;
use starfield::config::ConfigFile;
use starfield::logging::{default_log_file, init_logging, LoggingGuard};
use starfield::pool::{PointSink, PoolBuilder, PoolConfig, WorkerPool};
use starfield::sandbox::{KernelLoader, NativeLoader};
use tracing::info;

use crate::commands::common::GlobalOverrides;
use crate::error::CliError;

/// Runner that manages CLI lifecycle and common operations.
pub struct CliRunner {
    /// Logging guard - keeps logging active while runner exists
    #[allow(dead_code)]
    logging_guard: LoggingGuard,
    /// Loaded configuration file with command-line overrides applied
    config: ConfigFile,
    runtime: tokio::runtime::Runtime,
}

impl CliRunner {
    /// Load config, apply overrides and initialize logging.
    ///
    /// Logs go to the configured file; `--debug` also mirrors them to stdout.
    pub fn new(overrides: &GlobalOverrides) -> Result<Self, CliError> {
        let mut config = ConfigFile::load()?;
        overrides.apply(&mut config)?;

        let log_path = &config.logging.file;
        let log_dir = log_path
            .parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| ".".into());
        let log_file = log_path
            .file_name()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| default_log_file().to_string());

        let logging_guard = init_logging(&log_dir, &log_file, overrides.debug, overrides.debug)
            .map_err(|e| CliError::LoggingInit(e.to_string()))?;

        // Pool futures stay on the calling thread; workers run on their own threads.
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(CliError::Runtime)?;

        Ok(Self {
            logging_guard,
            config,
            runtime,
        })
    }

    /// Get the loaded configuration.
    pub fn config(&self) -> &ConfigFile {
        &self.config
    }

    /// Log startup information for a command.
    pub fn log_startup(&self, command: &str) {
        info!("Starfield v{}", starfield::VERSION);
        info!("Starfield CLI: {} command", command);
    }

    /// Drive a future to completion on the runner's runtime.
    pub fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }

    /// Load assets and start a pool whose projections go to `sink`.
    pub async fn start_pool(&self, sink: impl PointSink + 'static) -> Result<WorkerPool, CliError> {
        let kernel_path = self.config.kernel.path.as_deref();
        let assets = PoolAssets::load(&self.config.catalog.path, kernel_path).await?;
        let loader = self.loader()?;
        let config = PoolConfig::from(&self.config.pool);

        println!(
            "Starting {} {} worker(s) over {} catalog rows...",
            config.num_workers,
            loader.name(),
            assets.stars.len()
        );

        let pool = PoolBuilder::new(config, loader)
            .sink(sink)
            .init(&assets)
            .await?;
        info!(workers = pool.num_workers(), "Worker pool ready");
        Ok(pool)
    }

    fn loader(&self) -> Result<Arc<dyn KernelLoader>, CliError> {
        match &self.config.kernel.path {
            None => Ok(Arc::new(NativeLoader)),
            Some(_path) => wasm_loader(),
        }
    }
}

#[cfg(feature = "wasm")]
fn wasm_loader() -> Result<Arc<dyn KernelLoader>, CliError> {
    Ok(Arc::new(starfield::sandbox::WasmLoader::new()))
}

#[cfg(not(feature = "wasm"))]
fn wasm_loader() -> Result<Arc<dyn KernelLoader>, CliError> {
    Err(CliError::Config(
        "a kernel path is set but this build has no WebAssembly support; \
         rebuild with the `wasm` feature or clear [kernel] path"
            .to_string(),
    ))
}
