//! Configuration for starfield.
//!
//! User settings live in `~/.starfield/config.ini` and are loaded over the
//! defaults in [`defaults`]. [`PoolSettings`] converts into the runtime
//! [`PoolConfig`](crate::pool::PoolConfig).

mod defaults;
mod file;
mod parser;
mod settings;
mod writer;

pub use defaults::{
    default_catalog_path, default_log_path, DEFAULT_CATALOG_FILE, DEFAULT_FRAME_INTERVAL_MS,
    DEFAULT_LOG_FILE, DEFAULT_STALL_WARNING_SECS, DEFAULT_WAYPOINTS, DEFAULT_WORKERS, MAX_WORKERS,
};
pub use file::{config_directory, config_file_path, ConfigFile, ConfigFileError};
pub use settings::{CatalogSettings, KernelSettings, LoggingSettings, PoolSettings};
