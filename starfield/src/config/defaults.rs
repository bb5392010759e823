//! Default values and constants for all configuration settings.
//!
//! Contains all `DEFAULT_*` constants and the `ConfigFile::default()`
//! implementation.

use std::path::PathBuf;

use super::file::config_directory;
use super::settings::*;
use crate::pool::{DEFAULT_NUM_WORKERS, DEFAULT_WAYPOINT_COUNT};

// =============================================================================
// Pool defaults
// =============================================================================

/// Default worker count.
pub const DEFAULT_WORKERS: usize = DEFAULT_NUM_WORKERS;

/// Default waypoints per request.
pub const DEFAULT_WAYPOINTS: u32 = DEFAULT_WAYPOINT_COUNT;

/// Default frame interval (one display frame at 60 Hz).
pub const DEFAULT_FRAME_INTERVAL_MS: u64 = 16;

/// Default stall warning threshold.
pub const DEFAULT_STALL_WARNING_SECS: u64 = 10;

/// Upper bound on configured workers.
pub const MAX_WORKERS: usize = 256;

// =============================================================================
// File defaults
// =============================================================================

/// Default catalog file name inside the config directory.
pub const DEFAULT_CATALOG_FILE: &str = "stars.json";

/// Default log file name inside the config directory.
pub const DEFAULT_LOG_FILE: &str = "starfield.log";

/// Default catalog path (`~/.starfield/stars.json`).
pub fn default_catalog_path() -> PathBuf {
    config_directory().join(DEFAULT_CATALOG_FILE)
}

/// Default log file path (`~/.starfield/starfield.log`).
pub fn default_log_path() -> PathBuf {
    config_directory().join(DEFAULT_LOG_FILE)
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            waypoint_count: DEFAULT_WAYPOINTS,
            frame_interval_ms: DEFAULT_FRAME_INTERVAL_MS,
            stall_warning_secs: DEFAULT_STALL_WARNING_SECS,
        }
    }
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            pool: PoolSettings::default(),
            catalog: CatalogSettings {
                path: default_catalog_path(),
            },
            kernel: KernelSettings::default(),
            logging: LoggingSettings {
                file: default_log_path(),
            },
        }
    }
}
