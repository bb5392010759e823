//! Settings structs for all configuration sections.
//!
//! Each struct represents one `[section]` of the INI config file.
//! These are pure data types with no parsing or serialization logic.

use std::path::PathBuf;

/// Complete application configuration loaded from config.ini.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigFile {
    /// Worker pool settings (`[pool]` and `[waypoints]`)
    pub pool: PoolSettings,
    /// Star catalog settings
    pub catalog: CatalogSettings,
    /// Kernel binary settings
    pub kernel: KernelSettings,
    /// Logging settings
    pub logging: LoggingSettings,
}

/// Worker pool configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct PoolSettings {
    /// Number of worker threads
    pub workers: usize,
    /// Waypoints per great-circle request (`[waypoints] count`)
    pub waypoint_count: u32,
    /// Poll interval of the frame ticker in milliseconds
    pub frame_interval_ms: u64,
    /// Seconds without progress before a stall warning is logged
    pub stall_warning_secs: u64,
}

/// Star catalog configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogSettings {
    /// Catalog file: a JSON array of rows, or one row per line
    pub path: PathBuf,
}

/// Kernel binary configuration.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct KernelSettings {
    /// Compiled kernel module. `None` selects the in-process native kernel.
    pub path: Option<PathBuf>,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct LoggingSettings {
    /// Log file path
    pub file: PathBuf,
}
