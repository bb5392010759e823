//! Pool configuration.

use std::time::Duration;

use super::ticker::DEFAULT_FRAME_INTERVAL;

// =============================================================================
// Configuration Constants
// =============================================================================

/// Default number of workers.
pub const DEFAULT_NUM_WORKERS: usize = 4;

/// Waypoints computed per FIND_WAYPOINTS request.
pub const DEFAULT_WAYPOINT_COUNT: u32 = 75;

/// How long a wait may go without progress before a stall warning.
pub const DEFAULT_STALL_WARNING: Duration = Duration::from_secs(10);

// =============================================================================
// Pool Configuration
// =============================================================================

/// Runtime configuration for a [`WorkerPool`](super::WorkerPool).
#[derive(Clone, Debug, PartialEq)]
pub struct PoolConfig {
    /// Number of worker threads, each with its own kernel.
    pub num_workers: usize,

    /// Waypoints requested per FIND_WAYPOINTS.
    pub waypoint_count: u32,

    /// Tick interval of the default [`FrameTicker`](super::FrameTicker).
    pub frame_interval: Duration,

    /// Waits longer than this log a stall warning. They are never aborted.
    pub stall_warning: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            num_workers: DEFAULT_NUM_WORKERS,
            waypoint_count: DEFAULT_WAYPOINT_COUNT,
            frame_interval: DEFAULT_FRAME_INTERVAL,
            stall_warning: DEFAULT_STALL_WARNING,
        }
    }
}

impl PoolConfig {
    pub fn with_workers(mut self, num_workers: usize) -> Self {
        self.num_workers = num_workers;
        self
    }
}

impl From<&crate::config::PoolSettings> for PoolConfig {
    fn from(settings: &crate::config::PoolSettings) -> Self {
        Self {
            num_workers: settings.workers,
            waypoint_count: settings.waypoint_count,
            frame_interval: Duration::from_millis(settings.frame_interval_ms),
            stall_warning: Duration::from_secs(settings.stall_warning_secs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PoolSettings;

    #[test]
    fn test_pool_config_default() {
        let config = PoolConfig::default();
        assert_eq!(config.num_workers, 4);
        assert_eq!(config.waypoint_count, 75);
        assert_eq!(config.frame_interval, Duration::from_millis(16));
    }

    #[test]
    fn test_from_settings() {
        let settings = PoolSettings {
            workers: 8,
            waypoint_count: 100,
            frame_interval_ms: 5,
            stall_warning_secs: 2,
        };
        let config = PoolConfig::from(&settings);
        assert_eq!(config.num_workers, 8);
        assert_eq!(config.waypoint_count, 100);
        assert_eq!(config.frame_interval, Duration::from_millis(5));
        assert_eq!(config.stall_warning, Duration::from_secs(2));
    }
}
