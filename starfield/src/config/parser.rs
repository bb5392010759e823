//! INI parsing logic for converting `Ini` → `ConfigFile`.
//!
//! This module contains the `parse_ini()` function and its helpers.
//! It is the single place where INI key names are mapped to struct fields.

use std::path::PathBuf;
use std::str::FromStr;

use ini::Ini;

use super::defaults::MAX_WORKERS;
use super::file::ConfigFileError;
use super::settings::ConfigFile;

/// Parse an `Ini` object into a `ConfigFile`.
///
/// Starts from `ConfigFile::default()` and overlays any values found in the INI.
pub(super) fn parse_ini(ini: &Ini) -> Result<ConfigFile, ConfigFileError> {
    let mut config = ConfigFile::default();

    // [pool] section
    if let Some(section) = ini.section(Some("pool")) {
        if let Some(v) = section.get("workers") {
            let workers: usize = parse_number("pool", "workers", v, "must be a positive integer")?;
            if workers == 0 || workers > MAX_WORKERS {
                return Err(invalid(
                    "pool",
                    "workers",
                    v,
                    &format!("must be between 1 and {}", MAX_WORKERS),
                ));
            }
            config.pool.workers = workers;
        }
        if let Some(v) = section.get("frame_interval_ms") {
            let interval: u64 = parse_number(
                "pool",
                "frame_interval_ms",
                v,
                "must be a positive integer (milliseconds)",
            )?;
            if interval == 0 {
                return Err(invalid(
                    "pool",
                    "frame_interval_ms",
                    v,
                    "must be at least 1 millisecond",
                ));
            }
            config.pool.frame_interval_ms = interval;
        }
        if let Some(v) = section.get("stall_warning_secs") {
            config.pool.stall_warning_secs = parse_number(
                "pool",
                "stall_warning_secs",
                v,
                "must be a positive integer (seconds)",
            )?;
        }
    }

    // [waypoints] section
    if let Some(section) = ini.section(Some("waypoints")) {
        if let Some(v) = section.get("count") {
            let count: u32 = parse_number("waypoints", "count", v, "must be a positive integer")?;
            if count < 2 {
                return Err(invalid(
                    "waypoints",
                    "count",
                    v,
                    "must be at least 2 (start and end)",
                ));
            }
            config.pool.waypoint_count = count;
        }
    }

    // [catalog] section
    if let Some(section) = ini.section(Some("catalog")) {
        if let Some(v) = section.get("path") {
            let v = v.trim();
            if !v.is_empty() {
                config.catalog.path = expand_tilde(v);
            }
        }
    }

    // [kernel] section
    if let Some(section) = ini.section(Some("kernel")) {
        if let Some(v) = section.get("path") {
            let v = v.trim();
            config.kernel.path = (!v.is_empty()).then(|| expand_tilde(v));
        }
    }

    // [logging] section
    if let Some(section) = ini.section(Some("logging")) {
        if let Some(v) = section.get("file") {
            let v = v.trim();
            if !v.is_empty() {
                config.logging.file = expand_tilde(v);
            }
        }
    }

    Ok(config)
}

fn parse_number<T: FromStr>(
    section: &str,
    key: &str,
    value: &str,
    reason: &str,
) -> Result<T, ConfigFileError> {
    value
        .trim()
        .parse()
        .map_err(|_| invalid(section, key, value, reason))
}

fn invalid(section: &str, key: &str, value: &str, reason: &str) -> ConfigFileError {
    ConfigFileError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

/// Expand ~ to home directory in paths.
pub(super) fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::defaults::*;
    use tempfile::TempDir;

    fn load(content: &str) -> Result<ConfigFile, ConfigFileError> {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.ini");
        std::fs::write(&config_path, content).unwrap();
        ConfigFile::load_from(&config_path)
    }

    #[test]
    fn test_partial_config() {
        let config = load(
            r#"
[pool]
workers = 8

[waypoints]
count = 120
"#,
        )
        .unwrap();

        assert_eq!(config.pool.workers, 8);
        assert_eq!(config.pool.waypoint_count, 120);
        assert_eq!(config.pool.frame_interval_ms, DEFAULT_FRAME_INTERVAL_MS);
        assert_eq!(config.pool.stall_warning_secs, DEFAULT_STALL_WARNING_SECS);
        assert_eq!(config.catalog.path, default_catalog_path());
        assert!(config.kernel.path.is_none());
    }

    #[test]
    fn test_invalid_worker_count() {
        let err = load("[pool]\nworkers = many\n").unwrap_err();
        assert!(err.to_string().contains("pool.workers"));
        assert!(err.to_string().contains("many"));

        let err = load("[pool]\nworkers = 0\n").unwrap_err();
        assert!(err.to_string().contains("between 1 and"));
    }

    #[test]
    fn test_zero_frame_interval_rejected() {
        let err = load("[pool]\nframe_interval_ms = 0\n").unwrap_err();
        match err {
            ConfigFileError::InvalidValue { section, key, .. } => {
                assert_eq!(section, "pool");
                assert_eq!(key, "frame_interval_ms");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_waypoint_count_needs_both_ends() {
        let err = load("[waypoints]\ncount = 1\n").unwrap_err();
        assert!(err.to_string().contains("waypoints.count"));
    }

    #[test]
    fn test_kernel_path() {
        let config = load("[kernel]\npath = /opt/kernels/stars.wasm\n").unwrap();
        assert_eq!(
            config.kernel.path,
            Some(PathBuf::from("/opt/kernels/stars.wasm"))
        );

        let config = load("[kernel]\npath =\n").unwrap();
        assert!(config.kernel.path.is_none());
    }

    #[test]
    fn test_paths_expand_tilde() {
        let config = load("[catalog]\npath = ~/sky/hip.txt\n\n[logging]\nfile = /tmp/sf.log\n")
            .unwrap();
        if let Some(home) = dirs::home_dir() {
            assert_eq!(config.catalog.path, home.join("sky/hip.txt"));
        }
        assert_eq!(config.logging.file, PathBuf::from("/tmp/sf.log"));
    }

    #[test]
    fn test_expand_tilde() {
        let path = expand_tilde("~/test/path");
        if let Some(home) = dirs::home_dir() {
            assert_eq!(path, home.join("test/path"));
        }

        // Non-tilde paths should be unchanged
        let path = expand_tilde("/absolute/path");
        assert_eq!(path, PathBuf::from("/absolute/path"));
    }
}
