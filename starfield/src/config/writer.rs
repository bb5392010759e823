//! INI serialization logic for converting `ConfigFile` → INI string.
//!
//! This module contains the `to_config_string()` function that produces
//! the commented INI representation written to `config.ini`.

use std::path::Path;

use super::settings::ConfigFile;

/// Convert a `ConfigFile` to a commented INI string for saving.
pub(super) fn to_config_string(config: &ConfigFile) -> String {
    let kernel_path = config
        .kernel
        .path
        .as_ref()
        .map(|p| path_to_string(p))
        .unwrap_or_default();

    format!(
        r#"[pool]
; Worker threads, each running its own kernel instance (1-256)
workers = {}
; How often the coordinator polls workers while waiting, in milliseconds
frame_interval_ms = {}
; Log a warning when a wait makes no progress for this many seconds.
; Waits are never aborted.
stall_warning_secs = {}

[waypoints]
; Points along the great circle returned per request, endpoints included
count = {}

[catalog]
; Star catalog: a JSON array of rows, or a text file with one row per line.
; Native kernel rows are: right_ascension_deg,declination_deg,brightness
path = {}

[kernel]
; Compiled kernel module (.wasm or .wat).
; Leave empty to use the built-in native kernel.
path = {}

[logging]
; Log file, cleared at the start of each session
file = {}
"#,
        config.pool.workers,
        config.pool.frame_interval_ms,
        config.pool.stall_warning_secs,
        config.pool.waypoint_count,
        path_to_string(&config.catalog.path),
        kernel_path,
        path_to_string(&config.logging.file),
    )
}

/// Render a path with the home directory collapsed back to `~`.
fn path_to_string(path: &Path) -> String {
    if let Some(home) = dirs::home_dir() {
        if let Ok(stripped) = path.strip_prefix(&home) {
            return format!("~/{}", stripped.display());
        }
    }
    path.display().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_writer_emits_every_section() {
        let content = to_config_string(&ConfigFile::default());
        for section in ["[pool]", "[waypoints]", "[catalog]", "[kernel]", "[logging]"] {
            assert!(content.contains(section), "missing {section}");
        }
        assert!(content.contains("workers = 4"));
        assert!(content.contains("count = 75"));
    }

    #[test]
    fn test_home_paths_collapse_to_tilde() {
        if let Some(home) = dirs::home_dir() {
            assert_eq!(path_to_string(&home.join("a/b.log")), "~/a/b.log");
        }
        assert_eq!(path_to_string(&PathBuf::from("/var/log/x")), "/var/log/x");
    }
}
