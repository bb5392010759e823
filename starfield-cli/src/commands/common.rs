//! Common types and utilities shared across CLI commands.

use std::path::PathBuf;

use starfield::config::{ConfigFile, MAX_WORKERS};
use starfield::coord::Coordinate;

use crate::error::CliError;

/// Global flags that override the config file.
#[derive(Debug, Clone, Default)]
pub struct GlobalOverrides {
    pub debug: bool,
    pub workers: Option<usize>,
    pub catalog: Option<PathBuf>,
    pub kernel: Option<PathBuf>,
}

impl GlobalOverrides {
    /// Overlay the command-line values on `config`.
    pub fn apply(&self, config: &mut ConfigFile) -> Result<(), CliError> {
        if let Some(workers) = self.workers {
            if workers == 0 || workers > MAX_WORKERS {
                return Err(CliError::InvalidArgument(format!(
                    "--workers must be between 1 and {}",
                    MAX_WORKERS
                )));
            }
            config.pool.workers = workers;
        }
        if let Some(catalog) = &self.catalog {
            config.catalog.path = catalog.clone();
        }
        if let Some(kernel) = &self.kernel {
            config.kernel.path = Some(kernel.clone());
        }
        Ok(())
    }
}

/// Parse `LAT,LON` in decimal degrees.
pub fn parse_lat_lon(value: &str) -> Result<Coordinate, CliError> {
    let (lat, lon) = value.split_once(',').ok_or_else(|| {
        CliError::InvalidArgument(format!("'{}' is not LAT,LON", value))
    })?;
    let parse = |part: &str| {
        part.trim()
            .parse::<f64>()
            .map_err(|_| CliError::InvalidArgument(format!("'{}' is not a number", part.trim())))
    };
    to_coordinate(parse(lat)?, parse(lon)?)
}

/// Build a coordinate from degrees, reporting out-of-range values.
pub fn to_coordinate(lat: f64, lon: f64) -> Result<Coordinate, CliError> {
    Coordinate::from_degrees(lat, lon).map_err(|e| CliError::InvalidArgument(e.to_string()))
}

/// Milliseconds since the epoch for an RFC 3339 time, or now.
pub fn parse_timestamp_ms(time: Option<&str>) -> Result<i64, CliError> {
    match time {
        Some(text) => chrono::DateTime::parse_from_rfc3339(text)
            .map(|t| t.timestamp_millis())
            .map_err(|e| CliError::InvalidArgument(format!("--time '{}': {}", text, e))),
        None => Ok(chrono::Utc::now().timestamp_millis()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_lat_lon() {
        let c = parse_lat_lon("51.5, -0.12").unwrap();
        let (lat, lon) = c.to_degrees();
        assert!((lat - 51.5).abs() < 1e-9);
        assert!((lon + 0.12).abs() < 1e-9);
    }

    #[test]
    fn test_parse_lat_lon_rejects_garbage() {
        assert!(parse_lat_lon("51.5").is_err());
        assert!(parse_lat_lon("north,west").is_err());
        assert!(parse_lat_lon("95,0").is_err());
    }

    #[test]
    fn test_parse_timestamp() {
        let ms = parse_timestamp_ms(Some("2000-01-01T12:00:00Z")).unwrap();
        assert_eq!(ms, 946_728_000_000);
        assert!(parse_timestamp_ms(Some("yesterday")).is_err());
        assert!(parse_timestamp_ms(None).unwrap() > ms);
    }

    #[test]
    fn test_overrides_apply() {
        let mut config = ConfigFile::default();
        let overrides = GlobalOverrides {
            workers: Some(3),
            kernel: Some(PathBuf::from("/tmp/k.wasm")),
            ..Default::default()
        };
        overrides.apply(&mut config).unwrap();
        assert_eq!(config.pool.workers, 3);
        assert_eq!(config.kernel.path, Some(PathBuf::from("/tmp/k.wasm")));

        let zero = GlobalOverrides {
            workers: Some(0),
            ..Default::default()
        };
        assert!(zero.apply(&mut config).is_err());
    }
}
