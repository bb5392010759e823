//! Star catalog and kernel assets.
//!
//! Both are read once at startup and shared with every worker: catalog rows
//! are partitioned across the pool, the kernel binary is handed to each
//! worker's INIT as a shared `Arc<[u8]>`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info};

/// Errors loading pool assets.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// A catalog or kernel file could not be read.
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The catalog looked like JSON but is not an array of strings.
    #[error("Invalid catalog {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Everything a pool needs to start its workers.
#[derive(Debug, Clone)]
pub struct PoolAssets {
    /// Opaque catalog rows, one star per row.
    pub stars: Vec<String>,
    /// Compiled kernel binary. Empty for the native kernel.
    pub kernel: Arc<[u8]>,
}

impl PoolAssets {
    pub fn new(stars: Vec<String>, kernel: impl Into<Arc<[u8]>>) -> Self {
        Self {
            stars,
            kernel: kernel.into(),
        }
    }

    /// Assets for the in-process native kernel, which needs no binary.
    pub fn native(stars: Vec<String>) -> Self {
        Self::new(stars, Vec::<u8>::new())
    }

    /// Reads the catalog and, when given, the kernel binary.
    pub async fn load(catalog: &Path, kernel: Option<&Path>) -> Result<Self, CatalogError> {
        let text = read_to_string(catalog).await?;
        let stars = parse_rows(&text).map_err(|source| CatalogError::Json {
            path: catalog.to_path_buf(),
            source,
        })?;
        info!(path = %catalog.display(), rows = stars.len(), "Loaded star catalog");

        let binary = match kernel {
            Some(path) => {
                let bytes = tokio::fs::read(path)
                    .await
                    .map_err(|source| CatalogError::Read {
                        path: path.to_path_buf(),
                        source,
                    })?;
                debug!(path = %path.display(), bytes = bytes.len(), "Loaded kernel binary");
                bytes
            }
            None => Vec::new(),
        };

        Ok(Self::new(stars, binary))
    }
}

async fn read_to_string(path: &Path) -> Result<String, CatalogError> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|source| CatalogError::Read {
            path: path.to_path_buf(),
            source,
        })
}

/// A JSON array of strings, or one row per non-blank line.
fn parse_rows(text: &str) -> Result<Vec<String>, serde_json::Error> {
    let trimmed = text.trim_start();
    if trimmed.starts_with('[') {
        return serde_json::from_str(trimmed);
    }
    Ok(text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_json_rows() {
        let rows = parse_rows(r#" ["10,20,0.5", "30,-40,1"] "#).unwrap();
        assert_eq!(rows, vec!["10,20,0.5", "30,-40,1"]);
    }

    #[test]
    fn test_parse_line_rows_skips_blanks() {
        let rows = parse_rows("10,20,0.5\n\n  30,-40,1  \n").unwrap();
        assert_eq!(rows, vec!["10,20,0.5", "30,-40,1"]);
    }

    #[test]
    fn test_parse_json_rejects_non_strings() {
        assert!(parse_rows("[1, 2, 3]").is_err());
    }

    #[tokio::test]
    async fn test_load_catalog_and_kernel() {
        let dir = TempDir::new().unwrap();
        let catalog = dir.path().join("stars.json");
        let kernel = dir.path().join("kernel.wasm");
        std::fs::write(&catalog, r#"["1,2,0.3","4,5,0.6","7,8,0.9"]"#).unwrap();
        std::fs::write(&kernel, b"\0asm\x01\0\0\0").unwrap();

        let assets = PoolAssets::load(&catalog, Some(&kernel)).await.unwrap();
        assert_eq!(assets.stars.len(), 3);
        assert_eq!(&assets.kernel[..4], b"\0asm");
    }

    #[tokio::test]
    async fn test_load_without_kernel_is_native() {
        let dir = TempDir::new().unwrap();
        let catalog = dir.path().join("stars.txt");
        std::fs::write(&catalog, "1,2,0.3\n").unwrap();

        let assets = PoolAssets::load(&catalog, None).await.unwrap();
        assert_eq!(assets.stars, vec!["1,2,0.3"]);
        assert!(assets.kernel.is_empty());
    }

    #[tokio::test]
    async fn test_missing_catalog_names_path() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope.json");

        let err = PoolAssets::load(&missing, None).await.unwrap_err();
        assert!(matches!(err, CatalogError::Read { .. }));
        assert!(err.to_string().contains("nope.json"));
    }

    #[tokio::test]
    async fn test_malformed_json_catalog() {
        let dir = TempDir::new().unwrap();
        let catalog = dir.path().join("stars.json");
        std::fs::write(&catalog, "[\"unterminated").unwrap();

        let err = PoolAssets::load(&catalog, None).await.unwrap_err();
        assert!(matches!(err, CatalogError::Json { .. }));
    }
}
