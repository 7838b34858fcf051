// Cache-or-fetch wrapper
// Datasets are stored as JSON files in a single directory and are never invalidated;
// delete a file to force a refetch.

use anyhow::Context;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

pub const RESERVATIONS_DATASET: &str = "reservations.json";
pub const FINANCIALS_DATASET: &str = "financials.json";

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("failed to read `{path}`: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse `{path}`: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to serialize `{name}`: {source}")]
    Serialize {
        name: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to write `{path}`: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone)]
pub struct DatasetCache {
    dir: PathBuf,
}

impl DatasetCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    // Returns the stored dataset if it can be read back, otherwise runs `fetch`
    // and stores its result. A failed write is logged and the fresh data returned anyway.
    pub async fn fetch_or_load<T, F, Fut>(&self, name: &str, fetch: F) -> anyhow::Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        let path = self.path_for(name);

        match self.load(&path).await {
            Ok(data) => {
                info!(dataset = name, "found in cache, skipping fetching data");
                return Ok(data);
            }
            Err(err) => {
                info!(dataset = name, "not found in cache, fetching data");
                debug!(dataset = name, error = %err, "cache miss");
            }
        }

        let data = fetch().await.context("failed to fetch data")?;

        if let Err(err) = self.store(name, &path, &data).await {
            warn!(dataset = name, error = %err, "could not store dataset in cache");
        }

        Ok(data)
    }

    async fn load<T: DeserializeOwned>(&self, path: &Path) -> Result<T, CacheError> {
        let raw = tokio::fs::read(path).await.map_err(|source| CacheError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_slice(&raw).map_err(|source| CacheError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    async fn store<T: Serialize>(&self, name: &str, path: &Path, data: &T) -> Result<(), CacheError> {
        let raw = serde_json::to_vec_pretty(data).map_err(|source| CacheError::Serialize {
            name: name.to_string(),
            source,
        })?;
        write_private(path, &raw)
            .await
            .map_err(|source| CacheError::Write {
                path: path.to_path_buf(),
                source,
            })
    }
}

// Datasets hold personal trip and billing history, so new files are owner-only on Unix
async fn write_private(path: &Path, raw: &[u8]) -> std::io::Result<()> {
    use tokio::io::AsyncWriteExt;

    let mut options = tokio::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    options.mode(0o600);

    let mut file = options.open(path).await?;
    file.write_all(raw).await?;
    file.flush().await
}
