//! On-disk cache for platform API responses.
//!
//! Each response body is stored under `{dir}/{sha256(url)}.json`. An entry
//! is fresh while its file modification time is younger than `expire`.
//! The cache never fails a fetch: read and write errors are logged and
//! treated as misses.

use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

#[derive(Debug, Clone)]
pub struct HttpCache {
    dir: PathBuf,
    expire: Duration,
}

impl HttpCache {
    pub fn new(dir: impl Into<PathBuf>, expire: Duration) -> Self {
        Self {
            dir: dir.into(),
            expire,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Cache file path for a URL.
    pub fn path_for(&self, url: &str) -> PathBuf {
        self.dir.join(format!("{}.json", cache_key(url)))
    }

    /// Cached body for `url`, if present and fresh.
    pub async fn get(&self, url: &str) -> Option<String> {
        let path = self.path_for(url);
        let metadata = match tokio::fs::metadata(&path).await {
            Ok(m) => m,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                tracing::warn!("Cache stat failed for {}: {}", path.display(), e);
                return None;
            }
        };

        let age = metadata
            .modified()
            .ok()
            .and_then(|modified| SystemTime::now().duration_since(modified).ok())
            .unwrap_or_default();
        if age > self.expire {
            tracing::debug!("Cache entry expired for {}", url);
            return None;
        }

        match tokio::fs::read_to_string(&path).await {
            Ok(body) => {
                tracing::debug!("Cache hit for {}", url);
                Some(body)
            }
            Err(e) => {
                tracing::warn!("Cache read failed for {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Store `body` for `url`.
    pub async fn put(&self, url: &str, body: &str) {
        if let Err(e) = tokio::fs::create_dir_all(&self.dir).await {
            tracing::warn!("Cannot create cache dir {}: {}", self.dir.display(), e);
            return;
        }
        let path = self.path_for(url);
        if let Err(e) = tokio::fs::write(&path, body).await {
            tracing::warn!("Cache write failed for {}: {}", path.display(), e);
        }
    }
}

/// SHA-256 hex digest of the URL.
pub fn cache_key(url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(url.as_bytes());
    hex::encode(hasher.finalize())
}
