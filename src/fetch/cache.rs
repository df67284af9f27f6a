//! URL-keyed download cache
//!
//! Entries are named `<hash>_<filename>` where `hash` is the first 12 hex
//! characters of the SHA256 of the URL. Entries are written once and never
//! expire; delete the file to force a fresh download.

use crate::error::{GsbuildError, GsbuildResult};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// On-disk archive cache
#[derive(Debug, Clone)]
pub struct ArtifactCache {
    root: PathBuf,
}

impl ArtifactCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Cache path for `url`
    pub fn entry_path(&self, url: &str) -> PathBuf {
        self.root
            .join(format!("{}_{}", url_hash(url), url_to_filename(url)))
    }

    /// Cached copy of `url`, if one exists
    pub fn lookup(&self, url: &str) -> Option<PathBuf> {
        let path = self.entry_path(url);
        path.is_file().then_some(path)
    }

    /// Copy a freshly downloaded file into the cache.
    ///
    /// Writes to a temporary name first so readers never see a partial entry.
    pub async fn store(&self, url: &str, source: &Path) -> GsbuildResult<PathBuf> {
        fs::create_dir_all(&self.root).await.map_err(|e| {
            GsbuildError::io(format!("creating cache directory {}", self.root.display()), e)
        })?;

        let entry = self.entry_path(url);
        let partial = entry.with_extension(format!("partial-{}", std::process::id()));

        fs::copy(source, &partial).await.map_err(|e| {
            GsbuildError::io(format!("writing cache entry {}", partial.display()), e)
        })?;
        if let Err(e) = fs::rename(&partial, &entry).await {
            let _ = fs::remove_file(&partial).await;
            return Err(GsbuildError::io(
                format!("finalizing cache entry {}", entry.display()),
                e,
            ));
        }

        debug!("Cached {} at {}", url, entry.display());
        Ok(entry)
    }
}

/// SHA256 of the URL, first 12 hex chars
pub fn url_hash(url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(url.as_bytes());
    let result = hasher.finalize();

    // Take first 12 hex characters (6 bytes)
    hex::encode(&result[..6])
}

/// Last path segment of the URL, sanitized for use as a file name
pub fn url_to_filename(url: &str) -> String {
    let without_query = url.split(['?', '#']).next().unwrap_or(url);
    let last = without_query.rsplit('/').next().unwrap_or_default();

    let sanitized: String = last
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect();

    if sanitized.is_empty() || sanitized == "." || sanitized == ".." {
        "download".to_string()
    } else {
        sanitized
    }
}
