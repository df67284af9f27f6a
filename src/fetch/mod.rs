//! Source archive acquisition
//!
//! Resolves an archive from the URL-keyed cache or downloads it, storing new
//! downloads into the cache.
//!
//! | Outcome | Network | Cache write |
//! |---------|---------|-------------|
//! | Hit | none | none |
//! | Miss | one download | one copy (best effort) |
//! | Disabled | one download | none |

pub mod cache;
mod http;

pub use cache::ArtifactCache;
pub use http::HttpDownloader;

use crate::error::{GsbuildError, GsbuildResult};
use async_trait::async_trait;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tracing::{debug, info, warn};

/// Fetches a URL into a local file
#[async_trait]
pub trait Downloader: Send + Sync {
    /// Download `url` to `dest`, returning the byte count
    async fn download(&self, url: &str, dest: &Path) -> GsbuildResult<u64>;
}

/// How the archive was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheOutcome {
    /// Copied from the cache
    Hit,
    /// Downloaded and stored in the cache
    Miss,
    /// Downloaded, caching disabled
    Disabled,
}

impl fmt::Display for CacheOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Hit => "cache hit",
            Self::Miss => "downloaded",
            Self::Disabled => "downloaded (cache disabled)",
        };
        write!(f, "{}", name)
    }
}

/// Archive placed in the working directory
#[derive(Debug, Clone)]
pub struct FetchedArchive {
    pub path: PathBuf,
    pub outcome: CacheOutcome,
}

/// Cache-aware archive fetcher
pub struct ArtifactFetcher {
    downloader: Arc<dyn Downloader>,
    cache: Option<ArtifactCache>,
}

impl ArtifactFetcher {
    pub fn new(downloader: Arc<dyn Downloader>, cache: Option<ArtifactCache>) -> Self {
        Self { downloader, cache }
    }

    /// Place the archive for `url` inside `dest_dir`
    pub async fn fetch(&self, url: &str, dest_dir: &Path) -> GsbuildResult<FetchedArchive> {
        let dest = dest_dir.join(cache::url_to_filename(url));

        let Some(ref cache) = self.cache else {
            self.downloader.download(url, &dest).await?;
            return Ok(FetchedArchive {
                path: dest,
                outcome: CacheOutcome::Disabled,
            });
        };

        if let Some(entry) = cache.lookup(url) {
            info!("Using cached archive {}", entry.display());
            fs::copy(&entry, &dest).await.map_err(|e| {
                GsbuildError::io(format!("copying cached archive {}", entry.display()), e)
            })?;
            return Ok(FetchedArchive {
                path: dest,
                outcome: CacheOutcome::Hit,
            });
        }

        debug!("Cache miss for {}", url);
        self.downloader.download(url, &dest).await?;

        if let Err(e) = cache.store(url, &dest).await {
            warn!("Could not cache download: {}", e);
        }

        Ok(FetchedArchive {
            path: dest,
            outcome: CacheOutcome::Miss,
        })
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::Mutex;

    /// Serves fixed bytes (or a failure) and counts calls
    pub(crate) struct FakeDownloader {
        body: Option<Vec<u8>>,
        calls: Mutex<Vec<String>>,
    }

    impl FakeDownloader {
        pub fn serving(body: Vec<u8>) -> Self {
            Self {
                body: Some(body),
                calls: Mutex::new(Vec::new()),
            }
        }

        pub fn failing() -> Self {
            Self {
                body: None,
                calls: Mutex::new(Vec::new()),
            }
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl Downloader for FakeDownloader {
        async fn download(&self, url: &str, dest: &Path) -> GsbuildResult<u64> {
            self.calls.lock().unwrap().push(url.to_string());
            match self.body {
                Some(ref body) => {
                    std::fs::write(dest, body).map_err(|e| GsbuildError::io("fake write", e))?;
                    Ok(body.len() as u64)
                }
                None => Err(GsbuildError::fetch(url, "http status: 404")),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::FakeDownloader;
    use super::*;
    use tempfile::TempDir;

    const URL: &str = "https://example.com/ghostscript-1.0.tar.gz";

    fn setup(downloader: Arc<FakeDownloader>) -> (TempDir, ArtifactFetcher, PathBuf) {
        let dir = TempDir::new().unwrap();
        let cache = ArtifactCache::new(dir.path().join("cache"));
        let work = dir.path().join("work");
        std::fs::create_dir(&work).unwrap();
        (dir, ArtifactFetcher::new(downloader, Some(cache)), work)
    }

    #[tokio::test]
    async fn miss_downloads_once_and_populates_cache() {
        let downloader = Arc::new(FakeDownloader::serving(b"tarball".to_vec()));
        let (dir, fetcher, work) = setup(downloader.clone());

        let fetched = fetcher.fetch(URL, &work).await.unwrap();

        assert_eq!(fetched.outcome, CacheOutcome::Miss);
        assert_eq!(downloader.call_count(), 1);
        assert_eq!(std::fs::read(&fetched.path).unwrap(), b"tarball");
        let cache = ArtifactCache::new(dir.path().join("cache"));
        assert!(cache.lookup(URL).is_some());
    }

    #[tokio::test]
    async fn hit_never_downloads() {
        let downloader = Arc::new(FakeDownloader::serving(b"tarball".to_vec()));
        let (_dir, fetcher, work) = setup(downloader.clone());

        fetcher.fetch(URL, &work).await.unwrap();
        std::fs::remove_file(work.join("ghostscript-1.0.tar.gz")).unwrap();

        let fetched = fetcher.fetch(URL, &work).await.unwrap();

        assert_eq!(fetched.outcome, CacheOutcome::Hit);
        assert_eq!(downloader.call_count(), 1);
        assert_eq!(std::fs::read(&fetched.path).unwrap(), b"tarball");
    }

    #[tokio::test]
    async fn failed_download_leaves_cache_untouched() {
        let downloader = Arc::new(FakeDownloader::failing());
        let (dir, fetcher, work) = setup(downloader);

        let err = fetcher.fetch(URL, &work).await.unwrap_err();

        assert!(matches!(err, GsbuildError::Fetch { .. }));
        assert!(!dir.path().join("cache").exists());
    }

    #[tokio::test]
    async fn disabled_cache_always_downloads() {
        let downloader = Arc::new(FakeDownloader::serving(b"x".to_vec()));
        let dir = TempDir::new().unwrap();
        let fetcher = ArtifactFetcher::new(downloader.clone(), None);

        let first = fetcher.fetch(URL, dir.path()).await.unwrap();
        let second = fetcher.fetch(URL, dir.path()).await.unwrap();

        assert_eq!(first.outcome, CacheOutcome::Disabled);
        assert_eq!(second.outcome, CacheOutcome::Disabled);
        assert_eq!(downloader.call_count(), 2);
    }
}
