//! Blocking HTTP download via ureq, run off the async executor

use super::Downloader;
use crate::error::{GsbuildError, GsbuildResult};
use async_trait::async_trait;
use std::fs::File;
use std::path::Path;
use tracing::info;

const USER_AGENT: &str = concat!("gsbuild/", env!("CARGO_PKG_VERSION"));

/// Downloads over HTTP(S); non-2xx responses are errors
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpDownloader;

impl HttpDownloader {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Downloader for HttpDownloader {
    async fn download(&self, url: &str, dest: &Path) -> GsbuildResult<u64> {
        info!("Downloading {}", url);

        let url_owned = url.to_string();
        let dest_owned = dest.to_path_buf();
        let bytes = tokio::task::spawn_blocking(move || download_blocking(&url_owned, &dest_owned))
            .await
            .map_err(|e| GsbuildError::Internal(format!("download task failed: {}", e)))?;

        match bytes {
            Ok(bytes) => {
                info!("Downloaded {} bytes to {}", bytes, dest.display());
                Ok(bytes)
            }
            Err(e) => {
                let _ = tokio::fs::remove_file(dest).await;
                Err(e)
            }
        }
    }
}

fn download_blocking(url: &str, dest: &Path) -> GsbuildResult<u64> {
    let mut response = ureq::get(url)
        .header("User-Agent", USER_AGENT)
        .call()
        .map_err(|e| GsbuildError::fetch(url, e))?;

    let mut file = File::create(dest)
        .map_err(|e| GsbuildError::io(format!("creating {}", dest.display()), e))?;

    let mut reader = response.body_mut().as_reader();
    std::io::copy(&mut reader, &mut file).map_err(|e| GsbuildError::fetch(url, e))
}
