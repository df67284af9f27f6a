//! Gzip-compressed tar extraction

use crate::error::{GsbuildError, GsbuildResult};
use flate2::read::GzDecoder;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tar::Archive;
use tracing::info;

/// Unpack `archive` into `dest`, preserving relative paths and permissions.
///
/// A failure part way through leaves whatever was already written in place.
pub async fn extract_tar_gz(archive: &Path, dest: &Path) -> GsbuildResult<()> {
    info!("Extracting {}", archive.display());

    let archive_owned = archive.to_path_buf();
    let dest_owned = dest.to_path_buf();
    tokio::task::spawn_blocking(move || unpack(&archive_owned, &dest_owned))
        .await
        .map_err(|e| GsbuildError::Internal(format!("extraction task failed: {}", e)))??;

    info!("Extraction complete");
    Ok(())
}

fn unpack(archive_path: &Path, dest: &Path) -> GsbuildResult<()> {
    let extract_err = |reason: String| GsbuildError::Extract {
        archive: archive_path.to_path_buf(),
        reason,
    };

    let file = File::open(archive_path).map_err(|e| extract_err(e.to_string()))?;
    std::fs::create_dir_all(dest)
        .map_err(|e| extract_err(format!("creating {}: {}", dest.display(), e)))?;

    let mut archive = Archive::new(GzDecoder::new(BufReader::new(file)));
    archive.set_preserve_permissions(true);
    archive
        .unpack(dest)
        .map_err(|e| extract_err(format!("unpacking into {}: {}", dest.display(), e)))
}

/// Find the extracted source root: an immediate child directory of `root`
/// whose name starts with `prefix`.
///
/// Matches are sorted by name so the choice is stable across filesystems.
pub fn locate_source(root: &Path, prefix: &str) -> GsbuildResult<PathBuf> {
    let entries = std::fs::read_dir(root)
        .map_err(|e| GsbuildError::io(format!("reading {}", root.display()), e))?;

    let mut matches: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().map(|t| t.is_dir()).unwrap_or(false))
        .filter(|entry| entry.file_name().to_string_lossy().starts_with(prefix))
        .map(|entry| entry.path())
        .collect();
    matches.sort();

    if matches.len() > 1 {
        tracing::warn!(
            "{} directories match '{}', using {}",
            matches.len(),
            prefix,
            matches[0].display()
        );
    }

    matches
        .into_iter()
        .next()
        .ok_or_else(|| GsbuildError::SourceNotFound {
            root: root.to_path_buf(),
            prefix: prefix.to_string(),
        })
}
