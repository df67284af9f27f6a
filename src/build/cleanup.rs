//! Post-build artifact removal

use crate::error::{GsbuildError, GsbuildResult};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::info;

/// Remove the install prefix and known generated test files.
///
/// Paths that do not exist are skipped. Returns what was removed.
pub async fn remove_artifacts(
    build_dir: &Path,
    work_dir: &Path,
    test_files: &[String],
) -> GsbuildResult<Vec<PathBuf>> {
    let mut removed = Vec::new();

    match fs::remove_dir_all(build_dir).await {
        Ok(()) => {
            info!("Removed build directory: {}", build_dir.display());
            removed.push(build_dir.to_path_buf());
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => {
            return Err(GsbuildError::io(
                format!("removing {}", build_dir.display()),
                e,
            ))
        }
    }

    for name in test_files {
        let path = work_dir.join(name);
        match fs::remove_file(&path).await {
            Ok(()) => {
                info!("Removed test file: {}", name);
                removed.push(path);
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(GsbuildError::io(format!("removing {}", path.display()), e)),
        }
    }

    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn removes_build_dir_and_present_files() {
        let dir = TempDir::new().unwrap();
        let build = dir.path().join("build");
        std::fs::create_dir_all(build.join("bin")).unwrap();
        std::fs::write(build.join("bin/gs"), b"").unwrap();
        std::fs::write(dir.path().join("test.ps"), b"%!").unwrap();
        std::fs::write(dir.path().join("keep.pdf"), b"").unwrap();

        let files = vec!["test.ps".to_string(), "test_info.pdf".to_string()];
        let removed = remove_artifacts(&build, dir.path(), &files).await.unwrap();

        assert_eq!(removed, vec![build.clone(), dir.path().join("test.ps")]);
        assert!(!build.exists());
        assert!(dir.path().join("keep.pdf").exists());
    }

    #[tokio::test]
    async fn nothing_to_remove_is_ok() {
        let dir = TempDir::new().unwrap();
        let removed = remove_artifacts(
            &dir.path().join("build"),
            dir.path(),
            &["test.ps".to_string()],
        )
        .await
        .unwrap();
        assert!(removed.is_empty());
    }
}
