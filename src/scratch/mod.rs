//! Scratch space for a single build
//!
//! A scratch space is either a plain temporary directory or a temporary
//! directory inside a RAM volume. RAM volume provisioning never fails the
//! build: any error downgrades to a plain directory.
//!
//! Release removes the directory first and then detaches the volume. The
//! directory is also removed by its drop guard if release never runs.

mod ramdisk;

pub use ramdisk::{HdiutilRamDisk, RamDiskBackend, RamVolume};

use crate::error::{GsbuildError, GsbuildResult};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use tracing::{info, warn};

const DIR_PREFIX: &str = "gsbuild-";

/// What kind of scratch space the caller wants
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScratchRequest {
    /// Try a RAM volume first
    pub accelerated: bool,
    /// RAM volume size in MiB
    pub size_mb: u64,
}

impl ScratchRequest {
    pub fn plain() -> Self {
        Self {
            accelerated: false,
            size_mb: 0,
        }
    }
}

/// Scratch space kind, for reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScratchMode {
    Accelerated,
    Plain,
}

impl fmt::Display for ScratchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Accelerated => write!(f, "RAM disk"),
            Self::Plain => write!(f, "temporary directory"),
        }
    }
}

/// An acquired working root
#[derive(Debug)]
pub enum ScratchSpace {
    /// Temporary directory inside a RAM volume
    Accelerated { dir: TempDir, volume: RamVolume },
    /// Temporary directory on the regular filesystem
    Plain { dir: TempDir },
}

impl ScratchSpace {
    pub fn path(&self) -> &Path {
        match self {
            Self::Accelerated { dir, .. } | Self::Plain { dir } => dir.path(),
        }
    }

    pub fn mode(&self) -> ScratchMode {
        match self {
            Self::Accelerated { .. } => ScratchMode::Accelerated,
            Self::Plain { .. } => ScratchMode::Plain,
        }
    }
}

/// Hands out and tears down scratch spaces
pub struct ScratchProvider {
    backend: Arc<dyn RamDiskBackend>,
    temp_root: Option<PathBuf>,
}

impl ScratchProvider {
    pub fn new(backend: Arc<dyn RamDiskBackend>) -> Self {
        Self {
            backend,
            temp_root: None,
        }
    }

    /// Create plain scratch directories under `root` instead of the system temp dir
    pub fn with_temp_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.temp_root = Some(root.into());
        self
    }

    /// Acquire a scratch space, falling back to plain on any RAM disk problem
    pub async fn acquire(&self, request: ScratchRequest) -> GsbuildResult<ScratchSpace> {
        if request.accelerated {
            if self.backend.supported() {
                match self.acquire_accelerated(request.size_mb).await {
                    Ok(space) => return Ok(space),
                    Err(e) => warn!("{}; using a regular temporary directory", e),
                }
            } else {
                info!("RAM disk not supported on this platform");
            }
        }

        let dir = self.plain_dir()?;
        info!("Using scratch directory {}", dir.path().display());
        Ok(ScratchSpace::Plain { dir })
    }

    async fn acquire_accelerated(&self, size_mb: u64) -> GsbuildResult<ScratchSpace> {
        let volume = self.backend.attach(size_mb).await?;

        match tempfile::Builder::new()
            .prefix(DIR_PREFIX)
            .tempdir_in(&volume.mount_point)
        {
            Ok(dir) => {
                info!("Using RAM disk scratch directory {}", dir.path().display());
                Ok(ScratchSpace::Accelerated { dir, volume })
            }
            Err(e) => {
                if let Err(detach_err) = self.backend.detach(&volume).await {
                    warn!("{}", detach_err);
                }
                Err(GsbuildError::RamDisk(format!(
                    "creating directory on {}: {}",
                    volume.mount_point.display(),
                    e
                )))
            }
        }
    }

    fn plain_dir(&self) -> GsbuildResult<TempDir> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(DIR_PREFIX);
        let result = match self.temp_root {
            Some(ref root) => builder.tempdir_in(root),
            None => builder.tempdir(),
        };
        result.map_err(|e| GsbuildError::io("creating scratch directory", e))
    }

    /// Tear down everything `acquire` produced. Problems are logged, not returned.
    pub async fn release(&self, space: ScratchSpace) {
        match space {
            ScratchSpace::Plain { dir } => remove_dir(dir),
            ScratchSpace::Accelerated { dir, volume } => {
                remove_dir(dir);
                if let Err(e) = self.backend.detach(&volume).await {
                    warn!("{}", e);
                }
            }
        }
    }
}

fn remove_dir(dir: TempDir) {
    let path = dir.path().to_path_buf();
    if let Err(e) = dir.close() {
        warn!("Failed to remove scratch directory {}: {}", path.display(), e);
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// RAM disk stand-in that "mounts" a regular directory
    pub(crate) struct FakeRamDisk {
        mount: PathBuf,
        supported: bool,
        fail_attach: bool,
        attached: AtomicUsize,
        detached: AtomicUsize,
    }

    impl FakeRamDisk {
        pub fn new(mount: impl Into<PathBuf>) -> Self {
            Self {
                mount: mount.into(),
                supported: true,
                fail_attach: false,
                attached: AtomicUsize::new(0),
                detached: AtomicUsize::new(0),
            }
        }

        pub fn unsupported(mut self) -> Self {
            self.supported = false;
            self
        }

        pub fn failing(mut self) -> Self {
            self.fail_attach = true;
            self
        }

        pub fn attached(&self) -> usize {
            self.attached.load(Ordering::SeqCst)
        }

        pub fn detached(&self) -> usize {
            self.detached.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl RamDiskBackend for FakeRamDisk {
        fn supported(&self) -> bool {
            self.supported
        }

        async fn attach(&self, _size_mb: u64) -> GsbuildResult<RamVolume> {
            if self.fail_attach {
                return Err(GsbuildError::RamDisk("permission denied".to_string()));
            }
            self.attached.fetch_add(1, Ordering::SeqCst);
            Ok(RamVolume {
                device: "/dev/fake0".to_string(),
                mount_point: self.mount.clone(),
            })
        }

        async fn detach(&self, _volume: &RamVolume) -> GsbuildResult<()> {
            self.detached.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }
}
