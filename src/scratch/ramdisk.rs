//! RAM-backed volumes
//!
//! Only macOS is supported: the volume is created with
//! `hdiutil attach -nomount ram://<sectors>` and formatted with
//! `diskutil erasevolume`, which also mounts it under `/Volumes`.

use crate::error::{GsbuildError, GsbuildResult};
use crate::platform::Platform;
use crate::process::{CommandSpec, ProcessRunner};
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// 512-byte sectors per MiB
const SECTORS_PER_MB: u64 = 2048;

/// An attached RAM volume
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RamVolume {
    /// Block device, e.g. `/dev/disk4`
    pub device: String,
    /// Where the formatted volume is mounted
    pub mount_point: PathBuf,
}

/// Creates and destroys RAM volumes
#[async_trait]
pub trait RamDiskBackend: Send + Sync {
    /// Whether this backend can work on the current host
    fn supported(&self) -> bool;

    /// Create and mount a volume of `size_mb` MiB
    async fn attach(&self, size_mb: u64) -> GsbuildResult<RamVolume>;

    /// Unmount and release the volume
    async fn detach(&self, volume: &RamVolume) -> GsbuildResult<()>;
}

/// macOS RAM disk via hdiutil/diskutil
pub struct HdiutilRamDisk {
    runner: Arc<dyn ProcessRunner>,
    volume_name: String,
    platform: Platform,
}

impl HdiutilRamDisk {
    pub fn new(runner: Arc<dyn ProcessRunner>, volume_name: impl Into<String>) -> Self {
        Self {
            runner,
            volume_name: volume_name.into(),
            platform: Platform::detect(),
        }
    }

    async fn detach_device(&self, device: &str) -> GsbuildResult<()> {
        let cmd = CommandSpec::new("hdiutil").args(["detach", device, "-force"]);
        let output = self.runner.run(&cmd).await?;
        if output.success() {
            Ok(())
        } else {
            Err(GsbuildError::RamDisk(format!(
                "detaching {} failed: {}",
                device,
                output.tail()
            )))
        }
    }
}

#[async_trait]
impl RamDiskBackend for HdiutilRamDisk {
    fn supported(&self) -> bool {
        let supported = self.platform.supports_ram_disk();
        if !supported {
            debug!("hdiutil RAM disks are unavailable on {}", self.platform.name());
        }
        supported
    }

    async fn attach(&self, size_mb: u64) -> GsbuildResult<RamVolume> {
        info!("Creating {} MiB RAM disk", size_mb);

        let sectors = size_mb.checked_mul(SECTORS_PER_MB).ok_or_else(|| {
            GsbuildError::RamDisk(format!("{} MiB is too large for a RAM disk", size_mb))
        })?;
        let image = format!("ram://{}", sectors);
        let attach = CommandSpec::new("hdiutil").args(["attach", "-nomount", image.as_str()]);
        let output = self.runner.run(&attach).await?;
        if !output.success() {
            return Err(GsbuildError::RamDisk(format!(
                "hdiutil attach failed: {}",
                output.tail()
            )));
        }

        let device = output.stdout.trim().to_string();
        if !device.starts_with("/dev/") {
            return Err(GsbuildError::RamDisk(format!(
                "unexpected hdiutil output: {}",
                device
            )));
        }
        debug!("RAM disk attached at {}", device);

        let format = CommandSpec::new("diskutil").args([
            "erasevolume",
            "HFS+",
            self.volume_name.as_str(),
            device.as_str(),
        ]);
        let failure = match self.runner.run(&format).await {
            Ok(output) if output.success() => None,
            Ok(output) => Some(format!("diskutil erasevolume failed: {}", output.tail())),
            Err(e) => Some(e.to_string()),
        };
        if let Some(reason) = failure {
            if let Err(e) = self.detach_device(&device).await {
                warn!("{}", e);
            }
            return Err(GsbuildError::RamDisk(reason));
        }

        Ok(RamVolume {
            device,
            mount_point: PathBuf::from("/Volumes").join(&self.volume_name),
        })
    }

    async fn detach(&self, volume: &RamVolume) -> GsbuildResult<()> {
        info!("Detaching RAM disk {}", volume.device);
        self.detach_device(&volume.device).await
    }
}
