//! Configuration schema for gsbuild
//!
//! Configuration is stored at `~/.config/gsbuild/config.toml`

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Upstream Ghostscript release tarball
pub const DEFAULT_SOURCE_URL: &str = "https://github.com/ArtifexSoftware/ghostpdl-downloads/releases/download/gs10051/ghostscript-10.05.1.tar.gz";

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Source archive settings
    pub source: SourceConfig,

    /// Output and install locations
    pub paths: PathsConfig,

    /// Configure/compile settings
    pub build: BuildConfig,

    /// RAM disk settings
    pub ram_disk: RamDiskConfig,

    /// Download cache settings
    pub cache: CacheConfig,

    /// Post-build cleanup settings
    pub cleanup: CleanupConfig,
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log format: "text" or "json"
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_format: "text".to_string(),
        }
    }
}

/// Where the source comes from
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Release tarball URL
    pub url: String,

    /// Name prefix of the top-level directory inside the tarball
    pub product_prefix: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_SOURCE_URL.to_string(),
            product_prefix: "ghostscript".to_string(),
        }
    }
}

/// Output locations, relative paths resolve against the working directory
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Install prefix passed to configure
    pub build_dir: PathBuf,

    /// Directory receiving the final binary
    pub output_dir: PathBuf,

    /// File name of the final binary
    pub output_name: String,

    /// Binary location relative to the install prefix
    pub installed_binary: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            build_dir: PathBuf::from("build"),
            output_dir: PathBuf::from("bin"),
            output_name: "ghostscript".to_string(),
            installed_binary: PathBuf::from("bin").join("gs"),
        }
    }
}

/// Configure and compile settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Tools that must be on PATH before anything else happens
    pub required_tools: Vec<String>,

    /// Configure option sets, tried in order (`--prefix` is appended)
    pub configure_option_sets: Vec<Vec<String>>,

    /// Upper bound for `make -j`
    pub max_jobs: usize,

    /// Jobs added on top of the CPU count
    pub job_headroom: usize,

    /// Arguments for the post-build smoke test
    pub smoke_test_args: Vec<String>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            required_tools: to_strings(&["gcc", "make", "autoconf"]),
            configure_option_sets: vec![
                to_strings(&[
                    "--disable-cups",
                    "--disable-gtk",
                    "--disable-dbus",
                    "--disable-fontconfig",
                    "--without-x",
                    "--without-libidn",
                    "--without-libpaper",
                    "--without-ijs",
                    "--without-tesseract",
                    "CFLAGS=-O2",
                ]),
                to_strings(&["--disable-cups", "--without-x"]),
                Vec::new(),
            ],
            max_jobs: 16,
            job_headroom: 2,
            smoke_test_args: to_strings(&["--version"]),
        }
    }
}

/// RAM disk acceleration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RamDiskConfig {
    /// Attempt to build on a RAM disk
    pub enabled: bool,

    /// Volume label for the RAM disk
    pub volume_name: String,

    /// Size in MiB when running under CI
    pub ci_size_mb: u64,

    /// Size in MiB otherwise
    pub local_size_mb: u64,
}

impl RamDiskConfig {
    /// Pick the RAM disk size for the current environment
    pub fn size_mb(&self, ci: bool) -> u64 {
        if ci {
            self.ci_size_mb
        } else {
            self.local_size_mb
        }
    }
}

impl Default for RamDiskConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            volume_name: "GhostscriptBuild".to_string(),
            ci_size_mb: 4096,
            local_size_mb: 2048,
        }
    }
}

/// Download cache settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Reuse previously downloaded archives
    pub enabled: bool,

    /// Cache directory override
    pub dir: Option<PathBuf>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: None,
        }
    }
}

/// Post-build cleanup settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CleanupConfig {
    /// Remove build artifacts after a successful run
    pub enabled: bool,

    /// Generated sample files removed from the working directory
    pub test_files: Vec<String>,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            test_files: to_strings(&[
                "test.ps",
                "test_original.pdf",
                "test_prepress.pdf",
                "test_printer.pdf",
                "test_ebook.pdf",
                "test_screen.pdf",
                "test_max_compression.pdf",
                "test_info.pdf",
            ]),
        }
    }
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
