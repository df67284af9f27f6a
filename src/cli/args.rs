//! CLI argument definitions using clap derive

use clap::{ArgAction, Parser};
use std::path::PathBuf;

/// gsbuild - Standalone Ghostscript builder
///
/// Downloads the Ghostscript source release, builds it with the host
/// toolchain and leaves a single self-contained binary in ./bin.
#[derive(Parser, Debug)]
#[command(name = "gsbuild")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Remove build artifacts and test files after a successful build (default)
    #[arg(long, conflicts_with = "no_cleanup")]
    pub cleanup: bool,

    /// Keep build artifacts and test files
    #[arg(long)]
    pub no_cleanup: bool,

    /// Build in a regular temporary directory instead of a RAM disk
    #[arg(long)]
    pub no_ram_disk: bool,

    /// Always download the source archive, bypassing the cache
    #[arg(long)]
    pub no_cache: bool,

    /// Parallel make jobs (capped by build.max_jobs)
    #[arg(short, long, value_parser = clap::value_parser!(u16).range(1..))]
    pub jobs: Option<u16>,

    /// Configuration file path
    #[arg(short, long, env = "GSBUILD_CONFIG")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// Whether cleanup should run, given the configured default
    pub fn cleanup_enabled(&self, configured: bool) -> bool {
        if self.no_cleanup {
            false
        } else if self.cleanup {
            true
        } else {
            configured
        }
    }
}
