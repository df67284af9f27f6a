//! Build orchestration
//!
//! Drives one Ghostscript build through its stages:
//!
//! ```text
//! init → dependency check → fetch → extract → locate source → configure
//!      → compile → install → relocate binary → smoke test → cleanup → done
//! ```
//!
//! Any fatal error stops the pipeline and is returned as a [`BuildFailure`]
//! tagged with its stage. The scratch space is released on every path.

mod cleanup;
mod configure;
mod jobs;
mod stage;

pub use configure::{configure_command, ConfigureSuccess};
pub use jobs::{available_cpus, clamp_jobs, parallel_jobs};
pub use stage::{BuildFailure, Stage};

use crate::config::Config;
use crate::error::{GsbuildError, GsbuildResult};
use crate::extract::{extract_tar_gz, locate_source};
use crate::fetch::{ArtifactFetcher, CacheOutcome};
use crate::platform;
use crate::process::{CommandSpec, ProcessRunner};
use crate::scratch::{ScratchMode, ScratchProvider, ScratchRequest, ScratchSpace};
use stage::at;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tracing::{debug, info, warn};

/// Everything a build needs, with absolute paths
#[derive(Debug, Clone)]
pub struct BuildOptions {
    pub source_url: String,
    pub product_prefix: String,
    /// Directory the test-file cleanup runs in
    pub work_dir: PathBuf,
    /// Install prefix
    pub build_dir: PathBuf,
    pub output_dir: PathBuf,
    pub output_name: String,
    /// Binary location relative to `build_dir`
    pub installed_binary: PathBuf,
    pub required_tools: Vec<String>,
    pub configure_option_sets: Vec<Vec<String>>,
    pub jobs: usize,
    pub smoke_test_args: Vec<String>,
    pub cleanup: bool,
    pub cleanup_files: Vec<String>,
    pub scratch: ScratchRequest,
}

impl BuildOptions {
    /// Derive options from configuration, resolving paths against `work_dir`
    pub fn from_config(config: &Config, work_dir: &Path) -> Self {
        let resolve = |path: &Path| {
            if path.is_absolute() {
                path.to_path_buf()
            } else {
                work_dir.join(path)
            }
        };

        let ci = platform::is_ci();
        let jobs = parallel_jobs(
            available_cpus(),
            config.build.job_headroom,
            config.build.max_jobs,
        );

        Self {
            source_url: config.source.url.clone(),
            product_prefix: config.source.product_prefix.clone(),
            work_dir: work_dir.to_path_buf(),
            build_dir: resolve(&config.paths.build_dir),
            output_dir: resolve(&config.paths.output_dir),
            output_name: config.paths.output_name.clone(),
            installed_binary: config.paths.installed_binary.clone(),
            required_tools: config.build.required_tools.clone(),
            configure_option_sets: config.build.configure_option_sets.clone(),
            jobs,
            smoke_test_args: config.build.smoke_test_args.clone(),
            cleanup: config.cleanup.enabled,
            cleanup_files: config.cleanup.test_files.clone(),
            scratch: ScratchRequest {
                accelerated: config.ram_disk.enabled,
                size_mb: config.ram_disk.size_mb(ci),
            },
        }
    }

    /// Where `make install` leaves the binary
    pub fn installed_binary_path(&self) -> PathBuf {
        self.build_dir.join(&self.installed_binary)
    }

    /// Where the final binary is copied to
    pub fn output_binary(&self) -> PathBuf {
        self.output_dir.join(&self.output_name)
    }
}

/// Result of the post-build version check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SmokeTest {
    /// Binary ran; first line of its output
    Passed { version: String },
    /// Binary could not run or exited non-zero
    Failed { code: Option<i32>, detail: String },
}

impl SmokeTest {
    pub fn passed(&self) -> bool {
        matches!(self, Self::Passed { .. })
    }
}

/// What the cleanup stage did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CleanupOutcome {
    Removed(Vec<PathBuf>),
    /// Cleanup was not requested
    Disabled,
    /// Requested, but the smoke test did not pass
    SkippedAfterFailedSmokeTest,
}

/// Summary of a successful build
#[derive(Debug, Clone)]
pub struct BuildReport {
    pub scratch: ScratchMode,
    pub cache: CacheOutcome,
    pub source_dir: String,
    pub configure: ConfigureSuccess,
    pub jobs: usize,
    pub binary: PathBuf,
    pub smoke_test: SmokeTest,
    pub cleanup: CleanupOutcome,
}

/// Receives progress notifications
pub trait BuildObserver: Send + Sync {
    fn stage_started(&self, _stage: Stage) {}

    fn stage_completed(&self, _stage: Stage, _detail: &str) {}

    /// The stage finished with a non-fatal problem
    fn stage_warned(&self, _stage: Stage, _detail: &str) {}

    /// A line of compiler output
    fn output_line(&self, _line: &str) {}
}

/// Observer that ignores everything
pub struct SilentObserver;

impl BuildObserver for SilentObserver {}

/// Locale for make, so compiler output is untranslated
const BUILD_LOCALE: (&str, &str) = ("LC_ALL", "C");

/// Runs the build pipeline
pub struct Orchestrator {
    runner: Arc<dyn ProcessRunner>,
    fetcher: ArtifactFetcher,
    scratch: ScratchProvider,
    observer: Arc<dyn BuildObserver>,
}

impl Orchestrator {
    pub fn new(
        runner: Arc<dyn ProcessRunner>,
        fetcher: ArtifactFetcher,
        scratch: ScratchProvider,
    ) -> Self {
        Self {
            runner,
            fetcher,
            scratch,
            observer: Arc::new(SilentObserver),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn BuildObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Run every stage. The scratch space is released before returning.
    pub async fn run(&self, options: &BuildOptions) -> Result<BuildReport, BuildFailure> {
        self.observer.stage_started(Stage::Init);
        debug!("Build options: {:?}", options);
        self.observer.stage_completed(Stage::Init, &options.source_url);

        self.begin(Stage::DependencyCheck);
        self.check_dependencies(&options.required_tools)
            .map_err(at(Stage::DependencyCheck))?;
        self.finish(Stage::DependencyCheck, "all tools found");

        self.begin(Stage::Fetch);
        let space = self
            .scratch
            .acquire(options.scratch)
            .await
            .map_err(at(Stage::Fetch))?;

        let result = self.run_in(&space, options).await;
        self.scratch.release(space).await;

        if result.is_ok() {
            self.finish(Stage::Done, "");
        }
        result
    }

    async fn run_in(
        &self,
        space: &ScratchSpace,
        options: &BuildOptions,
    ) -> Result<BuildReport, BuildFailure> {
        let fetched = self
            .fetcher
            .fetch(&options.source_url, space.path())
            .await
            .map_err(at(Stage::Fetch))?;
        self.finish(Stage::Fetch, &fetched.outcome.to_string());

        self.begin(Stage::Extract);
        let extract_root = space.path().join("source");
        extract_tar_gz(&fetched.path, &extract_root)
            .await
            .map_err(at(Stage::Extract))?;
        self.finish(Stage::Extract, "");

        self.begin(Stage::LocateSource);
        let source_dir =
            locate_source(&extract_root, &options.product_prefix).map_err(at(Stage::LocateSource))?;
        let source_name = source_dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        info!("Found source directory: {}", source_dir.display());
        self.finish(Stage::LocateSource, &source_name);

        self.begin(Stage::Configure);
        let configured = configure::run_configure(
            self.runner.as_ref(),
            &source_dir,
            &options.configure_option_sets,
            &options.build_dir,
        )
        .await
        .map_err(at(Stage::Configure))?;
        self.finish(
            Stage::Configure,
            &format!("option set {}", configured.attempt),
        );

        self.begin(Stage::Compile);
        self.compile(&source_dir, options.jobs)
            .await
            .map_err(at(Stage::Compile))?;
        self.finish(Stage::Compile, &format!("{} jobs", options.jobs));

        self.begin(Stage::Install);
        self.install(&source_dir)
            .await
            .map_err(at(Stage::Install))?;
        self.finish(Stage::Install, &options.build_dir.display().to_string());

        self.begin(Stage::RelocateBinary);
        let binary = relocate_binary(&options.installed_binary_path(), &options.output_binary())
            .await
            .map_err(at(Stage::RelocateBinary))?;
        self.finish(Stage::RelocateBinary, &binary.display().to_string());

        self.begin(Stage::SmokeTest);
        let smoke_test = self.smoke_test(&binary, &options.smoke_test_args).await;
        match smoke_test {
            SmokeTest::Passed { ref version } => self.finish(Stage::SmokeTest, version),
            SmokeTest::Failed { ref detail, .. } => {
                warn!("Binary test failed: {}", detail);
                self.observer.stage_warned(Stage::SmokeTest, detail);
            }
        }

        let cleanup = if !options.cleanup {
            info!("Build artifacts retained");
            CleanupOutcome::Disabled
        } else if !smoke_test.passed() {
            info!("Skipping cleanup because the binary test failed");
            CleanupOutcome::SkippedAfterFailedSmokeTest
        } else {
            self.begin(Stage::Cleanup);
            let removed = cleanup::remove_artifacts(
                &options.build_dir,
                &options.work_dir,
                &options.cleanup_files,
            )
            .await
            .map_err(at(Stage::Cleanup))?;
            self.finish(Stage::Cleanup, &format!("{} paths removed", removed.len()));
            CleanupOutcome::Removed(removed)
        };

        Ok(BuildReport {
            scratch: space.mode(),
            cache: fetched.outcome,
            source_dir: source_name,
            configure: configured,
            jobs: options.jobs,
            binary,
            smoke_test,
            cleanup,
        })
    }

    fn begin(&self, stage: Stage) {
        info!("Stage: {}", stage);
        self.observer.stage_started(stage);
    }

    fn finish(&self, stage: Stage, detail: &str) {
        self.observer.stage_completed(stage, detail);
    }

    /// All required tools must resolve on PATH; every missing one is reported
    fn check_dependencies(&self, tools: &[String]) -> GsbuildResult<()> {
        let missing: Vec<String> = tools
            .iter()
            .filter(|tool| match self.runner.locate(tool) {
                Some(path) => {
                    debug!("Found {} at {}", tool, path.display());
                    false
                }
                None => true,
            })
            .cloned()
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(GsbuildError::DependencyMissing { tools: missing })
        }
    }

    async fn compile(&self, source_dir: &Path, jobs: usize) -> GsbuildResult<()> {
        info!("Building with {} parallel jobs", jobs);
        let cmd = CommandSpec::new("make")
            .arg(format!("-j{}", jobs))
            .current_dir(source_dir)
            .env(BUILD_LOCALE.0, BUILD_LOCALE.1);

        let observer = &self.observer;
        let on_line = |line: &str| observer.output_line(line);
        let output = self.runner.run_streaming(&cmd, &on_line).await?;

        if output.success() {
            Ok(())
        } else {
            Err(GsbuildError::Compile {
                output: output.tail(),
            })
        }
    }

    async fn install(&self, source_dir: &Path) -> GsbuildResult<()> {
        let cmd = CommandSpec::new("make")
            .arg("install")
            .current_dir(source_dir)
            .env(BUILD_LOCALE.0, BUILD_LOCALE.1);
        let output = self.runner.run(&cmd).await?;

        if output.success() {
            Ok(())
        } else {
            Err(GsbuildError::Install {
                output: output.tail(),
            })
        }
    }

    async fn smoke_test(&self, binary: &Path, args: &[String]) -> SmokeTest {
        let cmd = CommandSpec::new(binary.to_string_lossy()).args(args.iter().cloned());

        match self.runner.run(&cmd).await {
            Ok(output) if output.success() => SmokeTest::Passed {
                version: output.stdout.lines().next().unwrap_or("").trim().to_string(),
            },
            Ok(output) => SmokeTest::Failed {
                code: output.code,
                detail: format!(
                    "exit code {}",
                    output.code.map_or("none".to_string(), |c| c.to_string())
                ),
            },
            Err(e) => SmokeTest::Failed {
                code: None,
                detail: e.to_string(),
            },
        }
    }
}

/// Copy the installed binary to `dest` and make it executable
async fn relocate_binary(installed: &Path, dest: &Path) -> GsbuildResult<PathBuf> {
    if !installed.is_file() {
        return Err(GsbuildError::MissingArtifact(installed.to_path_buf()));
    }

    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)
            .await
            .map_err(|e| GsbuildError::io(format!("creating {}", parent.display()), e))?;
    }

    fs::copy(installed, dest).await.map_err(|e| {
        GsbuildError::io(
            format!("copying {} to {}", installed.display(), dest.display()),
            e,
        )
    })?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(dest, std::fs::Permissions::from_mode(0o755))
            .await
            .map_err(|e| GsbuildError::io(format!("setting permissions on {}", dest.display()), e))?;
    }

    info!("Standalone Ghostscript binary created: {}", dest.display());
    Ok(dest.to_path_buf())
}
