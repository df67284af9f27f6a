//! Build command - wires the real runner, downloader and RAM disk into the
//! orchestrator and reports progress

use super::Cli;
use crate::build::{
    clamp_jobs, BuildObserver, BuildOptions, BuildReport, CleanupOutcome, Orchestrator,
    SmokeTest, Stage,
};
use crate::config::{Config, ConfigManager};
use crate::error::{GsbuildError, GsbuildResult};
use crate::fetch::{ArtifactCache, ArtifactFetcher, HttpDownloader};
use crate::process::{ProcessRunner, SystemRunner};
use crate::scratch::{HdiutilRamDisk, ScratchProvider, ScratchRequest};
use crate::ui::{self, StageProgress, UiContext};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Execute a build in the current directory
pub async fn execute(cli: &Cli, config: &Config) -> GsbuildResult<()> {
    let ctx = UiContext::detect();

    let work_dir = std::env::current_dir()
        .map_err(|e| GsbuildError::io("getting current directory", e))?;
    let options = build_options(cli, config, &work_dir);

    let runner: Arc<dyn ProcessRunner> = Arc::new(SystemRunner::new());
    let fetcher =
        ArtifactFetcher::new(Arc::new(HttpDownloader::new()), download_cache(cli, config));
    let ram_disk = HdiutilRamDisk::new(runner.clone(), config.ram_disk.volume_name.clone());
    let scratch = ScratchProvider::new(Arc::new(ram_disk));

    let observer = Arc::new(UiObserver::new(ctx.clone()));
    let orchestrator =
        Orchestrator::new(runner, fetcher, scratch).with_observer(observer.clone());

    ui::intro(&ctx, "Ghostscript build");

    match orchestrator.run(&options).await {
        Ok(report) => {
            print_report(&ctx, &report, &options);
            Ok(())
        }
        Err(failure) => {
            observer.fail(failure.stage);
            ui::outro_error(&ctx, &format!("Build failed during {}", failure.stage));
            Err(failure.error)
        }
    }
}

/// Configuration with command-line overrides applied
fn build_options(cli: &Cli, config: &Config, work_dir: &Path) -> BuildOptions {
    let mut options = BuildOptions::from_config(config, work_dir);

    options.cleanup = cli.cleanup_enabled(options.cleanup);
    if cli.no_ram_disk {
        options.scratch = ScratchRequest::plain();
    }
    if let Some(jobs) = cli.jobs {
        options.jobs = clamp_jobs(jobs.into(), config.build.max_jobs);
    }

    options
}

/// The download cache, unless disabled by `--no-cache` or `cache.enabled`
fn download_cache(cli: &Cli, config: &Config) -> Option<ArtifactCache> {
    if cli.no_cache || !config.cache.enabled {
        debug!("Download cache disabled");
        return None;
    }

    let root = config
        .cache
        .dir
        .clone()
        .unwrap_or_else(ConfigManager::default_cache_dir);
    debug!("Download cache: {}", root.display());
    Some(ArtifactCache::new(root))
}

fn print_report(ctx: &UiContext, report: &BuildReport, options: &BuildOptions) {
    ui::key_value(ctx, "Binary", &report.binary.display().to_string());
    if let SmokeTest::Passed { ref version } = report.smoke_test {
        ui::key_value(ctx, "Version", version);
    }
    ui::key_value(ctx, "Source", &report.source_dir);
    ui::key_value(ctx, "Archive", &report.cache.to_string());
    ui::key_value(ctx, "Scratch", &report.scratch.to_string());
    ui::key_value(
        ctx,
        "Configure",
        &format!("option set {}", report.configure.attempt),
    );
    ui::key_value(ctx, "Jobs", &report.jobs.to_string());

    match report.cleanup {
        CleanupOutcome::Removed(ref paths) => {
            ui::step_info(ctx, &format!("Removed {} build artifacts", paths.len()))
        }
        CleanupOutcome::Disabled => ui::step_info(
            ctx,
            &format!("Build artifacts kept in {}", options.build_dir.display()),
        ),
        CleanupOutcome::SkippedAfterFailedSmokeTest => ui::step_warn_hint(
            ctx,
            "Cleanup skipped",
            &format!("binary test failed, inspect {}", options.build_dir.display()),
        ),
    }

    if report.smoke_test.passed() {
        ui::outro_success(ctx, "Build complete");
    } else {
        ui::outro_success(ctx, "Build complete, but the binary test failed");
    }
}

/// Renders orchestrator notifications as step lines with a spinner per stage
struct UiObserver {
    ctx: UiContext,
    active: Mutex<Option<StageProgress>>,
}

impl UiObserver {
    fn new(ctx: UiContext) -> Self {
        Self {
            ctx,
            active: Mutex::new(None),
        }
    }

    fn replace(&self, next: Option<StageProgress>) {
        if let Ok(mut active) = self.active.lock() {
            if let Some(previous) = std::mem::replace(&mut *active, next) {
                previous.finish();
            }
        }
    }

    /// Mark `stage` as the one that stopped the build
    fn fail(&self, stage: Stage) {
        self.replace(None);
        ui::step_error_detail(&self.ctx, stage.label(), "failed");
    }
}

impl BuildObserver for UiObserver {
    fn stage_started(&self, stage: Stage) {
        if matches!(stage, Stage::Init | Stage::Done) {
            return;
        }
        self.replace(Some(StageProgress::start(&self.ctx, stage.label())));
    }

    fn stage_completed(&self, stage: Stage, detail: &str) {
        self.replace(None);
        match stage {
            Stage::Init => ui::step_info(&self.ctx, &format!("Source: {}", detail)),
            Stage::Done => {}
            _ => ui::step_ok_detail(&self.ctx, stage.label(), detail),
        }
    }

    fn stage_warned(&self, stage: Stage, detail: &str) {
        self.replace(None);
        ui::step_warn_hint(&self.ctx, stage.label(), detail);
    }

    fn output_line(&self, line: &str) {
        if let Ok(active) = self.active.lock() {
            if let Some(ref progress) = *active {
                progress.on_line(line);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("gsbuild").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn flags_override_configuration() {
        let config = Config::default();
        let options = build_options(
            &parse(&["--no-cleanup", "--no-ram-disk", "-j", "64"]),
            &config,
            Path::new("/work"),
        );

        assert!(!options.cleanup);
        assert!(!options.scratch.accelerated);
        assert_eq!(options.jobs, config.build.max_jobs);
        assert_eq!(options.build_dir, Path::new("/work/build"));
    }

    #[test]
    fn configuration_used_without_flags() {
        let mut config = Config::default();
        config.cleanup.enabled = false;
        let options = build_options(&parse(&[]), &config, Path::new("/work"));

        assert!(!options.cleanup);
        assert_eq!(options.scratch.accelerated, config.ram_disk.enabled);
    }

    #[test]
    fn explicit_jobs_below_cap_are_kept() {
        let options = build_options(&parse(&["--jobs", "3"]), &Config::default(), Path::new("/w"));
        assert_eq!(options.jobs, 3);
    }

    #[test]
    fn cache_defaults_to_user_cache_dir() {
        let cache = download_cache(&parse(&[]), &Config::default()).unwrap();
        assert_eq!(cache.root(), ConfigManager::default_cache_dir());
    }

    #[test]
    fn cache_dir_override_is_used() {
        let mut config = Config::default();
        config.cache.dir = Some("/var/cache/gs".into());
        let cache = download_cache(&parse(&[]), &config).unwrap();
        assert_eq!(cache.root(), Path::new("/var/cache/gs"));
    }

    #[test]
    fn cache_disabled_by_flag_or_config() {
        assert!(download_cache(&parse(&["--no-cache"]), &Config::default()).is_none());

        let mut config = Config::default();
        config.cache.enabled = false;
        assert!(download_cache(&parse(&[]), &config).is_none());
    }

    #[test]
    fn observer_tracks_one_stage_at_a_time() {
        let observer = UiObserver::new(UiContext::non_interactive());
        observer.stage_started(Stage::Init);
        observer.stage_completed(Stage::Init, "https://example.com/gs.tar.gz");
        observer.stage_started(Stage::Compile);
        observer.output_line("gcc -c base/gsmain.c");
        assert!(observer.active.lock().unwrap().is_some());
        observer.stage_warned(Stage::SmokeTest, "exit code 1");
        assert!(observer.active.lock().unwrap().is_none());
        observer.stage_started(Stage::Cleanup);
        observer.fail(Stage::Cleanup);
        assert!(observer.active.lock().unwrap().is_none());
    }
}
