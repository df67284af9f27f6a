//! Configure with ordered fallback option sets

use crate::error::{GsbuildError, GsbuildResult};
use crate::process::{CommandSpec, ProcessRunner};
use std::path::Path;
use tracing::{info, warn};

/// The option set that configured successfully
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigureSuccess {
    /// 1-based index into the option sets
    pub attempt: usize,
    pub options: Vec<String>,
}

/// `<source>/configure <options...> --prefix=<prefix>`
pub fn configure_command(source_dir: &Path, options: &[String], prefix: &Path) -> CommandSpec {
    CommandSpec::new(source_dir.join("configure").to_string_lossy())
        .args(options.iter().cloned())
        .arg(format!("--prefix={}", prefix.display()))
        .current_dir(source_dir)
}

/// Try each option set in order until one exits zero.
///
/// Option sets are never combined. When every set fails the error carries
/// the output tail of the last attempt.
pub async fn run_configure(
    runner: &dyn ProcessRunner,
    source_dir: &Path,
    option_sets: &[Vec<String>],
    prefix: &Path,
) -> GsbuildResult<ConfigureSuccess> {
    let total = option_sets.len();
    let mut last_output = String::new();

    for (index, options) in option_sets.iter().enumerate() {
        let attempt = index + 1;
        info!("Configuring build (attempt {}/{})", attempt, total);

        let output = runner
            .run(&configure_command(source_dir, options, prefix))
            .await?;

        if output.success() {
            return Ok(ConfigureSuccess {
                attempt,
                options: options.clone(),
            });
        }

        warn!("Configure attempt {} failed, trying next...", attempt);
        last_output = output.tail();
    }

    Err(GsbuildError::ConfigureExhausted {
        attempts: total,
        output: last_output,
    })
}
