//! External process execution
//!
//! Every tool the build touches (configure, make, hdiutil, the built binary)
//! goes through the [`ProcessRunner`] trait so the orchestrator can be
//! exercised against a scripted fake.

mod system;
#[cfg(test)]
pub(crate) mod testing;

pub use system::SystemRunner;

use crate::error::GsbuildResult;
use async_trait::async_trait;
use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};

/// Max number of output lines to include in error messages.
pub const ERROR_TAIL_LINES: usize = 20;

/// A command to execute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    pub env: Vec<(String, String)>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            env: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Captured result of a finished command
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    /// Exit code, `None` when terminated by a signal
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Last [`ERROR_TAIL_LINES`] lines of combined output
    pub fn tail(&self) -> String {
        output_tail(&self.stdout, &self.stderr, ERROR_TAIL_LINES)
    }
}

/// Callback receiving streamed output lines
pub type LineSink<'a> = &'a (dyn Fn(&str) + Send + Sync);

/// Runs external commands
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    /// Run to completion, capturing stdout and stderr
    async fn run(&self, cmd: &CommandSpec) -> GsbuildResult<CommandOutput>;

    /// Run to completion, handing each output line to `on_line` as it arrives.
    ///
    /// The combined output is returned in `stdout`.
    async fn run_streaming(
        &self,
        cmd: &CommandSpec,
        on_line: LineSink<'_>,
    ) -> GsbuildResult<CommandOutput>;

    /// Resolve an executable name on the search path
    fn locate(&self, program: &str) -> Option<PathBuf> {
        find_on_path(program, std::env::var_os("PATH"))
    }
}

/// Search `path_var` for an executable file named `program`
pub fn find_on_path(program: &str, path_var: Option<OsString>) -> Option<PathBuf> {
    let candidate = Path::new(program);
    if candidate.components().count() > 1 {
        return is_executable(candidate).then(|| candidate.to_path_buf());
    }

    let path_var = path_var?;
    std::env::split_paths(&path_var)
        .map(|dir| dir.join(program))
        .find(|path| is_executable(path))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

/// Combine stdout and stderr and keep the last `max_lines` lines.
pub(crate) fn output_tail(stdout: &str, stderr: &str, max_lines: usize) -> String {
    let lines: Vec<&str> = stdout.lines().chain(stderr.lines()).collect();
    let start = lines.len().saturating_sub(max_lines);
    lines[start..].join("\n")
}
