//! Process runner backed by `tokio::process`

use super::{CommandOutput, CommandSpec, LineSink, ProcessRunner};
use crate::error::{GsbuildError, GsbuildResult};
use async_trait::async_trait;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tracing::debug;

/// Runs commands on the host
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl SystemRunner {
    pub fn new() -> Self {
        Self
    }

    fn command(spec: &CommandSpec) -> Command {
        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args);
        if let Some(ref dir) = spec.cwd {
            cmd.current_dir(dir);
        }
        for (key, value) in &spec.env {
            cmd.env(key, value);
        }
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        cmd
    }
}

#[async_trait]
impl ProcessRunner for SystemRunner {
    async fn run(&self, spec: &CommandSpec) -> GsbuildResult<CommandOutput> {
        debug!("Executing: {}", spec);

        let output = Self::command(spec)
            .output()
            .await
            .map_err(|e| GsbuildError::command_failed(spec.to_string(), e))?;

        Ok(CommandOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    async fn run_streaming(
        &self,
        spec: &CommandSpec,
        on_line: LineSink<'_>,
    ) -> GsbuildResult<CommandOutput> {
        debug!("Executing (streaming): {}", spec);

        let mut child = Self::command(spec)
            .spawn()
            .map_err(|e| GsbuildError::command_failed(spec.to_string(), e))?;

        let lines = stream_child_output(&mut child, on_line).await;

        let status = child
            .wait()
            .await
            .map_err(|e| GsbuildError::command_failed(spec.to_string(), e))?;

        let mut stdout = lines.join("\n");
        if !stdout.is_empty() {
            stdout.push('\n');
        }

        Ok(CommandOutput {
            code: status.code(),
            stdout,
            stderr: String::new(),
        })
    }
}

/// Stream stdout+stderr from a child process, calling `on_line` for each line.
///
/// Lines are split on raw bytes and decoded lossily, so invalid UTF-8 never
/// stops a pipe from being drained. Returns all lines in arrival order.
async fn stream_child_output(child: &mut Child, on_line: LineSink<'_>) -> Vec<String> {
    let mut all_output = Vec::new();

    let (Some(stdout), Some(stderr)) = (child.stdout.take(), child.stderr.take()) else {
        return all_output;
    };

    let mut stderr_reader = BufReader::new(stderr).split(b'\n');
    let mut stdout_reader = BufReader::new(stdout).split(b'\n');

    let mut stderr_done = false;
    let mut stdout_done = false;

    while !stderr_done || !stdout_done {
        tokio::select! {
            segment = stderr_reader.next_segment(), if !stderr_done => {
                match segment {
                    Ok(Some(bytes)) => {
                        let line = decode_line(&bytes);
                        on_line(&line);
                        all_output.push(line);
                    }
                    Ok(None) => stderr_done = true,
                    Err(e) => {
                        debug!("stderr read failed: {}", e);
                        stderr_done = true;
                    }
                }
            }
            segment = stdout_reader.next_segment(), if !stdout_done => {
                match segment {
                    Ok(Some(bytes)) => {
                        let line = decode_line(&bytes);
                        on_line(&line);
                        all_output.push(line);
                    }
                    Ok(None) => stdout_done = true,
                    Err(e) => {
                        debug!("stdout read failed: {}", e);
                        stdout_done = true;
                    }
                }
            }
        }
    }

    all_output
}

/// Lossy UTF-8 with a trailing `\r` dropped
fn decode_line(bytes: &[u8]) -> String {
    let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    String::from_utf8_lossy(bytes).into_owned()
}
