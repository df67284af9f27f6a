//! Scripted process runner for tests

use super::{CommandOutput, CommandSpec, LineSink, ProcessRunner};
use crate::error::{GsbuildError, GsbuildResult};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

type Matcher = Box<dyn Fn(&CommandSpec) -> bool + Send + Sync>;
type Effect = Arc<dyn Fn(&CommandSpec) + Send + Sync>;

/// Canned result for a matched command
#[derive(Clone)]
pub(crate) struct Response {
    code: Option<i32>,
    stdout: String,
    effect: Option<Effect>,
    /// Fail as if the program could not be started
    unspawnable: bool,
}

impl Response {
    pub fn ok(stdout: &str) -> Self {
        Self {
            code: Some(0),
            stdout: stdout.to_string(),
            effect: None,
            unspawnable: false,
        }
    }

    pub fn fail(code: i32, stdout: &str) -> Self {
        Self {
            code: Some(code),
            stdout: stdout.to_string(),
            effect: None,
            unspawnable: false,
        }
    }

    /// The program cannot be spawned (`CommandFailed`)
    pub fn unspawnable() -> Self {
        Self {
            unspawnable: true,
            ..Self::fail(127, "")
        }
    }

    /// Run `effect` when the command is executed (e.g. create files)
    pub fn with_effect(mut self, effect: impl Fn(&CommandSpec) + Send + Sync + 'static) -> Self {
        self.effect = Some(Arc::new(effect));
        self
    }
}

struct Rule {
    matcher: Matcher,
    /// Consumed in order; the last one repeats
    responses: VecDeque<Response>,
}

/// Records every command and answers from a script instead of spawning
pub(crate) struct ScriptedRunner {
    rules: Mutex<Vec<Rule>>,
    calls: Mutex<Vec<CommandSpec>>,
    tools: Option<Vec<String>>,
}

impl ScriptedRunner {
    /// Every command succeeds silently and every tool is on PATH
    pub fn new() -> Self {
        Self {
            rules: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
            tools: None,
        }
    }

    /// Only `tools` resolve on PATH
    pub fn with_tools(mut self, tools: &[&str]) -> Self {
        self.tools = Some(tools.iter().map(|t| t.to_string()).collect());
        self
    }

    /// Answer commands matching `matcher` with `responses`
    pub fn on(
        self,
        matcher: impl Fn(&CommandSpec) -> bool + Send + Sync + 'static,
        responses: Vec<Response>,
    ) -> Self {
        self.rules.lock().unwrap().push(Rule {
            matcher: Box::new(matcher),
            responses: responses.into(),
        });
        self
    }

    /// All commands executed so far
    pub fn calls(&self) -> Vec<CommandSpec> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of executed commands matching `pred`
    pub fn count(&self, pred: impl Fn(&CommandSpec) -> bool) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| pred(c)).count()
    }

    fn respond(&self, cmd: &CommandSpec) -> GsbuildResult<CommandOutput> {
        self.calls.lock().unwrap().push(cmd.clone());

        let response = {
            let mut rules = self.rules.lock().unwrap();
            rules
                .iter_mut()
                .find(|rule| (rule.matcher)(cmd))
                .and_then(|rule| {
                    if rule.responses.len() > 1 {
                        rule.responses.pop_front()
                    } else {
                        rule.responses.front().cloned()
                    }
                })
                .unwrap_or_else(|| Response::ok(""))
        };

        if response.unspawnable {
            return Err(GsbuildError::command_failed(
                cmd.to_string(),
                std::io::Error::new(std::io::ErrorKind::NotFound, "no such file or directory"),
            ));
        }

        if let Some(effect) = response.effect {
            effect(cmd);
        }

        Ok(CommandOutput {
            code: response.code,
            stdout: response.stdout,
            stderr: String::new(),
        })
    }
}

#[async_trait]
impl ProcessRunner for ScriptedRunner {
    async fn run(&self, cmd: &CommandSpec) -> GsbuildResult<CommandOutput> {
        self.respond(cmd)
    }

    async fn run_streaming(
        &self,
        cmd: &CommandSpec,
        on_line: LineSink<'_>,
    ) -> GsbuildResult<CommandOutput> {
        let output = self.respond(cmd)?;
        for line in output.stdout.lines() {
            on_line(line);
        }
        Ok(output)
    }

    fn locate(&self, program: &str) -> Option<PathBuf> {
        match self.tools {
            Some(ref tools) if !tools.iter().any(|t| t == program) => None,
            _ => Some(PathBuf::from("/usr/bin").join(program)),
        }
    }
}

/// Matches commands whose program is `program`
pub(crate) fn program(program: &'static str) -> impl Fn(&CommandSpec) -> bool + Send + Sync {
    move |cmd| cmd.program == program
}

/// Matches commands whose program is `program` and first argument is `arg`
pub(crate) fn program_arg(
    program: &'static str,
    arg: &'static str,
) -> impl Fn(&CommandSpec) -> bool + Send + Sync {
    move |cmd| cmd.program == program && cmd.args.first().map(String::as_str) == Some(arg)
}
