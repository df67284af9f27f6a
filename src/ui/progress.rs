//! Progress indicators with CI fallback

use super::context::UiContext;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::time::Duration;

/// Longest status message shown next to the spinner
const MAX_MESSAGE: usize = 60;

/// Spinner for one running stage.
///
/// In interactive mode an indicatif spinner shows the stage label and the
/// latest useful output line (for compiles, the current compile unit). In CI
/// a single plain line is printed when the stage starts.
pub struct StageProgress {
    bar: Option<ProgressBar>,
}

impl StageProgress {
    pub fn start(ctx: &UiContext, label: &str) -> Self {
        let bar = if ctx.use_fancy_output() {
            let bar = ProgressBar::new_spinner();
            if let Ok(template) =
                ProgressStyle::default_spinner().template("  {spinner:.cyan} {prefix}  {msg:.dim}  {elapsed:.dim}")
            {
                bar.set_style(template.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ "));
            }
            bar.set_prefix(label.to_string());
            bar.enable_steady_tick(Duration::from_millis(120));
            Some(bar)
        } else {
            println!("{} {}", style("...").dim(), label);
            None
        };
        Self { bar }
    }

    /// Show a summary of an output line
    pub fn on_line(&self, line: &str) {
        let Some(ref bar) = self.bar else {
            return;
        };
        if let Some(message) = summarize_line(line) {
            bar.set_message(message);
        }
    }

    /// Finish and clear the spinner
    pub fn finish(&self) {
        if let Some(ref bar) = self.bar {
            bar.disable_steady_tick();
            bar.finish_and_clear();
        }
    }
}

/// Directory chatter from recursive make
fn is_build_noise(line: &str) -> bool {
    line.starts_with("make[") && (line.contains("Entering directory") || line.contains("Leaving directory"))
        || line.starts_with("make: Nothing to be done")
}

/// Reduce a build output line to something worth showing.
///
/// Compiler invocations become the name of the source file being compiled;
/// other lines are trimmed and truncated.
fn summarize_line(line: &str) -> Option<String> {
    let trimmed = line.trim();
    if trimmed.is_empty() || is_build_noise(trimmed) {
        return None;
    }

    if let Some(unit) = compile_unit(trimmed) {
        return Some(unit);
    }

    if trimmed.chars().count() > MAX_MESSAGE {
        let head: String = trimmed.chars().take(MAX_MESSAGE - 3).collect();
        Some(format!("{}...", head))
    } else {
        Some(trimmed.to_string())
    }
}

/// Source file named by a `cc -c ... foo.c` style command line
fn compile_unit(line: &str) -> Option<String> {
    let mut words = line.split_whitespace();
    let compiler = words.next()?;
    let is_compiler = ["cc", "gcc", "clang", "c++", "g++", "clang++"]
        .iter()
        .any(|name| compiler == *name || compiler.ends_with(&format!("/{}", name)));
    if !is_compiler {
        return None;
    }

    line.split_whitespace()
        .filter(|word| !word.starts_with('-'))
        .filter(|word| {
            [".c", ".cpp", ".cc"]
                .iter()
                .any(|ext| word.ends_with(ext))
        })
        .last()
        .and_then(|word| Path::new(word).file_name())
        .map(|name| name.to_string_lossy().into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compile_lines_show_source_file() {
        assert_eq!(
            summarize_line("gcc -O2 -DNDEBUG -I./base -o ./obj/gsmain.o -c ./base/gsmain.c"),
            Some("gsmain.c".to_string())
        );
        assert_eq!(
            summarize_line("/usr/bin/cc -c psi/zfile.c -o obj/zfile.o"),
            Some("zfile.c".to_string())
        );
    }

    #[test]
    fn make_directory_chatter_is_hidden() {
        assert_eq!(summarize_line("make[2]: Entering directory '/tmp/gs/base'"), None);
        assert_eq!(summarize_line("make[2]: Leaving directory '/tmp/gs/base'"), None);
        assert_eq!(summarize_line("   "), None);
    }

    #[test]
    fn other_lines_are_truncated() {
        assert_eq!(
            summarize_line("checking for gcc... gcc"),
            Some("checking for gcc... gcc".to_string())
        );
        let long = "x".repeat(100);
        let summary = summarize_line(&long).unwrap();
        assert_eq!(summary.chars().count(), MAX_MESSAGE);
        assert!(summary.ends_with("..."));
    }

    #[test]
    fn non_compiler_lines_have_no_unit() {
        assert_eq!(compile_unit("ar rcs libgs.a obj/a.o"), None);
        assert_eq!(compile_unit("echo main.c"), None);
    }

    #[test]
    fn stage_progress_non_interactive() {
        let ctx = UiContext::non_interactive();
        let progress = StageProgress::start(&ctx, "compile");
        progress.on_line("gcc -c base/gp_unix.c");
        progress.finish();
    }
}
