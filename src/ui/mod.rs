//! UI module for consistent CLI output
//!
//! Uses `cliclack` for step lines in interactive terminals and plain
//! `[OK]`/`[WARN]`/`[FAIL]` lines in CI or when output is piped.
//!
//! # Example
//!
//! ```rust,ignore
//! use gsbuild::ui::{self, StageProgress, UiContext};
//!
//! let ctx = UiContext::detect();
//!
//! ui::intro(&ctx, "Ghostscript build");
//!
//! let progress = StageProgress::start(&ctx, "compile");
//! progress.on_line("gcc -c base/gsmain.c");
//! progress.finish();
//!
//! ui::step_ok_detail(&ctx, "compile", "16 jobs");
//! ui::outro_success(&ctx, "Build complete");
//! ```

mod context;
mod output;
mod progress;

pub use context::UiContext;
pub use output::{
    intro, key_value, outro_error, outro_success, step_error_detail, step_info, step_ok,
    step_ok_detail, step_warn_hint,
};
pub use progress::StageProgress;
