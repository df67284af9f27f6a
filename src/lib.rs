//! gsbuild - Standalone Ghostscript builder
//!
//! Fetches a Ghostscript source release (through a local download cache),
//! builds it in a RAM-backed or temporary scratch space with configure
//! fallbacks, and relocates the resulting binary into the project.

pub mod build;
pub mod cli;
pub mod config;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod platform;
pub mod process;
pub mod scratch;
pub mod ui;

pub use error::{GsbuildError, GsbuildResult};
