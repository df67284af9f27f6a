//! CLI module - argument parsing and the build command

mod args;
pub mod build;

pub use args::Cli;
