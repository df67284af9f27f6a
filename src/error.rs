//! Error types for gsbuild
//!
//! All modules use `GsbuildResult<T>` as their return type.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for gsbuild operations
pub type GsbuildResult<T> = Result<T, GsbuildError>;

/// All errors that can occur while building Ghostscript
#[derive(Error, Debug)]
pub enum GsbuildError {
    // Pre-flight errors
    #[error("Missing required tools: {}", tools.join(", "))]
    DependencyMissing { tools: Vec<String> },

    // Source acquisition errors
    #[error("Failed to fetch {url}: {reason}")]
    Fetch { url: String, reason: String },

    #[error("Failed to extract {}: {reason}", archive.display())]
    Extract { archive: PathBuf, reason: String },

    #[error("No directory starting with '{prefix}' found in {}", root.display())]
    SourceNotFound { root: PathBuf, prefix: String },

    // Build errors
    #[error("All {attempts} configure attempts failed\n{output}")]
    ConfigureExhausted { attempts: usize, output: String },

    #[error("Compilation failed\n{output}")]
    Compile { output: String },

    #[error("Install failed\n{output}")]
    Install { output: String },

    #[error("Binary not found after install: {}", .0.display())]
    MissingArtifact(PathBuf),

    // Scratch space errors
    #[error("RAM disk unavailable: {0}")]
    RamDisk(String),

    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Configuration file not found: {0}")]
    ConfigNotFound(PathBuf),

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Process errors
    #[error("Command failed: {command}")]
    CommandFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl GsbuildError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a command failed error
    pub fn command_failed(command: impl Into<String>, source: std::io::Error) -> Self {
        Self::CommandFailed {
            command: command.into(),
            source,
        }
    }

    /// Create a fetch error
    pub fn fetch(url: impl Into<String>, reason: impl ToString) -> Self {
        Self::Fetch {
            url: url.into(),
            reason: reason.to_string(),
        }
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::DependencyMissing { .. } => Some(
                "Install build essentials. macOS: xcode-select --install; \
                 Ubuntu: sudo apt-get install build-essential autoconf",
            ),
            Self::Fetch { .. } => Some("Check network access and the configured source.url"),
            Self::ConfigureExhausted { .. } => {
                Some("Add a configure option set under [build] in the config file")
            }
            Self::MissingArtifact(_) => Some("Check paths.installed_binary in the config file"),
            _ => None,
        }
    }
}
