//! Pipeline stages and stage-tagged failures

use crate::error::GsbuildError;
use std::fmt;
use thiserror::Error;

/// Pipeline stages in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Init,
    DependencyCheck,
    Fetch,
    Extract,
    LocateSource,
    Configure,
    Compile,
    Install,
    RelocateBinary,
    SmokeTest,
    Cleanup,
    Done,
}

impl Stage {
    /// All stages in execution order
    pub const ALL: [Stage; 12] = [
        Stage::Init,
        Stage::DependencyCheck,
        Stage::Fetch,
        Stage::Extract,
        Stage::LocateSource,
        Stage::Configure,
        Stage::Compile,
        Stage::Install,
        Stage::RelocateBinary,
        Stage::SmokeTest,
        Stage::Cleanup,
        Stage::Done,
    ];

    /// Short label for progress output
    pub fn label(&self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::DependencyCheck => "dependency check",
            Self::Fetch => "fetch",
            Self::Extract => "extract",
            Self::LocateSource => "locate source",
            Self::Configure => "configure",
            Self::Compile => "compile",
            Self::Install => "install",
            Self::RelocateBinary => "relocate binary",
            Self::SmokeTest => "smoke test",
            Self::Cleanup => "cleanup",
            Self::Done => "done",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// A fatal error together with the stage that produced it
#[derive(Debug, Error)]
#[error("{stage} failed: {error}")]
pub struct BuildFailure {
    pub stage: Stage,
    pub error: GsbuildError,
}

impl BuildFailure {
    pub fn new(stage: Stage, error: GsbuildError) -> Self {
        Self { stage, error }
    }
}

/// Tag an error with `stage`, for use with `map_err`
pub(crate) fn at(stage: Stage) -> impl FnOnce(GsbuildError) -> BuildFailure {
    move |error| BuildFailure::new(stage, error)
}
