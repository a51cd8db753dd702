//! Error taxonomy for an autobuild run.

use crate::domain::state::RunState;
use crate::domain::target::BuildTarget;

/// Exit status for every fatal run condition.
pub const EXIT_FAILURE: u8 = 1;

/// Autobuild errors.
///
/// Every variant is fatal to the run. Single-target build failures are not
/// errors; they are recorded as failed [`BuildOutcome`](crate::BuildOutcome)s.
#[derive(Debug, thiserror::Error)]
pub enum AutobuildError {
    #[error("usage: {0}")]
    Usage(String),

    #[error("source synchronization failed: {0}")]
    Sync(String),

    #[error("release status indeterminate for {component} ({target}): {reason}")]
    ReleaseStatus {
        component: String,
        target: BuildTarget,
        reason: String,
    },

    #[error("no target was built successfully")]
    NothingBuilt,

    #[error("publish failed: {0}")]
    Publish(String),

    #[error("cannot file failure report: {0}")]
    Reporting(String),

    #[error("invalid run state transition {from} -> {to}")]
    InvalidTransition { from: RunState, to: RunState },

    #[error("driver error: {0}")]
    Driver(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl AutobuildError {
    /// Short class name used in structured log records.
    pub fn class(&self) -> &'static str {
        match self {
            AutobuildError::Usage(_) => "usage",
            AutobuildError::Sync(_) => "sync",
            AutobuildError::ReleaseStatus { .. } => "release_status",
            AutobuildError::NothingBuilt => "nothing_built",
            AutobuildError::Publish(_) => "publish",
            AutobuildError::Reporting(_) => "reporting",
            AutobuildError::InvalidTransition { .. } => "internal",
            AutobuildError::Driver(_) => "driver",
            AutobuildError::Io(_) => "io",
        }
    }

    /// Process exit status for this error.
    pub fn exit_code(&self) -> u8 {
        EXIT_FAILURE
    }
}

/// Result type for autobuild operations.
pub type Result<T> = std::result::Result<T, AutobuildError>;
