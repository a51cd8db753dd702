//! Error types for autobuild-drivers

use autobuild_core::AutobuildError;
use thiserror::Error;

/// Errors raised while talking to the builder or the issue tracker
#[derive(Error, Debug)]
pub enum DriverError {
    /// The builder program could not be started
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// A builder target exited unsuccessfully
    #[error("make {target} failed with {status}")]
    TargetFailed { target: String, status: String },

    /// Issue tracker rejected the request
    #[error("issue tracker returned {status}: {message}")]
    Rejected { status: u16, message: String },

    /// HTTP transport error
    #[error("HTTP error: {0}")]
    Http(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for DriverError {
    fn from(err: reqwest::Error) -> Self {
        DriverError::Http(err.to_string())
    }
}

impl From<DriverError> for AutobuildError {
    fn from(err: DriverError) -> Self {
        AutobuildError::Driver(err.to_string())
    }
}

/// Result type for driver operations
pub type Result<T> = std::result::Result<T, DriverError>;
