//! Collaborator contracts.
//!
//! The run orchestration never talks to git, the builder or the issue
//! tracker directly; it goes through these traits:
//! - `SourceSync`: fast-forward-only update of builder and component sources
//! - `ReleaseDriver`: raw "is this version published" query
//! - `BuildDriver`: one build attempt with log capture
//! - `PublishDriver`: sign and push to the current-testing repository
//! - `IssueTracker`: create an issue record
//!
//! System implementations live in the `autobuild-drivers` crate. In-memory
//! fakes are provided for testing via the `fakes` module.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::Secret;
use crate::domain::{BuildAttempt, BuildTarget, Component, Result, TargetKind};

/// Fast-forward-only source updates.
///
/// Any merge conflict, non-fast-forward or signature failure must surface as
/// `AutobuildError::Sync`.
#[async_trait]
pub trait SourceSync: Send + Sync {
    /// Update the builder tooling and its plugins.
    async fn update_builder(&self, plugins: &[String], merge_opts: &str) -> Result<()>;

    /// Update the component and its dependencies, verifying signed version
    /// tags, then fetch auxiliary sources.
    async fn update_sources(&self, component: &Component, merge_opts: &str) -> Result<()>;
}

/// Raw release-status query.
#[async_trait]
pub trait ReleaseDriver: Send + Sync {
    /// Returns the status text reported by the builder (normally `released`
    /// or `not released`). Errors when no version can be determined.
    async fn check(
        &self,
        component: &Component,
        kind: TargetKind,
        distribution: &str,
    ) -> Result<String>;
}

/// One build attempt for one target.
#[async_trait]
pub trait BuildDriver: Send + Sync {
    /// Build `target`. `Ok` with `succeeded == false` means the build ran and
    /// failed; `Err` means it could not be run at all. Both are isolated to
    /// this target by the caller.
    async fn build(&self, component: &Component, target: &BuildTarget) -> Result<BuildAttempt>;

    /// Drop any per-attempt state (e.g. a pending log handle). Called when
    /// the run reaches a terminal state.
    fn release(&self) {}
}

/// Input of the sign+publish step.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PublishRequest {
    pub component: Component,

    /// Successful dom0 distribution, if any.
    pub dom0_dist: Option<String>,

    /// Successful VM distributions, in build order.
    pub vm_dists: Vec<String>,

    /// Aggregated build-log URL string.
    pub build_log_url: String,

    /// Source URL the packages were built from.
    pub source_url: String,
}

/// Sign built packages and push them to the current-testing repository.
#[async_trait]
pub trait PublishDriver: Send + Sync {
    async fn sign_and_publish(&self, request: &PublishRequest) -> Result<()>;
}

/// Issue payload, serialized as `{"title": ..., "body": ...}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IssueRecord {
    pub title: String,
    pub body: String,
}

/// Issue-creation endpoint.
#[async_trait]
pub trait IssueTracker: Send + Sync {
    /// Create an issue in `repository` (`owner/name`), authenticating with
    /// `token`. Implementations must not log or store the token.
    async fn create_issue(&self, token: &Secret, repository: &str, issue: &IssueRecord)
        -> Result<()>;
}
