//! Failure reporting through the issue tracker.

use std::sync::Arc;

use tracing::{error, info};

use crate::config::{ConfigLookup, Secret, GITHUB_API_KEY, GITHUB_BUILD_ISSUES_REPO};
use crate::domain::{AutobuildError, Component, Result, TargetKind};
use crate::driver_traits::{IssueRecord, IssueTracker};
use crate::obs;

/// Package set named in a failure report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageSet {
    Dom0,
    Vm,
    /// The sign+publish step itself failed.
    Upload,
}

impl PackageSet {
    pub fn as_str(&self) -> &'static str {
        match self {
            PackageSet::Dom0 => "dom0",
            PackageSet::Vm => "vm",
            PackageSet::Upload => "upload",
        }
    }
}

impl From<TargetKind> for PackageSet {
    fn from(kind: TargetKind) -> Self {
        match kind {
            TargetKind::Dom0 => PackageSet::Dom0,
            TargetKind::Vm => PackageSet::Vm,
        }
    }
}

impl std::fmt::Display for PackageSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Files one issue per failed build or failed publish.
///
/// Secrets are looked up on every call and dropped when the call returns.
/// Lookups may shell out to the builder, so they run on the blocking pool.
pub struct FailureReporter {
    lookup: Arc<dyn ConfigLookup>,
    tracker: Arc<dyn IssueTracker>,
    source_url: String,
}

impl FailureReporter {
    pub fn new(
        lookup: Arc<dyn ConfigLookup>,
        tracker: Arc<dyn IssueTracker>,
        source_url: impl Into<String>,
    ) -> Self {
        Self {
            lookup,
            tracker,
            source_url: source_url.into(),
        }
    }

    /// Report a failure of `package_set` for `dist`.
    ///
    /// Missing secrets are fatal: there is no other channel that would make
    /// the failure visible. A rejected request is logged and the run goes on.
    pub async fn report(
        &self,
        component: &Component,
        package_set: PackageSet,
        dist: &str,
        log_url: &str,
    ) -> Result<()> {
        let issue = issue_for(component, package_set, dist, log_url, &self.source_url);

        let (Some(token), Some(repository)) = self.secrets().await else {
            error!(
                component = %component,
                package_set = %package_set,
                dist = %dist,
                "cannot report build failure: {} or {} is not set",
                GITHUB_API_KEY,
                GITHUB_BUILD_ISSUES_REPO
            );
            return Err(AutobuildError::Reporting(format!(
                "{GITHUB_API_KEY} and {GITHUB_BUILD_ISSUES_REPO} must both be set to report '{}'",
                issue.title
            )));
        };

        match self.tracker.create_issue(&token, &repository, &issue).await {
            Ok(()) => {
                obs::emit_report_filed(component.as_str(), package_set.as_str(), dist);
                info!(repository = %repository, title = %issue.title, "failure reported");
            }
            Err(e) => {
                error!(
                    repository = %repository,
                    title = %issue.title,
                    error = %e,
                    "issue creation failed"
                );
            }
        }
        Ok(())
    }

    async fn secrets(&self) -> (Option<Secret>, Option<String>) {
        let lookup = Arc::clone(&self.lookup);
        let fetch = move || {
            (
                lookup.get_nonempty(GITHUB_API_KEY).map(Secret::new),
                lookup.get_nonempty(GITHUB_BUILD_ISSUES_REPO),
            )
        };
        match tokio::task::spawn_blocking(fetch).await {
            Ok(secrets) => secrets,
            Err(e) => {
                error!(error = %e, "reporting secret lookup did not complete");
                (None, None)
            }
        }
    }
}

/// Issue title and body for a failure.
pub fn issue_for(
    component: &Component,
    package_set: PackageSet,
    dist: &str,
    log_url: &str,
    source_url: &str,
) -> IssueRecord {
    IssueRecord {
        title: format!("Build failed: {component} for {package_set} ({dist})"),
        body: format!("Build log: {log_url}\n\nSources: {source_url}"),
    }
}
