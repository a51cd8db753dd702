//! In-memory fakes for the collaborator traits (testing only)
//!
//! Every fake records the calls it receives so tests can assert on what the
//! pipeline did, without git, a builder or network access.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use crate::config::Secret;
use crate::domain::{AutobuildError, BuildAttempt, BuildTarget, Component, Result, TargetKind};
use crate::driver_traits::{
    BuildDriver, IssueRecord, IssueTracker, PublishDriver, PublishRequest, ReleaseDriver,
    SourceSync,
};

fn locked<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

// ---------------------------------------------------------------------------
// FakeSync
// ---------------------------------------------------------------------------

/// Source sync that succeeds unless told otherwise.
#[derive(Debug, Default)]
pub struct FakeSync {
    fail_builder: bool,
    fail_sources: bool,
    calls: Mutex<Vec<String>>,
}

impl FakeSync {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the builder update fail with a non-fast-forward error.
    pub fn failing_builder(mut self) -> Self {
        self.fail_builder = true;
        self
    }

    /// Make the component update fail with a signature error.
    pub fn failing_sources(mut self) -> Self {
        self.fail_sources = true;
        self
    }

    /// Calls received, as `builder` or `sources:<component>`.
    pub fn calls(&self) -> Vec<String> {
        locked(&self.calls).clone()
    }
}

#[async_trait]
impl SourceSync for FakeSync {
    async fn update_builder(&self, _plugins: &[String], _merge_opts: &str) -> Result<()> {
        locked(&self.calls).push("builder".to_string());
        if self.fail_builder {
            return Err(AutobuildError::Sync("builder: not possible to fast-forward".to_string()));
        }
        Ok(())
    }

    async fn update_sources(&self, component: &Component, _merge_opts: &str) -> Result<()> {
        locked(&self.calls).push(format!("sources:{component}"));
        if self.fail_sources {
            return Err(AutobuildError::Sync(format!(
                "{component}: no valid signed tag"
            )));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// FakeReleaseDriver
// ---------------------------------------------------------------------------

/// Release driver answering `not released` for every target unless scripted.
#[derive(Debug, Default)]
pub struct FakeReleaseDriver {
    released: HashSet<BuildTarget>,
    failing: HashSet<BuildTarget>,
    empty: HashSet<BuildTarget>,
    queries: Mutex<Vec<BuildTarget>>,
}

impl FakeReleaseDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn released(mut self, target: BuildTarget) -> Self {
        self.released.insert(target);
        self
    }

    /// The query errors, as when no version file exists.
    pub fn failing_for(mut self, target: BuildTarget) -> Self {
        self.failing.insert(target);
        self
    }

    /// The query succeeds with empty output.
    pub fn empty_for(mut self, target: BuildTarget) -> Self {
        self.empty.insert(target);
        self
    }

    pub fn queries(&self) -> Vec<BuildTarget> {
        locked(&self.queries).clone()
    }
}

#[async_trait]
impl ReleaseDriver for FakeReleaseDriver {
    async fn check(
        &self,
        component: &Component,
        kind: TargetKind,
        distribution: &str,
    ) -> Result<String> {
        let target = BuildTarget {
            kind,
            distribution: distribution.to_string(),
        };
        locked(&self.queries).push(target.clone());
        if self.failing.contains(&target) {
            return Err(AutobuildError::Driver(format!(
                "{component}: cannot determine version"
            )));
        }
        if self.empty.contains(&target) {
            return Ok(String::new());
        }
        if self.released.contains(&target) {
            Ok("released\n".to_string())
        } else {
            Ok("not released\n".to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// FakeBuildDriver
// ---------------------------------------------------------------------------

/// Build driver that succeeds and assigns a fresh log id per attempt unless
/// scripted otherwise.
#[derive(Debug, Default)]
pub struct FakeBuildDriver {
    failing: HashSet<BuildTarget>,
    erroring: HashSet<BuildTarget>,
    without_log: HashSet<BuildTarget>,
    attempts: Mutex<Vec<BuildTarget>>,
    releases: AtomicUsize,
}

impl FakeBuildDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// The build runs and fails.
    pub fn failing(mut self, target: BuildTarget) -> Self {
        self.failing.insert(target);
        self
    }

    /// The build cannot be started at all.
    pub fn erroring(mut self, target: BuildTarget) -> Self {
        self.erroring.insert(target);
        self
    }

    /// The logging channel never starts for this target.
    pub fn without_log(mut self, target: BuildTarget) -> Self {
        self.without_log.insert(target);
        self
    }

    pub fn attempts(&self) -> Vec<BuildTarget> {
        locked(&self.attempts).clone()
    }

    /// How many times the pipeline released driver resources.
    pub fn releases(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BuildDriver for FakeBuildDriver {
    async fn build(&self, component: &Component, target: &BuildTarget) -> Result<BuildAttempt> {
        let seq = {
            let mut attempts = locked(&self.attempts);
            attempts.push(target.clone());
            attempts.len()
        };
        if self.erroring.contains(target) {
            return Err(AutobuildError::Driver(format!("cannot spawn build for {target}")));
        }
        let log_id = if self.without_log.contains(target) {
            None
        } else {
            Some(format!("build-host/{seq}-{component}-{}", target.label()))
        };
        Ok(BuildAttempt {
            succeeded: !self.failing.contains(target),
            log_id,
        })
    }

    fn release(&self) {
        self.releases.fetch_add(1, Ordering::SeqCst);
    }
}

// ---------------------------------------------------------------------------
// FakePublishDriver
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct FakePublishDriver {
    fail: bool,
    requests: Mutex<Vec<PublishRequest>>,
}

impl FakePublishDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    pub fn requests(&self) -> Vec<PublishRequest> {
        locked(&self.requests).clone()
    }
}

#[async_trait]
impl PublishDriver for FakePublishDriver {
    async fn sign_and_publish(&self, request: &PublishRequest) -> Result<()> {
        locked(&self.requests).push(request.clone());
        if self.fail {
            return Err(AutobuildError::Publish(
                "update-repo-current-testing exited with status 2".to_string(),
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// FakeIssueTracker
// ---------------------------------------------------------------------------

/// An issue as received by [`FakeIssueTracker`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FiledIssue {
    pub token: String,
    pub repository: String,
    pub issue: IssueRecord,
}

#[derive(Debug, Default)]
pub struct FakeIssueTracker {
    reject: bool,
    attempts: AtomicUsize,
    filed: Mutex<Vec<FiledIssue>>,
}

impl FakeIssueTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every request is rejected, as with a revoked token.
    pub fn rejecting(mut self) -> Self {
        self.reject = true;
        self
    }

    /// Issues accepted so far.
    pub fn filed(&self) -> Vec<FiledIssue> {
        locked(&self.filed).clone()
    }

    /// Requests received, accepted or not.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IssueTracker for FakeIssueTracker {
    async fn create_issue(
        &self,
        token: &Secret,
        repository: &str,
        issue: &IssueRecord,
    ) -> Result<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.reject {
            return Err(AutobuildError::Driver("401 Unauthorized".to_string()));
        }
        locked(&self.filed).push(FiledIssue {
            token: token.expose().to_string(),
            repository: repository.to_string(),
            issue: issue.clone(),
        });
        Ok(())
    }
}
