//! Run orchestration.
//!
//! Drives one run through the [`RunState`] machine:
//! sync sources (fail-fast), build each target that is not yet released
//! (fail-isolated), then publish whatever succeeded (fail-fast).

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::{ConfigLookup, RunConfig};
use crate::domain::{
    AggregateResult, AutobuildError, BuildAttempt, BuildOutcome, BuildTarget, Result,
    RunMachine, RunState, TargetState,
};
use crate::driver_traits::{BuildDriver, IssueTracker, PublishDriver, ReleaseDriver, SourceSync};
use crate::log_locator::LogLocator;
use crate::obs::{self, RunSpan};
use crate::publish_gate::PublishGate;
use crate::release::ReleaseStatusOracle;
use crate::reporter::{FailureReporter, PackageSet};

/// Everything a run talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub sync: Arc<dyn SourceSync>,
    pub release: Arc<dyn ReleaseDriver>,
    pub build: Arc<dyn BuildDriver>,
    pub publish: Arc<dyn PublishDriver>,
    pub issues: Arc<dyn IssueTracker>,

    /// Consulted for the reporting secrets at report time.
    pub secrets: Arc<dyn ConfigLookup>,
}

/// Summary of a run that reached `DONE`.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: String,
    pub component: String,
    pub started_at: DateTime<Utc>,

    /// One entry per attempted target, in build order.
    pub outcomes: Vec<BuildOutcome>,

    /// Targets skipped because they were already released.
    pub skipped: Vec<BuildTarget>,

    /// Whether sign+publish ran (false when nothing needed building).
    pub published: bool,

    pub final_state: RunState,

    /// Every state the run entered, starting with `INIT`.
    pub states: Vec<RunState>,
    pub duration_ms: u64,
}

impl RunReport {
    pub fn built_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.succeeded).count()
    }

    pub fn failed_count(&self) -> usize {
        self.outcomes.iter().filter(|o| !o.succeeded).count()
    }

    pub fn target_state(&self, target: &BuildTarget) -> Option<TargetState> {
        if self.skipped.contains(target) {
            return Some(TargetState::Skipped);
        }
        self.outcomes
            .iter()
            .find(|o| &o.target == target)
            .map(|o| {
                if o.succeeded {
                    TargetState::Built
                } else {
                    TargetState::Failed
                }
            })
    }
}

/// Run orchestrator for a single component.
pub struct Pipeline {
    config: RunConfig,
    sync: Arc<dyn SourceSync>,
    oracle: ReleaseStatusOracle,
    builder: Arc<dyn BuildDriver>,
    locator: LogLocator,
    reporter: FailureReporter,
    gate: PublishGate,
}

/// Mutable bookkeeping of a run in progress.
struct Progress {
    machine: RunMachine,
    outcomes: Vec<BuildOutcome>,
    skipped: Vec<BuildTarget>,
    published: bool,
}

impl Progress {
    fn advance(&mut self, next: RunState) -> Result<()> {
        let prev = self.machine.advance(next)?;
        obs::emit_state_transition(prev, next);
        Ok(())
    }

    /// Handle `result` with the error policy of the current state.
    fn guard<T>(&self, result: Result<T>, isolate: impl FnOnce(AutobuildError) -> T) -> Result<T> {
        self.machine.state().policy().apply(result, isolate)
    }
}

impl Pipeline {
    pub fn new(config: RunConfig, collaborators: Collaborators) -> Self {
        let locator = LogLocator::new(config.host_identity.clone());
        let reporter = FailureReporter::new(
            collaborators.secrets,
            collaborators.issues,
            config.source_url.clone(),
        );
        Self {
            sync: collaborators.sync,
            oracle: ReleaseStatusOracle::new(collaborators.release),
            builder: collaborators.build,
            locator,
            reporter,
            gate: PublishGate::new(collaborators.publish),
            config,
        }
    }

    /// Execute the run. `Ok` means the run ended in `DONE`; any `Err` means
    /// it ended in `FAILED`.
    pub async fn run(&self) -> Result<RunReport> {
        let run_id = Uuid::new_v4().to_string();
        let component = self.config.component.to_string();
        let _span = RunSpan::enter(&run_id, &component);
        let started_at = Utc::now();
        let start = Instant::now();

        let targets = self.config.targets();
        obs::emit_run_started(&run_id, &component, &targets);

        let mut progress = Progress {
            machine: RunMachine::new(),
            outcomes: Vec::new(),
            skipped: Vec::new(),
            published: false,
        };

        let result = self.drive(&mut progress, &targets).await;

        let final_state = match &result {
            Ok(()) => progress.machine.state(),
            Err(e) => {
                warn!(
                    class = e.class(),
                    state = %progress.machine.state(),
                    error = %e,
                    "run failed"
                );
                if !progress.machine.state().is_terminal() {
                    progress.advance(RunState::Failed).ok();
                }
                RunState::Failed
            }
        };
        self.builder.release();

        let duration_ms = start.elapsed().as_millis() as u64;
        let built = progress.outcomes.iter().filter(|o| o.succeeded).count();
        obs::emit_run_finished(
            &run_id,
            duration_ms,
            built,
            progress.outcomes.len() - built,
            progress.skipped.len(),
            final_state,
        );

        result.map(|()| RunReport {
            run_id,
            component,
            started_at,
            outcomes: progress.outcomes,
            skipped: progress.skipped,
            published: progress.published,
            final_state,
            states: progress.machine.history().to_vec(),
            duration_ms,
        })
    }

    async fn drive(&self, progress: &mut Progress, targets: &[BuildTarget]) -> Result<()> {
        let cfg = &self.config;

        // INIT: fail-fast
        self.sync
            .update_builder(&cfg.builder_plugins, &cfg.merge_opts)
            .await?;
        self.sync
            .update_sources(&cfg.component, &cfg.merge_opts)
            .await?;
        obs::emit_sync_finished(cfg.component.as_str());
        progress.advance(RunState::Synced)?;

        // LOOPING: release-status and reporting errors are fatal,
        // BUILDING: errors stay with the target
        progress.advance(RunState::Looping)?;
        for target in targets {
            let released = self.oracle.is_released(&cfg.component, target).await;
            if progress.guard(released, |_| false)? {
                obs::emit_target_skipped(target);
                progress.skipped.push(target.clone());
                continue;
            }

            progress.advance(RunState::Building)?;
            info!(target = %target, "building");
            let attempt = self.builder.build(&cfg.component, target).await;
            let attempt = progress.guard(attempt, |e| {
                warn!(target = %target, error = %e, "build could not be run");
                BuildAttempt::failed(None)
            })?;
            let outcome = self.outcome(target, attempt);
            progress.advance(RunState::Looping)?;

            if !outcome.succeeded {
                let filed = self
                    .reporter
                    .report(
                        &cfg.component,
                        PackageSet::from(target.kind),
                        &target.distribution,
                        &outcome.log_url,
                    )
                    .await;
                progress.guard(filed, |_| ())?;
            }
            progress.outcomes.push(outcome);
        }

        // GATE: fail-fast
        progress.advance(RunState::Gate)?;
        if progress.outcomes.is_empty() && !progress.skipped.is_empty() {
            info!(
                skipped = progress.skipped.len(),
                "every target is already released, nothing to publish"
            );
            return progress.advance(RunState::Done);
        }

        let request = PublishGate::prepare(cfg, &progress.outcomes)?;
        progress.advance(RunState::Publishing)?;
        if let Err(e) = self.gate.publish(&request).await {
            let dists = AggregateResult::from_outcomes(&progress.outcomes).labels();
            self.reporter
                .report(&cfg.component, PackageSet::Upload, &dists, &request.build_log_url)
                .await?;
            return Err(e);
        }
        progress.published = true;
        progress.advance(RunState::Done)
    }

    /// Resolve the log URL of a finished attempt.
    fn outcome(&self, target: &BuildTarget, attempt: BuildAttempt) -> BuildOutcome {
        let log_url = self.locator.resolve(attempt.log_id.as_deref());
        if attempt.succeeded {
            obs::emit_target_built(target, &log_url);
        } else {
            obs::emit_target_failed(target, &log_url);
        }
        BuildOutcome {
            target: target.clone(),
            succeeded: attempt.succeeded,
            log_url,
        }
    }
}
