//! Structured observability hooks for the run lifecycle.
//!
//! This module provides:
//! - A run-scoped tracing span via the `RunSpan` RAII guard
//! - Emission functions for lifecycle events: start, sync, per-target
//!   results, reports, publish, finish, and state transitions
//!
//! Every record carries an `event` field so the log stream can be filtered
//! without parsing messages. Nothing in here ever receives a secret.

use tracing::{info, warn};

use crate::domain::{BuildTarget, RunState};

/// RAII guard that enters a run-scoped tracing span for the duration of a run.
pub struct RunSpan {
    _span: tracing::span::EnteredSpan,
}

impl RunSpan {
    /// Create and enter a span tagged with the run id and component.
    pub fn enter(run_id: &str, component: &str) -> Self {
        let span = tracing::info_span!("autobuild.run", run_id = %run_id, component = %component);
        Self {
            _span: span.entered(),
        }
    }
}

pub fn emit_run_started(run_id: &str, component: &str, targets: &[BuildTarget]) {
    let targets = targets
        .iter()
        .map(BuildTarget::label)
        .collect::<Vec<_>>()
        .join(" ");
    info!(event = "run.started", run_id = %run_id, component = %component, targets = %targets);
}

pub fn emit_sync_finished(component: &str) {
    info!(event = "sync.finished", component = %component);
}

/// Target skipped because its current version is already released.
pub fn emit_target_skipped(target: &BuildTarget) {
    info!(event = "target.skipped", target = %target, "already released");
}

pub fn emit_target_built(target: &BuildTarget, log_url: &str) {
    info!(event = "target.built", target = %target, log_url = %log_url);
}

pub fn emit_target_failed(target: &BuildTarget, log_url: &str) {
    warn!(event = "target.failed", target = %target, log_url = %log_url);
}

pub fn emit_report_filed(component: &str, package_set: &str, dist: &str) {
    info!(
        event = "report.filed",
        component = %component,
        package_set = %package_set,
        dist = %dist,
    );
}

pub fn emit_publish_started(dom0: Option<&str>, vms: &[String]) {
    info!(
        event = "publish.started",
        dom0 = dom0.unwrap_or("-"),
        vm = %vms.join(" "),
    );
}

pub fn emit_publish_finished(success: bool) {
    info!(event = "publish.finished", success = success);
}

pub fn emit_state_transition(from: RunState, to: RunState) {
    tracing::debug!(
        event = "state.transition",
        from = %from,
        to = %to,
        policy = ?to.policy(),
    );
}

/// Emit event: run finished with duration, attempt counts and final state.
pub fn emit_run_finished(
    run_id: &str,
    duration_ms: u64,
    built: usize,
    failed: usize,
    skipped: usize,
    state: RunState,
) {
    info!(
        event = "run.finished",
        run_id = %run_id,
        duration_ms = duration_ms,
        built = built,
        failed = failed,
        skipped = skipped,
        state = %state,
    );
}
