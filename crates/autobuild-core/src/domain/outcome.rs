//! Per-target results and their aggregation.

use serde::{Deserialize, Serialize};

use crate::domain::target::{BuildTarget, TargetKind};

/// Whether the current component version is already published for a target.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReleaseStatus {
    Released,
    NotReleased,
    /// Version metadata is missing or the query returned nothing usable.
    Indeterminate,
}

/// What a build driver reports for one attempt.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BuildAttempt {
    pub succeeded: bool,

    /// Identifier assigned by the remote log collector, if the logging
    /// channel ever started.
    pub log_id: Option<String>,
}

impl BuildAttempt {
    pub fn succeeded(log_id: impl Into<String>) -> Self {
        Self {
            succeeded: true,
            log_id: Some(log_id.into()),
        }
    }

    pub fn failed(log_id: Option<String>) -> Self {
        Self {
            succeeded: false,
            log_id,
        }
    }
}

/// Outcome of one attempted target, with its resolved log URL.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BuildOutcome {
    pub target: BuildTarget,
    pub succeeded: bool,
    pub log_url: String,
}

/// Successful distributions accumulated across the target loop.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AggregateResult {
    pub dom0_built: Option<String>,
    pub vm_built: Vec<String>,
}

impl AggregateResult {
    /// Collect the successful targets of `outcomes`, in build order.
    pub fn from_outcomes(outcomes: &[BuildOutcome]) -> Self {
        let mut result = Self::default();
        for outcome in outcomes.iter().filter(|o| o.succeeded) {
            result.record(&outcome.target);
        }
        result
    }

    fn record(&mut self, target: &BuildTarget) {
        match target.kind {
            TargetKind::Dom0 => self.dom0_built = Some(target.distribution.clone()),
            TargetKind::Vm => {
                if !self.vm_built.contains(&target.distribution) {
                    self.vm_built.push(target.distribution.clone());
                }
            }
        }
    }

    /// True when nothing is eligible for publishing.
    pub fn is_empty(&self) -> bool {
        self.dom0_built.is_none() && self.vm_built.is_empty()
    }

    /// Successful targets as `<kind>-<dist>` labels, dom0 first, space
    /// separated.
    pub fn labels(&self) -> String {
        self.dom0_built
            .iter()
            .map(BuildTarget::dom0)
            .chain(self.vm_built.iter().map(BuildTarget::vm))
            .map(|t| t.label())
            .collect::<Vec<_>>()
            .join(" ")
    }
}
