//! Publish gate.
//!
//! Turns the per-target outcomes of the build loop into a
//! [`PublishRequest`] and hands it to the sign+publish driver. Only targets
//! that built successfully are ever published; an empty aggregate is a run
//! failure, not a no-op.

use std::sync::Arc;

use tracing::error;

use crate::config::RunConfig;
use crate::domain::{AggregateResult, AutobuildError, BuildOutcome, Result};
use crate::driver_traits::{PublishDriver, PublishRequest};
use crate::obs;

pub struct PublishGate {
    driver: Arc<dyn PublishDriver>,
}

impl PublishGate {
    pub fn new(driver: Arc<dyn PublishDriver>) -> Self {
        Self { driver }
    }

    /// Build the publish request for the successful targets in `outcomes`.
    ///
    /// Fails with [`AutobuildError::NothingBuilt`] when no target succeeded.
    pub fn prepare(config: &RunConfig, outcomes: &[BuildOutcome]) -> Result<PublishRequest> {
        let aggregate = AggregateResult::from_outcomes(outcomes);
        if aggregate.is_empty() {
            return Err(AutobuildError::NothingBuilt);
        }

        Ok(PublishRequest {
            component: config.component.clone(),
            dom0_dist: aggregate.dom0_built,
            vm_dists: aggregate.vm_built,
            build_log_url: aggregate_log_urls(config.build_log_url.as_deref(), outcomes),
            source_url: config.source_url.clone(),
        })
    }

    /// Sign and publish. Driver failures become [`AutobuildError::Publish`];
    /// nothing already published is rolled back.
    pub async fn publish(&self, request: &PublishRequest) -> Result<()> {
        obs::emit_publish_started(request.dom0_dist.as_deref(), &request.vm_dists);
        match self.driver.sign_and_publish(request).await {
            Ok(()) => {
                obs::emit_publish_finished(true);
                Ok(())
            }
            Err(e) => {
                obs::emit_publish_finished(false);
                error!(component = %request.component, error = %e, "sign and publish failed");
                Err(match e {
                    AutobuildError::Publish(msg) => AutobuildError::Publish(msg),
                    other => AutobuildError::Publish(other.to_string()),
                })
            }
        }
    }
}

/// Configured seed followed by one `<kind>-<dist>=<url>` entry per successful
/// target, space separated.
pub fn aggregate_log_urls(seed: Option<&str>, outcomes: &[BuildOutcome]) -> String {
    seed.map(str::to_string)
        .into_iter()
        .chain(
            outcomes
                .iter()
                .filter(|o| o.succeeded)
                .map(|o| format!("{}={}", o.target.label(), o.log_url)),
        )
        .collect::<Vec<_>>()
        .join(" ")
}
