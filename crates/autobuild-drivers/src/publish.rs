//! Signing and publishing to the current-testing repository.

use async_trait::async_trait;
use autobuild_core::{AutobuildError, PublishDriver, PublishRequest};
use tracing::info;

use crate::make::{Invocation, Make};

/// Runs `sign-all` and then `update-repo-current-testing`, scoped to the
/// successful distributions of the request.
#[derive(Debug, Clone)]
pub struct MakePublishDriver {
    make: Make,
}

impl MakePublishDriver {
    pub fn new(make: Make) -> Self {
        Self { make }
    }

    fn invocation(target: &str, request: &PublishRequest) -> Invocation {
        Invocation::new(target)
            .var("COMPONENTS", request.component.as_str())
            .var("DIST_DOM0", request.dom0_dist.clone().unwrap_or_default())
            .var("DISTS_VM", request.vm_dists.join(" "))
            .var("BUILD_LOG_URL", request.build_log_url.as_str())
            .var(
                format!("GIT_URL_{}", request.component.var_suffix()),
                request.source_url.as_str(),
            )
    }
}

#[async_trait]
impl PublishDriver for MakePublishDriver {
    async fn sign_and_publish(&self, request: &PublishRequest) -> autobuild_core::Result<()> {
        for target in ["sign-all", "update-repo-current-testing"] {
            info!(target = %target, component = %request.component, "publishing");
            self.make
                .run(&Self::invocation(target, request))
                .await
                .map_err(|e| AutobuildError::Publish(e.to_string()))?;
        }
        Ok(())
    }
}
