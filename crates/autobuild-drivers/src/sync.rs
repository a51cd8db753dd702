//! Fast-forward-only source synchronization through the builder.

use async_trait::async_trait;
use autobuild_core::{AutobuildError, Component, SourceSync};
use tracing::info;

use crate::make::{Invocation, Make};

/// Updates builder and component checkouts with the builder's
/// `get-sources` targets.
///
/// Signed-tag verification is forced on (`NO_CHECK=` is cleared) so a
/// checkout can only move to a verified tag.
#[derive(Debug, Clone)]
pub struct MakeSourceSync {
    make: Make,
}

impl MakeSourceSync {
    pub fn new(make: Make) -> Self {
        Self { make }
    }
}

#[async_trait]
impl SourceSync for MakeSourceSync {
    async fn update_builder(&self, plugins: &[String], merge_opts: &str) -> autobuild_core::Result<()> {
        let components = std::iter::once("builder".to_string())
            .chain(plugins.iter().cloned())
            .collect::<Vec<_>>()
            .join(" ");
        info!(components = %components, "updating builder");
        let inv = Invocation::new("get-sources")
            .var("COMPONENTS", components)
            .var("GIT_MERGE_OPTS", merge_opts)
            .var("NO_CHECK", "");
        self.make
            .run(&inv)
            .await
            .map_err(|e| AutobuildError::Sync(format!("builder update: {e}")))
    }

    async fn update_sources(&self, component: &Component, merge_opts: &str) -> autobuild_core::Result<()> {
        info!(component = %component, "updating component sources");
        let get = Invocation::new("get-sources")
            .var("COMPONENTS", component.as_str())
            .var("GIT_MERGE_OPTS", merge_opts)
            .var("NO_CHECK", "");
        self.make
            .run(&get)
            .await
            .map_err(|e| AutobuildError::Sync(format!("{component} sources: {e}")))?;

        let extra = Invocation::new("get-sources-extra").var("COMPONENTS", component.as_str());
        self.make
            .run(&extra)
            .await
            .map_err(|e| AutobuildError::Sync(format!("{component} extra sources: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::make::testing::fake_make;

    #[tokio::test]
    async fn test_sync_passes_ff_only_and_components() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("calls");
        let script = fake_make(dir.path(), &format!("echo \"$@\" >> {}", log.display()));
        let sync = MakeSourceSync::new(Make::new(dir.path()).with_program(script.to_string_lossy()));

        sync.update_builder(&["builder-rpm".to_string()], "--ff-only")
            .await
            .unwrap();
        sync.update_sources(&Component::parse("core-admin").unwrap(), "--ff-only")
            .await
            .unwrap();

        let calls = std::fs::read_to_string(&log).unwrap();
        let lines: Vec<&str> = calls.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].contains("COMPONENTS=builder builder-rpm"));
        assert!(lines[0].contains("GIT_MERGE_OPTS=--ff-only"));
        assert!(lines[1].ends_with("get-sources"));
        assert!(lines[1].contains("COMPONENTS=core-admin"));
        assert!(lines[2].ends_with("get-sources-extra"));
    }

    #[tokio::test]
    async fn test_merge_failure_is_sync_error() {
        let dir = tempfile::tempdir().unwrap();
        let script = fake_make(dir.path(), "echo 'fatal: Not possible to fast-forward' >&2; exit 1");
        let sync = MakeSourceSync::new(Make::new(dir.path()).with_program(script.to_string_lossy()));

        let err = sync
            .update_sources(&Component::parse("core-admin").unwrap(), "--ff-only")
            .await
            .unwrap_err();
        assert!(matches!(err, AutobuildError::Sync(_)));
    }
}
