//! Release-status queries through the builder.

use async_trait::async_trait;
use autobuild_core::{AutobuildError, BuildTarget, Component, ReleaseDriver, TargetKind};

use crate::make::{Invocation, Make};

/// Runs `check-release-status-<kind>` scoped to a single distribution and
/// returns its output for the oracle to interpret.
#[derive(Debug, Clone)]
pub struct MakeReleaseDriver {
    make: Make,
}

impl MakeReleaseDriver {
    pub fn new(make: Make) -> Self {
        Self { make }
    }
}

/// `DIST_DOM0`/`DISTS_VM` overrides that restrict the builder to one target.
pub(crate) fn scope_vars(kind: TargetKind, distribution: &str) -> [(&'static str, String); 2] {
    match kind {
        TargetKind::Dom0 => [
            ("DIST_DOM0", distribution.to_string()),
            ("DISTS_VM", String::new()),
        ],
        TargetKind::Vm => [
            ("DIST_DOM0", String::new()),
            ("DISTS_VM", distribution.to_string()),
        ],
    }
}

#[async_trait]
impl ReleaseDriver for MakeReleaseDriver {
    async fn check(
        &self,
        component: &Component,
        kind: TargetKind,
        distribution: &str,
    ) -> autobuild_core::Result<String> {
        let mut inv = Invocation::new(format!("check-release-status-{kind}"))
            .var("COMPONENTS", component.as_str())
            .silent();
        for (name, value) in scope_vars(kind, distribution) {
            inv = inv.var(name, value);
        }
        self.make.capture(&inv).await.map_err(|e| AutobuildError::ReleaseStatus {
            component: component.to_string(),
            target: BuildTarget {
                kind,
                distribution: distribution.to_string(),
            },
            reason: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::make::testing::fake_make;

    #[tokio::test]
    async fn test_check_returns_raw_output() {
        let dir = tempfile::tempdir().unwrap();
        let script = fake_make(
            dir.path(),
            r#"case "$*" in *DISTS_VM=bookworm*check-release-status-vm*) echo "bookworm: released";; *) echo "not released";; esac"#,
        );
        let driver = MakeReleaseDriver::new(Make::new(dir.path()).with_program(script.to_string_lossy()));
        let component = Component::parse("core-admin").unwrap();

        let out = driver.check(&component, TargetKind::Vm, "bookworm").await.unwrap();
        assert_eq!(out.trim(), "bookworm: released");
        let out = driver.check(&component, TargetKind::Dom0, "fc37").await.unwrap();
        assert_eq!(out.trim(), "not released");
    }

    #[tokio::test]
    async fn test_missing_version_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let script = fake_make(dir.path(), "echo 'no version file' >&2; exit 2");
        let driver = MakeReleaseDriver::new(Make::new(dir.path()).with_program(script.to_string_lossy()));

        let err = driver
            .check(&Component::parse("core-admin").unwrap(), TargetKind::Dom0, "fc37")
            .await
            .unwrap_err();
        assert!(matches!(err, AutobuildError::ReleaseStatus { .. }));
    }

    #[test]
    fn test_scope_vars_clear_other_kind() {
        let vars = scope_vars(TargetKind::Vm, "bookworm");
        assert_eq!(vars[0], ("DIST_DOM0", String::new()));
        assert_eq!(vars[1], ("DISTS_VM", "bookworm".to_string()));
    }
}
