//! Build attempts through the builder, with log capture.

use async_trait::async_trait;
use autobuild_core::{BuildAttempt, BuildDriver, BuildTarget, Component};
use tracing::{info, warn};

use crate::make::{Invocation, Make};
use crate::release::scope_vars;
use crate::workspace::{RunWorkspace, BUILD_LOG_ID_FILE};

/// Environment variable naming the command the builder pipes its output to.
pub const QUBES_BUILD_LOG_CMD: &str = "QUBES_BUILD_LOG_CMD";

/// Runs `make <component>-<kind>` for one distribution.
///
/// Build output is streamed by the builder through the configured log
/// command, which stores the collector-assigned identifier in the run's
/// [`LogHandle`](crate::workspace::LogHandle).
#[derive(Debug)]
pub struct MakeBuildDriver {
    make: Make,
    workspace: RunWorkspace,
    log_cmd: Option<String>,
}

impl MakeBuildDriver {
    pub fn new(make: Make, workspace: RunWorkspace) -> Self {
        Self {
            make,
            workspace,
            log_cmd: None,
        }
    }

    pub fn with_log_cmd(mut self, log_cmd: Option<String>) -> Self {
        self.log_cmd = log_cmd;
        self
    }

    fn invocation(
        &self,
        component: &Component,
        target: &BuildTarget,
        log_id_file: &std::path::Path,
    ) -> Invocation {
        let mut inv = Invocation::new(format!("{}-{}", component, target.kind))
            .var("COMPONENTS", component.as_str())
            .env(BUILD_LOG_ID_FILE, log_id_file.as_os_str());
        for (name, value) in scope_vars(target.kind, &target.distribution) {
            inv = inv.var(name, value);
        }
        if let Some(cmd) = &self.log_cmd {
            inv = inv.env(QUBES_BUILD_LOG_CMD, cmd.as_str());
        }
        inv
    }
}

#[async_trait]
impl BuildDriver for MakeBuildDriver {
    async fn build(
        &self,
        component: &Component,
        target: &BuildTarget,
    ) -> autobuild_core::Result<BuildAttempt> {
        let handle = self.workspace.log_handle()?;
        let inv = self.invocation(component, target, handle.path());

        let succeeded = self.make.status(&inv).await?;
        let log_id = handle.take();
        if log_id.is_none() {
            warn!(target = %target, "build produced no log identifier");
        }
        info!(target = %target, succeeded = succeeded, "build finished");
        Ok(BuildAttempt { succeeded, log_id })
    }

    fn release(&self) {
        self.workspace.clear_log_handle();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::make::testing::fake_make;

    fn driver(body: &str) -> (tempfile::TempDir, MakeBuildDriver) {
        let dir = tempfile::tempdir().unwrap();
        let script = fake_make(dir.path(), body);
        let make = Make::new(dir.path()).with_program(script.to_string_lossy());
        (dir, MakeBuildDriver::new(make, RunWorkspace::new().unwrap()))
    }

    #[tokio::test]
    async fn test_successful_build_reports_log_id() {
        let (_dir, driver) = driver(r#"echo "log $*" > "$BUILD_LOG_ID_FILE""#);
        let component = Component::parse("core-admin").unwrap();

        let attempt = driver
            .build(&component, &BuildTarget::vm("bookworm"))
            .await
            .unwrap();
        assert!(attempt.succeeded);
        let id = attempt.log_id.unwrap();
        assert!(id.contains("DISTS_VM=bookworm"));
        assert!(id.ends_with("core-admin-vm"));
    }

    #[tokio::test]
    async fn test_failed_build_without_log_channel() {
        let (_dir, driver) = driver("exit 2");
        let component = Component::parse("core-admin").unwrap();

        let attempt = driver
            .build(&component, &BuildTarget::dom0("fc37"))
            .await
            .unwrap();
        assert_eq!(attempt, BuildAttempt::failed(None));
    }

    #[tokio::test]
    async fn test_identifier_not_carried_to_next_target() {
        let (_dir, driver) = driver(
            r#"case "$*" in *dom0*) echo dom0-log > "$BUILD_LOG_ID_FILE";; *) exit 1;; esac"#,
        );
        let component = Component::parse("core-admin").unwrap();

        let first = driver.build(&component, &BuildTarget::dom0("fc37")).await.unwrap();
        let second = driver.build(&component, &BuildTarget::vm("fc37")).await.unwrap();
        assert_eq!(first.log_id.as_deref(), Some("dom0-log"));
        assert_eq!(second.log_id, None);
    }

    #[tokio::test]
    async fn test_log_cmd_is_exported() {
        let (_dir, driver) = driver(r#"echo "$QUBES_BUILD_LOG_CMD" > "$BUILD_LOG_ID_FILE""#);
        let driver = driver.with_log_cmd(Some("upload-build-log".to_string()));
        let attempt = driver
            .build(&Component::parse("core-admin").unwrap(), &BuildTarget::dom0("fc37"))
            .await
            .unwrap();
        assert_eq!(attempt.log_id.as_deref(), Some("upload-build-log"));
    }
}
