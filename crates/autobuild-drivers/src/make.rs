//! Invocation of builder `make` targets.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;
use tracing::debug;

use crate::error::{DriverError, Result};

/// One `make` call: targets plus `NAME=value` overrides and extra environment.
#[derive(Debug, Clone, Default)]
pub struct Invocation {
    targets: Vec<String>,
    vars: Vec<(String, String)>,
    env: Vec<(String, OsString)>,
    silent: bool,
}

impl Invocation {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            targets: vec![target.into()],
            ..Self::default()
        }
    }

    /// Pass `name=value` on the make command line.
    pub fn var(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.push((name.into(), value.into()));
        self
    }

    /// Set an environment variable for the child only.
    pub fn env(mut self, name: impl Into<String>, value: impl Into<OsString>) -> Self {
        self.env.push((name.into(), value.into()));
        self
    }

    /// Run with `-s` so only the target's own output is printed.
    pub fn silent(mut self) -> Self {
        self.silent = true;
        self
    }

    pub fn target_label(&self) -> String {
        self.targets.join(" ")
    }

    fn args(&self, builder_dir: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = Vec::new();
        if self.silent {
            args.push("-s".into());
        }
        args.push("-C".into());
        args.push(builder_dir.as_os_str().to_os_string());
        args.extend(self.vars.iter().map(|(k, v)| OsString::from(format!("{k}={v}"))));
        args.extend(self.targets.iter().map(OsString::from));
        args
    }
}

/// Runs `make` in the builder checkout.
#[derive(Debug, Clone)]
pub struct Make {
    program: String,
    builder_dir: PathBuf,
}

impl Make {
    pub fn new(builder_dir: impl Into<PathBuf>) -> Self {
        Self {
            program: "make".to_string(),
            builder_dir: builder_dir.into(),
        }
    }

    /// Use a different executable in place of `make`.
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    fn command(&self, inv: &Invocation) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(inv.args(&self.builder_dir))
            .envs(inv.env.iter().map(|(k, v)| (k, v)))
            .stdin(Stdio::null())
            .kill_on_drop(true);
        cmd
    }

    /// Run with inherited stdout/stderr; `Ok(false)` when the target failed.
    pub async fn status(&self, inv: &Invocation) -> Result<bool> {
        debug!(program = %self.program, target = %inv.target_label(), "make");
        let status = self
            .command(inv)
            .status()
            .await
            .map_err(|source| DriverError::Spawn {
                program: self.program.clone(),
                source,
            })?;
        Ok(status.success())
    }

    /// Run and require success.
    pub async fn run(&self, inv: &Invocation) -> Result<()> {
        if self.status(inv).await? {
            Ok(())
        } else {
            Err(DriverError::TargetFailed {
                target: inv.target_label(),
                status: "non-zero exit status".to_string(),
            })
        }
    }

    /// Run, require success and return captured stdout.
    pub async fn capture(&self, inv: &Invocation) -> Result<String> {
        debug!(program = %self.program, target = %inv.target_label(), "make (captured)");
        let output = self
            .command(inv)
            .stderr(Stdio::inherit())
            .output()
            .await
            .map_err(|source| DriverError::Spawn {
                program: self.program.clone(),
                source,
            })?;
        if !output.status.success() {
            return Err(DriverError::TargetFailed {
                target: inv.target_label(),
                status: output.status.to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    /// Blocking variant of [`capture`](Self::capture) for synchronous callers.
    pub fn capture_blocking(&self, inv: &Invocation) -> Result<String> {
        let output = std::process::Command::new(&self.program)
            .args(inv.args(&self.builder_dir))
            .envs(inv.env.iter().map(|(k, v)| (k, v)))
            .stdin(Stdio::null())
            .stderr(Stdio::inherit())
            .output()
            .map_err(|source| DriverError::Spawn {
                program: self.program.clone(),
                source,
            })?;
        if !output.status.success() {
            return Err(DriverError::TargetFailed {
                target: inv.target_label(),
                status: output.status.to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::os::unix::fs::PermissionsExt;
    use std::path::{Path, PathBuf};

    /// Write an executable shell script standing in for `make`.
    pub fn fake_make(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join("fake-make");
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        let mut perms = std::fs::metadata(&path).unwrap().permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&path, perms).unwrap();
        path
    }
}

#[cfg(test)]
mod tests {
    use super::testing::fake_make;
    use super::*;

    #[test]
    fn test_args_layout() {
        let inv = Invocation::new("get-sources")
            .var("COMPONENTS", "core-admin")
            .silent();
        let args = inv.args(Path::new("/builder"));
        assert_eq!(
            args,
            vec![
                OsString::from("-s"),
                OsString::from("-C"),
                OsString::from("/builder"),
                OsString::from("COMPONENTS=core-admin"),
                OsString::from("get-sources"),
            ]
        );
    }

    #[tokio::test]
    async fn test_capture_returns_stdout() {
        let dir = tempfile::tempdir().unwrap();
        let script = fake_make(dir.path(), "echo \"$@\"");
        let make = Make::new(dir.path()).with_program(script.to_string_lossy());

        let out = make
            .capture(&Invocation::new("get-var").var("GET_VAR", "DISTS_VM"))
            .await
            .unwrap();
        assert!(out.contains("GET_VAR=DISTS_VM get-var"));
    }

    #[tokio::test]
    async fn test_failing_target_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let script = fake_make(dir.path(), "exit 2");
        let make = Make::new(dir.path()).with_program(script.to_string_lossy());

        assert!(!make.status(&Invocation::new("x")).await.unwrap());
        let err = make.run(&Invocation::new("x")).await.unwrap_err();
        assert!(matches!(err, DriverError::TargetFailed { .. }));
    }

    #[tokio::test]
    async fn test_missing_program_is_spawn_error() {
        let make = Make::new("/").with_program("/nonexistent/make-binary");
        let err = make.run(&Invocation::new("x")).await.unwrap_err();
        assert!(matches!(err, DriverError::Spawn { .. }));
    }
}
