//! Release status oracle: decides whether a target can be skipped.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::driver_traits::ReleaseDriver;
use crate::domain::{AutobuildError, BuildTarget, Component, ReleaseStatus, Result};

/// Interprets raw release-status driver output.
///
/// An `Indeterminate` status means version metadata is missing, which is a
/// configuration error and distinct from "not released yet".
pub struct ReleaseStatusOracle {
    driver: Arc<dyn ReleaseDriver>,
}

impl ReleaseStatusOracle {
    pub fn new(driver: Arc<dyn ReleaseDriver>) -> Self {
        Self { driver }
    }

    /// Query the status of the current version for `(component, target)`.
    pub async fn query(&self, component: &Component, target: &BuildTarget) -> ReleaseStatus {
        match self
            .driver
            .check(component, target.kind, &target.distribution)
            .await
        {
            Ok(raw) => {
                let status = parse_status(&raw);
                debug!(component = %component, target = %target, raw = %raw.trim(), ?status, "release status");
                status
            }
            Err(e) => {
                warn!(component = %component, target = %target, error = %e, "release status query failed");
                ReleaseStatus::Indeterminate
            }
        }
    }

    /// Like [`query`](Self::query), but turns `Indeterminate` into an error.
    /// Returns `true` when the target is already released.
    pub async fn is_released(&self, component: &Component, target: &BuildTarget) -> Result<bool> {
        match self.query(component, target).await {
            ReleaseStatus::Released => Ok(true),
            ReleaseStatus::NotReleased => Ok(false),
            ReleaseStatus::Indeterminate => Err(AutobuildError::ReleaseStatus {
                component: component.to_string(),
                target: target.clone(),
                reason: "no version could be determined or the status query returned nothing"
                    .to_string(),
            }),
        }
    }
}

/// Map driver output to a status. Only the last non-empty line counts, and an
/// optional `<label>:` prefix is ignored.
pub fn parse_status(raw: &str) -> ReleaseStatus {
    let Some(line) = raw.lines().map(str::trim).filter(|l| !l.is_empty()).last() else {
        return ReleaseStatus::Indeterminate;
    };
    let verdict = line.rsplit(':').next().unwrap_or(line).trim();
    match verdict.to_ascii_lowercase().as_str() {
        "released" => ReleaseStatus::Released,
        "not released" => ReleaseStatus::NotReleased,
        _ => ReleaseStatus::Indeterminate,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::FakeReleaseDriver;

    #[test]
    fn test_parse_plain_values() {
        assert_eq!(parse_status("released\n"), ReleaseStatus::Released);
        assert_eq!(parse_status("not released"), ReleaseStatus::NotReleased);
    }

    #[test]
    fn test_parse_prefixed_and_multiline() {
        assert_eq!(
            parse_status("checking core-admin\nfc37: not released\n"),
            ReleaseStatus::NotReleased
        );
        assert_eq!(parse_status("vm-bookworm: released"), ReleaseStatus::Released);
    }

    #[test]
    fn test_parse_empty_or_unknown_is_indeterminate() {
        assert_eq!(parse_status(""), ReleaseStatus::Indeterminate);
        assert_eq!(parse_status("  \n \n"), ReleaseStatus::Indeterminate);
        assert_eq!(parse_status("no version file"), ReleaseStatus::Indeterminate);
    }

    #[tokio::test]
    async fn test_driver_error_is_indeterminate() {
        let driver = Arc::new(FakeReleaseDriver::new().failing_for(BuildTarget::vm("bookworm")));
        let oracle = ReleaseStatusOracle::new(driver);
        let component = Component::parse("core-admin").unwrap();

        let status = oracle.query(&component, &BuildTarget::vm("bookworm")).await;
        assert_eq!(status, ReleaseStatus::Indeterminate);

        let err = oracle
            .is_released(&component, &BuildTarget::vm("bookworm"))
            .await
            .unwrap_err();
        assert!(matches!(err, AutobuildError::ReleaseStatus { .. }));
    }

    #[tokio::test]
    async fn test_released_target() {
        let driver = Arc::new(FakeReleaseDriver::new().released(BuildTarget::dom0("fc37")));
        let oracle = ReleaseStatusOracle::new(driver);
        let component = Component::parse("core-admin").unwrap();

        assert!(oracle
            .is_released(&component, &BuildTarget::dom0("fc37"))
            .await
            .unwrap());
        assert!(!oracle
            .is_released(&component, &BuildTarget::vm("fc37"))
            .await
            .unwrap());
    }
}
