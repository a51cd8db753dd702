//! Resolves the public URL of a build log.

use serde::{Deserialize, Serialize};

/// Base URL of the public build-log repository.
pub const BUILD_LOGS_BASE: &str = "https://github.com/QubesOS/build-logs/tree/master";

/// Turns a log identifier into a URL. Never fails: when the logging channel
/// did not produce an identifier, it points at the per-host log directory
/// instead.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LogLocator {
    host_identity: String,
}

impl LogLocator {
    pub fn new(host_identity: impl Into<String>) -> Self {
        Self {
            host_identity: host_identity.into(),
        }
    }

    /// URL for `log_id`, or the host fallback URL when it is absent or blank.
    pub fn resolve(&self, log_id: Option<&str>) -> String {
        let id = log_id
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .unwrap_or(&self.host_identity);
        format!("{BUILD_LOGS_BASE}/{id}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_with_identifier() {
        let locator = LogLocator::new("builder-01");
        assert_eq!(
            locator.resolve(Some("builder-01/2023-05-01/core-admin-vm-bookworm")),
            "https://github.com/QubesOS/build-logs/tree/master/builder-01/2023-05-01/core-admin-vm-bookworm"
        );
    }

    #[test]
    fn test_resolve_falls_back_to_host() {
        let locator = LogLocator::new("builder-01");
        let expected = "https://github.com/QubesOS/build-logs/tree/master/builder-01";
        assert_eq!(locator.resolve(None), expected);
        assert_eq!(locator.resolve(Some("")), expected);
        assert_eq!(locator.resolve(Some(" \n")), expected);
    }

    #[test]
    fn test_identifier_is_trimmed() {
        let locator = LogLocator::new("h");
        assert_eq!(
            locator.resolve(Some("h/abc\n")),
            "https://github.com/QubesOS/build-logs/tree/master/h/abc"
        );
    }
}
