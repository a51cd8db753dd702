//! Validated component identifier.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::domain::error::{AutobuildError, Result};

/// Directory under the builder root that holds one checkout per component.
pub const SOURCES_DIR: &str = "qubes-src";

/// Name of the component being built.
///
/// Guaranteed non-empty, free of path separators, and not a relative
/// directory reference (`.` or `..`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Component(String);

impl Component {
    /// Parse a component name from the command line.
    pub fn parse(name: &str) -> Result<Self> {
        if name.is_empty() {
            return Err(AutobuildError::Usage(
                "component name must not be empty".to_string(),
            ));
        }
        if name.contains('/') || name.contains('\\') {
            return Err(AutobuildError::Usage(format!(
                "component name '{name}' must not contain a path separator"
            )));
        }
        if name == "." || name == ".." {
            return Err(AutobuildError::Usage(format!(
                "'{name}' is not a component name"
            )));
        }
        Ok(Self(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Checkout location of this component inside `builder_dir`.
    pub fn source_dir(&self, builder_dir: &Path) -> PathBuf {
        builder_dir.join(SOURCES_DIR).join(&self.0)
    }

    /// Suffix used by per-component builder variables (`-` becomes `_`).
    pub fn var_suffix(&self) -> String {
        self.0.replace('-', "_")
    }
}

impl std::fmt::Display for Component {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_name() {
        let c = Component::parse("core-admin").unwrap();
        assert_eq!(c.as_str(), "core-admin");
        assert_eq!(c.var_suffix(), "core_admin");
    }

    #[test]
    fn test_parse_rejects_separators() {
        for name in ["../etc", "core/admin", "/abs", "a\\b"] {
            let err = Component::parse(name).unwrap_err();
            assert!(matches!(err, AutobuildError::Usage(_)), "{name}");
        }
    }

    #[test]
    fn test_parse_rejects_empty_and_dot_names() {
        assert!(Component::parse("").is_err());
        assert!(Component::parse(".").is_err());
        assert!(Component::parse("..").is_err());
    }

    #[test]
    fn test_source_dir_layout() {
        let c = Component::parse("linux-utils").unwrap();
        assert_eq!(
            c.source_dir(Path::new("/builder")),
            PathBuf::from("/builder/qubes-src/linux-utils")
        );
    }
}
