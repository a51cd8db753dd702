//! Build targets: one optional dom0 distribution plus any number of VM
//! distributions.

use serde::{Deserialize, Serialize};

/// Which package set a target builds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TargetKind {
    /// The controlling (administrative) domain.
    Dom0,

    /// A guest distribution template.
    Vm,
}

impl TargetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetKind::Dom0 => "dom0",
            TargetKind::Vm => "vm",
        }
    }
}

impl std::fmt::Display for TargetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single (kind, distribution) pair built during a run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct BuildTarget {
    pub kind: TargetKind,
    pub distribution: String,
}

impl BuildTarget {
    pub fn dom0(distribution: impl Into<String>) -> Self {
        Self {
            kind: TargetKind::Dom0,
            distribution: distribution.into(),
        }
    }

    pub fn vm(distribution: impl Into<String>) -> Self {
        Self {
            kind: TargetKind::Vm,
            distribution: distribution.into(),
        }
    }

    /// `<kind>-<distribution>`, e.g. `vm-bookworm`.
    pub fn label(&self) -> String {
        format!("{}-{}", self.kind, self.distribution)
    }
}

impl std::fmt::Display for BuildTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.kind, self.distribution)
    }
}
