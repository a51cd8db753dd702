//! Domain types shared by every stage of a run.

pub mod component;
pub mod error;
pub mod outcome;
pub mod state;
pub mod target;

pub use component::{Component, SOURCES_DIR};
pub use error::{AutobuildError, Result, EXIT_FAILURE};
pub use outcome::{AggregateResult, BuildAttempt, BuildOutcome, ReleaseStatus};
pub use state::{ErrorPolicy, RunMachine, RunState, TargetState};
pub use target::{BuildTarget, TargetKind};
