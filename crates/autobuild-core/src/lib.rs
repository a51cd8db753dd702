//! Autobuild Core Library
//!
//! Orchestrates one unattended build-and-publish run of a single component:
//! - Synchronizes builder and component sources (fast-forward only)
//! - Skips targets whose current version is already released
//! - Builds each remaining target once, isolating failures per target
//! - Files an issue for every failed build or publish
//! - Signs and publishes whatever built, or fails the run

pub mod config;
pub mod domain;
pub mod driver_traits;
pub mod fakes;
pub mod log_locator;
pub mod obs;
pub mod pipeline;
pub mod publish_gate;
pub mod release;
pub mod reporter;
pub mod telemetry;

pub use config::{ChainLookup, ConfigLookup, EnvLookup, MapLookup, RunConfig, Secret};
pub use domain::{
    AggregateResult, AutobuildError, BuildAttempt, BuildOutcome, BuildTarget, Component,
    ErrorPolicy, ReleaseStatus, Result, RunMachine, RunState, TargetKind, TargetState,
    EXIT_FAILURE,
};
pub use driver_traits::{
    BuildDriver, IssueRecord, IssueTracker, PublishDriver, PublishRequest, ReleaseDriver,
    SourceSync,
};
pub use log_locator::LogLocator;
pub use obs::RunSpan;
pub use pipeline::{Collaborators, Pipeline, RunReport};
pub use publish_gate::PublishGate;
pub use release::ReleaseStatusOracle;
pub use reporter::{FailureReporter, PackageSet};
pub use telemetry::init_tracing;

/// Autobuild version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
