//! Autobuild Drivers: builder, git and issue tracker integration
//!
//! System implementations of the collaborator traits in `autobuild-core`.
//! Everything that touches the builder goes through `make` targets in the
//! builder checkout; failure reports go to the GitHub REST API.

pub mod build;
pub mod error;
pub mod github;
pub mod lookup;
pub mod make;
pub mod publish;
pub mod release;
pub mod sync;
pub mod workspace;

use std::path::Path;
use std::sync::Arc;

use autobuild_core::{Collaborators, ConfigLookup};

pub use build::{MakeBuildDriver, QUBES_BUILD_LOG_CMD};
pub use error::{DriverError, Result};
pub use github::{GithubIssueTracker, DEFAULT_API_URL};
pub use lookup::BuilderVarLookup;
pub use make::{Invocation, Make};
pub use publish::MakePublishDriver;
pub use release::MakeReleaseDriver;
pub use sync::MakeSourceSync;
pub use workspace::{LogHandle, RunWorkspace, BUILD_LOG_ID_FILE};

/// Name of the setting overriding the GitHub API endpoint.
pub const GITHUB_API_URL: &str = "GITHUB_API_URL";

/// Wire the system drivers for a builder checkout at `builder_dir`.
///
/// `lookup` supplies the issue tracker endpoint and log command now, and the
/// reporting secrets later, at report time.
pub fn system_collaborators(
    builder_dir: &Path,
    lookup: Arc<dyn ConfigLookup>,
) -> Result<Collaborators> {
    let make = Make::new(builder_dir);
    let api_url = lookup
        .get_nonempty(GITHUB_API_URL)
        .unwrap_or_else(|| DEFAULT_API_URL.to_string());

    let build = MakeBuildDriver::new(make.clone(), RunWorkspace::new()?)
        .with_log_cmd(lookup.get_nonempty(QUBES_BUILD_LOG_CMD));

    Ok(Collaborators {
        sync: Arc::new(MakeSourceSync::new(make.clone())),
        release: Arc::new(MakeReleaseDriver::new(make.clone())),
        build: Arc::new(build),
        publish: Arc::new(MakePublishDriver::new(make)),
        issues: Arc::new(GithubIssueTracker::new(api_url)?),
        secrets: lookup,
    })
}
