//! Run configuration.
//!
//! All settings are looked up through a [`ConfigLookup`] exactly once, at the
//! start of a run, and frozen into a [`RunConfig`]. The two reporting secrets
//! are deliberately not part of `RunConfig`: the failure reporter fetches them
//! at call time and drops them right after the request is sent.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;

use crate::domain::{AutobuildError, BuildTarget, Component, Result};

pub const DIST_DOM0: &str = "DIST_DOM0";
pub const DISTS_VM: &str = "DISTS_VM";
pub const GIT_MERGE_OPTS: &str = "GIT_MERGE_OPTS";
pub const BUILD_LOG_URL: &str = "BUILD_LOG_URL";
pub const GIT_BASEURL: &str = "GIT_BASEURL";
pub const GIT_PREFIX: &str = "GIT_PREFIX";
pub const BUILDER_PLUGINS: &str = "BUILDER_PLUGINS";
pub const BUILD_LOG_HOST: &str = "BUILD_LOG_HOST";
pub const GITHUB_API_KEY: &str = "GITHUB_API_KEY";
pub const GITHUB_BUILD_ISSUES_REPO: &str = "GITHUB_BUILD_ISSUES_REPO";

const DEFAULT_MERGE_OPTS: &str = "--ff-only";
const DEFAULT_GIT_BASEURL: &str = "https://github.com";
const DEFAULT_GIT_PREFIX: &str = "QubesOS/qubes-";

/// Read-only access to named configuration values.
pub trait ConfigLookup: Send + Sync {
    /// Raw value of `name`, or `None` when it is not set.
    fn get(&self, name: &str) -> Option<String>;

    /// Value of `name` trimmed, treating blank values as unset.
    fn get_nonempty(&self, name: &str) -> Option<String> {
        self.get(name)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }
}

/// Looks values up in the process environment.
#[derive(Debug, Default, Clone, Copy)]
pub struct EnvLookup;

impl ConfigLookup for EnvLookup {
    fn get(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

/// Fixed set of values. Mostly useful in tests.
#[derive(Debug, Default, Clone)]
pub struct MapLookup {
    values: HashMap<String, String>,
}

impl MapLookup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, value: &str) -> Self {
        self.values.insert(name.to_string(), value.to_string());
        self
    }
}

impl ConfigLookup for MapLookup {
    fn get(&self, name: &str) -> Option<String> {
        self.values.get(name).cloned()
    }
}

/// Tries each source in order; the first one that knows a name wins.
#[derive(Clone, Default)]
pub struct ChainLookup {
    sources: Vec<Arc<dyn ConfigLookup>>,
}

impl ChainLookup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn then(mut self, source: Arc<dyn ConfigLookup>) -> Self {
        self.sources.push(source);
        self
    }
}

impl ConfigLookup for ChainLookup {
    fn get(&self, name: &str) -> Option<String> {
        self.sources
            .iter()
            .find_map(|s| s.get_nonempty(name))
    }
}

/// A credential that must never end up in a log line.
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Borrow the raw value. Only call this where the value leaves the
    /// process (e.g. an `Authorization` header).
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Secret(***)")
    }
}

impl std::fmt::Display for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("***")
    }
}

/// Immutable settings for one run.
#[derive(Debug, Clone, Serialize)]
pub struct RunConfig {
    pub component: Component,

    /// Root of the builder checkout.
    pub builder_dir: PathBuf,

    /// dom0 distribution, when dom0 packages are built at all.
    pub dom0_dist: Option<String>,

    /// VM distributions, in configured order.
    pub vm_dists: Vec<String>,

    /// Options passed to every source merge (`--ff-only` unless overridden).
    pub merge_opts: String,

    /// Seed for the aggregated build-log URL string handed to publishing.
    pub build_log_url: Option<String>,

    /// Where the component sources come from.
    pub source_url: String,

    /// Builder plugins updated together with the builder itself.
    pub builder_plugins: Vec<String>,

    /// Local host identity used for fallback log URLs.
    pub host_identity: String,
}

impl RunConfig {
    /// Validate the component argument and resolve every setting.
    ///
    /// The component is checked before `lookup` is consulted at all, so a bad
    /// argument never triggers any builder, git or network activity.
    pub fn resolve(
        component_arg: Option<&str>,
        builder_dir: &Path,
        lookup: &dyn ConfigLookup,
    ) -> Result<Self> {
        let component = match component_arg {
            Some(name) => Component::parse(name)?,
            None => {
                return Err(AutobuildError::Usage(
                    "missing required argument <component>".to_string(),
                ))
            }
        };

        let source_dir = component.source_dir(builder_dir);
        if !source_dir.is_dir() {
            return Err(AutobuildError::Usage(format!(
                "unknown component '{}': no source directory at {}",
                component,
                source_dir.display()
            )));
        }

        let source_url = resolve_source_url(&component, lookup);

        Ok(Self {
            builder_dir: builder_dir.to_path_buf(),
            dom0_dist: lookup.get_nonempty(DIST_DOM0),
            vm_dists: split_list(lookup.get(DISTS_VM)),
            merge_opts: lookup
                .get_nonempty(GIT_MERGE_OPTS)
                .unwrap_or_else(|| DEFAULT_MERGE_OPTS.to_string()),
            build_log_url: lookup.get_nonempty(BUILD_LOG_URL),
            source_url,
            builder_plugins: split_list(lookup.get(BUILDER_PLUGINS)),
            host_identity: resolve_host_identity(lookup),
            component,
        })
    }

    /// Targets of this run: dom0 first (if configured), then each VM
    /// distribution.
    pub fn targets(&self) -> Vec<BuildTarget> {
        self.dom0_dist
            .iter()
            .map(BuildTarget::dom0)
            .chain(self.vm_dists.iter().map(BuildTarget::vm))
            .collect()
    }
}

/// `GIT_URL_<component>` if set, else `<GIT_BASEURL>/<GIT_PREFIX><component>.git`.
fn resolve_source_url(component: &Component, lookup: &dyn ConfigLookup) -> String {
    let override_var = format!("GIT_URL_{}", component.var_suffix());
    if let Some(url) = lookup.get_nonempty(&override_var) {
        return url;
    }
    let base = lookup
        .get_nonempty(GIT_BASEURL)
        .unwrap_or_else(|| DEFAULT_GIT_BASEURL.to_string());
    let prefix = lookup
        .get_nonempty(GIT_PREFIX)
        .unwrap_or_else(|| DEFAULT_GIT_PREFIX.to_string());
    format!("{}/{}{}.git", base.trim_end_matches('/'), prefix, component)
}

fn resolve_host_identity(lookup: &dyn ConfigLookup) -> String {
    lookup
        .get_nonempty(BUILD_LOG_HOST)
        .or_else(|| lookup.get_nonempty("HOSTNAME"))
        .or_else(|| {
            std::fs::read_to_string("/etc/hostname")
                .ok()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        })
        .unwrap_or_else(|| "localhost".to_string())
}

fn split_list(value: Option<String>) -> Vec<String> {
    let mut items: Vec<String> = Vec::new();
    for item in value.unwrap_or_default().split_whitespace() {
        if !items.iter().any(|i| i == item) {
            items.push(item.to_string());
        }
    }
    items
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builder_with(component: &str) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("qubes-src").join(component)).unwrap();
        dir
    }

    #[test]
    fn test_resolve_full_config() {
        let dir = builder_with("core-admin");
        let lookup = MapLookup::new()
            .with(DIST_DOM0, "fc37")
            .with(DISTS_VM, "fc37 bookworm")
            .with(BUILDER_PLUGINS, "builder-rpm builder-debian")
            .with(BUILD_LOG_HOST, "build-host");

        let cfg = RunConfig::resolve(Some("core-admin"), dir.path(), &lookup).unwrap();
        assert_eq!(cfg.component.as_str(), "core-admin");
        assert_eq!(cfg.dom0_dist.as_deref(), Some("fc37"));
        assert_eq!(cfg.vm_dists, vec!["fc37", "bookworm"]);
        assert_eq!(cfg.merge_opts, "--ff-only");
        assert_eq!(cfg.builder_plugins, vec!["builder-rpm", "builder-debian"]);
        assert_eq!(cfg.host_identity, "build-host");
        assert_eq!(
            cfg.source_url,
            "https://github.com/QubesOS/qubes-core-admin.git"
        );
        assert_eq!(
            cfg.targets(),
            vec![
                BuildTarget::dom0("fc37"),
                BuildTarget::vm("fc37"),
                BuildTarget::vm("bookworm"),
            ]
        );
    }

    #[test]
    fn test_missing_component_is_usage_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = RunConfig::resolve(None, dir.path(), &MapLookup::new()).unwrap_err();
        assert!(matches!(err, AutobuildError::Usage(_)));
    }

    #[test]
    fn test_unknown_component_is_usage_error() {
        let dir = builder_with("core-admin");
        let err = RunConfig::resolve(Some("linux-utils"), dir.path(), &MapLookup::new())
            .unwrap_err();
        assert!(matches!(err, AutobuildError::Usage(_)));
        assert!(err.to_string().contains("linux-utils"));
    }

    #[test]
    fn test_source_url_override_uses_underscored_name() {
        let dir = builder_with("core-admin");
        let lookup = MapLookup::new().with("GIT_URL_core_admin", "https://mirror.example/ca.git");
        let cfg = RunConfig::resolve(Some("core-admin"), dir.path(), &lookup).unwrap();
        assert_eq!(cfg.source_url, "https://mirror.example/ca.git");
    }

    #[test]
    fn test_source_url_composed_from_base_and_prefix() {
        let dir = builder_with("app-linux-split-gpg");
        let lookup = MapLookup::new()
            .with(GIT_BASEURL, "https://git.example.org/")
            .with(GIT_PREFIX, "fork/qubes-");
        let cfg = RunConfig::resolve(Some("app-linux-split-gpg"), dir.path(), &lookup).unwrap();
        assert_eq!(
            cfg.source_url,
            "https://git.example.org/fork/qubes-app-linux-split-gpg.git"
        );
    }

    #[test]
    fn test_no_dom0_and_blank_vm_list() {
        let dir = builder_with("core-admin");
        let lookup = MapLookup::new().with(DIST_DOM0, "  ").with(DISTS_VM, "");
        let cfg = RunConfig::resolve(Some("core-admin"), dir.path(), &lookup).unwrap();
        assert!(cfg.dom0_dist.is_none());
        assert!(cfg.vm_dists.is_empty());
        assert!(cfg.targets().is_empty());
    }

    #[test]
    fn test_chain_lookup_first_nonempty_wins() {
        let first = MapLookup::new().with(DIST_DOM0, "").with(DISTS_VM, "bookworm");
        let second = MapLookup::new().with(DIST_DOM0, "fc37").with(DISTS_VM, "fc38");
        let chain = ChainLookup::new()
            .then(Arc::new(first))
            .then(Arc::new(second));
        assert_eq!(chain.get(DIST_DOM0).as_deref(), Some("fc37"));
        assert_eq!(chain.get(DISTS_VM).as_deref(), Some("bookworm"));
        assert_eq!(chain.get("UNSET"), None);
    }

    #[test]
    fn test_secret_is_redacted() {
        let secret = Secret::new("ghp_topsecret");
        assert_eq!(format!("{secret:?}"), "Secret(***)");
        assert_eq!(secret.to_string(), "***");
        assert_eq!(secret.expose(), "ghp_topsecret");
    }
}
