//! autobuild - unattended build-and-publish of one builder component
//!
//! ```text
//! autobuild [--builder-dir DIR] [--verbose] [--json] <component>
//! ```
//!
//! Synchronizes sources, builds the component for dom0 and every configured
//! VM distribution that is not released yet, files an issue for each failure
//! and publishes the successful builds to current-testing.
//!
//! Exit status is 0 when at least one target built and publishing succeeded
//! (or everything was already released), 1 otherwise.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use autobuild_core::{
    AutobuildError, ChainLookup, ConfigLookup, EnvLookup, Pipeline, RunConfig, EXIT_FAILURE,
};
use autobuild_drivers::{system_collaborators, BuilderVarLookup, Make};
use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use tracing::{info, warn, Level};

#[derive(Parser, Debug)]
#[command(name = "autobuild")]
#[command(author = "Stevedores Org")]
#[command(version = autobuild_core::VERSION)]
#[command(about = "Build a component for every configured target and publish it", long_about = None)]
struct Cli {
    /// Component to build (a directory under qubes-src/ in the builder)
    component: Option<String>,

    /// Builder checkout to run in
    #[arg(long, env = "AUTOBUILD_BUILDER_DIR", default_value = ".")]
    builder_dir: PathBuf,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Emit JSON-formatted log lines and a JSON run report on stdout
    #[arg(long)]
    json: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let status = parse_error_status(&e);
            e.print().ok();
            return ExitCode::from(status);
        }
    };

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    autobuild_core::init_tracing(cli.json, level);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let autobuild_err = e.downcast_ref::<AutobuildError>();
            if let Some(AutobuildError::Usage(_)) = autobuild_err {
                eprintln!("{}", Cli::command().render_usage());
            }
            eprintln!("error: {e:#}");
            ExitCode::from(autobuild_err.map_or(EXIT_FAILURE, AutobuildError::exit_code))
        }
    }
}

/// Help and version requests succeed; every other parse error is a usage
/// error.
fn parse_error_status(err: &clap::Error) -> u8 {
    match err.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
        _ => EXIT_FAILURE,
    }
}

async fn run(cli: Cli) -> Result<()> {
    let env: Arc<dyn ConfigLookup> = Arc::new(EnvLookup);
    let builder_vars: Arc<dyn ConfigLookup> =
        Arc::new(BuilderVarLookup::new(Make::new(&cli.builder_dir)));
    let lookup: Arc<dyn ConfigLookup> = Arc::new(ChainLookup::new().then(env).then(builder_vars));

    let config = RunConfig::resolve(cli.component.as_deref(), &cli.builder_dir, lookup.as_ref())?;
    info!(
        component = %config.component,
        dom0 = config.dom0_dist.as_deref().unwrap_or("-"),
        vm = %config.vm_dists.join(" "),
        source_url = %config.source_url,
        "resolved configuration"
    );

    let collaborators = system_collaborators(&cli.builder_dir, lookup)
        .context("failed to set up build drivers")?;
    let pipeline = Pipeline::new(config, collaborators);

    // Dropping the pipeline on a signal kills the running builder and removes
    // the run workspace.
    tokio::select! {
        result = pipeline.run() => {
            let report = result?;
            info!(
                built = report.built_count(),
                failed = report.failed_count(),
                skipped = report.skipped.len(),
                published = report.published,
                "run complete"
            );
            if cli.json {
                println!("{}", serde_json::to_string(&report)?);
            }
            Ok(())
        }
        signal = interrupted() => {
            warn!(signal = signal, "interrupted, cleaning up");
            anyhow::bail!("interrupted by {signal}")
        }
    }
}

/// Resolves on SIGINT or SIGTERM. Never resolves if the handlers cannot be
/// installed.
async fn interrupted() -> &'static str {
    use tokio::signal::unix::{signal, SignalKind};

    let mut term = match signal(SignalKind::terminate()) {
        Ok(term) => term,
        Err(e) => {
            warn!(error = %e, "cannot install SIGTERM handler");
            return std::future::pending().await;
        }
    };
    tokio::select! {
        r = tokio::signal::ctrl_c() => match r {
            Ok(()) => "SIGINT",
            Err(e) => {
                warn!(error = %e, "cannot install SIGINT handler");
                term.recv().await;
                "SIGTERM"
            }
        },
        _ = term.recv() => "SIGTERM",
    }
}
