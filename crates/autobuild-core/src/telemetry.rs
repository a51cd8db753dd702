//! Log output setup for the autobuild binary.
//!
//! Builder and git output goes to stdout untouched; our own records go to
//! stderr, as text for an operator watching the run or as JSON lines for a
//! build host that ships its logs elsewhere.

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

const OWN_TARGETS: [&str; 3] = ["autobuild", "autobuild_core", "autobuild_drivers"];

/// Filter used when `RUST_LOG` is not set: `level` for autobuild itself,
/// warnings only for the HTTP stack and other dependencies.
pub fn default_filter(level: Level) -> String {
    std::iter::once("warn".to_string())
        .chain(OWN_TARGETS.iter().map(|t| format!("{t}={level}")))
        .collect::<Vec<_>>()
        .join(",")
}

/// Install the global subscriber. Returns `false` if one was already set.
pub fn init_tracing(json: bool, level: Level) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(level)));

    let (json_layer, text_layer) = if json {
        (Some(fmt::layer().json().with_writer(std::io::stderr)), None)
    } else {
        (None, Some(fmt::layer().with_target(false).with_writer(std::io::stderr)))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(text_layer)
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_quiets_dependencies() {
        assert_eq!(
            default_filter(Level::DEBUG),
            "warn,autobuild=DEBUG,autobuild_core=DEBUG,autobuild_drivers=DEBUG"
        );
    }
}
