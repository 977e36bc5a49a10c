//! Shared tracing/logging initialization.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::error::{Error, Result};

/// Targets covered by the configured `server.log_level`.
const TARGETS: [&str; 3] = ["tierlock_server", "tierlock_core", "tower_http"];

/// Filter directives applying `level` to every Tierlock target.
pub fn default_filter(level: &str) -> String {
    TARGETS
        .iter()
        .map(|target| format!("{target}={level}"))
        .collect::<Vec<_>>()
        .join(",")
}

/// Build the filter: `RUST_LOG` when set, otherwise `level` for Tierlock
/// targets. An unparseable level is a config error.
pub fn build_filter(level: &str) -> Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(default_filter(level))
        .map_err(|e| Error::Config(format!("Invalid log level {level:?}: {e}")))
}

/// Install the global subscriber, as text or as JSON lines.
pub fn init_tracing(level: &str, log_json: bool) -> Result<()> {
    let filter = build_filter(level)?;
    let text = (!log_json).then(tracing_subscriber::fmt::layer);
    let json = log_json.then(|| tracing_subscriber::fmt::layer().json());

    tracing_subscriber::registry()
        .with(filter)
        .with(text)
        .with(json)
        .init();
    Ok(())
}

#[cfg(test)]
#[allow(clippy::panic, clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn filter_covers_all_targets() {
        assert_eq!(
            default_filter("debug"),
            "tierlock_server=debug,tierlock_core=debug,tower_http=debug"
        );
    }

    #[test]
    fn configured_level_parses() {
        assert!(EnvFilter::try_new(default_filter("warn")).is_ok());
    }

    #[test]
    fn garbage_level_is_rejected() {
        assert!(EnvFilter::try_new(default_filter("very loud")).is_err());
    }
}
