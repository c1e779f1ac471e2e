//! Logging setup using `tracing` and `tracing-subscriber`.
//!
//! Log lines go to stderr so stdout stays clean for JSON output.
//! `RUST_LOG` overrides the level chosen from the command line.

use std::io;

use tracing::Level;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Configuration for logging behavior.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Level for chronomerge crates.
    pub level: Level,
    /// Whether to include the module path in log lines.
    pub with_target: bool,
    /// Whether to use ANSI colors.
    pub with_ansi: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::WARN,
            with_target: false,
            with_ansi: true,
        }
    }
}

impl LogConfig {
    /// Warnings only by default, debug detail with `--verbose`.
    #[must_use]
    pub fn from_verbose(verbose: bool) -> Self {
        Self {
            level: if verbose { Level::DEBUG } else { Level::WARN },
            with_target: verbose,
            ..Default::default()
        }
    }
}

/// Install the global subscriber. Call once at startup.
pub fn init_logging(config: &LogConfig) {
    let layer = fmt::layer()
        .with_writer(io::stderr)
        .with_ansi(config.with_ansi)
        .with_target(config.with_target)
        .without_time();

    tracing_subscriber::registry()
        .with(build_env_filter(config.level))
        .with(layer)
        .init();
}

fn build_env_filter(level: Level) -> EnvFilter {
    let level = level.as_str().to_lowercase();
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        // other crates stay at warn
        EnvFilter::new(format!(
            "warn,chronomerge={level},chronomerge_cli={level}",
            level = level
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbose_raises_level() {
        assert_eq!(LogConfig::from_verbose(false).level, Level::WARN);
        assert_eq!(LogConfig::from_verbose(true).level, Level::DEBUG);
    }
}
