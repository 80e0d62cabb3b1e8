//! Logging setup for the muz binary.
//!
//! # Environment Variables
//!
//! - `MUZ_DEBUG=true|1|yes` - Enable debug logging
//! - `MUZ_LOG_LEVEL=trace|debug|info|warn|error` - Set specific log level
//! - `MUZ_LOG_FORMAT=json|pretty|compact` - Set output format (default: compact)
//!
//! `-v` flags on the command line raise the level further.

use std::env;

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Check if debug logging is enabled via `MUZ_DEBUG`.
pub fn is_debug_enabled() -> bool {
    env::var("MUZ_DEBUG")
        .map(|v| matches!(v.to_lowercase().as_str(), "true" | "1" | "yes"))
        .unwrap_or(false)
}

fn parse_level(level: &str) -> Option<&'static str> {
    match level.to_lowercase().as_str() {
        "trace" => Some("trace"),
        "debug" => Some("debug"),
        "info" => Some("info"),
        "warn" => Some("warn"),
        "error" => Some("error"),
        _ => None,
    }
}

/// Resolve the log level from the environment and the `-v` count.
///
/// The more verbose of the two wins. Defaults to "warn".
pub fn log_level(verbose: u8) -> &'static str {
    let from_env = env::var("MUZ_LOG_LEVEL")
        .ok()
        .and_then(|l| parse_level(&l))
        .unwrap_or(if is_debug_enabled() { "debug" } else { "warn" });

    let from_flags = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    if rank(from_flags) > rank(from_env) {
        from_flags
    } else {
        from_env
    }
}

fn rank(level: &str) -> u8 {
    match level {
        "error" => 0,
        "warn" => 1,
        "info" => 2,
        "debug" => 3,
        _ => 4,
    }
}

/// Get the configured log format from `MUZ_LOG_FORMAT`.
pub fn log_format() -> &'static str {
    env::var("MUZ_LOG_FORMAT")
        .map(|f| match f.to_lowercase().as_str() {
            "json" => "json",
            "pretty" => "pretty",
            _ => "compact",
        })
        .unwrap_or("compact")
}

/// Install the global subscriber. Logs go to stderr so command output stays clean.
pub fn init(verbose: u8) {
    let level = log_level(verbose);
    let filter = EnvFilter::try_new(format!(
        "muz={level},muz_cli={level},muz_migrate={level},muz_postgres={level},muz_sqlite={level}"
    ))
    .unwrap_or_else(|_| EnvFilter::new("warn"));

    let registry = tracing_subscriber::registry().with(filter);
    let result = match log_format() {
        "json" => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init(),
        "pretty" => registry
            .with(fmt::layer().pretty().with_writer(std::io::stderr))
            .try_init(),
        _ => registry
            .with(fmt::layer().compact().with_writer(std::io::stderr))
            .try_init(),
    };

    if result.is_ok() {
        tracing::debug!(level = level, format = log_format(), "muz logging initialized");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("DEBUG"), Some("debug"));
        assert_eq!(parse_level("loud"), None);
    }

    #[test]
    fn test_rank_ordering() {
        assert!(rank("trace") > rank("debug"));
        assert!(rank("info") > rank("warn"));
        assert!(rank("warn") > rank("error"));
    }
}
