//! Logging setup using `tracing` + `tracing-subscriber`.
//!
//! Priority for determining the filter:
//! 1. the `level` argument (if provided)
//! 2. `HOSTVISOR_LOG` environment variable (e.g. "debug", "hostvisor=trace")
//! 3. default to `info`
//!
//! Records go to stderr, so stdout stays free for the hosted process.

use tracing_subscriber::EnvFilter;

use crate::error::BoxError;

/// Environment variable consulted when no level is passed to [`init`].
pub const LOG_ENV: &str = "HOSTVISOR_LOG";

/// Installs the global `tracing` subscriber.
///
/// Returns an error if a global subscriber is already installed or the
/// filter directive does not parse.
pub fn init(level: Option<tracing::Level>) -> Result<(), BoxError> {
    let filter = match level {
        Some(lvl) => EnvFilter::new(lvl.as_str().to_lowercase()),
        None => match std::env::var(LOG_ENV) {
            Ok(directives) => EnvFilter::try_new(directives)?,
            Err(_) => EnvFilter::new("info"),
        },
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .try_init()
}

/// Parses a level name as accepted by `--log-level` style flags.
pub fn parse_level(s: &str) -> Option<tracing::Level> {
    match s.trim().to_lowercase().as_str() {
        "error" => Some(tracing::Level::ERROR),
        "warn" | "warning" => Some(tracing::Level::WARN),
        "info" => Some(tracing::Level::INFO),
        "debug" => Some(tracing::Level::DEBUG),
        "trace" => Some(tracing::Level::TRACE),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level(" Debug "), Some(tracing::Level::DEBUG));
        assert_eq!(parse_level("warning"), Some(tracing::Level::WARN));
        assert_eq!(parse_level("loud"), None);
    }
}
