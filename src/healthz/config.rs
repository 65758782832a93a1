//! # Coordinator configuration.
//!
//! [`HealthzConfig`] holds the front door listen address, the shutdown grace
//! period, panic recovery, and the headers stamped onto every response.
//!
//! # Example
//! ```rust
//! use std::time::Duration;
//! use hostvisor::HealthzConfig;
//!
//! let mut cfg = HealthzConfig::default();
//! cfg.bind_addr = "127.0.0.1:0".into();
//! cfg.grace = Duration::from_secs(5);
//!
//! assert!(cfg.recover_panics);
//! assert!(cfg.default_headers.is_empty());
//! ```

use std::sync::Arc;
use std::time::Duration;

use axum::http::HeaderMap;

/// Listen address used when none is configured.
pub const DEFAULT_HEALTHZ_BIND_ADDR: &str = "127.0.0.1:8081";

/// Upper bound on how long [`Healthz::shutdown`](crate::Healthz::shutdown) waits
/// for a final probe or the hosted process to exit.
pub const DEFAULT_SHUTDOWN_GRACE_PERIOD: Duration = Duration::from_secs(30);

/// Shutdown coordinator configuration.
///
/// Captured when the coordinator is built; later changes have no effect.
#[derive(Clone, Debug)]
pub struct HealthzConfig {
    /// Component name used in logs and events.
    pub name: Arc<str>,
    /// Front door listen address (`host:port`; port `0` picks a free port).
    pub bind_addr: String,
    /// Maximum time `shutdown()` waits before tearing everything down.
    pub grace: Duration,
    /// Convert handler panics into `500` responses instead of dropping the connection.
    pub recover_panics: bool,
    /// Headers set on every response; they override same-named route headers.
    pub default_headers: HeaderMap,
}

impl Default for HealthzConfig {
    fn default() -> Self {
        Self {
            name: Arc::from("healthz"),
            bind_addr: DEFAULT_HEALTHZ_BIND_ADDR.to_string(),
            grace: DEFAULT_SHUTDOWN_GRACE_PERIOD,
            recover_panics: true,
            default_headers: HeaderMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = HealthzConfig::default();
        assert_eq!(cfg.bind_addr, DEFAULT_HEALTHZ_BIND_ADDR);
        assert_eq!(cfg.grace, DEFAULT_SHUTDOWN_GRACE_PERIOD);
        assert!(cfg.recover_panics);
        assert_eq!(&*cfg.name, "healthz");
    }
}
