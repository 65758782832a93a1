use std::sync::Arc;
use std::time::Duration;

use axum::http::{HeaderName, HeaderValue};

use crate::events::Bus;
use crate::healthz::{Healthz, HealthzConfig};
use crate::hosted::Hosted;

/// Builder for constructing a [`Healthz`] coordinator.
pub struct HealthzBuilder<H: Hosted + ?Sized> {
    hosted: Arc<H>,
    cfg: HealthzConfig,
    bus: Option<Bus>,
}

impl<H: Hosted + ?Sized> HealthzBuilder<H> {
    /// Creates a builder around `hosted` with default configuration.
    pub fn new(hosted: Arc<H>) -> Self {
        Self {
            hosted,
            cfg: HealthzConfig::default(),
            bus: None,
        }
    }

    /// Replaces the whole configuration.
    pub fn with_config(mut self, cfg: HealthzConfig) -> Self {
        self.cfg = cfg;
        self
    }

    /// Sets the component name used in logs and events.
    pub fn with_name(mut self, name: impl Into<Arc<str>>) -> Self {
        self.cfg.name = name.into();
        self
    }

    /// Sets the front door listen address.
    pub fn with_bind_addr(mut self, addr: impl Into<String>) -> Self {
        self.cfg.bind_addr = addr.into();
        self
    }

    /// Sets the shutdown grace period.
    pub fn with_grace_period(mut self, grace: Duration) -> Self {
        self.cfg.grace = grace;
        self
    }

    /// Sets whether handler panics become `500` responses.
    pub fn with_recover_panics(mut self, recover: bool) -> Self {
        self.cfg.recover_panics = recover;
        self
    }

    /// Adds a header set on every response.
    pub fn with_default_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.cfg.default_headers.insert(name, value);
        self
    }

    /// Publishes events on `bus` instead of the process-wide default.
    pub fn with_bus(mut self, bus: Bus) -> Self {
        self.bus = Some(bus);
        self
    }

    /// Builds the coordinator.
    pub fn build(self) -> Healthz<H> {
        let bus = self.bus.unwrap_or_else(Bus::global);
        Healthz::with_parts(self.hosted, self.cfg, bus)
    }

    /// Builds the coordinator behind an [`Arc`], ready to share with a runner task.
    pub fn build_arc(self) -> Arc<Healthz<H>> {
        Arc::new(self.build())
    }
}
