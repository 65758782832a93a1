//! # LogWriter: renders events as `tracing` records
//!
//! A minimal subscriber that turns incoming [`Event`]s into structured log
//! lines. Install a `tracing` subscriber (see [`crate::logging::init`]) to see them.
//!
//! ## Example output
//! ```text
//! INFO  hostvisor::events: shutdown-requested component="healthz" grace_ms=30000
//! WARN  hostvisor::events: grace-expired component="healthz" grace_ms=30000
//! WARN  hostvisor::events: item-failed component="batch" worker=3 err="disk full"
//! ERROR hostvisor::events: handler-panicked component="healthz" route="/healthz" info="boom"
//! ```

use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let component = e.component.as_deref().unwrap_or("-");
        match e.kind {
            EventKind::ShutdownRequested => {
                info!(target: "hostvisor::events", component, grace_ms = ?e.grace_ms, "shutdown-requested");
            }
            EventKind::HostedExited => {
                info!(target: "hostvisor::events", component, "hosted-exited");
            }
            EventKind::GraceExpired => {
                warn!(target: "hostvisor::events", component, grace_ms = ?e.grace_ms, "grace-expired");
            }
            EventKind::FinalProbe => {
                info!(target: "hostvisor::events", component, "final-probe");
            }
            EventKind::ProbeServed => {
                debug!(
                    target: "hostvisor::events",
                    component,
                    route = ?e.route,
                    status = ?e.status,
                    elapsed_ms = ?e.elapsed_ms,
                    "probe-served"
                );
            }
            EventKind::HandlerPanicked => {
                error!(target: "hostvisor::events", component, route = ?e.route, info = ?e.reason, "handler-panicked");
            }
            EventKind::FrontDoorListening => {
                info!(target: "hostvisor::events", component, addr = ?e.addr, "front-door-listening");
            }
            EventKind::FrontDoorStopped => {
                info!(target: "hostvisor::events", component, addr = ?e.addr, "front-door-stopped");
            }
            EventKind::WorkerStarted => {
                debug!(target: "hostvisor::events", component, worker = ?e.worker, "worker-started");
            }
            EventKind::WorkerStopped => {
                debug!(target: "hostvisor::events", component, worker = ?e.worker, processed = ?e.count, "worker-stopped");
            }
            EventKind::ItemFailed => {
                warn!(target: "hostvisor::events", component, worker = ?e.worker, err = ?e.reason, "item-failed");
            }
            EventKind::WorkerPanicked => {
                error!(target: "hostvisor::events", component, worker = ?e.worker, info = ?e.reason, "worker-panicked");
            }
            EventKind::ItemsDropped => {
                warn!(target: "hostvisor::events", component, dropped = ?e.count, "items-dropped");
            }
            EventKind::BatchCompleted => {
                info!(target: "hostvisor::events", component, delivered = ?e.count, "batch-completed");
            }
            EventKind::SubscriberOverflow => {
                warn!(target: "hostvisor::events", subscriber = component, reason = ?e.reason, "subscriber-overflow");
            }
            EventKind::SubscriberPanicked => {
                error!(target: "hostvisor::events", subscriber = component, info = ?e.reason, "subscriber-panicked");
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
