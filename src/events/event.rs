//! # Runtime events emitted by batches, workers and the healthz coordinator.
//!
//! The [`EventKind`] enum classifies event types across four categories:
//! - **Batch events**: worker start/stop, per-item failures, dropped items
//! - **Shutdown events**: which branch of the shutdown race fired
//! - **Front door events**: probes served, handler panics, listener state
//! - **Subscriber events**: panics and overflow inside subscriber workers
//!
//! The [`Event`] struct carries additional metadata such as timestamps,
//! the emitting component, reasons and counters.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! Use `seq` to restore the exact order when events are delivered out of order.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use hostvisor::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::GraceExpired)
//!     .with_component("healthz")
//!     .with_grace(Duration::from_secs(30));
//!
//! assert_eq!(ev.kind, EventKind::GraceExpired);
//! assert_eq!(ev.component.as_deref(), Some("healthz"));
//! assert_eq!(ev.grace_ms, Some(30_000));
//! ```

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Subscriber events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets:
    /// - `component`: subscriber name
    /// - `reason`: panic info/message
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets:
    /// - `component`: subscriber name
    /// - `reason`: reason string (e.g., "full", "closed")
    SubscriberOverflow,

    // === Batch events ===
    /// A batch worker entered its serving loop.
    ///
    /// Sets:
    /// - `component`: batch name
    /// - `worker`: worker index
    WorkerStarted,

    /// A batch worker left its serving loop.
    ///
    /// Sets:
    /// - `component`: batch name
    /// - `worker`: worker index
    /// - `count`: items processed by this worker
    WorkerStopped,

    /// An action returned an error for one item.
    ///
    /// Sets:
    /// - `component`: batch name
    /// - `worker`: worker index
    /// - `reason`: error message
    ItemFailed,

    /// An action panicked; the worker recovered.
    ///
    /// Sets:
    /// - `component`: batch name
    /// - `worker`: worker index
    /// - `reason`: panic info/message
    WorkerPanicked,

    /// The batch was stopped before every item was delivered.
    ///
    /// Sets:
    /// - `component`: batch name
    /// - `count`: number of undelivered items (streams: items still buffered)
    ItemsDropped,

    /// The batch finished: every worker drained and stopped.
    ///
    /// Sets:
    /// - `component`: batch name
    /// - `count`: number of delivered items
    BatchCompleted,

    // === Shutdown events ===
    /// Coordinator shutdown was requested.
    ///
    /// Sets:
    /// - `component`: coordinator name
    /// - `grace_ms`: configured grace period
    ShutdownRequested,

    /// The hosted process exited on its own before the grace period elapsed.
    ///
    /// Sets:
    /// - `component`: coordinator name
    HostedExited,

    /// The grace period elapsed before any other shutdown signal.
    ///
    /// Sets:
    /// - `component`: coordinator name
    /// - `grace_ms`: configured grace period
    GraceExpired,

    /// A final probe observed the shutdown and released the coordinator.
    ///
    /// Sets:
    /// - `component`: coordinator name
    FinalProbe,

    // === Front door events ===
    /// A request was answered by the front door.
    ///
    /// Sets:
    /// - `component`: coordinator name
    /// - `route`: lower-cased request path
    /// - `status`: HTTP status code
    /// - `elapsed_ms`: handling time
    ProbeServed,

    /// A request handler panicked and the panic was recovered into a 500.
    ///
    /// Sets:
    /// - `component`: coordinator name
    /// - `route`: lower-cased request path
    /// - `reason`: panic info/message
    HandlerPanicked,

    /// The front door is accepting connections.
    ///
    /// Sets:
    /// - `component`: coordinator name
    /// - `addr`: bound socket address
    FrontDoorListening,

    /// The front door stopped accepting connections.
    ///
    /// Sets:
    /// - `component`: coordinator name
    /// - `addr`: bound socket address
    FrontDoorStopped,
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Emitting component (batch name, coordinator name, subscriber name).
    pub component: Option<Arc<str>>,
    /// Worker index within a batch.
    pub worker: Option<u32>,
    /// Human-readable reason (errors, panic payloads, overflow details).
    pub reason: Option<Arc<str>>,
    /// Generic counter (items processed, dropped, delivered).
    pub count: Option<u64>,
    /// Shutdown grace period in milliseconds (compact).
    pub grace_ms: Option<u32>,
    /// HTTP status code of a served probe.
    pub status: Option<u16>,
    /// Lower-cased request path.
    pub route: Option<Arc<str>>,
    /// Handling time in milliseconds (compact).
    pub elapsed_ms: Option<u32>,
    /// Socket address of the front door.
    pub addr: Option<SocketAddr>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            component: None,
            worker: None,
            reason: None,
            count: None,
            grace_ms: None,
            status: None,
            route: None,
            elapsed_ms: None,
            addr: None,
        }
    }

    /// Attaches the emitting component name.
    #[inline]
    pub fn with_component(mut self, component: impl Into<Arc<str>>) -> Self {
        self.component = Some(component.into());
        self
    }

    /// Attaches a worker index.
    #[inline]
    pub fn with_worker(mut self, worker: usize) -> Self {
        self.worker = Some(u32::try_from(worker).unwrap_or(u32::MAX));
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches a counter.
    #[inline]
    pub fn with_count(mut self, count: u64) -> Self {
        self.count = Some(count);
        self
    }

    /// Attaches a grace period (stored as milliseconds).
    #[inline]
    pub fn with_grace(mut self, d: Duration) -> Self {
        self.grace_ms = Some(compact_ms(d));
        self
    }

    /// Attaches an HTTP status code.
    #[inline]
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// Attaches a request route.
    #[inline]
    pub fn with_route(mut self, route: impl Into<Arc<str>>) -> Self {
        self.route = Some(route.into());
        self
    }

    /// Attaches a handling time (stored as milliseconds).
    #[inline]
    pub fn with_elapsed(mut self, d: Duration) -> Self {
        self.elapsed_ms = Some(compact_ms(d));
        self
    }

    /// Attaches a socket address.
    #[inline]
    pub fn with_addr(mut self, addr: SocketAddr) -> Self {
        self.addr = Some(addr);
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_component(subscriber)
            .with_reason(format!("subscriber={subscriber} reason={reason}"))
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_component(subscriber)
            .with_reason(info)
    }
}

fn compact_ms(d: Duration) -> u32 {
    d.as_millis().min(u128::from(u32::MAX)) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence_is_monotonic() {
        let a = Event::new(EventKind::WorkerStarted);
        let b = Event::new(EventKind::WorkerStopped);
        assert!(b.seq > a.seq);
    }

    #[test]
    fn test_durations_saturate() {
        let ev = Event::new(EventKind::GraceExpired).with_grace(Duration::from_secs(u64::MAX));
        assert_eq!(ev.grace_ms, Some(u32::MAX));
    }
}
