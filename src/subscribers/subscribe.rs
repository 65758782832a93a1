//! # Subscriber trait.
//!
//! [`Subscribe`] is how code outside the crate observes batches, workers and
//! the healthz coordinator. A [`SubscriberSet`](crate::SubscriberSet) gives
//! every subscriber its own bounded queue and worker task, so a subscriber
//! that is slow, or that panics, only ever hurts itself.
//!
//! A subscriber can narrow what it receives with [`Subscribe::accepts`];
//! rejected kinds are never queued for it and never count toward overflow.
//!
//! ## Example
//! ```rust
//! use hostvisor::{Event, EventKind, Subscribe};
//!
//! struct ShutdownAudit;
//!
//! #[async_trait::async_trait]
//! impl Subscribe for ShutdownAudit {
//!     async fn on_event(&self, ev: &Event) {
//!         if ev.kind == EventKind::GraceExpired {
//!             // page someone
//!         }
//!     }
//!
//!     fn accepts(&self, kind: EventKind) -> bool {
//!         matches!(
//!             kind,
//!             EventKind::ShutdownRequested
//!                 | EventKind::HostedExited
//!                 | EventKind::GraceExpired
//!                 | EventKind::FinalProbe
//!         )
//!     }
//!
//!     fn name(&self) -> &'static str { "shutdown-audit" }
//! }
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind};

/// Observer of runtime events.
///
/// `on_event` runs on the subscriber's own worker task, one event at a time,
/// in publish order.
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    /// Handles one event.
    async fn on_event(&self, event: &Event);

    /// Whether events of `kind` should be delivered at all. Defaults to every kind.
    fn accepts(&self, kind: EventKind) -> bool {
        let _ = kind;
        true
    }

    /// Name used in overflow and panic events.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Capacity of this subscriber's queue.
    fn queue_capacity(&self) -> usize {
        1024
    }
}
