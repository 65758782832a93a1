//! # Event bus for broadcasting runtime events.
//!
//! [`Bus`] is a thin wrapper around [`tokio::sync::broadcast`] that provides
//! non-blocking event publishing from multiple sources (batches, workers,
//! the healthz coordinator and its front door).
//!
//! ## Architecture
//! ```text
//! Publishers (many):                 Subscribers:
//!   Batch    ──┐
//!   Worker N ──┼──────► Bus ───────► SubscriberSet listener ────► Subscribe impls
//!   Healthz  ──┤  (broadcast chan)
//!   FrontDoor──┘
//! ```
//!
//! ## Rules
//! - **Non-blocking publish**: `publish()` never blocks; it calls `broadcast::Sender::send`.
//! - **Bounded capacity**: a single ring buffer stores recent events for all receivers.
//! - **Lag handling**: slow receivers get `RecvError::Lagged(n)` and skip `n` oldest items.
//! - **No persistence**: events are lost if there are no active subscribers at send time.
//!
//! ## Process-wide default
//! [`Bus::global`] returns a lazily created, process-wide bus; it is initialised
//! once on first use and can be replaced with [`Bus::set_global`]. Components use it
//! only when no bus was passed explicitly, so prefer wiring a bus at the outermost
//! entry point and handing it down.

use std::sync::{PoisonError, RwLock};

use tokio::sync::broadcast;

use super::event::Event;

/// Default capacity of the broadcast ring buffer.
pub const DEFAULT_BUS_CAPACITY: usize = 1024;

static GLOBAL: RwLock<Option<Bus>> = RwLock::new(None);

/// Broadcast channel for runtime events.
///
/// ### Properties
/// - **Non-blocking**: `publish()` returns immediately (send clones internally).
/// - **Fire-and-forget**: no delivery or durability guarantees.
/// - **Cloneable**: cheap to clone (internally holds an `Arc`-backed sender).
#[derive(Clone, Debug)]
pub struct Bus {
    tx: broadcast::Sender<Event>,
}

impl Bus {
    /// Creates a new bus with the given channel capacity.
    ///
    /// The minimum capacity is 1 (clamped).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (tx, _rx) = broadcast::channel::<Event>(capacity);
        Self { tx }
    }

    /// Returns the process-wide bus, creating it on first use.
    pub fn global() -> Bus {
        if let Some(bus) = GLOBAL
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
        {
            return bus.clone();
        }
        GLOBAL
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .get_or_insert_with(|| Bus::new(DEFAULT_BUS_CAPACITY))
            .clone()
    }

    /// Replaces the process-wide bus.
    ///
    /// Components created earlier keep the bus they were given.
    pub fn set_global(bus: Bus) {
        *GLOBAL.write().unwrap_or_else(PoisonError::into_inner) = Some(bus);
    }

    /// Publishes an event to all active subscribers.
    ///
    /// If there are no receivers, the event is dropped.
    pub fn publish(&self, ev: Event) {
        let _ = self.tx.send(ev);
    }

    /// Creates a new receiver that will observe subsequent events.
    ///
    /// - Each call creates an **independent** receiver.
    /// - A receiver only gets events **sent after** it subscribes.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }

    /// True if both handles publish into the same channel.
    pub fn same_channel(&self, other: &Bus) -> bool {
        self.tx.same_channel(&other.tx)
    }
}

impl Default for Bus {
    fn default() -> Self {
        Self::new(DEFAULT_BUS_CAPACITY)
    }
}
