//! Runtime events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to
//! publish/subscribe to runtime events emitted by batches, workers, the
//! healthz coordinator and subscriber workers.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`, plus the process-wide default
//!
//! ## Quick reference
//! - **Publishers**: `Batch`, batch workers, `Healthz`, `FrontDoor`,
//!   `SubscriberSet` workers (overflow/panic).
//! - **Consumers**: `SubscriberSet` listener (fans out to [`Subscribe`](crate::Subscribe)
//!   implementations), tests.

mod bus;
mod event;

pub use bus::{Bus, DEFAULT_BUS_CAPACITY};
pub use event::{Event, EventKind};
