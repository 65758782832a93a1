//! Lifecycle primitives: the five-phase [`Latch`] and its broadcast [`Signal`].
//!
//! ## Contents
//! - [`Latch`] idle → starting → started → stopping → stopped state machine
//! - [`Phase`] the phase a latch is in
//! - [`Signal`] read-only, level-triggered notification of one transition
//!
//! Every long-lived component in the crate ([`Batch`](crate::Batch), its
//! workers, [`Healthz`](crate::Healthz), its front door and
//! [`HostedFn`](crate::HostedFn)) owns one latch and drives it from its own
//! control operations.

mod latch;
mod signal;

pub use latch::{Latch, Phase};
pub use signal::Signal;
