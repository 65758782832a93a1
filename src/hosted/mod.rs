//! # Hosted processes
//!
//! This module defines the [`Hosted`] capability (start, shutdown, liveness,
//! exit notification) and a convenient closure-backed implementation
//! [`HostedFn`]. [`Healthz`](crate::Healthz) implements `Hosted` too, so
//! coordinators nest.

mod hosted;
mod hosted_fn;

pub use hosted::{Hosted, HostedRef};
pub use hosted_fn::HostedFn;
