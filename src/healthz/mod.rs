//! # Shutdown coordinator with a `/healthz` front door.
//!
//! - [`Healthz`]: runs a hosted process next to an HTTP health endpoint and
//!   shuts both down gracefully
//! - [`HealthzBuilder`]: builder for [`Healthz`]
//! - [`HealthzConfig`]: bind address, grace period, panic recovery, default headers
//! - [`FrontDoor`]: the embedded HTTP server

mod builder;
mod config;
mod coordinator;
mod front_door;
mod handler;

pub use builder::HealthzBuilder;
pub use config::{DEFAULT_HEALTHZ_BIND_ADDR, DEFAULT_SHUTDOWN_GRACE_PERIOD, HealthzConfig};
pub use coordinator::Healthz;
pub use front_door::FrontDoor;
