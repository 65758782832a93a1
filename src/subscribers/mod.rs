//! # Event subscribers for the hostvisor runtime.
//!
//! This module provides the [`Subscribe`] trait, the [`SubscriberSet`] fan-out
//! and (with the `logging` feature) the built-in `LogWriter`.
//!
//! ## Architecture
//! ```text
//! Event flow:
//!   Batch / Healthz ── publish(Event) ──► Bus ──► SubscriberSet listener
//!                                                       │
//!                                            ┌──────────┼──────────┐
//!                                            ▼          ▼          ▼
//!                                        LogWriter   Metrics    Custom
//! ```

#[cfg(feature = "logging")]
mod log;
mod set;
mod subscribe;

#[cfg(feature = "logging")]
pub use log::LogWriter;
pub use set::SubscriberSet;
pub use subscribe::Subscribe;
