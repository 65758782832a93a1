//! # hostvisor
//!
//! **Hostvisor** is a small set of lifecycle primitives for tokio services:
//!
//! - a [`Latch`], a five-phase lifecycle state machine with broadcast
//!   notifications for each transition;
//! - a [`Batch`], a fixed-size worker pool that pushes a finite (or streamed)
//!   set of items through an async action;
//! - a [`Healthz`] coordinator, which hosts a long-running process next to a
//!   `/healthz` HTTP endpoint and shuts both down gracefully.
//!
//! ## Architecture
//! ### Shutdown coordinator
//! ```text
//!                 ┌──────────────────────────────────────────────┐
//!   GET /healthz  │  Healthz                                     │
//!  ─────────────► │  ┌───────────┐  answers from  ┌───────────┐  │
//!                 │  │ FrontDoor │ ─────────────► │  Latch    │  │
//!                 │  │  (axum)   │                │ (coord.)  │  │
//!                 │  └───────────┘                └───────────┘  │
//!                 │        │ is_running()               ▲        │
//!                 │        ▼                            │        │
//!                 │  ┌─────────────────┐    shutdown() ─┘        │
//!                 │  │ Hosted process  │    Stopping → race:     │
//!                 │  │ (your service)  │     - hosted exited     │
//!                 │  └─────────────────┘     - final probe       │
//!                 │                          - grace expired     │
//!                 └──────────────────────────────────────────────┘
//! ```
//!
//! ### Worker pool
//! ```text
//!  items ──► dispatcher ──► ready queue (capacity = workers)
//!                 │              ▲
//!                 │  pop worker  │ worker pushes itself back
//!                 ▼              │ after every item
//!            worker #n ──► action(item) ──► Err ──► error sink
//! ```
//!
//! ## Features
//! | Area              | Description                                                   | Key types / traits                          |
//! |-------------------|---------------------------------------------------------------|---------------------------------------------|
//! | **Lifecycle**     | Five-phase latch with per-cycle broadcast signals.            | [`Latch`], [`Phase`], [`Signal`]            |
//! | **Worker pool**   | Bounded-concurrency processing of items with an error sink.   | [`Batch`], [`BatchConfig`], [`ActionFn`]    |
//! | **Hosting**       | Start/stop capability of supervised processes.                | [`Hosted`], [`HostedFn`]                    |
//! | **Coordinator**   | `/healthz` front door and three-way graceful shutdown.        | [`Healthz`], [`HealthzConfig`]              |
//! | **Subscriber API**| Hook into runtime events (logging, metrics, custom).          | [`Subscribe`], [`SubscriberSet`], [`Bus`]   |
//! | **Errors**        | Typed errors for coordination and per-item work.              | [`HealthzError`], [`WorkError`]             |
//!
//! ## Optional features
//! - `logging`: exports the built-in [`LogWriter`] subscriber.
//!
//! ## Example
//! ```rust
//! use hostvisor::{Batch, WorkError};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let (tx, mut rx) = tokio::sync::mpsc::channel(16);
//!     let report = Batch::new(
//!         |n: u32| async move {
//!             if n % 2 == 0 { Ok(()) } else { Err(WorkError::fail(format!("{n} is odd"))) }
//!         },
//!         vec![1, 2, 3, 4],
//!     )
//!     .with_num_workers(2)
//!     .with_errors(tx)
//!     .process()
//!     .await;
//!
//!     assert_eq!(report.delivered, 4);
//!     let mut errors = Vec::new();
//!     while let Ok(err) = rx.try_recv() {
//!         errors.push(err.to_string());
//!     }
//!     errors.sort();
//!     assert_eq!(errors, ["work item failed: 1 is odd", "work item failed: 3 is odd"]);
//! }
//! ```
mod core;
mod error;
mod events;
mod healthz;
mod hosted;
mod lifecycle;
pub mod logging;
mod pool;
mod subscribers;

// ---- Public re-exports ----

pub use crate::core::{
    ShutdownSignal, first_to_finish, run_to_error, run_until_signal, wait_for_shutdown_signal,
};
pub use error::{BoxError, HealthzError, WorkError};
pub use events::{Bus, DEFAULT_BUS_CAPACITY, Event, EventKind};
pub use healthz::{
    DEFAULT_HEALTHZ_BIND_ADDR, DEFAULT_SHUTDOWN_GRACE_PERIOD, FrontDoor, Healthz, HealthzBuilder,
    HealthzConfig,
};
pub use hosted::{Hosted, HostedFn, HostedRef};
pub use lifecycle::{Latch, Phase, Signal};
pub use pool::{
    Action, ActionFn, ActionRef, Batch, BatchConfig, BatchReport, BatchStop, BoxWorkFuture,
    default_workers,
};
pub use subscribers::{Subscribe, SubscriberSet};

// Optional: expose the built-in logger subscriber.
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
