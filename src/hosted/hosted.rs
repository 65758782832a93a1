//! # Hosted process capability.
//!
//! A [`Hosted`] process is a long-running unit whose lifecycle someone else
//! orchestrates: it can be started, asked to shut down, queried for liveness,
//! and it announces when it has gone away.
//!
//! ## Contract
//! - `start()` runs the process and returns when it exits (cleanly or not).
//! - `shutdown()` asks it to exit and returns once it has.
//! - `is_running()` is an instantaneous, cheap query.
//! - `notify_shutdown()` fires when the process has stopped, whether it was
//!   asked to or exited on its own; it is level-triggered, so a process that
//!   already stopped returns a fired signal.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::BoxError;
use crate::lifecycle::Signal;

/// Shared handle to a hosted process.
pub type HostedRef = Arc<dyn Hosted>;

/// Start/stop capability of a supervised long-running process.
#[async_trait]
pub trait Hosted: Send + Sync + 'static {
    /// Runs the process until it exits.
    async fn start(&self) -> Result<(), BoxError>;

    /// Asks the process to exit and waits until it has.
    async fn shutdown(&self) -> Result<(), BoxError>;

    /// True while the process is serving.
    fn is_running(&self) -> bool;

    /// Fires once the process has stopped.
    fn notify_shutdown(&self) -> Signal;
}

#[async_trait]
impl<H: Hosted + ?Sized> Hosted for Arc<H> {
    async fn start(&self) -> Result<(), BoxError> {
        (**self).start().await
    }

    async fn shutdown(&self) -> Result<(), BoxError> {
        (**self).shutdown().await
    }

    fn is_running(&self) -> bool {
        (**self).is_running()
    }

    fn notify_shutdown(&self) -> Signal {
        (**self).notify_shutdown()
    }
}
