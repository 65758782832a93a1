//! # Function-backed hosted process (`HostedFn`)
//!
//! [`HostedFn`] wraps a closure `F: Fn(CancellationToken) -> Fut` and turns it
//! into a [`Hosted`] process:
//!
//! ```text
//! start()    ─► latch Starting → Started ─► f(token).await ─► latch Stopping → Stopped
//! shutdown() ─► token.cancel() ─► wait for latch Stopped
//! ```
//!
//! The closure returning on its own (success or error) is an exit: the latch
//! reaches `Stopped` and [`notify_shutdown`](Hosted::notify_shutdown) fires.
//! The closure should watch its token and return promptly once cancelled.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use tokio_util::sync::CancellationToken;
//! use hostvisor::{Hosted, HostedFn};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let app = HostedFn::arc("ticker", |ctx: CancellationToken| async move {
//!     while !ctx.is_cancelled() {
//!         tokio::time::sleep(Duration::from_millis(5)).await;
//!     }
//!     Ok::<(), hostvisor::BoxError>(())
//! });
//!
//! let runner = tokio::spawn({
//!     let app = app.clone();
//!     async move { app.start().await }
//! });
//! app.latch().notify_started().wait().await;
//! assert!(app.is_running());
//!
//! app.shutdown().await.unwrap();
//! assert!(!app.is_running());
//! runner.await.unwrap().unwrap();
//! # }
//! ```

use std::borrow::Cow;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::BoxError;
use crate::hosted::Hosted;
use crate::lifecycle::{Latch, Signal};

/// Closure-backed hosted process.
pub struct HostedFn<F> {
    name: Cow<'static, str>,
    f: F,
    latch: Latch,
    token: Mutex<CancellationToken>,
}

impl<F> HostedFn<F> {
    /// Creates a new hosted process from a closure.
    pub fn new(name: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
            latch: Latch::new(),
            token: Mutex::new(CancellationToken::new()),
        }
    }

    /// Creates the process and returns it as a shared handle.
    pub fn arc(name: impl Into<Cow<'static, str>>, f: F) -> Arc<Self> {
        Arc::new(Self::new(name, f))
    }

    /// Name given at construction.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The process latch.
    pub fn latch(&self) -> &Latch {
        &self.latch
    }

}

#[async_trait]
impl<F, Fut> Hosted for HostedFn<F>
where
    F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
{
    async fn start(&self) -> Result<(), BoxError> {
        // The cycle opens and its token is installed under one lock, so a
        // concurrent shutdown always cancels the token this run receives.
        let token = {
            let mut slot = self.token.lock().unwrap_or_else(PoisonError::into_inner);
            if !self.latch.starting() {
                return Err(format!("hosted process '{}' is already running", self.name).into());
            }
            *slot = CancellationToken::new();
            slot.clone()
        };
        self.latch.started();

        let res = (self.f)(token).await;

        self.latch.stopping();
        self.latch.stopped();
        res
    }

    async fn shutdown(&self) -> Result<(), BoxError> {
        let stopped = {
            let slot = self.token.lock().unwrap_or_else(PoisonError::into_inner);
            if self.latch.is_idle() {
                return Ok(());
            }
            slot.cancel();
            self.latch.notify_stopped()
        };
        stopped.wait().await;
        Ok(())
    }

    fn is_running(&self) -> bool {
        self.latch.is_running()
    }

    fn notify_shutdown(&self) -> Signal {
        self.latch.notify_stopped()
    }
}
