//! # Outermost entry point: run a hosted process until a signal arrives.
//!
//! [`run_until_signal`] starts a [`Hosted`] process on its own task and waits
//! for whichever comes first:
//!
//! - a termination signal (see [`wait_for_shutdown_signal`]), or
//! - `start()` returning on its own.
//!
//! Either way it then calls `shutdown()` and returns the combined outcome.
//!
//! ## Example
//! ```rust,no_run
//! use tokio_util::sync::CancellationToken;
//! use hostvisor::{Healthz, HostedFn, run_until_signal};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), hostvisor::BoxError> {
//!     let app = HostedFn::arc("app", |ctx: CancellationToken| async move {
//!         ctx.cancelled().await;
//!         Ok::<(), hostvisor::BoxError>(())
//!     });
//!     let hz = Healthz::builder(app).build_arc();
//!     run_until_signal(hz).await
//! }
//! ```

use std::sync::Arc;

use tracing::{info, warn};

use crate::core::shutdown::wait_for_shutdown_signal;
use crate::error::BoxError;
use crate::hosted::Hosted;

/// Starts `svc`, waits for a termination signal or for it to exit, then shuts it down.
///
/// If signal registration fails, only the exit of `start()` ends the wait.
pub async fn run_until_signal<S: Hosted + ?Sized>(svc: Arc<S>) -> Result<(), BoxError> {
    let mut runner = tokio::spawn({
        let svc = Arc::clone(&svc);
        async move { svc.start().await }
    });

    let signal = async {
        match wait_for_shutdown_signal().await {
            Ok(sig) => sig,
            Err(e) => {
                warn!(error = %e, "failed to register shutdown signals");
                std::future::pending().await
            }
        }
    };

    tokio::select! {
        sig = signal => {
            info!(signal = %sig, "shutdown signal received");
            svc.shutdown().await?;
            runner.await?
        }
        res = &mut runner => {
            let started = res.map_err(BoxError::from).and_then(|r| r);
            let stopped = svc.shutdown().await;
            started.and(stopped)
        }
    }
}
