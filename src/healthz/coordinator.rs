//! # Healthz: shutdown coordinator for a hosted process.
//!
//! [`Healthz`] puts a `/healthz` front door next to a [`Hosted`] process and
//! orchestrates a graceful shutdown between them, so that a load balancer or
//! orchestrator sees the process go unhealthy before it goes away.
//!
//! ## Start
//! ```text
//! start() ─► latch Starting → Started
//!        ─► run front door and hosted process concurrently
//!        ─► return the outcome of whichever exits first
//! ```
//!
//! ## Shutdown race
//! `shutdown()` moves the coordinator latch to `Stopping` (probes now answer
//! `500 Shutting down.`) and then waits for the first of:
//!
//! | Branch              | Meaning                                | Teardown                         |
//! |---------------------|----------------------------------------|----------------------------------|
//! | hosted exited       | hosted process already went away       | front door only                  |
//! | final probe         | a probe observed `Shutting down.`      | hosted + front door, concurrently |
//! | grace expired       | nothing happened within `grace`        | hosted + front door, concurrently |
//!
//! The losing branches are dropped. Only the first `shutdown()` call runs a
//! teardown; later callers wait for it and return `Ok(())`. When no probe can
//! ever arrive (`start()` never ran, or the front door failed to bind) the race
//! is skipped and both sides are shut down at once.
//!
//! ## Example
//! ```rust,no_run
//! use std::time::Duration;
//! use tokio_util::sync::CancellationToken;
//! use hostvisor::{Healthz, HostedFn};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), hostvisor::HealthzError> {
//! let app = HostedFn::arc("app", |ctx: CancellationToken| async move {
//!     ctx.cancelled().await;
//!     Ok::<(), hostvisor::BoxError>(())
//! });
//!
//! let hz = Healthz::builder(app)
//!     .with_bind_addr("0.0.0.0:8081")
//!     .with_grace_period(Duration::from_secs(10))
//!     .build_arc();
//!
//! let runner = tokio::spawn({
//!     let hz = hz.clone();
//!     async move { hz.start().await }
//! });
//! hz.notify_started().wait().await;
//!
//! // ... later, on SIGTERM:
//! hz.shutdown().await?;
//! runner.await??;
//! # Ok(())
//! # }
//! ```

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::core::{first_to_finish, run_to_error};
use crate::error::{BoxError, HealthzError};
use crate::events::{Bus, Event, EventKind};
use crate::healthz::builder::HealthzBuilder;
use crate::healthz::config::HealthzConfig;
use crate::healthz::front_door::FrontDoor;
use crate::healthz::handler::{ProbeHandler, serve};
use crate::hosted::Hosted;
use crate::lifecycle::{Latch, Signal};

/// Branch of the shutdown race that fired first.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ShutdownPath {
    HostedExited,
    FinalProbe,
    GraceExpired,
    NotServing,
}

/// Shutdown coordinator: a `/healthz` front door around a hosted process.
pub struct Healthz<H: Hosted + ?Sized> {
    cfg: HealthzConfig,
    handler: Arc<ProbeHandler<H>>,
    front_door: Arc<FrontDoor>,
    shutdown_claimed: AtomicBool,
    torn_down: CancellationToken,
}

impl<H: Hosted + ?Sized> Healthz<H> {
    /// Creates a coordinator with default configuration and the global bus.
    pub fn new(hosted: Arc<H>) -> Self {
        Self::with_parts(hosted, HealthzConfig::default(), Bus::global())
    }

    /// Starts a [`HealthzBuilder`].
    pub fn builder(hosted: Arc<H>) -> HealthzBuilder<H> {
        HealthzBuilder::new(hosted)
    }

    pub(crate) fn with_parts(hosted: Arc<H>, cfg: HealthzConfig, bus: Bus) -> Self {
        let front_door = Arc::new(FrontDoor::new(
            cfg.name.clone(),
            cfg.bind_addr.clone(),
            bus.clone(),
        ));
        let handler = Arc::new(ProbeHandler {
            name: cfg.name.clone(),
            latch: Latch::new(),
            hosted,
            default_headers: cfg.default_headers.clone(),
            recover_panics: cfg.recover_panics,
            bus,
        });
        Self {
            cfg,
            handler,
            front_door,
            shutdown_claimed: AtomicBool::new(false),
            torn_down: CancellationToken::new(),
        }
    }

    /// Configuration captured at construction.
    pub fn config(&self) -> &HealthzConfig {
        &self.cfg
    }

    /// The hosted process.
    pub fn hosted(&self) -> &Arc<H> {
        &self.handler.hosted
    }

    /// Coordinator latch; `Stopping` while a shutdown waits for its final probe.
    pub fn latch(&self) -> &Latch {
        &self.handler.latch
    }

    /// Address the front door is bound to, once listening.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.front_door.local_addr()
    }

    /// True while the front door is serving.
    pub fn is_running(&self) -> bool {
        self.front_door.latch().is_running()
    }

    /// Fires once the front door is serving.
    pub fn notify_started(&self) -> Signal {
        self.front_door.latch().notify_started()
    }

    /// Fires once the front door has stopped.
    pub fn notify_shutdown(&self) -> Signal {
        self.front_door.latch().notify_stopped()
    }

    /// Runs the front door and the hosted process until either exits.
    ///
    /// Returns that first exit's result: a hosted failure comes back as
    /// [`HealthzError::Hosted`] carrying the original error. The other
    /// subsystem keeps running until [`shutdown`](Self::shutdown).
    pub async fn start(&self) -> Result<(), HealthzError> {
        self.handler.latch.starting();
        let app = Router::new()
            .fallback(serve::<H>)
            .with_state(Arc::clone(&self.handler));
        self.handler.latch.started();

        let front_door = Arc::clone(&self.front_door);
        let hosted = Arc::clone(&self.handler.hosted);
        first_to_finish(
            async move { front_door.start(app).await },
            async move { hosted.start().await.map_err(HealthzError::Hosted) },
        )
        .await
    }

    /// Gracefully shuts down the front door and the hosted process.
    ///
    /// Bounded by the configured grace period plus the subsystems' own
    /// shutdown time. The teardown runs on its own task: dropping this future
    /// does not abort it, and later callers still wait for it to finish.
    pub async fn shutdown(&self) -> Result<(), HealthzError> {
        if self.shutdown_claimed.swap(true, Ordering::SeqCst) {
            self.torn_down.cancelled().await;
            return Ok(());
        }
        let teardown = Teardown {
            name: self.cfg.name.clone(),
            grace: self.cfg.grace,
            handler: Arc::clone(&self.handler),
            front_door: Arc::clone(&self.front_door),
        };
        let torn_down = self.torn_down.clone();
        let task = tokio::spawn(async move {
            let _release_waiters = torn_down.drop_guard();
            teardown.run().await
        });
        task.await?
    }
}

/// State moved into the shutdown task.
struct Teardown<H: Hosted + ?Sized> {
    name: Arc<str>,
    grace: Duration,
    handler: Arc<ProbeHandler<H>>,
    front_door: Arc<FrontDoor>,
}

impl<H: Hosted + ?Sized> Teardown<H> {
    async fn run(self) -> Result<(), HealthzError> {
        let grace = self.grace;
        info!(component = %self.name, ?grace, "healthz is shutting down");
        self.publish(Event::new(EventKind::ShutdownRequested).with_grace(grace));

        let deadline = tokio::time::Instant::now() + grace;
        let hosted_exited = self.handler.hosted.notify_shutdown();
        let final_probe = self.handler.latch.notify_stopped();
        // No probe can arrive if start() never ran or the front door never bound.
        let probe_possible =
            self.handler.latch.stopping() && !self.front_door.is_unreachable();

        let path = if probe_possible {
            tokio::select! {
                biased;
                _ = hosted_exited.wait() => ShutdownPath::HostedExited,
                _ = final_probe.wait() => ShutdownPath::FinalProbe,
                _ = tokio::time::sleep_until(deadline) => ShutdownPath::GraceExpired,
            }
        } else if hosted_exited.is_ready() {
            ShutdownPath::HostedExited
        } else {
            ShutdownPath::NotServing
        };

        let res = match path {
            ShutdownPath::HostedExited => {
                debug!(component = %self.name, "hosted process exited during shutdown");
                self.publish(Event::new(EventKind::HostedExited));
                self.front_door.shutdown().await
            }
            ShutdownPath::FinalProbe => {
                debug!(component = %self.name, "final probe received");
                self.publish(Event::new(EventKind::FinalProbe));
                self.shutdown_servers().await
            }
            ShutdownPath::GraceExpired => {
                warn!(component = %self.name, "healthz shutdown grace period has expired");
                self.publish(Event::new(EventKind::GraceExpired).with_grace(grace));
                self.shutdown_servers().await
            }
            ShutdownPath::NotServing => {
                debug!(component = %self.name, "front door is not serving, skipping final probe");
                self.shutdown_servers().await
            }
        };
        self.handler.latch.stopped();
        res
    }

    async fn shutdown_servers(&self) -> Result<(), HealthzError> {
        run_to_error(
            async {
                self.handler
                    .hosted
                    .shutdown()
                    .await
                    .map_err(HealthzError::Hosted)
            },
            self.front_door.shutdown(),
        )
        .await
    }

    fn publish(&self, ev: Event) {
        self.handler
            .bus
            .publish(ev.with_component(self.name.clone()));
    }
}

#[async_trait]
impl<H: Hosted + ?Sized> Hosted for Healthz<H> {
    async fn start(&self) -> Result<(), BoxError> {
        Healthz::start(self).await.map_err(into_box)
    }

    async fn shutdown(&self) -> Result<(), BoxError> {
        Healthz::shutdown(self).await.map_err(into_box)
    }

    fn is_running(&self) -> bool {
        Healthz::is_running(self)
    }

    fn notify_shutdown(&self) -> Signal {
        Healthz::notify_shutdown(self)
    }
}

fn into_box(err: HealthzError) -> BoxError {
    match err {
        HealthzError::Hosted(inner) => inner,
        other => Box::new(other),
    }
}

impl<H: Hosted + ?Sized> std::fmt::Debug for Healthz<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Healthz")
            .field("cfg", &self.cfg)
            .field("latch", &self.handler.latch)
            .field("front_door", &self.front_door)
            .finish()
    }
}
