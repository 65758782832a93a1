//! # Front door: the embedded HTTP server.
//!
//! [`FrontDoor`] binds the configured address and serves an [`axum::Router`]
//! until asked to stop. Its own [`Latch`] tracks the server:
//!
//! ```text
//! start():    bind ──► Starting → Started ──► serve ──► Stopping → Stopped
//! shutdown(): cancel ──► graceful drain ──► wait for Stopped
//! ```
//!
//! A bind failure returns [`HealthzError::Bind`] and leaves the latch idle, so a
//! later `shutdown()` returns immediately. A front door serves one lifetime:
//! `start()` after `shutdown()`, or on one that already ran, returns `Ok(())`
//! without serving.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use axum::Router;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::HealthzError;
use crate::events::{Bus, Event, EventKind};
use crate::lifecycle::Latch;

/// Embedded HTTP server with a lifecycle latch.
pub struct FrontDoor {
    name: Arc<str>,
    bind_addr: String,
    latch: Latch,
    stop: CancellationToken,
    local_addr: OnceLock<SocketAddr>,
    bind_failed: AtomicBool,
    bus: Bus,
}

impl FrontDoor {
    /// Creates a front door for `bind_addr`; nothing is bound until [`start`](Self::start).
    pub fn new(name: Arc<str>, bind_addr: impl Into<String>, bus: Bus) -> Self {
        Self {
            name,
            bind_addr: bind_addr.into(),
            latch: Latch::new(),
            stop: CancellationToken::new(),
            local_addr: OnceLock::new(),
            bind_failed: AtomicBool::new(false),
            bus,
        }
    }

    /// Configured listen address.
    pub fn bind_addr(&self) -> &str {
        &self.bind_addr
    }

    /// Address actually bound, once listening.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr.get().copied()
    }

    /// Server latch.
    pub fn latch(&self) -> &Latch {
        &self.latch
    }

    /// True once the front door can no longer answer requests: binding
    /// failed, or serving has ended.
    pub fn is_unreachable(&self) -> bool {
        self.bind_failed.load(Ordering::SeqCst) || self.latch.is_stopped()
    }

    /// Binds and serves `app` until [`shutdown`](Self::shutdown) is called.
    pub async fn start(&self, app: Router) -> Result<(), HealthzError> {
        if !self.latch.is_idle() {
            return Ok(());
        }

        let bind_err = |source: std::io::Error| {
            self.bind_failed.store(true, Ordering::SeqCst);
            HealthzError::Bind {
                addr: self.bind_addr.clone(),
                source,
            }
        };
        let listener = TcpListener::bind(self.bind_addr.as_str())
            .await
            .map_err(bind_err)?;
        let addr = listener.local_addr().map_err(bind_err)?;

        if self.stop.is_cancelled() || !self.latch.starting() {
            return Ok(());
        }
        let _ = self.local_addr.set(addr);
        self.latch.started();

        info!(component = %self.name, %addr, "healthz listening");
        self.bus.publish(
            Event::new(EventKind::FrontDoorListening)
                .with_component(self.name.clone())
                .with_addr(addr),
        );

        let res = axum::serve(listener, app)
            .with_graceful_shutdown(self.stop.clone().cancelled_owned())
            .await;

        self.latch.stopping();
        self.latch.stopped();

        debug!(component = %self.name, %addr, "healthz stopped listening");
        self.bus.publish(
            Event::new(EventKind::FrontDoorStopped)
                .with_component(self.name.clone())
                .with_addr(addr),
        );
        res.map_err(|source| HealthzError::Serve { addr, source })
    }

    /// Stops accepting connections and waits for in-flight requests to finish.
    pub async fn shutdown(&self) -> Result<(), HealthzError> {
        let stopped = self.latch.notify_stopped();
        self.stop.cancel();
        if self.latch.is_idle() {
            return Ok(());
        }
        stopped.wait().await;
        Ok(())
    }
}

impl std::fmt::Debug for FrontDoor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrontDoor")
            .field("name", &self.name)
            .field("bind_addr", &self.bind_addr)
            .field("local_addr", &self.local_addr())
            .field("phase", &self.latch.phase())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::routing::get;

    fn door(addr: &str) -> Arc<FrontDoor> {
        Arc::new(FrontDoor::new(Arc::from("test"), addr, Bus::new(16)))
    }

    #[tokio::test]
    async fn test_start_and_shutdown() {
        let door = door("127.0.0.1:0");
        let app = Router::new().route("/", get(|| async { "hi" }));

        let runner = tokio::spawn({
            let door = door.clone();
            async move { door.start(app).await }
        });
        door.latch().notify_started().wait().await;
        assert!(door.latch().is_running());
        assert_ne!(door.local_addr().unwrap().port(), 0);

        door.shutdown().await.unwrap();
        assert!(door.latch().is_stopped());
        runner.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_before_start_returns_immediately() {
        let door = door("127.0.0.1:0");
        door.shutdown().await.unwrap();
        assert!(door.latch().is_idle());
        assert!(!door.is_unreachable());
        assert!(door.local_addr().is_none());
    }

    #[tokio::test]
    async fn test_start_after_shutdown_does_not_serve() {
        let door = door("127.0.0.1:0");
        door.shutdown().await.unwrap();
        door.start(Router::new()).await.unwrap();
        assert!(door.latch().is_idle());
    }

    #[tokio::test]
    async fn test_bind_failure_is_reported() {
        let taken = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = taken.local_addr().unwrap().to_string();

        let door = door(&addr);
        let err = door.start(Router::new()).await.unwrap_err();
        assert_eq!(err.as_label(), "healthz_bind");
        assert!(door.latch().is_idle());
        assert!(door.is_unreachable());
        door.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_publishes_listening_and_stopped() {
        let bus = Bus::new(16);
        let mut rx = bus.subscribe();
        let door = Arc::new(FrontDoor::new(Arc::from("test"), "127.0.0.1:0", bus));

        let runner = tokio::spawn({
            let door = door.clone();
            async move { door.start(Router::new()).await }
        });
        door.latch().notify_started().wait().await;
        door.shutdown().await.unwrap();
        runner.await.unwrap().unwrap();

        let first = rx.recv().await.unwrap();
        assert_eq!(first.kind, EventKind::FrontDoorListening);
        assert_eq!(first.addr, door.local_addr());
        let second = rx.recv().await.unwrap();
        assert_eq!(second.kind, EventKind::FrontDoorStopped);
    }
}
