//! # Example: Healthz sidecar
//!
//! Hosts a ticking service behind a `/healthz` endpoint and shuts both down
//! gracefully on Ctrl-C / SIGTERM.
//!
//! ```text
//! $ cargo run --example healthz_sidecar --features logging
//! $ curl -i http://127.0.0.1:8081/healthz      # 200 OK!
//! ^C                                           # shutdown starts
//! $ curl -i http://127.0.0.1:8081/healthz      # 500 Shutting down. (releases shutdown)
//! ```
//!
//! Set `HOSTVISOR_LOG=debug`, or pass `debug` as the first argument, to see
//! every probe.

use std::sync::Arc;
use std::time::Duration;

use axum::http::{HeaderName, HeaderValue};
use tokio_util::sync::CancellationToken;

use hostvisor::{
    Bus, Healthz, HostedFn, LogWriter, Subscribe, SubscriberSet, logging, run_until_signal,
};

#[tokio::main]
async fn main() -> Result<(), hostvisor::BoxError> {
    // An optional first argument ("debug", "warn", ...) overrides HOSTVISOR_LOG.
    let level = std::env::args().nth(1).as_deref().and_then(logging::parse_level);
    logging::init(level)?;

    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];
    let subscribers = SubscriberSet::attach(subs, Bus::global());

    let ticker = HostedFn::arc("ticker", |ctx: CancellationToken| async move {
        let mut interval = tokio::time::interval(Duration::from_secs(2));
        let mut ticks = 0u64;
        loop {
            tokio::select! {
                _ = ctx.cancelled() => break,
                _ = interval.tick() => {
                    ticks += 1;
                    tracing::info!(ticks, "tick");
                }
            }
        }
        tracing::info!(ticks, "ticker stopped");
        Ok::<(), hostvisor::BoxError>(())
    });

    let hz = Healthz::builder(ticker)
        .with_name("sidecar")
        .with_grace_period(Duration::from_secs(10))
        .with_default_header(
            HeaderName::from_static("x-served-by"),
            HeaderValue::from_static("hostvisor"),
        )
        .build_arc();

    let res = run_until_signal(hz).await;
    subscribers.shutdown().await;
    res
}
