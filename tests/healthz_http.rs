//! Drives the real `/healthz` front door over HTTP.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::http::{HeaderName, HeaderValue};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use hostvisor::{Bus, BoxError, Healthz, HealthzError, Hosted, HostedFn};

type Runner = JoinHandle<Result<(), HealthzError>>;

fn until_cancelled() -> Arc<impl Hosted> {
    HostedFn::arc("app", |ctx: CancellationToken| async move {
        ctx.cancelled().await;
        Ok::<(), BoxError>(())
    })
}

async fn spawn<H: Hosted>(hz: Arc<Healthz<H>>) -> (Runner, String) {
    let runner = tokio::spawn({
        let hz = hz.clone();
        async move { Healthz::start(&hz).await }
    });
    hz.notify_started().wait().await;
    let addr = hz.local_addr().expect("front door bound");
    (runner, format!("http://{addr}"))
}

fn coordinator<H: Hosted>(hosted: Arc<H>, grace: Duration) -> Arc<Healthz<H>> {
    Healthz::builder(hosted)
        .with_bind_addr("127.0.0.1:0")
        .with_grace_period(grace)
        .with_bus(Bus::new(256))
        .build_arc()
}

async fn wait_running<H: Hosted>(hosted: &H) {
    while !hosted.is_running() {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
}

#[tokio::test]
async fn probe_answers_ok_while_hosted_runs() {
    let app = until_cancelled();
    let hz = coordinator(app.clone(), Duration::from_millis(100));
    let (runner, base) = spawn(hz.clone()).await;
    wait_running(&*app).await;

    let res = reqwest::get(format!("{base}/healthz")).await.unwrap();
    assert_eq!(res.status(), 200);
    assert!(
        res.headers()["content-type"]
            .to_str()
            .unwrap()
            .starts_with("text/plain")
    );
    assert_eq!(res.headers()["content-encoding"], "identity");
    assert_eq!(res.text().await.unwrap(), "OK!\n");

    let res = reqwest::get(format!("{base}/HEALTHZ")).await.unwrap();
    assert_eq!(res.status(), 200);

    hz.shutdown().await.unwrap();
    runner.await.unwrap().unwrap();
}

#[tokio::test]
async fn unknown_path_is_not_found() {
    let app = until_cancelled();
    let hz = coordinator(app, Duration::from_millis(50));
    let (runner, base) = spawn(hz.clone()).await;

    let res = reqwest::get(format!("{base}/debug/vars")).await.unwrap();
    assert_eq!(res.status(), 404);
    assert_eq!(res.text().await.unwrap(), "404 page not found\n");

    hz.shutdown().await.unwrap();
    runner.await.unwrap().unwrap();
}

#[tokio::test]
async fn default_headers_are_sent() {
    let hz = Healthz::builder(until_cancelled())
        .with_bind_addr("127.0.0.1:0")
        .with_grace_period(Duration::from_millis(50))
        .with_default_header(
            HeaderName::from_static("x-served-by"),
            HeaderValue::from_static("sidecar"),
        )
        .with_bus(Bus::new(64))
        .build_arc();
    let (runner, base) = spawn(hz.clone()).await;

    for path in ["/healthz", "/missing"] {
        let res = reqwest::get(format!("{base}{path}")).await.unwrap();
        assert_eq!(res.headers()["x-served-by"], "sidecar");
    }

    hz.shutdown().await.unwrap();
    runner.await.unwrap().unwrap();
}

#[tokio::test]
async fn final_probe_completes_shutdown_before_grace() {
    let app = until_cancelled();
    let hz = coordinator(app.clone(), Duration::from_secs(60));
    let (runner, base) = spawn(hz.clone()).await;
    wait_running(&*app).await;

    let stopping = hz.latch().notify_stopping();
    let shutdown = tokio::spawn({
        let hz = hz.clone();
        async move { hz.shutdown().await }
    });
    stopping.wait().await;

    let res = reqwest::get(format!("{base}/healthz")).await.unwrap();
    assert_eq!(res.status(), 500);
    assert_eq!(res.text().await.unwrap(), "Shutting down.\n");

    tokio::time::timeout(Duration::from_secs(10), shutdown)
        .await
        .expect("final probe did not release shutdown")
        .unwrap()
        .unwrap();
    assert!(!app.is_running());
    assert!(!hz.is_running());
    assert!(hz.latch().is_stopped());
    runner.await.unwrap().unwrap();
}

#[tokio::test]
async fn grace_expiry_stops_serving() {
    let app = until_cancelled();
    let hz = coordinator(app.clone(), Duration::from_millis(150));
    let (runner, base) = spawn(hz.clone()).await;
    wait_running(&*app).await;

    let begun = std::time::Instant::now();
    tokio::time::timeout(Duration::from_secs(10), hz.shutdown())
        .await
        .expect("shutdown exceeded its bound")
        .unwrap();
    assert!(begun.elapsed() >= Duration::from_millis(150));
    assert!(!app.is_running());

    let client = reqwest::Client::new();
    assert!(client.get(format!("{base}/healthz")).send().await.is_err());
    runner.await.unwrap().unwrap();
}

#[tokio::test]
async fn crashed_hosted_reports_failure_and_shutdown_is_prompt() {
    let (crash_tx, crash_rx) = oneshot::channel::<()>();
    let crash_rx = Arc::new(Mutex::new(Some(crash_rx)));
    let app = HostedFn::arc("crashy", move |_ctx: CancellationToken| {
        let rx = crash_rx.lock().unwrap().take();
        async move {
            if let Some(rx) = rx {
                let _ = rx.await;
            }
            Err::<(), BoxError>("lost connection to upstream".into())
        }
    });
    let hz = coordinator(app.clone(), Duration::from_secs(60));
    let (runner, base) = spawn(hz.clone()).await;
    wait_running(&*app).await;

    crash_tx.send(()).unwrap();
    let err = runner.await.unwrap().unwrap_err();
    assert_eq!(err.to_string(), "lost connection to upstream");

    let res = reqwest::get(format!("{base}/healthz")).await.unwrap();
    assert_eq!(res.status(), 500);
    assert_eq!(res.text().await.unwrap(), "Failure!\n");

    tokio::time::timeout(Duration::from_secs(10), hz.shutdown())
        .await
        .expect("crash path waited for the grace period")
        .unwrap();
    assert!(!hz.is_running());
}
