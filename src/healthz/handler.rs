//! # The `/healthz` request handler.
//!
//! Every request goes through [`serve`], the router fallback. Paths are matched
//! case-insensitively; `/healthz` answers from the coordinator latch and the
//! hosted process, anything else is `404`.
//!
//! | Condition                          | Status | Body                |
//! |------------------------------------|--------|---------------------|
//! | coordinator latch is `Stopping`    | 500    | `Shutting down.\n`  |
//! | hosted process is running          | 200    | `OK!\n`             |
//! | otherwise                          | 500    | `Failure!\n`        |
//!
//! The `Stopping` answer also moves the coordinator latch to `Stopped`, which
//! is what releases a pending [`Healthz::shutdown`](crate::Healthz::shutdown).
//!
//! Every response carries `Content-Encoding: identity` and the configured
//! default headers.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

use axum::extract::{Request, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use tracing::{debug, error, trace};

use crate::error::panic_message;
use crate::events::{Bus, Event, EventKind};
use crate::hosted::Hosted;
use crate::lifecycle::Latch;

pub(crate) const HEALTHZ_ROUTE: &str = "/healthz";

const CONTENT_TYPE_TEXT: &str = "text/plain; charset=utf-8";
const CONTENT_ENCODING_IDENTITY: &str = "identity";

/// State shared by the coordinator and every request.
pub(crate) struct ProbeHandler<H: ?Sized> {
    pub(crate) name: Arc<str>,
    pub(crate) latch: Latch,
    pub(crate) hosted: Arc<H>,
    pub(crate) default_headers: HeaderMap,
    pub(crate) recover_panics: bool,
    pub(crate) bus: Bus,
}

/// Router fallback: answers every request.
pub(crate) async fn serve<H: Hosted + ?Sized>(
    State(handler): State<Arc<ProbeHandler<H>>>,
    req: Request,
) -> Response {
    handler.respond(req.uri().path())
}

impl<H: Hosted + ?Sized> ProbeHandler<H> {
    pub(crate) fn respond(&self, path: &str) -> Response {
        let start = Instant::now();
        let route = path.to_lowercase();
        trace!(component = %self.name, route = %route, "healthz request");

        let mut res = if self.recover_panics {
            match panic::catch_unwind(AssertUnwindSafe(|| self.route(&route))) {
                Ok(res) => res,
                Err(payload) => self.recovered(&route, payload),
            }
        } else {
            self.route(&route)
        };

        let headers = res.headers_mut();
        headers.insert(
            header::CONTENT_ENCODING,
            HeaderValue::from_static(CONTENT_ENCODING_IDENTITY),
        );
        headers.extend(self.default_headers.clone());

        let elapsed = start.elapsed();
        trace!(
            component = %self.name,
            route = %route,
            status = res.status().as_u16(),
            elapsed_ms = elapsed.as_millis() as u64,
            "healthz response"
        );
        self.bus.publish(
            Event::new(EventKind::ProbeServed)
                .with_component(self.name.clone())
                .with_route(route)
                .with_status(res.status().as_u16())
                .with_elapsed(elapsed),
        );
        res
    }

    fn route(&self, route: &str) -> Response {
        match route {
            HEALTHZ_ROUTE => self.healthz(),
            _ => text(StatusCode::NOT_FOUND, "404 page not found\n"),
        }
    }

    fn healthz(&self) -> Response {
        if self.latch.is_stopping() {
            let res = text(StatusCode::INTERNAL_SERVER_ERROR, "Shutting down.\n");
            debug!(component = %self.name, "healthz received probe while in process of shutdown");
            self.latch.stopped();
            res
        } else if self.hosted.is_running() {
            text(StatusCode::OK, "OK!\n")
        } else {
            text(StatusCode::INTERNAL_SERVER_ERROR, "Failure!\n")
        }
    }

    fn recovered(&self, route: &str, payload: Box<dyn Any + Send>) -> Response {
        let info = panic_message(&*payload);
        error!(component = %self.name, route = %route, panic = %info, "healthz handler panicked");
        self.bus.publish(
            Event::new(EventKind::HandlerPanicked)
                .with_component(self.name.clone())
                .with_route(route)
                .with_reason(info.as_str()),
        );
        text(StatusCode::INTERNAL_SERVER_ERROR, format!("{info}\n"))
    }
}

fn text(status: StatusCode, body: impl Into<String>) -> Response {
    (
        status,
        [(header::CONTENT_TYPE, CONTENT_TYPE_TEXT)],
        body.into(),
    )
        .into_response()
}
