//! # Batch worker: one serving loop with a single-item handoff.
//!
//! ```text
//!   dispatcher ──enqueue(item)──► [handoff, cap 1] ──► run loop ──► action(item)
//!        ▲                                                              │
//!        └──────────── ready queue ◄──── push own handle ◄──────────────┘
//! ```
//!
//! ## Rules
//! - A worker pushes itself back onto the ready queue **exactly once** per item
//! - The handoff is only written after the handle was popped from the ready queue,
//!   so `enqueue` never waits
//! - An item already in the handoff is processed even if stop was requested
//! - Action panics are caught and reported as [`WorkError::Panicked`]

use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::mpsc;
use tokio::task::JoinSet;

use crate::error::{WorkError, panic_message};
use crate::events::{Bus, Event, EventKind};
use crate::lifecycle::Latch;
use crate::pool::action::ActionRef;

/// Everything a worker loop shares with its batch.
pub(crate) struct WorkerContext<T> {
    pub name: Arc<str>,
    pub action: ActionRef<T>,
    pub errors: Option<mpsc::Sender<WorkError>>,
    pub ready: mpsc::Sender<Worker<T>>,
    pub bus: Bus,
}

impl<T> Clone for WorkerContext<T> {
    fn clone(&self) -> Self {
        Self {
            name: Arc::clone(&self.name),
            action: Arc::clone(&self.action),
            errors: self.errors.clone(),
            ready: self.ready.clone(),
            bus: self.bus.clone(),
        }
    }
}

/// Handle to one worker; travels through the ready queue.
pub(crate) struct Worker<T> {
    id: usize,
    work: mpsc::Sender<T>,
    latch: Arc<Latch>,
}

impl<T> Clone for Worker<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            work: self.work.clone(),
            latch: Arc::clone(&self.latch),
        }
    }
}

impl<T: Send + 'static> Worker<T> {
    /// Moves the worker latch to `Started` and spawns its loop into `set`.
    pub(crate) fn spawn(id: usize, ctx: WorkerContext<T>, set: &mut JoinSet<()>) -> Self {
        let (tx, rx) = mpsc::channel::<T>(1);
        let worker = Self {
            id,
            work: tx,
            latch: Arc::new(Latch::new()),
        };
        worker.latch.starting();
        worker.latch.started();
        set.spawn(worker.clone().run(rx, ctx));
        worker
    }

    /// Hands an item to this worker; gives it back if the worker is gone.
    pub(crate) async fn enqueue(&self, item: T) -> Result<(), T> {
        self.work.send(item).await.map_err(|e| e.0)
    }

    /// Requests the worker to exit after its current item.
    pub(crate) fn stop(&self) {
        self.latch.stopping();
    }

    async fn run(self, mut rx: mpsc::Receiver<T>, ctx: WorkerContext<T>) {
        let stopping = self.latch.notify_stopping();
        ctx.bus.publish(
            Event::new(EventKind::WorkerStarted)
                .with_component(Arc::clone(&ctx.name))
                .with_worker(self.id),
        );

        let mut processed: u64 = 0;
        loop {
            let item = tokio::select! {
                biased;
                item = rx.recv() => match item {
                    Some(item) => item,
                    None => break,
                },
                _ = stopping.wait() => break,
            };

            let action = Arc::clone(&ctx.action);
            let res = std::panic::AssertUnwindSafe(async move { action.call(item).await })
                .catch_unwind()
                .await
                .unwrap_or_else(|panic| {
                    Err(WorkError::Panicked {
                        worker: self.id,
                        info: panic_message(&*panic),
                    })
                });
            processed += 1;

            if let Err(err) = res {
                self.report(&ctx, err).await;
            }
            if ctx.ready.send(self.clone()).await.is_err() {
                break;
            }
        }

        // Reached from Started when the handoff closed without a stop request.
        self.latch.stopping();
        self.latch.stopped();
        ctx.bus.publish(
            Event::new(EventKind::WorkerStopped)
                .with_component(Arc::clone(&ctx.name))
                .with_worker(self.id)
                .with_count(processed),
        );
    }

    async fn report(&self, ctx: &WorkerContext<T>, err: WorkError) {
        let kind = match err {
            WorkError::Panicked { .. } => EventKind::WorkerPanicked,
            _ => EventKind::ItemFailed,
        };
        ctx.bus.publish(
            Event::new(kind)
                .with_component(Arc::clone(&ctx.name))
                .with_worker(self.id)
                .with_reason(err.to_string()),
        );
        if let Some(errors) = &ctx.errors {
            let _ = errors.send(err).await;
        }
    }
}
