//! # Batch: a fixed set of workers draining a list of work items.
//!
//! ## Architecture
//! ```text
//! process()
//!   ├─► latch: Starting → Started
//!   ├─► spawn N workers (each latch Started), push each onto the ready queue (cap N)
//!   ├─► for item in items:
//!   │     select! {
//!   │       stop requested        → drop the rest, stop workers, return
//!   │       ready.recv() → worker → worker.enqueue(item)
//!   │     }
//!   ├─► drain: pop N workers once more (each finished its last item), stop each
//!   └─► latch: Stopping → Stopped
//! ```
//!
//! ## Rules
//! - At most `workers` actions run concurrently
//! - Every delivered item reaches exactly one worker, exactly once
//! - Action errors go to the error sink (if any) and never stop other workers
//! - A stop request drops undelivered items; they are counted, never retried
//! - `process()` returns only after every in-flight action completed,
//!   except when stopped, where it returns immediately and workers finish
//!   their current item in the background
//!
//! ## Example
//! ```rust
//! use std::sync::{Arc, Mutex};
//! use hostvisor::Batch;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let sink = Arc::new(Mutex::new(Vec::new()));
//! let out = sink.clone();
//!
//! let report = Batch::new(
//!     move |n: u32| {
//!         let out = out.clone();
//!         async move {
//!             out.lock().unwrap().push(n);
//!             Ok(())
//!         }
//!     },
//!     vec![1, 2, 3, 4],
//! )
//! .with_num_workers(2)
//! .process()
//! .await;
//!
//! assert_eq!(report.delivered, 4);
//! assert_eq!(sink.lock().unwrap().len(), 4);
//! # }
//! ```

use std::future::Future;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::error::WorkError;
use crate::events::{Bus, Event, EventKind};
use crate::lifecycle::{Latch, Signal};
use crate::pool::action::{ActionFn, ActionRef};
use crate::pool::config::BatchConfig;
use crate::pool::worker::{Worker, WorkerContext};

/// Outcome of one `process()` run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BatchReport {
    /// Items handed to a worker.
    pub delivered: u64,
    /// Items abandoned because of a stop request.
    pub dropped: u64,
    /// True if a stop request ended distribution early.
    pub stopped: bool,
}

/// Remote control for a running batch.
#[derive(Clone, Debug)]
pub struct BatchStop {
    latch: Arc<Latch>,
    requested: CancellationToken,
}

impl BatchStop {
    /// Requests the batch to stop distributing.
    ///
    /// Honoured between deliveries; a request made before `process()` starts
    /// stops the batch before its first delivery.
    pub fn stop(&self) {
        self.requested.cancel();
        self.latch.stopping();
    }
}

/// A batch of work executed by a fixed count of workers.
pub struct Batch<T> {
    cfg: BatchConfig,
    action: ActionRef<T>,
    items: Vec<T>,
    errors: Option<mpsc::Sender<WorkError>>,
    latch: Arc<Latch>,
    requested: CancellationToken,
    bus: Bus,
}

impl<T: Send + 'static> Batch<T> {
    /// Creates a batch from a closure and the items to process.
    pub fn new<F, Fut>(action: F, items: impl IntoIterator<Item = T>) -> Self
    where
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), WorkError>> + Send + 'static,
    {
        Self::with_action(ActionFn::arc(action), items)
    }

    /// Creates a batch from a shared action.
    pub fn with_action(action: ActionRef<T>, items: impl IntoIterator<Item = T>) -> Self {
        Self {
            cfg: BatchConfig::default(),
            action,
            items: items.into_iter().collect(),
            errors: None,
            latch: Arc::new(Latch::new()),
            requested: CancellationToken::new(),
            bus: Bus::global(),
        }
    }

    /// Replaces the whole configuration.
    pub fn with_config(mut self, cfg: BatchConfig) -> Self {
        self.cfg = cfg;
        self
    }

    /// Sets the number of workers (defaults to the host's available parallelism).
    pub fn with_num_workers(mut self, workers: usize) -> Self {
        self.cfg.workers = workers;
        self
    }

    /// Sets the error sink.
    ///
    /// Without a sink, action errors are only published as events. A sink that
    /// is not drained concurrently makes workers wait once it is full.
    pub fn with_errors(mut self, errors: mpsc::Sender<WorkError>) -> Self {
        self.errors = Some(errors);
        self
    }

    /// Publishes events on `bus` instead of the process-wide default.
    pub fn with_bus(mut self, bus: Bus) -> Self {
        self.bus = bus;
        self
    }

    /// Number of workers `process()` will spawn.
    pub fn num_workers(&self) -> usize {
        self.cfg.workers_clamped()
    }

    /// The batch-wide latch.
    pub fn latch(&self) -> Arc<Latch> {
        Arc::clone(&self.latch)
    }

    /// Returns a handle that can stop the batch while `process()` runs.
    pub fn stop_handle(&self) -> BatchStop {
        BatchStop {
            latch: Arc::clone(&self.latch),
            requested: self.requested.clone(),
        }
    }

    /// Executes the action for all the work items.
    pub async fn process(mut self) -> BatchReport {
        let items = std::mem::take(&mut self.items);
        let total = items.len() as u64;
        let mut dispatcher = self.start();
        let stopping = self.latch.notify_stopping();

        for item in items {
            if let Err(_undelivered) = dispatcher.dispatch(item, &stopping).await {
                let dropped = total - dispatcher.delivered;
                return dispatcher.abandon(dropped);
            }
        }
        dispatcher.drain().await
    }

    /// Executes the action for every item received on `intake` until it closes.
    ///
    /// Items passed at construction are distributed first.
    pub async fn process_stream(mut self, mut intake: mpsc::Receiver<T>) -> BatchReport {
        let seeded = std::mem::take(&mut self.items);
        let mut dispatcher = self.start();
        let stopping = self.latch.notify_stopping();

        let mut pending = seeded.into_iter();
        loop {
            let item = match pending.next() {
                Some(item) => item,
                None => tokio::select! {
                    biased;
                    _ = stopping.wait() => break,
                    item = intake.recv() => match item {
                        Some(item) => item,
                        None => return dispatcher.drain().await,
                    },
                },
            };
            if dispatcher.dispatch(item, &stopping).await.is_err() {
                let dropped = 1 + pending.len() as u64 + close_and_count(&mut intake);
                return dispatcher.abandon(dropped);
            }
        }

        let dropped = pending.len() as u64 + close_and_count(&mut intake);
        dispatcher.abandon(dropped)
    }

    fn start(&self) -> Dispatcher<T> {
        self.latch.starting();
        self.latch.started();
        if self.requested.is_cancelled() {
            self.latch.stopping();
        }

        let workers = self.cfg.workers_clamped();
        let (ready_tx, ready_rx) = mpsc::channel::<Worker<T>>(workers);
        let ctx = WorkerContext {
            name: Arc::clone(&self.cfg.name),
            action: Arc::clone(&self.action),
            errors: self.errors.clone(),
            ready: ready_tx,
            bus: self.bus.clone(),
        };

        let mut joins = JoinSet::new();
        let mut handles = Vec::with_capacity(workers);
        for id in 0..workers {
            let worker = Worker::spawn(id, ctx.clone(), &mut joins);
            // Capacity equals the worker count, so this never waits.
            let _ = ctx.ready.try_send(worker.clone());
            handles.push(worker);
        }

        Dispatcher {
            name: Arc::clone(&self.cfg.name),
            handles,
            ready: ready_rx,
            joins,
            latch: Arc::clone(&self.latch),
            bus: self.bus.clone(),
            delivered: 0,
        }
    }
}

/// Drains whatever is still buffered in a closed intake.
fn close_and_count<T>(intake: &mut mpsc::Receiver<T>) -> u64 {
    intake.close();
    let mut n = 0;
    while intake.try_recv().is_ok() {
        n += 1;
    }
    n
}

/// Per-run distribution state.
struct Dispatcher<T> {
    name: Arc<str>,
    handles: Vec<Worker<T>>,
    ready: mpsc::Receiver<Worker<T>>,
    joins: JoinSet<()>,
    latch: Arc<Latch>,
    bus: Bus,
    delivered: u64,
}

impl<T: Send + 'static> Dispatcher<T> {
    /// Hands `item` to the next ready worker; gives it back if stop came first.
    async fn dispatch(&mut self, item: T, stopping: &Signal) -> Result<(), T> {
        let worker = tokio::select! {
            biased;
            _ = stopping.wait() => None,
            worker = self.ready.recv() => worker,
        };
        let Some(worker) = worker else {
            return Err(item);
        };
        worker.enqueue(item).await?;
        self.delivered += 1;
        Ok(())
    }

    /// Waits for every worker to finish its last item, then stops them all.
    async fn drain(mut self) -> BatchReport {
        for _ in 0..self.handles.len() {
            match self.ready.recv().await {
                Some(worker) => worker.stop(),
                None => break,
            }
        }
        while self.joins.join_next().await.is_some() {}

        self.latch.stopping();
        self.latch.stopped();
        self.bus.publish(
            Event::new(EventKind::BatchCompleted)
                .with_component(Arc::clone(&self.name))
                .with_count(self.delivered),
        );
        BatchReport {
            delivered: self.delivered,
            dropped: 0,
            stopped: false,
        }
    }

    /// Stops every worker without waiting; in-flight actions run to completion.
    fn abandon(mut self, dropped: u64) -> BatchReport {
        for worker in &self.handles {
            worker.stop();
        }
        self.joins.detach_all();

        self.latch.stopping();
        self.latch.stopped();
        self.bus.publish(
            Event::new(EventKind::ItemsDropped)
                .with_component(Arc::clone(&self.name))
                .with_count(dropped),
        );
        BatchReport {
            delivered: self.delivered,
            dropped,
            stopped: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn collecting(sink: Arc<Mutex<Vec<u32>>>) -> impl Fn(u32) -> BoxedOk + Send + Sync + 'static {
        move |n| {
            let sink = sink.clone();
            Box::pin(async move {
                sink.lock().unwrap().push(n);
                Ok(())
            })
        }
    }

    type BoxedOk = std::pin::Pin<Box<dyn Future<Output = Result<(), WorkError>> + Send>>;

    #[tokio::test]
    async fn test_two_workers_four_items() {
        let sink = Arc::new(Mutex::new(Vec::new()));
        let report = Batch::new(collecting(sink.clone()), vec![1, 2, 3, 4])
            .with_num_workers(2)
            .with_bus(Bus::new(64))
            .process()
            .await;

        let got: HashSet<u32> = sink.lock().unwrap().iter().copied().collect();
        assert_eq!(got, HashSet::from([1, 2, 3, 4]));
        assert_eq!(sink.lock().unwrap().len(), 4);
        assert_eq!(
            report,
            BatchReport {
                delivered: 4,
                dropped: 0,
                stopped: false
            }
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_every_item_delivered_exactly_once() {
        for workers in [1usize, 3, 8] {
            let sink = Arc::new(Mutex::new(Vec::new()));
            let items: Vec<u32> = (0..200).collect();
            Batch::new(collecting(sink.clone()), items.clone())
                .with_num_workers(workers)
                .with_bus(Bus::new(1024))
                .process()
                .await;

            let mut got = sink.lock().unwrap().clone();
            got.sort_unstable();
            assert_eq!(got, items, "workers={workers}");
        }
    }

    #[tokio::test]
    async fn test_process_waits_for_in_flight_actions() {
        let finished = Arc::new(AtomicUsize::new(0));
        let counter = finished.clone();
        Batch::new(
            move |ms: u64| {
                let counter = counter.clone();
                async move {
                    tokio::time::sleep(Duration::from_millis(ms)).await;
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            },
            vec![40, 5, 30, 10, 20],
        )
        .with_num_workers(2)
        .with_bus(Bus::new(64))
        .process()
        .await;

        assert_eq!(finished.load(Ordering::SeqCst), 5);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrency_never_exceeds_worker_count() {
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let (a, p) = (active.clone(), peak.clone());

        Batch::new(
            move |_: u32| {
                let (a, p) = (a.clone(), p.clone());
                async move {
                    let now = a.fetch_add(1, Ordering::SeqCst) + 1;
                    p.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(2)).await;
                    a.fetch_sub(1, Ordering::SeqCst);
                    Ok(())
                }
            },
            0..50,
        )
        .with_num_workers(3)
        .with_bus(Bus::new(256))
        .process()
        .await;

        assert!(peak.load(Ordering::SeqCst) <= 3);
        assert!(peak.load(Ordering::SeqCst) >= 1);
    }

    #[tokio::test]
    async fn test_failing_action_still_processes_every_item() {
        let (tx, mut rx) = mpsc::channel(16);
        let report = Batch::new(
            |n: u32| async move { Err(WorkError::fail(format!("item {n}"))) },
            0..10,
        )
        .with_num_workers(3)
        .with_errors(tx)
        .with_bus(Bus::new(64))
        .process()
        .await;

        assert_eq!(report.delivered, 10);
        let mut errors = Vec::new();
        while let Ok(err) = rx.try_recv() {
            errors.push(err);
        }
        assert_eq!(errors.len(), 10);
        assert!(errors.iter().all(|e| e.as_label() == "work_failed"));
    }

    #[tokio::test]
    async fn test_panicking_action_is_reported_and_worker_survives() {
        let (tx, mut rx) = mpsc::channel(8);
        let done = Arc::new(AtomicUsize::new(0));
        let d = done.clone();
        let report = Batch::new(
            move |n: u32| {
                let d = d.clone();
                async move {
                    if n == 2 {
                        panic!("bad item");
                    }
                    d.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            },
            vec![1, 2, 3, 4],
        )
        .with_num_workers(1)
        .with_errors(tx)
        .with_bus(Bus::new(64))
        .process()
        .await;

        assert_eq!(report.delivered, 4);
        assert_eq!(done.load(Ordering::SeqCst), 3);
        let err = rx.try_recv().unwrap();
        assert_eq!(
            err,
            WorkError::Panicked {
                worker: 0,
                info: "bad item".into()
            }
        );
    }

    #[tokio::test]
    async fn test_errors_dropped_without_sink_are_published() {
        let bus = Bus::new(64);
        let mut rx = bus.subscribe();
        Batch::new(|_: u32| async { Err(WorkError::fail("nope")) }, vec![7])
            .with_num_workers(1)
            .with_bus(bus)
            .process()
            .await;

        let mut kinds = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            kinds.push(ev.kind);
        }
        assert!(kinds.contains(&EventKind::ItemFailed));
        assert_eq!(kinds.last(), Some(&EventKind::BatchCompleted));
    }

    #[tokio::test]
    async fn test_stop_mid_distribution_drops_remaining_items() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let gate = Arc::new(tokio::sync::Notify::new());
        let (s, g) = (seen.clone(), gate.clone());

        let batch = Batch::new(
            move |n: u32| {
                let (s, g) = (s.clone(), g.clone());
                async move {
                    s.lock().unwrap().push(n);
                    g.notified().await;
                    Ok(())
                }
            },
            0..10,
        )
        .with_num_workers(2)
        .with_bus(Bus::new(64));
        let stop = batch.stop_handle();
        let latch = batch.latch();
        let run = tokio::spawn(batch.process());

        while seen.lock().unwrap().len() < 2 {
            tokio::task::yield_now().await;
        }
        stop.stop();
        let report = run.await.unwrap();

        assert!(report.stopped);
        assert_eq!(report.delivered, 2);
        assert_eq!(report.dropped, 8);
        assert!(latch.is_stopped());

        gate.notify_waiters();
        assert_eq!(seen.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_stop_before_process_delivers_nothing() {
        let batch = Batch::new(|_: u32| async { Ok(()) }, vec![1, 2, 3])
            .with_num_workers(2)
            .with_bus(Bus::new(16));
        batch.stop_handle().stop();

        let report = batch.process().await;
        assert_eq!(report.delivered, 0);
        assert_eq!(report.dropped, 3);
        assert!(report.stopped);
    }

    #[tokio::test]
    async fn test_empty_batch_returns_immediately() {
        let batch = Batch::new(|_: u32| async { Ok(()) }, Vec::new())
            .with_num_workers(4)
            .with_bus(Bus::new(16));
        let latch = batch.latch();
        let report = batch.process().await;
        assert_eq!(report, BatchReport::default());
        assert!(latch.is_stopped());
    }

    #[test]
    fn test_num_workers_clamped() {
        let batch = Batch::new(|_: u32| async { Ok(()) }, Vec::new()).with_num_workers(0);
        assert_eq!(batch.num_workers(), 1);
    }

    #[tokio::test]
    async fn test_stream_intake_until_closed() {
        let sink = Arc::new(Mutex::new(Vec::new()));
        let (tx, rx) = mpsc::channel(4);
        let run = tokio::spawn(
            Batch::new(collecting(sink.clone()), vec![100])
                .with_num_workers(2)
                .with_bus(Bus::new(64))
                .process_stream(rx),
        );

        for n in 0..6 {
            tx.send(n).await.unwrap();
        }
        drop(tx);
        let report = run.await.unwrap();

        assert_eq!(report.delivered, 7);
        let got: HashSet<u32> = sink.lock().unwrap().iter().copied().collect();
        assert_eq!(got, HashSet::from([100, 0, 1, 2, 3, 4, 5]));
    }

    #[tokio::test]
    async fn test_stream_stop_counts_buffered_items() {
        let gate = Arc::new(tokio::sync::Notify::new());
        let g = gate.clone();
        let (tx, rx) = mpsc::channel(8);
        let batch = Batch::new(
            move |_: u32| {
                let g = g.clone();
                async move {
                    g.notified().await;
                    Ok(())
                }
            },
            Vec::new(),
        )
        .with_num_workers(1)
        .with_bus(Bus::new(64));
        let stop = batch.stop_handle();
        let latch = batch.latch();
        let run = tokio::spawn(batch.process_stream(rx));

        for n in 0..4 {
            tx.send(n).await.unwrap();
        }
        latch.notify_started().wait().await;
        while tx.capacity() != 6 {
            tokio::task::yield_now().await;
        }
        stop.stop();
        let report = run.await.unwrap();
        gate.notify_waiters();

        assert!(report.stopped);
        assert_eq!(report.delivered, 1);
        assert_eq!(report.dropped, 3);
    }
}
