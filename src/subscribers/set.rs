//! # Fan-out of runtime events.
//!
//! [`SubscriberSet`] owns one bounded queue and one worker task per
//! [`Subscribe`] implementation. Publishing into the set never waits: an event
//! that does not fit in a subscriber's queue is dropped for that subscriber
//! alone and reported as `SubscriberOverflow`.
//!
//! ```text
//! Bus ─► listener ─► fan_out ─┬─ accepts? ─► [queue A] ─► worker A ─► on_event
//!                             └─ accepts? ─► [queue B] ─► worker B ─► on_event
//!                                                            └─ panic ─► SubscriberPanicked
//! ```
//!
//! Each subscriber sees its events in publish order. Nothing orders one
//! subscriber against another.

use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

use crate::error::panic_message;
use crate::events::{Bus, Event, EventKind};
use crate::subscribers::Subscribe;

/// Queue feeding one subscriber's worker.
struct SubscriberChannel {
    sub: Arc<dyn Subscribe>,
    sender: mpsc::Sender<Arc<Event>>,
}

/// Fan-out coordinator for multiple event subscribers.
pub struct SubscriberSet {
    channels: Arc<Vec<SubscriberChannel>>,
    workers: Vec<JoinHandle<()>>,
    listener: Option<JoinHandle<()>>,
    bus: Bus,
}

impl SubscriberSet {
    /// Creates a new set and spawns one worker task per subscriber.
    ///
    /// Events are only delivered through [`emit`](Self::emit); use
    /// [`attach`](Self::attach) to also follow the bus.
    #[must_use]
    pub fn new(subs: Vec<Arc<dyn Subscribe>>, bus: Bus) -> Self {
        let mut channels = Vec::with_capacity(subs.len());
        let mut workers = Vec::with_capacity(subs.len());

        for sub in subs {
            let cap = sub.queue_capacity().max(1);
            let (tx, mut rx) = mpsc::channel::<Arc<Event>>(cap);
            channels.push(SubscriberChannel {
                sub: Arc::clone(&sub),
                sender: tx,
            });
            let bus_for_worker = bus.clone();

            let handle = tokio::spawn(async move {
                while let Some(ev) = rx.recv().await {
                    let fut = sub.on_event(ev.as_ref());
                    if let Err(panic_err) = std::panic::AssertUnwindSafe(fut).catch_unwind().await {
                        bus_for_worker
                            .publish(Event::subscriber_panicked(sub.name(), panic_message(&*panic_err)));
                    }
                }
            });
            workers.push(handle);
        }
        Self {
            channels: Arc::new(channels),
            workers,
            listener: None,
            bus,
        }
    }

    /// Creates the set and spawns a listener that forwards every bus event to it.
    #[must_use]
    pub fn attach(subs: Vec<Arc<dyn Subscribe>>, bus: Bus) -> Self {
        let mut set = Self::new(subs, bus);
        let mut rx = set.bus.subscribe();
        let channels = Arc::clone(&set.channels);
        let bus = set.bus.clone();

        set.listener = Some(tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(ev) => fan_out(&channels, &bus, Arc::new(ev)),
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }));
        set
    }

    /// Emits an event to all subscribers (clones the event).
    pub fn emit(&self, event: &Event) {
        fan_out(&self.channels, &self.bus, Arc::new(event.clone()));
    }

    /// Number of subscribers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    /// True if there are no subscribers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Gracefully shuts down all subscriber workers.
    ///
    /// 1. Stops the bus listener (if attached)
    /// 2. Drops all channel senders (workers see channel closed)
    /// 3. Awaits all worker tasks to finish
    pub async fn shutdown(self) {
        if let Some(listener) = self.listener {
            listener.abort();
            let _ = listener.await;
        }
        drop(self.channels);

        for h in self.workers {
            let _ = h.await;
        }
    }
}

/// Never waits. A failed delivery of an overflow event is not reported again.
fn fan_out(channels: &[SubscriberChannel], bus: &Bus, event: Arc<Event>) {
    let reportable = event.kind != EventKind::SubscriberOverflow;

    for channel in channels.iter().filter(|c| c.sub.accepts(event.kind)) {
        let reason = match channel.sender.try_send(Arc::clone(&event)) {
            Ok(()) => continue,
            Err(mpsc::error::TrySendError::Full(_)) => "full",
            Err(mpsc::error::TrySendError::Closed(_)) => "closed",
        };
        if reportable {
            bus.publish(Event::subscriber_overflow(channel.sub.name(), reason));
        }
    }
}
