//! # Latch: reusable five-phase lifecycle state machine.
//!
//! A [`Latch`] makes start/stop of a component idempotent and observable from
//! any number of tasks.
//!
//! ## Phases
//! ```text
//!            starting()        started()        stopping()        stopped()
//!   Idle ───────────────► Starting ──────► Started ──────► Stopping ──────► Stopped
//!                            ▲                                                 │
//!                            └──────────────── starting() (new cycle) ─────────┘
//! ```
//!
//! ## Rules
//! - A transition called outside its predecessor phase is a **no-op** and returns `false`
//! - Concurrent callers of the same transition: exactly one gets `true`
//! - `started()`, `stopping()`, `stopped()` each fire their [`Signal`] once per cycle
//! - Signals are **level-triggered** within their cycle: late waiters return immediately
//! - `starting()` from `Stopped` opens a new cycle with fresh, unfired signals
//!
//! ## Example
//! ```rust
//! use hostvisor::{Latch, Phase};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let latch = Latch::new();
//! let started = latch.notify_started();
//!
//! assert!(latch.starting());
//! assert!(latch.started());
//! assert!(!latch.started()); // already there
//!
//! started.wait().await;
//! assert_eq!(latch.phase(), Phase::Started);
//! # }
//! ```

use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio_util::sync::CancellationToken;

use super::Signal;

/// Phase of a [`Latch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Created, never started.
    Idle,
    /// Start requested, not yet running.
    Starting,
    /// Running.
    Started,
    /// Stop requested; no new work should be accepted.
    Stopping,
    /// Fully stopped.
    Stopped,
}

impl Phase {
    /// Returns a short stable label for logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::Starting => "starting",
            Phase::Started => "started",
            Phase::Stopping => "stopping",
            Phase::Stopped => "stopped",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_label())
    }
}

/// Transition tokens of one cycle.
struct Cycle {
    started: CancellationToken,
    stopping: CancellationToken,
    stopped: CancellationToken,
}

impl Cycle {
    fn new() -> Self {
        Self {
            started: CancellationToken::new(),
            stopping: CancellationToken::new(),
            stopped: CancellationToken::new(),
        }
    }
}

struct State {
    phase: Phase,
    generation: u64,
    cycle: Cycle,
}

/// Five-phase lifecycle state machine with broadcast notifications.
///
/// All methods take `&self` and are safe to call from many tasks at once.
/// Transitions only do constant-time bookkeeping under a short mutex and never
/// wait for observers.
pub struct Latch {
    state: Mutex<State>,
}

impl Latch {
    /// Creates a latch in [`Phase::Idle`].
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                phase: Phase::Idle,
                generation: 0,
                cycle: Cycle::new(),
            }),
        }
    }

    /// Idle/Stopped → Starting.
    ///
    /// From `Stopped` this opens a new cycle: signals obtained afterwards are
    /// fresh and unfired.
    pub fn starting(&self) -> bool {
        let mut state = self.lock();
        match state.phase {
            Phase::Idle => {}
            Phase::Stopped => {
                state.cycle = Cycle::new();
                state.generation += 1;
            }
            _ => return false,
        }
        state.phase = Phase::Starting;
        true
    }

    /// Starting → Started; fires [`notify_started`](Self::notify_started).
    pub fn started(&self) -> bool {
        self.advance(Phase::Starting, Phase::Started, |c| &c.started)
    }

    /// Started → Stopping; fires [`notify_stopping`](Self::notify_stopping).
    pub fn stopping(&self) -> bool {
        self.advance(Phase::Started, Phase::Stopping, |c| &c.stopping)
    }

    /// Stopping → Stopped; fires [`notify_stopped`](Self::notify_stopped).
    pub fn stopped(&self) -> bool {
        self.advance(Phase::Stopping, Phase::Stopped, |c| &c.stopped)
    }

    /// Current phase.
    pub fn phase(&self) -> Phase {
        self.lock().phase
    }

    /// Number of completed restarts (`0` during the first cycle).
    pub fn generation(&self) -> u64 {
        self.lock().generation
    }

    /// True while in [`Phase::Started`].
    #[inline]
    pub fn is_running(&self) -> bool {
        self.phase() == Phase::Started
    }

    /// True while in [`Phase::Stopping`].
    #[inline]
    pub fn is_stopping(&self) -> bool {
        self.phase() == Phase::Stopping
    }

    /// True while in [`Phase::Stopped`].
    #[inline]
    pub fn is_stopped(&self) -> bool {
        self.phase() == Phase::Stopped
    }

    /// True while in [`Phase::Idle`].
    #[inline]
    pub fn is_idle(&self) -> bool {
        self.phase() == Phase::Idle
    }

    /// Signal for the `started` transition of the current cycle.
    pub fn notify_started(&self) -> Signal {
        Signal::from(self.lock().cycle.started.clone())
    }

    /// Signal for the `stopping` transition of the current cycle.
    pub fn notify_stopping(&self) -> Signal {
        Signal::from(self.lock().cycle.stopping.clone())
    }

    /// Signal for the `stopped` transition of the current cycle.
    pub fn notify_stopped(&self) -> Signal {
        Signal::from(self.lock().cycle.stopped.clone())
    }

    fn advance(&self, from: Phase, to: Phase, pick: fn(&Cycle) -> &CancellationToken) -> bool {
        let mut state = self.lock();
        if state.phase != from {
            return false;
        }
        state.phase = to;
        // Fired under the lock so observers never see a later transition first.
        pick(&state.cycle).cancel();
        true
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for Latch {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Latch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock();
        f.debug_struct("Latch")
            .field("phase", &state.phase)
            .field("generation", &state.generation)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn run_cycle(latch: &Latch) {
        assert!(latch.starting());
        assert!(latch.started());
        assert!(latch.stopping());
        assert!(latch.stopped());
    }

    #[test]
    fn test_full_cycle_in_order() {
        let latch = Latch::new();
        assert_eq!(latch.phase(), Phase::Idle);
        assert!(latch.starting());
        assert_eq!(latch.phase(), Phase::Starting);
        assert!(latch.started());
        assert!(latch.is_running());
        assert!(latch.stopping());
        assert!(latch.is_stopping());
        assert!(!latch.is_running());
        assert!(latch.stopped());
        assert!(latch.is_stopped());
    }

    #[test]
    fn test_out_of_order_transitions_are_noops() {
        let latch = Latch::new();
        assert!(!latch.started());
        assert!(!latch.stopping());
        assert!(!latch.stopped());
        assert_eq!(latch.phase(), Phase::Idle);

        assert!(latch.starting());
        assert!(!latch.starting());
        assert!(!latch.stopping());
        assert_eq!(latch.phase(), Phase::Starting);

        assert!(latch.started());
        assert!(!latch.starting());
        assert!(!latch.stopped());
        assert_eq!(latch.phase(), Phase::Started);
    }

    #[test]
    fn test_repeated_transition_does_not_refire() {
        let latch = Latch::new();
        latch.starting();
        latch.started();
        let started = latch.notify_started();
        assert!(started.is_ready());

        assert!(!latch.started());
        assert_eq!(latch.phase(), Phase::Started);
        assert_eq!(latch.generation(), 0);
    }

    #[tokio::test]
    async fn test_each_signal_fires_once_per_cycle() {
        let latch = Latch::new();
        let started = latch.notify_started();
        let stopping = latch.notify_stopping();
        let stopped = latch.notify_stopped();

        latch.starting();
        assert!(!started.is_ready());
        latch.started();
        assert!(started.is_ready());
        assert!(!stopping.is_ready());
        latch.stopping();
        assert!(stopping.is_ready());
        assert!(!stopped.is_ready());
        latch.stopped();
        assert!(stopped.is_ready());

        started.wait().await;
        stopping.wait().await;
        stopped.wait().await;
    }

    #[tokio::test]
    async fn test_broadcast_reaches_every_waiter() {
        let latch = Arc::new(Latch::new());
        let seen = Arc::new(AtomicUsize::new(0));
        let mut handles = Vec::new();

        for _ in 0..16 {
            let signal = latch.notify_stopping();
            let seen = seen.clone();
            handles.push(tokio::spawn(async move {
                signal.wait().await;
                seen.fetch_add(1, Ordering::SeqCst);
            }));
        }

        latch.starting();
        latch.started();
        tokio::task::yield_now().await;
        assert_eq!(seen.load(Ordering::SeqCst), 0);

        latch.stopping();
        for h in handles {
            h.await.unwrap();
        }
        assert_eq!(seen.load(Ordering::SeqCst), 16);
    }

    #[tokio::test]
    async fn test_late_subscriber_in_same_cycle_is_released_immediately() {
        let latch = Latch::new();
        run_cycle(&latch);

        let late = latch.notify_stopped();
        assert!(late.is_ready());
        tokio::time::timeout(Duration::from_millis(50), late.wait())
            .await
            .expect("level-triggered signal must not block");
    }

    #[tokio::test]
    async fn test_new_cycle_has_fresh_signals() {
        let latch = Latch::new();
        run_cycle(&latch);
        let old = latch.notify_stopped();

        assert!(latch.starting());
        assert_eq!(latch.generation(), 1);
        let fresh = latch.notify_stopped();
        assert!(old.is_ready());
        assert!(!fresh.is_ready());
        assert!(!latch.notify_started().is_ready());

        latch.started();
        latch.stopping();
        latch.stopped();
        assert!(fresh.is_ready());
    }

    #[test]
    fn test_signal_taken_while_idle_belongs_to_first_cycle() {
        let latch = Latch::new();
        let started = latch.notify_started();
        latch.starting();
        latch.started();
        assert!(started.is_ready());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_transition_has_single_winner() {
        let latch = Arc::new(Latch::new());
        latch.starting();
        latch.started();

        let winners = Arc::new(AtomicUsize::new(0));
        let mut handles = Vec::new();
        for _ in 0..32 {
            let latch = latch.clone();
            let winners = winners.clone();
            handles.push(tokio::spawn(async move {
                if latch.stopping() {
                    winners.fetch_add(1, Ordering::SeqCst);
                }
            }));
        }
        for h in handles {
            h.await.unwrap();
        }
        assert_eq!(winners.load(Ordering::SeqCst), 1);
        assert!(latch.is_stopping());
    }
}
