//! # One-shot broadcast notification.
//!
//! A [`Signal`] is a cloneable handle on one latch transition. Any number of
//! holders may wait on it; all of them are released by the single transition.
//!
//! ## Rules
//! - **Level-triggered**: once fired, `wait()` on any clone returns immediately.
//! - **Read-only**: holders cannot fire a signal; only the owning latch can.
//! - **Per cycle**: a signal belongs to the latch cycle it was obtained in.

use std::future::IntoFuture;

use tokio_util::sync::{CancellationToken, WaitForCancellationFutureOwned};

/// Read-only view of a one-shot transition.
///
/// Backed by a [`CancellationToken`], which already provides lock-free
/// broadcast to every waiter.
#[derive(Clone, Debug)]
pub struct Signal {
    token: CancellationToken,
}

impl Signal {
    /// Waits until the transition has fired.
    pub async fn wait(&self) {
        self.token.cancelled().await
    }

    /// Returns true if the transition has already fired.
    #[inline]
    pub fn is_ready(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl From<CancellationToken> for Signal {
    /// Wraps a token; the signal fires when the token is cancelled.
    fn from(token: CancellationToken) -> Self {
        Self { token }
    }
}

impl IntoFuture for Signal {
    type Output = ();
    type IntoFuture = WaitForCancellationFutureOwned;

    fn into_future(self) -> Self::IntoFuture {
        self.token.cancelled_owned()
    }
}
