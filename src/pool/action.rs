//! # Work actions
//!
//! An [`Action`] processes one work item and reports failure as a
//! [`WorkError`]. [`ActionFn`] wraps a closure `F: Fn(T) -> Fut`, producing a
//! fresh future per item; shared state goes into an explicit `Arc<...>` inside
//! the closure.
//!
//! ## Example
//! ```rust
//! use hostvisor::{ActionFn, ActionRef, WorkError};
//!
//! let double: ActionRef<u32> = ActionFn::arc(|n: u32| async move {
//!     if n == 0 {
//!         return Err(WorkError::fail("zero"));
//!     }
//!     let _ = n * 2;
//!     Ok(())
//! });
//! # let _ = double;
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::error::WorkError;

/// Boxed future returned by [`Action::call`].
pub type BoxWorkFuture = Pin<Box<dyn Future<Output = Result<(), WorkError>> + Send + 'static>>;

/// Shared handle to an action.
pub type ActionRef<T> = Arc<dyn Action<T>>;

/// Processes a single work item.
pub trait Action<T>: Send + Sync + 'static {
    /// Starts processing `item`.
    fn call(&self, item: T) -> BoxWorkFuture;
}

/// Function-backed action.
#[derive(Debug)]
pub struct ActionFn<F> {
    f: F,
}

impl<F> ActionFn<F> {
    /// Wraps a closure.
    pub fn new(f: F) -> Self {
        Self { f }
    }

    /// Wraps a closure and returns it as a shared handle.
    pub fn arc(f: F) -> Arc<Self> {
        Arc::new(Self::new(f))
    }
}

impl<T, F, Fut> Action<T> for ActionFn<F>
where
    F: Fn(T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), WorkError>> + Send + 'static,
{
    fn call(&self, item: T) -> BoxWorkFuture {
        Box::pin((self.f)(item))
    }
}
