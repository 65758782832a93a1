//! # Joining concurrent routines.
//!
//! Two ways of running a pair of fallible routines side by side:
//!
//! - [`first_to_finish`]: spawns both, returns the outcome of whichever ends
//!   first. The other one keeps running detached; it is not aborted.
//! - [`run_to_error`]: polls both to completion, returns the first error (in
//!   argument order) or `Ok`.

use std::future::Future;

use tokio::task::JoinError;

/// Runs `a` and `b` as separate tasks and returns the first result.
///
/// The slower routine is left running. A panic in the winning task is
/// reported through `E: From<JoinError>`.
pub async fn first_to_finish<T, E, A, B>(a: A, b: B) -> Result<T, E>
where
    A: Future<Output = Result<T, E>> + Send + 'static,
    B: Future<Output = Result<T, E>> + Send + 'static,
    T: Send + 'static,
    E: From<JoinError> + Send + 'static,
{
    let mut a = tokio::spawn(a);
    let mut b = tokio::spawn(b);

    // Dropping a JoinHandle detaches its task.
    let joined = tokio::select! {
        res = &mut a => res,
        res = &mut b => res,
    };
    joined?
}

/// Runs `a` and `b` concurrently until both are done.
///
/// Returns the first error encountered, preferring `a`'s.
pub async fn run_to_error<E, A, B>(a: A, b: B) -> Result<(), E>
where
    A: Future<Output = Result<(), E>>,
    B: Future<Output = Result<(), E>>,
{
    let (ra, rb) = tokio::join!(a, b);
    ra.and(rb)
}
