//! Runtime core: joining routines, OS signals, and the outermost run loop.
//!
//! - [`join`]: [`first_to_finish`] and [`run_to_error`] combinators;
//! - [`shutdown`]: cross-platform termination signal handling;
//! - [`supervise`]: [`run_until_signal`], start-then-shutdown around a signal.

mod join;
mod shutdown;
mod supervise;

pub use join::{first_to_finish, run_to_error};
pub use shutdown::{ShutdownSignal, wait_for_shutdown_signal};
pub use supervise::run_until_signal;
