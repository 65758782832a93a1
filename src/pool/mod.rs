//! Fixed-size worker pool.
//!
//! - [`Batch`]: distributes items to a fixed set of workers through a ready queue
//! - [`BatchConfig`]: worker count and component name
//! - [`Action`], [`ActionFn`], [`ActionRef`]: what a worker runs per item
//! - [`BatchReport`], [`BatchStop`]: outcome and remote stop of one run

mod action;
mod batch;
mod config;
mod worker;

pub use action::{Action, ActionFn, ActionRef, BoxWorkFuture};
pub use batch::{Batch, BatchReport, BatchStop};
pub use config::{BatchConfig, default_workers};
