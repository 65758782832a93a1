//! # Batch configuration.
//!
//! ## Field semantics
//! - `workers`: number of workers spawned at `process()` entry (`0` is clamped to 1)
//! - `name`: component name attached to every event the batch publishes

use std::sync::Arc;

/// Configuration of a [`Batch`](crate::Batch).
///
/// All fields are public; prefer [`BatchConfig::workers_clamped`] over reading
/// `workers` directly.
#[derive(Clone, Debug)]
pub struct BatchConfig {
    /// Number of concurrently running actions.
    ///
    /// Defaults to the host's available parallelism.
    pub workers: usize,

    /// Component name used in events and logs.
    pub name: Arc<str>,
}

impl BatchConfig {
    /// Worker count clamped to a minimum of 1.
    #[inline]
    pub fn workers_clamped(&self) -> usize {
        self.workers.max(1)
    }
}

impl Default for BatchConfig {
    /// Default configuration:
    ///
    /// - `workers = available_parallelism()` (1 if unknown)
    /// - `name = "batch"`
    fn default() -> Self {
        Self {
            workers: default_workers(),
            name: Arc::from("batch"),
        }
    }
}

/// Host parallelism, or 1 when it cannot be determined.
pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_workers_clamped() {
        let cfg = BatchConfig {
            workers: 0,
            ..BatchConfig::default()
        };
        assert_eq!(cfg.workers_clamped(), 1);
        assert!(BatchConfig::default().workers >= 1);
    }
}
