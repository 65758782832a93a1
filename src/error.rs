//! Error types used by the hostvisor runtime.
//!
//! This module defines two main error enums:
//!
//! - [`HealthzError`]: errors returned by the shutdown coordinator and its front door.
//! - [`WorkError`]: per-item failures reported by a [`Batch`](crate::Batch).
//!
//! Both provide `as_label` for logs. Hosted processes report failures as a
//! [`BoxError`], which the coordinator surfaces unchanged.

use std::net::SocketAddr;

use thiserror::Error;

/// Error type of the [`Hosted`](crate::Hosted) capability.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// # Errors produced by the shutdown coordinator.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum HealthzError {
    /// The hosted process failed to start or to shut down; passed through verbatim.
    #[error(transparent)]
    Hosted(BoxError),

    /// The front door could not bind its listen address.
    #[error("healthz failed to bind {addr}: {source}")]
    Bind {
        /// Configured bind address.
        addr: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The front door stopped serving with an I/O error.
    #[error("healthz server error on {addr}: {source}")]
    Serve {
        /// Address the server was listening on.
        addr: SocketAddr,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A concurrently run routine panicked or was aborted.
    #[error("joined routine failed: {0}")]
    Join(String),
}

impl HealthzError {
    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use hostvisor::HealthzError;
    ///
    /// let err = HealthzError::Join("boom".into());
    /// assert_eq!(err.as_label(), "healthz_join");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            HealthzError::Hosted(_) => "healthz_hosted",
            HealthzError::Bind { .. } => "healthz_bind",
            HealthzError::Serve { .. } => "healthz_serve",
            HealthzError::Join(_) => "healthz_join",
        }
    }
}

impl From<tokio::task::JoinError> for HealthzError {
    fn from(err: tokio::task::JoinError) -> Self {
        HealthzError::Join(err.to_string())
    }
}

/// # Errors produced while processing one work item.
///
/// Delivered to the batch error sink; never stops sibling workers.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorkError {
    /// The action returned an error for this item.
    #[error("work item failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// The action panicked; the worker caught it and kept serving.
    #[error("worker {worker} panicked: {info}")]
    Panicked {
        /// Worker index within the batch.
        worker: usize,
        /// Panic payload rendered as text.
        info: String,
    },
}

impl WorkError {
    /// Builds a [`WorkError::Fail`] from anything displayable.
    ///
    /// # Example
    /// ```
    /// use hostvisor::WorkError;
    ///
    /// let err = WorkError::fail("disk full");
    /// assert_eq!(err.to_string(), "work item failed: disk full");
    /// ```
    pub fn fail(error: impl std::fmt::Display) -> Self {
        WorkError::Fail {
            error: error.to_string(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            WorkError::Fail { .. } => "work_failed",
            WorkError::Panicked { .. } => "work_panicked",
        }
    }
}

/// Renders a panic payload as text.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
