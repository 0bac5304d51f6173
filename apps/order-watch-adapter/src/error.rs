//! Adapter-level errors.
//!
//! Only faults that a caller must act on surface here. Connection churn is
//! handled inside the connection manager and per-order validation failures
//! are reported as rejections.

use thiserror::Error;

use crate::domain::validation::ValidationResults;
use crate::infrastructure::mesh::MeshError;

/// Errors returned by [`crate::application::ports::OrderWatcherAdapter`] calls.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// A request on the current relay session failed.
    #[error("mesh request failed: {0}")]
    Mesh(#[from] MeshError),

    /// A chunked submission failed part-way.
    ///
    /// `completed` holds the results of every chunk that finished before
    /// `failed_chunk`. Orders from the failed chunk onwards have no result and
    /// must be re-submitted by the caller once the adapter reconnects.
    #[error("submission failed at chunk {failed_chunk} after {} completed orders: {source}", .completed.len())]
    PartialSubmission {
        /// Results of the chunks that completed.
        completed: ValidationResults,
        /// Zero-based index of the chunk that failed.
        failed_chunk: usize,
        /// Underlying failure.
        #[source]
        source: MeshError,
    },

    /// The adapter has been shut down.
    #[error("adapter is shut down")]
    ShutDown,
}

impl AdapterError {
    /// Results that completed before the failure, if any.
    #[must_use]
    pub const fn completed(&self) -> Option<&ValidationResults> {
        match self {
            Self::PartialSubmission { completed, .. } => Some(completed),
            Self::Mesh(_) | Self::ShutDown => None,
        }
    }
}
