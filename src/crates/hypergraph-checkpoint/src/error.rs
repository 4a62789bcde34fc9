//! Error types for checkpoint operations.

use thiserror::Error;

/// Result type for checkpoint operations.
pub type Result<T> = std::result::Result<T, CheckpointError>;

/// Errors that can occur while saving, reading, or configuring checkpoints.
#[derive(Error, Debug)]
pub enum CheckpointError {
    /// No run exists with the given id.
    #[error("run not found: {0}")]
    RunNotFound(String),

    /// A step referenced a superstep/run combination that doesn't exist.
    #[error("no steps recorded for run {run_id} through superstep {superstep:?}")]
    StepNotFound {
        /// Run the caller asked about.
        run_id: String,
        /// Superstep bound passed to the query, if any.
        superstep: Option<u32>,
    },

    /// `CheckpointPolicy` construction violated an invariant (see policy.rs).
    #[error("invalid checkpoint policy: {0}")]
    InvalidPolicy(String),

    /// Failed to serialize a step's produced values for storage.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Backend-specific storage failure (connection, disk, permissions, ...).
    #[error("storage error: {0}")]
    Storage(String),

    /// Application-defined error from a custom `Checkpointer` implementation.
    #[error("{0}")]
    Custom(String),
}
