//! # hypergraph-checkpoint — durable step log for hypergraph-rs
//!
//! A run's step log is the source of truth; state at any point is always a
//! fold of the steps recorded up to that point. This crate defines the
//! abstract [`Checkpointer`] contract plus [`InMemoryCheckpointer`], the only
//! backend it ships. On-disk persistence (SQLite, Postgres, ...) is a
//! caller-supplied implementation of the same trait.
//!
//! ## Key invariant
//!
//! `get_state(run_id, through) == fold(get_steps(run_id, through))`. Replaying
//! a run's steps in global-index order must always reproduce the same values
//! the scheduler produced live.

pub mod error;
pub mod memory;
pub mod policy;
pub mod traits;
pub mod types;

pub use error::{CheckpointError, Result};
pub use memory::{fold_steps, InMemoryCheckpointer};
pub use policy::{CheckpointPolicy, Durability, Retention};
pub use traits::Checkpointer;
pub use types::{Checkpoint, Decision, Run, RunStatus, StepRecord, StepStatus};
