//! Step records and run metadata — the checkpointer's on-the-wire types.
//!
//! Steps are the source of truth; state is always computed by folding a
//! run's steps in global-index order (see [`crate::memory::fold_steps`]).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Outcome of a single node execution attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepStatus {
    /// The node produced outputs without error.
    Completed,
    /// The node raised; `StepRecord::error` carries the message.
    Failed,
}

/// Lifecycle status of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStatus {
    /// Still executing (or paused, pending resume).
    Active,
    /// Finished successfully.
    Completed,
    /// Finished with an unrecovered error.
    Failed,
}

/// A routing gate's decision, as persisted in a step record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Decision {
    /// A single-target or terminal decision.
    Single(String),
    /// A multi-target gate's decision.
    Multi(Vec<String>),
}

/// The atomic, append-only unit written by a checkpointer after each node
/// execution attempt.
///
/// The unique key is `(run_id, superstep, node_name)`; saving twice with the
/// same key is an upsert (tolerating at-least-once delivery from a
/// checkpointer configured with `durability = async`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepRecord<V> {
    /// Run this step belongs to.
    pub run_id: String,
    /// Superstep index (0-based) the node executed in.
    pub superstep: u32,
    /// Global, monotonically increasing index across the whole run.
    pub index: u64,
    /// Name of the executed node.
    pub node_name: String,
    /// Node kind tag, for display/filtering (`"function"`, `"route"`, ...).
    pub node_kind: String,
    /// Whether the node completed or failed.
    pub status: StepStatus,
    /// Versions of each input the node consumed, captured before execution.
    pub consumed_input_versions: HashMap<String, u64>,
    /// Output values produced, if the node completed. `None` on failure.
    pub values: Option<HashMap<String, V>>,
    /// Wall-clock execution time.
    pub duration_ms: f64,
    /// Whether this step's outputs were served from cache.
    pub cached: bool,
    /// Routing decision, for gate nodes.
    pub decision: Option<Decision>,
    /// Error message, if `status == Failed`.
    pub error: Option<String>,
    /// When execution of this node started.
    pub created_at: DateTime<Utc>,
    /// When execution of this node finished.
    pub completed_at: Option<DateTime<Utc>>,
    /// Run id of a nested subgraph invocation dispatched by this node, if any.
    pub nested_run_id: Option<String>,
}

/// Metadata record for a run, independent of its step history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Run {
    /// Opaque run identifier.
    pub id: String,
    /// Current lifecycle status.
    pub status: RunStatus,
    /// Name of the graph executed, if the graph was named.
    pub graph_name: Option<String>,
    /// When the run was created.
    pub created_at: DateTime<Utc>,
    /// When the run reached a terminal status, if it has.
    pub completed_at: Option<DateTime<Utc>>,
}

/// Point-in-time snapshot used to fork a run: folded state plus the steps
/// that produced it.
#[derive(Debug, Clone)]
pub struct Checkpoint<V> {
    /// Folded values through the requested superstep.
    pub values: HashMap<String, V>,
    /// The steps that were folded to produce `values`.
    pub steps: Vec<StepRecord<V>>,
}
