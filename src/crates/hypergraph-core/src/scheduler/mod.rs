//! The scheduler: drives supersteps, honoring the ready-rule, gate
//! decisions, caching, checkpointing, and the event stream.

pub mod executor;
pub mod loop_impl;
pub mod ready;

pub use loop_impl::Scheduler;

use crate::cache::CacheBackend;
use crate::events::{AsyncEventProcessor, DispatchMode, EventProcessor};
use crate::types::ErrorHandling;
use hypergraph_checkpoint::{Checkpointer, CheckpointPolicy};
use std::sync::Arc;

/// Node scheduling model, chosen at runner construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulingMode {
    /// One node at a time, deterministic order, single thread.
    Sequential,
    /// A superstep's ready nodes run as independent tasks. `max_concurrency
    /// = Some(0)` is treated as sequential per the documented open question.
    Concurrent,
}

/// Everything a `run`/`map` call can configure.
pub struct RunOptions<V> {
    pub scheduling_mode: SchedulingMode,
    pub max_iterations: u32,
    pub error_handling: ErrorHandling,
    pub dispatch_mode: DispatchMode,
    pub cache: Option<Arc<dyn CacheBackend<V>>>,
    pub checkpointer: Option<Arc<dyn Checkpointer<V>>>,
    pub checkpoint_policy: CheckpointPolicy,
    pub max_concurrency: Option<usize>,
    pub workflow_id: Option<String>,
    pub parent_span_id: Option<String>,
    /// Caller-supplied processors fanned events out to, in addition to the
    /// always-on trace collector.
    pub event_processors: Vec<Arc<dyn EventProcessor>>,
    pub async_event_processors: Vec<Arc<dyn AsyncEventProcessor>>,
}

impl<V> Default for RunOptions<V> {
    fn default() -> Self {
        Self {
            scheduling_mode: SchedulingMode::Sequential,
            max_iterations: 1000,
            error_handling: ErrorHandling::Raise,
            dispatch_mode: DispatchMode::BestEffort,
            cache: None,
            checkpointer: None,
            checkpoint_policy: CheckpointPolicy::default(),
            max_concurrency: None,
            workflow_id: None,
            parent_span_id: None,
            event_processors: Vec::new(),
            async_event_processors: Vec::new(),
        }
    }
}

/// A pause descriptor, surfaced to the caller when an interrupt node fires
/// without a pre-supplied response or handler.
#[derive(Debug, Clone)]
pub struct PauseInfo<V> {
    /// Slash-joined path for nested subgraphs, e.g. `outer/inner/ask_human`.
    pub node_path: String,
    pub input_param: String,
    pub output_param: String,
    pub surfaced_value: V,
}

/// The outcome of executing one ready node during a superstep.
///
/// A first-class enum, not an error channel: a pause is not a
/// `GraphError`, so it can never be silently swallowed by a generic `?`.
pub enum StepOutcome<V> {
    Completed {
        outputs: crate::types::Outputs<V>,
        decision: Option<crate::node::Decision>,
        cached: bool,
        duration_ms: f64,
        nested_run_id: Option<String>,
    },
    Paused(PauseInfo<V>),
    Failed(crate::error::GraphError),
}
