//! Error types for graph construction and execution.
//!
//! Construction-time problems (`GraphConfigError`) and run-time problems
//! (`GraphError`) are kept separate: a graph that built successfully can
//! still fail, pause, or hit the infinite-loop guard while running, and
//! those are distinct failure modes from "this graph could never have run".

use thiserror::Error;

/// Convenience result type using [`GraphError`].
pub type Result<T> = std::result::Result<T, GraphError>;

/// Problems detected while constructing or validating a graph.
///
/// Every variant names the offending symbol(s); most suggest a remediation
/// in the message itself since there's no interactive fixup step.
#[derive(Error, Debug, Clone)]
pub enum GraphConfigError {
    /// A node, parameter, or output name is not a legal identifier.
    #[error("illegal {kind} name '{name}': must start with a letter or underscore and contain only alphanumerics/underscore")]
    IllegalName { name: String, kind: String },

    /// A node, parameter, or output name collides with a reserved word.
    #[error("'{name}' cannot be used as a {kind} name: it is reserved")]
    ReservedName { name: String, kind: String },

    /// A graph name contains a path separator.
    #[error("graph name '{0}' must not contain '.' or '/'")]
    IllegalGraphName(String),

    /// Two nodes share a name.
    #[error("duplicate node name: '{0}'")]
    DuplicateNode(String),

    /// A subgraph node's name collides with an output produced elsewhere.
    #[error("subgraph node '{node}' collides with output '{output}' produced elsewhere in the graph")]
    SubgraphOutputCollision { node: String, output: String },

    /// A shared input parameter has inconsistent signature defaults across
    /// the nodes that declare it.
    #[error("input '{param}' has inconsistent signature defaults across nodes {nodes:?}: either give all of them the same default, or none")]
    InconsistentDefault { param: String, nodes: Vec<String> },

    /// A routing gate names a target that does not exist in the node set.
    #[error("gate '{gate}' targets unknown node '{target}'")]
    UnresolvedGateTarget { gate: String, target: String },

    /// `with_entrypoint`/`select` referenced a node or output that doesn't
    /// exist in the graph.
    #[error("{operation} referenced unknown {kind} '{name}'")]
    UnknownReference {
        operation: String,
        kind: String,
        name: String,
    },

    /// A routing gate names itself as a target.
    #[error("gate '{0}' may not target itself")]
    GateSelfTarget(String),

    /// An output is produced by multiple nodes with no mutex/ordering proof.
    #[error("output '{output}' is produced by both '{producer_a}' and '{producer_b}' with no exclusive gate or deterministic ordering between them; bind one, route through an exclusive gate, or reroute")]
    UnresolvedOutputConflict {
        output: String,
        producer_a: String,
        producer_b: String,
    },

    /// Strict-type checking is enabled and a data edge connects incompatible
    /// or unannotated types.
    #[error("type mismatch on edge {producer}.{output} -> {consumer}.{input}: {reason}")]
    TypeMismatch {
        producer: String,
        output: String,
        consumer: String,
        input: String,
        reason: String,
    },

    /// A gate or subgraph node was configured with caching enabled, which
    /// is disallowed for those kinds.
    #[error("node '{0}' may not enable caching: only function (and opted-in interrupt) nodes are cacheable")]
    CacheNotAllowed(String),

    /// A signature default is a value the runtime cannot safely clone
    /// per-execution (e.g. it holds a lock); caller should `bind` instead.
    #[error("signature default for input '{param}' on node '{node}' is not safely cloneable; use bind(...) instead")]
    NonCopyableDefault { node: String, param: String },

    /// A rename targeted a name that is no longer present on the node,
    /// surfaced with the chain of renames that led here for diagnostics.
    #[error("cannot rename '{from}': it no longer exists (rename chain: {chain:?})")]
    UnknownRenameSource { from: String, chain: Vec<String> },

    /// A rename batch would introduce a duplicate name.
    #[error("rename would produce duplicate name '{0}'")]
    DuplicateRenameTarget(String),
}

/// Problems detected while running a graph.
#[derive(Error, Debug)]
pub enum GraphError {
    /// Build-time validation failed.
    #[error(transparent)]
    Config(#[from] GraphConfigError),

    /// A required parameter was not supplied at run time.
    #[error("missing required input(s) {missing:?}; supplied: {supplied:?}")]
    MissingInput {
        missing: Vec<String>,
        supplied: Vec<String>,
    },

    /// A routing gate returned a target outside its declared set, or a
    /// value of the wrong cardinality.
    #[error("gate '{gate}' returned invalid decision {decision:?}: {reason}")]
    RouteInvalid {
        gate: String,
        decision: String,
        reason: String,
    },

    /// `max_iterations` was exceeded while ready nodes still remained.
    #[error("exceeded max_iterations ({max_iterations}) with ready nodes still pending: {pending:?}")]
    InfiniteLoop {
        max_iterations: u32,
        pending: Vec<String>,
    },

    /// The underlying callable of a function (or interrupt handler) node
    /// raised. Carries the partial state captured at superstep entry plus
    /// sibling outputs that did complete in the same superstep.
    #[error("node '{node}' execution failed: {source}")]
    NodeExecution {
        node: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The graph uses a feature the chosen runner does not support (e.g.
    /// an async node under a strictly-synchronous runner).
    #[error("runner does not support: {0}")]
    IncompatibleRunner(String),

    /// A checkpointer operation failed.
    #[error("checkpoint error: {0}")]
    Checkpoint(#[from] hypergraph_checkpoint::CheckpointError),

    /// Failed to serialize a value at the cache or checkpoint boundary.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Application-defined error.
    #[error("{0}")]
    Custom(String),
}

impl GraphError {
    /// Build a [`GraphError::NodeExecution`] from any boxable error.
    pub fn node_execution(
        node: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::NodeExecution {
            node: node.into(),
            source: source.into(),
        }
    }

    /// Build a [`GraphError::MissingInput`].
    pub fn missing_input(missing: Vec<String>, supplied: Vec<String>) -> Self {
        Self::MissingInput { missing, supplied }
    }
}
