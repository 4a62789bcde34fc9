//! # hypergraph-core - A dataflow graph execution engine
//!
//! A graph of nodes connected by *derived* edges — producer/consumer data
//! flow, routing-gate control flow, and emit/wait-for ordering signals are
//! all inferred from node declarations rather than wired by hand. Execution
//! proceeds in **supersteps** (Pregel-style): each round runs every node
//! whose inputs are satisfied and whose last execution (if any) is now
//! stale, merges outputs into a fresh state, and repeats until nothing more
//! is ready.
//!
//! ## Module Organization
//!
//! ### Graph construction
//! - [`graph`] - [`Graph`], the immutable node/edge collection
//! - [`node`] - node kinds: function, gate (n-ary/binary), interrupt, subgraph
//! - [`validation`] - construction-time checks (name legality, output
//!   conflicts, gate targets, type compatibility)
//! - [`input_spec`] - derives a graph's required/optional/seed inputs
//! - [`conflict`] - output-conflict resolution proofs (mutex gate, ordering)
//! - [`name`] - identifier legality rules shared by validation and the
//!   builder-style `with_*` methods
//!
//! ### Execution
//! - [`scheduler`] - the superstep loop, ready-rule, and per-node-kind
//!   executor
//! - [`state`] - per-run values, versions, and execution history
//! - [`validation_runtime`] - checks tied to the chosen scheduling mode
//!   rather than graph shape (e.g. concurrent + ordered-conflict resolution)
//! - [`runner`] - the `run`/`map` façades callers actually invoke
//!
//! ### Cross-cutting
//! - [`types`] - shared aliases (`Inputs`, `Outputs`) and the `ListValue`
//!   trait map-over needs
//! - [`cache`] - content-addressed node output cache
//! - [`events`] - structured event stream and the always-on trace collector
//! - [`error`] - construction-time and run-time error types
//!
//! ## Relationship to [`hypergraph_checkpoint`]
//!
//! This crate defines the scheduler and drives the event stream; durable
//! step history lives behind the [`hypergraph_checkpoint::Checkpointer`]
//! trait, implemented independently (the companion crate ships only an
//! in-memory backend).

pub mod cache;
pub mod conflict;
pub mod error;
pub mod events;
pub mod graph;
pub mod input_spec;
pub mod name;
pub mod node;
pub mod runner;
pub mod scheduler;
pub mod state;
pub mod types;
pub mod validation;
pub mod validation_runtime;

pub use error::{GraphConfigError, GraphError, Result};
pub use events::{DispatchMode, Event, EventDispatcher, EventMeta, EventProcessor, NodeTrace, RunLog};
pub use graph::{Edge, Graph};
pub use node::{
    BinaryGateNode, Decision, FunctionNode, GateNode, InterruptNode, MapConfig, MapMode, Node, NodeKind, SubgraphNode,
    TypeTag,
};
pub use runner::{map, run, CallOptions, RunResult};
pub use scheduler::{PauseInfo, RunOptions, Scheduler, SchedulingMode, StepOutcome};
pub use types::{ErrorHandling, Inputs, ListValue, Outputs};
