//! Routing gates: nodes that compute a *decision* rather than data.

use crate::error::GraphError;
use crate::name::TERMINAL;
use crate::types::{BoxFuture, Inputs};
use sha2::{Digest, Sha256};
use std::sync::Arc;

/// A gate's routing decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Route to exactly one target (or [`TERMINAL`]).
    Single(String),
    /// Route to a set of targets (multi-target N-way gates only).
    Multi(Vec<String>),
}

impl Decision {
    pub fn terminal() -> Self {
        Decision::Single(TERMINAL.to_string())
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Decision::Single(t) if t == TERMINAL)
    }

    /// The target names this decision selects (empty for a terminal).
    pub fn targets(&self) -> Vec<&str> {
        match self {
            Decision::Single(t) if t == TERMINAL => Vec::new(),
            Decision::Single(t) => vec![t.as_str()],
            Decision::Multi(ts) => ts.iter().map(|s| s.as_str()).collect(),
        }
    }
}

impl From<Decision> for hypergraph_checkpoint::Decision {
    fn from(d: Decision) -> Self {
        match d {
            Decision::Single(s) => hypergraph_checkpoint::Decision::Single(s),
            Decision::Multi(v) => hypergraph_checkpoint::Decision::Multi(v),
        }
    }
}

type RouteFn<V> =
    Arc<dyn Fn(&Inputs<V>) -> BoxFuture<'static, Result<Decision, GraphError>> + Send + Sync>;

/// An N-way routing gate: the routing function returns a single target, a
/// set of targets (`multi_target = true`), or the terminal sentinel.
#[derive(Clone)]
pub struct GateNode<V> {
    pub(crate) route_fn: RouteFn<V>,
    pub(crate) targets: Vec<String>,
    pub(crate) multi_target: bool,
    pub(crate) fallback: Option<Decision>,
}

impl<V> GateNode<V> {
    pub fn new(route_fn: RouteFn<V>, targets: Vec<String>, multi_target: bool) -> Self {
        Self {
            route_fn,
            targets,
            multi_target,
            fallback: None,
        }
    }

    pub fn with_fallback(mut self, fallback: Decision) -> Self {
        self.fallback = Some(fallback);
        self
    }

    pub fn targets(&self) -> &[String] {
        &self.targets
    }

    /// Validate a computed decision is in the declared target set and of
    /// the right cardinality for this gate.
    pub fn validate_decision(&self, decision: &Decision) -> Result<(), String> {
        match decision {
            Decision::Single(t) if t == TERMINAL => Ok(()),
            Decision::Single(t) => {
                if self.targets.contains(t) {
                    Ok(())
                } else {
                    Err(format!("target '{t}' is not in the declared target set {:?}", self.targets))
                }
            }
            Decision::Multi(ts) => {
                if !self.multi_target {
                    return Err("gate is single-target; routing function returned a list".to_string());
                }
                for t in ts {
                    if !self.targets.contains(t) {
                        return Err(format!(
                            "target '{t}' is not in the declared target set {:?}",
                            self.targets
                        ));
                    }
                }
                Ok(())
            }
        }
    }

    pub fn definition_hash(&self, name: &str, inputs: &[String], outputs: &[String]) -> String {
        gate_definition_hash("gate", name, inputs, outputs)
    }
}

type BinaryRouteFn<V> =
    Arc<dyn Fn(&Inputs<V>) -> BoxFuture<'static, Result<bool, GraphError>> + Send + Sync>;

/// A binary routing gate: maps `true`/`false` to one of two target names
/// (either of which may be [`TERMINAL`]).
#[derive(Clone)]
pub struct BinaryGateNode<V> {
    pub(crate) route_fn: BinaryRouteFn<V>,
    pub(crate) on_true: String,
    pub(crate) on_false: String,
}

impl<V> BinaryGateNode<V> {
    pub fn new(route_fn: BinaryRouteFn<V>, on_true: String, on_false: String) -> Self {
        Self {
            route_fn,
            on_true,
            on_false,
        }
    }

    pub fn targets(&self) -> Vec<String> {
        [&self.on_true, &self.on_false]
            .into_iter()
            .filter(|t| t.as_str() != TERMINAL)
            .cloned()
            .collect()
    }

    pub fn decide(&self, value: bool) -> Decision {
        let target = if value { &self.on_true } else { &self.on_false };
        Decision::Single(target.clone())
    }

    pub fn definition_hash(&self, name: &str, inputs: &[String], outputs: &[String]) -> String {
        gate_definition_hash("binary_gate", name, inputs, outputs)
    }
}

fn gate_definition_hash(tag: &str, name: &str, inputs: &[String], outputs: &[String]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(tag.as_bytes());
    hasher.update(name.as_bytes());
    for i in inputs {
        hasher.update(i.as_bytes());
    }
    for o in outputs {
        hasher.update(o.as_bytes());
    }
    hex::encode(hasher.finalize())
}
