//! The ready-rule: dataflow + staleness + routing.

use crate::graph::{Edge, Graph};
use crate::state::State;
use std::collections::HashMap;

/// Nodes ready to execute in the current state, in deterministic (name)
/// order. Interrupt nodes are singled out by the caller (only one may run
/// per superstep); this function just computes the raw ready set.
pub fn ready_nodes<V>(graph: &Graph<V>, state: &State<V>, active: &std::collections::HashSet<String>) -> Vec<String>
where
    V: Clone + PartialEq,
{
    let mut ready: Vec<String> = graph
        .node_names()
        .filter(|n| active.contains(*n))
        .filter(|n| is_ready(graph, state, n))
        .cloned()
        .collect();
    ready.sort();
    ready
}

fn is_ready<V>(graph: &Graph<V>, state: &State<V>, node_name: &str) -> bool
where
    V: Clone + PartialEq,
{
    let node = match graph.node(node_name) {
        Some(n) => n,
        None => return false,
    };

    if !inputs_satisfied(graph, state, node_name) {
        return false;
    }
    if !wait_for_satisfied(graph, state, node_name) {
        return false;
    }
    if !unrun_or_stale(graph, state, node_name) {
        return false;
    }
    if is_routed_around(graph, state, node_name) {
        return false;
    }
    true
}

fn inputs_satisfied<V>(graph: &Graph<V>, state: &State<V>, node_name: &str) -> bool {
    let node = graph.node(node_name).expect("ready check on known node");
    node.inputs().iter().all(|p| {
        state.values.contains_key(p) || node.has_default(p) || graph.bindings().contains_key(p)
    })
}

fn wait_for_satisfied<V>(graph: &Graph<V>, state: &State<V>, node_name: &str) -> bool {
    let node = graph.node(node_name).expect("ready check on known node");
    let last = state.node_executions.get(node_name);
    node.wait_for().iter().all(|w| {
        let current = state.emitted_versions.get(w).copied().unwrap_or(0);
        if current == 0 {
            return false;
        }
        let consumed_before = last.and_then(|l| l.wait_for_versions.get(w)).copied().unwrap_or(0);
        current > consumed_before
    })
}

fn unrun_or_stale<V>(graph: &Graph<V>, state: &State<V>, node_name: &str) -> bool
where
    V: Clone + PartialEq,
{
    let node = graph.node(node_name).expect("ready check on known node");
    match state.node_executions.get(node_name) {
        None => true,
        Some(last) => node.inputs().iter().any(|p| {
            let current = state.version_of(p);
            let consumed = last.consumed_versions.get(p).copied().unwrap_or(0);
            current != consumed
        }),
    }
}

/// Excluded iff every gate whose Control edge targets `node_name` has
/// decided and routed away from it. A node untouched by any gate, or
/// targeted by a gate that hasn't decided yet, is never excluded here.
fn is_routed_around<V>(graph: &Graph<V>, state: &State<V>, node_name: &str) -> bool {
    let gates_targeting: Vec<&str> = graph
        .edges()
        .iter()
        .filter_map(|e| match e {
            Edge::Control { gate, target } if target == node_name => Some(gate.as_str()),
            _ => None,
        })
        .collect();

    if gates_targeting.is_empty() {
        return false;
    }

    gates_targeting.iter().all(|gate| match state.routing_decisions.get(*gate) {
        Some(decision) => !decision.targets().contains(&node_name),
        None => false,
    })
}

/// Snapshot of version numbers consumed by a node this execution, for
/// recording into `NodeExecutionRecord` once outputs are applied.
pub fn consumed_versions<V>(graph: &Graph<V>, state: &State<V>, node_name: &str) -> HashMap<String, u64> {
    let node = graph.node(node_name).expect("consumed_versions on known node");
    node.inputs().iter().map(|p| (p.clone(), state.version_of(p))).collect()
}

pub fn wait_for_versions<V>(graph: &Graph<V>, state: &State<V>, node_name: &str) -> HashMap<String, u64> {
    let node = graph.node(node_name).expect("wait_for_versions on known node");
    node.wait_for()
        .iter()
        .map(|w| (w.clone(), state.emitted_versions.get(w).copied().unwrap_or(0)))
        .collect()
}
