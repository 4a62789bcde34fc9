//! Per-run state: values, monotonic versions, and execution history.

use crate::node::Decision;
use std::collections::HashMap;

/// Evidence of a node's last execution: which input versions it consumed
/// and what it produced, used by the ready-rule's staleness check.
#[derive(Debug, Clone)]
pub struct NodeExecutionRecord<V> {
    pub consumed_versions: HashMap<String, u64>,
    pub outputs: HashMap<String, V>,
    /// Versions of `wait_for` names observed at the start of this
    /// execution, for the wait-for freshness check.
    pub wait_for_versions: HashMap<String, u64>,
}

/// The full per-run state, copied between supersteps.
#[derive(Debug, Clone)]
pub struct State<V> {
    pub values: HashMap<String, V>,
    pub versions: HashMap<String, u64>,
    pub node_executions: HashMap<String, NodeExecutionRecord<V>>,
    pub routing_decisions: HashMap<String, Decision>,
    /// Monotonic counters for `emit` signal names: no associated value,
    /// just "this producer has run N times since the state existed". This
    /// is what `wait_for` checks against, since emits carry no data.
    pub emitted_versions: HashMap<String, u64>,
}

// Written by hand rather than `#[derive(Default)]`: the derive macro adds
// a `V: Default` bound even though every field here is a `HashMap`, which
// is `Default` regardless of `V`. That would force every value type to
// implement `Default` just to call `State::new()`.
impl<V> Default for State<V> {
    fn default() -> Self {
        Self {
            values: HashMap::new(),
            versions: HashMap::new(),
            node_executions: HashMap::new(),
            routing_decisions: HashMap::new(),
            emitted_versions: HashMap::new(),
        }
    }
}

impl<V> State<V>
where
    V: Clone + PartialEq,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the state from the values provided at the start of a run. Each
    /// provided name's version becomes `1`.
    pub fn seed(&mut self, values: HashMap<String, V>) {
        for (name, value) in values {
            self.versions.insert(name.clone(), 1);
            self.values.insert(name, value);
        }
    }

    /// Merge one superstep's outputs into this state, incrementing a
    /// value's version only when it actually changed (or is new).
    pub fn merge_outputs(&mut self, outputs: HashMap<String, V>) {
        for (name, value) in outputs {
            let changed = match self.values.get(&name) {
                Some(existing) => existing != &value,
                None => true,
            };
            if changed {
                *self.versions.entry(name.clone()).or_insert(0) += 1;
            } else if !self.versions.contains_key(&name) {
                self.versions.insert(name.clone(), 1);
            }
            self.values.insert(name, value);
        }
    }

    pub fn version_of(&self, name: &str) -> u64 {
        self.versions.get(name).copied().unwrap_or(0)
    }

    pub fn record_execution(
        &mut self,
        node: &str,
        consumed_versions: HashMap<String, u64>,
        outputs: HashMap<String, V>,
        wait_for_versions: HashMap<String, u64>,
    ) {
        self.node_executions.insert(
            node.to_string(),
            NodeExecutionRecord {
                consumed_versions,
                outputs,
                wait_for_versions,
            },
        );
    }

    pub fn record_decision(&mut self, gate: &str, decision: Decision) {
        self.routing_decisions.insert(gate.to_string(), decision);
    }

    /// Bump the emit counter for each signal name a producer declares,
    /// once per execution, regardless of whether its data outputs changed.
    pub fn record_emits(&mut self, emits: &[String]) {
        for name in emits {
            *self.emitted_versions.entry(name.clone()).or_insert(0) += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_outputs_increments_version_only_on_change() {
        let mut state: State<i64> = State::new();
        state.merge_outputs(HashMap::from([("x".to_string(), 1)]));
        assert_eq!(state.version_of("x"), 1);

        state.merge_outputs(HashMap::from([("x".to_string(), 1)]));
        assert_eq!(state.version_of("x"), 1, "unchanged value must not bump version");

        state.merge_outputs(HashMap::from([("x".to_string(), 2)]));
        assert_eq!(state.version_of("x"), 2);
    }

    #[test]
    fn version_never_decreases() {
        let mut state: State<i64> = State::new();
        state.merge_outputs(HashMap::from([("x".to_string(), 1)]));
        state.merge_outputs(HashMap::from([("x".to_string(), 2)]));
        state.merge_outputs(HashMap::from([("x".to_string(), 2)]));
        assert_eq!(state.version_of("x"), 2);
    }
}
