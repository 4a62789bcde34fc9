//! Compatibility checks tied to the chosen scheduling mode rather than
//! graph construction (those live in `validation.rs`).

use crate::error::{GraphError, Result};
use crate::graph::{Edge, Graph};
use crate::scheduler::SchedulingMode;

/// Ordered (non-mutex) output-conflict resolution relies on the scheduler
/// running producers one at a time, in edge order; concurrent scheduling
/// would make that order nondeterministic. Reject the combination up
/// front rather than let it race silently.
pub fn check_runner_compatibility<V>(graph: &Graph<V>, mode: SchedulingMode) -> Result<()> {
    if mode != SchedulingMode::Concurrent {
        return Ok(());
    }
    if graph.edges().iter().any(|e| matches!(e, Edge::Ordering { .. })) {
        return Err(GraphError::IncompatibleRunner(
            "concurrent scheduling is incompatible with ordered output-conflict resolution; use Sequential".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{FunctionNode, Node, NodeKind};
    use std::sync::Arc;

    fn noop_function(discriminant: &str) -> FunctionNode<i64> {
        FunctionNode::new(
            Arc::new(|_: &crate::types::Inputs<i64>| Box::pin(async { Ok(crate::types::Outputs::new()) })),
            discriminant,
        )
    }

    #[test]
    fn sequential_always_compatible() {
        let graph: Graph<i64> = Graph::new(vec![], None, false).unwrap();
        assert!(check_runner_compatibility(&graph, SchedulingMode::Sequential).is_ok());
    }

    #[test]
    fn concurrent_rejects_ordered_edges() {
        let node_a = Node::new("a", NodeKind::Function(noop_function("a")), vec![], vec![])
            .unwrap()
            .with_emit(vec!["signal".to_string()]);
        let node_b = Node::new("b", NodeKind::Function(noop_function("b")), vec![], vec![])
            .unwrap()
            .with_wait_for(vec!["signal".to_string()]);
        let graph = Graph::new(vec![node_a, node_b], None, false).unwrap();
        assert!(check_runner_compatibility(&graph, SchedulingMode::Concurrent).is_err());
    }
}
