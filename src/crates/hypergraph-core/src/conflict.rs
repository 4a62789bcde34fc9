//! Multi-producer output conflict resolution (mutex-or-ordered).
//!
//! Grounded on the exclusive-reachability-counting approach: a single
//! forward pass from each gate target counts how many targets can reach
//! each node; a node reachable from exactly one target is exclusive to it.

use crate::error::{GraphConfigError, Result};
use crate::graph::Edge;
use crate::node::{Node, NodeKind};
use std::collections::{HashMap, HashSet};

pub fn check_output_conflicts<V>(
    nodes: &HashMap<String, Node<V>>,
    _order: &[String],
    edges: &[Edge],
    producers_of: &HashMap<String, Vec<String>>,
) -> Result<()> {
    let gate_targets = collect_mutex_gate_targets(nodes, edges);

    for (output, producers) in producers_of {
        if producers.len() < 2 {
            continue;
        }
        for i in 0..producers.len() {
            for j in (i + 1)..producers.len() {
                let a = &producers[i];
                let b = &producers[j];
                if mutex_holds(a, b, &gate_targets, edges) || ordered_holds(a, b, output, edges) {
                    continue;
                }
                return Err(GraphConfigError::UnresolvedOutputConflict {
                    output: output.clone(),
                    producer_a: a.clone(),
                    producer_b: b.clone(),
                }
                .into());
            }
        }
    }
    Ok(())
}

/// Gates eligible to prove mutex exclusivity: N-way gates with
/// `multi_target = false`, and binary gates (always exclusive by
/// construction). Maps gate name -> its target list.
fn collect_mutex_gate_targets<V>(nodes: &HashMap<String, Node<V>>, _edges: &[Edge]) -> Vec<(String, Vec<String>)> {
    let mut out = Vec::new();
    for node in nodes.values() {
        match node.kind() {
            NodeKind::GateN(g) if !g.multi_target => {
                out.push((node.name().to_string(), g.targets().to_vec()));
            }
            NodeKind::GateBinary(g) => {
                out.push((node.name().to_string(), g.targets()));
            }
            _ => {}
        }
    }
    out
}

fn mutex_holds(a: &str, b: &str, gate_targets: &[(String, Vec<String>)], edges: &[Edge]) -> bool {
    for (_, targets) in gate_targets {
        if !targets.iter().any(|t| t == a) || !targets.iter().any(|t| t == b) {
            continue;
        }
        // Exclusive reachability: count, per node, how many of this gate's
        // targets can reach it.
        let mut reach_count: HashMap<String, Vec<&str>> = HashMap::new();
        for target in targets {
            for reached in forward_reachable(target, edges) {
                reach_count.entry(reached).or_default().push(target.as_str());
            }
        }
        let a_exclusive = reach_count.get(a).filter(|ts| ts.len() == 1).map(|ts| ts[0]);
        let b_exclusive = reach_count.get(b).filter(|ts| ts.len() == 1).map(|ts| ts[0]);
        if let (Some(ta), Some(tb)) = (a_exclusive, b_exclusive) {
            if ta != tb {
                return true;
            }
        }
    }
    false
}

fn ordered_holds(a: &str, b: &str, contested_output: &str, edges: &[Edge]) -> bool {
    let filtered: Vec<&Edge> = edges
        .iter()
        .filter(|e| !matches!(e, Edge::Data { value_name, .. } if value_name == contested_output))
        .collect();

    reachable_in(a, b, &filtered) || reachable_in(b, a, &filtered)
}

fn forward_reachable(start: &str, edges: &[Edge]) -> HashSet<String> {
    let mut seen = HashSet::new();
    let mut queue = vec![start.to_string()];
    while let Some(current) = queue.pop() {
        if !seen.insert(current.clone()) {
            continue;
        }
        for next in successors(&current, edges) {
            queue.push(next);
        }
    }
    seen
}

fn reachable_in(start: &str, goal: &str, edges: &[&Edge]) -> bool {
    let mut seen = HashSet::new();
    let mut queue = vec![start.to_string()];
    while let Some(current) = queue.pop() {
        if current == goal && current != start {
            return true;
        }
        if !seen.insert(current.clone()) {
            continue;
        }
        for edge in edges {
            let next = match edge {
                Edge::Data { producer, consumer, .. } if producer == &current => Some(consumer.clone()),
                Edge::Control { gate, target } if gate == &current => Some(target.clone()),
                Edge::Ordering { producer, consumer, .. } if producer == &current => Some(consumer.clone()),
                _ => None,
            };
            if let Some(n) = next {
                if n == goal {
                    return true;
                }
                queue.push(n);
            }
        }
    }
    false
}

fn successors(node: &str, edges: &[Edge]) -> Vec<String> {
    edges
        .iter()
        .filter_map(|e| match e {
            Edge::Data { producer, consumer, .. } if producer == node => Some(consumer.clone()),
            Edge::Control { gate, target } if gate == node => Some(target.clone()),
            Edge::Ordering { producer, consumer, .. } if producer == node => Some(consumer.clone()),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_reachable_includes_start() {
        let edges = vec![Edge::Data {
            producer: "a".to_string(),
            consumer: "b".to_string(),
            value_name: "v".to_string(),
        }];
        let reach = forward_reachable("a", &edges);
        assert!(reach.contains("a"));
        assert!(reach.contains("b"));
    }
}
