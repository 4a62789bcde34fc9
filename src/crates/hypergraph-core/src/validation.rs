//! Build-time graph validation.
//!
//! Runs once, in order, over the flattened node set. Node/output name
//! legality is checked earlier, at [`crate::node::Node::new`] time; this
//! module covers the checks that need the whole graph in view.

use crate::conflict;
use crate::error::{GraphConfigError, Result};
use crate::graph::Edge;
use crate::node::{Node, NodeKind};
use std::collections::HashMap;

pub fn validate<V>(
    nodes: &HashMap<String, Node<V>>,
    order: &[String],
    edges: &[Edge],
    producers_of: &HashMap<String, Vec<String>>,
    strict_types: bool,
) -> Result<()>
where
    V: Clone + PartialEq,
{
    check_subgraph_name_collisions(nodes, producers_of)?;
    check_default_consistency(nodes)?;
    check_gate_targets(nodes)?;
    conflict::check_output_conflicts(nodes, order, edges, producers_of)?;
    if strict_types {
        check_strict_types(nodes, edges)?;
    }
    Ok(())
}

fn check_subgraph_name_collisions<V>(
    nodes: &HashMap<String, Node<V>>,
    producers_of: &HashMap<String, Vec<String>>,
) -> Result<()> {
    for node in nodes.values() {
        if matches!(node.kind(), NodeKind::Subgraph(_)) {
            if let Some(producers) = producers_of.get(node.name()) {
                if producers.iter().any(|p| p != node.name()) {
                    return Err(GraphConfigError::SubgraphOutputCollision {
                        node: node.name().to_string(),
                        output: node.name().to_string(),
                    }
                    .into());
                }
            }
        }
    }
    Ok(())
}

fn check_default_consistency<V>(nodes: &HashMap<String, Node<V>>) -> Result<()>
where
    V: PartialEq,
{
    let mut defaults_by_param: HashMap<&str, Vec<(&str, Option<&V>)>> = HashMap::new();
    for node in nodes.values() {
        for input in node.inputs() {
            defaults_by_param
                .entry(input.as_str())
                .or_default()
                .push((node.name(), node.get_default(input)));
        }
    }

    for (param, entries) in defaults_by_param {
        if entries.len() < 2 {
            continue;
        }
        let has_any_default = entries.iter().any(|(_, d)| d.is_some());
        let has_any_missing = entries.iter().any(|(_, d)| d.is_none());
        if has_any_default && has_any_missing {
            return Err(GraphConfigError::InconsistentDefault {
                param: param.to_string(),
                nodes: entries.iter().map(|(n, _)| n.to_string()).collect(),
            }
            .into());
        }
        if has_any_default {
            let first = entries.iter().find_map(|(_, d)| *d);
            if let Some(first) = first {
                for (_, d) in &entries {
                    if let Some(d) = d {
                        if *d != first {
                            return Err(GraphConfigError::InconsistentDefault {
                                param: param.to_string(),
                                nodes: entries.iter().map(|(n, _)| n.to_string()).collect(),
                            }
                            .into());
                        }
                    }
                }
            }
        }
    }
    Ok(())
}

fn check_gate_targets<V>(nodes: &HashMap<String, Node<V>>) -> Result<()> {
    for node in nodes.values() {
        let targets: Vec<String> = match node.kind() {
            NodeKind::GateN(g) => g.targets().to_vec(),
            NodeKind::GateBinary(g) => g.targets(),
            _ => continue,
        };
        for target in &targets {
            if target == node.name() {
                return Err(GraphConfigError::GateSelfTarget(node.name().to_string()).into());
            }
            if !nodes.contains_key(target) {
                return Err(GraphConfigError::UnresolvedGateTarget {
                    gate: node.name().to_string(),
                    target: target.clone(),
                }
                .into());
            }
        }
    }
    Ok(())
}

fn check_strict_types<V>(nodes: &HashMap<String, Node<V>>, edges: &[Edge]) -> Result<()> {
    for edge in edges {
        if let Edge::Data {
            producer,
            consumer,
            value_name,
        } = edge
        {
            let producer_node = nodes.get(producer).expect("derived edge producer must exist");
            let consumer_node = nodes.get(consumer).expect("derived edge consumer must exist");

            let producer_ty = producer_node.output_type(value_name);
            let consumer_ty = consumer_node.input_type(value_name);

            match (producer_ty, consumer_ty) {
                (Some(p), Some(c)) => {
                    if !p.assignable_to(c) {
                        return Err(GraphConfigError::TypeMismatch {
                            producer: producer.clone(),
                            output: value_name.clone(),
                            consumer: consumer.clone(),
                            input: value_name.clone(),
                            reason: "producer type is not structurally assignable to consumer type".to_string(),
                        }
                        .into());
                    }
                }
                _ => {
                    return Err(GraphConfigError::TypeMismatch {
                        producer: producer.clone(),
                        output: value_name.clone(),
                        consumer: consumer.clone(),
                        input: value_name.clone(),
                        reason: "strict_types requires both sides of a data edge to be annotated".to_string(),
                    }
                    .into());
                }
            }
        }
    }
    Ok(())
}
