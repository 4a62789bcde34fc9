//! The graph: an immutable collection of nodes plus a derived edge set.

use crate::error::{GraphConfigError, Result};
use crate::input_spec::InputSpec;
use crate::name::validate_graph_name;
use crate::node::Node;
use crate::validation;
use std::collections::{HashMap, HashSet};

/// A derived edge. Edges are never declared directly; they fall out of
/// scanning node inputs/outputs/wait-for/emit/gate-targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Edge {
    /// `producer` outputs `value_name`; `consumer` lists it as an input.
    Data {
        producer: String,
        consumer: String,
        value_name: String,
    },
    /// `gate` declares `target` as one of its possible decisions.
    Control { gate: String, target: String },
    /// `consumer` must not run until `producer` has produced `signal` at
    /// least once since `consumer`'s last execution.
    Ordering {
        producer: String,
        consumer: String,
        signal: String,
    },
}

/// An immutable dataflow graph.
///
/// `bind`, `with_entrypoint`, and `select` all return a new `Graph`; the
/// receiver is unaffected. Cloning a `Graph` is cheap: nodes are stored
/// behind reference-counted handles inside each [`Node`] variant's own
/// callables, and the graph's own containers are plain `Clone`.
#[derive(Clone)]
pub struct Graph<V> {
    name: Option<String>,
    nodes: HashMap<String, Node<V>>,
    order: Vec<String>,
    edges: Vec<Edge>,
    /// output name -> names of nodes that produce it
    producers_of: HashMap<String, Vec<String>>,
    bindings: HashMap<String, V>,
    entry_point: Option<String>,
    selected_outputs: Option<Vec<String>>,
    strict_types: bool,
}

impl<V> Graph<V>
where
    V: Clone + PartialEq,
{
    /// Build and validate a new graph from a flat node set.
    pub fn new(nodes: Vec<Node<V>>, name: Option<String>, strict_types: bool) -> Result<Self> {
        if let Some(n) = &name {
            validate_graph_name(n)?;
        }

        let mut node_map = HashMap::new();
        let mut order = Vec::new();
        for node in nodes {
            if node_map.contains_key(node.name()) {
                return Err(GraphConfigError::DuplicateNode(node.name().to_string()).into());
            }
            order.push(node.name().to_string());
            node_map.insert(node.name().to_string(), node);
        }

        let producers_of = compute_producers_of(&node_map);
        let edges = derive_edges(&node_map, &producers_of);

        validation::validate(&node_map, &order, &edges, &producers_of, strict_types)?;

        Ok(Self {
            name,
            nodes: node_map,
            order,
            edges,
            producers_of,
            bindings: HashMap::new(),
            entry_point: None,
            selected_outputs: None,
            strict_types,
        })
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn node(&self, name: &str) -> Option<&Node<V>> {
        self.nodes.get(name)
    }

    pub fn node_names(&self) -> impl Iterator<Item = &String> {
        self.order.iter()
    }

    /// All nodes in declaration order.
    pub fn nodes_in_order(&self) -> impl Iterator<Item = &Node<V>> {
        self.order.iter().filter_map(move |n| self.nodes.get(n))
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn bindings(&self) -> &HashMap<String, V> {
        &self.bindings
    }

    pub fn entry_point(&self) -> Option<&str> {
        self.entry_point.as_deref()
    }

    pub fn selected_outputs(&self) -> Option<&[String]> {
        self.selected_outputs.as_deref()
    }

    pub fn strict_types(&self) -> bool {
        self.strict_types
    }

    pub fn producers_of(&self, output: &str) -> &[String] {
        self.producers_of.get(output).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// Attach a binding for `param`, returning a new graph. Bound values are
    /// shared references by contract: nothing here deep-copies `value`.
    pub fn bind(mut self, param: impl Into<String>, value: V) -> Self {
        self.bindings.insert(param.into(), value);
        self
    }

    /// Narrow the active subgraph to the forward cone of `name`.
    pub fn with_entrypoint(mut self, name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if !self.nodes.contains_key(&name) {
            return Err(GraphConfigError::UnknownReference {
                operation: "with_entrypoint".to_string(),
                kind: "node".to_string(),
                name,
            }
            .into());
        }
        self.entry_point = Some(name);
        Ok(self)
    }

    /// Narrow the active subgraph to nodes reachable backward from
    /// `outputs`, expanding gates pessimistically (if a gate is active, all
    /// of its branches' inputs count as active).
    pub fn select(mut self, outputs: Vec<String>) -> Result<Self> {
        for o in &outputs {
            if !self.producers_of.contains_key(o) {
                return Err(GraphConfigError::UnknownReference {
                    operation: "select".to_string(),
                    kind: "output".to_string(),
                    name: o.clone(),
                }
                .into());
            }
        }
        self.selected_outputs = Some(outputs);
        Ok(self)
    }

    /// The set of node names in the currently active subgraph, given
    /// `entry_point`/`selected_outputs` narrowing.
    pub fn active_nodes(&self) -> HashSet<String> {
        let mut active: HashSet<String> = match &self.entry_point {
            Some(entry) => forward_cone(entry, &self.nodes, &self.edges),
            None => self.order.iter().cloned().collect(),
        };

        if let Some(outputs) = &self.selected_outputs {
            let backward = backward_cone(outputs, &self.producers_of, &self.nodes, &self.edges);
            active = active.intersection(&backward).cloned().collect();
        }
        active
    }

    /// Compute the input spec for the currently active subgraph.
    pub fn input_spec(&self) -> InputSpec {
        crate::input_spec::compute_input_spec(self)
    }
}

fn compute_producers_of<V>(nodes: &HashMap<String, Node<V>>) -> HashMap<String, Vec<String>> {
    let mut map: HashMap<String, Vec<String>> = HashMap::new();
    for node in nodes.values() {
        for output in node.outputs() {
            map.entry(output.clone()).or_default().push(node.name().to_string());
        }
    }
    for producers in map.values_mut() {
        producers.sort();
    }
    map
}

fn derive_edges<V>(nodes: &HashMap<String, Node<V>>, producers_of: &HashMap<String, Vec<String>>) -> Vec<Edge> {
    let mut edges = Vec::new();

    for node in nodes.values() {
        for input in node.inputs() {
            if let Some(producers) = producers_of.get(input) {
                for producer in producers {
                    // Self-loops (a node consuming its own previous output,
                    // e.g. `increment(count) -> count`) are the canonical
                    // convergent-cycle shape and must be kept as edges.
                    edges.push(Edge::Data {
                        producer: producer.clone(),
                        consumer: node.name().to_string(),
                        value_name: input.clone(),
                    });
                }
            }
        }

        use crate::node::NodeKind;
        match node.kind() {
            NodeKind::GateN(g) => {
                for target in g.targets() {
                    edges.push(Edge::Control {
                        gate: node.name().to_string(),
                        target: target.clone(),
                    });
                }
            }
            NodeKind::GateBinary(g) => {
                for target in g.targets() {
                    edges.push(Edge::Control {
                        gate: node.name().to_string(),
                        target,
                    });
                }
            }
            _ => {}
        }
    }

    for consumer in nodes.values() {
        for signal in consumer.wait_for() {
            for producer in nodes.values() {
                if producer.emit().contains(signal) {
                    edges.push(Edge::Ordering {
                        producer: producer.name().to_string(),
                        consumer: consumer.name().to_string(),
                        signal: signal.clone(),
                    });
                }
            }
        }
    }

    edges
}

fn forward_cone<V>(entry: &str, nodes: &HashMap<String, Node<V>>, edges: &[Edge]) -> HashSet<String> {
    let mut active = HashSet::new();
    let mut queue = vec![entry.to_string()];
    while let Some(current) = queue.pop() {
        if !active.insert(current.clone()) {
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
                if nodes.contains_key(&n) {
                    queue.push(n);
                }
            }
        }
    }
    active
}

fn backward_cone<V>(
    outputs: &[String],
    producers_of: &HashMap<String, Vec<String>>,
    nodes: &HashMap<String, Node<V>>,
    edges: &[Edge],
) -> HashSet<String> {
    let mut active = HashSet::new();
    let mut queue: Vec<String> = outputs
        .iter()
        .flat_map(|o| producers_of.get(o).cloned().unwrap_or_default())
        .collect();

    while let Some(current) = queue.pop() {
        if !active.insert(current.clone()) {
            continue;
        }
        // Predecessors via data edges (consumer's inputs).
        if let Some(node) = nodes.get(&current) {
            for input in node.inputs() {
                if let Some(producers) = producers_of.get(input) {
                    queue.extend(producers.iter().cloned());
                }
            }
        }
        // Gates that route to `current` are also active (pessimistic
        // expansion: if a gate's branch can reach a selected output, the
        // gate and all of its other branches' inputs are considered active).
        for edge in edges {
            if let Edge::Control { gate, target } = edge {
                if target == &current {
                    queue.push(gate.clone());
                }
            }
        }
        // `current` may itself be one of the gates just pulled in: push its
        // other Control targets too, so the pessimistic expansion above
        // actually reaches the branches it claims to keep active.
        for edge in edges {
            if let Edge::Control { gate, target } = edge {
                if gate == &current {
                    queue.push(target.clone());
                }
            }
        }
    }
    active
}
