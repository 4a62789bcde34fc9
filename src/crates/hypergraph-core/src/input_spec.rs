//! Input spec computation: partitioning parameters into required / optional
//! / seed, given the graph's current bindings and active subgraph.

use crate::graph::{Edge, Graph};
use std::collections::{HashMap, HashSet};

/// Parameters that appear on any node, partitioned by how their value is
/// supplied.
#[derive(Debug, Clone, Default)]
pub struct InputSpec {
    /// No incoming data edge, no signature default, no binding.
    pub required: Vec<String>,
    /// No incoming data edge, but has a signature default or a binding.
    pub optional: Vec<String>,
    /// Incoming data edge inside a cycle; must be seeded to start the loop.
    pub seeds: Vec<String>,
}

impl InputSpec {
    /// `required ∪ optional ∪ seeds`, in that stable order.
    pub fn all(&self) -> Vec<String> {
        let mut all = self.required.clone();
        all.extend(self.optional.clone());
        all.extend(self.seeds.clone());
        all
    }
}

pub fn compute_input_spec<V>(graph: &Graph<V>) -> InputSpec
where
    V: Clone + PartialEq,
{
    let active = graph.active_nodes();
    let cycle_members = nodes_on_a_cycle(graph, &active);

    let mut required = Vec::new();
    let mut optional = Vec::new();
    let mut seeds = Vec::new();
    let mut seen = HashSet::new();

    for node_name in graph.node_names() {
        if !active.contains(node_name) {
            continue;
        }
        let node = match graph.node(node_name) {
            Some(n) => n,
            None => continue,
        };
        for param in node.inputs() {
            if !seen.insert(param.clone()) {
                continue;
            }

            let producers = graph.producers_of(param);
            let has_data_edge = !producers.is_empty();

            if has_data_edge {
                let in_cycle = producers
                    .iter()
                    .any(|p| cycle_members.contains(p) && cycle_members.contains(node_name));
                if in_cycle {
                    seeds.push(param.clone());
                }
                // Otherwise the parameter is purely internal: absent from
                // the input spec.
                continue;
            }

            let has_default = graph.node_names().filter(|n| active.contains(*n)).any(|n| {
                graph
                    .node(n)
                    .map(|nn| nn.inputs().contains(param) && nn.has_default(param))
                    .unwrap_or(false)
            });
            let is_bound = graph.bindings().contains_key(param);

            if has_default || is_bound {
                optional.push(param.clone());
            } else {
                required.push(param.clone());
            }
        }
    }

    InputSpec { required, optional, seeds }
}

/// Nodes that participate in at least one elementary cycle of the
/// data-edge subgraph (restricted to `active`), via strongly-connected
/// component membership: any node in a nontrivial SCC, or with a
/// self-loop, lies on some cycle.
fn nodes_on_a_cycle<V>(graph: &Graph<V>, active: &HashSet<String>) -> HashSet<String> {
    let mut adjacency: HashMap<String, Vec<String>> = HashMap::new();
    let mut self_loops = HashSet::new();

    for edge in graph.edges() {
        if let Edge::Data { producer, consumer, .. } = edge {
            if !active.contains(producer) || !active.contains(consumer) {
                continue;
            }
            if producer == consumer {
                self_loops.insert(producer.clone());
            }
            adjacency.entry(producer.clone()).or_default().push(consumer.clone());
        }
    }

    let sccs = tarjan_scc(active, &adjacency);
    let mut members = HashSet::new();
    for scc in sccs {
        if scc.len() > 1 {
            members.extend(scc);
        }
    }
    members.extend(self_loops);
    members
}

/// Tarjan's strongly-connected-components algorithm. Recursive; graphs here
/// are node-count-bounded workflow definitions, not arbitrary untrusted
/// input, so call-stack depth isn't a practical concern.
fn tarjan_scc(nodes: &HashSet<String>, adjacency: &HashMap<String, Vec<String>>) -> Vec<Vec<String>> {
    struct State {
        index: HashMap<String, usize>,
        lowlink: HashMap<String, usize>,
        on_stack: HashSet<String>,
        stack: Vec<String>,
        counter: usize,
        sccs: Vec<Vec<String>>,
    }

    fn strongconnect(v: &str, adjacency: &HashMap<String, Vec<String>>, state: &mut State) {
        state.index.insert(v.to_string(), state.counter);
        state.lowlink.insert(v.to_string(), state.counter);
        state.counter += 1;
        state.stack.push(v.to_string());
        state.on_stack.insert(v.to_string());

        if let Some(successors) = adjacency.get(v) {
            for w in successors {
                if !state.index.contains_key(w) {
                    strongconnect(w, adjacency, state);
                    let w_low = state.lowlink[w];
                    let v_low = state.lowlink[v];
                    state.lowlink.insert(v.to_string(), v_low.min(w_low));
                } else if state.on_stack.contains(w) {
                    let w_idx = state.index[w];
                    let v_low = state.lowlink[v];
                    state.lowlink.insert(v.to_string(), v_low.min(w_idx));
                }
            }
        }

        if state.lowlink[v] == state.index[v] {
            let mut component = Vec::new();
            loop {
                let w = state.stack.pop().unwrap();
                state.on_stack.remove(&w);
                let done = w == v;
                component.push(w);
                if done {
                    break;
                }
            }
            state.sccs.push(component);
        }
    }

    let mut state = State {
        index: HashMap::new(),
        lowlink: HashMap::new(),
        on_stack: HashSet::new(),
        stack: Vec::new(),
        counter: 0,
        sccs: Vec::new(),
    };

    for node in nodes {
        if !state.index.contains_key(node) {
            strongconnect(node, adjacency, &mut state);
        }
    }

    state.sccs
}
