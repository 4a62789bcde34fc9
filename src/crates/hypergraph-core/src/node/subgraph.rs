//! Subgraph node: a node whose execution is itself a graph run.

use crate::graph::Graph;
use crate::types::ErrorHandling;
use sha2::{Digest, Sha256};
use std::sync::Arc;

/// Whether map-over inputs are zipped (pairwise) or combined as a cartesian
/// product.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapMode {
    Zip,
    Product,
}

/// Configuration that turns a subgraph node into a map-over: one or more
/// of its inputs are broadcast as lists and outputs are collected into
/// lists, one element per generated inner invocation.
#[derive(Debug, Clone)]
pub struct MapConfig {
    pub params: Vec<String>,
    pub mode: MapMode,
    pub error_handling: ErrorHandling,
}

/// Combine per-param lists into rows: pairwise (shortest wins) for `Zip`,
/// cartesian expansion for `Product`. Shared by subgraph map-over dispatch
/// and the top-level `map` façade.
pub fn combine_rows<V: Clone>(lists: &[Vec<V>], mode: MapMode) -> Vec<Vec<V>> {
    match mode {
        MapMode::Zip => {
            let len = lists.iter().map(|items| items.len()).min().unwrap_or(0);
            (0..len).map(|i| lists.iter().map(|items| items[i].clone()).collect()).collect()
        }
        MapMode::Product => {
            let mut rows: Vec<Vec<V>> = vec![Vec::new()];
            for items in lists {
                let mut next = Vec::with_capacity(rows.len() * items.len());
                for row in &rows {
                    for item in items {
                        let mut extended = row.clone();
                        extended.push(item.clone());
                        next.push(extended);
                    }
                }
                rows = next;
            }
            rows
        }
    }
}

/// A node that dispatches execution to a nested [`Graph`].
#[derive(Clone)]
pub struct SubgraphNode<V> {
    pub(crate) inner: Arc<Graph<V>>,
    pub(crate) map_config: Option<MapConfig>,
}

impl<V> SubgraphNode<V> {
    pub fn new(inner: Graph<V>) -> Self {
        Self {
            inner: Arc::new(inner),
            map_config: None,
        }
    }

    pub fn with_map_config(mut self, config: MapConfig) -> Self {
        self.map_config = Some(config);
        self
    }

    pub fn inner(&self) -> &Graph<V> {
        &self.inner
    }

    pub fn map_config(&self) -> Option<&MapConfig> {
        self.map_config.as_ref()
    }

    /// The subgraph's definition hash: canonical concatenation of child
    /// nodes' definition hashes, ordered by node name.
    pub fn definition_hash(&self) -> String
    where
        V: Clone + PartialEq,
    {
        let mut hasher = Sha256::new();
        let mut names: Vec<&String> = self.inner.node_names().collect();
        names.sort();
        for name in names {
            if let Some(hash) = self.inner.node(name).map(|n| n.definition_hash()) {
                hasher.update(hash.as_bytes());
            }
        }
        hex::encode(hasher.finalize())
    }
}
