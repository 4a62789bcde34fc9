//! Node variants and the shared capability surface the scheduler dispatches
//! against.
//!
//! Nodes are modeled as a small closed sum type ([`NodeKind`]) rather than a
//! trait-object hierarchy: the scheduler matches on the variant, which keeps
//! dispatch a single `match` instead of a vtable per capability.

pub mod function;
pub mod gate;
pub mod interrupt;
pub mod rename;
pub mod subgraph;

pub use function::{Callable, FunctionNode};
pub use gate::{BinaryGateNode, Decision, GateNode};
pub use interrupt::InterruptNode;
pub use rename::{RenameBatch, RenameHistory};
pub use subgraph::{combine_rows, MapConfig, MapMode, SubgraphNode};

use crate::error::{GraphConfigError, Result};
use crate::name::validate_name;
use std::collections::HashMap;

/// An optional type annotation used only when strict-type checking is
/// enabled. Unions widen: a union is assignable wherever every one of its
/// variants is assignable, and anything assignable to any union variant is
/// assignable to the union.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeTag {
    Named(String),
    Union(Vec<TypeTag>),
}

impl TypeTag {
    pub fn named(name: impl Into<String>) -> Self {
        TypeTag::Named(name.into())
    }

    pub fn assignable_to(&self, other: &TypeTag) -> bool {
        match (self, other) {
            (TypeTag::Named(a), TypeTag::Named(b)) => a == b,
            (TypeTag::Union(variants), other) => variants.iter().all(|v| v.assignable_to(other)),
            (me, TypeTag::Union(variants)) => variants.iter().any(|v| me.assignable_to(v)),
        }
    }
}

/// The closed set of node variants.
#[derive(Clone)]
pub enum NodeKind<V> {
    Function(FunctionNode<V>),
    GateN(GateNode<V>),
    GateBinary(BinaryGateNode<V>),
    Subgraph(SubgraphNode<V>),
    Interrupt(InterruptNode<V>),
}

impl<V> NodeKind<V> {
    pub fn kind_tag(&self) -> &'static str {
        match self {
            NodeKind::Function(_) => "function",
            NodeKind::GateN(_) => "route",
            NodeKind::GateBinary(_) => "binary_route",
            NodeKind::Subgraph(_) => "subgraph",
            NodeKind::Interrupt(_) => "interrupt",
        }
    }

    pub fn is_gate(&self) -> bool {
        matches!(self, NodeKind::GateN(_) | NodeKind::GateBinary(_))
    }
}

/// A node: name, interface, and the variant-specific behavior in
/// [`NodeKind`].
///
/// All mutators (`with_name`, `with_inputs`, `with_outputs`) return a new
/// `Node`; the receiver is left unchanged.
#[derive(Clone)]
pub struct Node<V> {
    name: String,
    kind: NodeKind<V>,
    inputs: Vec<String>,
    outputs: Vec<String>,
    defaults: HashMap<String, V>,
    wait_for: Vec<String>,
    emit: Vec<String>,
    cache_enabled: bool,
    hide: bool,
    input_types: HashMap<String, TypeTag>,
    output_types: HashMap<String, TypeTag>,
    /// External input name -> the callable's own parameter name, preserved
    /// across renames so `map_inputs_to_func_params` stays correct.
    param_map: HashMap<String, String>,
    rename_history: RenameHistory,
}

impl<V> Node<V> {
    pub fn new(name: impl Into<String>, kind: NodeKind<V>, inputs: Vec<String>, outputs: Vec<String>) -> Result<Self> {
        let name = name.into();
        validate_name(&name, "node")?;
        for i in &inputs {
            validate_name(i, "input")?;
        }
        for o in &outputs {
            validate_name(o, "output")?;
        }
        let param_map = inputs.iter().map(|i| (i.clone(), i.clone())).collect();
        let cache_enabled = kind_allows_cache(&kind);
        Ok(Self {
            name,
            kind,
            inputs,
            outputs,
            defaults: HashMap::new(),
            wait_for: Vec::new(),
            emit: Vec::new(),
            cache_enabled,
            hide: false,
            input_types: HashMap::new(),
            output_types: HashMap::new(),
            param_map,
            rename_history: RenameHistory::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &NodeKind<V> {
        &self.kind
    }

    pub fn inputs(&self) -> &[String] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[String] {
        &self.outputs
    }

    pub fn wait_for(&self) -> &[String] {
        &self.wait_for
    }

    pub fn emit(&self) -> &[String] {
        &self.emit
    }

    pub fn with_wait_for(mut self, names: Vec<String>) -> Self {
        self.wait_for = names;
        self
    }

    pub fn with_emit(mut self, names: Vec<String>) -> Self {
        self.emit = names;
        self
    }

    pub fn has_default(&self, param: &str) -> bool {
        self.defaults.contains_key(param)
    }

    pub fn get_default(&self, param: &str) -> Option<&V> {
        self.defaults.get(param)
    }

    pub fn with_default(mut self, param: impl Into<String>, value: V) -> Self {
        self.defaults.insert(param.into(), value);
        self
    }

    pub fn input_type(&self, param: &str) -> Option<&TypeTag> {
        self.input_types.get(param)
    }

    pub fn output_type(&self, output: &str) -> Option<&TypeTag> {
        self.output_types.get(output)
    }

    pub fn with_input_type(mut self, param: impl Into<String>, ty: TypeTag) -> Self {
        self.input_types.insert(param.into(), ty);
        self
    }

    pub fn with_output_type(mut self, output: impl Into<String>, ty: TypeTag) -> Self {
        self.output_types.insert(output.into(), ty);
        self
    }

    /// Whether the scheduler may serve this node's output from cache.
    /// Invariant: always `false` for gates and subgraph nodes.
    pub fn cache_enabled(&self) -> bool {
        self.cache_enabled
    }

    pub fn with_cache_enabled(mut self, enabled: bool) -> Result<Self> {
        if enabled && !kind_allows_cache(&self.kind) {
            return Err(GraphConfigError::CacheNotAllowed(self.name.clone()).into());
        }
        self.cache_enabled = enabled;
        Ok(self)
    }

    pub fn hide(&self) -> bool {
        self.hide
    }

    pub fn with_hide(mut self, hide: bool) -> Self {
        self.hide = hide;
        self
    }

    /// Translate (possibly renamed) input names back to the callable's own
    /// parameter names.
    pub fn map_inputs_to_func_params(&self, inputs: &crate::types::Inputs<V>) -> crate::types::Inputs<V>
    where
        V: Clone,
    {
        inputs
            .iter()
            .map(|(name, value)| {
                let func_param = self.param_map.get(name).cloned().unwrap_or_else(|| name.clone());
                (func_param, value.clone())
            })
            .collect()
    }

    /// Stable content hash of this node's observable behavior. See
    /// `§4.2` of the design for the per-variant derivation.
    pub fn definition_hash(&self) -> String
    where
        V: Clone + PartialEq,
    {
        match &self.kind {
            NodeKind::Function(f) => f.definition_hash(),
            NodeKind::GateN(g) => g.definition_hash(&self.name, &self.inputs, &self.outputs),
            NodeKind::GateBinary(g) => g.definition_hash(&self.name, &self.inputs, &self.outputs),
            NodeKind::Subgraph(s) => s.definition_hash(),
            NodeKind::Interrupt(i) => i.definition_hash(
                &self.name,
                self.inputs.first().map(|s| s.as_str()).unwrap_or(""),
                self.outputs.first().map(|s| s.as_str()).unwrap_or(""),
            ),
        }
    }

    /// Rename the node itself. Returns a new node.
    pub fn with_name(mut self, new_name: impl Into<String>) -> Result<Self> {
        let new_name = new_name.into();
        validate_name(&new_name, "node")?;
        self.name = new_name;
        Ok(self)
    }

    /// Rename inputs as one parallel-substitution batch. Keys not present
    /// in `renames` pass through unchanged. `param_map` is updated so the
    /// underlying callable still receives its original parameter names.
    pub fn with_inputs(mut self, renames: RenameBatch) -> Result<Self> {
        for new_name in renames.values() {
            validate_name(new_name, "input")?;
        }
        let renamed = self.rename_history.apply(&self.inputs, renames.clone())?;

        let mut new_param_map = HashMap::new();
        for (old_external, func_param) in self.param_map.drain() {
            let new_external = renames.get(&old_external).cloned().unwrap_or(old_external);
            new_param_map.insert(new_external, func_param);
        }
        self.param_map = new_param_map;

        let mut new_defaults = HashMap::new();
        for (old_name, value) in self.defaults.drain() {
            let new_name = renames.get(&old_name).cloned().unwrap_or(old_name);
            new_defaults.insert(new_name, value);
        }
        self.defaults = new_defaults;

        let mut new_wait_for = Vec::new();
        for w in self.wait_for.drain(..) {
            new_wait_for.push(renames.get(&w).cloned().unwrap_or(w));
        }
        self.wait_for = new_wait_for;

        self.inputs = renamed;
        Ok(self)
    }

    /// Rename outputs as one parallel-substitution batch.
    pub fn with_outputs(mut self, renames: RenameBatch) -> Result<Self> {
        for new_name in renames.values() {
            validate_name(new_name, "output")?;
        }
        let renamed = self.rename_history.apply(&self.outputs, renames.clone())?;

        let mut new_emit = Vec::new();
        for e in self.emit.drain(..) {
            new_emit.push(renames.get(&e).cloned().unwrap_or(e));
        }
        self.emit = new_emit;

        self.outputs = renamed;
        Ok(self)
    }

    /// The rename chain that led to `current_input_name`, for diagnostics.
    pub fn input_rename_chain(&self, current_input_name: &str) -> Vec<String> {
        self.rename_history.chain_for(current_input_name)
    }
}

fn kind_allows_cache<V>(kind: &NodeKind<V>) -> bool {
    matches!(kind, NodeKind::Function(_) | NodeKind::Interrupt(_))
}
