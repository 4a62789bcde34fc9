//! Function node: wraps a pure (possibly async) computation.

use crate::error::GraphError;
use crate::types::{BoxFuture, Inputs, Outputs};
use sha2::{Digest, Sha256};
use std::sync::Arc;

/// The underlying callable a function node wraps.
///
/// There's no way to hash a closure's source at runtime, so the caller
/// supplies a `definition_discriminant` (typically
/// `concat!(module_path!(), ":", line!())` at the call site) that stands in
/// for "this is the same logic" across cache lookups.
pub type Callable<V> =
    Arc<dyn Fn(&Inputs<V>) -> BoxFuture<'static, Result<Outputs<V>, GraphError>> + Send + Sync>;

/// A function node.
#[derive(Clone)]
pub struct FunctionNode<V> {
    pub(crate) callable: Callable<V>,
    pub(crate) definition_discriminant: String,
}

impl<V> FunctionNode<V> {
    /// Wrap `callable`, tagged with `discriminant` for definition hashing.
    pub fn new(callable: Callable<V>, discriminant: impl Into<String>) -> Self {
        Self {
            callable,
            definition_discriminant: discriminant.into(),
        }
    }

    pub fn callable(&self) -> &Callable<V> {
        &self.callable
    }

    /// SHA-256 of the definition discriminant, hex-encoded.
    pub fn definition_hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.definition_discriminant.as_bytes());
        hex::encode(hasher.finalize())
    }
}
