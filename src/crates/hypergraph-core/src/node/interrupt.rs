//! Interrupt node: a single-input, single-output pause point.

use crate::error::GraphError;
use crate::types::BoxFuture;
use sha2::{Digest, Sha256};
use std::sync::Arc;

/// Optional handler that auto-resolves an interrupt without pausing, given
/// the surfaced input value.
pub type Handler<V> = Arc<dyn Fn(&V) -> BoxFuture<'static, Result<V, GraphError>> + Send + Sync>;

/// A pause point. When executed without a pre-supplied response (i.e. the
/// output name is not already present in state) and no `handler` is
/// configured, raises the pause signal instead of producing output.
#[derive(Clone)]
pub struct InterruptNode<V> {
    pub(crate) handler: Option<Handler<V>>,
    /// Tag identifying the expected response type, folded into the
    /// definition hash so two interrupt nodes expecting different response
    /// shapes never collide.
    pub(crate) response_type_tag: String,
}

impl<V> InterruptNode<V> {
    pub fn new(response_type_tag: impl Into<String>) -> Self {
        Self {
            handler: None,
            response_type_tag: response_type_tag.into(),
        }
    }

    pub fn with_handler(mut self, handler: Handler<V>) -> Self {
        self.handler = Some(handler);
        self
    }

    pub fn handler(&self) -> Option<&Handler<V>> {
        self.handler.as_ref()
    }

    pub fn definition_hash(&self, name: &str, input: &str, output: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(b"interrupt");
        hasher.update(name.as_bytes());
        hasher.update(input.as_bytes());
        hasher.update(output.as_bytes());
        hasher.update(self.response_type_tag.as_bytes());
        hex::encode(hasher.finalize())
    }
}
