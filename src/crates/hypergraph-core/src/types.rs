//! Shared type aliases used across node variants and the scheduler.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

/// Input parameter name -> value, gathered for one node execution.
pub type Inputs<V> = HashMap<String, V>;

/// Output value name -> value, produced by one node execution.
pub type Outputs<V> = HashMap<String, V>;

/// A boxed, owned future — the shape async node callables return.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// How a run (or a map/subgraph fan-out) treats a node-level failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorHandling {
    /// The first failure propagates and stops execution.
    Raise,
    /// Failures are captured into a failed result; siblings/other
    /// iterations keep going.
    Continue,
}

impl Default for ErrorHandling {
    fn default() -> Self {
        ErrorHandling::Raise
    }
}

/// Values that can present themselves as a list.
///
/// Needed only for map-over: a subgraph node's `map_config` broadcasts
/// some of its inputs as lists and collects its outputs back into lists,
/// and the top-level `map` facade does the same across a whole run. A
/// value type with no list notion of its own can implement this with
/// `as_items` always returning `None`; it just can't be used with
/// `map_config`/`map()`.
pub trait ListValue: Sized {
    /// `Some(items)` if this value represents a list of `Self`, `None`
    /// otherwise.
    fn as_items(&self) -> Option<Vec<Self>>;

    /// Build a list value from collected items. A `None` entry marks a
    /// `continue`-mode iteration that failed.
    fn from_items(items: Vec<Option<Self>>) -> Self;
}

impl ListValue for serde_json::Value {
    fn as_items(&self) -> Option<Vec<Self>> {
        self.as_array().cloned()
    }

    fn from_items(items: Vec<Option<Self>>) -> Self {
        serde_json::Value::Array(
            items
                .into_iter()
                .map(|item| item.unwrap_or(serde_json::Value::Null))
                .collect(),
        )
    }
}
