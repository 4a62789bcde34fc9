//! Batch-wise rename tracking.
//!
//! A single call to `with_name`/`with_inputs`/`with_outputs` may rename
//! several names at once; those are a *parallel* substitution (`{x -> y, y
//! -> x}` swaps rather than chains). Across separate calls, renames compose
//! sequentially. [`RenameHistory`] records each batch so a later rename of
//! a name that no longer exists can report the full chain that led there.

use crate::error::{GraphConfigError, Result};
use std::collections::HashMap;

/// One parallel-substitution batch: old name -> new name.
pub type RenameBatch = HashMap<String, String>;

/// The ordered sequence of rename batches applied to a node (or one of its
/// input/output namespaces).
#[derive(Debug, Clone, Default)]
pub struct RenameHistory {
    batches: Vec<RenameBatch>,
}

impl RenameHistory {
    pub fn new() -> Self {
        Self { batches: Vec::new() }
    }

    /// Apply a parallel-substitution batch to `names`, recording it.
    ///
    /// Names not mentioned in `batch` pass through unchanged. Duplicate
    /// resulting names are rejected.
    pub fn apply(&mut self, names: &[String], batch: RenameBatch) -> Result<Vec<String>> {
        let renamed: Vec<String> = names
            .iter()
            .map(|n| batch.get(n).cloned().unwrap_or_else(|| n.clone()))
            .collect();

        let mut seen = std::collections::HashSet::new();
        for n in &renamed {
            if !seen.insert(n.clone()) {
                return Err(GraphConfigError::DuplicateRenameTarget(n.clone()).into());
            }
        }

        self.batches.push(batch);
        Ok(renamed)
    }

    /// The full rename chain for `current_name`, oldest first, for
    /// diagnostics when a rename targets a name that no longer exists.
    pub fn chain_for(&self, current_name: &str) -> Vec<String> {
        let mut chain = vec![current_name.to_string()];
        let mut cursor = current_name.to_string();
        for batch in self.batches.iter().rev() {
            if let Some((old, _)) = batch.iter().find(|(_, new)| **new == cursor) {
                chain.push(old.clone());
                cursor = old.clone();
            }
        }
        chain.reverse();
        chain
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn swap_rename_is_parallel_not_chained() {
        let mut history = RenameHistory::new();
        let names = vec!["x".to_string(), "y".to_string()];
        let mut batch = RenameBatch::new();
        batch.insert("x".to_string(), "y".to_string());
        batch.insert("y".to_string(), "x".to_string());

        let renamed = history.apply(&names, batch).unwrap();
        assert_eq!(renamed, vec!["y".to_string(), "x".to_string()]);
    }

    #[test]
    fn duplicate_rename_target_is_rejected() {
        let mut history = RenameHistory::new();
        let names = vec!["a".to_string(), "b".to_string()];
        let mut batch = RenameBatch::new();
        batch.insert("a".to_string(), "c".to_string());
        batch.insert("b".to_string(), "c".to_string());

        assert!(history.apply(&names, batch).is_err());
    }

    #[test]
    fn chain_reports_full_history() {
        let mut history = RenameHistory::new();
        let names = vec!["a".to_string()];
        let mut b1 = RenameBatch::new();
        b1.insert("a".to_string(), "b".to_string());
        history.apply(&names, b1).unwrap();

        let names = vec!["b".to_string()];
        let mut b2 = RenameBatch::new();
        b2.insert("b".to_string(), "c".to_string());
        history.apply(&names, b2).unwrap();

        assert_eq!(history.chain_for("c"), vec!["a", "b", "c"]);
    }
}
