//! In-memory `Checkpointer` implementation.
//!
//! Keeps every step in a `BTreeMap` keyed by `(run_id, superstep, node_name)`
//! so a re-save of the same key upserts in place, matching the contract's
//! at-least-once delivery tolerance.

use crate::error::{CheckpointError, Result};
use crate::traits::Checkpointer;
use crate::types::{Run, RunStatus, StepRecord, StepStatus};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

type StepKey = (String, u32, String);

struct Inner<V> {
    runs: HashMap<String, Run>,
    steps: BTreeMap<StepKey, StepRecord<V>>,
    /// Insertion order of keys, for a stable global-index-compatible ordering
    /// even after an upsert replaces an existing record in place.
    order: Vec<StepKey>,
}

impl<V> Inner<V> {
    fn new() -> Self {
        Self {
            runs: HashMap::new(),
            steps: BTreeMap::new(),
            order: Vec::new(),
        }
    }
}

/// Fold a run's ordered step records into a values map, matching
/// `Checkpointer::get_state`'s contract: later steps overwrite earlier
/// values for the same name.
pub fn fold_steps<V: Clone>(steps: &[StepRecord<V>]) -> HashMap<String, V> {
    let mut values = HashMap::new();
    for step in steps {
        if let Some(step_values) = &step.values {
            for (name, value) in step_values {
                values.insert(name.clone(), value.clone());
            }
        }
    }
    values
}

/// An in-memory [`Checkpointer`] backed by a `Mutex`-guarded map.
///
/// Intended for tests, local development, and single-process runs where no
/// durability guarantee beyond "survives the process" is required.
pub struct InMemoryCheckpointer<V> {
    inner: Mutex<Inner<V>>,
}

impl<V> InMemoryCheckpointer<V> {
    /// Create an empty checkpointer.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::new()),
        }
    }
}

impl<V> Default for InMemoryCheckpointer<V> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<V> Checkpointer<V> for InMemoryCheckpointer<V>
where
    V: Clone + Send + Sync + 'static,
{
    async fn save_step(&self, record: StepRecord<V>) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        let key = (
            record.run_id.clone(),
            record.superstep,
            record.node_name.clone(),
        );
        if !inner.steps.contains_key(&key) {
            inner.order.push(key.clone());
        }
        inner.steps.insert(key, record);
        Ok(())
    }

    async fn create_run(&self, run_id: &str, graph_name: Option<&str>) -> Result<Run> {
        let mut inner = self.inner.lock().unwrap();
        let run = Run {
            id: run_id.to_string(),
            status: RunStatus::Active,
            graph_name: graph_name.map(|s| s.to_string()),
            created_at: Utc::now(),
            completed_at: None,
        };
        inner.runs.insert(run_id.to_string(), run.clone());
        Ok(run)
    }

    async fn update_run_status(&self, run_id: &str, status: RunStatus) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        let run = inner
            .runs
            .get_mut(run_id)
            .ok_or_else(|| CheckpointError::RunNotFound(run_id.to_string()))?;
        run.status = status;
        if matches!(status, RunStatus::Completed | RunStatus::Failed) {
            run.completed_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn get_state(
        &self,
        run_id: &str,
        through_superstep: Option<u32>,
    ) -> Result<HashMap<String, V>> {
        let steps = self.get_steps(run_id, through_superstep).await?;
        Ok(fold_steps(&steps))
    }

    async fn get_steps(
        &self,
        run_id: &str,
        through_superstep: Option<u32>,
    ) -> Result<Vec<StepRecord<V>>> {
        let inner = self.inner.lock().unwrap();
        let mut steps: Vec<StepRecord<V>> = inner
            .order
            .iter()
            .filter(|(rid, superstep, _)| {
                rid == run_id && through_superstep.map_or(true, |bound| *superstep <= bound)
            })
            .filter_map(|key| inner.steps.get(key).cloned())
            .collect();
        steps.sort_by_key(|s| s.index);
        Ok(steps)
    }

    async fn list_runs(&self, status_filter: Option<RunStatus>, limit: usize) -> Result<Vec<Run>> {
        let inner = self.inner.lock().unwrap();
        let mut runs: Vec<Run> = inner
            .runs
            .values()
            .filter(|r| status_filter.map_or(true, |s| r.status == s))
            .cloned()
            .collect();
        runs.sort_by_key(|r| std::cmp::Reverse(r.created_at));
        runs.truncate(limit);
        Ok(runs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::StepRecord;
    use std::collections::HashMap;

    fn step(run_id: &str, superstep: u32, index: u64, node: &str, value: i64) -> StepRecord<i64> {
        let mut values = HashMap::new();
        values.insert(node.to_string(), value);
        StepRecord {
            run_id: run_id.to_string(),
            superstep,
            index,
            node_name: node.to_string(),
            node_kind: "function".to_string(),
            status: StepStatus::Completed,
            consumed_input_versions: HashMap::new(),
            values: Some(values),
            duration_ms: 0.0,
            cached: false,
            decision: None,
            error: None,
            created_at: Utc::now(),
            completed_at: Some(Utc::now()),
            nested_run_id: None,
        }
    }

    #[tokio::test]
    async fn fold_identity_matches_scheduler_state() {
        let cp: InMemoryCheckpointer<i64> = InMemoryCheckpointer::new();
        cp.create_run("run-1", Some("g")).await.unwrap();
        cp.save_step(step("run-1", 0, 0, "a", 1)).await.unwrap();
        cp.save_step(step("run-1", 1, 1, "b", 2)).await.unwrap();

        let state = cp.get_state("run-1", None).await.unwrap();
        assert_eq!(state.get("a"), Some(&1));
        assert_eq!(state.get("b"), Some(&2));
    }

    #[tokio::test]
    async fn upsert_on_same_key_replaces_value_but_keeps_position() {
        let cp: InMemoryCheckpointer<i64> = InMemoryCheckpointer::new();
        cp.create_run("run-1", None).await.unwrap();
        cp.save_step(step("run-1", 0, 0, "a", 1)).await.unwrap();
        cp.save_step(step("run-1", 0, 0, "a", 99)).await.unwrap();

        let steps = cp.get_steps("run-1", None).await.unwrap();
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].values.as_ref().unwrap()["a"], 99);
    }

    #[tokio::test]
    async fn windowed_read_stops_at_superstep_bound() {
        let cp: InMemoryCheckpointer<i64> = InMemoryCheckpointer::new();
        cp.create_run("run-1", None).await.unwrap();
        cp.save_step(step("run-1", 0, 0, "a", 1)).await.unwrap();
        cp.save_step(step("run-1", 1, 1, "b", 2)).await.unwrap();
        cp.save_step(step("run-1", 2, 2, "c", 3)).await.unwrap();

        let state = cp.get_state("run-1", Some(1)).await.unwrap();
        assert!(state.contains_key("a"));
        assert!(state.contains_key("b"));
        assert!(!state.contains_key("c"));
    }

    #[tokio::test]
    async fn run_not_found_on_status_update() {
        let cp: InMemoryCheckpointer<i64> = InMemoryCheckpointer::new();
        let err = cp
            .update_run_status("missing", RunStatus::Completed)
            .await
            .unwrap_err();
        assert!(matches!(err, CheckpointError::RunNotFound(_)));
    }
}
