//! The abstract checkpointer contract.
//!
//! Implementations are free to back this with anything — the crate ships
//! only an in-memory one ([`crate::memory::InMemoryCheckpointer`]). On-disk
//! persistence is deliberately out of scope here: this trait is the whole
//! contract a caller's own SQLite/Postgres/etc. backend needs to satisfy.

use crate::error::Result;
use crate::types::{Checkpoint, Run, RunStatus, StepRecord};
use async_trait::async_trait;
use std::collections::HashMap;

/// Append-only step log plus run lifecycle bookkeeping.
///
/// Steps are the source of truth: `get_state` is always defined as folding
/// `get_steps` in global-index order. Re-executions of the same node across
/// supersteps (legal inside cycles) are distinct records.
#[async_trait]
pub trait Checkpointer<V>: Send + Sync
where
    V: Clone + Send + Sync + 'static,
{
    /// Persist a step. Upsert semantics on `(run_id, superstep, node_name)`
    /// so at-least-once delivery (async durability) doesn't duplicate rows.
    async fn save_step(&self, record: StepRecord<V>) -> Result<()>;

    /// Register a new run. Called once at the start of `Scheduler::run`.
    async fn create_run(&self, run_id: &str, graph_name: Option<&str>) -> Result<Run>;

    /// Transition a run's lifecycle status.
    async fn update_run_status(&self, run_id: &str, status: RunStatus) -> Result<()>;

    /// Fold this run's steps (through `through_superstep`, inclusive, or all
    /// steps if `None`) into a values map.
    async fn get_state(
        &self,
        run_id: &str,
        through_superstep: Option<u32>,
    ) -> Result<HashMap<String, V>>;

    /// Raw step records through `through_superstep` (inclusive), or all
    /// steps if `None`, ordered by global index.
    async fn get_steps(
        &self,
        run_id: &str,
        through_superstep: Option<u32>,
    ) -> Result<Vec<StepRecord<V>>>;

    /// Runs matching an optional status filter, most recent first, capped
    /// at `limit`.
    async fn list_runs(&self, status_filter: Option<RunStatus>, limit: usize) -> Result<Vec<Run>>;

    /// Folded state plus the steps that produced it, through
    /// `through_superstep` (inclusive) or the whole run if `None`.
    ///
    /// Default implementation composes [`Checkpointer::get_state`] and
    /// [`Checkpointer::get_steps`]; backends with a more direct path to both
    /// may override it.
    async fn get_checkpoint(
        &self,
        run_id: &str,
        through_superstep: Option<u32>,
    ) -> Result<Checkpoint<V>> {
        let steps = self.get_steps(run_id, through_superstep).await?;
        let values = self.get_state(run_id, through_superstep).await?;
        Ok(Checkpoint { values, steps })
    }
}
