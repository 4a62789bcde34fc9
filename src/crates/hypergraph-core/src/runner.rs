//! Top-level façades: `run` one invocation, `map` a broadcast fan-out of
//! invocations. Both wrap [`crate::scheduler::Scheduler`]; neither knows
//! anything about supersteps.

use crate::error::{GraphError, Result};
use crate::events::RunLog;
use crate::graph::Graph;
use crate::scheduler::loop_impl::RunOutcome;
use crate::scheduler::{PauseInfo, RunOptions, Scheduler, SchedulingMode};
use crate::types::{ErrorHandling, Inputs, ListValue, Outputs};
use std::sync::Arc;
use tokio::sync::Semaphore;

/// How `select()`/`with_entrypoint()` narrowing should be applied for one
/// call, without mutating the caller's graph.
#[derive(Default, Clone)]
pub struct CallOptions {
    pub select: Option<Vec<String>>,
    pub entrypoint: Option<String>,
}

/// A single run's outcome, in the external shape: status plus whichever of
/// `values`/`error`/`pause` applies.
pub enum RunResult<V> {
    Completed {
        run_id: String,
        workflow_id: Option<String>,
        values: Outputs<V>,
        run_log: RunLog,
    },
    Failed {
        run_id: String,
        workflow_id: Option<String>,
        values: Outputs<V>,
        error: GraphError,
        run_log: RunLog,
    },
    Paused {
        run_id: String,
        workflow_id: Option<String>,
        values: Outputs<V>,
        pause: PauseInfo<V>,
        run_log: RunLog,
    },
}

impl<V> RunResult<V> {
    pub fn run_id(&self) -> &str {
        match self {
            RunResult::Completed { run_id, .. }
            | RunResult::Failed { run_id, .. }
            | RunResult::Paused { run_id, .. } => run_id,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, RunResult::Completed { .. })
    }
}

fn apply_call_options<V>(graph: &Graph<V>, call: &CallOptions) -> Result<Graph<V>>
where
    V: Clone + PartialEq,
{
    let mut graph = graph.clone();
    if let Some(entry) = &call.entrypoint {
        graph = graph.with_entrypoint(entry.clone())?;
    }
    if let Some(select) = &call.select {
        graph = graph.select(select.clone())?;
    }
    Ok(graph)
}

/// Single invocation. In `error_handling = Raise`, a node failure surfaces
/// as `Err`; in `Continue`, it comes back as `RunResult::Failed` instead.
pub async fn run<V>(graph: &Graph<V>, values: Inputs<V>, call: CallOptions, options: RunOptions<V>) -> Result<RunResult<V>>
where
    V: Clone + PartialEq + Send + Sync + 'static + serde::Serialize + ListValue,
{
    let graph = apply_call_options(graph, &call)?;
    let scheduler = Scheduler::new(Arc::new(graph));
    let workflow_id = options.workflow_id.clone();
    let error_handling = options.error_handling;

    let output = scheduler.run(values, options).await;

    match (error_handling, output) {
        (_, Err(e)) => Err(e),
        (_, Ok(out)) => Ok(match out.outcome {
            RunOutcome::Completed { values } => RunResult::Completed {
                run_id: out.run_id,
                workflow_id,
                values,
                run_log: out.run_log,
            },
            RunOutcome::Failed { partial_values, error } => RunResult::Failed {
                run_id: out.run_id,
                workflow_id,
                values: partial_values,
                error,
                run_log: out.run_log,
            },
            RunOutcome::Paused { partial_values, pause } => RunResult::Paused {
                run_id: out.run_id,
                workflow_id,
                values: partial_values,
                pause,
                run_log: out.run_log,
            },
        }),
    }
}

/// Broadcast fan-out: the params named in `map_over` are treated as lists
/// and zipped/producted into one `Inputs<V>` row per iteration (see
/// [`crate::types::ListValue`]); every other input is shared, as-is, across
/// iterations (the scheduler's own `State` cloning per superstep already
/// protects against cross-iteration mutation within one inner run).
///
/// Workflow IDs do not propagate: each map item gets its own independent
/// run id and no workflow id, per the top-level/per-item distinction.
pub async fn map<V>(
    graph: &Graph<V>,
    values: Inputs<V>,
    map_over: &[String],
    mode: crate::node::MapMode,
    call: CallOptions,
    mut options: RunOptions<V>,
) -> Result<Vec<RunResult<V>>>
where
    V: Clone + PartialEq + Send + Sync + 'static + serde::Serialize + ListValue,
{
    let graph = Arc::new(apply_call_options(graph, &call)?);
    let rows = broadcast_rows(&values, map_over, mode)?;
    let error_handling = options.error_handling;
    options.workflow_id = None;

    let max_concurrency = options.max_concurrency;
    match options.scheduling_mode {
        SchedulingMode::Sequential => {
            let mut out = Vec::with_capacity(rows.len());
            for row in rows {
                let result = run_one_map_item(&graph, row, &call, &options).await?;
                if error_handling == ErrorHandling::Raise {
                    if let RunResult::Failed { error, .. } = result {
                        return Err(error);
                    }
                }
                out.push(result);
            }
            Ok(out)
        }
        SchedulingMode::Concurrent => {
            // `Some(0)` degrades to one-at-a-time, same as the scheduler's
            // own per-superstep concurrency cap.
            let pool_size = match max_concurrency {
                Some(0) => 1,
                Some(c) => c.min(rows.len().max(1)),
                None => rows.len().max(1),
            };
            let semaphore = Arc::new(Semaphore::new(pool_size));

            let futures = rows.into_iter().enumerate().map(|(index, row)| {
                let semaphore = semaphore.clone();
                let graph = graph.clone();
                let call = call.clone();
                let options = &options;
                async move {
                    let _permit = semaphore.acquire().await.expect("semaphore not closed");
                    let result = run_one_map_item(&graph, row, &call, options).await;
                    (index, result)
                }
            });

            let mut indexed: Vec<(usize, Result<RunResult<V>>)> = futures::future::join_all(futures).await;
            indexed.sort_by_key(|(index, _)| *index);

            let mut out = Vec::with_capacity(indexed.len());
            for (_, result) in indexed {
                let result = result?;
                if error_handling == ErrorHandling::Raise {
                    if let RunResult::Failed { error, .. } = result {
                        return Err(error);
                    }
                }
                out.push(result);
            }
            Ok(out)
        }
    }
}

async fn run_one_map_item<V>(
    graph: &Graph<V>,
    row: Inputs<V>,
    call: &CallOptions,
    options: &RunOptions<V>,
) -> Result<RunResult<V>>
where
    V: Clone + PartialEq + Send + Sync + 'static + serde::Serialize + ListValue,
{
    let item_options = RunOptions {
        scheduling_mode: options.scheduling_mode,
        max_iterations: options.max_iterations,
        error_handling: options.error_handling,
        dispatch_mode: options.dispatch_mode,
        cache: options.cache.clone(),
        checkpointer: options.checkpointer.clone(),
        checkpoint_policy: options.checkpoint_policy.clone(),
        max_concurrency: options.max_concurrency,
        workflow_id: None,
        parent_span_id: options.parent_span_id.clone(),
        event_processors: options.event_processors.clone(),
        async_event_processors: options.async_event_processors.clone(),
    };
    run(graph, row, call.clone(), item_options).await
}

fn broadcast_rows<V>(values: &Inputs<V>, map_over: &[String], mode: crate::node::MapMode) -> Result<Vec<Inputs<V>>>
where
    V: Clone + ListValue,
{
    let mut lists: Vec<(String, Vec<V>)> = Vec::with_capacity(map_over.len());
    for param in map_over {
        let value = values
            .get(param)
            .ok_or_else(|| GraphError::missing_input(vec![param.clone()], values.keys().cloned().collect()))?;
        let items = value
            .as_items()
            .ok_or_else(|| GraphError::Custom(format!("map_over param '{param}' is not list-shaped")))?;
        lists.push((param.clone(), items));
    }

    let plain_lists: Vec<Vec<V>> = lists.iter().map(|(_, items)| items.clone()).collect();
    let rows: Vec<Vec<V>> = crate::node::combine_rows(&plain_lists, mode);

    Ok(rows
        .into_iter()
        .map(|row| {
            let mut per_iteration = values.clone();
            for (idx, (name, _)) in lists.iter().enumerate() {
                per_iteration.insert(name.clone(), row[idx].clone());
            }
            per_iteration
        })
        .collect())
}
