//! The superstep loop: find ready nodes, execute them, merge outputs,
//! advance state, and stop when nothing is ready or the iteration cap
//! trips.

use super::executor::{self, ExecOutcome};
use super::ready;
use super::{PauseInfo, RunOptions, SchedulingMode, StepOutcome};
use crate::cache::{self, CacheBackend};
use crate::error::{GraphError, Result};
use crate::events::{Event, EventDispatcher, EventMeta};
use crate::graph::Graph;
use crate::node::{Decision, MapConfig, NodeKind, SubgraphNode};
use crate::state::State;
use crate::types::{ErrorHandling, Inputs, ListValue, Outputs};
use chrono::Utc;
use hypergraph_checkpoint::{Checkpointer, RunStatus, StepRecord, StepStatus};
use futures::future::join_all;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;

/// What a completed/failed/paused run produced.
pub enum RunOutcome<V> {
    Completed { values: Outputs<V> },
    Failed { partial_values: Outputs<V>, error: GraphError },
    Paused { partial_values: Outputs<V>, pause: PauseInfo<V> },
}

/// Everything a top-level `Scheduler::run` returns; `map` and nested
/// subgraph dispatch consume the pieces they need.
pub struct RunOutput<V> {
    pub run_id: String,
    pub outcome: RunOutcome<V>,
    pub run_log: crate::events::RunLog,
}

/// Shared context threaded through nested subgraph dispatch: the same
/// event dispatcher, cache, and checkpointer as the outer run.
struct RunContext<V> {
    dispatcher: Arc<EventDispatcher>,
    cache: Option<Arc<dyn CacheBackend<V>>>,
    checkpointer: Option<Arc<dyn Checkpointer<V>>>,
    max_concurrency: Option<usize>,
    scheduling_mode: SchedulingMode,
    error_handling: ErrorHandling,
    max_iterations: u32,
    global_index: Arc<AtomicU64>,
}

/// Drives one graph's execution. Stateless between runs: construct fresh
/// per `run`/`map` call.
pub struct Scheduler<V> {
    graph: Arc<Graph<V>>,
}

impl<V> Scheduler<V>
where
    V: Clone + PartialEq + Send + Sync + 'static + serde::Serialize + ListValue,
{
    pub fn new(graph: Arc<Graph<V>>) -> Self {
        Self { graph }
    }

    /// Top-level run entry point.
    pub async fn run(&self, values: Inputs<V>, options: RunOptions<V>) -> Result<RunOutput<V>> {
        crate::validation_runtime::check_runner_compatibility(&self.graph, options.scheduling_mode)?;

        let run_id = uuid::Uuid::new_v4().to_string();
        let mut dispatcher = EventDispatcher::new(options.dispatch_mode);
        for processor in &options.event_processors {
            dispatcher.register(processor.clone());
        }
        for processor in &options.async_event_processors {
            dispatcher.register_async(processor.clone());
        }
        let dispatcher = Arc::new(dispatcher);
        let ctx = RunContext {
            dispatcher: dispatcher.clone(),
            cache: options.cache.clone(),
            checkpointer: options.checkpointer.clone(),
            max_concurrency: options.max_concurrency,
            scheduling_mode: options.scheduling_mode,
            error_handling: options.error_handling,
            max_iterations: options.max_iterations,
            global_index: Arc::new(AtomicU64::new(0)),
        };

        if let Some(cp) = &ctx.checkpointer {
            cp.create_run(&run_id, self.graph.name()).await?;
        }

        let meta = EventMeta {
            run_id: run_id.clone(),
            span_id: run_id.clone(),
            parent_span_id: options.parent_span_id.clone(),
            timestamp: Utc::now(),
        };
        dispatcher
            .emit(Event::RunStart {
                meta: meta.clone(),
                graph_name: self.graph.name().map(|s| s.to_string()),
                workflow_id: options.workflow_id.clone(),
                is_map: false,
                map_size: None,
            })
            .await;

        let start = Instant::now();
        let outcome = self.run_body(&run_id, values, &ctx, &run_id, options.parent_span_id.as_deref()).await;

        if let Some(cp) = &ctx.checkpointer {
            let status = match &outcome {
                Ok(RunOutcome::Completed { .. }) => Some(RunStatus::Completed),
                Ok(RunOutcome::Failed { .. }) => Some(RunStatus::Failed),
                Ok(RunOutcome::Paused { .. }) => None,
                Err(_) => Some(RunStatus::Failed),
            };
            if let Some(status) = status {
                cp.update_run_status(&run_id, status).await?;
            }
        }

        let outcome = outcome?;

        dispatcher
            .emit(Event::RunEnd {
                meta,
                graph_name: self.graph.name().map(|s| s.to_string()),
                completed: matches!(outcome, RunOutcome::Completed { .. }),
                error: match &outcome {
                    RunOutcome::Failed { error, .. } => Some(error.to_string()),
                    _ => None,
                },
                duration_ms: start.elapsed().as_secs_f64() * 1000.0,
            })
            .await;
        dispatcher.shutdown();

        let run_log = dispatcher.trace_collector().snapshot();
        Ok(RunOutput { run_id, outcome, run_log })
    }

    async fn run_body(
        &self,
        run_id: &str,
        values: Inputs<V>,
        ctx: &RunContext<V>,
        span_id: &str,
        parent_span_id: Option<&str>,
    ) -> Result<RunOutcome<V>> {
        let active = self.graph.active_nodes();
        let spec = self.graph.input_spec();
        check_required_inputs(&spec, &values)?;

        let mut state: State<V> = State::new();
        state.seed(values);

        let mut superstep: u32 = 0;
        loop {
            let ready_names = ready::ready_nodes(&self.graph, &state, &active);
            if ready_names.is_empty() {
                break;
            }

            if superstep >= ctx.max_iterations {
                return Err(GraphError::InfiniteLoop {
                    max_iterations: ctx.max_iterations,
                    pending: ready_names,
                });
            }

            dispatch_superstep_start(ctx, run_id, span_id, superstep).await;

            let to_execute = select_superstep_batch(&self.graph, &ready_names);

            let results = self
                .execute_batch(run_id, span_id, parent_span_id, &to_execute, &state, ctx)
                .await;

            let mut next_state = state.clone();
            let mut failure: Option<(String, GraphError)> = None;
            let mut pause: Option<PauseInfo<V>> = None;

            for (node_name, outcome) in results {
                match outcome {
                    StepOutcome::Completed {
                        outputs,
                        decision,
                        cached,
                        duration_ms,
                        nested_run_id,
                    } => {
                        let consumed = ready::consumed_versions(&self.graph, &state, &node_name);
                        let wait_versions = ready::wait_for_versions(&self.graph, &state, &node_name);

                        if let Some(d) = decision.clone() {
                            next_state.record_decision(&node_name, d);
                        }
                        next_state.merge_outputs(outputs.clone());
                        if let Some(node) = self.graph.node(&node_name) {
                            next_state.record_emits(node.emit());
                        }
                        next_state.record_execution(&node_name, consumed.clone(), outputs.clone(), wait_versions);

                        emit_node_end(ctx, run_id, &node_name, span_id, duration_ms, cached).await;
                        if let Some(d) = &decision {
                            emit_route_decision(ctx, run_id, &node_name, span_id, d.clone()).await;
                        }

                        if let Some(cp) = &ctx.checkpointer {
                            let record = StepRecord {
                                run_id: run_id.to_string(),
                                superstep,
                                index: ctx.global_index.fetch_add(1, Ordering::SeqCst),
                                node_name: node_name.clone(),
                                node_kind: self
                                    .graph
                                    .node(&node_name)
                                    .map(|n| n.kind().kind_tag().to_string())
                                    .unwrap_or_default(),
                                status: StepStatus::Completed,
                                consumed_input_versions: consumed,
                                values: Some(outputs),
                                duration_ms,
                                cached,
                                decision: decision.map(Into::into),
                                error: None,
                                created_at: Utc::now(),
                                completed_at: Some(Utc::now()),
                                nested_run_id,
                            };
                            cp.save_step(record).await?;
                        }
                    }
                    StepOutcome::Paused(p) => {
                        pause = Some(p);
                    }
                    StepOutcome::Failed(err) => {
                        emit_node_error(ctx, run_id, &node_name, span_id, &err).await;
                        if let Some(cp) = &ctx.checkpointer {
                            let record = StepRecord::<V> {
                                run_id: run_id.to_string(),
                                superstep,
                                index: ctx.global_index.fetch_add(1, Ordering::SeqCst),
                                node_name: node_name.clone(),
                                node_kind: self
                                    .graph
                                    .node(&node_name)
                                    .map(|n| n.kind().kind_tag().to_string())
                                    .unwrap_or_default(),
                                status: StepStatus::Failed,
                                consumed_input_versions: ready::consumed_versions(&self.graph, &state, &node_name),
                                values: None,
                                duration_ms: 0.0,
                                cached: false,
                                decision: None,
                                error: Some(err.to_string()),
                                created_at: Utc::now(),
                                completed_at: Some(Utc::now()),
                                nested_run_id: None,
                            };
                            cp.save_step(record).await?;
                        }
                        if failure.is_none() {
                            failure = Some((node_name, err));
                        }
                        if ctx.error_handling == ErrorHandling::Raise {
                            break;
                        }
                    }
                }
            }

            if let Some(pause) = pause {
                emit_interrupt(ctx, run_id, span_id, &pause).await;
                return Ok(RunOutcome::Paused {
                    partial_values: state.values,
                    pause,
                });
            }

            if let Some((_, err)) = failure {
                return match ctx.error_handling {
                    ErrorHandling::Raise => Err(err),
                    ErrorHandling::Continue => Ok(RunOutcome::Failed {
                        partial_values: next_state.values,
                        error: err,
                    }),
                };
            }

            state = next_state;
            superstep += 1;
        }

        let selected = self.graph.selected_outputs();
        let values = select_output_values(&state.values, selected, &active, &self.graph);
        Ok(RunOutcome::Completed { values })
    }

    async fn execute_batch(
        &self,
        run_id: &str,
        span_id: &str,
        parent_span_id: Option<&str>,
        node_names: &[String],
        state: &State<V>,
        ctx: &RunContext<V>,
    ) -> Vec<(String, StepOutcome<V>)> {
        match ctx.scheduling_mode {
            SchedulingMode::Sequential => {
                let mut out = Vec::with_capacity(node_names.len());
                for name in node_names {
                    let outcome = self.execute_one(run_id, span_id, parent_span_id, name, state, ctx).await;
                    out.push((name.clone(), outcome));
                }
                out
            }
            SchedulingMode::Concurrent if ctx.max_concurrency == Some(0) => {
                // `max_concurrency = Some(0)` is documented as degrading to
                // sequential rather than meaning "no capacity".
                let mut out = Vec::with_capacity(node_names.len());
                for name in node_names {
                    let outcome = self.execute_one(run_id, span_id, parent_span_id, name, state, ctx).await;
                    out.push((name.clone(), outcome));
                }
                out
            }
            SchedulingMode::Concurrent => {
                let semaphore = ctx.max_concurrency.map(Semaphore::new);
                let futures = node_names.iter().map(|name| async {
                    let _permit = match &semaphore {
                        Some(sem) => Some(sem.acquire().await.expect("semaphore not closed")),
                        None => None,
                    };
                    let outcome = self.execute_one(run_id, span_id, parent_span_id, name, state, ctx).await;
                    (name.clone(), outcome)
                });
                // Every ready node in a superstep is independent by
                // construction (the ready-rule already excludes anything not
                // yet stale/fresh), so polling them concurrently here is
                // sound; the semaphore just caps how many run at once.
                let mut results = join_all(futures).await;
                results.sort_by(|a, b| a.0.cmp(&b.0));
                results
            }
        }
    }

    async fn execute_one(
        &self,
        run_id: &str,
        span_id: &str,
        parent_span_id: Option<&str>,
        node_name: &str,
        state: &State<V>,
        ctx: &RunContext<V>,
    ) -> StepOutcome<V> {
        let node = match self.graph.node(node_name) {
            Some(n) => n,
            None => return StepOutcome::Failed(GraphError::Custom(format!("unknown node '{node_name}'"))),
        };

        emit_node_start(ctx, run_id, node_name, span_id).await;
        let start = Instant::now();

        let inputs = match collect_inputs(&self.graph, state, node_name) {
            Ok(i) => i,
            Err(e) => return StepOutcome::Failed(e),
        };

        match node.kind() {
            NodeKind::Function(f) => {
                let func_inputs = node.map_inputs_to_func_params(&inputs);
                let definition_hash = f.definition_hash();

                if node.cache_enabled() {
                    if let Some(cache) = &ctx.cache {
                        if let Some(key) = cache::compute_cache_key(&definition_hash, &func_inputs) {
                            if let Some(cached) = cache.get(&key) {
                                emit_cache_hit(ctx, run_id, node_name, span_id, &definition_hash).await;
                                return StepOutcome::Completed {
                                    outputs: cached,
                                    decision: None,
                                    cached: true,
                                    duration_ms: start.elapsed().as_secs_f64() * 1000.0,
                                    nested_run_id: None,
                                };
                            }
                            match executor::execute_function(f, &func_inputs).await {
                                Ok(outputs) => {
                                    cache.set(key, outputs.clone());
                                    return StepOutcome::Completed {
                                        outputs,
                                        decision: None,
                                        cached: false,
                                        duration_ms: start.elapsed().as_secs_f64() * 1000.0,
                                        nested_run_id: None,
                                    };
                                }
                                Err(e) => return StepOutcome::Failed(e),
                            }
                        }
                    }
                }

                match executor::execute_function(f, &func_inputs).await {
                    Ok(outputs) => StepOutcome::Completed {
                        outputs,
                        decision: None,
                        cached: false,
                        duration_ms: start.elapsed().as_secs_f64() * 1000.0,
                        nested_run_id: None,
                    },
                    Err(e) => StepOutcome::Failed(e),
                }
            }
            NodeKind::GateN(g) => match executor::execute_gate_n(g, node_name, &inputs).await {
                Ok(decision) => StepOutcome::Completed {
                    outputs: Outputs::new(),
                    decision: Some(decision),
                    cached: false,
                    duration_ms: start.elapsed().as_secs_f64() * 1000.0,
                    nested_run_id: None,
                },
                Err(e) => StepOutcome::Failed(e),
            },
            NodeKind::GateBinary(g) => match executor::execute_gate_binary(g, &inputs).await {
                Ok(decision) => StepOutcome::Completed {
                    outputs: Outputs::new(),
                    decision: Some(decision),
                    cached: false,
                    duration_ms: start.elapsed().as_secs_f64() * 1000.0,
                    nested_run_id: None,
                },
                Err(e) => StepOutcome::Failed(e),
            },
            NodeKind::Interrupt(i) => {
                let input_param = node.inputs().first().cloned().unwrap_or_default();
                let output_param = node.outputs().first().cloned().unwrap_or_default();
                let input_value = match inputs.get(&input_param) {
                    Some(v) => v.clone(),
                    None => {
                        return StepOutcome::Failed(GraphError::missing_input(
                            vec![input_param],
                            inputs.keys().cloned().collect(),
                        ))
                    }
                };
                let pre_supplied = state.values.get(&output_param);

                match executor::execute_interrupt(i, &input_param, &output_param, &input_value, pre_supplied).await {
                    Ok(ExecOutcome::Data(outputs)) => StepOutcome::Completed {
                        outputs,
                        decision: None,
                        cached: false,
                        duration_ms: start.elapsed().as_secs_f64() * 1000.0,
                        nested_run_id: None,
                    },
                    Ok(ExecOutcome::Pause {
                        input_param,
                        output_param,
                        surfaced_value,
                    }) => {
                        // Nesting prefixes are added one layer up, by
                        // `run_single_subgraph`/`run_mapped_subgraph`, as the
                        // pause bubbles through each enclosing subgraph node.
                        let _ = parent_span_id;
                        StepOutcome::Paused(PauseInfo {
                            node_path: node_name.to_string(),
                            input_param,
                            output_param,
                            surfaced_value,
                        })
                    }
                    Ok(ExecOutcome::Route(_)) => unreachable!("interrupt never produces a route decision"),
                    Err(e) => StepOutcome::Failed(e),
                }
            }
            NodeKind::Subgraph(s) => match s.map_config() {
                None => self.run_single_subgraph(s, node_name, span_id, inputs, ctx, start).await,
                Some(map_config) => {
                    self.run_mapped_subgraph(s, map_config, node_name, span_id, inputs, ctx, start).await
                }
            },
        }
    }

    fn sub_options(&self, ctx: &RunContext<V>, span_id: &str) -> RunOptions<V> {
        RunOptions {
            scheduling_mode: ctx.scheduling_mode,
            max_iterations: ctx.max_iterations,
            error_handling: ctx.error_handling,
            dispatch_mode: crate::events::DispatchMode::BestEffort,
            cache: ctx.cache.clone(),
            checkpointer: ctx.checkpointer.clone(),
            checkpoint_policy: hypergraph_checkpoint::CheckpointPolicy::default(),
            max_concurrency: ctx.max_concurrency,
            workflow_id: None,
            parent_span_id: Some(span_id.to_string()),
            event_processors: Vec::new(),
            async_event_processors: Vec::new(),
        }
    }

    async fn run_single_subgraph(
        &self,
        s: &SubgraphNode<V>,
        node_name: &str,
        span_id: &str,
        inputs: Inputs<V>,
        ctx: &RunContext<V>,
        start: Instant,
    ) -> StepOutcome<V> {
        let inner_scheduler = Scheduler::new(s.inner.clone());
        let sub_options = self.sub_options(ctx, span_id);

        match inner_scheduler.run(inputs, sub_options).await {
            Ok(output) => match output.outcome {
                RunOutcome::Completed { values } => StepOutcome::Completed {
                    outputs: values,
                    decision: None,
                    cached: false,
                    duration_ms: start.elapsed().as_secs_f64() * 1000.0,
                    nested_run_id: Some(output.run_id),
                },
                RunOutcome::Failed { error, .. } => StepOutcome::Failed(error),
                RunOutcome::Paused { pause, .. } => StepOutcome::Paused(PauseInfo {
                    node_path: format!("{}/{}", node_name, pause.node_path),
                    input_param: pause.input_param,
                    output_param: pause.output_param,
                    surfaced_value: pause.surfaced_value,
                }),
            },
            Err(e) => StepOutcome::Failed(e),
        }
    }

    /// Broadcast the params named in `map_config` as lists, run one inner
    /// invocation per row (zip or cartesian product), and collect each
    /// output name back into a list value. A pause inside any iteration
    /// pauses the whole subgraph node; per the `continue`-mode contract a
    /// failed iteration contributes `None` at its index instead of
    /// aborting its siblings.
    async fn run_mapped_subgraph(
        &self,
        s: &SubgraphNode<V>,
        map_config: &MapConfig,
        node_name: &str,
        span_id: &str,
        inputs: Inputs<V>,
        ctx: &RunContext<V>,
        start: Instant,
    ) -> StepOutcome<V> {
        let rows = match broadcast_inputs(&inputs, map_config) {
            Ok(rows) => rows,
            Err(e) => return StepOutcome::Failed(e),
        };

        let mut per_output: HashMap<String, Vec<Option<V>>> = HashMap::new();
        for output_name in s.inner().selected_outputs().map(|o| o.to_vec()).unwrap_or_default() {
            per_output.entry(output_name).or_default();
        }

        for (row_index, row) in rows.into_iter().enumerate() {
            let inner_scheduler = Scheduler::new(s.inner.clone());
            let sub_options = self.sub_options(ctx, span_id);

            match inner_scheduler.run(row, sub_options).await {
                Ok(output) => match output.outcome {
                    RunOutcome::Completed { values } => {
                        for (name, value) in values {
                            // A name seen for the first time on a later row still
                            // needs slots for every row that came before it.
                            let slots = per_output.entry(name).or_insert_with(|| vec![None; row_index]);
                            slots.push(Some(value));
                        }
                    }
                    RunOutcome::Failed { error, .. } => {
                        if map_config.error_handling == ErrorHandling::Raise {
                            return StepOutcome::Failed(error);
                        }
                    }
                    RunOutcome::Paused { pause, .. } => {
                        return StepOutcome::Paused(PauseInfo {
                            node_path: format!("{}/{}", node_name, pause.node_path),
                            input_param: pause.input_param,
                            output_param: pause.output_param,
                            surfaced_value: pause.surfaced_value,
                        });
                    }
                },
                Err(e) => {
                    if map_config.error_handling == ErrorHandling::Raise {
                        return StepOutcome::Failed(e);
                    }
                }
            }

            // Every known output name gets exactly one slot per row: pad any
            // name this row didn't produce a value for before moving on.
            for slots in per_output.values_mut() {
                if slots.len() <= row_index {
                    slots.push(None);
                }
            }
        }

        let outputs: Outputs<V> = per_output
            .into_iter()
            .map(|(name, items)| (name, V::from_items(items)))
            .collect();

        StepOutcome::Completed {
            outputs,
            decision: None,
            cached: false,
            duration_ms: start.elapsed().as_secs_f64() * 1000.0,
            nested_run_id: None,
        }
    }
}

/// Generate one `Inputs<V>` row per zip/product combination of
/// `map_config`'s broadcast params, deep-copying every non-broadcast
/// (shared) input into each row so in-place mutation in one iteration
/// can never leak into another.
fn broadcast_inputs<V>(inputs: &Inputs<V>, map_config: &MapConfig) -> Result<Vec<Inputs<V>>>
where
    V: Clone + ListValue,
{
    let mut lists: Vec<(String, Vec<V>)> = Vec::with_capacity(map_config.params.len());
    for param in &map_config.params {
        let value = inputs
            .get(param)
            .ok_or_else(|| GraphError::missing_input(vec![param.clone()], inputs.keys().cloned().collect()))?;
        let items = value
            .as_items()
            .ok_or_else(|| GraphError::Custom(format!("map_config param '{param}' is not list-shaped")))?;
        lists.push((param.clone(), items));
    }

    let plain_lists: Vec<Vec<V>> = lists.iter().map(|(_, items)| items.clone()).collect();
    let rows: Vec<Vec<V>> = crate::node::combine_rows(&plain_lists, map_config.mode);

    Ok(rows
        .into_iter()
        .map(|row| {
            let mut per_iteration = inputs.clone();
            for (idx, (name, _)) in lists.iter().enumerate() {
                per_iteration.insert(name.clone(), row[idx].clone());
            }
            per_iteration
        })
        .collect())
}

fn select_superstep_batch<V>(graph: &Graph<V>, ready: &[String]) -> Vec<String> {
    let interrupts: Vec<&String> = ready
        .iter()
        .filter(|n| matches!(graph.node(n).map(|n| n.kind()), Some(NodeKind::Interrupt(_))))
        .collect();
    if let Some(first) = interrupts.first() {
        vec![(*first).clone()]
    } else {
        ready.to_vec()
    }
}

fn collect_inputs<V>(graph: &Graph<V>, state: &State<V>, node_name: &str) -> Result<Inputs<V>>
where
    V: Clone,
{
    let node = graph.node(node_name).expect("collect_inputs on known node");
    let mut inputs = Inputs::new();
    let mut missing = Vec::new();

    for param in node.inputs() {
        if let Some(v) = state.values.get(param) {
            inputs.insert(param.clone(), v.clone());
        } else if let Some(v) = graph.bindings().get(param) {
            inputs.insert(param.clone(), v.clone());
        } else if let Some(v) = node.get_default(param) {
            inputs.insert(param.clone(), v.clone());
        } else {
            missing.push(param.clone());
        }
    }

    if !missing.is_empty() {
        return Err(GraphError::missing_input(missing, state.values.keys().cloned().collect()));
    }
    Ok(inputs)
}

fn check_required_inputs<V>(spec: &crate::input_spec::InputSpec, provided: &Inputs<V>) -> Result<()> {
    let missing: Vec<String> = spec
        .required
        .iter()
        .chain(spec.seeds.iter())
        .filter(|p| !provided.contains_key(*p))
        .cloned()
        .collect();
    if !missing.is_empty() {
        return Err(GraphError::missing_input(missing, provided.keys().cloned().collect()));
    }
    Ok(())
}

fn select_output_values<V: Clone>(
    values: &HashMap<String, V>,
    selected: Option<&[String]>,
    active: &std::collections::HashSet<String>,
    graph: &Graph<V>,
) -> Outputs<V> {
    match selected {
        Some(names) => names
            .iter()
            .filter_map(|n| values.get(n).map(|v| (n.clone(), v.clone())))
            .collect(),
        None => {
            let mut out = Outputs::new();
            for name in graph.node_names() {
                if !active.contains(name) {
                    continue;
                }
                if let Some(node) = graph.node(name) {
                    for output in node.outputs() {
                        if let Some(v) = values.get(output) {
                            out.insert(output.clone(), v.clone());
                        }
                    }
                }
            }
            out
        }
    }
}

async fn dispatch_superstep_start<V>(ctx: &RunContext<V>, run_id: &str, span_id: &str, superstep: u32) {
    ctx.dispatcher
        .emit(Event::SuperstepStart {
            meta: event_meta(run_id, span_id),
            superstep,
        })
        .await;
}

async fn emit_node_start<V>(ctx: &RunContext<V>, run_id: &str, node_name: &str, span_id: &str) {
    ctx.dispatcher
        .emit(Event::NodeStart {
            meta: event_meta(run_id, span_id),
            node_name: node_name.to_string(),
            graph_name: None,
        })
        .await;
}

async fn emit_node_end<V>(ctx: &RunContext<V>, run_id: &str, node_name: &str, span_id: &str, duration_ms: f64, cached: bool) {
    ctx.dispatcher
        .emit(Event::NodeEnd {
            meta: event_meta(run_id, span_id),
            node_name: node_name.to_string(),
            graph_name: None,
            duration_ms,
            cached,
        })
        .await;
}

async fn emit_node_error<V>(ctx: &RunContext<V>, run_id: &str, node_name: &str, span_id: &str, err: &GraphError) {
    ctx.dispatcher
        .emit(Event::NodeError {
            meta: event_meta(run_id, span_id),
            node_name: node_name.to_string(),
            graph_name: None,
            error_message: err.to_string(),
            error_type: "NodeExecutionError".to_string(),
        })
        .await;
}

async fn emit_cache_hit<V>(ctx: &RunContext<V>, run_id: &str, node_name: &str, span_id: &str, key: &str) {
    ctx.dispatcher
        .emit(Event::CacheHit {
            meta: event_meta(run_id, span_id),
            node_name: node_name.to_string(),
            graph_name: None,
            cache_key: key.to_string(),
        })
        .await;
}

async fn emit_route_decision<V>(ctx: &RunContext<V>, run_id: &str, node_name: &str, span_id: &str, decision: Decision) {
    ctx.dispatcher
        .emit(Event::RouteDecision {
            meta: event_meta(run_id, span_id),
            node_name: node_name.to_string(),
            graph_name: None,
            decision,
        })
        .await;
}

async fn emit_interrupt<V: serde::Serialize>(ctx: &RunContext<V>, run_id: &str, span_id: &str, pause: &PauseInfo<V>) {
    ctx.dispatcher
        .emit(Event::Interrupt {
            meta: event_meta(run_id, span_id),
            node_name: pause.node_path.clone(),
            input_param: pause.input_param.clone(),
            surfaced_value_debug: serde_json::to_string(&pause.surfaced_value)
                .unwrap_or_else(|_| "<unserializable>".to_string()),
        })
        .await;
}

fn event_meta(run_id: &str, span_id: &str) -> EventMeta {
    EventMeta {
        run_id: run_id.to_string(),
        span_id: span_id.to_string(),
        parent_span_id: None,
        timestamp: Utc::now(),
    }
}
