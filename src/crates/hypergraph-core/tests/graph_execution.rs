//! End-to-end scenarios exercising the scheduler, cache, checkpointer, and
//! pause/resume across a full `run`/`map` invocation.

use hypergraph_core::{
    CallOptions, Decision, ErrorHandling, FunctionNode, GateNode, Graph, InterruptNode, MapMode, Node, NodeKind,
    Outputs, RunOptions, RunResult,
};
use hypergraph_checkpoint::InMemoryCheckpointer;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn func(name: &str, inputs: Vec<&str>, outputs: Vec<&str>, f: impl Fn(&Value) -> Value + Send + Sync + 'static) -> Node<Value> {
    let output_name = outputs[0].to_string();
    let input_name = inputs.first().map(|s| s.to_string());
    Node::new(
        name,
        NodeKind::Function(FunctionNode::new(
            Arc::new(move |in_values| {
                let output_name = output_name.clone();
                let input_name = input_name.clone();
                let input_value = input_name.and_then(|n| in_values.get(&n).cloned()).unwrap_or(Value::Null);
                let result = f(&input_value);
                Box::pin(async move {
                    let mut out = Outputs::new();
                    out.insert(output_name, result);
                    Ok(out)
                })
            }),
            concat!(module_path!(), ":func"),
        )),
        inputs.into_iter().map(String::from).collect(),
        outputs.into_iter().map(String::from).collect(),
    )
    .unwrap()
}

/// Scenario A: a linear pipeline completes in one pass, each node running
/// exactly once, in name order.
#[tokio::test]
async fn linear_pipeline_completes() {
    let double = func("double", vec!["x"], vec!["y"], |v| Value::from(v.as_i64().unwrap_or(0) * 2));
    let add_one = func("add_one", vec!["y"], vec!["z"], |v| Value::from(v.as_i64().unwrap_or(0) + 1));
    let graph = Graph::new(vec![double, add_one], Some("linear".to_string()), false).unwrap();

    let mut values = hypergraph_core::Inputs::new();
    values.insert("x".to_string(), json!(5));

    let result = hypergraph_core::run(&graph, values, CallOptions::default(), RunOptions::default())
        .await
        .unwrap();

    match result {
        RunResult::Completed { values, .. } => {
            assert_eq!(values.get("y"), Some(&json!(10)));
            assert_eq!(values.get("z"), Some(&json!(11)));
        }
        _ => panic!("expected completion"),
    }
}

/// Scenario B: a self-loop (`increment` consuming and re-producing `count`)
/// converges once a gate observes the target and routes to terminal.
#[tokio::test]
async fn converging_cycle_terminates() {
    let increment = func("increment", vec!["count"], vec!["count"], |v| {
        Value::from(v.as_i64().unwrap_or(0) + 1)
    });
    let gate = Node::new(
        "check_done",
        NodeKind::GateN(GateNode::new(
            Arc::new(|inputs| {
                let count = inputs.get("count").and_then(Value::as_i64).unwrap_or(0);
                Box::pin(async move {
                    if count >= 5 {
                        Ok(Decision::terminal())
                    } else {
                        Ok(Decision::Single("increment".to_string()))
                    }
                })
            }),
            vec!["increment".to_string()],
            false,
        )),
        vec!["count".to_string()],
        vec![],
    )
    .unwrap();

    let graph = Graph::new(vec![increment, gate], Some("cycle".to_string()), false).unwrap();

    let mut values = hypergraph_core::Inputs::new();
    values.insert("count".to_string(), json!(0));

    let options = RunOptions {
        max_iterations: 50,
        ..RunOptions::default()
    };
    let result = hypergraph_core::run(&graph, values, CallOptions::default(), options).await.unwrap();

    match result {
        RunResult::Completed { values, .. } => {
            // The gate and `increment` both read the same pre-merge snapshot
            // each superstep, so `increment` still fires once more in the
            // superstep where the gate finally observes count >= 5 and
            // decides terminal. Convergence lands one step past threshold.
            assert_eq!(values.get("count"), Some(&json!(6)));
        }
        _ => panic!("expected completion"),
    }
}

/// Scenario C: in `continue` mode, one node's failure surfaces as a
/// `RunResult::Failed` carrying sibling outputs from the same superstep,
/// rather than propagating as an `Err`.
#[tokio::test]
async fn partial_failure_continue_mode_captures_siblings() {
    let ok_sibling = func("ok_sibling", vec!["x"], vec!["ok_out"], |v| v.clone());
    let failing = Node::new(
        "failing",
        NodeKind::Function(FunctionNode::new(
            Arc::new(|_inputs| {
                Box::pin(async move {
                    Err(hypergraph_core::GraphError::Custom("boom".to_string()))
                })
            }),
            concat!(module_path!(), ":failing"),
        )),
        vec!["x".to_string()],
        vec!["bad_out".to_string()],
    )
    .unwrap();

    let graph = Graph::new(vec![ok_sibling, failing], Some("partial_failure".to_string()), false).unwrap();

    let mut values = hypergraph_core::Inputs::new();
    values.insert("x".to_string(), json!(1));

    let options = RunOptions {
        error_handling: ErrorHandling::Continue,
        ..RunOptions::default()
    };
    let result = hypergraph_core::run(&graph, values, CallOptions::default(), options).await.unwrap();

    match result {
        RunResult::Failed { values, error, .. } => {
            assert_eq!(values.get("ok_out"), Some(&json!(1)));
            assert!(error.to_string().contains("boom"));
        }
        _ => panic!("expected a captured failure"),
    }
}

/// Scenario D: an interrupt node with no pre-supplied response pauses the
/// run; supplying the response via the output name and re-running resumes
/// past it.
#[tokio::test]
async fn interrupt_then_resume() {
    let ask = Node::new(
        "ask_human",
        NodeKind::Interrupt(InterruptNode::new("approval")),
        vec!["proposal".to_string()],
        vec!["approval".to_string()],
    )
    .unwrap();
    let finalize = func("finalize", vec!["approval"], vec!["final"], |v| v.clone());

    let graph = Graph::new(vec![ask, finalize], Some("approval_flow".to_string()), false).unwrap();

    let mut values = hypergraph_core::Inputs::new();
    values.insert("proposal".to_string(), json!("spend $10"));

    let paused = hypergraph_core::run(&graph, values.clone(), CallOptions::default(), RunOptions::default())
        .await
        .unwrap();

    let pause = match paused {
        RunResult::Paused { pause, .. } => pause,
        _ => panic!("expected a pause"),
    };
    assert_eq!(pause.input_param, "proposal");
    assert_eq!(pause.output_param, "approval");

    values.insert("approval".to_string(), json!(true));
    let resumed = hypergraph_core::run(&graph, values, CallOptions::default(), RunOptions::default())
        .await
        .unwrap();

    match resumed {
        RunResult::Completed { values, .. } => {
            assert_eq!(values.get("final"), Some(&json!(true)));
        }
        _ => panic!("expected completion after resume"),
    }
}

/// Scenario E: a second run with the same cache and identical inputs serves
/// the cached node's output without invoking its callable again.
#[tokio::test]
async fn cache_reuse_skips_recomputation() {
    let call_count = Arc::new(AtomicUsize::new(0));
    let counted = call_count.clone();

    let expensive = Node::new(
        "expensive",
        NodeKind::Function(FunctionNode::new(
            Arc::new(move |inputs| {
                let counted = counted.clone();
                let x = inputs.get("x").cloned().unwrap_or(Value::Null);
                Box::pin(async move {
                    counted.fetch_add(1, Ordering::SeqCst);
                    let mut out = Outputs::new();
                    out.insert("y".to_string(), x);
                    Ok(out)
                })
            }),
            concat!(module_path!(), ":expensive"),
        )),
        vec!["x".to_string()],
        vec!["y".to_string()],
    )
    .unwrap();

    let graph = Graph::new(vec![expensive], Some("cached".to_string()), false).unwrap();
    let cache: Arc<dyn hypergraph_core::cache::CacheBackend<Value>> =
        Arc::new(hypergraph_core::cache::InMemoryCache::new(16));

    for _ in 0..2 {
        let mut values = hypergraph_core::Inputs::new();
        values.insert("x".to_string(), json!(42));
        let options = RunOptions {
            cache: Some(cache.clone()),
            ..RunOptions::default()
        };
        let result = hypergraph_core::run(&graph, values, CallOptions::default(), options).await.unwrap();
        assert!(result.is_completed());
    }

    assert_eq!(call_count.load(Ordering::SeqCst), 1, "second run should be served from cache");
}

/// Scenario F: `map` over a zipped broadcast, with one iteration failing in
/// `continue` mode, yields one `RunResult` per input row, with the failed
/// row's result marked `Failed` rather than aborting its siblings.
#[tokio::test]
async fn map_with_partial_failure_continue_mode() {
    let divide = Node::new(
        "divide",
        NodeKind::Function(FunctionNode::new(
            Arc::new(|inputs| {
                let n = inputs.get("n").and_then(Value::as_i64).unwrap_or(0);
                Box::pin(async move {
                    if n == 0 {
                        return Err(hypergraph_core::GraphError::Custom("division by zero".to_string()));
                    }
                    let mut out = Outputs::new();
                    out.insert("result".to_string(), Value::from(100 / n));
                    Ok(out)
                })
            }),
            concat!(module_path!(), ":divide"),
        )),
        vec!["n".to_string()],
        vec!["result".to_string()],
    )
    .unwrap();

    let graph = Graph::new(vec![divide], Some("map_divide".to_string()), false).unwrap();

    let mut values = hypergraph_core::Inputs::new();
    values.insert("n".to_string(), Value::Array(vec![json!(5), json!(0), json!(10)]));

    let options = RunOptions {
        error_handling: ErrorHandling::Continue,
        ..RunOptions::default()
    };
    let results = hypergraph_core::map(
        &graph,
        values,
        &["n".to_string()],
        MapMode::Zip,
        CallOptions::default(),
        options,
    )
    .await
    .unwrap();

    assert_eq!(results.len(), 3);
    assert!(results[0].is_completed());
    assert!(!results[1].is_completed());
    assert!(results[2].is_completed());
}

/// A run configured with an `InMemoryCheckpointer` produces a step log whose
/// folded state matches the run's own returned values.
#[tokio::test]
async fn checkpointed_run_state_matches_fold_of_steps() {
    let double = func("double", vec!["x"], vec!["y"], |v| Value::from(v.as_i64().unwrap_or(0) * 2));
    let graph = Graph::new(vec![double], Some("checkpointed".to_string()), false).unwrap();

    let checkpointer: Arc<dyn hypergraph_checkpoint::Checkpointer<Value>> = Arc::new(InMemoryCheckpointer::new());

    let mut values = hypergraph_core::Inputs::new();
    values.insert("x".to_string(), json!(21));

    let options = RunOptions {
        checkpointer: Some(checkpointer.clone()),
        ..RunOptions::default()
    };
    let result = hypergraph_core::run(&graph, values, CallOptions::default(), options).await.unwrap();
    let run_id = result.run_id().to_string();

    let folded = checkpointer.get_state(&run_id, None).await.unwrap();
    match result {
        RunResult::Completed { values, .. } => {
            assert_eq!(folded.get("y"), values.get("y"));
        }
        _ => panic!("expected completion"),
    }
}
