use criterion::{black_box, criterion_group, criterion_main, Criterion};
use hypergraph_core::{CallOptions, FunctionNode, Graph, Node, NodeKind, RunOptions, SchedulingMode};
use serde_json::Value;
use std::sync::Arc;

fn increment_node(name: &str, input: &str, output: &str) -> Node<Value> {
    let input_owned = input.to_string();
    let output_owned = output.to_string();
    Node::new(
        name,
        NodeKind::Function(FunctionNode::new(
            Arc::new(move |inputs| {
                let input_owned = input_owned.clone();
                let output_owned = output_owned.clone();
                Box::pin(async move {
                    let n = inputs.get(&input_owned).and_then(Value::as_i64).unwrap_or(0);
                    let mut out = hypergraph_core::Outputs::new();
                    out.insert(output_owned, Value::from(n + 1));
                    Ok(out)
                })
            }),
            concat!(module_path!(), ":increment"),
        )),
        vec![input.to_string()],
        vec![output.to_string()],
    )
    .unwrap()
}

fn linear_pipeline(depth: usize) -> Graph<Value> {
    let mut nodes = Vec::with_capacity(depth);
    nodes.push(increment_node("step_0", "seed", "v_0"));
    for i in 1..depth {
        nodes.push(increment_node(&format!("step_{i}"), &format!("v_{}", i - 1), &format!("v_{i}")));
    }
    Graph::new(nodes, Some("linear_pipeline".to_string()), false).unwrap()
}

fn sequential_run_benchmark(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let graph = Arc::new(linear_pipeline(20));

    c.bench_function("sequential run: 20-node linear pipeline", |b| {
        b.to_async(&runtime).iter(|| async {
            let mut values = hypergraph_core::Inputs::new();
            values.insert("seed".to_string(), Value::from(0));
            let options = RunOptions {
                scheduling_mode: SchedulingMode::Sequential,
                ..RunOptions::default()
            };
            let result = hypergraph_core::run(&graph, black_box(values), CallOptions::default(), options)
                .await
                .unwrap();
            black_box(result);
        });
    });
}

fn concurrent_run_benchmark(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let graph = Arc::new(linear_pipeline(20));

    c.bench_function("concurrent run: 20-node linear pipeline", |b| {
        b.to_async(&runtime).iter(|| async {
            let mut values = hypergraph_core::Inputs::new();
            values.insert("seed".to_string(), Value::from(0));
            let options = RunOptions {
                scheduling_mode: SchedulingMode::Concurrent,
                max_concurrency: Some(8),
                ..RunOptions::default()
            };
            let result = hypergraph_core::run(&graph, black_box(values), CallOptions::default(), options)
                .await
                .unwrap();
            black_box(result);
        });
    });
}

fn map_fan_out_benchmark(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let graph = Arc::new(linear_pipeline(5));

    c.bench_function("map: 16-way fan-out over a 5-node pipeline", |b| {
        b.to_async(&runtime).iter(|| async {
            let mut values = hypergraph_core::Inputs::new();
            let seeds: Vec<Value> = (0..16).map(Value::from).collect();
            values.insert("seed".to_string(), Value::Array(seeds));
            let options = RunOptions {
                scheduling_mode: SchedulingMode::Concurrent,
                max_concurrency: Some(4),
                ..RunOptions::default()
            };
            let results = hypergraph_core::map(
                &graph,
                black_box(values),
                &["seed".to_string()],
                hypergraph_core::MapMode::Zip,
                CallOptions::default(),
                options,
            )
            .await
            .unwrap();
            black_box(results);
        });
    });
}

criterion_group!(benches, sequential_run_benchmark, concurrent_run_benchmark, map_fan_out_benchmark);
criterion_main!(benches);
