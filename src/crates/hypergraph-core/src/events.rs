//! Structured event stream: run/node spans, routing decisions, cache hits,
//! errors, fanned out to zero or more processors.

use crate::node::Decision;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::FutureExt;
use std::sync::{Arc, Mutex};

/// Fields common to every event.
#[derive(Debug, Clone)]
pub struct EventMeta {
    pub run_id: String,
    pub span_id: String,
    pub parent_span_id: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// One emitted event. Variant-specific fields follow the shape in the
/// external event-record contract.
#[derive(Debug, Clone)]
pub enum Event {
    RunStart {
        meta: EventMeta,
        graph_name: Option<String>,
        workflow_id: Option<String>,
        is_map: bool,
        map_size: Option<usize>,
    },
    RunEnd {
        meta: EventMeta,
        graph_name: Option<String>,
        completed: bool,
        error: Option<String>,
        duration_ms: f64,
    },
    SuperstepStart {
        meta: EventMeta,
        superstep: u32,
    },
    NodeStart {
        meta: EventMeta,
        node_name: String,
        graph_name: Option<String>,
    },
    NodeEnd {
        meta: EventMeta,
        node_name: String,
        graph_name: Option<String>,
        duration_ms: f64,
        cached: bool,
    },
    NodeError {
        meta: EventMeta,
        node_name: String,
        graph_name: Option<String>,
        error_message: String,
        error_type: String,
    },
    CacheHit {
        meta: EventMeta,
        node_name: String,
        graph_name: Option<String>,
        cache_key: String,
    },
    RouteDecision {
        meta: EventMeta,
        node_name: String,
        graph_name: Option<String>,
        decision: Decision,
    },
    Interrupt {
        meta: EventMeta,
        node_name: String,
        input_param: String,
        surfaced_value_debug: String,
    },
}

impl Event {
    pub fn meta(&self) -> &EventMeta {
        match self {
            Event::RunStart { meta, .. }
            | Event::RunEnd { meta, .. }
            | Event::SuperstepStart { meta, .. }
            | Event::NodeStart { meta, .. }
            | Event::NodeEnd { meta, .. }
            | Event::NodeError { meta, .. }
            | Event::CacheHit { meta, .. }
            | Event::RouteDecision { meta, .. }
            | Event::Interrupt { meta, .. } => meta,
        }
    }
}

/// A consumer of the event stream. `on_event` is required; async
/// processors additionally implement [`AsyncEventProcessor`].
pub trait EventProcessor: Send + Sync {
    fn on_event(&self, event: &Event);

    /// Called once when the dispatcher is torn down (end of top-level run).
    fn shutdown(&self) {}
}

/// An event processor with an async hook, for processors that need to do
/// I/O (e.g. streaming events over a websocket).
#[async_trait]
pub trait AsyncEventProcessor: Send + Sync {
    async fn on_event_async(&self, event: &Event);
}

/// How the dispatcher treats a failing processor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchMode {
    /// Log and continue: one processor's failure never breaks execution.
    BestEffort,
    /// Propagate the processor's panic/error to the caller.
    Strict,
}

/// Fans events out to registered processors. The [`TraceCollector`] is
/// always registered so a `RunLog` is available on every `RunResult`
/// regardless of what the caller configured.
pub struct EventDispatcher {
    processors: Vec<Arc<dyn EventProcessor>>,
    async_processors: Vec<Arc<dyn AsyncEventProcessor>>,
    mode: DispatchMode,
    trace_collector: Arc<TraceCollector>,
}

impl EventDispatcher {
    pub fn new(mode: DispatchMode) -> Self {
        let trace_collector = Arc::new(TraceCollector::new());
        Self {
            processors: vec![Arc::new(TraceCollectorHandle(trace_collector.clone()))],
            async_processors: Vec::new(),
            mode,
            trace_collector,
        }
    }

    pub fn register(&mut self, processor: Arc<dyn EventProcessor>) {
        self.processors.push(processor);
    }

    pub fn register_async(&mut self, processor: Arc<dyn AsyncEventProcessor>) {
        self.async_processors.push(processor);
    }

    pub fn trace_collector(&self) -> Arc<TraceCollector> {
        self.trace_collector.clone()
    }

    /// Emit `event` to every registered processor, synchronous ones first,
    /// then async ones. A panicking processor is caught (best-effort mode)
    /// or allowed to propagate (strict mode).
    pub async fn emit(&self, event: Event) {
        for processor in &self.processors {
            match self.mode {
                DispatchMode::BestEffort => {
                    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                        processor.on_event(&event);
                    }));
                    if let Err(payload) = result {
                        tracing::warn!(?payload, "event processor panicked; isolated per best-effort mode");
                    }
                }
                DispatchMode::Strict => processor.on_event(&event),
            }
        }

        for processor in &self.async_processors {
            match self.mode {
                DispatchMode::BestEffort => {
                    let result = std::panic::AssertUnwindSafe(processor.on_event_async(&event))
                        .catch_unwind()
                        .await;
                    if let Err(payload) = result {
                        tracing::warn!(?payload, "async event processor panicked; isolated per best-effort mode");
                    }
                }
                DispatchMode::Strict => processor.on_event_async(&event).await,
            }
        }
    }

    pub fn shutdown(&self) {
        for processor in &self.processors {
            processor.shutdown();
        }
    }
}

struct TraceCollectorHandle(Arc<TraceCollector>);

impl EventProcessor for TraceCollectorHandle {
    fn on_event(&self, event: &Event) {
        self.0.on_event(event);
    }
}

/// One node's recorded timing/status/decision, as captured by the trace
/// collector.
#[derive(Debug, Clone)]
pub struct NodeTrace {
    pub node_name: String,
    pub duration_ms: f64,
    pub cached: bool,
    pub error: Option<String>,
    pub decision: Option<Decision>,
}

/// The in-memory trace buffered by the always-on passive processor,
/// returned alongside every `RunResult`.
#[derive(Debug, Default)]
pub struct RunLog {
    pub nodes: Vec<NodeTrace>,
}

/// Buffers `node-end`/`node-error`/`route-decision` events into a
/// [`RunLog`]. Always registered by [`EventDispatcher::new`]; never fails.
pub struct TraceCollector {
    log: Mutex<RunLog>,
}

impl TraceCollector {
    pub fn new() -> Self {
        Self {
            log: Mutex::new(RunLog::default()),
        }
    }

    pub fn on_event(&self, event: &Event) {
        let mut log = self.log.lock().unwrap();
        match event {
            Event::NodeEnd {
                node_name,
                duration_ms,
                cached,
                ..
            } => log.nodes.push(NodeTrace {
                node_name: node_name.clone(),
                duration_ms: *duration_ms,
                cached: *cached,
                error: None,
                decision: None,
            }),
            Event::NodeError {
                node_name,
                error_message,
                ..
            } => log.nodes.push(NodeTrace {
                node_name: node_name.clone(),
                duration_ms: 0.0,
                cached: false,
                error: Some(error_message.clone()),
                decision: None,
            }),
            Event::RouteDecision {
                node_name, decision, ..
            } => {
                if let Some(existing) = log.nodes.iter_mut().rev().find(|n| &n.node_name == node_name) {
                    existing.decision = Some(decision.clone());
                } else {
                    log.nodes.push(NodeTrace {
                        node_name: node_name.clone(),
                        duration_ms: 0.0,
                        cached: false,
                        error: None,
                        decision: Some(decision.clone()),
                    });
                }
            }
            _ => {}
        }
    }

    pub fn into_log(self) -> RunLog {
        self.log.into_inner().unwrap()
    }

    pub fn snapshot(&self) -> RunLog {
        let log = self.log.lock().unwrap();
        RunLog {
            nodes: log.nodes.clone(),
        }
    }
}

impl Default for TraceCollector {
    fn default() -> Self {
        Self::new()
    }
}
