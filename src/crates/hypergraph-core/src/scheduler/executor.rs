//! Per-node-kind execution, given already-collected inputs.
//!
//! Subgraph dispatch is not here: it needs the scheduler's own `run` method
//! recursively, so [`crate::scheduler::loop_impl`] handles that variant
//! directly.

use crate::error::GraphError;
use crate::node::{BinaryGateNode, Decision, FunctionNode, GateNode, InterruptNode};
use crate::types::{Inputs, Outputs};

/// Outcome of a single non-subgraph node execution.
pub enum ExecOutcome<V> {
    /// Function node output, or an interrupt's pass-through/handler result
    /// (both produce a single named output value).
    Data(Outputs<V>),
    /// A gate's routing decision.
    Route(Decision),
    /// An interrupt with no pre-supplied response and no handler.
    Pause { input_param: String, output_param: String, surfaced_value: V },
}

pub async fn execute_function<V>(node: &FunctionNode<V>, inputs: &Inputs<V>) -> Result<Outputs<V>, GraphError> {
    (node.callable())(inputs).await
}

pub async fn execute_gate_n<V>(gate: &GateNode<V>, gate_name: &str, inputs: &Inputs<V>) -> Result<Decision, GraphError> {
    let decision = (gate.route_fn)(inputs).await?;
    let decision = if decision.targets().is_empty() && !decision.is_terminal() {
        gate.fallback.clone().unwrap_or(decision)
    } else {
        decision
    };
    gate.validate_decision(&decision).map_err(|reason| GraphError::RouteInvalid {
        gate: gate_name.to_string(),
        decision: format!("{:?}", decision),
        reason,
    })?;
    Ok(decision)
}

pub async fn execute_gate_binary<V>(
    gate: &BinaryGateNode<V>,
    inputs: &Inputs<V>,
) -> Result<Decision, GraphError> {
    let value = (gate.route_fn)(inputs).await?;
    Ok(gate.decide(value))
}

/// `pre_supplied`: the value already present in state for the interrupt's
/// output name, if any (a resume call supplied it). Path rewriting for
/// nested subgraphs happens one layer up, in the scheduler.
pub async fn execute_interrupt<V>(
    node: &InterruptNode<V>,
    input_param: &str,
    output_param: &str,
    input_value: &V,
    pre_supplied: Option<&V>,
) -> Result<ExecOutcome<V>, GraphError>
where
    V: Clone,
{
    if let Some(value) = pre_supplied {
        let mut out = Outputs::new();
        out.insert(output_param.to_string(), value.clone());
        return Ok(ExecOutcome::Data(out));
    }

    if let Some(handler) = node.handler() {
        let resolved = handler(input_value).await?;
        let mut out = Outputs::new();
        out.insert(output_param.to_string(), resolved);
        return Ok(ExecOutcome::Data(out));
    }

    Ok(ExecOutcome::Pause {
        input_param: input_param.to_string(),
        output_param: output_param.to_string(),
        surfaced_value: input_value.clone(),
    })
}
