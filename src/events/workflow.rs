//! Workflow protocol events, covering both the linear (`step_*`) and DAG
//! (`node_*`) vocabularies.
//!
//! Nothing in a frame says which vocabulary a run speaks; the consumer infers
//! it from the kinds that actually arrive, and a single stream may carry
//! both. The tracker therefore keeps steps and nodes in separate tables.

use serde::{Deserialize, Serialize};

use super::payloads::*;
use super::WireEvent;
use crate::sse::Frame;

/// DAG node categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    Start,
    Agent,
    /// Branch point; its output is a branch-selector label, not prose
    Condition,
    End,
    /// Unmodeled node type, kept for forward compatibility
    #[serde(other)]
    Other,
}

/// Typed events of a workflow run stream.
#[derive(Debug, Clone, PartialEq)]
pub enum WorkflowEvent {
    /// Run accepted; announces the run id and declared step count
    WorkflowStart { run_id: String, total_steps: u32 },
    /// A declared step began executing
    StepStart {
        order: u32,
        name: Option<String>,
        task: Option<String>,
    },
    /// Streamed partial output for the step with this declared order
    StepContentDelta { order: u32, delta: String },
    /// Final output for a step
    StepComplete { order: u32, output: String },
    /// A step failed; the stream may still carry later steps
    StepError { order: u32, error: String },
    /// Final aggregate output of the run
    WorkflowComplete { output: String },
    /// Terminal whole-run error
    WorkflowError { error: String },
    /// A DAG node began executing
    NodeStart {
        node_id: String,
        node_type: NodeType,
        label: Option<String>,
    },
    /// Streamed partial output for a DAG node
    NodeContentDelta { node_id: String, delta: String },
    /// Final output (or branch label) for a DAG node
    NodeComplete { node_id: String, output: String },
    /// A DAG node failed
    NodeError { node_id: String, error: String },
    /// Terminates the read loop for either variant
    Done,
}

impl WireEvent for WorkflowEvent {
    fn decode(frame: &Frame) -> Option<Self> {
        let data = frame.data.as_str();
        match frame.kind.as_str() {
            "workflow_start" => serde_json::from_str::<WorkflowStartPayload>(data)
                .ok()
                .map(|p| WorkflowEvent::WorkflowStart {
                    run_id: p.run_id,
                    total_steps: p.total_steps,
                }),
            "step_start" => serde_json::from_str::<StepStartPayload>(data)
                .ok()
                .map(|p| WorkflowEvent::StepStart {
                    order: p.order,
                    name: p.name,
                    task: p.task,
                }),
            "step_content_delta" => serde_json::from_str::<StepDeltaPayload>(data)
                .ok()
                .map(|p| WorkflowEvent::StepContentDelta {
                    order: p.order,
                    delta: p.delta,
                }),
            "step_complete" => serde_json::from_str::<StepCompletePayload>(data)
                .ok()
                .map(|p| WorkflowEvent::StepComplete {
                    order: p.order,
                    output: p.output,
                }),
            "step_error" => serde_json::from_str::<StepErrorPayload>(data)
                .ok()
                .map(|p| WorkflowEvent::StepError {
                    order: p.order,
                    error: p.error,
                }),
            "workflow_complete" => serde_json::from_str::<WorkflowCompletePayload>(data)
                .ok()
                .map(|p| WorkflowEvent::WorkflowComplete { output: p.output }),
            "workflow_error" => serde_json::from_str::<WorkflowErrorPayload>(data)
                .ok()
                .map(|p| WorkflowEvent::WorkflowError { error: p.error }),
            "node_start" => serde_json::from_str::<NodeStartPayload>(data)
                .ok()
                .map(|p| WorkflowEvent::NodeStart {
                    node_id: p.node_id,
                    node_type: p.node_type,
                    label: p.label,
                }),
            "node_content_delta" => serde_json::from_str::<NodeDeltaPayload>(data)
                .ok()
                .map(|p| WorkflowEvent::NodeContentDelta {
                    node_id: p.node_id,
                    delta: p.delta,
                }),
            "node_complete" => serde_json::from_str::<NodeCompletePayload>(data)
                .ok()
                .map(|p| WorkflowEvent::NodeComplete {
                    node_id: p.node_id,
                    output: p.output,
                }),
            "node_error" => serde_json::from_str::<NodeErrorPayload>(data)
                .ok()
                .map(|p| WorkflowEvent::NodeError {
                    node_id: p.node_id,
                    error: p.error,
                }),
            "done" => Some(WorkflowEvent::Done),
            _ => None,
        }
    }

    fn is_terminal(&self) -> bool {
        // workflow_error is a whole-run error and ends the stream just like
        // done; step_error does not, later steps may still emit.
        matches!(
            self,
            WorkflowEvent::Done | WorkflowEvent::WorkflowError { .. }
        )
    }

    fn event_kind(&self) -> &'static str {
        match self {
            WorkflowEvent::WorkflowStart { .. } => "workflow_start",
            WorkflowEvent::StepStart { .. } => "step_start",
            WorkflowEvent::StepContentDelta { .. } => "step_content_delta",
            WorkflowEvent::StepComplete { .. } => "step_complete",
            WorkflowEvent::StepError { .. } => "step_error",
            WorkflowEvent::WorkflowComplete { .. } => "workflow_complete",
            WorkflowEvent::WorkflowError { .. } => "workflow_error",
            WorkflowEvent::NodeStart { .. } => "node_start",
            WorkflowEvent::NodeContentDelta { .. } => "node_content_delta",
            WorkflowEvent::NodeComplete { .. } => "node_complete",
            WorkflowEvent::NodeError { .. } => "node_error",
            WorkflowEvent::Done => "done",
        }
    }
}
