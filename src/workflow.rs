//! Workflow stream consumption: run tracker, observer trait, and read loop.
//!
//! Step and node completion events may arrive in an order that differs from
//! the declared pipeline order (branching, parallel execution in the DAG
//! variant). The tracker therefore keys every step event by its declared
//! `order` and every node event by its id, and keeps the step table sorted
//! by `order` at all times; arrival sequence is never used for placement.

use futures_util::StreamExt;
use tokio_util::sync::CancellationToken;

use crate::client::{ClientError, ConsoleClient};
use crate::events::{NodeType, WorkflowEvent};
use crate::models::WorkflowRunInput;

/// Output value marking a step or node as deliberately not executed.
pub const SKIPPED_SENTINEL: &str = "skipped";

/// Lifecycle of a single step or node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StepStatus {
    #[default]
    Pending,
    Active,
    Completed,
    /// Inert: deliberately not executed. Distinct from completed with empty
    /// output, and excluded from expandable-output treatment.
    Skipped,
    Failed,
}

/// Overall status of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RunStatus {
    #[default]
    Running,
    Completed,
    Failed,
}

/// A step as declared in the workflow definition, before any events arrive.
#[derive(Debug, Clone, PartialEq)]
pub struct DeclaredStep {
    /// Unique declared order; not necessarily contiguous
    pub order: u32,
    pub name: String,
    pub task: Option<String>,
}

/// A DAG node as declared in the workflow definition.
#[derive(Debug, Clone, PartialEq)]
pub struct DeclaredNode {
    pub id: String,
    pub node_type: NodeType,
    pub label: Option<String>,
}

/// Tracked state of one linear step.
#[derive(Debug, Clone, PartialEq)]
pub struct StepState {
    pub order: u32,
    pub name: Option<String>,
    pub task: Option<String>,
    pub status: StepStatus,
    /// Streamed then final output; empty for skipped steps
    pub output: String,
    pub error: Option<String>,
}

impl StepState {
    fn declared(step: DeclaredStep) -> Self {
        Self {
            order: step.order,
            name: Some(step.name),
            task: step.task,
            status: StepStatus::Pending,
            output: String::new(),
            error: None,
        }
    }

    fn undeclared(order: u32) -> Self {
        Self {
            order,
            name: None,
            task: None,
            status: StepStatus::Pending,
            output: String::new(),
            error: None,
        }
    }

    /// Whether a presentation layer should offer the output for expansion.
    /// Skipped steps have none, by definition.
    pub fn has_expandable_output(&self) -> bool {
        self.status == StepStatus::Completed
    }
}

/// Tracked state of one DAG node.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeState {
    pub id: String,
    pub node_type: NodeType,
    pub label: Option<String>,
    pub status: StepStatus,
    /// Streamed then final output; always empty for condition nodes
    pub output: String,
    /// Branch-selector label chosen by a condition node
    pub branch: Option<String>,
    pub error: Option<String>,
}

impl NodeState {
    fn new(id: String, node_type: NodeType, label: Option<String>) -> Self {
        Self {
            id,
            node_type,
            label,
            status: StepStatus::Pending,
            output: String::new(),
            branch: None,
            error: None,
        }
    }
}

/// Callbacks for workflow stream events.
///
/// Defaults are no-ops; step/node callbacks receive the tracked state after
/// the tracker has absorbed the event.
#[allow(unused_variables)]
pub trait WorkflowObserver: Send {
    fn on_workflow_start(&mut self, run_id: &str, total_steps: u32) {}
    fn on_step_start(&mut self, step: &StepState) {}
    fn on_step_delta(&mut self, order: u32, delta: &str) {}
    fn on_step_complete(&mut self, step: &StepState) {}
    fn on_step_error(&mut self, step: &StepState) {}
    fn on_node_start(&mut self, node: &NodeState) {}
    fn on_node_delta(&mut self, node_id: &str, delta: &str) {}
    fn on_node_complete(&mut self, node: &NodeState) {}
    fn on_node_error(&mut self, node: &NodeState) {}
    fn on_workflow_complete(&mut self, output: &str) {}
    fn on_workflow_error(&mut self, error: &str) {}
}

impl WorkflowObserver for () {}

/// Whether the read loop continues after an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Finished,
}

/// Progress tracker for one workflow run, linear and/or DAG.
///
/// Construct it from the declared step list (and node list for graph-shaped
/// workflows) before starting the run, then hand it to [`run_workflow`]. A
/// single stream may carry both vocabularies; the two tables are
/// independent.
#[derive(Debug, Default)]
pub struct WorkflowRunTracker {
    pub run_id: Option<String>,
    /// Sorted by declared `order` at all times
    steps: Vec<StepState>,
    nodes: Vec<NodeState>,
    pub final_output: Option<String>,
    pub status: RunStatus,
    /// Terminal run error from `workflow_error`
    pub error: Option<String>,
    /// Order of the step currently streaming, if any
    pub active_step: Option<u32>,
    /// Guards completion callbacks against re-invocation
    finished: bool,
}

impl WorkflowRunTracker {
    /// Create a tracker for a linear workflow with the given declared steps.
    pub fn new(declared: Vec<DeclaredStep>) -> Self {
        let mut steps: Vec<StepState> = declared.into_iter().map(StepState::declared).collect();
        steps.sort_by_key(|s| s.order);
        Self {
            steps,
            ..Self::default()
        }
    }

    /// Add declared DAG nodes for a graph-shaped workflow.
    pub fn with_nodes(mut self, declared: Vec<DeclaredNode>) -> Self {
        self.nodes = declared
            .into_iter()
            .map(|n| NodeState::new(n.id, n.node_type, n.label))
            .collect();
        self
    }

    /// Steps sorted by declared order.
    pub fn steps(&self) -> &[StepState] {
        &self.steps
    }

    pub fn nodes(&self) -> &[NodeState] {
        &self.nodes
    }

    pub fn step(&self, order: u32) -> Option<&StepState> {
        self.steps.iter().find(|s| s.order == order)
    }

    pub fn node(&self, id: &str) -> Option<&NodeState> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Index of the step with this declared order, inserting a placeholder
    /// in sorted position if the server streams a step the definition did
    /// not declare.
    fn step_index(&mut self, order: u32) -> usize {
        match self.steps.binary_search_by_key(&order, |s| s.order) {
            Ok(idx) => idx,
            Err(idx) => {
                self.steps.insert(idx, StepState::undeclared(order));
                idx
            }
        }
    }

    fn node_index(&mut self, id: &str, node_type: Option<NodeType>) -> usize {
        match self.nodes.iter().position(|n| n.id == id) {
            Some(idx) => idx,
            None => {
                self.nodes.push(NodeState::new(
                    id.to_string(),
                    node_type.unwrap_or(NodeType::Agent),
                    None,
                ));
                self.nodes.len() - 1
            }
        }
    }

    /// Apply one event and notify the observer. Total match over the
    /// workflow vocabulary.
    fn dispatch<O: WorkflowObserver + ?Sized>(
        &mut self,
        observer: &mut O,
        event: WorkflowEvent,
    ) -> Flow {
        match event {
            WorkflowEvent::WorkflowStart {
                run_id,
                total_steps,
            } => {
                observer.on_workflow_start(&run_id, total_steps);
                self.run_id = Some(run_id);
            }
            WorkflowEvent::StepStart { order, name, task } => {
                self.active_step = Some(order);
                let idx = self.step_index(order);
                let step = &mut self.steps[idx];
                step.status = StepStatus::Active;
                if name.is_some() {
                    step.name = name;
                }
                if task.is_some() {
                    step.task = task;
                }
                observer.on_step_start(&self.steps[idx]);
            }
            WorkflowEvent::StepContentDelta { order, delta } => {
                let idx = self.step_index(order);
                self.steps[idx].output.push_str(&delta);
                observer.on_step_delta(order, &delta);
            }
            WorkflowEvent::StepComplete { order, output } => {
                let idx = self.step_index(order);
                let step = &mut self.steps[idx];
                if output == SKIPPED_SENTINEL {
                    step.status = StepStatus::Skipped;
                    step.output.clear();
                } else {
                    step.status = StepStatus::Completed;
                    step.output = output;
                }
                if self.active_step == Some(order) {
                    self.active_step = None;
                }
                observer.on_step_complete(&self.steps[idx]);
            }
            WorkflowEvent::StepError { order, error } => {
                // A failed step poisons the run status, but downstream steps
                // may still emit events; the loop keeps consuming.
                let idx = self.step_index(order);
                let step = &mut self.steps[idx];
                step.status = StepStatus::Failed;
                step.error = Some(error);
                if self.active_step == Some(order) {
                    self.active_step = None;
                }
                self.status = RunStatus::Failed;
                observer.on_step_error(&self.steps[idx]);
            }
            WorkflowEvent::WorkflowComplete { output } => {
                if !self.finished {
                    self.finished = true;
                    self.final_output = Some(output.clone());
                    // A step failure earlier in the run keeps the run failed.
                    if self.status == RunStatus::Running {
                        self.status = RunStatus::Completed;
                    }
                    observer.on_workflow_complete(&output);
                } else {
                    tracing::debug!("ignoring duplicate workflow_complete");
                }
            }
            WorkflowEvent::WorkflowError { error } => {
                self.finished = true;
                self.status = RunStatus::Failed;
                self.error = Some(error.clone());
                observer.on_workflow_error(&error);
                return Flow::Finished;
            }
            WorkflowEvent::NodeStart {
                node_id,
                node_type,
                label,
            } => {
                let idx = self.node_index(&node_id, Some(node_type));
                let node = &mut self.nodes[idx];
                node.status = StepStatus::Active;
                node.node_type = node_type;
                if label.is_some() {
                    node.label = label;
                }
                observer.on_node_start(&self.nodes[idx]);
            }
            WorkflowEvent::NodeContentDelta { node_id, delta } => {
                let idx = self.node_index(&node_id, None);
                let node = &mut self.nodes[idx];
                // Condition nodes select a branch; they never accumulate
                // streamed prose.
                if node.node_type != NodeType::Condition {
                    node.output.push_str(&delta);
                    observer.on_node_delta(&node_id, &delta);
                }
            }
            WorkflowEvent::NodeComplete { node_id, output } => {
                let idx = self.node_index(&node_id, None);
                let node = &mut self.nodes[idx];
                if output == SKIPPED_SENTINEL {
                    node.status = StepStatus::Skipped;
                    node.output.clear();
                } else if node.node_type == NodeType::Condition {
                    node.status = StepStatus::Completed;
                    node.branch = Some(output);
                } else {
                    node.status = StepStatus::Completed;
                    node.output = output;
                }
                observer.on_node_complete(&self.nodes[idx]);
            }
            WorkflowEvent::NodeError { node_id, error } => {
                let idx = self.node_index(&node_id, None);
                let node = &mut self.nodes[idx];
                node.status = StepStatus::Failed;
                node.error = Some(error);
                self.status = RunStatus::Failed;
                observer.on_node_error(&self.nodes[idx]);
            }
            WorkflowEvent::Done => {
                // The stream may end without a completion event; keep
                // whatever status stands.
                return Flow::Finished;
            }
        }
        Flow::Continue
    }
}

/// Start a workflow run and consume its stream to completion.
///
/// The tracker is supplied by the caller (constructed from the declared
/// step/node lists) and holds the full run state when the call returns. The
/// returned status mirrors `tracker.status`. Error semantics match
/// [`crate::chat::run_chat`]: establishment failures and cancellation are
/// `Err`, everything else lands in the tracker and observer.
pub async fn run_workflow<O: WorkflowObserver + ?Sized>(
    client: &ConsoleClient,
    workflow_id: &str,
    input: &WorkflowRunInput,
    tracker: &mut WorkflowRunTracker,
    observer: &mut O,
    cancel: &CancellationToken,
) -> Result<RunStatus, ClientError> {
    let mut events = tokio::select! {
        _ = cancel.cancelled() => return Err(ClientError::Cancelled),
        opened = client.workflow_events(workflow_id, input) => opened?,
    };

    loop {
        let next = tokio::select! {
            _ = cancel.cancelled() => return Err(ClientError::Cancelled),
            item = events.next() => item,
        };
        match next {
            None => break,
            Some(Err(e)) => {
                let message = e.to_string();
                tracing::warn!(error = %message, "workflow stream transport error");
                tracker.status = RunStatus::Failed;
                tracker.error = Some(message.clone());
                observer.on_workflow_error(&message);
                break;
            }
            Some(Ok(event)) => {
                if tracker.dispatch(observer, event) == Flow::Finished {
                    break;
                }
            }
        }
    }
    Ok(tracker.status)
}
