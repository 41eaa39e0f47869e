//! Internal payload deserialization structs.
//!
//! One struct per event kind whose payload is not already a model type.
//! Aliases cover the field-name variants the backend has shipped over time.

use serde::Deserialize;

use super::workflow::NodeType;
use crate::models::{ChatMessage, FileEntry, ToolCall};

// ---- chat protocol ----

#[derive(Debug, Deserialize)]
pub(crate) struct ContentDeltaPayload {
    #[serde(alias = "delta", alias = "text")]
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AgentMessagePayload {
    pub agent: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ToolRoundPayload {
    #[serde(default)]
    pub calls: Vec<ToolCall>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct KbContextPayload {
    #[serde(default, alias = "knowledge_bases")]
    pub sources: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct KbWarningPayload {
    #[serde(alias = "warning")]
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TerminalOutputPayload {
    #[serde(default, alias = "output")]
    pub content: String,
    #[serde(default)]
    pub is_final: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct FileTreePayload {
    #[serde(default)]
    pub files: Vec<FileEntry>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PlanStartPayload {
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PlanStepPayload {
    #[serde(alias = "step", alias = "text")]
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct JsxPreviewPayload {
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub is_complete: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ToolGeneratingPayload {
    pub name: String,
    #[serde(default)]
    pub handler_type: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MessageCompletePayload {
    pub message: ChatMessage,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorPayload {
    #[serde(alias = "detail", alias = "error")]
    pub message: String,
}

// ---- workflow protocol ----

#[derive(Debug, Deserialize)]
pub(crate) struct WorkflowStartPayload {
    pub run_id: String,
    #[serde(default, alias = "step_count")]
    pub total_steps: u32,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StepStartPayload {
    pub order: u32,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub task: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StepDeltaPayload {
    pub order: u32,
    #[serde(alias = "content")]
    pub delta: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StepCompletePayload {
    pub order: u32,
    #[serde(default)]
    pub output: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StepErrorPayload {
    pub order: u32,
    #[serde(alias = "message")]
    pub error: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WorkflowCompletePayload {
    #[serde(default, alias = "final_output")]
    pub output: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WorkflowErrorPayload {
    #[serde(alias = "message")]
    pub error: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct NodeStartPayload {
    pub node_id: String,
    pub node_type: NodeType,
    #[serde(default)]
    pub label: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct NodeDeltaPayload {
    pub node_id: String,
    #[serde(alias = "content")]
    pub delta: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct NodeCompletePayload {
    pub node_id: String,
    #[serde(default)]
    pub output: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct NodeErrorPayload {
    pub node_id: String,
    #[serde(alias = "message")]
    pub error: String,
}
