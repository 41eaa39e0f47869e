use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One tool invocation recorded during a chat stream.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCall {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    /// Arguments the agent called the tool with
    #[serde(default, alias = "input", skip_serializing_if = "Option::is_none")]
    pub arguments: Option<serde_json::Value>,
    /// Tool output, present once the call has finished
    #[serde(default, alias = "result", skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
}

/// One sub-agent execution step in multi-agent mode.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentStep {
    pub agent: String,
    #[serde(default)]
    pub task: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

/// A citation emitted via `source_url`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Citation {
    pub url: String,
    #[serde(default)]
    pub title: Option<String>,
}

/// One entry of a `file_tree` snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FileEntry {
    pub path: String,
    #[serde(default)]
    pub is_dir: bool,
}

/// Per-call token counts from a `token_usage` event.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenUsage {
    #[serde(default)]
    pub input_tokens: u64,
    #[serde(default)]
    pub output_tokens: u64,
}

/// Running token counters: the most recent call plus session totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UsageTotals {
    pub last_input_tokens: u64,
    pub last_output_tokens: u64,
    pub total_input_tokens: u64,
    pub total_output_tokens: u64,
}

impl UsageTotals {
    pub fn record(&mut self, usage: &TokenUsage) {
        self.last_input_tokens = usage.input_tokens;
        self.last_output_tokens = usage.output_tokens;
        self.total_input_tokens += usage.input_tokens;
        self.total_output_tokens += usage.output_tokens;
    }
}

/// Notice that prior conversation history was summarized away.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CompactionNotice {
    /// How many prior messages were folded into the summary
    #[serde(alias = "messages_removed")]
    pub messages_summarized: u32,
    /// Preview of the summary text
    #[serde(default)]
    pub preview: String,
}

/// Which kind of blocking approval a stream is waiting on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ApprovalKind {
    /// Human-in-the-loop checkpoint
    #[default]
    Hitl,
    /// Approval of a newly synthesized tool
    ToolProposal,
}

/// A blocking approval request surfaced mid-stream.
///
/// The stream does not advance past the checkpoint until the caller resolves
/// the proposal out of band, keyed by `proposal_id`.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ApprovalRequest {
    pub proposal_id: String,
    #[serde(default, alias = "name")]
    pub tool_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub payload: Option<serde_json::Value>,
    /// Set by the decoder from the event kind, not the payload.
    #[serde(skip)]
    pub kind: ApprovalKind,
}

/// The fully-assembled message delivered by `message_complete`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default = "default_role")]
    pub role: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub tool_calls: Vec<ToolCall>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

fn default_role() -> String {
    "assistant".to_string()
}
