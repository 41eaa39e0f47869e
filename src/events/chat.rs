//! Chat protocol events.

use serde_json::Value;

use super::payloads::*;
use super::WireEvent;
use crate::models::{
    AgentStep, ApprovalKind, ApprovalRequest, ChatMessage, Citation, CompactionNotice, FileEntry,
    TokenUsage, ToolCall,
};
use crate::sse::Frame;

/// Typed events of the conversational stream.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatEvent {
    /// Text appended to the assistant message
    ContentDelta { content: String },
    /// A structured tool invocation
    ToolCall(ToolCall),
    /// One reasoning/"thinking" step
    ReasoningDelta { content: String },
    /// A sub-agent execution step (multi-agent mode)
    AgentStep(AgentStep),
    /// Which sub-agent authored the following content
    AgentMessage { agent: String },
    /// A batch of tool calls forming one round
    ToolRound { calls: Vec<ToolCall> },
    /// Which knowledge bases were consulted
    KbContext { sources: Vec<String> },
    /// A knowledge-base lookup warning
    KbWarning { message: String },
    /// Streamed command output, flagged when the last chunk arrives
    TerminalOutput { content: String, is_final: bool },
    /// Replacement snapshot of the file/directory listing
    FileTree { files: Vec<FileEntry> },
    /// One citation
    SourceUrl(Citation),
    /// A structured plan display opens
    PlanStart { title: Option<String> },
    /// One step appended to the open plan
    PlanStep { content: String },
    /// The plan display closes
    PlanEnd,
    /// Streamed renderable-UI source, flagged when complete
    JsxPreview { content: String, is_complete: bool },
    /// Per-call token counts
    TokenUsage(TokenUsage),
    /// Prior messages were summarized away
    ContextCompacted(CompactionNotice),
    /// Blocking human-in-the-loop or tool-creation approval
    ApprovalRequired(ApprovalRequest),
    /// A tool is being synthesized ahead of its proposal
    ToolGenerating { name: String, handler_type: String },
    /// Opaque structured artifact
    Artifact { payload: Value },
    /// The fully-assembled message; does not terminate the loop
    MessageComplete { message: ChatMessage },
    /// Terminal whole-stream error
    Error { message: String },
    /// Terminates the read loop
    Done,
}

impl WireEvent for ChatEvent {
    fn decode(frame: &Frame) -> Option<Self> {
        let data = frame.data.as_str();
        match frame.kind.as_str() {
            "content_delta" => serde_json::from_str::<ContentDeltaPayload>(data)
                .ok()
                .map(|p| ChatEvent::ContentDelta { content: p.content }),
            "tool_call" => serde_json::from_str::<ToolCall>(data)
                .ok()
                .map(ChatEvent::ToolCall),
            "reasoning_delta" => serde_json::from_str::<ContentDeltaPayload>(data)
                .ok()
                .map(|p| ChatEvent::ReasoningDelta { content: p.content }),
            "agent_step" => serde_json::from_str::<AgentStep>(data)
                .ok()
                .map(ChatEvent::AgentStep),
            "agent_message" => serde_json::from_str::<AgentMessagePayload>(data)
                .ok()
                .map(|p| ChatEvent::AgentMessage { agent: p.agent }),
            "tool_round" => serde_json::from_str::<ToolRoundPayload>(data)
                .ok()
                .map(|p| ChatEvent::ToolRound { calls: p.calls }),
            "kb_context" => serde_json::from_str::<KbContextPayload>(data)
                .ok()
                .map(|p| ChatEvent::KbContext { sources: p.sources }),
            "kb_warning" => serde_json::from_str::<KbWarningPayload>(data)
                .ok()
                .map(|p| ChatEvent::KbWarning { message: p.message }),
            "terminal_output" => serde_json::from_str::<TerminalOutputPayload>(data)
                .ok()
                .map(|p| ChatEvent::TerminalOutput {
                    content: p.content,
                    is_final: p.is_final,
                }),
            "file_tree" => serde_json::from_str::<FileTreePayload>(data)
                .ok()
                .map(|p| ChatEvent::FileTree { files: p.files }),
            "source_url" => serde_json::from_str::<Citation>(data)
                .ok()
                .map(ChatEvent::SourceUrl),
            "plan_start" => serde_json::from_str::<PlanStartPayload>(data)
                .ok()
                .map(|p| ChatEvent::PlanStart { title: p.title }),
            "plan_step" => serde_json::from_str::<PlanStepPayload>(data)
                .ok()
                .map(|p| ChatEvent::PlanStep { content: p.content }),
            "plan_end" => Some(ChatEvent::PlanEnd),
            "jsx_preview" => serde_json::from_str::<JsxPreviewPayload>(data)
                .ok()
                .map(|p| ChatEvent::JsxPreview {
                    content: p.content,
                    is_complete: p.is_complete,
                }),
            "token_usage" => serde_json::from_str::<TokenUsage>(data)
                .ok()
                .map(ChatEvent::TokenUsage),
            "context_compacted" => serde_json::from_str::<CompactionNotice>(data)
                .ok()
                .map(ChatEvent::ContextCompacted),
            "hitl_approval_required" => serde_json::from_str::<ApprovalRequest>(data)
                .ok()
                .map(|mut request| {
                    request.kind = ApprovalKind::Hitl;
                    ChatEvent::ApprovalRequired(request)
                }),
            "tool_proposal_required" => serde_json::from_str::<ApprovalRequest>(data)
                .ok()
                .map(|mut request| {
                    request.kind = ApprovalKind::ToolProposal;
                    ChatEvent::ApprovalRequired(request)
                }),
            "tool_generating" => serde_json::from_str::<ToolGeneratingPayload>(data)
                .ok()
                .map(|p| ChatEvent::ToolGenerating {
                    name: p.name,
                    handler_type: p.handler_type,
                }),
            "artifact" => serde_json::from_str::<Value>(data)
                .ok()
                .map(|payload| ChatEvent::Artifact { payload }),
            "message_complete" => serde_json::from_str::<MessageCompletePayload>(data)
                .ok()
                .map(|p| ChatEvent::MessageComplete { message: p.message }),
            "error" => serde_json::from_str::<ErrorPayload>(data)
                .ok()
                .map(|p| ChatEvent::Error { message: p.message }),
            // done may carry an empty or even invalid payload; it is the
            // sentinel either way.
            "done" => Some(ChatEvent::Done),
            _ => None,
        }
    }

    fn is_terminal(&self) -> bool {
        // A whole-stream error ends the stream just like done; nothing
        // meaningful can follow it on the wire.
        matches!(self, ChatEvent::Done | ChatEvent::Error { .. })
    }

    fn event_kind(&self) -> &'static str {
        match self {
            ChatEvent::ContentDelta { .. } => "content_delta",
            ChatEvent::ToolCall(_) => "tool_call",
            ChatEvent::ReasoningDelta { .. } => "reasoning_delta",
            ChatEvent::AgentStep(_) => "agent_step",
            ChatEvent::AgentMessage { .. } => "agent_message",
            ChatEvent::ToolRound { .. } => "tool_round",
            ChatEvent::KbContext { .. } => "kb_context",
            ChatEvent::KbWarning { .. } => "kb_warning",
            ChatEvent::TerminalOutput { .. } => "terminal_output",
            ChatEvent::FileTree { .. } => "file_tree",
            ChatEvent::SourceUrl(_) => "source_url",
            ChatEvent::PlanStart { .. } => "plan_start",
            ChatEvent::PlanStep { .. } => "plan_step",
            ChatEvent::PlanEnd => "plan_end",
            ChatEvent::JsxPreview { .. } => "jsx_preview",
            ChatEvent::TokenUsage(_) => "token_usage",
            ChatEvent::ContextCompacted(_) => "context_compacted",
            ChatEvent::ApprovalRequired(request) => match request.kind {
                ApprovalKind::Hitl => "hitl_approval_required",
                ApprovalKind::ToolProposal => "tool_proposal_required",
            },
            ChatEvent::ToolGenerating { .. } => "tool_generating",
            ChatEvent::Artifact { .. } => "artifact",
            ChatEvent::MessageComplete { .. } => "message_complete",
            ChatEvent::Error { .. } => "error",
            ChatEvent::Done => "done",
        }
    }
}
