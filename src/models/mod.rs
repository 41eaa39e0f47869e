//! Request and message models shared across the chat and workflow protocols.
//!
//! # Module structure
//! - `request` - outbound request bodies (`ChatRequest`, `WorkflowRunInput`)
//! - `message` - structured payload types carried by stream events

mod message;
mod request;

pub use message::{
    AgentStep, ApprovalKind, ApprovalRequest, ChatMessage, Citation, CompactionNotice, FileEntry,
    TokenUsage, ToolCall, UsageTotals,
};
pub use request::{Attachment, ChatRequest, WorkflowRunInput};
