//! Chat stream consumption: observer trait, accumulator, and the read loop.
//!
//! The accumulator grows append-only per delta; [`ChatObserver`] callbacks
//! fire after the accumulator has absorbed each event, so an observer may
//! read a consistent snapshot at any callback. `message_complete` is the one
//! point where the finalized message is delivered, and it is delivered at
//! most once per stream.

use futures_util::StreamExt;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::client::{ClientError, ConsoleClient};
use crate::events::ChatEvent;
use crate::models::{
    AgentStep, ApprovalRequest, ChatMessage, ChatRequest, Citation, CompactionNotice, FileEntry,
    ToolCall, UsageTotals,
};

/// Callbacks for chat stream events.
///
/// Every method has a no-op default; implement only the slots you care
/// about. Terminal outcomes also land in the returned [`ChatAccumulator`],
/// so a caller that only wants the end state can pass `&mut ()`.
#[allow(unused_variables)]
pub trait ChatObserver: Send {
    fn on_content_delta(&mut self, delta: &str) {}
    fn on_tool_call(&mut self, call: &ToolCall) {}
    fn on_reasoning_delta(&mut self, step: &str) {}
    fn on_agent_step(&mut self, step: &AgentStep) {}
    fn on_agent_message(&mut self, agent: &str) {}
    fn on_tool_round(&mut self, calls: &[ToolCall]) {}
    fn on_kb_context(&mut self, sources: &[String]) {}
    fn on_kb_warning(&mut self, message: &str) {}
    fn on_terminal_output(&mut self, chunk: &str, is_final: bool) {}
    fn on_file_tree(&mut self, files: &[FileEntry]) {}
    fn on_source_url(&mut self, citation: &Citation) {}
    fn on_plan_start(&mut self, title: Option<&str>) {}
    fn on_plan_step(&mut self, step: &str) {}
    fn on_plan_end(&mut self) {}
    fn on_jsx_preview(&mut self, chunk: &str, is_complete: bool) {}
    fn on_token_usage(&mut self, usage: &UsageTotals) {}
    fn on_context_compacted(&mut self, notice: &CompactionNotice) {}
    fn on_approval_required(&mut self, request: &ApprovalRequest) {}
    fn on_tool_generating(&mut self, name: &str, handler_type: &str) {}
    fn on_artifact(&mut self, payload: &Value) {}
    fn on_message_complete(&mut self, message: &ChatMessage) {}
    fn on_error(&mut self, message: &str) {}
}

/// Observer that ignores everything; useful when only the accumulator
/// matters.
impl ChatObserver for () {}

/// A structured plan built from `plan_start` / `plan_step` / `plan_end`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlanState {
    pub title: Option<String>,
    pub steps: Vec<String>,
    pub finished: bool,
}

/// A tool the backend reported it is synthesizing.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratingTool {
    pub name: String,
    pub handler_type: String,
}

/// Accumulated state of one chat stream.
///
/// Mutated only by the dispatch loop; readable by the caller after each
/// callback and returned when the loop exits.
#[derive(Debug, Default)]
pub struct ChatAccumulator {
    pub content: String,
    pub reasoning: Vec<String>,
    pub tool_calls: Vec<ToolCall>,
    pub tool_rounds: Vec<Vec<ToolCall>>,
    pub agent_steps: Vec<AgentStep>,
    pub current_agent: Option<String>,
    pub kb_sources: Vec<String>,
    pub kb_warnings: Vec<String>,
    pub terminal_output: String,
    pub terminal_finished: bool,
    pub file_tree: Vec<FileEntry>,
    pub citations: Vec<Citation>,
    pub plan: Option<PlanState>,
    pub jsx_preview: String,
    pub jsx_complete: bool,
    pub usage: UsageTotals,
    pub compaction: Option<CompactionNotice>,
    pub pending_approvals: Vec<ApprovalRequest>,
    pub generating_tools: Vec<GeneratingTool>,
    pub artifacts: Vec<Value>,
    /// Set exactly once, by the first `message_complete`
    pub final_message: Option<ChatMessage>,
    /// Terminal stream error, if the stream ended with one
    pub error: Option<String>,
}

impl ChatAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_complete(&self) -> bool {
        self.final_message.is_some()
    }
}

/// Whether the read loop continues after an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Finished,
}

/// Apply one event to the accumulator and notify the observer.
///
/// This is the chat protocol dispatcher: a total match over the vocabulary,
/// so adding an event variant without handling it is a compile error.
fn dispatch<O: ChatObserver + ?Sized>(
    acc: &mut ChatAccumulator,
    observer: &mut O,
    event: ChatEvent,
) -> Flow {
    match event {
        ChatEvent::ContentDelta { content } => {
            acc.content.push_str(&content);
            observer.on_content_delta(&content);
        }
        ChatEvent::ToolCall(call) => {
            observer.on_tool_call(&call);
            acc.tool_calls.push(call);
        }
        ChatEvent::ReasoningDelta { content } => {
            observer.on_reasoning_delta(&content);
            acc.reasoning.push(content);
        }
        ChatEvent::AgentStep(step) => {
            observer.on_agent_step(&step);
            acc.agent_steps.push(step);
        }
        ChatEvent::AgentMessage { agent } => {
            observer.on_agent_message(&agent);
            acc.current_agent = Some(agent);
        }
        ChatEvent::ToolRound { calls } => {
            observer.on_tool_round(&calls);
            acc.tool_rounds.push(calls);
        }
        ChatEvent::KbContext { sources } => {
            observer.on_kb_context(&sources);
            acc.kb_sources = sources;
        }
        ChatEvent::KbWarning { message } => {
            observer.on_kb_warning(&message);
            acc.kb_warnings.push(message);
        }
        ChatEvent::TerminalOutput { content, is_final } => {
            acc.terminal_output.push_str(&content);
            acc.terminal_finished = is_final;
            observer.on_terminal_output(&content, is_final);
        }
        ChatEvent::FileTree { files } => {
            // Replacement snapshot, not a merge.
            acc.file_tree = files;
            observer.on_file_tree(&acc.file_tree);
        }
        ChatEvent::SourceUrl(citation) => {
            observer.on_source_url(&citation);
            acc.citations.push(citation);
        }
        ChatEvent::PlanStart { title } => {
            observer.on_plan_start(title.as_deref());
            acc.plan = Some(PlanState {
                title,
                steps: Vec::new(),
                finished: false,
            });
        }
        ChatEvent::PlanStep { content } => {
            observer.on_plan_step(&content);
            // Tolerate a missing plan_start rather than lose the step.
            acc.plan.get_or_insert_with(PlanState::default).steps.push(content);
        }
        ChatEvent::PlanEnd => {
            if let Some(plan) = acc.plan.as_mut() {
                plan.finished = true;
            }
            observer.on_plan_end();
        }
        ChatEvent::JsxPreview {
            content,
            is_complete,
        } => {
            acc.jsx_preview.push_str(&content);
            acc.jsx_complete = is_complete;
            observer.on_jsx_preview(&content, is_complete);
        }
        ChatEvent::TokenUsage(usage) => {
            acc.usage.record(&usage);
            observer.on_token_usage(&acc.usage);
        }
        ChatEvent::ContextCompacted(notice) => {
            observer.on_context_compacted(&notice);
            acc.compaction = Some(notice);
        }
        ChatEvent::ApprovalRequired(request) => {
            observer.on_approval_required(&request);
            acc.pending_approvals.push(request);
        }
        ChatEvent::ToolGenerating { name, handler_type } => {
            observer.on_tool_generating(&name, &handler_type);
            acc.generating_tools.push(GeneratingTool { name, handler_type });
        }
        ChatEvent::Artifact { payload } => {
            observer.on_artifact(&payload);
            acc.artifacts.push(payload);
        }
        ChatEvent::MessageComplete { message } => {
            // At most one completion per stream; a duplicate (or a stray
            // repeat before done) must not re-invoke the handler.
            if acc.final_message.is_none() {
                observer.on_message_complete(&message);
                acc.final_message = Some(message);
            } else {
                tracing::debug!("ignoring duplicate message_complete");
            }
        }
        ChatEvent::Error { message } => {
            observer.on_error(&message);
            acc.error = Some(message);
            return Flow::Finished;
        }
        ChatEvent::Done => return Flow::Finished,
    }
    Flow::Continue
}

/// Send a chat request and consume its stream to completion.
///
/// Events are dispatched in wire arrival order into the accumulator and the
/// observer. The call returns:
/// - `Ok(accumulator)` when the stream ends, whether normally or with a
///   stream-level error (check [`ChatAccumulator::error`]),
/// - `Err(ClientError::Server | Http)` if the request failed before any
///   streaming began,
/// - `Err(ClientError::Cancelled)` if `cancel` fired; the connection is
///   dropped on the spot.
pub async fn run_chat<O: ChatObserver + ?Sized>(
    client: &ConsoleClient,
    request: &ChatRequest,
    observer: &mut O,
    cancel: &CancellationToken,
) -> Result<ChatAccumulator, ClientError> {
    let mut events = tokio::select! {
        _ = cancel.cancelled() => return Err(ClientError::Cancelled),
        opened = client.chat_events(request) => opened?,
    };

    let mut acc = ChatAccumulator::new();
    loop {
        let next = tokio::select! {
            _ = cancel.cancelled() => return Err(ClientError::Cancelled),
            item = events.next() => item,
        };
        match next {
            None => break,
            Some(Err(e)) => {
                // Mid-stream transport failure: one terminal report through
                // the observer, then the loop ends.
                let message = e.to_string();
                tracing::warn!(error = %message, "chat stream transport error");
                observer.on_error(&message);
                acc.error = Some(message);
                break;
            }
            Some(Ok(event)) => {
                if dispatch(&mut acc, observer, event) == Flow::Finished {
                    break;
                }
            }
        }
    }
    Ok(acc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TokenUsage;

    #[derive(Default)]
    struct Recording {
        deltas: Vec<String>,
        completions: u32,
        errors: Vec<String>,
        plan_steps: Vec<String>,
    }

    impl ChatObserver for Recording {
        fn on_content_delta(&mut self, delta: &str) {
            self.deltas.push(delta.to_string());
        }
        fn on_message_complete(&mut self, _message: &ChatMessage) {
            self.completions += 1;
        }
        fn on_error(&mut self, message: &str) {
            self.errors.push(message.to_string());
        }
        fn on_plan_step(&mut self, step: &str) {
            self.plan_steps.push(step.to_string());
        }
    }

    fn run(events: Vec<ChatEvent>) -> (ChatAccumulator, Recording) {
        let mut acc = ChatAccumulator::new();
        let mut observer = Recording::default();
        for event in events {
            if dispatch(&mut acc, &mut observer, event) == Flow::Finished {
                break;
            }
        }
        (acc, observer)
    }

    #[test]
    fn test_content_deltas_accumulate_in_order() {
        let (acc, observer) = run(vec![
            ChatEvent::ContentDelta {
                content: "Hel".to_string(),
            },
            ChatEvent::ContentDelta {
                content: "lo".to_string(),
            },
            ChatEvent::Done,
        ]);
        assert_eq!(acc.content, "Hello");
        assert_eq!(observer.deltas, vec!["Hel", "lo"]);
    }

    #[test]
    fn test_done_after_message_complete_is_idempotent() {
        let message = ChatMessage {
            id: Some("m-1".to_string()),
            role: "assistant".to_string(),
            content: "Hello".to_string(),
            tool_calls: Vec::new(),
            created_at: None,
        };
        let (acc, observer) = run(vec![
            ChatEvent::MessageComplete {
                message: message.clone(),
            },
            ChatEvent::MessageComplete { message },
            ChatEvent::Done,
        ]);
        assert_eq!(observer.completions, 1);
        assert!(acc.is_complete());
    }

    #[test]
    fn test_error_event_terminates_loop() {
        let (acc, observer) = run(vec![
            ChatEvent::Error {
                message: "overloaded".to_string(),
            },
            // Must never be reached.
            ChatEvent::ContentDelta {
                content: "late".to_string(),
            },
        ]);
        assert_eq!(acc.error.as_deref(), Some("overloaded"));
        assert_eq!(observer.errors, vec!["overloaded"]);
        assert!(acc.content.is_empty());
    }

    #[test]
    fn test_usage_counters_track_per_call_and_totals() {
        let (acc, _) = run(vec![
            ChatEvent::TokenUsage(TokenUsage {
                input_tokens: 10,
                output_tokens: 5,
            }),
            ChatEvent::TokenUsage(TokenUsage {
                input_tokens: 12,
                output_tokens: 7,
            }),
            ChatEvent::Done,
        ]);
        assert_eq!(acc.usage.last_input_tokens, 12);
        assert_eq!(acc.usage.total_input_tokens, 22);
        assert_eq!(acc.usage.total_output_tokens, 12);
    }

    #[test]
    fn test_plan_lifecycle() {
        let (acc, observer) = run(vec![
            ChatEvent::PlanStart {
                title: Some("Deploy".to_string()),
            },
            ChatEvent::PlanStep {
                content: "build".to_string(),
            },
            ChatEvent::PlanStep {
                content: "ship".to_string(),
            },
            ChatEvent::PlanEnd,
            ChatEvent::Done,
        ]);
        let plan = acc.plan.unwrap();
        assert_eq!(plan.title.as_deref(), Some("Deploy"));
        assert_eq!(plan.steps, vec!["build", "ship"]);
        assert!(plan.finished);
        assert_eq!(observer.plan_steps, vec!["build", "ship"]);
    }

    #[test]
    fn test_plan_step_without_start_opens_plan() {
        let (acc, _) = run(vec![
            ChatEvent::PlanStep {
                content: "only step".to_string(),
            },
            ChatEvent::Done,
        ]);
        assert_eq!(acc.plan.unwrap().steps, vec!["only step"]);
    }

    #[test]
    fn test_terminal_output_final_flag() {
        let (acc, _) = run(vec![
            ChatEvent::TerminalOutput {
                content: "$ cargo test\n".to_string(),
                is_final: false,
            },
            ChatEvent::TerminalOutput {
                content: "ok\n".to_string(),
                is_final: true,
            },
            ChatEvent::Done,
        ]);
        assert_eq!(acc.terminal_output, "$ cargo test\nok\n");
        assert!(acc.terminal_finished);
    }

    #[test]
    fn test_file_tree_replaces_snapshot() {
        let (acc, _) = run(vec![
            ChatEvent::FileTree {
                files: vec![FileEntry {
                    path: "old.txt".to_string(),
                    is_dir: false,
                }],
            },
            ChatEvent::FileTree {
                files: vec![FileEntry {
                    path: "new.txt".to_string(),
                    is_dir: false,
                }],
            },
            ChatEvent::Done,
        ]);
        assert_eq!(acc.file_tree.len(), 1);
        assert_eq!(acc.file_tree[0].path, "new.txt");
    }

    #[test]
    fn test_tool_rounds_and_calls_recorded() {
        let call = ToolCall {
            id: None,
            name: "search".to_string(),
            arguments: None,
            output: None,
        };
        let (acc, _) = run(vec![
            ChatEvent::ToolCall(call.clone()),
            ChatEvent::ToolRound {
                calls: vec![call.clone(), call],
            },
            ChatEvent::Done,
        ]);
        assert_eq!(acc.tool_calls.len(), 1);
        assert_eq!(acc.tool_rounds.len(), 1);
        assert_eq!(acc.tool_rounds[0].len(), 2);
    }
}
