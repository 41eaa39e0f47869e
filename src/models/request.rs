use base64::Engine;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Request body for `POST /chat`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatRequest {
    /// Session ID tying the message to a conversation
    pub session_id: String,
    /// The user message to send
    pub message: String,
    /// Always true; the client only speaks the streaming protocol
    pub stream: bool,
    /// Optional file attachments
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachments: Option<Vec<Attachment>>,
}

impl ChatRequest {
    /// Create a request for a fresh session.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            session_id: Uuid::new_v4().to_string(),
            message: message.into(),
            stream: true,
            attachments: None,
        }
    }

    /// Create a request within an existing session.
    pub fn with_session(message: impl Into<String>, session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            message: message.into(),
            stream: true,
            attachments: None,
        }
    }

    /// Attach files to the request.
    pub fn with_attachments(mut self, attachments: Vec<Attachment>) -> Self {
        self.attachments = Some(attachments);
        self
    }
}

/// A file attached to a chat request, carried inline as base64.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Attachment {
    pub name: String,
    pub media_type: String,
    /// Base64-encoded content
    pub data: String,
}

impl Attachment {
    /// Build an attachment from raw bytes, encoding them for transport.
    pub fn from_bytes(name: impl Into<String>, media_type: impl Into<String>, bytes: &[u8]) -> Self {
        Self {
            name: name.into(),
            media_type: media_type.into(),
            data: base64::engine::general_purpose::STANDARD.encode(bytes),
        }
    }
}

/// Request body for `POST /workflows/{id}/run`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkflowRunInput {
    /// Free-form input handed to the workflow's first step
    pub input: serde_json::Value,
}

impl WorkflowRunInput {
    pub fn new(input: impl Into<serde_json::Value>) -> Self {
        Self {
            input: input.into(),
        }
    }

    /// Convenience for the common plain-text input case.
    pub fn text(input: impl Into<String>) -> Self {
        Self {
            input: serde_json::Value::String(input.into()),
        }
    }
}
