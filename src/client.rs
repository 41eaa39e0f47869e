//! HTTP client for the Crewdeck console API.
//!
//! Opens the streaming endpoints (`POST /chat`, `POST /workflows/{id}/run`)
//! and turns the chunked response body into a typed event stream. One stream
//! per request: the protocol is fire-once, with no retry or reconnect layer.

use std::collections::VecDeque;
use std::pin::Pin;

use futures::stream::{self, Stream};
use futures_util::StreamExt;
use reqwest::header::ACCEPT;
use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

use crate::events::WireEvent;
use crate::models::{ChatRequest, WorkflowRunInput};
use crate::sse::{Frame, FrameAssembler};

/// Error type for client operations.
#[derive(Debug, Error)]
pub enum ClientError {
    /// HTTP transport failed (connect, send, or mid-stream read)
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    /// The server refused the request before any streaming began
    #[error("server error ({status}): {detail}")]
    Server { status: u16, detail: String },
    /// The stream was cancelled through its cancellation token
    #[error("stream cancelled")]
    Cancelled,
}

impl ClientError {
    /// Whether this error is a deliberate cancellation, which callers
    /// conventionally suppress from user-facing error surfaces.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ClientError::Cancelled)
    }
}

/// A pinned, boxed stream of typed events.
pub type EventStream<E> = Pin<Box<dyn Stream<Item = Result<E, ClientError>> + Send>>;

/// Error body shape for non-2xx responses.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: String,
}

/// Client for the Crewdeck console API.
///
/// Holds the base URL, an optional bearer token, and a reusable HTTP client.
/// Each call to a streaming method owns its own connection and parser state;
/// nothing is shared between concurrent streams.
pub struct ConsoleClient {
    base_url: String,
    bearer_token: Option<String>,
    client: reqwest::Client,
}

impl ConsoleClient {
    /// Create a client for the given base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            bearer_token: None,
            client: reqwest::Client::new(),
        }
    }

    /// Attach a bearer token sent with every request.
    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Open the chat stream for one request.
    ///
    /// Returns the raw typed event stream. Most callers want the driver in
    /// [`crate::chat::run_chat`] instead, which layers the accumulator and
    /// observer dispatch on top.
    pub async fn chat_events(&self, request: &ChatRequest) -> Result<EventStream<crate::ChatEvent>, ClientError> {
        let url = format!("{}/chat", self.base_url);
        let response = self.open_stream(&url, request).await?;
        Ok(event_stream(response))
    }

    /// Start a workflow run and open its event stream.
    pub async fn workflow_events(
        &self,
        workflow_id: &str,
        input: &WorkflowRunInput,
    ) -> Result<EventStream<crate::WorkflowEvent>, ClientError> {
        let url = format!("{}/workflows/{}/run", self.base_url, workflow_id);
        let response = self.open_stream(&url, input).await?;
        Ok(event_stream(response))
    }

    /// Check whether the console API is reachable.
    pub async fn health_check(&self) -> Result<bool, ClientError> {
        let url = format!("{}/health", self.base_url);
        let response = self.client.get(&url).send().await?;
        Ok(response.status().is_success())
    }

    async fn open_stream<B: serde::Serialize>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<reqwest::Response, ClientError> {
        let mut request = self
            .client
            .post(url)
            .header(ACCEPT, "text/event-stream")
            .json(body);
        if let Some(token) = &self.bearer_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            // The body is read once as a JSON error envelope; anything else
            // falls back to a generic message keyed by the status code.
            let body = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ErrorBody>(&body)
                .map(|b| b.detail)
                .unwrap_or_else(|_| generic_status_message(status).to_string());
            return Err(ClientError::Server {
                status: status.as_u16(),
                detail,
            });
        }
        Ok(response)
    }
}

/// Fallback error text for non-2xx responses without a parseable body.
fn generic_status_message(status: StatusCode) -> &'static str {
    match status.as_u16() {
        400 => "invalid request",
        401 => "authentication required",
        403 => "not authorized",
        404 => "not found",
        429 => "rate limited",
        500..=599 => "server error",
        _ => "request failed",
    }
}

/// Turn a streaming response body into a typed event stream.
///
/// The loop suspends only while awaiting the next chunk, then drains every
/// frame the chunk completed before suspending again, so events are yielded
/// in wire arrival order. Frames that decode to no event (unknown kind,
/// malformed payload) are dropped and the loop continues. A terminal event
/// ends the stream; so does end-of-body or a transport read error.
fn event_stream<E: WireEvent + Send + 'static>(response: reqwest::Response) -> EventStream<E> {
    let bytes_stream = response.bytes_stream();

    Box::pin(stream::unfold(
        (
            bytes_stream,
            FrameAssembler::new(),
            VecDeque::<Frame>::new(),
            false,
        ),
        |(mut bytes_stream, mut assembler, mut pending, mut finished)| async move {
            loop {
                while let Some(frame) = pending.pop_front() {
                    match E::decode(&frame) {
                        Some(event) => {
                            if event.is_terminal() {
                                finished = true;
                                // Frames buffered behind the terminal must
                                // not surface on a later poll.
                                pending.clear();
                            }
                            return Some((Ok(event), (bytes_stream, assembler, pending, finished)));
                        }
                        None => {
                            tracing::debug!(kind = %frame.kind, "dropping undecodable frame");
                        }
                    }
                }

                if finished {
                    return None;
                }

                match bytes_stream.next().await {
                    Some(Ok(chunk)) => {
                        pending.extend(assembler.push_bytes(&chunk));
                    }
                    Some(Err(e)) => {
                        finished = true;
                        return Some((
                            Err(ClientError::Http(e)),
                            (bytes_stream, assembler, pending, finished),
                        ));
                    }
                    None => {
                        finished = true;
                        pending.extend(assembler.finish());
                    }
                }
            }
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_new() {
        let client = ConsoleClient::new("http://localhost:8000");
        assert_eq!(client.base_url(), "http://localhost:8000");
        assert!(client.bearer_token.is_none());
    }

    #[test]
    fn test_client_with_bearer_token() {
        let client = ConsoleClient::new("http://localhost:8000").with_bearer_token("tok");
        assert_eq!(client.bearer_token.as_deref(), Some("tok"));
    }

    #[test]
    fn test_generic_status_messages() {
        assert_eq!(
            generic_status_message(StatusCode::UNAUTHORIZED),
            "authentication required"
        );
        assert_eq!(generic_status_message(StatusCode::NOT_FOUND), "not found");
        assert_eq!(
            generic_status_message(StatusCode::INTERNAL_SERVER_ERROR),
            "server error"
        );
        assert_eq!(generic_status_message(StatusCode::IM_A_TEAPOT), "request failed");
    }

    #[test]
    fn test_is_cancelled() {
        assert!(ClientError::Cancelled.is_cancelled());
        assert!(!ClientError::Server {
            status: 500,
            detail: "x".to_string()
        }
        .is_cancelled());
    }

    #[tokio::test]
    async fn test_chat_events_with_unreachable_server() {
        let client = ConsoleClient::new("http://127.0.0.1:1");
        let result = client.chat_events(&ChatRequest::new("hi")).await;
        assert!(matches!(result, Err(ClientError::Http(_))));
    }

    #[tokio::test]
    async fn test_health_check_with_unreachable_server() {
        let client = ConsoleClient::new("http://127.0.0.1:1");
        assert!(client.health_check().await.is_err());
    }
}
