//! Shared helpers for the integration suites.

#![allow(dead_code)]

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Build a raw SSE body from (kind, data) pairs.
pub fn sse_body(frames: &[(&str, &str)]) -> String {
    let mut body = String::new();
    for (kind, data) in frames {
        body.push_str(&format!("event: {}\ndata: {}\n\n", kind, data));
    }
    body
}

/// Mount a chat endpoint that streams the given frames.
pub async fn mount_chat_stream(server: &MockServer, frames: &[(&str, &str)]) {
    Mock::given(method("POST"))
        .and(path("/chat"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(sse_body(frames), "text/event-stream"),
        )
        .mount(server)
        .await;
}

/// Mount a workflow run endpoint that streams the given frames.
pub async fn mount_workflow_stream(server: &MockServer, workflow_id: &str, frames: &[(&str, &str)]) {
    Mock::given(method("POST"))
        .and(path(format!("/workflows/{}/run", workflow_id)))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(sse_body(frames), "text/event-stream"),
        )
        .mount(server)
        .await;
}
