//! End-to-end workflow stream tests against a mock console server.

mod common;

use futures_util::StreamExt;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crewdeck_client::events::NodeType;
use crewdeck_client::models::WorkflowRunInput;
use crewdeck_client::{
    run_workflow, ClientError, DeclaredNode, DeclaredStep, RunStatus, StepStatus,
    WorkflowEvent, WorkflowObserver, WorkflowRunTracker,
};

use common::{mount_workflow_stream, sse_body};

fn declared_steps() -> Vec<DeclaredStep> {
    vec![
        DeclaredStep {
            order: 1,
            name: "draft".to_string(),
            task: None,
        },
        DeclaredStep {
            order: 2,
            name: "review".to_string(),
            task: None,
        },
        DeclaredStep {
            order: 3,
            name: "publish".to_string(),
            task: None,
        },
    ]
}

#[derive(Default)]
struct Recording {
    started: Vec<u32>,
    failed: Vec<u32>,
    run_output: Option<String>,
}

impl WorkflowObserver for Recording {
    fn on_step_start(&mut self, step: &crewdeck_client::StepState) {
        self.started.push(step.order);
    }
    fn on_step_error(&mut self, step: &crewdeck_client::StepState) {
        self.failed.push(step.order);
    }
    fn on_workflow_complete(&mut self, output: &str) {
        self.run_output = Some(output.to_string());
    }
}

#[tokio::test]
async fn test_out_of_order_steps_land_in_declared_order() {
    let server = MockServer::start().await;
    mount_workflow_stream(
        &server,
        "wf-1",
        &[
            ("workflow_start", r#"{"run_id":"run-1","total_steps":3}"#),
            ("step_start", r#"{"order":2,"name":"review"}"#),
            ("step_content_delta", r#"{"order":2,"delta":"B"}"#),
            ("step_complete", r#"{"order":2,"output":"B"}"#),
            ("step_start", r#"{"order":1,"name":"draft"}"#),
            ("step_complete", r#"{"order":1,"output":"A"}"#),
            ("step_start", r#"{"order":3,"name":"publish"}"#),
            ("step_complete", r#"{"order":3,"output":"C"}"#),
            ("workflow_complete", r#"{"output":"ABC"}"#),
            ("done", "{}"),
        ],
    )
    .await;

    let client = crewdeck_client::ConsoleClient::new(server.uri());
    let mut tracker = WorkflowRunTracker::new(declared_steps());
    let mut observer = Recording::default();
    let cancel = CancellationToken::new();
    let status = run_workflow(
        &client,
        "wf-1",
        &WorkflowRunInput::text("go"),
        &mut tracker,
        &mut observer,
        &cancel,
    )
    .await
    .unwrap();

    assert_eq!(status, RunStatus::Completed);
    assert_eq!(tracker.run_id.as_deref(), Some("run-1"));
    let outputs: Vec<&str> = tracker.steps().iter().map(|s| s.output.as_str()).collect();
    assert_eq!(outputs, vec!["A", "B", "C"]);
    assert_eq!(observer.started, vec![2, 1, 3]);
    assert_eq!(observer.run_output.as_deref(), Some("ABC"));
}

#[tokio::test]
async fn test_step_error_does_not_end_the_run() {
    let server = MockServer::start().await;
    mount_workflow_stream(
        &server,
        "wf-1",
        &[
            ("step_start", r#"{"order":2,"name":"review"}"#),
            ("step_error", r#"{"order":2,"error":"reviewer crashed"}"#),
            ("step_start", r#"{"order":3,"name":"publish"}"#),
            ("step_complete", r#"{"order":3,"output":"C"}"#),
            ("done", "{}"),
        ],
    )
    .await;

    let client = crewdeck_client::ConsoleClient::new(server.uri());
    let mut tracker = WorkflowRunTracker::new(declared_steps());
    let mut observer = Recording::default();
    let cancel = CancellationToken::new();
    let status = run_workflow(
        &client,
        "wf-1",
        &WorkflowRunInput::text("go"),
        &mut tracker,
        &mut observer,
        &cancel,
    )
    .await
    .unwrap();

    assert_eq!(status, RunStatus::Failed);
    assert_eq!(tracker.step(2).unwrap().status, StepStatus::Failed);
    assert_eq!(
        tracker.step(2).unwrap().error.as_deref(),
        Some("reviewer crashed")
    );
    assert_eq!(tracker.step(3).unwrap().status, StepStatus::Completed);
    assert_eq!(observer.failed, vec![2]);
    assert_eq!(observer.started, vec![2, 3]);
}

#[tokio::test]
async fn test_dag_run_with_condition_branch_and_skip() {
    let server = MockServer::start().await;
    mount_workflow_stream(
        &server,
        "wf-dag",
        &[
            (
                "node_start",
                r#"{"node_id":"route","node_type":"condition","label":"quality gate"}"#,
            ),
            ("node_complete", r#"{"node_id":"route","output":"approve"}"#),
            (
                "node_start",
                r#"{"node_id":"writer","node_type":"agent"}"#,
            ),
            ("node_content_delta", r#"{"node_id":"writer","delta":"dra"}"#),
            ("node_content_delta", r#"{"node_id":"writer","delta":"ft"}"#),
            ("node_complete", r#"{"node_id":"writer","output":"draft"}"#),
            ("node_complete", r#"{"node_id":"rework","output":"skipped"}"#),
            ("workflow_complete", r#"{"output":"draft"}"#),
            ("done", "{}"),
        ],
    )
    .await;

    let client = crewdeck_client::ConsoleClient::new(server.uri());
    let mut tracker = WorkflowRunTracker::new(Vec::new()).with_nodes(vec![
        DeclaredNode {
            id: "route".to_string(),
            node_type: NodeType::Condition,
            label: Some("quality gate".to_string()),
        },
        DeclaredNode {
            id: "writer".to_string(),
            node_type: NodeType::Agent,
            label: None,
        },
        DeclaredNode {
            id: "rework".to_string(),
            node_type: NodeType::Agent,
            label: None,
        },
    ]);
    let cancel = CancellationToken::new();
    let status = run_workflow(
        &client,
        "wf-dag",
        &WorkflowRunInput::text("go"),
        &mut tracker,
        &mut (),
        &cancel,
    )
    .await
    .unwrap();

    assert_eq!(status, RunStatus::Completed);
    let route = tracker.node("route").unwrap();
    assert_eq!(route.branch.as_deref(), Some("approve"));
    assert!(route.output.is_empty());
    assert_eq!(tracker.node("writer").unwrap().output, "draft");
    assert_eq!(tracker.node("rework").unwrap().status, StepStatus::Skipped);
    assert_eq!(tracker.final_output.as_deref(), Some("draft"));
}

#[tokio::test]
async fn test_workflow_error_is_terminal_and_failed() {
    let server = MockServer::start().await;
    mount_workflow_stream(
        &server,
        "wf-1",
        &[
            ("workflow_start", r#"{"run_id":"run-1","total_steps":3}"#),
            ("workflow_error", r#"{"error":"runner died"}"#),
            ("step_complete", r#"{"order":1,"output":"late"}"#),
        ],
    )
    .await;

    let client = crewdeck_client::ConsoleClient::new(server.uri());
    let mut tracker = WorkflowRunTracker::new(declared_steps());
    let cancel = CancellationToken::new();
    let status = run_workflow(
        &client,
        "wf-1",
        &WorkflowRunInput::text("go"),
        &mut tracker,
        &mut (),
        &cancel,
    )
    .await
    .unwrap();

    assert_eq!(status, RunStatus::Failed);
    assert_eq!(tracker.error.as_deref(), Some("runner died"));
    assert_eq!(tracker.step(1).unwrap().status, StepStatus::Pending);
}

#[tokio::test]
async fn test_raw_stream_ends_after_workflow_error() {
    let server = MockServer::start().await;
    mount_workflow_stream(
        &server,
        "wf-1",
        &[
            ("workflow_error", r#"{"error":"runner died"}"#),
            ("step_complete", r#"{"order":1,"output":"late"}"#),
        ],
    )
    .await;

    let client = crewdeck_client::ConsoleClient::new(server.uri());
    let mut events = client
        .workflow_events("wf-1", &WorkflowRunInput::text("go"))
        .await
        .unwrap();
    let first = events.next().await.unwrap().unwrap();
    assert!(matches!(first, WorkflowEvent::WorkflowError { .. }));
    assert!(events.next().await.is_none());
}

#[tokio::test]
async fn test_run_input_is_posted_to_run_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/workflows/wf-7/run"))
        .and(body_partial_json(serde_json::json!({"input": "launch"})))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(sse_body(&[("done", "{}")]), "text/event-stream"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = crewdeck_client::ConsoleClient::new(server.uri());
    let mut tracker = WorkflowRunTracker::new(Vec::new());
    let cancel = CancellationToken::new();
    run_workflow(
        &client,
        "wf-7",
        &WorkflowRunInput::text("launch"),
        &mut tracker,
        &mut (),
        &cancel,
    )
    .await
    .unwrap();
}

#[tokio::test]
async fn test_workflow_not_found_surfaces_server_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/workflows/missing/run"))
        .respond_with(
            ResponseTemplate::new(404)
                .set_body_json(serde_json::json!({"detail": "workflow not found"})),
        )
        .mount(&server)
        .await;

    let client = crewdeck_client::ConsoleClient::new(server.uri());
    let mut tracker = WorkflowRunTracker::new(Vec::new());
    let cancel = CancellationToken::new();
    let err = run_workflow(
        &client,
        "missing",
        &WorkflowRunInput::text("go"),
        &mut tracker,
        &mut (),
        &cancel,
    )
    .await
    .unwrap_err();

    match err {
        ClientError::Server { status, detail } => {
            assert_eq!(status, 404);
            assert_eq!(detail, "workflow not found");
        }
        other => panic!("expected Server error, got {:?}", other),
    }
}
