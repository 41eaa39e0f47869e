//! Crewdeck streaming client
//!
//! Client library for the Crewdeck console's real-time execution streams.
//! The backend answers `POST /chat` and `POST /workflows/{id}/run` with a
//! long-lived chunked response carrying `event:`/`data:` framed JSON events;
//! this crate reassembles those frames, decodes them into typed events, and
//! drives caller-supplied observers plus per-stream accumulators.
//!
//! Layering, bottom up:
//! - [`sse`] - byte chunks to `(kind, payload)` frames
//! - [`events`] - frames to typed [`events::ChatEvent`] / [`events::WorkflowEvent`]
//! - [`client`] - HTTP transport and the raw typed event stream
//! - [`chat`] / [`workflow`] - read loops, accumulators, observer dispatch

pub mod chat;
pub mod client;
pub mod events;
pub mod models;
pub mod sse;
pub mod workflow;

pub use chat::{run_chat, ChatAccumulator, ChatObserver};
pub use client::{ClientError, ConsoleClient, EventStream};
pub use events::{ChatEvent, WireEvent, WorkflowEvent};
pub use workflow::{
    run_workflow, DeclaredNode, DeclaredStep, NodeState, RunStatus, StepState, StepStatus,
    WorkflowObserver, WorkflowRunTracker,
};
