//! Typed events for the two streaming protocols.
//!
//! Each protocol is a closed vocabulary of event kinds modeled as an enum, so
//! dispatch over a decoded event is a total match. Forward compatibility
//! lives one layer down: a frame whose kind no enum variant models decodes to
//! `None` and is skipped by the stream, never surfaced as an error.
//!
//! # Module structure
//! - `chat` - conversational protocol (`ChatEvent`)
//! - `workflow` - linear and DAG workflow protocol (`WorkflowEvent`)
//! - `payloads` - internal payload deserialization structs

mod chat;
mod payloads;
mod workflow;

pub use chat::ChatEvent;
pub use workflow::{NodeType, WorkflowEvent};

use crate::sse::Frame;

/// A typed event decodable from a wire frame.
///
/// Implemented by both protocol vocabularies so the transport layer can be
/// generic over which protocol a stream speaks.
pub trait WireEvent: Sized {
    /// Decode a frame into a typed event.
    ///
    /// Returns `None` for unknown kinds (forward compatibility) and for
    /// payloads that fail to parse (malformed-frame tolerance); either way
    /// the frame is dropped and the stream continues.
    fn decode(frame: &Frame) -> Option<Self>;

    /// Whether this event terminates the read loop.
    fn is_terminal(&self) -> bool;

    /// The wire kind string, for debug logging.
    fn event_kind(&self) -> &'static str;
}
