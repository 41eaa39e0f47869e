//! SSE (Server-Sent Events) frame assembly
//!
//! Parses the Crewdeck streaming wire format. Each event on the wire is:
//! - `event: <kind>` - event kind line
//! - `data: <json>` - single data payload line
//! - Empty line - separator
//!
//! Unlike generic SSE there is no multi-line data accumulation: one kind line
//! followed by one data line is exactly one frame, and the frame is emitted
//! as soon as the data line is seen.
//!
//! # Module structure
//! - `frame` - `Frame`, line classification, and the stateful `FrameAssembler`

mod frame;

pub use frame::{classify_line, Frame, FrameAssembler, SseLine};
