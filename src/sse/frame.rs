//! Frame assembly for the Crewdeck event stream.
//!
//! The assembler consumes raw byte chunks as they arrive off the transport.
//! Chunk boundaries carry no meaning: a chunk may end mid-line or even in the
//! middle of a multi-byte UTF-8 sequence, so the assembler keeps both an
//! undecoded byte carry and an unterminated-line carry between pushes.

/// One `(kind, payload)` unit decoded from the wire.
///
/// Frames are transient: they exist only between line assembly and event
/// decoding within a single parse pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// Event kind from the `event:` line (e.g. `content_delta`).
    pub kind: String,
    /// Raw payload from the `data:` line, not yet JSON-parsed.
    pub data: String,
}

/// Classification of a single line from the stream.
#[derive(Debug, Clone, PartialEq)]
pub enum SseLine {
    /// Event kind declaration (`event: content_delta`)
    Event(String),
    /// Data payload (`data: {"content":"hi"}`)
    Data(String),
    /// Blank separator line
    Empty,
    /// Anything else; ignored
    Other,
}

/// Classify a single trimmed line from the stream.
pub fn classify_line(line: &str) -> SseLine {
    if line.is_empty() {
        return SseLine::Empty;
    }
    if let Some(rest) = line.strip_prefix("event:") {
        return SseLine::Event(rest.trim().to_string());
    }
    if let Some(rest) = line.strip_prefix("data:") {
        return SseLine::Data(rest.trim().to_string());
    }
    SseLine::Other
}

/// Stateful assembler turning byte chunks into complete frames.
///
/// A frame is emitted the moment a `data:` line is seen, paired with the most
/// recent `event:` line. The kind register is cleared after each emit so a
/// stray `event:` line without a matching `data:` line cannot leak into a
/// later frame. Blank lines and unrecognized line shapes are ignored, as are
/// `data:` lines with no pending kind.
#[derive(Debug, Default)]
pub struct FrameAssembler {
    /// Incomplete UTF-8 sequence held over from the previous chunk.
    byte_carry: Vec<u8>,
    /// Incomplete trailing line held over from the previous chunk.
    line_carry: String,
    /// Kind from the most recent `event:` line, awaiting its `data:` line.
    current_kind: Option<String>,
}

impl FrameAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one raw chunk, returning every frame completed by it.
    pub fn push_bytes(&mut self, chunk: &[u8]) -> Vec<Frame> {
        let mut bytes = std::mem::take(&mut self.byte_carry);
        bytes.extend_from_slice(chunk);

        let keep = bytes.len() - trailing_incomplete_utf8(&bytes);
        self.byte_carry = bytes[keep..].to_vec();

        // The kept prefix ends on a sequence boundary; any invalid bytes
        // inside it are genuinely invalid and get replaced, not mis-split.
        let text = String::from_utf8_lossy(&bytes[..keep]).into_owned();
        self.push_text(&text)
    }

    /// Feed already-decoded text, returning every frame completed by it.
    pub fn push_text(&mut self, text: &str) -> Vec<Frame> {
        self.line_carry.push_str(text);

        let working = std::mem::take(&mut self.line_carry);
        let mut pieces: Vec<&str> = working.split('\n').collect();
        // The last piece is unterminated; it seeds the carry for the next push.
        let tail = pieces.pop().unwrap_or("");
        self.line_carry = tail.to_string();

        let mut frames = Vec::new();
        for line in pieces {
            if let Some(frame) = self.feed_line(line.trim()) {
                frames.push(frame);
            }
        }
        frames
    }

    /// Flush the assembler at end of stream.
    ///
    /// Processes a final unterminated line, if the server closed without a
    /// trailing newline.
    pub fn finish(&mut self) -> Option<Frame> {
        if self.line_carry.is_empty() {
            return None;
        }
        let line = std::mem::take(&mut self.line_carry);
        self.feed_line(line.trim())
    }

    fn feed_line(&mut self, line: &str) -> Option<Frame> {
        match classify_line(line) {
            SseLine::Event(kind) => {
                self.current_kind = Some(kind);
                None
            }
            SseLine::Data(data) => {
                // A data line without a pending kind has nothing to dispatch
                // against; drop it rather than guess.
                let kind = self.current_kind.take()?;
                Some(Frame { kind, data })
            }
            SseLine::Empty | SseLine::Other => None,
        }
    }
}

/// Length of an incomplete multi-byte UTF-8 sequence at the end of `bytes`.
///
/// A sequence is at most four bytes, so only the last three bytes can be a
/// cut-off prefix. Returns 0 when the buffer ends on a sequence boundary.
fn trailing_incomplete_utf8(bytes: &[u8]) -> usize {
    let len = bytes.len();
    for back in 1..=len.min(3) {
        let b = bytes[len - back];
        if b & 0b1100_0000 == 0b1000_0000 {
            // Continuation byte; keep looking for the lead.
            continue;
        }
        let need = if b >= 0xF0 {
            4
        } else if b >= 0xE0 {
            3
        } else if b >= 0xC0 {
            2
        } else {
            1
        };
        return if need > back { back } else { 0 };
    }
    0
}
