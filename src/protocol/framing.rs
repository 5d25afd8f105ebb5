//! Inbound message reassembly.
//!
//! GATT writes are limited by the negotiated MTU, so a single JSON command
//! usually arrives split over several writes.  [`FrameAssembler`]
//! accumulates the fragments and yields complete messages.
//!
//! Two delimiting modes are supported:
//!
//! ```text
//! Braces (default)          LengthPrefixed
//! ┌───────────────────┐     ┌────────────┬────────────────────┐
//! │ {"command":...}   │     │ Length (4B)│ JSON object (N B)  │
//! │ balanced object   │     │ LE u32     │                    │
//! └───────────────────┘     └────────────┴────────────────────┘
//! ```
//!
//! In brace mode a message ends when the outermost object closes.  The
//! scanner tracks nesting depth, string state and escape state, so braces
//! inside string values never end a message early.  Scan progress is kept
//! between writes; each byte is inspected once.
//!
//! Bytes after a complete message stay buffered and are returned by the
//! next [`FrameAssembler::next_message`] call.  Any decode failure clears
//! the whole buffer.

use log::debug;

use crate::app::commands::CommandRequest;
use crate::config::FramingMode;
use crate::error::DecodeError;

/// Frame header size in length-prefixed mode (4-byte little-endian length).
const HEADER_SIZE: usize = 4;

/// Incremental brace-scanner state.
#[derive(Debug, Clone, Copy, Default)]
struct ScanState {
    /// Bytes of the buffer already inspected.
    pos: usize,
    depth: usize,
    in_string: bool,
    escaped: bool,
}

/// Streaming message assembler.
pub struct FrameAssembler {
    mode: FramingMode,
    max_len: usize,
    buf: Vec<u8>,
    scan: ScanState,
}

impl FrameAssembler {
    pub fn new(mode: FramingMode, max_len: usize) -> Self {
        Self {
            mode,
            max_len,
            buf: Vec::new(),
            scan: ScanState::default(),
        }
    }

    pub fn mode(&self) -> FramingMode {
        self.mode
    }

    /// Bytes currently held in the partial buffer.
    pub fn pending_len(&self) -> usize {
        self.buf.len()
    }

    /// Append one inbound fragment.
    pub fn push(&mut self, chunk: &[u8]) {
        debug!("frame: +{} bytes ({} buffered)", chunk.len(), self.buf.len());
        self.buf.extend_from_slice(chunk);
    }

    /// Append `chunk` and try to complete a message.
    pub fn feed(&mut self, chunk: &[u8]) -> Result<Option<CommandRequest>, DecodeError> {
        self.push(chunk);
        self.next_message()
    }

    /// Pop the next complete message from the buffer, if any.
    ///
    /// `Ok(None)` means more bytes are needed.  On `Err` the buffer has
    /// been cleared.
    pub fn next_message(&mut self) -> Result<Option<CommandRequest>, DecodeError> {
        let end = match self.mode {
            FramingMode::Braces => self.scan_braces(),
            FramingMode::LengthPrefixed => self.scan_length(),
        };

        let (start, end) = match end {
            Ok(Some(range)) => range,
            Ok(None) => {
                if self.buf.len() > self.buffer_limit() {
                    self.clear();
                    return Err(DecodeError::Oversize);
                }
                return Ok(None);
            }
            Err(e) => {
                self.clear();
                return Err(e);
            }
        };

        let parsed = decode_message(&self.buf[start..end]);
        self.buf.drain(..end);
        self.scan = ScanState::default();

        match parsed {
            Ok(msg) => Ok(Some(msg)),
            Err(e) => {
                self.clear();
                Err(e)
            }
        }
    }

    /// Largest partial buffer kept while waiting for more bytes.
    fn buffer_limit(&self) -> usize {
        match self.mode {
            FramingMode::Braces => self.max_len,
            FramingMode::LengthPrefixed => self.max_len + HEADER_SIZE,
        }
    }

    /// Discard any partial message.
    pub fn clear(&mut self) {
        self.buf.clear();
        self.scan = ScanState::default();
    }

    /// Returns the `(start, end)` byte range of the first complete object.
    fn scan_braces(&mut self) -> Result<Option<(usize, usize)>, DecodeError> {
        let s = &mut self.scan;
        while s.pos < self.buf.len() {
            let b = self.buf[s.pos];
            s.pos += 1;

            if s.depth == 0 {
                match b {
                    b'{' => s.depth = 1,
                    b if b.is_ascii_whitespace() || b == 0 => {}
                    _ => return Err(DecodeError::InvalidJson),
                }
                continue;
            }

            if s.in_string {
                if s.escaped {
                    s.escaped = false;
                } else if b == b'\\' {
                    s.escaped = true;
                } else if b == b'"' {
                    s.in_string = false;
                }
                continue;
            }

            match b {
                b'"' => s.in_string = true,
                b'{' => s.depth += 1,
                b'}' => {
                    s.depth -= 1;
                    if s.depth == 0 {
                        return Ok(Some((0, s.pos)));
                    }
                }
                _ => {}
            }
        }
        Ok(None)
    }

    fn scan_length(&self) -> Result<Option<(usize, usize)>, DecodeError> {
        if self.buf.len() < HEADER_SIZE {
            return Ok(None);
        }
        let mut header = [0u8; HEADER_SIZE];
        header.copy_from_slice(&self.buf[..HEADER_SIZE]);
        let expected = u32::from_le_bytes(header) as usize;

        if expected == 0 || expected > self.max_len {
            return Err(DecodeError::BadLength);
        }
        let end = HEADER_SIZE + expected;
        if self.buf.len() < end {
            return Ok(None);
        }
        Ok(Some((HEADER_SIZE, end)))
    }
}

/// Parse one complete message body.
pub fn decode_message(bytes: &[u8]) -> Result<CommandRequest, DecodeError> {
    serde_json::from_slice(bytes).map_err(|_| DecodeError::InvalidJson)
}

/// Wrap `payload` in a length-prefixed frame.
pub fn encode_length_prefixed(payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(HEADER_SIZE + payload.len());
    out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    out.extend_from_slice(payload);
    out
}
