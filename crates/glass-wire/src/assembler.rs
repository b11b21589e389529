//! Per-connection request buffering.

use crate::parser::{find_terminator, parse_headers, ParsedRequest, HEADER_TERMINATOR};
use crate::FramingError;

/// Largest request a single connection may buffer.
pub const MAX_REQUEST_BYTES: usize = 1024 * 1024;

/// Outcome of feeding bytes to a [`StreamAssembler`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssemblyState {
    /// No complete request yet; keep reading.
    AwaitingMoreData,
    /// A full request is buffered.
    Complete(ParsedRequest),
}

/// Accumulates the bytes of one connection until a request is framed.
///
/// A request is complete once the header terminator has been seen and,
/// when the headers declare a `content-length`, that many body bytes have
/// arrived. Without the header the body is whatever followed the
/// terminator in the buffer at that point.
///
/// The header block is parsed once, when the terminator first shows up;
/// later reads only extend the body, so trickled input costs linear time.
#[derive(Debug)]
pub struct StreamAssembler {
    buffer: Vec<u8>,
    limit: usize,
    head: Option<Head>,
}

/// Headers of the request being assembled, parsed once.
#[derive(Debug)]
struct Head {
    body_start: usize,
    request: ParsedRequest,
}

impl StreamAssembler {
    /// Creates an assembler capped at [`MAX_REQUEST_BYTES`].
    pub fn new() -> Self {
        Self::with_limit(MAX_REQUEST_BYTES)
    }

    /// Creates an assembler with a custom size cap.
    pub fn with_limit(limit: usize) -> Self {
        Self {
            buffer: Vec::new(),
            limit,
            head: None,
        }
    }

    /// Number of bytes buffered so far.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Appends `chunk` and checks whether a complete request is now buffered.
    ///
    /// On [`AssemblyState::Complete`] the internal buffer is released.
    ///
    /// # Errors
    ///
    /// Returns [`FramingError::TooLarge`] once the buffer exceeds the cap.
    pub fn feed(&mut self, chunk: &[u8]) -> Result<AssemblyState, FramingError> {
        // A terminator may straddle the previous chunk boundary.
        let search_from = self
            .buffer
            .len()
            .saturating_sub(HEADER_TERMINATOR.len() - 1);

        self.buffer.extend_from_slice(chunk);
        if self.buffer.len() > self.limit {
            return Err(FramingError::TooLarge { limit: self.limit });
        }

        let head = match self.head.take() {
            Some(head) => head,
            None => {
                let Some(split) = find_terminator(&self.buffer, search_from) else {
                    return Ok(AssemblyState::AwaitingMoreData);
                };
                let headers = parse_headers(&String::from_utf8_lossy(&self.buffer[..split]));
                Head {
                    body_start: split + HEADER_TERMINATOR.len(),
                    request: ParsedRequest {
                        headers,
                        body: Vec::new(),
                    },
                }
            }
        };

        let body_end = match head.request.content_length() {
            Some(declared) if self.buffer.len() - head.body_start < declared => {
                self.head = Some(head);
                return Ok(AssemblyState::AwaitingMoreData);
            }
            Some(declared) => head.body_start + declared,
            None => self.buffer.len(),
        };

        let Head {
            body_start,
            mut request,
        } = head;
        request.body = self.buffer[body_start..body_end].to_vec();
        self.buffer = Vec::new();
        Ok(AssemblyState::Complete(request))
    }

    /// Reports the error for a connection that closed before completion.
    pub fn closed(&self) -> FramingError {
        FramingError::ConnectionClosed {
            buffered: self.buffer.len(),
        }
    }
}

impl Default for StreamAssembler {
    fn default() -> Self {
        Self::new()
    }
}
