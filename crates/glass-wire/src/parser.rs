//! Minimal HTTP/1.x request splitting.
//!
//! Only the header/body boundary matters here. The request line is never
//! validated: it contains no `": "` separator, so it falls out of the
//! header map like any other malformed line.

use std::collections::HashMap;

/// Sequence separating the header block from the body.
pub const HEADER_TERMINATOR: &[u8] = b"\r\n\r\n";

const LINE_SEPARATOR: &str = "\r\n";
const HEADER_SEPARATOR: &str = ": ";

/// A request split into headers and body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedRequest {
    /// Header values keyed by lower-cased name. Later duplicates win.
    pub headers: HashMap<String, String>,
    /// Every byte after the header terminator.
    pub body: Vec<u8>,
}

impl ParsedRequest {
    /// Looks up a header by name, case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// The `content-length` header, if present and numeric.
    pub fn content_length(&self) -> Option<usize> {
        self.header("content-length")
            .and_then(|value| value.trim().parse().ok())
    }
}

/// Splits `buf` at the first header terminator.
///
/// Returns `None` while the terminator has not been seen.
pub fn parse_request(buf: &[u8]) -> Option<ParsedRequest> {
    let split = find_terminator(buf, 0)?;
    let head = String::from_utf8_lossy(&buf[..split]);
    let body = buf[split + HEADER_TERMINATOR.len()..].to_vec();

    Some(ParsedRequest {
        headers: parse_headers(&head),
        body,
    })
}

/// Index of the first terminator starting at or after `from`.
pub(crate) fn find_terminator(buf: &[u8], from: usize) -> Option<usize> {
    buf.get(from..)?
        .windows(HEADER_TERMINATOR.len())
        .position(|window| window == HEADER_TERMINATOR)
        .map(|offset| offset + from)
}

pub(crate) fn parse_headers(head: &str) -> HashMap<String, String> {
    head.split(LINE_SEPARATOR)
        .filter_map(|line| line.split_once(HEADER_SEPARATOR))
        .map(|(key, value)| (key.to_lowercase(), value.to_string()))
        .collect()
}
