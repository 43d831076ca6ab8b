use control_protocol::Response;

use crate::lines::{self, BLANK_LINE, TERMINATOR};
use crate::Framer;

/// Output of one extraction step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    /// A complete response frame
    Response(Response),
    /// A leading line with no known status; it has been removed from the buffer
    Unrecognized(String),
}

/// Classification of a status line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Status {
    Ack,
    MultiLine,
    TwoLine,
    Error,
    Unknown,
}

fn classify(status: &str) -> Status {
    match status {
        "200 OK" => Status::Ack,
        "201 OK" => Status::MultiLine,
        "202 OK" => Status::TwoLine,
        _ if is_error_status(status) => Status::Error,
        _ => Status::Unknown,
    }
}

/// `4xx` or `5xx`: a leading 4 or 5 followed by two more digits
fn is_error_status(status: &str) -> bool {
    match status.as_bytes() {
        [b'4' | b'5', tens, units, ..] => tens.is_ascii_digit() && units.is_ascii_digit(),
        _ => false,
    }
}

/// Buffers server output and emits one response frame at a time.
///
/// The buffer only ever shrinks by the exact span of an emitted frame or of a
/// discarded unrecognized line; a partial frame stays put until more bytes
/// arrive.
#[derive(Debug, Default)]
pub struct ResponseFramer {
    pub(crate) buffer: Vec<u8>,
}

impl ResponseFramer {
    pub fn new() -> Self {
        Self {
            buffer: Vec::with_capacity(1024),
        }
    }

    /// Bytes currently buffered, for diagnostics
    pub fn pending_bytes(&self) -> &[u8] {
        &self.buffer
    }

    fn consume(&mut self, len: usize) {
        let len = len.min(self.buffer.len());
        self.buffer.drain(..len);
    }

    fn slice(&self, start: usize, end: usize) -> &[u8] {
        self.buffer.get(start..end).unwrap_or_default()
    }
}

impl Framer for ResponseFramer {
    type Frame = Decoded;

    fn extend(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    fn next_frame(&mut self) -> Option<Decoded> {
        let status_end = lines::find_terminator(&self.buffer, 0)?;
        let status = lines::to_text(self.slice(0, status_end));
        let body_start = status_end + TERMINATOR.len();

        let decoded = match classify(&status) {
            Status::Ack => {
                self.consume(body_start);
                Decoded::Response(Response::ack(status))
            }
            Status::MultiLine => {
                // Searching from the status terminator lets "201 OK\r\n\r\n"
                // close an empty body.
                let blank = lines::find(&self.buffer, BLANK_LINE, status_end)?;
                let body = if blank > status_end {
                    lines::split_lines(self.slice(body_start, blank))
                } else {
                    Vec::new()
                };
                self.consume(blank + BLANK_LINE.len());
                Decoded::Response(Response::multi_line(status, body))
            }
            Status::TwoLine => {
                let line_end = lines::find_terminator(&self.buffer, body_start)?;
                let line = lines::to_text(self.slice(body_start, line_end));
                self.consume(line_end + TERMINATOR.len());
                Decoded::Response(Response::two_line(status, line))
            }
            Status::Error => {
                self.consume(body_start);
                Decoded::Response(Response::error(status))
            }
            Status::Unknown => {
                self.consume(body_start);
                Decoded::Unrecognized(status)
            }
        };
        Some(decoded)
    }

    fn buffered(&self) -> usize {
        self.buffer.len()
    }

    fn reset(&mut self) {
        self.buffer.clear();
    }

    fn name(&self) -> &'static str {
        "VtrResponse"
    }
}
