use serde::{Deserialize, Serialize};

/// Line terminator used on the wire in both directions
pub const LINE_TERMINATOR: &str = "\r\n";

/// Shape of a complete server response, keyed by its status line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResponseKind {
    /// `200 OK`, no body
    Ack,
    /// `201 OK`, body lines up to a blank line
    MultiLine,
    /// `202 OK`, exactly one body line
    TwoLine,
    /// `4xx`/`5xx`, the status line is the whole message
    Error,
}

/// One complete, delimited server response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    /// The leading status line without its terminator, e.g. `201 OK`
    pub status: String,
    pub kind: ResponseKind,
    /// Body lines without terminators. Error frames carry their status line here.
    pub body: Vec<String>,
}

impl Response {
    pub fn ack(status: impl Into<String>) -> Self {
        Self {
            status: status.into(),
            kind: ResponseKind::Ack,
            body: Vec::new(),
        }
    }

    pub fn multi_line(status: impl Into<String>, body: Vec<String>) -> Self {
        Self {
            status: status.into(),
            kind: ResponseKind::MultiLine,
            body,
        }
    }

    pub fn two_line(status: impl Into<String>, line: impl Into<String>) -> Self {
        Self {
            status: status.into(),
            kind: ResponseKind::TwoLine,
            body: vec![line.into()],
        }
    }

    pub fn error(status: impl Into<String>) -> Self {
        let status = status.into();
        Self {
            body: vec![status.clone()],
            status,
            kind: ResponseKind::Error,
        }
    }

    /// Numeric status code, if the status line starts with three digits
    pub fn code(&self) -> Option<u16> {
        self.status.get(..3).and_then(|code| code.parse().ok())
    }

    pub fn is_error(&self) -> bool {
        self.kind == ResponseKind::Error
    }

    /// Body lines joined with the wire terminator
    pub fn body_text(&self) -> String {
        self.body.join(LINE_TERMINATOR)
    }
}

/// Renders the status line followed by each body line, joined with `\r\n`.
///
/// `200 OK`, `202 OK\r\nfoo`, `201 OK\r\nfile1\r\nfile2`, `400 Unknown command`.
impl std::fmt::Display for Response {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.status)?;
        if self.kind != ResponseKind::Error {
            for line in &self.body {
                f.write_str(LINE_TERMINATOR)?;
                f.write_str(line)?;
            }
        }
        Ok(())
    }
}
