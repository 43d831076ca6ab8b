//! CRLF line scanning over a byte buffer.
//!
//! The control protocol terminates every line with `\r\n`. A bare `\n` is
//! not a terminator, and a `\r` at the very end of the buffer may still be
//! completed by the next chunk, so nothing here ever guesses.

/// Wire line terminator
pub const TERMINATOR: &[u8] = b"\r\n";

/// Two consecutive terminators: the end of a multi-line body
pub const BLANK_LINE: &[u8] = b"\r\n\r\n";

/// Position of the first occurrence of `needle` at or after `from`
pub fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if needle.is_empty() {
        return None;
    }
    haystack
        .get(from..)?
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|offset| offset + from)
}

/// Start of the first terminator at or after `from`
pub fn find_terminator(buffer: &[u8], from: usize) -> Option<usize> {
    find(buffer, TERMINATOR, from)
}

/// Decode a line as text. The protocol is ASCII; anything else is replaced
/// rather than rejected so a stray byte cannot wedge the stream.
pub fn to_text(line: &[u8]) -> String {
    String::from_utf8_lossy(line).into_owned()
}

/// Split a region of buffer into lines on `\r\n`
pub fn split_lines(region: &[u8]) -> Vec<String> {
    let mut lines = Vec::new();
    let mut start = 0;
    while let Some(end) = find_terminator(region, start) {
        lines.push(to_text(region.get(start..end).unwrap_or_default()));
        start = end + TERMINATOR.len();
    }
    lines.push(to_text(region.get(start..).unwrap_or_default()));
    lines
}

#[cfg(test)]
#[allow(clippy::panic, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn test_find_terminator() {
        assert_eq!(find_terminator(b"200 OK\r\n", 0), Some(6));
        assert_eq!(find_terminator(b"200 OK\r", 0), None);
        assert_eq!(find_terminator(b"a\r\nb\r\n", 3), Some(4));
    }

    #[test]
    fn test_bare_newline_is_not_a_terminator() {
        assert_eq!(find_terminator(b"200 OK\n", 0), None);
    }

    #[test]
    fn test_find_past_end_is_none() {
        assert_eq!(find(b"abc", b"c", 10), None);
        assert_eq!(find(b"abc", b"", 0), None);
    }

    #[test]
    fn test_find_blank_line_from_status_terminator() {
        let buffer = b"201 OK\r\n\r\n";
        assert_eq!(find(buffer, BLANK_LINE, 6), Some(6));
    }

    #[test]
    fn test_split_lines() {
        assert_eq!(split_lines(b"file1\r\nfile2"), vec!["file1", "file2"]);
        assert_eq!(split_lines(b"only"), vec!["only"]);
    }
}
