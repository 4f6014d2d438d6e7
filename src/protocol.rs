//! Control bytes and line framing shared by every layer of the driver.
//!
//! The IM540 speaks a line-oriented ASCII protocol: every request and every
//! reply line ends with CR LF. The remaining control bytes travel in-band on
//! the same line channel.

pub const CR: u8 = 0x0D;
pub const LF: u8 = 0x0A;
/// Line terminator for requests and replies.
pub const CRLF: &[u8] = b"\r\n";
pub const ETX: u8 = 0x03;
pub const ACK: u8 = 0x06;
/// Negative acknowledgment, sent by the device in place of the ACK line.
pub const NAK: u8 = 0x15;
/// Enquiry; polls the device for the data line of the pending command.
pub const ENQ: u8 = 0x05;

/// Upper bound for a single reply line. Longer input means the framing was lost.
pub const MAX_LINE_LEN: usize = 1024;

/// Append the line terminator unless the command already ends with it.
pub fn frame_command(command: &str) -> Vec<u8> {
    let mut framed = Vec::with_capacity(command.len() + CRLF.len());
    framed.extend_from_slice(command.as_bytes());
    if !framed.ends_with(CRLF) {
        framed.extend_from_slice(CRLF);
    }
    framed
}

/// Drop one trailing CR LF, if present.
pub fn strip_terminator(line: &[u8]) -> &[u8] {
    line.strip_suffix(CRLF).unwrap_or(line)
}

/// True if the acknowledgment line carries a NAK anywhere in it.
pub fn is_rejection(ack_line: &[u8]) -> bool {
    ack_line.contains(&NAK)
}

/// Talk-only lines signal an error with NAK directly followed by LF.
pub fn is_stream_error(line: &[u8]) -> bool {
    line.windows(2).any(|w| w == [NAK, LF])
}

/// Remove every CR LF pair from a line and decode it as text.
pub fn without_terminators(line: &[u8]) -> String {
    let mut out = Vec::with_capacity(line.len());
    let mut i = 0;
    while i < line.len() {
        if line[i..].starts_with(CRLF) {
            i += CRLF.len();
        } else {
            out.push(line[i]);
            i += 1;
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// Render raw bytes with control characters escaped, for log lines.
pub fn printable(bytes: &[u8]) -> String {
    bytes.escape_ascii().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_appends_terminator_once() {
        assert_eq!(frame_command("PRS,1"), b"PRS,1\r\n");
        assert_eq!(frame_command("PRS,1\r\n"), b"PRS,1\r\n");
    }

    #[test]
    fn frame_keeps_bare_cr() {
        // A lone CR is not a terminator; the full CR LF still has to be added.
        assert_eq!(frame_command("GDS\r"), b"GDS\r\r\n");
    }

    #[test]
    fn strip_only_removes_trailing_pair() {
        assert_eq!(strip_terminator(b"80,1.0E-05\r\n"), b"80,1.0E-05");
        assert_eq!(strip_terminator(b"0.0"), b"0.0");
        assert_eq!(strip_terminator(b"\r\n"), b"");
    }

    #[test]
    fn rejection_detection() {
        assert!(is_rejection(&[NAK, CR, LF]));
        assert!(!is_rejection(&[ACK, CR, LF]));
    }

    #[test]
    fn stream_error_needs_nak_then_lf() {
        assert!(is_stream_error(&[NAK, LF]));
        assert!(is_stream_error(b"80,1\x15\n"));
        assert!(!is_stream_error(&[NAK, CR, LF]));
        assert!(!is_stream_error(b"80,1.0E-05\r\n"));
    }

    #[test]
    fn terminators_removed_everywhere() {
        assert_eq!(without_terminators(b"80,1\r\n"), "80,1");
        assert_eq!(without_terminators(b"\r\n80,1\r\n"), "80,1");
    }

    #[test]
    fn printable_escapes_control_bytes() {
        assert_eq!(printable(&[NAK, b'A', CR, LF]), "\\x15A\\r\\n");
    }
}
