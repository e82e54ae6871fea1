//! Memory display response parsing
//!
//! OpenOCD answers `mdw 0x20000000` with the echoed command followed by a
//! value line and the prompt:
//!
//! ```text
//! mdw 0x20000000\r\n0x20000000: 40490fdb \r\n\r>
//! ```
//!
//! The value is the text between the first `": "` and the `" \r\n\r> "` that
//! closes its line. Anything else (empty output, `Error: ...` text, a
//! truncated read) yields [`FALLBACK_VALUE`] so that one glitched sample does
//! not end the session.

/// Value returned when a response does not match the grammar
pub const FALLBACK_VALUE: &[u8] = b"0";

const VALUE_START: &[u8] = b": ";
const VALUE_END: &[u8] = b" \r\n\r> ";

/// Extract the hex value from a raw response, falling back to `"0"`
pub fn parse_response(raw: &[u8]) -> &[u8] {
    try_parse_response(raw).unwrap_or(FALLBACK_VALUE)
}

/// Extract the hex value from a raw response
///
/// Returns `None` when the response does not contain a value line.
pub fn try_parse_response(raw: &[u8]) -> Option<&[u8]> {
    let mut search_from = 0;

    while let Some(offset) = find(&raw[search_from..], VALUE_START) {
        let start = search_from + offset + VALUE_START.len();

        // The value may not span lines, so the only candidate terminator is
        // the one whose '\n' is the first newline after the separator.
        if let Some(newline) = raw[start..].iter().position(|&b| b == b'\n') {
            let newline = start + newline;
            if newline >= start + 2 && raw[newline - 2..].starts_with(VALUE_END) {
                return Some(&raw[start..newline - 2]);
            }
        }

        search_from = start;
    }

    None
}

/// Position of the first occurrence of `needle` in `haystack`
pub(crate) fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}
