//! Text transport of binary artifacts over line-oriented CI logs.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use crate::error::Result;

/// Column width used for wrapped payloads and rule lines.
pub const WRAP_WIDTH: usize = 72;

/// Split `s` into consecutive chunks of at most `width` characters.
///
/// Concatenating the chunks yields `s` again. A `width` of zero disables
/// wrapping and returns the whole string as a single chunk.
pub fn hard_wrap(s: &str, width: usize) -> Vec<&str> {
    if s.is_empty() {
        return Vec::new();
    }
    if width == 0 {
        return vec![s];
    }

    let mut lines = Vec::with_capacity(s.len() / width + 1);
    let mut start = 0;
    let mut count = 0;
    for (idx, _) in s.char_indices() {
        if count == width {
            lines.push(&s[start..idx]);
            start = idx;
            count = 0;
        }
        count += 1;
    }
    lines.push(&s[start..]);
    lines
}

/// A delimiting line of `width` dashes.
pub fn rule_line(width: usize) -> String {
    "-".repeat(width)
}

/// Standard, padded base64.
pub fn encode_base64(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Decode base64 text, ignoring line breaks and surrounding whitespace
/// inserted by [`hard_wrap`].
pub fn decode_base64(text: &str) -> Result<Vec<u8>> {
    let compact: String = text.split_whitespace().collect();
    Ok(STANDARD.decode(compact)?)
}
