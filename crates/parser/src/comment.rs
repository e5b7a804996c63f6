//! State-comment parser: `[frame<N>: ]key=value key=value ...`.
//!
//! Values may contain spaces inside parentheses (`scalar(id=3, umax=7)`),
//! so a value ends at the first space seen at parenthesis depth zero.

use tracing::trace;
use vlog_common::{SlotId, Span, StateExpression};

/// Suffix marking a slot the current line wrote.
const WRITTEN_SUFFIX: &str = "_w";

/// Parse the state comment that starts at byte `start` of `line`.
///
/// A `start` inside a multi-byte character moves forward to the next
/// character. Tokens without `=` and keys that are not slot ids are
/// skipped; parsing continues with the next token.
pub fn parse_state_comment(line: &str, start: usize) -> Vec<StateExpression> {
    let bytes = line.as_bytes();
    let mut start = start.min(bytes.len());
    while !line.is_char_boundary(start) {
        start += 1;
    }
    let mut pos = skip_spaces(bytes, start);
    let mut exprs = Vec::new();

    let frame = match parse_frame_prefix(line, pos) {
        Some((frame, next)) => {
            pos = next;
            frame
        }
        None => 0,
    };

    loop {
        pos = skip_spaces(bytes, pos);
        if pos >= bytes.len() {
            break;
        }
        let token_start = pos;
        while pos < bytes.len() && bytes[pos] != b'=' && bytes[pos] != b' ' {
            pos += 1;
        }
        if pos >= bytes.len() || bytes[pos] != b'=' {
            trace!(token = &line[token_start..pos], "skipping state token without '='");
            continue;
        }
        let key = &line[token_start..pos];
        let value_start = pos + 1;
        pos = scan_value(bytes, value_start);
        let value = &line[value_start..pos];

        let (id_text, written) = match key.to_ascii_lowercase().strip_suffix(WRITTEN_SUFFIX) {
            Some(stripped) => (stripped.to_string(), true),
            None => (key.to_ascii_lowercase(), false),
        };
        match id_text.parse::<SlotId>() {
            Ok(id) => exprs.push(StateExpression {
                id,
                value: value.to_string(),
                written,
                frame,
                span: Span::from_range(token_start, pos),
            }),
            Err(_) => trace!(key, "skipping non-slot state key"),
        }
    }

    exprs
}

/// Scan from `start` to the next space at parenthesis depth zero.
fn scan_value(bytes: &[u8], start: usize) -> usize {
    let mut depth = 0usize;
    let mut pos = start;
    while pos < bytes.len() {
        match bytes[pos] {
            b'(' => depth += 1,
            b')' => depth = depth.saturating_sub(1),
            b' ' if depth == 0 => break,
            _ => {}
        }
        pos += 1;
    }
    pos
}

/// `frame<N>: ` → `(N, position after the colon)`.
fn parse_frame_prefix(line: &str, pos: usize) -> Option<(usize, usize)> {
    let rest = line.get(pos..)?.strip_prefix("frame")?;
    let digits_len = rest.bytes().take_while(u8::is_ascii_digit).count();
    if digits_len == 0 || rest.as_bytes().get(digits_len) != Some(&b':') {
        return None;
    }
    let frame = rest[..digits_len].parse().ok()?;
    Some((frame, pos + "frame".len() + digits_len + 1))
}

fn skip_spaces(bytes: &[u8], mut pos: usize) -> usize {
    while pos < bytes.len() && matches!(bytes[pos], b' ' | b'\t') {
        pos += 1;
    }
    pos
}
