//! Streamed-response parsing: SSE framing and best-effort recovery of a
//! cumulative [`ExtractionSnapshot`] from an incomplete JSON prefix.
//!
//! The upstream model emits one JSON object token by token. After each
//! delta the accumulated text is an arbitrary prefix of that object; to
//! render incrementally we close whatever scopes are still open and try to
//! parse. When the raw tail is unparseable (cut mid-escape, mid-key, and so
//! on) we retreat a few characters at a time until a prefix parses.

use mindmap_core::ExtractionSnapshot;

/// How far back from the end of the buffer to look for a parseable prefix.
const MAX_REPAIR_ATTEMPTS: usize = 512;

/// Accumulates raw response bytes and yields complete SSE lines.
///
/// Network chunks split at arbitrary byte offsets, so a multi-byte UTF-8
/// character can straddle two chunks; decoding happens per complete line,
/// never per chunk.
#[derive(Debug, Default)]
pub struct LineBuffer {
    buf: Vec<u8>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one chunk and drain every newline-terminated line it
    /// completes, with trailing `\r\n` removed.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(chunk);
        let mut lines = Vec::new();
        while let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
            let raw: Vec<u8> = self.buf.drain(..=pos).collect();
            lines.push(String::from_utf8_lossy(&raw).trim_end().to_string());
        }
        lines
    }
}

/// Extract the payload of one SSE line. Returns `None` for non-data lines,
/// keep-alive comments, and the `[DONE]` terminator.
pub fn parse_sse_line(line: &str) -> Option<&str> {
    let data = line.strip_prefix("data:")?.trim();
    if data.is_empty() || data == "[DONE]" {
        return None;
    }
    Some(data)
}

/// Pull the content delta out of one chat-completions stream chunk.
pub fn content_delta(data: &str) -> Option<String> {
    let chunk: serde_json::Value = serde_json::from_str(data).ok()?;
    chunk["choices"][0]["delta"]["content"]
        .as_str()
        .map(String::from)
}

/// Strip markdown code fences the model sometimes wraps around JSON.
pub fn clean_fences(text: &str) -> &str {
    let text = text.trim();
    let text = text
        .strip_prefix("```json")
        .or_else(|| text.strip_prefix("```"))
        .unwrap_or(text);
    text.strip_suffix("```").unwrap_or(text).trim()
}

/// Parse the accumulated stream text into a snapshot, tolerating a
/// truncated tail. Returns `None` when no prefix near the end parses yet;
/// callers simply wait for the next delta.
pub fn parse_partial_snapshot(text: &str) -> Option<ExtractionSnapshot> {
    let cleaned = clean_fences(text);
    let start = cleaned.find('{')?;
    let body = &cleaned[start..];

    if let Ok(snapshot) = serde_json::from_str(body) {
        return Some(snapshot);
    }

    let mut attempts = 0;
    for cut in (1..=body.len()).rev().filter(|&i| body.is_char_boundary(i)) {
        attempts += 1;
        if attempts > MAX_REPAIR_ATTEMPTS {
            break;
        }
        let Some(completed) = complete_brackets(&body[..cut]) else {
            continue;
        };
        if let Ok(snapshot) = serde_json::from_str::<ExtractionSnapshot>(&completed) {
            return Some(snapshot);
        }
    }
    None
}

/// Close the open scopes of a JSON prefix: finish a dangling escape or
/// string, then append the missing closers in stack order. `None` when the
/// prefix is structurally invalid (mismatched closer).
fn complete_brackets(prefix: &str) -> Option<String> {
    let mut stack: Vec<char> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for c in prefix.chars() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => stack.push('}'),
            '[' => stack.push(']'),
            '}' | ']' => {
                if stack.pop() != Some(c) {
                    return None;
                }
            }
            _ => {}
        }
    }

    let mut out = String::from(prefix);
    if escaped {
        out.pop();
    }
    if in_string {
        out.push('"');
    }
    while let Some(closer) = stack.pop() {
        out.push(closer);
    }
    Some(out)
}
