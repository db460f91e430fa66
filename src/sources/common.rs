//! Helpers shared across conversation source adapters: timestamp parsing
//! across heterogeneous formats and content-block flattening.
//!
//! Adapted from the parsing helpers used by cross-agent session tooling
//! in this codebase family, which face the same epoch-millis-vs-ISO8601
//! and string-vs-content-block inconsistencies across IDE session
//! formats.

use crate::types::Millis;

/// Parses a timestamp that may be an epoch (seconds or milliseconds) or
/// an RFC3339/ISO-8601 string, returning milliseconds since the Unix
/// epoch.
#[must_use]
pub fn parse_timestamp(val: &serde_json::Value) -> Option<Millis> {
    if let Some(n) = val.as_i64() {
        // Heuristic: timestamps below this are plausibly seconds, not ms.
        return Some(Millis::new(if n < 10_000_000_000 { n * 1000 } else { n }));
    }
    if let Some(n) = val.as_f64() {
        return Some(Millis::new(if n < 10_000_000_000.0 { (n * 1000.0) as i64 } else { n as i64 }));
    }

    let s = val.as_str()?;
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(s) {
        return Some(Millis::new(dt.timestamp_millis()));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.fZ", "%Y-%m-%dT%H:%M:%SZ", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(dt) = chrono::NaiveDateTime::parse_from_str(s, fmt) {
            return Some(Millis::new(dt.and_utc().timestamp_millis()));
        }
    }
    None
}

/// Flattens a message content value into plain text. Handles a plain
/// string, an array of `{"type": "text"|"input_text", "text": ...}`
/// blocks, and `{"type": "tool_use", "name": ..., "input": ...}` blocks,
/// which render as `[Tool: name - description]`.
#[must_use]
pub fn flatten_content(val: &serde_json::Value) -> String {
    match val {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Array(blocks) => blocks
            .iter()
            .filter_map(flatten_block)
            .collect::<Vec<_>>()
            .join("\n"),
        other => other.to_string(),
    }
}

fn flatten_block(block: &serde_json::Value) -> Option<String> {
    let obj = block.as_object()?;
    let block_type = obj.get("type").and_then(|v| v.as_str())?;

    match block_type {
        "text" | "input_text" => obj.get("text").and_then(|v| v.as_str()).map(str::to_string),
        "tool_use" => {
            let name = obj.get("name").and_then(|v| v.as_str()).unwrap_or("unknown");
            let description = obj
                .get("input")
                .and_then(|v| v.get("description").or_else(|| v.get("file_path")))
                .and_then(|v| v.as_str());
            Some(match description {
                Some(desc) => format!("[Tool: {name} - {desc}]"),
                None => format!("[Tool: {name}]"),
            })
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_epoch_millis() {
        assert_eq!(parse_timestamp(&json!(1_700_000_000_000i64)), Some(Millis::new(1_700_000_000_000)));
    }

    #[test]
    fn parses_epoch_seconds() {
        assert_eq!(parse_timestamp(&json!(1_700_000_000i64)), Some(Millis::new(1_700_000_000_000)));
    }

    #[test]
    fn parses_rfc3339() {
        let got = parse_timestamp(&json!("2024-01-15T10:30:00Z"));
        assert!(got.is_some());
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(parse_timestamp(&json!("not a timestamp")), None);
        assert_eq!(parse_timestamp(&json!(null)), None);
    }

    #[test]
    fn flattens_plain_string() {
        assert_eq!(flatten_content(&json!("hello")), "hello");
    }

    #[test]
    fn flattens_text_blocks() {
        let val = json!([{"type": "text", "text": "hello"}, {"type": "text", "text": "world"}]);
        assert_eq!(flatten_content(&val), "hello\nworld");
    }

    #[test]
    fn flattens_tool_use_block_with_description() {
        let val = json!([{"type": "tool_use", "name": "read_file", "input": {"file_path": "a.rs"}}]);
        assert_eq!(flatten_content(&val), "[Tool: read_file - a.rs]");
    }

    #[test]
    fn flattens_tool_use_block_without_description() {
        let val = json!([{"type": "tool_use", "name": "noop", "input": {}}]);
        assert_eq!(flatten_content(&val), "[Tool: noop]");
    }
}
