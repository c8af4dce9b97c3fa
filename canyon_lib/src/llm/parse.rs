use serde_json::{Value, json};

use crate::conversation::ToolCall;

/// Recovers tool calls that a model wrote into its text content as
/// `{"name": ..., "arguments": {...}}` objects. Only names in `tool_names` count.
pub fn parse_tool_calls_from_text(content: &str, tool_names: &[&str]) -> Vec<ToolCall> {
    let content = strip_code_fence(content.trim());

    if let Some(call) = parse_candidate(content, tool_names) {
        return vec![with_id(call, 0)];
    }

    json_objects(content)
        .into_iter()
        .filter_map(|candidate| parse_candidate(candidate, tool_names))
        .enumerate()
        .map(|(index, call)| with_id(call, index))
        .collect()
}

fn with_id((name, arguments): (String, Value), index: usize) -> ToolCall {
    ToolCall {
        id: format!("call_{index}"),
        name,
        arguments,
    }
}

fn parse_candidate(text: &str, tool_names: &[&str]) -> Option<(String, Value)> {
    let value: Value = serde_json::from_str(text).ok()?;
    let target = value.get("function").filter(|f| f.is_object()).unwrap_or(&value);

    let name = target.get("name")?.as_str()?;
    if !tool_names.contains(&name) {
        return None;
    }

    let arguments = target
        .get("arguments")
        .or_else(|| target.get("parameters"))
        .cloned()
        .unwrap_or_else(|| json!({}));
    let arguments = match arguments {
        Value::String(raw) => serde_json::from_str(&raw).unwrap_or(Value::String(raw)),
        other => other,
    };

    Some((name.to_string(), arguments))
}

/// Top-level `{...}` spans, ignoring braces inside string literals.
fn json_objects(content: &str) -> Vec<&str> {
    let mut spans = Vec::new();
    let mut depth = 0usize;
    let mut start = None;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in content.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match c {
            '"' if depth > 0 => in_string = true,
            '{' => {
                if depth == 0 {
                    start = Some(i);
                }
                depth += 1;
            }
            '}' if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    if let Some(s) = start.take() {
                        spans.push(&content[s..=i]);
                    }
                }
            }
            _ => {}
        }
    }

    spans
}

fn strip_code_fence(text: &str) -> &str {
    let Some(inner) = text.strip_prefix("```") else {
        return text;
    };
    let Some(inner) = inner.strip_suffix("```") else {
        return text;
    };
    // drop a language tag such as ```json
    match inner.find('\n') {
        Some(newline) if inner[..newline].trim().chars().all(|c| c.is_ascii_alphabetic()) => {
            inner[newline + 1..].trim()
        }
        _ => inner.trim(),
    }
}
