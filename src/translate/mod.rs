//! Shared translation primitives: the JSON tree-walk utilities, tool-call id
//! remapping, and the incremental stream state machine, used by every
//! per-provider translator in this module's children.

pub mod gemini;
pub mod openai;

use serde_json::Value;

/// Recursively remove every occurrence of `key` anywhere in a JSON tree,
/// including inside arrays and nested objects. A pure function: idempotent,
/// and order-independent with respect to which occurrence is found first.
pub fn strip_key_recursive(value: &mut Value, key: &str) {
    match value {
        Value::Object(map) => {
            map.remove(key);
            for v in map.values_mut() {
                strip_key_recursive(v, key);
            }
        }
        Value::Array(items) => {
            for v in items.iter_mut() {
                strip_key_recursive(v, key);
            }
        }
        _ => {}
    }
}

/// Map an Anthropic tool_use id to an OpenAI-style tool_call id by
/// replacing the `toolu_` prefix with `call_`.
///
/// Handles the known double-prefix corruption `toolu_toolu_X` (an upstream
/// bug this proxy compensates for, see DESIGN.md) by stripping both copies
/// of the prefix before re-adding a single `call_`.
pub fn toolu_to_call(id: &str) -> String {
    let core = id
        .strip_prefix("toolu_toolu_")
        .or_else(|| id.strip_prefix("toolu_"))
        .unwrap_or(id);
    format!("call_{core}")
}

/// Map an OpenAI-style tool_call id back to an Anthropic tool_use id by
/// replacing the `call_` prefix with `toolu_`.
pub fn call_to_toolu(id: &str) -> String {
    let core = id.strip_prefix("call_").unwrap_or(id);
    format!("toolu_{core}")
}

/// What kind of content block is currently open in a streaming response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlockKind {
    #[default]
    None,
    Text,
    ToolUse,
}

/// A tool call under construction, indexed by the upstream delta index that
/// introduced it.
#[derive(Debug, Clone, Default)]
pub struct PartialToolCall {
    pub id: String,
    pub name: String,
    pub argument_accumulator: String,
}

/// Token usage accumulated over a stream, as far as upstream chunks report it.
#[derive(Debug, Clone, Copy, Default)]
pub struct AccumulatedUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cache_read: u64,
    pub cache_created: u64,
}

/// Per-request state owned by the stream translator for the lifetime of one
/// upstream call. Never shared across requests; passed by exclusive
/// reference into each `translate_chunk` call.
#[derive(Debug, Clone)]
pub struct StreamState {
    pub message_start_sent: bool,
    /// Index of the currently open content block, or `-1` if none.
    pub current_block_index: i64,
    pub current_block_kind: BlockKind,
    /// Partial tool calls, keyed by the upstream delta index that introduced
    /// them, mapping to the Anthropic block index assigned to each.
    pub tool_calls_by_index: std::collections::HashMap<u64, PartialToolCall>,
    /// Upstream delta index -> Anthropic content block index, for tool calls.
    pub tool_block_index_by_delta_index: std::collections::HashMap<u64, i64>,
    pub model_id: String,
    pub message_id: String,
    pub accumulated_usage: AccumulatedUsage,
    pub finished: bool,
}

impl Default for StreamState {
    fn default() -> Self {
        Self {
            message_start_sent: false,
            current_block_index: -1,
            current_block_kind: BlockKind::None,
            tool_calls_by_index: std::collections::HashMap::new(),
            tool_block_index_by_delta_index: std::collections::HashMap::new(),
            model_id: String::new(),
            message_id: String::new(),
            accumulated_usage: AccumulatedUsage::default(),
            finished: false,
        }
    }
}

impl StreamState {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Format a complete Anthropic SSE event: `event: <name>\ndata: <json>\n\n`.
pub fn format_sse_event(event_type: &str, data: &Value) -> Vec<u8> {
    format!("event: {event_type}\ndata: {data}\n\n").into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn strip_key_recursive_removes_nested_and_array_occurrences() {
        let mut v = json!({
            "a": {"cache_control": {"type": "ephemeral"}, "b": [
                {"cache_control": "x", "c": 1},
                {"d": {"cache_control": 2}}
            ]},
        });
        strip_key_recursive(&mut v, "cache_control");
        assert!(v["a"].get("cache_control").is_none());
        assert!(v["a"]["b"][0].get("cache_control").is_none());
        assert!(v["a"]["b"][1]["d"].get("cache_control").is_none());
        assert_eq!(v["a"]["b"][0]["c"], 1);
    }

    #[test]
    fn strip_key_recursive_is_idempotent() {
        let mut v = json!({"cache_control": 1, "nested": {"cache_control": 2}});
        let mut once = v.clone();
        strip_key_recursive(&mut once, "cache_control");
        strip_key_recursive(&mut v, "cache_control");
        strip_key_recursive(&mut v, "cache_control");
        assert_eq!(once, v);
    }

    #[test]
    fn toolu_to_call_round_trips() {
        assert_eq!(toolu_to_call("toolu_abc123"), "call_abc123");
        assert_eq!(call_to_toolu(&toolu_to_call("toolu_abc123")), "toolu_abc123");
    }

    #[test]
    fn toolu_to_call_strips_double_prefix_corruption() {
        assert_eq!(toolu_to_call("toolu_toolu_abc123"), "call_abc123");
    }

    #[test]
    fn call_to_toolu_basic() {
        assert_eq!(call_to_toolu("call_xyz"), "toolu_xyz");
    }
}
