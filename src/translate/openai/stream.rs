//! OpenAI-family SSE stream -> Anthropic SSE stream (C6, the stream state
//! machine described in §4.6). One upstream call owns one `StreamState`;
//! this module never shares state across requests.

use crate::translate::{call_to_toolu, format_sse_event, BlockKind, StreamState};
use serde_json::{json, Value};

/// Translate one complete upstream JSON chunk into zero or more Anthropic
/// SSE events. If the chunk fails to parse as JSON, the original bytes are
/// forwarded unchanged and `state` is left untouched (§7 `StreamTransformFailure`).
pub fn translate_stream_chunk(chunk_json: &[u8], state: &mut StreamState) -> Vec<u8> {
    if state.finished {
        return Vec::new();
    }

    let value: Value = match serde_json::from_slice(chunk_json) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(error = %e, "failed to parse upstream stream chunk; forwarding raw line");
            return chunk_json.to_vec();
        }
    };

    let Some(choice) = value.get("choices").and_then(|c| c.get(0)) else {
        return Vec::new();
    };

    let mut out = Vec::new();

    if !state.message_start_sent {
        state.message_id = value
            .get("id")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();
        state.model_id = value
            .get("model")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();
        out.extend(emit_message_start(state));
        state.message_start_sent = true;
    }

    let delta = choice.get("delta");

    if let Some(text) = delta.and_then(|d| d.get("content")).and_then(|c| c.as_str()) {
        if !text.is_empty() {
            out.extend(handle_text_delta(state, text));
        }
    }

    if let Some(tool_calls) = delta
        .and_then(|d| d.get("tool_calls"))
        .and_then(|t| t.as_array())
    {
        for entry in tool_calls {
            out.extend(handle_tool_call_delta(state, entry));
        }
    }

    if let Some(finish_reason) = choice.get("finish_reason").and_then(|f| f.as_str()) {
        out.extend(handle_finish(state, finish_reason, value.get("usage")));
    }

    out
}

/// Forward the upstream `data: [DONE]` sentinel verbatim, as Anthropic-format
/// clients expect to see it terminate the stream.
pub fn translate_done() -> Vec<u8> {
    b"data: [DONE]\n\n".to_vec()
}

fn emit_message_start(state: &StreamState) -> Vec<u8> {
    format_sse_event(
        "message_start",
        &json!({
            "type": "message_start",
            "message": {
                "id": state.message_id,
                "type": "message",
                "role": "assistant",
                "model": state.model_id,
                "content": [],
                "stop_reason": Value::Null,
                "usage": {"input_tokens": 0, "output_tokens": 0},
            }
        }),
    )
}

fn emit_block_stop(index: i64) -> Vec<u8> {
    format_sse_event("content_block_stop", &json!({"type": "content_block_stop", "index": index}))
}

fn handle_text_delta(state: &mut StreamState, text: &str) -> Vec<u8> {
    let mut out = Vec::new();
    if state.current_block_kind != BlockKind::Text {
        if state.current_block_kind != BlockKind::None {
            out.extend(emit_block_stop(state.current_block_index));
        }
        state.current_block_index += 1;
        state.current_block_kind = BlockKind::Text;
        out.extend(format_sse_event(
            "content_block_start",
            &json!({
                "type": "content_block_start",
                "index": state.current_block_index,
                "content_block": {"type": "text", "text": ""},
            }),
        ));
    }
    out.extend(format_sse_event(
        "content_block_delta",
        &json!({
            "type": "content_block_delta",
            "index": state.current_block_index,
            "delta": {"type": "text_delta", "text": text},
        }),
    ));
    out
}

fn handle_tool_call_delta(state: &mut StreamState, entry: &Value) -> Vec<u8> {
    let mut out = Vec::new();
    let delta_index = entry.get("index").and_then(|i| i.as_u64()).unwrap_or(0);
    let id = entry
        .get("id")
        .and_then(|v| v.as_str())
        .map(str::to_string);
    let name = entry
        .get("function")
        .and_then(|f| f.get("name"))
        .and_then(|n| n.as_str())
        .map(str::to_string);
    let arguments_fragment = entry
        .get("function")
        .and_then(|f| f.get("arguments"))
        .and_then(|a| a.as_str())
        .unwrap_or("")
        .to_string();

    let first_sighting = id.is_some() || name.is_some();

    if first_sighting {
        if state.current_block_kind != BlockKind::None {
            out.extend(emit_block_stop(state.current_block_index));
        }
        state.current_block_index += 1;
        state.current_block_kind = BlockKind::ToolUse;
        state
            .tool_block_index_by_delta_index
            .insert(delta_index, state.current_block_index);

        let entry_state = state.tool_calls_by_index.entry(delta_index).or_default();
        if let Some(id) = &id {
            entry_state.id = id.clone();
        }
        if let Some(name) = &name {
            entry_state.name = name.clone();
        }
        let tool_id = entry_state.id.clone();
        let tool_name = entry_state.name.clone();

        out.extend(format_sse_event(
            "content_block_start",
            &json!({
                "type": "content_block_start",
                "index": state.current_block_index,
                "content_block": {
                    "type": "tool_use",
                    "id": call_to_toolu(&tool_id),
                    "name": tool_name,
                    "input": {},
                },
            }),
        ));
    } else if !arguments_fragment.is_empty() {
        if let Some(entry_state) = state.tool_calls_by_index.get_mut(&delta_index) {
            entry_state.argument_accumulator.push_str(&arguments_fragment);
        }
        if let Some(&mapped_index) = state.tool_block_index_by_delta_index.get(&delta_index) {
            out.extend(format_sse_event(
                "content_block_delta",
                &json!({
                    "type": "content_block_delta",
                    "index": mapped_index,
                    "delta": {"type": "input_json_delta", "partial_json": arguments_fragment},
                }),
            ));
        }
    }
    out
}

fn handle_finish(state: &mut StreamState, finish_reason: &str, usage: Option<&Value>) -> Vec<u8> {
    let mut out = Vec::new();
    if state.current_block_kind != BlockKind::None {
        out.extend(emit_block_stop(state.current_block_index));
        state.current_block_kind = BlockKind::None;
    }
    let stop_reason = map_stop_reason(finish_reason);
    let output_tokens = usage
        .and_then(|u| u.get("completion_tokens"))
        .and_then(|v| v.as_u64())
        .unwrap_or(0);

    state.accumulated_usage.output_tokens = output_tokens;

    out.extend(format_sse_event(
        "message_delta",
        &json!({
            "type": "message_delta",
            "delta": {"stop_reason": stop_reason, "stop_sequence": Value::Null},
            "usage": {"output_tokens": output_tokens},
        }),
    ));
    out.extend(format_sse_event("message_stop", &json!({"type": "message_stop"})));
    state.finished = true;
    out
}

fn map_stop_reason(finish_reason: &str) -> &'static str {
    match finish_reason {
        "stop" => "end_turn",
        "length" => "max_tokens",
        "tool_calls" | "function_call" => "tool_use",
        "content_filter" => "stop_sequence",
        _ => "end_turn",
    }
}
