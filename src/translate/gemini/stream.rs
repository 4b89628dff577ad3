//! Gemini stream chunk -> Anthropic SSE (C6).
//!
//! Gemini's `functionCall` parts arrive whole — it does not fragment a tool
//! call's arguments across chunks the way the OpenAI family does — so a
//! tool-use block opens and closes within the chunk that introduces it,
//! rather than staying open across `tool_block_index_by_delta_index` lookups.

use crate::translate::{format_sse_event, BlockKind, StreamState};
use serde_json::{json, Value};

/// Translate one complete Gemini stream chunk into zero or more Anthropic
/// SSE events. Unparseable chunks are forwarded raw and leave `state` untouched.
pub fn translate_stream_chunk(chunk_json: &[u8], state: &mut StreamState) -> Vec<u8> {
    if state.finished {
        return Vec::new();
    }

    let value: Value = match serde_json::from_slice(chunk_json) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(error = %e, "failed to parse upstream Gemini stream chunk; forwarding raw");
            return chunk_json.to_vec();
        }
    };

    let Some(candidate) = value.get("candidates").and_then(|c| c.get(0)) else {
        return Vec::new();
    };

    let mut out = Vec::new();

    if !state.message_start_sent {
        state.message_id = value
            .get("responseId")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();
        state.model_id = value
            .get("modelVersion")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();
        out.extend(emit_message_start(state));
        state.message_start_sent = true;
    }

    let parts = candidate
        .pointer("/content/parts")
        .and_then(|p| p.as_array())
        .cloned()
        .unwrap_or_default();

    for part in &parts {
        if let Some(text) = part.get("text").and_then(|t| t.as_str()) {
            if !text.is_empty() {
                out.extend(handle_text_delta(state, text));
            }
        } else if let Some(function_call) = part.get("functionCall") {
            out.extend(handle_function_call(state, function_call));
        }
    }

    if let Some(finish_reason) = candidate.get("finishReason").and_then(|r| r.as_str()) {
        out.extend(handle_finish(state, finish_reason, value.get("usageMetadata")));
    }

    out
}

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

fn handle_function_call(state: &mut StreamState, function_call: &Value) -> Vec<u8> {
    let mut out = Vec::new();
    if state.current_block_kind != BlockKind::None {
        out.extend(emit_block_stop(state.current_block_index));
    }
    state.current_block_index += 1;
    let index = state.current_block_index;
    state.current_block_kind = BlockKind::ToolUse;

    let name = function_call.get("name").cloned().unwrap_or(Value::Null);
    let args = function_call.get("args").cloned().unwrap_or_else(|| json!({}));
    let tool_use_id = format!("toolu_{index}");

    out.extend(format_sse_event(
        "content_block_start",
        &json!({
            "type": "content_block_start",
            "index": index,
            "content_block": {"type": "tool_use", "id": tool_use_id, "name": name, "input": {}},
        }),
    ));
    out.extend(format_sse_event(
        "content_block_delta",
        &json!({
            "type": "content_block_delta",
            "index": index,
            "delta": {"type": "input_json_delta", "partial_json": args.to_string()},
        }),
    ));
    out.extend(emit_block_stop(index));
    state.current_block_kind = BlockKind::None;
    out
}

fn handle_finish(state: &mut StreamState, finish_reason: &str, usage: Option<&Value>) -> Vec<u8> {
    let mut out = Vec::new();
    if state.current_block_kind != BlockKind::None {
        out.extend(emit_block_stop(state.current_block_index));
        state.current_block_kind = BlockKind::None;
    }
    let stop_reason = map_finish_reason(finish_reason);
    let output_tokens = usage
        .and_then(|u| u.get("candidatesTokenCount"))
        .and_then(|v| v.as_u64())
        .unwrap_or(0);

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

fn map_finish_reason(reason: &str) -> &'static str {
    match reason {
        "STOP" => "end_turn",
        "MAX_TOKENS" => "max_tokens",
        "SAFETY" => "stop_sequence",
        "FUNCTION_CALL" => "tool_use",
        _ => "end_turn",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn events(chunks: &[&[u8]]) -> Vec<Value> {
        let mut state = StreamState::new();
        let mut out = Vec::new();
        for chunk in chunks {
            out.extend(parse_events(&translate_stream_chunk(chunk, &mut state)));
        }
        out
    }

    fn parse_events(bytes: &[u8]) -> Vec<Value> {
        let text = String::from_utf8_lossy(bytes);
        text.split("\n\n")
            .filter(|b| !b.trim().is_empty())
            .map(|b| {
                let data_line = b.lines().find(|l| l.starts_with("data:")).unwrap();
                serde_json::from_str(data_line.trim_start_matches("data:").trim()).unwrap()
            })
            .collect()
    }

    #[test]
    fn streaming_text_across_chunks() {
        let evs = events(&[
            br#"{"modelVersion":"gemini-2.0-flash","candidates":[{"content":{"parts":[{"text":"he"}]}}]}"#,
            br#"{"candidates":[{"content":{"parts":[{"text":"llo"}]},"finishReason":"STOP"}]}"#,
        ]);
        assert_eq!(evs[0]["type"], "message_start");
        assert_eq!(evs[1]["type"], "content_block_start");
        assert_eq!(evs[2]["delta"]["text"], "he");
        assert_eq!(evs[3]["delta"]["text"], "llo");
        assert_eq!(evs[4]["type"], "content_block_stop");
        assert_eq!(evs[5]["delta"]["stop_reason"], "end_turn");
        assert_eq!(evs[6]["type"], "message_stop");
    }

    #[test]
    fn function_call_opens_and_closes_within_one_chunk() {
        let evs = events(&[
            br#"{"candidates":[{"content":{"parts":[{"functionCall":{"name":"ls","args":{"path":"/"}}}]},"finishReason":"FUNCTION_CALL"}]}"#,
        ]);
        assert_eq!(evs[0]["type"], "message_start");
        assert_eq!(evs[1]["type"], "content_block_start");
        assert_eq!(evs[1]["content_block"]["type"], "tool_use");
        assert_eq!(evs[1]["content_block"]["name"], "ls");
        assert_eq!(evs[2]["type"], "content_block_delta");
        assert_eq!(evs[3]["type"], "content_block_stop");
        assert_eq!(evs[4]["delta"]["stop_reason"], "tool_use");
        assert_eq!(evs[5]["type"], "message_stop");
    }

    #[test]
    fn unparseable_chunk_is_forwarded_raw() {
        let mut state = StreamState::new();
        let out = translate_stream_chunk(b"not json", &mut state);
        assert_eq!(out, b"not json");
        assert!(!state.message_start_sent);
    }
}
