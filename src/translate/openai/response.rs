//! OpenAI-family response body -> Anthropic response body (C5, buffered).

use crate::translate::call_to_toolu;
use anyhow::{Context, Result};
use serde_json::{json, Value};

/// Convert a complete (non-streaming) OpenAI-family response body into an
/// Anthropic Messages response body.
///
/// Error-shaped upstream bodies (`{"error": {...}}`) are translated into
/// Anthropic's `{"type":"error","error":{...}}` shape per §4.5, rather than
/// being treated as a successful message.
pub fn translate_response(body: &[u8]) -> Result<Vec<u8>> {
    let value: Value = serde_json::from_slice(body).context("parsing OpenAI-family response body")?;

    if let Some(error) = value.get("error") {
        return Ok(serde_json::to_vec(&translate_error(error))?);
    }

    let choice = value
        .get("choices")
        .and_then(|c| c.get(0))
        .context("response has no choices[0]")?;
    let message = choice.get("message").context("choice has no message")?;

    let mut content = Vec::new();
    if let Some(text) = message.get("content").and_then(|c| c.as_str()) {
        if !text.is_empty() {
            content.push(json!({"type": "text", "text": text}));
        }
    }
    if let Some(tool_calls) = message.get("tool_calls").and_then(|t| t.as_array()) {
        for tc in tool_calls {
            let id = tc.get("id").and_then(|v| v.as_str()).unwrap_or("");
            let name = tc
                .get("function")
                .and_then(|f| f.get("name"))
                .cloned()
                .unwrap_or(Value::Null);
            let arguments = tc
                .get("function")
                .and_then(|f| f.get("arguments"))
                .and_then(|a| a.as_str())
                .unwrap_or("{}");
            let input: Value = serde_json::from_str(arguments).unwrap_or(json!({}));
            content.push(json!({
                "type": "tool_use",
                "id": call_to_toolu(id),
                "name": name,
                "input": input,
            }));
        }
    }

    let stop_reason = map_stop_reason(choice.get("finish_reason").and_then(|r| r.as_str()));
    let usage = translate_usage(value.get("usage"));

    let out = json!({
        "id": value.get("id").cloned().unwrap_or(Value::Null),
        "type": "message",
        "role": "assistant",
        "model": value.get("model").cloned().unwrap_or(Value::Null),
        "content": content,
        "stop_reason": stop_reason,
        "usage": usage,
    });

    Ok(serde_json::to_vec(&out)?)
}

fn map_stop_reason(finish_reason: Option<&str>) -> &'static str {
    match finish_reason {
        Some("stop") => "end_turn",
        Some("length") => "max_tokens",
        Some("tool_calls") | Some("function_call") => "tool_use",
        Some("content_filter") => "stop_sequence",
        _ => "end_turn",
    }
}

fn translate_usage(usage: Option<&Value>) -> Value {
    let Some(usage) = usage else {
        return json!({"input_tokens": 0, "output_tokens": 0});
    };
    let input_tokens = usage.get("prompt_tokens").cloned().unwrap_or(json!(0));
    let output_tokens = usage.get("completion_tokens").cloned().unwrap_or(json!(0));
    let mut out = json!({"input_tokens": input_tokens, "output_tokens": output_tokens});
    if let Some(cached) = usage
        .get("prompt_tokens_details")
        .and_then(|d| d.get("cached_tokens"))
    {
        out["cache_read_input_tokens"] = cached.clone();
    }
    if let Some(created) = usage.get("cache_creation_input_tokens") {
        out["cache_creation_input_tokens"] = created.clone();
    }
    out
}

/// Anthropic's own error type names; anything outside this set is folded to
/// `api_error` rather than forwarded verbatim.
const KNOWN_ANTHROPIC_ERROR_TYPES: &[&str] = &[
    "invalid_request_error",
    "authentication_error",
    "permission_error",
    "not_found_error",
    "request_too_large",
    "rate_limit_error",
    "api_error",
    "overloaded_error",
    "billing_error",
];

fn translate_error(error: &Value) -> Value {
    let error_type = error.get("type").and_then(|t| t.as_str()).unwrap_or("");
    let mapped_type = match error_type {
        "insufficient_quota_error" => "billing_error",
        other if KNOWN_ANTHROPIC_ERROR_TYPES.contains(&other) => other,
        _ => "api_error",
    };
    let message = error.get("message").cloned().unwrap_or(Value::Null);
    json!({
        "type": "error",
        "error": {"type": mapped_type, "message": message},
    })
}
