//! Gemini response body -> Anthropic response body (C5, buffered).

use anyhow::{Context, Result};
use serde_json::{json, Value};

/// Convert a complete (non-streaming) Gemini `generateContent` response body
/// into an Anthropic Messages response body.
///
/// Gemini carries no per-response `id` or per-`functionCall` id; this proxy
/// synthesizes both (`responseId` when the API supplies one, otherwise a
/// fixed placeholder; `toolu_<n>` by position within the candidate's parts).
pub fn translate_response(body: &[u8]) -> Result<Vec<u8>> {
    let value: Value = serde_json::from_slice(body).context("parsing Gemini response body")?;

    if let Some(error) = value.get("error") {
        return Ok(serde_json::to_vec(&translate_error(error))?);
    }

    let candidate = value
        .get("candidates")
        .and_then(|c| c.get(0))
        .context("response has no candidates[0]")?;
    let parts = candidate
        .pointer("/content/parts")
        .and_then(|p| p.as_array())
        .cloned()
        .unwrap_or_default();

    let mut content = Vec::new();
    let mut tool_use_ordinal = 0usize;
    for part in &parts {
        if let Some(text) = part.get("text").and_then(|t| t.as_str()) {
            if !text.is_empty() {
                content.push(json!({"type": "text", "text": text}));
            }
        } else if let Some(function_call) = part.get("functionCall") {
            let id = format!("toolu_{tool_use_ordinal}");
            tool_use_ordinal += 1;
            content.push(json!({
                "type": "tool_use",
                "id": id,
                "name": function_call.get("name").cloned().unwrap_or(Value::Null),
                "input": function_call.get("args").cloned().unwrap_or_else(|| json!({})),
            }));
        }
    }

    let stop_reason = map_finish_reason(candidate.get("finishReason").and_then(|r| r.as_str()));
    let usage = translate_usage(value.get("usageMetadata"));

    let out = json!({
        "id": value.get("responseId").cloned().unwrap_or(Value::Null),
        "type": "message",
        "role": "assistant",
        "model": value.get("modelVersion").cloned().unwrap_or(Value::Null),
        "content": content,
        "stop_reason": stop_reason,
        "usage": usage,
    });

    Ok(serde_json::to_vec(&out)?)
}

fn map_finish_reason(reason: Option<&str>) -> &'static str {
    match reason {
        Some("STOP") => "end_turn",
        Some("MAX_TOKENS") => "max_tokens",
        Some("SAFETY") => "stop_sequence",
        Some("FUNCTION_CALL") => "tool_use",
        _ => "end_turn",
    }
}

fn translate_usage(usage: Option<&Value>) -> Value {
    let Some(usage) = usage else {
        return json!({"input_tokens": 0, "output_tokens": 0});
    };
    json!({
        "input_tokens": usage.get("promptTokenCount").cloned().unwrap_or(json!(0)),
        "output_tokens": usage.get("candidatesTokenCount").cloned().unwrap_or(json!(0)),
    })
}

fn translate_error(error: &Value) -> Value {
    let status = error.get("status").and_then(|s| s.as_str()).unwrap_or("");
    let mapped_type = match status {
        "RESOURCE_EXHAUSTED" => "billing_error".to_string(),
        "" => "api_error".to_string(),
        other => other.to_lowercase(),
    };
    let message = error.get("message").cloned().unwrap_or(Value::Null);
    json!({
        "type": "error",
        "error": {"type": mapped_type, "message": message},
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(bytes: &[u8]) -> Value {
        serde_json::from_slice(bytes).unwrap()
    }

    #[test]
    fn buffered_gemini_text_to_anthropic() {
        let upstream = br#"{"modelVersion":"gemini-2.0-flash","candidates":[{"content":{"parts":[{"text":"hello"}]},"finishReason":"STOP"}],"usageMetadata":{"promptTokenCount":1,"candidatesTokenCount":1}}"#;
        let out = parse(&translate_response(upstream).unwrap());
        assert_eq!(out["type"], "message");
        assert_eq!(out["role"], "assistant");
        assert_eq!(out["model"], "gemini-2.0-flash");
        assert_eq!(out["content"][0]["type"], "text");
        assert_eq!(out["content"][0]["text"], "hello");
        assert_eq!(out["stop_reason"], "end_turn");
        assert_eq!(out["usage"]["input_tokens"], 1);
        assert_eq!(out["usage"]["output_tokens"], 1);
    }

    #[test]
    fn maps_function_call_parts_to_tool_use_with_ordinal_ids() {
        let upstream = br#"{"candidates":[{"content":{"parts":[
            {"functionCall":{"name":"ls","args":{"path":"/"}}},
            {"functionCall":{"name":"cat","args":{"path":"/etc"}}}
        ]},"finishReason":"FUNCTION_CALL"}]}"#;
        let out = parse(&translate_response(upstream).unwrap());
        assert_eq!(out["content"][0]["id"], "toolu_0");
        assert_eq!(out["content"][0]["name"], "ls");
        assert_eq!(out["content"][1]["id"], "toolu_1");
        assert_eq!(out["stop_reason"], "tool_use");
    }

    #[test]
    fn maps_finish_reasons() {
        assert_eq!(map_finish_reason(Some("STOP")), "end_turn");
        assert_eq!(map_finish_reason(Some("MAX_TOKENS")), "max_tokens");
        assert_eq!(map_finish_reason(Some("SAFETY")), "stop_sequence");
        assert_eq!(map_finish_reason(Some("FUNCTION_CALL")), "tool_use");
        assert_eq!(map_finish_reason(None), "end_turn");
    }

    #[test]
    fn translates_error_body() {
        let upstream = br#"{"error":{"code":429,"message":"quota exceeded","status":"RESOURCE_EXHAUSTED"}}"#;
        let out = parse(&translate_response(upstream).unwrap());
        assert_eq!(out["type"], "error");
        assert_eq!(out["error"]["type"], "billing_error");
        assert_eq!(out["error"]["message"], "quota exceeded");
    }
}
