//! Anthropic request body -> OpenAI-family request body (C4).

use crate::translate::{strip_key_recursive, toolu_to_call};
use anyhow::{Context, Result};
use serde_json::{json, Value};

/// Convert an Anthropic Messages request body into an OpenAI Chat
/// Completions request body.
pub fn translate_request(body: &[u8]) -> Result<Vec<u8>> {
    let mut value: Value = serde_json::from_slice(body).context("parsing Anthropic request body")?;

    strip_key_recursive(&mut value, "cache_control");
    strip_metadata_unless_store(&mut value);

    let obj = value
        .as_object_mut()
        .context("Anthropic request body must be a JSON object")?;

    let system = obj.remove("system");
    if let Some(max_tokens) = obj.remove("max_tokens") {
        obj.insert("max_completion_tokens".to_string(), max_tokens);
    }

    if let Some(tools) = obj.get_mut("tools") {
        transform_tools(tools);
    }
    validate_tool_choice(obj);

    let messages = obj
        .remove("messages")
        .unwrap_or_else(|| Value::Array(Vec::new()));
    let messages = messages.as_array().cloned().unwrap_or_default();

    let mut out_messages = Vec::new();
    if let Some(Value::String(system_text)) = system {
        out_messages.push(json!({"role": "system", "content": system_text}));
    }
    for message in messages {
        out_messages.extend(convert_message(&message));
    }
    obj.insert("messages".to_string(), Value::Array(out_messages));

    Ok(serde_json::to_vec(&value)?)
}

fn strip_metadata_unless_store(value: &mut Value) {
    let Some(obj) = value.as_object_mut() else {
        return;
    };
    let store = matches!(obj.get("store"), Some(Value::Bool(true)));
    if !store {
        obj.remove("metadata");
    }
}

/// Transform each tool from Anthropic `{name, description, input_schema}`
/// form into OpenAI `{type:"function", function:{...}}` form. Tools already
/// in OpenAI form pass through unchanged.
///
/// Shared with the Gemini translator, which further converts the resulting
/// OpenAI-shaped tools into `functionDeclarations`.
pub(crate) fn transform_tools(tools: &mut Value) {
    let Some(items) = tools.as_array_mut() else {
        return;
    };
    for tool in items.iter_mut() {
        let already_openai_shaped = tool
            .get("type")
            .and_then(|t| t.as_str())
            .map(|t| t == "function")
            .unwrap_or(false);
        if already_openai_shaped {
            continue;
        }
        let Some(obj) = tool.as_object() else { continue };
        let name = obj.get("name").cloned().unwrap_or(Value::Null);
        let description = obj.get("description").cloned().unwrap_or(Value::Null);
        let parameters = obj.get("input_schema").cloned().unwrap_or(json!({}));
        *tool = json!({
            "type": "function",
            "function": {
                "name": name,
                "description": description,
                "parameters": parameters,
            }
        });
    }
}

/// Remove `tool_choice` if `tools` ends up absent, null, or empty.
fn validate_tool_choice(obj: &mut serde_json::Map<String, Value>) {
    let tools_usable = obj
        .get("tools")
        .map(|t| matches!(t, Value::Array(a) if !a.is_empty()))
        .unwrap_or(false);
    if !tools_usable {
        obj.remove("tool_choice");
    }
}

/// Convert one Anthropic message into zero or more OpenAI messages.
fn convert_message(message: &Value) -> Vec<Value> {
    let role = message.get("role").and_then(|r| r.as_str()).unwrap_or("user");
    let content = message.get("content");

    match content {
        Some(Value::String(text)) => vec![json!({"role": role, "content": text})],
        Some(Value::Array(blocks)) => {
            if role == "user" && blocks.iter().any(is_tool_result_block) {
                split_tool_result_message(blocks)
            } else if role == "assistant" && blocks.iter().any(is_tool_use_block) {
                vec![convert_assistant_tool_use_message(blocks)]
            } else {
                vec![json!({"role": role, "content": flatten_text_blocks(blocks)})]
            }
        }
        _ => vec![json!({"role": role, "content": Value::Null})],
    }
}

fn is_tool_result_block(block: &Value) -> bool {
    block.get("type").and_then(|t| t.as_str()) == Some("tool_result")
}

fn is_tool_use_block(block: &Value) -> bool {
    block.get("type").and_then(|t| t.as_str()) == Some("tool_use")
}

/// A `user` message containing `tool_result` blocks is split into one
/// `tool` message per result (mapping `tool_use_id` -> `tool_call_id` via
/// the `toolu_` -> `call_` prefix swap), followed by a `user` message
/// carrying any remaining non-tool-result blocks, if there are any.
fn split_tool_result_message(blocks: &[Value]) -> Vec<Value> {
    let mut out = Vec::new();
    let mut remaining = Vec::new();

    for block in blocks {
        if is_tool_result_block(block) {
            let tool_use_id = block
                .get("tool_use_id")
                .and_then(|v| v.as_str())
                .unwrap_or("");
            let tool_call_id = toolu_to_call(tool_use_id);
            let content = block
                .get("content")
                .map(flatten_tool_result_content)
                .unwrap_or_default();
            out.push(json!({
                "role": "tool",
                "tool_call_id": tool_call_id,
                "content": content,
            }));
        } else {
            remaining.push(block.clone());
        }
    }

    if !remaining.is_empty() {
        out.push(json!({"role": "user", "content": flatten_text_blocks(&remaining)}));
    }

    out
}

fn flatten_tool_result_content(content: &Value) -> String {
    match content {
        Value::String(s) => s.clone(),
        Value::Array(blocks) => flatten_text_blocks(blocks),
        other => other.to_string(),
    }
}

fn flatten_text_blocks(blocks: &[Value]) -> String {
    blocks
        .iter()
        .filter_map(|b| b.get("text").and_then(|t| t.as_str()))
        .collect::<Vec<_>>()
        .join("")
}

/// An `assistant` message containing `tool_use` blocks becomes a single
/// OpenAI assistant message: `content` is the concatenation of any text
/// blocks (null if there is none), and `tool_calls` holds one entry per
/// `tool_use` block.
fn convert_assistant_tool_use_message(blocks: &[Value]) -> Value {
    let text_blocks: Vec<Value> = blocks
        .iter()
        .filter(|b| b.get("type").and_then(|t| t.as_str()) == Some("text"))
        .cloned()
        .collect();
    let content = if text_blocks.is_empty() {
        Value::Null
    } else {
        Value::String(flatten_text_blocks(&text_blocks))
    };

    let tool_calls: Vec<Value> = blocks
        .iter()
        .filter(|b| is_tool_use_block(b))
        .map(|b| {
            let id = b.get("id").and_then(|v| v.as_str()).unwrap_or("");
            let name = b.get("name").cloned().unwrap_or(Value::Null);
            let input = b.get("input").cloned().unwrap_or(json!({}));
            json!({
                "id": toolu_to_call(id),
                "type": "function",
                "function": {
                    "name": name,
                    "arguments": input.to_string(),
                }
            })
        })
        .collect();

    json!({"role": "assistant", "content": content, "tool_calls": tool_calls})
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(bytes: &[u8]) -> Value {
        serde_json::from_slice(bytes).unwrap()
    }

    #[test]
    fn strips_cache_control_anywhere() {
        let body = br#"{"model":"m","messages":[{"role":"user","content":[{"type":"text","text":"hi","cache_control":{"type":"ephemeral"}}]}]}"#;
        let out = parse(&translate_request(body).unwrap());
        assert!(out["messages"][0].get("cache_control").is_none());
    }

    #[test]
    fn drops_metadata_without_store() {
        let body = br#"{"model":"m","metadata":{"user_id":"u1"},"messages":[]}"#;
        let out = parse(&translate_request(body).unwrap());
        assert!(out.get("metadata").is_none());
    }

    #[test]
    fn keeps_metadata_with_store_true() {
        let body = br#"{"model":"m","store":true,"metadata":{"user_id":"u1"},"messages":[]}"#;
        let out = parse(&translate_request(body).unwrap());
        assert_eq!(out["metadata"]["user_id"], "u1");
    }

    #[test]
    fn prepends_system_message_and_drops_top_level_field() {
        let body = br#"{"model":"m","system":"be nice","messages":[{"role":"user","content":"hi"}]}"#;
        let out = parse(&translate_request(body).unwrap());
        assert!(out.get("system").is_none());
        assert_eq!(out["messages"][0]["role"], "system");
        assert_eq!(out["messages"][0]["content"], "be nice");
        assert_eq!(out["messages"][1]["role"], "user");
    }

    #[test]
    fn renames_max_tokens() {
        let body = br#"{"model":"m","max_tokens":10,"messages":[]}"#;
        let out = parse(&translate_request(body).unwrap());
        assert!(out.get("max_tokens").is_none());
        assert_eq!(out["max_completion_tokens"], 10);
    }

    #[test]
    fn transforms_anthropic_tool_to_openai_function() {
        let body = br#"{"model":"m","tools":[{"name":"ls","description":"list","input_schema":{"type":"object"}}],"tool_choice":{"type":"auto"},"messages":[]}"#;
        let out = parse(&translate_request(body).unwrap());
        assert_eq!(out["tools"][0]["type"], "function");
        assert_eq!(out["tools"][0]["function"]["name"], "ls");
        assert_eq!(out["tools"][0]["function"]["parameters"]["type"], "object");
        assert_eq!(out["tool_choice"]["type"], "auto");
    }

    #[test]
    fn drops_tool_choice_when_no_tools() {
        let body = br#"{"model":"m","tool_choice":{"type":"auto"},"messages":[]}"#;
        let out = parse(&translate_request(body).unwrap());
        assert!(out.get("tool_choice").is_none());
    }

    #[test]
    fn splits_tool_result_message_and_remaps_id() {
        let body = br#"{"model":"m","messages":[{"role":"user","content":[
            {"type":"tool_result","tool_use_id":"toolu_abc","content":"42"},
            {"type":"text","text":"thanks"}
        ]}]}"#;
        let out = parse(&translate_request(body).unwrap());
        let msgs = out["messages"].as_array().unwrap();
        assert_eq!(msgs[0]["role"], "tool");
        assert_eq!(msgs[0]["tool_call_id"], "call_abc");
        assert_eq!(msgs[0]["content"], "42");
        assert_eq!(msgs[1]["role"], "user");
        assert_eq!(msgs[1]["content"], "thanks");
    }

    #[test]
    fn handles_double_prefix_corruption_in_tool_result() {
        let body = br#"{"model":"m","messages":[{"role":"user","content":[
            {"type":"tool_result","tool_use_id":"toolu_toolu_abc","content":"x"}
        ]}]}"#;
        let out = parse(&translate_request(body).unwrap());
        assert_eq!(out["messages"][0]["tool_call_id"], "call_abc");
    }

    #[test]
    fn converts_assistant_tool_use_message() {
        let body = br#"{"model":"m","messages":[{"role":"assistant","content":[
            {"type":"text","text":"let me check"},
            {"type":"tool_use","id":"toolu_1","name":"ls","input":{"path":"/"}}
        ]}]}"#;
        let out = parse(&translate_request(body).unwrap());
        let msg = &out["messages"][0];
        assert_eq!(msg["role"], "assistant");
        assert_eq!(msg["content"], "let me check");
        assert_eq!(msg["tool_calls"][0]["id"], "call_1");
        assert_eq!(msg["tool_calls"][0]["function"]["name"], "ls");
        let args: Value = serde_json::from_str(msg["tool_calls"][0]["function"]["arguments"].as_str().unwrap()).unwrap();
        assert_eq!(args["path"], "/");
    }
}
