//! Anthropic request body -> Gemini `generateContent` request body (C4).

use crate::translate::openai::request::transform_tools;
use anyhow::{bail, Context, Result};
use serde_json::{json, Value};

/// Convert an Anthropic Messages request body into a Gemini
/// `generateContent`/`streamGenerateContent` request body.
pub fn translate_request(body: &[u8]) -> Result<Vec<u8>> {
    let value: Value = serde_json::from_slice(body).context("parsing Anthropic request body")?;
    let obj = value
        .as_object()
        .context("Anthropic request body must be a JSON object")?;

    let mut contents = Vec::new();
    if let Some(system) = obj.get("system").and_then(|s| s.as_str()) {
        contents.push(json!({
            "role": "user",
            "parts": [{"text": format!("System: {system}")}],
        }));
    }
    if let Some(messages) = obj.get("messages").and_then(|m| m.as_array()) {
        for message in messages {
            contents.push(convert_message(message)?);
        }
    }

    let mut out = json!({"contents": contents});

    let mut generation_config = serde_json::Map::new();
    if let Some(v) = obj.get("max_tokens") {
        generation_config.insert("maxOutputTokens".to_string(), v.clone());
    }
    if let Some(v) = obj.get("temperature") {
        generation_config.insert("temperature".to_string(), v.clone());
    }
    if let Some(v) = obj.get("top_p") {
        generation_config.insert("topP".to_string(), v.clone());
    }
    if let Some(v) = obj.get("top_k") {
        generation_config.insert("topK".to_string(), v.clone());
    }
    if !generation_config.is_empty() {
        out["generationConfig"] = Value::Object(generation_config);
    }

    if let Some(tools) = obj.get("tools") {
        let mut openai_shaped = tools.clone();
        transform_tools(&mut openai_shaped);
        if let Some(items) = openai_shaped.as_array() {
            if !items.is_empty() {
                let declarations: Vec<Value> = items.iter().map(to_function_declaration).collect();
                out["tools"] = json!([{"functionDeclarations": declarations}]);
            }
        }
    }

    out["safetySettings"] = default_safety_settings();

    Ok(serde_json::to_vec(&out)?)
}

/// Map Anthropic roles onto Gemini's `user`/`model` roles.
fn convert_message(message: &Value) -> Result<Value> {
    let role = message.get("role").and_then(|r| r.as_str()).unwrap_or("user");
    let gemini_role = match role {
        "user" => "user",
        "assistant" => "model",
        other => bail!("unsupported role for Gemini: {other}"),
    };

    let parts = match message.get("content") {
        Some(Value::String(text)) => vec![json!({"text": text})],
        Some(Value::Array(blocks)) => blocks
            .iter()
            .map(convert_block)
            .collect::<Result<Vec<_>>>()?,
        _ => Vec::new(),
    };

    Ok(json!({"role": gemini_role, "parts": parts}))
}

fn convert_block(block: &Value) -> Result<Value> {
    match block.get("type").and_then(|t| t.as_str()) {
        Some("text") => Ok(json!({"text": block.get("text").cloned().unwrap_or(Value::Null)})),
        Some("tool_use") => Ok(json!({
            "functionCall": {
                "name": block.get("name").cloned().unwrap_or(Value::Null),
                "args": block.get("input").cloned().unwrap_or_else(|| json!({})),
            }
        })),
        Some("tool_result") => Ok(json!({
            "functionResponse": {
                "name": "tool_result",
                "response": tool_result_response(block.get("content").unwrap_or(&Value::Null)),
            }
        })),
        Some("image") => {
            let mime_type = block.pointer("/source/media_type").cloned().unwrap_or(Value::Null);
            let data = block.pointer("/source/data").cloned().unwrap_or(Value::Null);
            Ok(json!({"inlineData": {"mimeType": mime_type, "data": data}}))
        }
        other => bail!("unsupported content block type for Gemini: {other:?}"),
    }
}

fn tool_result_response(content: &Value) -> Value {
    match content {
        Value::String(s) => json!({"result": s}),
        Value::Array(blocks) => json!({
            "result": blocks
                .iter()
                .filter_map(|b| b.get("text").and_then(|t| t.as_str()))
                .collect::<Vec<_>>()
                .join("")
        }),
        other => other.clone(),
    }
}

fn to_function_declaration(tool: &Value) -> Value {
    let function = tool.get("function").cloned().unwrap_or_else(|| tool.clone());
    let name = function.get("name").cloned().unwrap_or(Value::Null);
    let description = function.get("description").cloned().unwrap_or(Value::Null);
    let mut parameters = function.get("parameters").cloned().unwrap_or_else(|| json!({}));
    uppercase_schema_types(&mut parameters);
    json!({"name": name, "description": description, "parameters": parameters})
}

/// Gemini's function-declaration schema uses upper-case JSON-Schema type
/// names (`OBJECT`, `STRING`, ...) where Anthropic/OpenAI use lower-case.
fn uppercase_schema_types(value: &mut Value) {
    match value {
        Value::Object(map) => {
            if let Some(Value::String(t)) = map.get("type").cloned() {
                map.insert("type".to_string(), Value::String(t.to_uppercase()));
            }
            for v in map.values_mut() {
                uppercase_schema_types(v);
            }
        }
        Value::Array(items) => {
            for v in items.iter_mut() {
                uppercase_schema_types(v);
            }
        }
        _ => {}
    }
}

fn default_safety_settings() -> Value {
    json!([
        {"category": "HARM_CATEGORY_HARASSMENT", "threshold": "BLOCK_MEDIUM_AND_ABOVE"},
        {"category": "HARM_CATEGORY_HATE_SPEECH", "threshold": "BLOCK_MEDIUM_AND_ABOVE"},
        {"category": "HARM_CATEGORY_SEXUALLY_EXPLICIT", "threshold": "BLOCK_MEDIUM_AND_ABOVE"},
        {"category": "HARM_CATEGORY_DANGEROUS_CONTENT", "threshold": "BLOCK_MEDIUM_AND_ABOVE"},
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(bytes: &[u8]) -> Value {
        serde_json::from_slice(bytes).unwrap()
    }

    #[test]
    fn maps_roles_and_system_prefix() {
        let body = br#"{"model":"m","system":"be nice","messages":[{"role":"user","content":"hi"},{"role":"assistant","content":"hello"}]}"#;
        let out = parse(&translate_request(body).unwrap());
        assert_eq!(out["contents"][0]["role"], "user");
        assert_eq!(out["contents"][0]["parts"][0]["text"], "System: be nice");
        assert_eq!(out["contents"][1]["role"], "user");
        assert_eq!(out["contents"][2]["role"], "model");
    }

    #[test]
    fn rejects_unsupported_role() {
        let body = br#"{"model":"m","messages":[{"role":"system","content":"hi"}]}"#;
        assert!(translate_request(body).is_err());
    }

    #[test]
    fn maps_generation_params() {
        let body = br#"{"model":"m","max_tokens":100,"temperature":0.5,"top_p":0.9,"top_k":40,"messages":[]}"#;
        let out = parse(&translate_request(body).unwrap());
        assert_eq!(out["generationConfig"]["maxOutputTokens"], 100);
        assert_eq!(out["generationConfig"]["topP"], 0.9);
        assert_eq!(out["generationConfig"]["topK"], 40);
    }

    #[test]
    fn maps_tool_use_and_tool_result_blocks() {
        let body = br#"{"model":"m","messages":[
            {"role":"assistant","content":[{"type":"tool_use","id":"toolu_1","name":"ls","input":{"path":"/"}}]},
            {"role":"user","content":[{"type":"tool_result","tool_use_id":"toolu_1","content":"file1\nfile2"}]}
        ]}"#;
        let out = parse(&translate_request(body).unwrap());
        assert_eq!(out["contents"][0]["parts"][0]["functionCall"]["name"], "ls");
        assert_eq!(out["contents"][0]["parts"][0]["functionCall"]["args"]["path"], "/");
        assert_eq!(out["contents"][1]["parts"][0]["functionResponse"]["name"], "tool_result");
        assert_eq!(out["contents"][1]["parts"][0]["functionResponse"]["response"]["result"], "file1\nfile2");
    }

    #[test]
    fn transforms_tools_into_function_declarations_with_uppercase_types() {
        let body = br#"{"model":"m","tools":[{"name":"ls","description":"list","input_schema":{"type":"object","properties":{"path":{"type":"string"}}}}],"messages":[]}"#;
        let out = parse(&translate_request(body).unwrap());
        let decl = &out["tools"][0]["functionDeclarations"][0];
        assert_eq!(decl["name"], "ls");
        assert_eq!(decl["parameters"]["type"], "OBJECT");
        assert_eq!(decl["parameters"]["properties"]["path"]["type"], "STRING");
    }

    #[test]
    fn always_emits_default_safety_settings() {
        let body = br#"{"model":"m","messages":[]}"#;
        let out = parse(&translate_request(body).unwrap());
        assert_eq!(out["safetySettings"].as_array().unwrap().len(), 4);
    }
}
