//! Model router (C3): picks the effective `(provider, model)` selector for a
//! request body given a token estimate and the configured routing policy.

use serde::Deserialize;
use serde_json::Value;

/// Routing policy: five optional `"provider_name,model_id"` slots.
///
/// `default` should always be set by configuration; the others are
/// opt-in overrides.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RouterPolicy {
    pub default: String,
    pub think: Option<String>,
    pub background: Option<String>,
    pub long_context: Option<String>,
    pub web_search: Option<String>,
}

const LONG_CONTEXT_THRESHOLD: u64 = 60_000;
const HAIKU_PREFIX: &str = "claude-3-5-haiku";

/// Outcome of routing: the selector string, its optional provider component,
/// and the model component that should replace the client's `model` field in
/// the outbound body.
pub struct Routed {
    pub selector: String,
    pub provider: Option<String>,
    pub model: String,
}

/// Split a selector `"provider,model"` into its two halves. If there is no
/// comma, the whole string is the model and there is no provider component.
fn split_selector(selector: &str) -> (Option<&str>, &str) {
    match selector.split_once(',') {
        Some((provider, model)) => (Some(provider), model),
        None => (None, selector),
    }
}

/// Apply the ordered selection rules in §4.3 (first match wins).
///
/// Rules 4 and 5 unconditionally prefer `policy.think`/`policy.web_search`
/// over the client's own model whenever those slots are configured at all,
/// which is almost certainly not the intended behavior (a content-sensitive
/// trigger would make more sense) — but it is the observed behavior and is
/// preserved here deliberately. See DESIGN.md open question (a).
pub fn route(body: &[u8], token_estimate: u64, policy: &RouterPolicy) -> Routed {
    let client_model: Option<String> = serde_json::from_slice::<Value>(body)
        .ok()
        .and_then(|v| v.get("model").and_then(|m| m.as_str()).map(String::from));

    let selector = match client_model.as_deref() {
        // Rule 1: explicit "provider,model" directive, used verbatim.
        Some(model) if model.contains(',') => model.to_string(),
        // Rule 2.
        _ if token_estimate > LONG_CONTEXT_THRESHOLD && policy.long_context.is_some() => {
            policy.long_context.clone().unwrap()
        }
        // Rule 3.
        Some(model) if model.starts_with(HAIKU_PREFIX) && policy.background.is_some() => {
            policy.background.clone().unwrap()
        }
        // Rule 4 (preserved bug: unconditional once `think` is set).
        _ if policy.think.is_some() => policy.think.clone().unwrap(),
        // Rule 5 (preserved bug: unconditional once `web_search` is set).
        _ if policy.web_search.is_some() => policy.web_search.clone().unwrap(),
        // Rule 6: client's own model, no provider prefix.
        Some(model) => model.to_string(),
        // Rule 7.
        None => policy.default.clone(),
    };

    let (provider, model) = split_selector(&selector);
    let provider = provider.map(str::to_string);
    let model = model.to_string();
    Routed {
        selector,
        provider,
        model,
    }
}

/// Rewrite the body's `model` field to `routed.model`, leaving everything
/// else untouched. Returns the original bytes unchanged if the body isn't a
/// JSON object (the proxy will surface the resulting upstream error itself).
pub fn rewrite_model(body: &[u8], routed: &Routed) -> Vec<u8> {
    let Ok(mut value) = serde_json::from_slice::<Value>(body) else {
        return body.to_vec();
    };
    if let Some(obj) = value.as_object_mut() {
        obj.insert("model".to_string(), Value::String(routed.model.clone()));
    }
    serde_json::to_vec(&value).unwrap_or_else(|_| body.to_vec())
}
