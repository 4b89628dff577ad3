//! Anthropic passthrough: requests and responses are already Anthropic-shaped,
//! so translation is the identity function.
//!
//! Streaming is a special case: Anthropic's own upstream SSE is already
//! well-formed Anthropic events, not per-line JSON deltas, so the dispatcher
//! bypasses the stream translator entirely for this provider and copies raw
//! upstream bytes straight to the client (see `crate::dispatch`). The trait
//! methods below exist for interface completeness and are identity functions.

use super::Provider;
use crate::translate::StreamState;

pub struct AnthropicProvider {
    domains: Vec<&'static str>,
}

impl AnthropicProvider {
    pub fn new() -> Self {
        Self { domains: vec!["api.anthropic.com"] }
    }
}

impl Provider for AnthropicProvider {
    fn name(&self) -> &str {
        "anthropic"
    }

    fn domains(&self) -> &[&str] {
        &self.domains
    }

    fn default_base_url(&self) -> &str {
        "https://api.anthropic.com/v1/messages"
    }

    fn auth_header(&self, credential: &str) -> (&'static str, String) {
        ("Authorization", format!("Bearer {credential}"))
    }

    fn build_endpoint(&self, base_url: &str, _model: &str, _streaming: bool) -> String {
        base_url.to_string()
    }

    fn translate_request(&self, body: &[u8]) -> anyhow::Result<Vec<u8>> {
        Ok(body.to_vec())
    }

    fn translate_response(&self, body: &[u8]) -> anyhow::Result<Vec<u8>> {
        Ok(body.to_vec())
    }

    fn translate_stream_chunk(&self, chunk_json: &[u8], _state: &mut StreamState) -> Vec<u8> {
        chunk_json.to_vec()
    }

    fn translate_stream_done(&self) -> Vec<u8> {
        b"data: [DONE]\n\n".to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_and_response_are_unchanged() {
        let p = AnthropicProvider::new();
        let body = br#"{"model":"claude-3-5-sonnet","messages":[]}"#;
        assert_eq!(p.translate_request(body).unwrap(), body.to_vec());
        assert_eq!(p.translate_response(body).unwrap(), body.to_vec());
    }

    #[test]
    fn bearer_auth_header() {
        let p = AnthropicProvider::new();
        assert_eq!(p.auth_header("sk-ant-1"), ("Authorization", "Bearer sk-ant-1".to_string()));
    }

    #[test]
    fn default_base_url_points_at_messages_endpoint() {
        let p = AnthropicProvider::new();
        assert_eq!(p.default_base_url(), "https://api.anthropic.com/v1/messages");
    }
}
