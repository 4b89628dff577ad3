//! OpenAI, OpenRouter, and NVIDIA all speak the OpenAI Chat Completions wire
//! format, so one struct serves all three, parameterized by name, domains,
//! and the default API path.

use super::Provider;
use crate::translate::{openai, StreamState};

pub struct OpenAiFamilyProvider {
    name: &'static str,
    domains: Vec<&'static str>,
    default_base_url: &'static str,
}

impl OpenAiFamilyProvider {
    pub fn openai() -> Self {
        Self {
            name: "openai",
            domains: vec!["api.openai.com"],
            default_base_url: "https://api.openai.com/v1/chat/completions",
        }
    }

    pub fn openrouter() -> Self {
        Self {
            name: "openrouter",
            domains: vec!["openrouter.ai"],
            default_base_url: "https://openrouter.ai/api/v1/chat/completions",
        }
    }

    pub fn nvidia() -> Self {
        Self {
            name: "nvidia",
            domains: vec!["integrate.api.nvidia.com"],
            default_base_url: "https://integrate.api.nvidia.com/v1/chat/completions",
        }
    }
}

impl Provider for OpenAiFamilyProvider {
    fn name(&self) -> &str {
        self.name
    }

    fn domains(&self) -> &[&str] {
        &self.domains
    }

    fn default_base_url(&self) -> &str {
        self.default_base_url
    }

    fn auth_header(&self, credential: &str) -> (&'static str, String) {
        ("Authorization", format!("Bearer {credential}"))
    }

    fn build_endpoint(&self, base_url: &str, _model: &str, _streaming: bool) -> String {
        base_url.to_string()
    }

    fn translate_request(&self, body: &[u8]) -> anyhow::Result<Vec<u8>> {
        openai::translate_request(body)
    }

    fn translate_response(&self, body: &[u8]) -> anyhow::Result<Vec<u8>> {
        openai::translate_response(body)
    }

    fn translate_stream_chunk(&self, chunk_json: &[u8], state: &mut StreamState) -> Vec<u8> {
        openai::translate_stream_chunk(chunk_json, state)
    }

    fn translate_stream_done(&self) -> Vec<u8> {
        openai::stream::translate_done()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bearer_auth_header() {
        let p = OpenAiFamilyProvider::openai();
        assert_eq!(p.auth_header("sk-1"), ("Authorization", "Bearer sk-1".to_string()));
    }

    #[test]
    fn endpoint_is_base_url_verbatim() {
        let p = OpenAiFamilyProvider::openrouter();
        assert_eq!(
            p.build_endpoint("https://openrouter.ai/api/v1/chat/completions", "any-model", true),
            "https://openrouter.ai/api/v1/chat/completions"
        );
    }
}
