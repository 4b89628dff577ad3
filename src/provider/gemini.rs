//! Google Gemini: `x-goog-api-key` auth and a URL-embedded model/method tail.

use super::Provider;
use crate::translate::{gemini, StreamState};

pub struct GeminiProvider {
    domains: Vec<&'static str>,
}

impl GeminiProvider {
    pub fn new() -> Self {
        Self { domains: vec!["generativelanguage.googleapis.com"] }
    }
}

impl Provider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    fn domains(&self) -> &[&str] {
        &self.domains
    }

    fn default_base_url(&self) -> &str {
        "https://generativelanguage.googleapis.com/v1beta"
    }

    fn auth_header(&self, credential: &str) -> (&'static str, String) {
        ("x-goog-api-key", credential.to_string())
    }

    /// `base_url` may already end in `/models/<model>:<method>` (replaced),
    /// `/models` (model appended), or neither (`/models/<model>:<method>`
    /// appended after a slash).
    fn build_endpoint(&self, base_url: &str, model: &str, streaming: bool) -> String {
        let method = if streaming { "streamGenerateContent" } else { "generateContent" };
        if let Some(idx) = base_url.find("/models/") {
            format!("{}/models/{model}:{method}", &base_url[..idx])
        } else if let Some(stripped) = base_url.strip_suffix("/models") {
            format!("{stripped}/models/{model}:{method}")
        } else {
            let trimmed = base_url.trim_end_matches('/');
            format!("{trimmed}/models/{model}:{method}")
        }
    }

    fn translate_request(&self, body: &[u8]) -> anyhow::Result<Vec<u8>> {
        gemini::translate_request(body)
    }

    fn translate_response(&self, body: &[u8]) -> anyhow::Result<Vec<u8>> {
        gemini::translate_response(body)
    }

    fn translate_stream_chunk(&self, chunk_json: &[u8], state: &mut StreamState) -> Vec<u8> {
        gemini::translate_stream_chunk(chunk_json, state)
    }

    fn translate_stream_done(&self) -> Vec<u8> {
        gemini::stream::translate_done()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn goog_api_key_auth_header() {
        let p = GeminiProvider::new();
        assert_eq!(p.auth_header("key123"), ("x-goog-api-key", "key123".to_string()));
    }

    #[test]
    fn appends_model_and_method_to_bare_base() {
        let p = GeminiProvider::new();
        assert_eq!(
            p.build_endpoint("https://generativelanguage.googleapis.com/v1beta", "gemini-2.0-flash", false),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:generateContent"
        );
    }

    #[test]
    fn appends_model_after_trailing_models_segment() {
        let p = GeminiProvider::new();
        assert_eq!(
            p.build_endpoint("https://generativelanguage.googleapis.com/v1beta/models", "gemini-2.0-flash", false),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:generateContent"
        );
    }

    #[test]
    fn replaces_existing_models_tail() {
        let p = GeminiProvider::new();
        assert_eq!(
            p.build_endpoint(
                "https://generativelanguage.googleapis.com/v1beta/models/old-model:generateContent",
                "gemini-2.0-flash",
                false
            ),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:generateContent"
        );
    }

    #[test]
    fn uses_stream_generate_content_when_streaming() {
        let p = GeminiProvider::new();
        assert_eq!(
            p.build_endpoint("https://generativelanguage.googleapis.com/v1beta", "gemini-2.0-flash", true),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:streamGenerateContent"
        );
    }
}
