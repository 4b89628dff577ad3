//! Provider Registry (C1): domain- and name-based lookup over the five
//! provider variants, plus the `Provider` trait each of them implements.
//!
//! Per §4.1's concurrency redesign, providers hold no mutable credential
//! state: every operation that needs a credential takes it as a parameter,
//! so one `ProviderRegistry` instance can be shared across concurrent
//! requests behind an `Arc` without locking.

pub mod anthropic;
pub mod gemini;
pub mod openai_family;

use crate::error::ProxyError;
use crate::translate::StreamState;
use axum::http::HeaderMap;

/// One back-end's schema and transport knowledge. Implementations own no
/// mutable state; `credential` is threaded through per call.
pub trait Provider: Send + Sync {
    /// Unique, stable name used for registry lookup and router selectors
    /// (the part before the comma in a `"provider,model"` directive).
    fn name(&self) -> &str;

    /// Host substrings recognized for `get_by_domain` lookup.
    fn domains(&self) -> &[&str];

    /// Base URL used when no `[providers.<name>]` config entry is present.
    fn default_base_url(&self) -> &str;

    /// Build the `(header_name, header_value)` pair carrying `credential`.
    fn auth_header(&self, credential: &str) -> (&'static str, String);

    /// Build the full upstream URL for `base_url`/`model`, honoring
    /// providers (Gemini) whose model is embedded in the path.
    fn build_endpoint(&self, base_url: &str, model: &str, streaming: bool) -> String;

    /// Inspect the upstream response headers to decide whether the body is
    /// an SSE stream or a single buffered JSON document.
    fn detect_streaming(&self, headers: &HeaderMap) -> bool {
        headers
            .get(axum::http::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.starts_with("text/event-stream"))
            .unwrap_or(false)
    }

    fn translate_request(&self, body: &[u8]) -> anyhow::Result<Vec<u8>>;
    fn translate_response(&self, body: &[u8]) -> anyhow::Result<Vec<u8>>;

    fn new_stream_state(&self) -> StreamState {
        StreamState::new()
    }
    fn translate_stream_chunk(&self, chunk_json: &[u8], state: &mut StreamState) -> Vec<u8>;
    fn translate_stream_done(&self) -> Vec<u8>;
}

/// Immutable, shared collection of provider instances, built once at startup.
pub struct ProviderRegistry {
    providers: Vec<std::sync::Arc<dyn Provider>>,
}

impl ProviderRegistry {
    /// The five built-in provider variants, each with its default domain
    /// recognition table.
    pub fn with_defaults() -> Self {
        Self {
            providers: vec![
                std::sync::Arc::new(openai_family::OpenAiFamilyProvider::openai()),
                std::sync::Arc::new(openai_family::OpenAiFamilyProvider::openrouter()),
                std::sync::Arc::new(openai_family::OpenAiFamilyProvider::nvidia()),
                std::sync::Arc::new(gemini::GeminiProvider::new()),
                std::sync::Arc::new(anthropic::AnthropicProvider::new()),
            ],
        }
    }

    /// Returns a cheaply-cloned `Arc`, not a borrow, so callers (notably the
    /// streaming dispatch path) can hold a `'static` handle to the provider
    /// across an async generator without borrowing the registry.
    pub fn get_by_name(&self, name: &str) -> Result<std::sync::Arc<dyn Provider>, ProxyError> {
        self.providers
            .iter()
            .find(|p| p.name() == name)
            .cloned()
            .ok_or_else(|| ProxyError::UnknownProvider(name.to_string()))
    }

    /// Parse the host out of `base_url`, consult `domain_mappings` overrides
    /// first, then fall back to the built-in domain-substring table.
    pub fn get_by_domain(
        &self,
        base_url: &str,
        domain_mappings: &std::collections::HashMap<String, String>,
    ) -> Result<std::sync::Arc<dyn Provider>, ProxyError> {
        let host = url::Url::parse(base_url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .ok_or_else(|| ProxyError::UnknownProvider(base_url.to_string()))?;

        if let Some(name) = domain_mappings.get(&host) {
            return self.get_by_name(name);
        }

        self.providers
            .iter()
            .find(|p| p.domains().iter().any(|d| host.contains(d)))
            .cloned()
            .ok_or_else(|| ProxyError::UnknownProvider(host))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_by_name_finds_each_built_in_provider() {
        let registry = ProviderRegistry::with_defaults();
        for name in ["openai", "openrouter", "nvidia", "gemini", "anthropic"] {
            assert_eq!(registry.get_by_name(name).unwrap().name(), name);
        }
    }

    #[test]
    fn get_by_name_fails_for_unknown_provider() {
        let registry = ProviderRegistry::with_defaults();
        assert!(registry.get_by_name("bogus").is_err());
    }

    #[test]
    fn get_by_domain_matches_known_hosts() {
        let registry = ProviderRegistry::with_defaults();
        let no_mappings = std::collections::HashMap::new();
        assert_eq!(
            registry
                .get_by_domain("https://openrouter.ai/api/v1", &no_mappings)
                .unwrap()
                .name(),
            "openrouter"
        );
        assert_eq!(
            registry
                .get_by_domain("https://api.openai.com/v1", &no_mappings)
                .unwrap()
                .name(),
            "openai"
        );
        assert_eq!(
            registry
                .get_by_domain("https://generativelanguage.googleapis.com", &no_mappings)
                .unwrap()
                .name(),
            "gemini"
        );
        assert_eq!(
            registry
                .get_by_domain("https://integrate.api.nvidia.com/v1", &no_mappings)
                .unwrap()
                .name(),
            "nvidia"
        );
        assert_eq!(
            registry
                .get_by_domain("https://api.anthropic.com", &no_mappings)
                .unwrap()
                .name(),
            "anthropic"
        );
    }

    #[test]
    fn get_by_domain_fails_for_unrecognized_host() {
        let registry = ProviderRegistry::with_defaults();
        assert!(registry
            .get_by_domain("https://example.com", &std::collections::HashMap::new())
            .is_err());
    }

    #[test]
    fn get_by_domain_honors_domain_mappings_override() {
        let registry = ProviderRegistry::with_defaults();
        let mut mappings = std::collections::HashMap::new();
        mappings.insert("my-gateway.internal".to_string(), "openai".to_string());
        assert_eq!(
            registry
                .get_by_domain("https://my-gateway.internal/v1", &mappings)
                .unwrap()
                .name(),
            "openai"
        );
    }

    #[test]
    fn get_by_domain_override_beats_built_in_table() {
        let registry = ProviderRegistry::with_defaults();
        let mut mappings = std::collections::HashMap::new();
        mappings.insert("api.openai.com".to_string(), "nvidia".to_string());
        assert_eq!(
            registry
                .get_by_domain("https://api.openai.com/v1", &mappings)
                .unwrap()
                .name(),
            "nvidia"
        );
    }
}
