//! Per-provider backend configuration: where to send requests and with what
//! credential, read from a `[providers.<name>]` TOML table.

use serde::Deserialize;

/// One configured provider backend.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    /// Base URL for this provider's API (e.g. `"https://api.openai.com/v1"`).
    pub base_url: String,

    /// Credential for this provider. Empty/absent falls back to the
    /// process-wide `CCO_API_KEY` at dispatch time (see `crate::dispatch`).
    #[serde(default)]
    pub credential: String,

    /// Models used by the router's policy slots when none is explicit.
    #[serde(default)]
    pub default_models: Vec<String>,

    /// If non-empty, only these models may be routed to this provider.
    #[serde(default)]
    pub model_whitelist: Vec<String>,
}

impl ProviderConfig {
    /// Whether `model` is allowed on this provider. An empty whitelist
    /// means "no restriction".
    pub fn allows_model(&self, model: &str) -> bool {
        self.model_whitelist.is_empty() || self.model_whitelist.iter().any(|m| m == model)
    }
}
