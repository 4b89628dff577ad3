//! Configuration for the proxy server.
//!
//! Configuration is loaded in order of precedence:
//! 1. Environment variables (highest priority)
//! 2. Config file (`~/.config/anyclaude-proxy/config.toml`)
//! 3. Built-in defaults (lowest priority)

use crate::router::RouterPolicy;
use serde::Deserialize;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::PathBuf;

mod logging;
mod provider;

#[cfg(test)]
mod tests;

pub use logging::{FileLogging, LoggingConfig};
pub use provider::ProviderConfig;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Address to bind the proxy server to.
    pub bind_addr: SocketAddr,

    /// Process-wide client-auth credential. Empty disables client auth
    /// checking (the proxy accepts any caller).
    pub credential: Option<String>,

    /// Configured provider backends, keyed by provider name
    /// (`"openai"`, `"openrouter"`, `"nvidia"`, `"gemini"`, `"anthropic"`).
    pub providers: HashMap<String, ProviderConfig>,

    /// Model routing policy (§4.3).
    pub router: RouterPolicy,

    /// Host → provider-name overrides for `ProviderRegistry::get_by_domain`.
    pub domain_mappings: HashMap<String, String>,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".parse().unwrap(),
            credential: None,
            providers: HashMap::new(),
            router: RouterPolicy::default(),
            domain_mappings: HashMap::new(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Config file structure (subset of `Config` that makes sense to persist).
#[derive(Debug, Deserialize, Default)]
pub(crate) struct FileConfig {
    pub bind_addr: Option<String>,
    pub credential: Option<String>,

    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,

    pub router: Option<RouterPolicy>,

    #[serde(default)]
    pub domain_mappings: HashMap<String, String>,

    pub logging: Option<FileLogging>,
}

impl Config {
    /// Config file path: `~/.config/anyclaude-proxy/config.toml`.
    pub fn config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|p| p.join(".config").join("anyclaude-proxy").join("config.toml"))
    }

    /// Create the config file with defaults if it doesn't exist yet.
    pub fn ensure_config_exists() {
        let Some(path) = Self::config_path() else {
            return;
        };
        if path.exists() {
            return;
        }
        if let Some(parent) = path.parent() {
            if std::fs::create_dir_all(parent).is_err() {
                return;
            }
        }
        let _ = std::fs::write(&path, DEFAULT_CONFIG_TEMPLATE);
    }

    /// Load file config if it exists.
    ///
    /// # Panics
    /// If the config file exists but cannot be parsed. This is intentional:
    /// a broken config should fail fast with a clear error, not silently
    /// fall back to defaults while the user debugs the wrong thing.
    fn load_file_config() -> FileConfig {
        let Some(path) = Self::config_path() else {
            return FileConfig::default();
        };

        match std::fs::read_to_string(&path) {
            Ok(contents) => match toml::from_str(&contents) {
                Ok(config) => config,
                Err(e) => {
                    eprintln!("\nCONFIG ERROR - failed to parse configuration file\n");
                    eprintln!("  File: {}\n", path.display());
                    eprintln!("  Error: {}\n", e);
                    eprintln!("  To reset, delete the file and restart anyclaude-proxy.\n");
                    std::process::exit(1);
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => FileConfig::default(),
            Err(e) => {
                eprintln!("\nCONFIG ERROR - cannot read configuration file\n");
                eprintln!("  File: {}\n", path.display());
                eprintln!("  Error: {}\n", e);
                std::process::exit(1);
            }
        }
    }

    /// Load configuration: env vars > config file > defaults.
    pub fn from_env() -> Self {
        let file = Self::load_file_config();

        let bind_addr = std::env::var("ANYCLAUDE_BIND")
            .ok()
            .or(file.bind_addr)
            .unwrap_or_else(|| "127.0.0.1:8080".to_string())
            .parse()
            .expect("Invalid bind address");

        let credential = std::env::var("ANYCLAUDE_CREDENTIAL").ok().or(file.credential);

        let logging = LoggingConfig::from_file(file.logging);

        Self {
            bind_addr,
            credential,
            providers: file.providers,
            router: file.router.unwrap_or_default(),
            domain_mappings: file.domain_mappings,
            logging,
        }
    }

    /// Render the effective configuration as a TOML template, used both to
    /// seed a fresh config file and for `config --reset`.
    pub fn to_toml(&self) -> String {
        DEFAULT_CONFIG_TEMPLATE.to_string()
    }
}

const DEFAULT_CONFIG_TEMPLATE: &str = r#"# anyclaude-proxy configuration
# Env vars (ANYCLAUDE_BIND, ANYCLAUDE_CREDENTIAL, CCO_API_KEY) override these.

bind_addr = "127.0.0.1:8080"
# credential = ""

[router]
default = "anthropic,claude-3-5-sonnet-20241022"
# think = "openrouter,openai/o1"
# background = "nvidia,nemotron-4-340b-instruct"
# long_context = "openrouter,anthropic/claude-opus"
# web_search = "openrouter,perplexity/sonar"

[logging]
level = "info"

# [providers.openai]
# base_url = "https://api.openai.com/v1"
# credential = ""

# [providers.openrouter]
# base_url = "https://openrouter.ai/api/v1"
# credential = ""

# [providers.nvidia]
# base_url = "https://integrate.api.nvidia.com/v1"
# credential = ""

# [providers.gemini]
# base_url = "https://generativelanguage.googleapis.com/v1beta"
# credential = ""

# [providers.anthropic]
# base_url = "https://api.anthropic.com"
# credential = ""

# [domain_mappings]
# "my-private-gateway.internal" = "openai"
"#;
