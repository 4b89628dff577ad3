//! Logging configuration: just the `tracing`/`EnvFilter` knobs this crate
//! actually needs (no TUI buffer, no file rotation — see DESIGN.md).

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct FileLogging {
    pub level: Option<String>,
}

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string() }
    }
}

impl LoggingConfig {
    pub fn from_file(file: Option<FileLogging>) -> Self {
        let default = Self::default();
        match file {
            Some(f) => Self { level: f.level.unwrap_or(default.level) },
            None => default,
        }
    }
}
