// anyclaude-proxy - a local reverse proxy that accepts Anthropic Messages API
// requests and dispatches them to OpenAI-, OpenRouter-, NVIDIA-, Gemini-, or
// Anthropic-shaped back-ends, translating request/response/stream bodies as
// needed.
//
// Architecture:
// - cli: `config --show/--reset/--edit/--path` subcommands
// - config: layered configuration (env > TOML file > defaults)
// - router: model-selection policy (C3)
// - translate: per-provider request/response/stream body converters (C4-C6)
// - provider: provider registry and trait (C1)
// - dispatch: upstream HTTP call + incremental SSE re-translation (C7)
// - proxy: the `/v1/messages` and `/health` HTTP surface (C8)

mod cli;
mod config;
mod dispatch;
mod error;
mod provider;
mod proxy;
mod router;
mod tokens;
mod translate;

use anyhow::Result;
use config::Config;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    if cli::handle_cli() {
        return Ok(());
    }

    Config::ensure_config_exists();
    let config = Config::from_env();

    let default_filter = format!("anyclaude_proxy={},tower_http=debug,axum=debug", config.logging.level);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into());

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("anyclaude-proxy {} starting on {}", config::VERSION, config.bind_addr);

    proxy::start_proxy(config, async {
        let _ = tokio::signal::ctrl_c().await;
    })
    .await?;

    Ok(())
}
