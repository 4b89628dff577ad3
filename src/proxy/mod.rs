//! Proxy entry point (C8): the `/v1/messages` and `/health` HTTP surface,
//! wiring the token counter, router, provider registry, and dispatcher
//! together (C2 → C3 → C4 → C7 → C5/C6 → client).

use crate::config::Config;
use crate::dispatch::{self, Dispatched};
use crate::error::UpstreamStatusResponse;
use crate::provider::ProviderRegistry;
use crate::router;
use crate::tokens;
use anyhow::{Context, Result};
use axum::{
    body::{to_bytes, Body},
    extract::State,
    http::{Request, Response, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;

/// Shared, read-only state for every request (§5 concurrency model: no
/// mutable state shared between requests in the core).
#[derive(Clone)]
pub struct ProxyState {
    client: reqwest::Client,
    registry: Arc<ProviderRegistry>,
    config: Arc<Config>,
}

/// Build the router and serve it on `config.bind_addr` until `shutdown`
/// resolves.
pub async fn start_proxy(config: Config, shutdown: impl std::future::Future<Output = ()> + Send + 'static) -> Result<()> {
    let bind_addr = config.bind_addr;

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(300))
        .pool_max_idle_per_host(10)
        .build()
        .context("Failed to create HTTP client")?;

    let state = ProxyState {
        client,
        registry: Arc::new(ProviderRegistry::with_defaults()),
        config: Arc::new(config),
    };

    let app = Router::new()
        .route("/v1/messages", post(messages_handler))
        .route("/health", get(health_handler))
        .with_state(state);

    let listener = TcpListener::bind(bind_addr).await.context("Failed to bind to address")?;
    tracing::info!("Proxy listening on {}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .context("Server error")?;

    tracing::info!("Proxy server shut down gracefully");
    Ok(())
}

async fn health_handler() -> &'static str {
    "OK"
}

async fn messages_handler(
    State(state): State<ProxyState>,
    req: Request<Body>,
) -> Result<Response<Body>, ProxyHandlerError> {
    let client_headers = req.headers().clone();
    let body = to_bytes(req.into_body(), usize::MAX)
        .await
        .map_err(|e| ProxyHandlerError::BadRequest(e.to_string()))?;

    let token_estimate = tokens::estimate_tokens(&body);
    let routed = router::route(&body, token_estimate, &state.config.router);

    let provider_name = routed.provider.clone().unwrap_or_else(|| "anthropic".to_string());
    tracing::info!(provider = %provider_name, model = %routed.model, tokens = token_estimate, "routed request");

    let provider = state
        .registry
        .get_by_name(&provider_name)
        .map_err(|e| ProxyHandlerError::UnknownProvider(e.to_string()))?;

    let provider_config = state.config.providers.get(&provider_name);
    let base_url = provider_config.map(|p| p.base_url.as_str()).unwrap_or_else(|| provider.default_base_url());
    let credential = provider_config.map(|p| p.credential.as_str()).unwrap_or("");

    let rewritten = router::rewrite_model(&body, &routed);

    let translated_body = match provider.translate_request(&rewritten) {
        Ok(translated) => translated,
        Err(e) => {
            tracing::warn!(error = %e, "request translation failed, forwarding original body");
            rewritten
        }
    };

    let streaming_requested = serde_json::from_slice::<serde_json::Value>(&body)
        .ok()
        .and_then(|v| v.get("stream").and_then(|s| s.as_bool()))
        .unwrap_or(false);

    let dispatched = dispatch::dispatch(
        &state.client,
        provider.clone(),
        base_url,
        &routed.model,
        credential,
        &client_headers,
        translated_body,
        streaming_requested,
    )
    .await
    .map_err(ProxyHandlerError::Dispatch)?;

    match dispatched {
        Dispatched::UpstreamError { status, headers, body } => {
            tracing::warn!(status = %status, "upstream returned non-2xx, forwarding verbatim");
            Ok(UpstreamStatusResponse { status, headers, body }.into_response())
        }
        Dispatched::Buffered { status, body } => {
            let translated = match provider.translate_response(&body) {
                Ok(translated) => translated,
                Err(e) => {
                    tracing::warn!(error = %e, "response translation failed, forwarding original body");
                    body.to_vec()
                }
            };
            Ok(Response::builder()
                .status(status)
                .header("content-type", "application/json")
                .body(Body::from(translated))
                .unwrap())
        }
        Dispatched::Streaming { body } => Ok(Response::builder()
            .status(StatusCode::OK)
            .header("content-type", "text/event-stream")
            .header("cache-control", "no-cache")
            .header("connection", "keep-alive")
            .body(body)
            .unwrap()),
    }
}

/// Errors surfaced directly to the client as an HTTP response (§7).
enum ProxyHandlerError {
    BadRequest(String),
    UnknownProvider(String),
    Dispatch(crate::error::ProxyError),
}

impl IntoResponse for ProxyHandlerError {
    fn into_response(self) -> Response<Body> {
        match self {
            ProxyHandlerError::BadRequest(msg) => {
                tracing::error!(error = %msg, "bad client request");
                (StatusCode::BAD_REQUEST, msg).into_response()
            }
            ProxyHandlerError::UnknownProvider(msg) => {
                tracing::error!(error = %msg, "unknown provider");
                (StatusCode::BAD_REQUEST, msg).into_response()
            }
            ProxyHandlerError::Dispatch(e) => e.into_response(),
        }
    }
}
