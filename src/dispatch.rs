//! Upstream Dispatcher (C7): builds the outbound request, issues it, and
//! branches to the buffered or streaming response path.
//!
//! reqwest 0.12 and axum 0.7 share the same underlying `http` crate types,
//! so headers pass through without re-parsing; reqwest's `gzip`/`brotli`
//! features (see `Cargo.toml`) already decompress upstream bodies
//! transparently and drop `Content-Encoding` before we ever see it — this
//! dispatcher only needs to additionally strip `Content-Length`, which can
//! otherwise still describe the pre-decompression size.

use crate::error::ProxyError;
use crate::provider::Provider;
use crate::translate::StreamState;
use axum::body::Body;
use axum::http::{HeaderMap, StatusCode};
use bytes::{Bytes, BytesMut};
use futures::{Stream, StreamExt};
use std::pin::Pin;
use std::sync::Arc;

/// Process-wide credential fallback used when a provider's configured
/// credential is empty (§4.7).
pub const CCO_API_KEY_ENV: &str = "CCO_API_KEY";

/// Outcome of one upstream call, ready for the proxy entry point to turn
/// into an axum response.
pub enum Dispatched {
    /// Upstream responded non-2xx: forwarded byte-for-byte, untranslated.
    /// §7 invariant 6 — diagnostic detail from the provider must not be lost.
    UpstreamError {
        status: StatusCode,
        headers: HeaderMap,
        body: Bytes,
    },
    /// Upstream responded 2xx with a single buffered body.
    Buffered { status: StatusCode, body: Bytes },
    /// Upstream responded 2xx with an SSE stream, already translated
    /// incrementally (or, for the Anthropic provider, forwarded raw).
    Streaming { body: Body },
}

fn resolve_credential(configured: &str) -> String {
    if !configured.is_empty() {
        return configured.to_string();
    }
    std::env::var(CCO_API_KEY_ENV).unwrap_or_default()
}

const STRIPPED_REQUEST_HEADERS: &[&str] = &[
    "host",
    "connection",
    "content-length",
    "content-encoding",
    "transfer-encoding",
    "authorization",
    "x-api-key",
];

fn forwardable_request_headers(client_headers: &HeaderMap) -> HeaderMap {
    let mut out = HeaderMap::new();
    for (name, value) in client_headers.iter() {
        if STRIPPED_REQUEST_HEADERS.contains(&name.as_str()) {
            continue;
        }
        out.insert(name.clone(), value.clone());
    }
    out
}

const STRIPPED_RESPONSE_HEADERS: &[&str] =
    &["content-encoding", "content-length", "transfer-encoding", "connection"];

fn forwardable_response_headers(upstream_headers: &reqwest::header::HeaderMap) -> HeaderMap {
    let mut out = HeaderMap::new();
    for (name, value) in upstream_headers.iter() {
        if STRIPPED_RESPONSE_HEADERS.contains(&name.as_str()) {
            continue;
        }
        out.insert(name.clone(), value.clone());
    }
    out
}

/// Issue one upstream call for `provider`/`base_url`/`model` and classify the
/// response. `credential` is threaded in per call rather than stored on the
/// provider (§4.1's concurrency-safe redesign).
pub async fn dispatch(
    client: &reqwest::Client,
    provider: Arc<dyn Provider>,
    base_url: &str,
    model: &str,
    credential: &str,
    client_headers: &HeaderMap,
    translated_body: Vec<u8>,
    streaming_requested: bool,
) -> Result<Dispatched, ProxyError> {
    let url = provider.build_endpoint(base_url, model, streaming_requested);
    let (auth_name, auth_value) = provider.auth_header(&resolve_credential(credential));

    let request = client
        .post(&url)
        .headers(forwardable_request_headers(client_headers))
        .header(auth_name, auth_value)
        .body(translated_body);

    let response = request
        .send()
        .await
        .map_err(|e| ProxyError::UpstreamConnect(e.to_string()))?;

    let status = StatusCode::from_u16(response.status().as_u16()).unwrap_or(StatusCode::BAD_GATEWAY);
    let response_headers = forwardable_response_headers(response.headers());

    if !response.status().is_success() {
        let body = response
            .bytes()
            .await
            .map_err(|e| ProxyError::UpstreamConnect(e.to_string()))?;
        return Ok(Dispatched::UpstreamError { status, headers: response_headers, body });
    }

    if !provider.detect_streaming(&response_headers) {
        let body = response
            .bytes()
            .await
            .map_err(|e| ProxyError::UpstreamConnect(e.to_string()))?;
        return Ok(Dispatched::Buffered { status, body });
    }

    // Anthropic's own SSE is already Anthropic-shaped; forward raw bytes
    // rather than running it through a translator (see provider::anthropic).
    if provider.name() == "anthropic" {
        let upstream = response.bytes_stream().map(|r| r.map_err(std::io::Error::other));
        return Ok(Dispatched::Streaming { body: Body::from_stream(upstream) });
    }

    let translated = translate_sse_stream(provider, response.bytes_stream());
    Ok(Dispatched::Streaming { body: Body::from_stream(translated) })
}

fn find_double_newline(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == b"\n\n")
}

/// Pull the first `data:` line's payload out of one SSE block.
fn extract_data_payload(block: &[u8]) -> Option<&str> {
    let text = std::str::from_utf8(block).ok()?;
    text.lines()
        .find_map(|line| line.strip_prefix("data:"))
        .map(str::trim)
}

fn process_block(block: &[u8], provider: &dyn Provider, state: &mut StreamState) -> Vec<u8> {
    match extract_data_payload(block) {
        None => Vec::new(),
        Some("") => Vec::new(),
        Some("[DONE]") => provider.translate_stream_done(),
        Some(payload) => provider.translate_stream_chunk(payload.as_bytes(), state),
    }
}

/// Re-chunk an upstream byte stream into complete SSE blocks (split on blank
/// lines) and run each through the provider's stream translator, emitting
/// Anthropic-shaped SSE bytes as they become available.
fn translate_sse_stream(
    provider: Arc<dyn Provider>,
    upstream: impl Stream<Item = reqwest::Result<Bytes>> + Send + 'static,
) -> impl Stream<Item = std::io::Result<Bytes>> {
    struct State {
        upstream: Pin<Box<dyn Stream<Item = reqwest::Result<Bytes>> + Send>>,
        buffer: BytesMut,
        stream_state: StreamState,
        ended: bool,
    }

    let initial = State {
        upstream: Box::pin(upstream),
        buffer: BytesMut::new(),
        stream_state: provider.new_stream_state(),
        ended: false,
    };

    futures::stream::unfold((initial, provider), move |(mut st, provider)| async move {
        loop {
            if let Some(pos) = find_double_newline(&st.buffer) {
                let block = st.buffer.split_to(pos + 2);
                let out = process_block(&block, provider.as_ref(), &mut st.stream_state);
                if out.is_empty() {
                    continue;
                }
                return Some((Ok(Bytes::from(out)), (st, provider)));
            }

            if st.ended {
                if !st.buffer.is_empty() {
                    let remaining = st.buffer.split();
                    let out = process_block(&remaining, provider.as_ref(), &mut st.stream_state);
                    if !out.is_empty() {
                        return Some((Ok(Bytes::from(out)), (st, provider)));
                    }
                }
                return None;
            }

            match st.upstream.next().await {
                Some(Ok(chunk)) => st.buffer.extend_from_slice(&chunk),
                Some(Err(e)) => return Some((Err(std::io::Error::other(e)), (st, provider))),
                None => st.ended = true,
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_data_payload_ignoring_event_line() {
        let block = b"event: message\ndata: {\"a\":1}\n\n";
        assert_eq!(extract_data_payload(block), Some("{\"a\":1}"));
    }

    #[test]
    fn recognizes_done_sentinel() {
        let block = b"data: [DONE]\n\n";
        assert_eq!(extract_data_payload(block), Some("[DONE]"));
    }

    #[test]
    fn double_newline_boundary_is_found() {
        let buf = b"data: {}\n\ndata: {}\n\n";
        assert_eq!(find_double_newline(buf), Some(8));
    }

    #[test]
    fn credential_falls_back_to_process_wide_env_when_empty() {
        std::env::set_var(CCO_API_KEY_ENV, "fallback-key");
        assert_eq!(resolve_credential(""), "fallback-key");
        assert_eq!(resolve_credential("explicit"), "explicit");
        std::env::remove_var(CCO_API_KEY_ENV);
    }
}
