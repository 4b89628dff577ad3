//! Error taxonomy for the proxy's client-facing HTTP surface.
//!
//! Connectivity and status errors are surfaced to the client; translation
//! failures are recovered locally (the original body is forwarded and the
//! failure is only logged). See the error handling design for the full
//! propagation policy.

use axum::{
    body::Body,
    http::{Response, StatusCode},
    response::IntoResponse,
};
use bytes::Bytes;

/// Errors that can terminate a request before any upstream bytes are forwarded.
#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    #[error("bad request: {0}")]
    BadClientRequest(String),

    #[error("unknown provider: {0}")]
    UnknownProvider(String),

    #[error("upstream connection failed: {0}")]
    UpstreamConnect(String),
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response<Body> {
        let (status, message) = match &self {
            ProxyError::BadClientRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ProxyError::UnknownProvider(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ProxyError::UpstreamConnect(msg) => (StatusCode::BAD_GATEWAY, msg.clone()),
        };

        tracing::error!(status = %status, "{}", message);

        Response::builder()
            .status(status)
            .body(Body::from(message))
            .unwrap_or_else(|_| Response::new(Body::from("internal error building error response")))
    }
}

/// A non-2xx upstream response, forwarded to the client byte-for-byte.
///
/// This is not a `ProxyError` variant because it is never wrapped or
/// translated — the whole point is that the client sees exactly what
/// upstream sent.
pub struct UpstreamStatusResponse {
    pub status: StatusCode,
    pub headers: axum::http::HeaderMap,
    pub body: Bytes,
}

impl IntoResponse for UpstreamStatusResponse {
    fn into_response(self) -> Response<Body> {
        let mut builder = Response::builder().status(self.status);
        if let Some(headers) = builder.headers_mut() {
            *headers = self.headers;
        }
        builder
            .body(Body::from(self.body))
            .unwrap_or_else(|_| Response::new(Body::empty()))
    }
}
