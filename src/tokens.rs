//! Token estimation for routing thresholds.
//!
//! Uses a `cl100k_base`-equivalent BPE vocabulary (via `tiktoken-rs`) to
//! estimate the number of input tokens in a raw request body. The estimate
//! feeds the model router's long-context rule (§4.3) and request logging;
//! it is not exposed to clients and does not need to match a provider's
//! own accounting exactly.

use std::sync::OnceLock;
use tiktoken_rs::CoreBPE;

fn encoder() -> &'static CoreBPE {
    static ENCODER: OnceLock<CoreBPE> = OnceLock::new();
    ENCODER.get_or_init(|| tiktoken_rs::cl100k_base().expect("cl100k_base vocabulary is static"))
}

/// Estimate the number of tokens in a raw request body.
///
/// Returns 0 if the body is not valid UTF-8 or the encoder otherwise fails.
pub fn estimate_tokens(body: &[u8]) -> u64 {
    let Ok(text) = std::str::from_utf8(body) else {
        return 0;
    };
    encoder().encode_with_special_tokens(text).len() as u64
}
