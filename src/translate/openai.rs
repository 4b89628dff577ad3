//! Anthropic <-> OpenAI-family (OpenAI, OpenRouter, NVIDIA) translation.
//!
//! All three backends speak the OpenAI Chat Completions wire format, so one
//! set of translators serves all of them; only base URL, domain, and auth
//! differ per provider (see `crate::provider::openai`).

pub mod request;
pub mod response;
pub mod stream;

pub use request::translate_request;
pub use response::translate_response;
pub use stream::translate_stream_chunk;
