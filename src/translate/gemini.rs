//! Anthropic <-> Google Gemini translation.
//!
//! Unlike the OpenAI family, Gemini has its own `contents`/`parts` request
//! shape, its own `candidates`/`finishReason` response shape, and embeds the
//! model in the request URL rather than the body (see `crate::provider::gemini`).

pub mod request;
pub mod response;
pub mod stream;

pub use request::translate_request;
pub use response::translate_response;
pub use stream::translate_stream_chunk;
