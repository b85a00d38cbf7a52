//! Text-completion backends.

pub mod http;
pub mod traits;

pub use http::HttpLlmClient;
pub use traits::{ChatMessage, Completion, CompletionRequest, LlmClient};
