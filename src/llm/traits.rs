//! Completion client trait and request types.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// One chat turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// A chat-completion request. Serializes to the OpenAI-compatible body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
    pub temperature: f64,
}

/// The text of the first completion choice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Completion {
    pub content: String,
}

/// Trait for completion backends.
///
/// A call either yields the completion text or fails with
/// [`crate::error::CardError::Upstream`]. Implementations never retry.
pub trait LlmClient: Send + Sync {
    fn complete(&self, request: &CompletionRequest) -> Result<Completion>;
}

impl<T: LlmClient + ?Sized> LlmClient for Arc<T> {
    fn complete(&self, request: &CompletionRequest) -> Result<Completion> {
        (**self).complete(request)
    }
}

/// Test doubles for LlmClient consumers.
#[cfg(test)]
pub mod tests {
    use super::*;
    use crate::error::CardError;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays canned responses in order and records every request.
    #[derive(Default)]
    pub struct ScriptedLlm {
        responses: Mutex<VecDeque<Result<Completion>>>,
        requests: Mutex<Vec<CompletionRequest>>,
    }

    impl ScriptedLlm {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn replying(content: &str) -> Self {
            let llm = Self::new();
            llm.push_reply(content);
            llm
        }

        pub fn failing(error: CardError) -> Self {
            let llm = Self::new();
            llm.responses.lock().unwrap().push_back(Err(error));
            llm
        }

        pub fn push_reply(&self, content: &str) {
            self.responses.lock().unwrap().push_back(Ok(Completion {
                content: content.to_string(),
            }));
        }

        pub fn requests(&self) -> Vec<CompletionRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    impl LlmClient for ScriptedLlm {
        fn complete(&self, request: &CompletionRequest) -> Result<Completion> {
            self.requests.lock().unwrap().push(request.clone());
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(CardError::upstream(None, "no scripted response left")))
        }
    }

    #[test]
    fn test_request_serializes_to_chat_body() {
        let request = CompletionRequest {
            model: "local".to_string(),
            messages: vec![ChatMessage::system("sys"), ChatMessage::user("hi")],
            max_tokens: 512,
            temperature: 0.2,
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "local");
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "hi");
        assert_eq!(json["max_tokens"], 512);
        assert_eq!(json["temperature"], 0.2);
    }

    #[test]
    fn test_scripted_llm_replays_in_order() {
        let llm = ScriptedLlm::replying("first");
        llm.push_reply("second");
        let request = CompletionRequest {
            model: "m".to_string(),
            messages: vec![],
            max_tokens: 1,
            temperature: 0.0,
        };

        assert_eq!(llm.complete(&request).unwrap().content, "first");
        assert_eq!(llm.complete(&request).unwrap().content, "second");
        assert!(llm.complete(&request).is_err());
        assert_eq!(llm.requests().len(), 3);
    }
}
