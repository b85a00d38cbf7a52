//! OpenAI-compatible chat-completions client over blocking HTTP.

use std::time::Duration;

use reqwest::blocking::Client;
use serde::Deserialize;

use crate::config::LlmConfig;
use crate::error::{CardError, Result};
use crate::llm::traits::{Completion, CompletionRequest, LlmClient};
use crate::util::truncate_chars;

/// Longest upstream body kept in an error.
pub const ERROR_BODY_CHARS: usize = 1000;

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// Completion client for a chat-completions endpoint.
///
/// One POST per call, no retries. Transport failures and non-2xx answers
/// become `Upstream` errors.
#[derive(Debug, Clone)]
pub struct HttpLlmClient {
    client: Client,
    url: String,
    api_key: Option<String>,
}

impl HttpLlmClient {
    pub fn new(url: impl Into<String>, api_key: Option<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CardError::config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self::with_client(client, url, api_key))
    }

    /// Use a preconfigured `reqwest` client.
    pub fn with_client(client: Client, url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client,
            url: url.into(),
            api_key,
        }
    }

    /// Build from the `[llm]` config section.
    ///
    /// Fails with a config error when no endpoint URL is configured.
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        let url = config.api_url.clone().ok_or_else(|| {
            CardError::config("no completion endpoint configured: set llm.api_url or CARDFORGE_LLM_URL")
        })?;
        Self::new(
            url,
            config.api_key.clone(),
            Duration::from_secs(config.timeout_seconds),
        )
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl LlmClient for HttpLlmClient {
    fn complete(&self, request: &CompletionRequest) -> Result<Completion> {
        let mut req = self.client.post(&self.url).json(request);
        if let Some(ref key) = self.api_key {
            req = req.bearer_auth(key);
        }

        tracing::debug!(url = %self.url, model = %request.model, "sending completion request");

        let resp = req
            .send()
            .map_err(|e| CardError::upstream(None, e.to_string()))?;
        let status = resp.status();
        let body = resp
            .text()
            .map_err(|e| CardError::upstream(Some(status.as_u16()), e.to_string()))?;

        if !status.is_success() {
            return Err(CardError::upstream(
                Some(status.as_u16()),
                truncate_chars(&body, ERROR_BODY_CHARS),
            ));
        }

        match completion_content(&body) {
            Some(content) => Ok(Completion { content }),
            None => Err(CardError::upstream(
                Some(status.as_u16()),
                format!(
                    "response has no completion content: {}",
                    truncate_chars(&body, ERROR_BODY_CHARS)
                ),
            )),
        }
    }
}

/// `choices[0].message.content`, when present and not blank.
fn completion_content(body: &str) -> Option<String> {
    let parsed: ChatResponse = serde_json::from_str(body).ok()?;
    parsed
        .choices
        .into_iter()
        .next()?
        .message?
        .content
        .filter(|content| !content.trim().is_empty())
}
