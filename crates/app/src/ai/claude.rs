//! Anthropic Messages API client.

use std::sync::{Arc, LazyLock};

use regex::Regex;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::model::CLAUDE_QUICK_MODEL;
use super::{
    ANALYSIS_MAX_TOKENS, ANALYSIS_PROMPT, AiError, AnalysisResponse, QUICK_INSIGHT_MAX_TOKENS,
    QUICK_INSIGHT_PROMPT,
};
use crate::config::ProviderKey;

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com";
const ANTHROPIC_VERSION: &str = "2023-06-01";

static JSON_OBJECT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{[\s\S]*\}").expect("Invalid regex"));

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<Message<'a>>,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(other)]
    Other,
}

/// The outermost `{...}` span in `text`, if any.
fn extract_json_object(text: &str) -> Option<&str> {
    JSON_OBJECT_RE.find(text).map(|m| m.as_str())
}

/// Claude API client.
#[derive(Clone)]
pub struct ClaudeClient {
    inner: Arc<ClaudeClientInner>,
}

struct ClaudeClientInner {
    http: reqwest::Client,
    api_key: SecretString,
    base_url: String,
}

impl ClaudeClient {
    #[must_use]
    pub fn new(key: &ProviderKey) -> Self {
        Self::with_base_url(key, ANTHROPIC_API_URL)
    }

    #[must_use]
    pub fn with_base_url(key: &ProviderKey, base_url: &str) -> Self {
        Self {
            inner: Arc::new(ClaudeClientInner {
                http: reqwest::Client::new(),
                api_key: key.api_key.clone(),
                base_url: base_url.trim_end_matches('/').to_string(),
            }),
        }
    }

    /// Send a request and return the text of the first content block.
    async fn first_text(&self, request: &MessagesRequest<'_>) -> Result<String, AiError> {
        let response = self
            .inner
            .http
            .post(format!("{}/v1/messages", self.inner.base_url))
            .header("x-api-key", self.inner.api_key.expose_secret())
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(super::error_from_response(response).await);
        }

        let body: MessagesResponse = response
            .json()
            .await
            .map_err(|e| AiError::Parse(format!("Failed to parse response: {e}")))?;

        match body.content.into_iter().next() {
            Some(ContentBlock::Text { text }) => Ok(text),
            Some(ContentBlock::Other) | None => Err(AiError::UnexpectedContent),
        }
    }

    /// Full analysis. The JSON object is cut out of the reply text, so
    /// prose around it is ignored.
    ///
    /// # Errors
    ///
    /// Returns `AiError::UnexpectedContent` when the first block is not
    /// text, `AiError::NoJsonInResponse` when it holds no `{...}` span, and
    /// `AiError::Parse` when that span is not an analysis object.
    #[instrument(skip(self, user_message))]
    pub async fn analyze(&self, model: &str, user_message: &str) -> Result<AnalysisResponse, AiError> {
        let request = MessagesRequest {
            model,
            max_tokens: ANALYSIS_MAX_TOKENS,
            system: ANALYSIS_PROMPT,
            messages: vec![Message {
                role: "user",
                content: user_message,
            }],
        };

        let text = self.first_text(&request).await?;
        let json = extract_json_object(&text).ok_or(AiError::NoJsonInResponse)?;
        serde_json::from_str(json).map_err(|e| AiError::Parse(format!("Invalid analysis JSON: {e}")))
    }

    /// One-line insight with the fast model.
    ///
    /// # Errors
    ///
    /// Returns any transport or provider error.
    #[instrument(skip(self, prompt))]
    pub async fn quick_insight(&self, prompt: &str) -> Result<String, AiError> {
        let request = MessagesRequest {
            model: CLAUDE_QUICK_MODEL,
            max_tokens: QUICK_INSIGHT_MAX_TOKENS,
            system: QUICK_INSIGHT_PROMPT,
            messages: vec![Message {
                role: "user",
                content: prompt,
            }],
        };
        self.first_text(&request).await
    }
}
