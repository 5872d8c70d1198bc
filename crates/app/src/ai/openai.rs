//! OpenAI chat completions client.

use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::model::OPENAI_DEFAULT_MODEL;
use super::{ANALYSIS_MAX_TOKENS, ANALYSIS_PROMPT, AiError, AnalysisResponse, QUICK_INSIGHT_MAX_TOKENS};
use crate::config::ProviderKey;

const OPENAI_API_URL: &str = "https://api.openai.com";

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
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

/// OpenAI API client.
#[derive(Clone)]
pub struct OpenAiClient {
    inner: Arc<OpenAiClientInner>,
}

struct OpenAiClientInner {
    http: reqwest::Client,
    api_key: SecretString,
    base_url: String,
}

impl OpenAiClient {
    #[must_use]
    pub fn new(key: &ProviderKey) -> Self {
        Self::with_base_url(key, OPENAI_API_URL)
    }

    #[must_use]
    pub fn with_base_url(key: &ProviderKey, base_url: &str) -> Self {
        Self {
            inner: Arc::new(OpenAiClientInner {
                http: reqwest::Client::new(),
                api_key: key.api_key.clone(),
                base_url: base_url.trim_end_matches('/').to_string(),
            }),
        }
    }

    async fn send(&self, request: &ChatCompletionRequest<'_>) -> Result<Option<String>, AiError> {
        let response = self
            .inner
            .http
            .post(format!("{}/v1/chat/completions", self.inner.base_url))
            .bearer_auth(self.inner.api_key.expose_secret())
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(super::error_from_response(response).await);
        }

        let body: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| AiError::Parse(format!("Failed to parse response: {e}")))?;

        Ok(body
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .and_then(|m| m.content)
            .filter(|c| !c.is_empty()))
    }

    /// Full analysis in JSON mode.
    ///
    /// # Errors
    ///
    /// Returns `AiError::EmptyResponse` when no choice carries content and
    /// `AiError::Parse` when the content is not an analysis object.
    #[instrument(skip(self, user_message))]
    pub async fn analyze(&self, model: &str, user_message: &str) -> Result<AnalysisResponse, AiError> {
        let model = if model.starts_with("gpt") {
            model
        } else {
            OPENAI_DEFAULT_MODEL
        };

        let request = ChatCompletionRequest {
            model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: ANALYSIS_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: user_message,
                },
            ],
            response_format: Some(ResponseFormat {
                kind: "json_object",
            }),
            temperature: Some(0.7),
            max_tokens: ANALYSIS_MAX_TOKENS,
        };

        let content = self.send(&request).await?.ok_or(AiError::EmptyResponse)?;
        serde_json::from_str(&content)
            .map_err(|e| AiError::Parse(format!("Invalid analysis JSON: {e}")))
    }

    /// Short free-text completion.
    ///
    /// # Errors
    ///
    /// Returns `AiError::EmptyResponse` when no choice carries content.
    #[instrument(skip(self, system, prompt))]
    pub async fn complete(&self, model: &str, system: &str, prompt: &str) -> Result<String, AiError> {
        let request = ChatCompletionRequest {
            model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            response_format: None,
            temperature: None,
            max_tokens: QUICK_INSIGHT_MAX_TOKENS,
        };

        self.send(&request).await?.ok_or(AiError::EmptyResponse)
    }
}

#[cfg(test)]
mod tests {
    use httpmock::prelude::*;
    use serde_json::json;

    use super::*;

    fn client(server: &MockServer) -> OpenAiClient {
        OpenAiClient::with_base_url(
            &ProviderKey {
                api_key: SecretString::from("sk-test"),
            },
            &server.base_url(),
        )
    }

    #[tokio::test]
    async fn test_analyze_sends_json_mode_request() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v1/chat/completions")
                    .header("authorization", "Bearer sk-test")
                    .json_body_partial(
                        r#"{"model":"gpt-4","temperature":0.7,"max_tokens":2000,"response_format":{"type":"json_object"}}"#,
                    )
                    .body_contains("expert e-commerce business analyst");
                then.status(200).json_body(json!({
                    "choices": [{
                        "message": {
                            "role": "assistant",
                            "content": json!({
                                "summary": "Revenue is up.",
                                "insights": ["Weekend sales are strong"],
                                "recommendations": ["Restock top sellers"],
                                "forecasts": [{ "metric": "revenue", "prediction": "Expected 10% growth", "confidence": 0.75 }],
                                "alerts": [{ "type": "warning", "message": "Low inventory" }]
                            }).to_string()
                        }
                    }]
                }));
            })
            .await;

        let response = client(&server).analyze("gpt-4", "Analyze this").await.unwrap();
        mock.assert_async().await;
        assert_eq!(response.summary, "Revenue is up.");
        assert_eq!(response.recommendations, vec!["Restock top sellers"]);
        assert_eq!(response.forecasts[0].metric, "revenue");
        assert_eq!(response.alerts.len(), 1);
    }

    #[tokio::test]
    async fn test_analyze_empty_choices() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/chat/completions");
                then.status(200).json_body(json!({ "choices": [] }));
            })
            .await;

        let err = client(&server).analyze("gpt-4", "hi").await.unwrap_err();
        assert!(matches!(err, AiError::EmptyResponse));
    }

    #[tokio::test]
    async fn test_analyze_rejects_non_json_content() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/chat/completions");
                then.status(200).json_body(json!({
                    "choices": [{ "message": { "content": "Sales look fine." } }]
                }));
            })
            .await;

        let err = client(&server).analyze("gpt-4", "hi").await.unwrap_err();
        assert!(matches!(err, AiError::Parse(_)));
    }

    #[tokio::test]
    async fn test_unauthorized() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/chat/completions");
                then.status(401);
            })
            .await;

        let err = client(&server)
            .complete("gpt-4", "system", "prompt")
            .await
            .unwrap_err();
        assert!(matches!(err, AiError::Unauthorized(_)));
    }
}
