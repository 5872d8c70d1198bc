//! LLM-backed store analysis.
//!
//! # Architecture
//!
//! - [`OpenAiClient`] calls chat completions in JSON mode.
//! - [`ClaudeClient`] calls the Messages API and extracts the first JSON
//!   object from the text reply.
//! - [`AiClients`] holds whichever providers have an API key and dispatches
//!   on the model name via [`AiModel`].
//! - [`rule_based_insights`] produces static insights from metrics when no
//!   provider is configured.
//!
//! There is no retry and no schema validation beyond deserializing into
//! [`AnalysisResponse`].

mod claude;
mod model;
mod openai;
mod rules;
mod types;

pub use claude::ClaudeClient;
pub use model::{AiModel, MODEL_CHOICES, model_label};
pub use openai::OpenAiClient;
pub use rules::{InsightCard, InsightTone, rule_based_insights};
pub use types::{
    AlertLevel, AnalysisAlert, AnalysisResponse, AnalysisType, Forecast, StoreSnapshot,
};

use thiserror::Error;
use tracing::instrument;

use crate::config::AiConfig;

/// System prompt for full analyses.
pub const ANALYSIS_PROMPT: &str = r#"You are an expert e-commerce business analyst AI assistant for a Shopify store.
Analyze the following store data and provide actionable insights.

Provide your analysis in the following JSON format:
{
  "summary": "A brief 2-3 sentence summary of overall business health",
  "insights": ["insight1", "insight2", ...],
  "recommendations": ["recommendation1", "recommendation2", ...],
  "forecasts": [
    {"metric": "revenue", "prediction": "Expected 15% growth", "confidence": 0.8}
  ],
  "alerts": [
    {"type": "warning", "message": "Low inventory for top-selling items"}
  ]
}

Focus on:
1. Sales trends and patterns
2. Customer behavior insights
3. Inventory optimization opportunities
4. Revenue growth opportunities
5. Potential risks or issues"#;

/// System prompt for one-line insights.
pub const QUICK_INSIGHT_PROMPT: &str =
    "You are a helpful e-commerce analyst. Provide a single, concise insight.";

/// Returned by [`AiClients::generate_quick_insight`] on any failure.
pub const QUICK_INSIGHT_FALLBACK: &str = "Unable to generate insight";

const ANALYSIS_MAX_TOKENS: u32 = 2000;
const QUICK_INSIGHT_MAX_TOKENS: u32 = 150;

/// Errors from LLM providers.
#[derive(Debug, Error)]
pub enum AiError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Provider returned an error body.
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Rate limited by the provider.
    #[error("rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// API key rejected.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Reply was not the expected JSON.
    #[error("parse error: {0}")]
    Parse(String),

    #[error("No response from OpenAI")]
    EmptyResponse,

    #[error("Could not parse JSON from Claude response")]
    NoJsonInResponse,

    #[error("Unexpected response type from Claude")]
    UnexpectedContent,

    #[error("Unsupported model: {0}")]
    UnsupportedModel(String),

    /// No API key for the provider the model needs.
    #[error("{0} API key is not configured")]
    NotConfigured(&'static str),
}

/// Maps a non-success provider response onto [`AiError`].
async fn error_from_response(response: reqwest::Response) -> AiError {
    let status = response.status();

    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        let retry_after = response
            .headers()
            .get("Retry-After")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(60);
        return AiError::RateLimited(retry_after);
    }

    if status == reqwest::StatusCode::UNAUTHORIZED {
        return AiError::Unauthorized("Invalid API key".to_string());
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|v| {
            v.pointer("/error/message")
                .and_then(|m| m.as_str())
                .map(str::to_string)
        })
        .unwrap_or(body);

    AiError::Api {
        status: status.as_u16(),
        message,
    }
}

fn user_message(analysis_type: AnalysisType, snapshot: &StoreSnapshot) -> Result<String, AiError> {
    let data = serde_json::to_string_pretty(snapshot)
        .map_err(|e| AiError::Parse(format!("snapshot: {e}")))?;
    Ok(format!(
        "Analyze this {analysis_type} data for my Shopify store:\n\n{data}"
    ))
}

/// Configured LLM providers.
#[derive(Clone, Default)]
pub struct AiClients {
    openai: Option<OpenAiClient>,
    claude: Option<ClaudeClient>,
}

impl AiClients {
    #[must_use]
    pub fn new(config: &AiConfig) -> Self {
        Self {
            openai: config.openai.as_ref().map(OpenAiClient::new),
            claude: config.anthropic.as_ref().map(ClaudeClient::new),
        }
    }

    #[must_use]
    pub const fn from_clients(openai: Option<OpenAiClient>, claude: Option<ClaudeClient>) -> Self {
        Self { openai, claude }
    }

    /// Whether any provider has an API key.
    #[must_use]
    pub const fn is_configured(&self) -> bool {
        self.openai.is_some() || self.claude.is_some()
    }

    /// Whether `model` resolves to a provider with an API key.
    #[must_use]
    pub fn supports(&self, model: &str) -> bool {
        match AiModel::parse(model) {
            Ok(AiModel::OpenAi(_)) => self.openai.is_some(),
            Ok(AiModel::Claude(_)) => self.claude.is_some(),
            Err(_) => false,
        }
    }

    /// Run a full analysis with the provider `model` belongs to.
    ///
    /// # Errors
    ///
    /// Returns `AiError::UnsupportedModel` for unknown model names,
    /// `AiError::NotConfigured` when the provider has no key, and any
    /// provider error.
    #[instrument(skip(self, snapshot), fields(model = %model, analysis = %analysis_type))]
    pub async fn generate_analysis(
        &self,
        model: &str,
        analysis_type: AnalysisType,
        snapshot: &StoreSnapshot,
    ) -> Result<AnalysisResponse, AiError> {
        let message = user_message(analysis_type, snapshot)?;

        match AiModel::parse(model)? {
            AiModel::OpenAi(id) => {
                let client = self.openai.as_ref().ok_or(AiError::NotConfigured("OpenAI"))?;
                client.analyze(&id, &message).await
            }
            AiModel::Claude(id) => {
                let client = self
                    .claude
                    .as_ref()
                    .ok_or(AiError::NotConfigured("Anthropic"))?;
                client.analyze(id, &message).await
            }
        }
    }

    /// One short insight about `data`. Never fails: any error is logged and
    /// replaced by [`QUICK_INSIGHT_FALLBACK`].
    #[instrument(skip(self, data), fields(model = %model))]
    pub async fn generate_quick_insight(&self, model: &str, data: &serde_json::Value) -> String {
        let prompt = format!("Based on this data, what's the most important insight? {data}");

        let result = if model.starts_with("gpt") {
            match &self.openai {
                Some(client) => client.complete(model, QUICK_INSIGHT_PROMPT, &prompt).await,
                None => Err(AiError::NotConfigured("OpenAI")),
            }
        } else {
            match &self.claude {
                Some(client) => client.quick_insight(&prompt).await,
                None => Err(AiError::NotConfigured("Anthropic")),
            }
        };

        match result {
            Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
            Ok(_) => QUICK_INSIGHT_FALLBACK.to_string(),
            Err(e) => {
                tracing::warn!(error = %e, "Quick insight failed");
                QUICK_INSIGHT_FALLBACK.to_string()
            }
        }
    }
}
