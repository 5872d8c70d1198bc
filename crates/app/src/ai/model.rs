//! Model name resolution.

use super::AiError;

pub const OPENAI_DEFAULT_MODEL: &str = "gpt-4";
pub const CLAUDE_DEFAULT_MODEL: &str = "claude-3-sonnet-20240229";
pub const CLAUDE_QUICK_MODEL: &str = "claude-3-haiku-20240307";

/// Models offered in settings, as `(value, label)`.
pub const MODEL_CHOICES: [(&str, &str); 6] = [
    ("gpt-4", "GPT-4"),
    ("gpt-4o", "GPT-4o"),
    ("gpt-3.5-turbo", "GPT-3.5 Turbo"),
    ("claude-3-opus", "Claude 3 Opus"),
    ("claude-3-sonnet", "Claude 3 Sonnet"),
    ("claude-3-haiku", "Claude 3 Haiku"),
];

/// A provider plus the model id sent to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AiModel {
    OpenAi(String),
    Claude(&'static str),
}

impl AiModel {
    /// Resolve a user-facing model name.
    ///
    /// `gpt*` names pass through to OpenAI. `claude*` names map to dated
    /// model ids, unknown Claude variants fall back to Sonnet.
    ///
    /// # Errors
    ///
    /// Returns `AiError::UnsupportedModel` for any other name.
    pub fn parse(name: &str) -> Result<Self, AiError> {
        let name = name.trim();
        if name.starts_with("gpt") {
            return Ok(Self::OpenAi(name.to_string()));
        }
        if name.starts_with("claude") {
            let id = match name {
                "claude-3-opus" => "claude-3-opus-20240229",
                "claude-3-haiku" => CLAUDE_QUICK_MODEL,
                _ => CLAUDE_DEFAULT_MODEL,
            };
            return Ok(Self::Claude(id));
        }
        Err(AiError::UnsupportedModel(name.to_string()))
    }

    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::OpenAi(id) => id,
            Self::Claude(id) => id,
        }
    }

    #[must_use]
    pub const fn provider(&self) -> &'static str {
        match self {
            Self::OpenAi(_) => "OpenAI",
            Self::Claude(_) => "Anthropic",
        }
    }
}

/// Display label for a stored model name.
#[must_use]
pub fn model_label(name: &str) -> &str {
    MODEL_CHOICES
        .iter()
        .find(|(value, _)| *value == name)
        .map_or(name, |(_, label)| label)
}
