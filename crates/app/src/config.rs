//! Application configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `DATABASE_URL` - `PostgreSQL` connection string
//! - `SHOPIFY_APP_URL` - Public URL of this app (OAuth redirects, billing return URLs)
//! - `SHOPIFY_API_KEY` - Shopify app client ID
//! - `SHOPIFY_API_SECRET` - Shopify app client secret (OAuth, webhook HMAC)
//! - `SESSION_SECRET` - Session signing secret (min 32 chars, high entropy)
//!
//! ## Optional
//! - `HOST` - Bind address (default: 127.0.0.1)
//! - `PORT` - Listen port (default: 3000)
//! - `SCOPES` - Comma-separated OAuth scopes (default: read-only orders, products, customers)
//! - `SHOPIFY_API_VERSION` - Admin API version (default: 2025-01)
//! - `OPENAI_API_KEY` - `OpenAI` API key (enables GPT models for AI insights)
//! - `ANTHROPIC_API_KEY` - Anthropic API key (enables Claude models for AI insights)
//! - `AI_MODEL` - Default model for new shops (default: gpt-4)
//! - `BILLING_TEST_MODE` - Create test charges (default: true)
//! - `RUN_MIGRATIONS` - Run database migrations at startup (default: false)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT`, `SENTRY_SAMPLE_RATE`, `SENTRY_TRACES_SAMPLE_RATE`

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use url::Url;

const MIN_SESSION_SECRET_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;
const DEFAULT_API_VERSION: &str = "2025-01";
const DEFAULT_AI_MODEL: &str = "gpt-4";
const DEFAULT_SCOPES: &str = "read_orders,read_products,read_customers,read_inventory,read_checkouts";

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public URL of the app, without a trailing slash
    pub app_url: String,
    /// Session signing secret
    pub session_secret: SecretString,
    /// Shopify app credentials
    pub shopify: ShopifyAppConfig,
    /// LLM provider configuration
    pub ai: AiConfig,
    /// Create Shopify test charges instead of real ones
    pub billing_test_mode: bool,
    /// Run embedded migrations at startup
    pub run_migrations: bool,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g., "development", "staging", "production")
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate (0.0 to 1.0)
    pub sentry_sample_rate: f32,
    /// Sentry traces sample rate for performance monitoring (0.0 to 1.0)
    pub sentry_traces_sample_rate: f32,
}

/// Shopify app credentials.
///
/// Implements `Debug` manually to redact the client secret.
#[derive(Clone)]
pub struct ShopifyAppConfig {
    /// App client ID (public)
    pub api_key: String,
    /// App client secret (signs OAuth callbacks and webhooks)
    pub api_secret: SecretString,
    /// OAuth scopes requested at install
    pub scopes: Vec<String>,
    /// Admin API version (e.g., 2025-01)
    pub api_version: String,
}

impl std::fmt::Debug for ShopifyAppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShopifyAppConfig")
            .field("api_key", &self.api_key)
            .field("api_secret", &"[REDACTED]")
            .field("scopes", &self.scopes)
            .field("api_version", &self.api_version)
            .finish()
    }
}

/// LLM provider configuration.
#[derive(Debug, Clone)]
pub struct AiConfig {
    /// Model used for shops that have not picked one
    pub default_model: String,
    /// `OpenAI` credentials, if configured
    pub openai: Option<ProviderKey>,
    /// Anthropic credentials, if configured
    pub anthropic: Option<ProviderKey>,
}

/// An LLM provider API key.
///
/// Implements `Debug` manually to redact the key.
#[derive(Clone)]
pub struct ProviderKey {
    pub api_key: SecretString,
}

impl std::fmt::Debug for ProviderKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderKey")
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

impl AppConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_required_secret("DATABASE_URL")?;
        let host = get_env_or_default("HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("HOST".to_string(), e.to_string()))?;
        let port = get_env_or_default("PORT", "3000")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("PORT".to_string(), e.to_string()))?;
        let app_url = parse_app_url(&get_required_env("SHOPIFY_APP_URL")?)?;
        let session_secret = get_validated_secret("SESSION_SECRET")?;
        validate_session_secret(&session_secret, "SESSION_SECRET")?;

        let shopify = ShopifyAppConfig::from_env()?;
        let ai = AiConfig::from_env();
        let billing_test_mode = parse_bool("BILLING_TEST_MODE", true)?;
        let run_migrations = parse_bool("RUN_MIGRATIONS", false)?;
        let sentry_dsn = get_optional_env("SENTRY_DSN");
        let sentry_environment = get_optional_env("SENTRY_ENVIRONMENT");
        let sentry_sample_rate = get_optional_env("SENTRY_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);
        let sentry_traces_sample_rate = get_optional_env("SENTRY_TRACES_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(0.1);

        Ok(Self {
            database_url,
            host,
            port,
            app_url,
            session_secret,
            shopify,
            ai,
            billing_test_mode,
            run_migrations,
            sentry_dsn,
            sentry_environment,
            sentry_sample_rate,
            sentry_traces_sample_rate,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether the app is served over HTTPS (controls secure cookies).
    #[must_use]
    pub fn is_https(&self) -> bool {
        self.app_url.starts_with("https://")
    }

    /// Absolute URL for a path on this app.
    #[must_use]
    pub fn url_for(&self, path: &str) -> String {
        format!("{}{}", self.app_url, path)
    }
}

impl ShopifyAppConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            api_key: get_required_env("SHOPIFY_API_KEY")?,
            api_secret: get_validated_secret("SHOPIFY_API_SECRET")?,
            scopes: parse_scopes(&get_env_or_default("SCOPES", DEFAULT_SCOPES)),
            api_version: get_env_or_default("SHOPIFY_API_VERSION", DEFAULT_API_VERSION),
        })
    }
}

impl AiConfig {
    /// Both providers are optional. Without either, AI insights fall back to
    /// rule-based insights.
    fn from_env() -> Self {
        Self {
            default_model: get_env_or_default("AI_MODEL", DEFAULT_AI_MODEL),
            openai: ProviderKey::from_env("OPENAI_API_KEY"),
            anthropic: ProviderKey::from_env("ANTHROPIC_API_KEY"),
        }
    }
}

impl ProviderKey {
    fn from_env(key: &str) -> Option<Self> {
        get_optional_env(key).map(|value| {
            if let Err(e) = validate_secret_strength(&value, key) {
                tracing::warn!("{key} validation warning: {e}");
            }
            Self {
                api_key: SecretString::from(value),
            }
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get a required environment variable as a secret.
fn get_required_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    Ok(SecretString::from(value))
}

/// Get an optional environment variable. Empty values count as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_bool(key: &str, default: bool) -> Result<bool, ConfigError> {
    match get_optional_env(key) {
        None => Ok(default),
        Some(v) => match v.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            other => Err(ConfigError::InvalidEnvVar(
                key.to_string(),
                format!("expected a boolean, got '{other}'"),
            )),
        },
    }
}

/// Split a comma-separated scope list, dropping blanks.
fn parse_scopes(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .collect()
}

/// Validate the public app URL and strip any trailing slash.
fn parse_app_url(raw: &str) -> Result<String, ConfigError> {
    let url = Url::parse(raw)
        .map_err(|e| ConfigError::InvalidEnvVar("SHOPIFY_APP_URL".to_string(), e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidEnvVar(
            "SHOPIFY_APP_URL".to_string(),
            format!("unsupported scheme '{}'", url.scheme()),
        ));
    }
    Ok(url.as_str().trim_end_matches('/').to_string())
}

/// Validate that a session secret meets minimum length requirements.
fn validate_session_secret(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.len() < MIN_SESSION_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_SESSION_SECRET_LENGTH,
                value.len()
            ),
        ));
    }
    Ok(())
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use super::*;

    /// A fully populated config for handler and client tests.
    pub(crate) fn test_config() -> AppConfig {
        AppConfig {
            database_url: SecretString::from("postgres://localhost/test"),
            host: "127.0.0.1".parse().unwrap(),
            port: 3000,
            app_url: "https://pilot.test".to_string(),
            session_secret: SecretString::from("x".repeat(32)),
            shopify: ShopifyAppConfig {
                api_key: "test_api_key".to_string(),
                api_secret: SecretString::from("hush-hush-test-api-secret"),
                scopes: parse_scopes(DEFAULT_SCOPES),
                api_version: DEFAULT_API_VERSION.to_string(),
            },
            ai: AiConfig {
                default_model: DEFAULT_AI_MODEL.to_string(),
                openai: None,
                anthropic: None,
            },
            billing_test_mode: true,
            run_migrations: false,
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 0.1,
        }
    }

    #[test]
    fn test_shannon_entropy_empty() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_two_chars() {
        // "ab" has entropy of 1 bit per char (50% a, 50% b)
        let entropy = shannon_entropy("ab");
        assert!((entropy - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_validate_secret_strength_placeholder() {
        let result = validate_secret_strength("your-api-key-here", "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_low_entropy() {
        let result = validate_secret_strength("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa", "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_valid() {
        let result = validate_secret_strength("aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6", "TEST_VAR");
        assert!(result.is_ok());
    }

    #[test]
    fn test_validate_session_secret_too_short() {
        let secret = SecretString::from("short");
        assert!(validate_session_secret(&secret, "SESSION_SECRET").is_err());
    }

    #[test]
    fn test_parse_scopes() {
        assert_eq!(
            parse_scopes(" read_orders, ,read_products,"),
            vec!["read_orders".to_string(), "read_products".to_string()]
        );
        assert_eq!(parse_scopes(DEFAULT_SCOPES).len(), 5);
    }

    #[test]
    fn test_parse_app_url() {
        assert_eq!(
            parse_app_url("https://pilot.example.app/").unwrap(),
            "https://pilot.example.app"
        );
        assert!(parse_app_url("not a url").is_err());
        assert!(parse_app_url("ftp://pilot.example.app").is_err());
    }

    #[test]
    fn test_socket_addr_and_urls() {
        let config = test_config();
        let addr = config.socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 3000);
        assert!(config.is_https());
        assert_eq!(config.url_for("/auth/callback"), "https://pilot.test/auth/callback");
    }

    #[test]
    fn test_shopify_config_debug_redacts_secrets() {
        let config = test_config().shopify;
        let debug_output = format!("{config:?}");

        assert!(debug_output.contains("test_api_key"));
        assert!(debug_output.contains(DEFAULT_API_VERSION));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("hush-hush-test-api-secret"));
    }

    #[test]
    fn test_provider_key_debug_redacts_secrets() {
        let config = AiConfig {
            default_model: "claude-3-sonnet".to_string(),
            openai: Some(ProviderKey {
                api_key: SecretString::from("sk-super-secret-openai"),
            }),
            anthropic: Some(ProviderKey {
                api_key: SecretString::from("sk-ant-super-secret"),
            }),
        };
        let debug_output = format!("{config:?}");

        assert!(debug_output.contains("claude-3-sonnet"));
        assert!(!debug_output.contains("sk-super-secret-openai"));
        assert!(!debug_output.contains("sk-ant-super-secret"));
    }

    #[test]
    fn test_app_config_debug_redacts_database_url() {
        let debug_output = format!("{:?}", test_config());
        assert!(!debug_output.contains("postgres://localhost/test"));
    }
}
