//! Shopify Admin API access for installed shops.
//!
//! # Architecture
//!
//! - [`ShopifyClient`] is the app-level OAuth client: install URL, code
//!   exchange and HMAC verification. One per process.
//! - [`ShopContext`] is a per-request handle for one shop's offline token.
//!   It executes GraphQL queries, the billing mutations and webhook
//!   registration.
//! - Request and response envelopes use `graphql_client`; query documents
//!   are plain strings in [`queries`] and nodes are deserialized with serde.
//! - Nodes are converted into `growth_pilot_core` records in
//!   `conversions`. Missing optional fields fall back to defaults.
//!
//! # Example
//!
//! ```rust,ignore
//! let ctx = state.shopify().context(&session);
//! let orders = ctx.orders_since(today - TimeDelta::days(30)).await?;
//! ```

mod billing;
mod client;
mod context;
mod conversions;
pub mod queries;
pub mod signing;
mod webhooks;

pub use billing::{ActiveSubscription, SubscriptionCreated};
pub use client::{OAuthToken, ShopifyClient};
pub use context::{MAX_PAGES, ShopContext};
pub use webhooks::{WebhookRegistration, WebhookTopic};

use thiserror::Error;

/// Errors that can occur when talking to Shopify.
#[derive(Debug, Error)]
pub enum ShopifyError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// GraphQL query returned errors.
    #[error("GraphQL errors: {}", .0.join("; "))]
    GraphQL(Vec<String>),

    /// Response body could not be interpreted.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Rate limited by Shopify.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Access token rejected.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Mutation rejected the input.
    #[error("User error: {0}")]
    UserError(String),

    /// OAuth handshake failed.
    #[error("OAuth error: {0}")]
    OAuth(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_graphql_error_formatting() {
        let err = ShopifyError::GraphQL(vec![
            "Field not found".to_string(),
            "Invalid ID".to_string(),
        ]);
        assert_eq!(
            err.to_string(),
            "GraphQL errors: Field not found; Invalid ID"
        );
    }

    #[test]
    fn test_rate_limited_error() {
        let err = ShopifyError::RateLimited(60);
        assert_eq!(err.to_string(), "Rate limited, retry after 60 seconds");
    }

    #[test]
    fn test_user_error() {
        let err = ShopifyError::UserError("Price must be positive".to_string());
        assert_eq!(err.to_string(), "User error: Price must be positive");
    }
}
