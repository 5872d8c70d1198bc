//! Webhook topics and their registration after install.

use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use super::queries::{UserError, WEBHOOK_SUBSCRIPTION_CREATE};
use super::{ShopContext, ShopifyError};

/// Webhook topics the app handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WebhookTopic {
    AppUninstalled,
    OrdersCreate,
    OrdersUpdated,
    OrdersCancelled,
    RefundsCreate,
    ProductsUpdate,
    CustomersCreate,
    CustomersUpdate,
    InventoryLevelsUpdate,
    CheckoutsCreate,
    CustomersDataRequest,
    CustomersRedact,
    ShopRedact,
}

impl WebhookTopic {
    /// Every topic the receiver accepts.
    pub const SUBSCRIBED: [Self; 13] = [
        Self::AppUninstalled,
        Self::OrdersCreate,
        Self::OrdersUpdated,
        Self::OrdersCancelled,
        Self::RefundsCreate,
        Self::ProductsUpdate,
        Self::CustomersCreate,
        Self::CustomersUpdate,
        Self::InventoryLevelsUpdate,
        Self::CheckoutsCreate,
        Self::CustomersDataRequest,
        Self::CustomersRedact,
        Self::ShopRedact,
    ];

    /// GraphQL `WebhookSubscriptionTopic` value.
    #[must_use]
    pub const fn as_graphql(self) -> &'static str {
        match self {
            Self::AppUninstalled => "APP_UNINSTALLED",
            Self::OrdersCreate => "ORDERS_CREATE",
            Self::OrdersUpdated => "ORDERS_UPDATED",
            Self::OrdersCancelled => "ORDERS_CANCELLED",
            Self::RefundsCreate => "REFUNDS_CREATE",
            Self::ProductsUpdate => "PRODUCTS_UPDATE",
            Self::CustomersCreate => "CUSTOMERS_CREATE",
            Self::CustomersUpdate => "CUSTOMERS_UPDATE",
            Self::InventoryLevelsUpdate => "INVENTORY_LEVELS_UPDATE",
            Self::CheckoutsCreate => "CHECKOUTS_CREATE",
            Self::CustomersDataRequest => "CUSTOMERS_DATA_REQUEST",
            Self::CustomersRedact => "CUSTOMERS_REDACT",
            Self::ShopRedact => "SHOP_REDACT",
        }
    }

    /// Parse a topic header, either `app/uninstalled` or `APP_UNINSTALLED`.
    #[must_use]
    pub fn parse(header: &str) -> Option<Self> {
        let normalized = header.trim().replace('/', "_").to_ascii_uppercase();
        Self::SUBSCRIBED
            .into_iter()
            .find(|t| t.as_graphql() == normalized)
    }

    /// Whether the topic removes the shop's data.
    #[must_use]
    pub const fn removes_shop(self) -> bool {
        matches!(self, Self::AppUninstalled | Self::ShopRedact)
    }

    /// Mandatory privacy topics. These are configured on the app listing
    /// and cannot be created through the Admin API.
    #[must_use]
    pub const fn is_compliance(self) -> bool {
        matches!(
            self,
            Self::CustomersDataRequest | Self::CustomersRedact | Self::ShopRedact
        )
    }
}

impl std::fmt::Display for WebhookTopic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_graphql())
    }
}

/// Outcome of registering the app's webhooks for one shop.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct WebhookRegistration {
    pub registered: Vec<WebhookTopic>,
    /// Topics Shopify rejected, with the reason.
    pub failed: Vec<(WebhookTopic, String)>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreatePayload {
    #[serde(default)]
    user_errors: Vec<UserError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateData {
    webhook_subscription_create: CreatePayload,
}

/// Shopify reports an existing subscription for the same address as a
/// user error. Reinstalls hit this and it counts as registered.
fn already_registered(message: &str) -> bool {
    message.to_ascii_lowercase().contains("already been taken")
}

impl ShopContext {
    /// Subscribe `callback_url` to every non-compliance topic.
    ///
    /// Topics are registered one at a time. A rejected topic is recorded in
    /// [`WebhookRegistration::failed`] and the remaining topics are still
    /// attempted.
    ///
    /// # Errors
    ///
    /// Returns `ShopifyError::Unauthorized` if the token is rejected, since
    /// no later topic can succeed either.
    #[instrument(skip(self), fields(shop = %self.shop()))]
    pub async fn register_webhooks(
        &self,
        callback_url: &str,
    ) -> Result<WebhookRegistration, ShopifyError> {
        let mut outcome = WebhookRegistration::default();

        for topic in WebhookTopic::SUBSCRIBED
            .into_iter()
            .filter(|t| !t.is_compliance())
        {
            let variables = json!({
                "topic": topic.as_graphql(),
                "webhookSubscription": { "callbackUrl": callback_url, "format": "JSON" },
            });

            let result: Result<CreateData, _> = self
                .execute(
                    WEBHOOK_SUBSCRIPTION_CREATE,
                    "WebhookSubscriptionCreate",
                    variables,
                )
                .await;

            match result {
                Ok(data) => match data.webhook_subscription_create.user_errors.into_iter().next() {
                    Some(err) if !already_registered(&err.message) => {
                        outcome.failed.push((topic, err.message));
                    }
                    _ => outcome.registered.push(topic),
                },
                Err(e @ ShopifyError::Unauthorized(_)) => return Err(e),
                Err(e) => outcome.failed.push((topic, e.to_string())),
            }
        }

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use httpmock::prelude::*;
    use secrecy::SecretString;

    use growth_pilot_core::ShopDomain;

    use super::*;
    use crate::config::tests::test_config;
    use crate::models::ShopSession;
    use crate::shopify::ShopifyClient;

    const GRAPHQL_PATH: &str = "/admin/api/2025-01/graphql.json";
    const CALLBACK: &str = "https://pilot.test/webhooks";

    fn context(server: &MockServer) -> ShopContext {
        let client = ShopifyClient::with_base_url(&test_config().shopify, &server.base_url());
        client.context(&ShopSession {
            shop: ShopDomain::parse("pilot-demo.myshopify.com").unwrap(),
            access_token: SecretString::from("shpat_test"),
            scopes: vec![],
            installed_at: chrono::Utc::now(),
        })
    }

    fn created() -> serde_json::Value {
        json!({
            "data": {
                "webhookSubscriptionCreate": {
                    "webhookSubscription": { "id": "gid://shopify/WebhookSubscription/1" },
                    "userErrors": []
                }
            }
        })
    }

    #[test]
    fn test_parse_topic_formats() {
        assert_eq!(
            WebhookTopic::parse("app/uninstalled"),
            Some(WebhookTopic::AppUninstalled)
        );
        assert_eq!(
            WebhookTopic::parse("INVENTORY_LEVELS_UPDATE"),
            Some(WebhookTopic::InventoryLevelsUpdate)
        );
        assert_eq!(
            WebhookTopic::parse("customers/data_request"),
            Some(WebhookTopic::CustomersDataRequest)
        );
        assert_eq!(WebhookTopic::parse("carts/update"), None);
        assert_eq!(WebhookTopic::parse(""), None);
    }

    #[test]
    fn test_subscribed_topics_round_trip() {
        for topic in WebhookTopic::SUBSCRIBED {
            assert_eq!(WebhookTopic::parse(topic.as_graphql()), Some(topic));
        }
    }

    #[test]
    fn test_only_uninstall_and_shop_redact_remove_data() {
        let removing: Vec<_> = WebhookTopic::SUBSCRIBED
            .into_iter()
            .filter(|t| t.removes_shop())
            .collect();
        assert_eq!(
            removing,
            vec![WebhookTopic::AppUninstalled, WebhookTopic::ShopRedact]
        );
    }

    #[tokio::test]
    async fn test_register_webhooks_creates_each_topic() {
        let server = MockServer::start_async().await;
        let uninstall = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path(GRAPHQL_PATH)
                    .body_contains("WebhookSubscriptionCreate")
                    .json_body_partial(
                        r#"{"variables":{"topic":"APP_UNINSTALLED","webhookSubscription":{"callbackUrl":"https://pilot.test/webhooks","format":"JSON"}}}"#,
                    );
                then.status(200).json_body(created());
            })
            .await;
        let any = server
            .mock_async(|when, then| {
                when.method(POST).path(GRAPHQL_PATH);
                then.status(200).json_body(created());
            })
            .await;

        let outcome = context(&server).register_webhooks(CALLBACK).await.unwrap();

        uninstall.assert_async().await;
        assert_eq!(uninstall.hits_async().await + any.hits_async().await, 10);
        assert_eq!(outcome.registered.len(), 10);
        assert!(outcome.failed.is_empty());
        assert!(outcome.registered.contains(&WebhookTopic::AppUninstalled));
        assert!(!outcome.registered.contains(&WebhookTopic::ShopRedact));
    }

    #[tokio::test]
    async fn test_register_webhooks_records_rejections() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST)
                    .path(GRAPHQL_PATH)
                    .json_body_partial(r#"{"variables":{"topic":"CHECKOUTS_CREATE"}}"#);
                then.status(200).json_body(json!({
                    "data": {
                        "webhookSubscriptionCreate": {
                            "webhookSubscription": null,
                            "userErrors": [{ "field": ["topic"], "message": "Access denied for topic" }]
                        }
                    }
                }));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(POST)
                    .path(GRAPHQL_PATH)
                    .json_body_partial(r#"{"variables":{"topic":"ORDERS_CREATE"}}"#);
                then.status(200).json_body(json!({
                    "data": {
                        "webhookSubscriptionCreate": {
                            "webhookSubscription": null,
                            "userErrors": [{ "field": ["callbackUrl"], "message": "Address for this topic has already been taken" }]
                        }
                    }
                }));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(POST).path(GRAPHQL_PATH);
                then.status(200).json_body(created());
            })
            .await;

        let outcome = context(&server).register_webhooks(CALLBACK).await.unwrap();

        assert_eq!(
            outcome.failed,
            vec![(
                WebhookTopic::CheckoutsCreate,
                "Access denied for topic".to_string()
            )]
        );
        assert!(outcome.registered.contains(&WebhookTopic::OrdersCreate));
        assert_eq!(outcome.registered.len(), 9);
    }

    #[tokio::test]
    async fn test_register_webhooks_stops_on_rejected_token() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path(GRAPHQL_PATH);
                then.status(401);
            })
            .await;

        let err = context(&server).register_webhooks(CALLBACK).await.unwrap_err();

        assert!(matches!(err, ShopifyError::Unauthorized(_)));
        mock.assert_hits_async(1).await;
    }
}
