//! Recurring application charges.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::instrument;

use growth_pilot_core::billing::Plan;

use super::queries::{
    ACTIVE_SUBSCRIPTIONS_QUERY, APP_SUBSCRIPTION_CANCEL, APP_SUBSCRIPTION_CREATE,
    AppSubscriptionNode, UserError,
};
use super::{ShopContext, ShopifyError};

/// Result of starting a subscription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubscriptionCreated {
    /// Where the merchant approves the charge. For the free plan this is
    /// the return URL itself.
    pub confirmation_url: String,
    /// Subscription GID, `None` for the free plan.
    pub id: Option<String>,
}

/// A subscription listed on the current app installation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveSubscription {
    pub id: String,
    pub name: String,
    pub status: String,
    #[serde(default)]
    pub test: bool,
    #[serde(default)]
    pub trial_days: u32,
    #[serde(default)]
    pub current_period_end: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateVariables {
    name: String,
    return_url: String,
    test: bool,
    trial_days: u32,
    line_items: serde_json::Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreatePayload {
    app_subscription: Option<AppSubscriptionNode>,
    confirmation_url: Option<String>,
    #[serde(default)]
    user_errors: Vec<UserError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateData {
    app_subscription_create: CreatePayload,
}

#[derive(Debug, Serialize)]
struct CancelVariables<'a> {
    id: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CancelPayload {
    app_subscription: Option<AppSubscriptionNode>,
    #[serde(default)]
    user_errors: Vec<UserError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CancelData {
    app_subscription_cancel: CancelPayload,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Installation {
    #[serde(default)]
    active_subscriptions: Vec<ActiveSubscription>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ActiveSubscriptionsData {
    current_app_installation: Installation,
}

fn first_user_error(errors: Vec<UserError>) -> Result<(), ShopifyError> {
    match errors.into_iter().next() {
        Some(err) => Err(ShopifyError::UserError(err.message)),
        None => Ok(()),
    }
}

fn line_items(plan: &Plan) -> serde_json::Value {
    json!([{
        "plan": {
            "appRecurringPricingDetails": {
                "price": { "amount": plan.price.to_string(), "currencyCode": "USD" },
                "interval": plan.interval.as_graphql()
            }
        }
    }])
}

impl ShopContext {
    /// Start a recurring charge for `plan`.
    ///
    /// The free plan needs no charge and returns `return_url` directly.
    ///
    /// # Errors
    ///
    /// Returns `ShopifyError::UserError` with the first user error Shopify
    /// reports, or any transport/GraphQL error.
    #[instrument(skip(self, return_url), fields(shop = %self.shop(), plan = plan.id))]
    pub async fn create_subscription(
        &self,
        plan: &Plan,
        return_url: &str,
        test: bool,
    ) -> Result<SubscriptionCreated, ShopifyError> {
        if plan.is_free() {
            return Ok(SubscriptionCreated {
                confirmation_url: return_url.to_string(),
                id: None,
            });
        }

        let variables = CreateVariables {
            name: plan.subscription_name(),
            return_url: return_url.to_string(),
            test,
            trial_days: plan.trial_days,
            line_items: line_items(plan),
        };

        let data: CreateData = self
            .execute(APP_SUBSCRIPTION_CREATE, "AppSubscriptionCreate", variables)
            .await?;
        let payload = data.app_subscription_create;
        first_user_error(payload.user_errors)?;

        let confirmation_url = payload.confirmation_url.ok_or_else(|| {
            ShopifyError::Parse("appSubscriptionCreate returned no confirmationUrl".to_string())
        })?;

        Ok(SubscriptionCreated {
            confirmation_url,
            id: payload.app_subscription.map(|s| s.id),
        })
    }

    /// The first active subscription of this installation.
    ///
    /// # Errors
    ///
    /// Returns any transport or GraphQL error.
    #[instrument(skip(self), fields(shop = %self.shop()))]
    pub async fn active_subscription(&self) -> Result<Option<ActiveSubscription>, ShopifyError> {
        let data: ActiveSubscriptionsData = self
            .execute(
                ACTIVE_SUBSCRIPTIONS_QUERY,
                "ActiveSubscriptions",
                serde_json::Map::new(),
            )
            .await?;
        Ok(data
            .current_app_installation
            .active_subscriptions
            .into_iter()
            .next())
    }

    /// Cancel a subscription by GID and return its new status.
    ///
    /// # Errors
    ///
    /// Returns `ShopifyError::UserError` if Shopify rejects the id.
    #[instrument(skip(self), fields(shop = %self.shop()))]
    pub async fn cancel_subscription(&self, id: &str) -> Result<Option<String>, ShopifyError> {
        let data: CancelData = self
            .execute(
                APP_SUBSCRIPTION_CANCEL,
                "AppSubscriptionCancel",
                CancelVariables { id },
            )
            .await?;
        let payload = data.app_subscription_cancel;
        first_user_error(payload.user_errors)?;
        Ok(payload.app_subscription.and_then(|s| s.status))
    }

    /// Cancel whatever subscription Shopify currently reports as active.
    ///
    /// The live installation is the source of truth; `stored` is only used
    /// when the installation query fails. A subscription that Shopify
    /// refuses to cancel because it already ended counts as cancelled.
    /// Returns the id that was cancelled, `None` when nothing was active.
    ///
    /// # Errors
    ///
    /// Returns transport or GraphQL errors from the cancel mutation, or the
    /// installation query error when there is no stored id to fall back on.
    #[instrument(skip(self), fields(shop = %self.shop()))]
    pub async fn cancel_current_subscription(
        &self,
        stored: Option<&str>,
    ) -> Result<Option<String>, ShopifyError> {
        let target = match self.active_subscription().await {
            Ok(active) => active.map(|s| s.id),
            Err(e) => match stored {
                Some(id) => {
                    tracing::warn!(error = %e, "Falling back to stored subscription id");
                    Some(id.to_string())
                }
                None => return Err(e),
            },
        };

        let Some(id) = target else {
            return Ok(None);
        };

        match self.cancel_subscription(&id).await {
            Ok(status) => {
                tracing::info!(subscription = %id, status = ?status, "Subscription cancelled");
                Ok(Some(id))
            }
            Err(ShopifyError::UserError(message)) => {
                tracing::info!(subscription = %id, %message, "Subscription already inactive");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use httpmock::prelude::*;
    use secrecy::SecretString;

    use growth_pilot_core::ShopDomain;
    use growth_pilot_core::billing::{free_plan, plan_by_id};

    use super::*;
    use crate::config::tests::test_config;
    use crate::models::ShopSession;
    use crate::shopify::ShopifyClient;

    const GRAPHQL_PATH: &str = "/admin/api/2025-01/graphql.json";

    fn context(server: &MockServer) -> ShopContext {
        let client = ShopifyClient::with_base_url(&test_config().shopify, &server.base_url());
        client.context(&ShopSession {
            shop: ShopDomain::parse("pilot-demo.myshopify.com").unwrap(),
            access_token: SecretString::from("shpat_test"),
            scopes: vec![],
            installed_at: Utc::now(),
        })
    }

    #[tokio::test]
    async fn test_free_plan_skips_mutation() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path(GRAPHQL_PATH);
                then.status(500);
            })
            .await;

        let created = context(&server)
            .create_subscription(free_plan(), "https://pilot.test/app/billing/confirm", true)
            .await
            .unwrap();

        assert_eq!(created.confirmation_url, "https://pilot.test/app/billing/confirm");
        assert_eq!(created.id, None);
        mock.assert_hits_async(0).await;
    }

    #[tokio::test]
    async fn test_create_subscription() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path(GRAPHQL_PATH)
                    .body_contains("AppSubscriptionCreate")
                    .json_body_partial(
                        r#"{"variables":{"name":"GrowthPilot AI - Starter","test":true,"trialDays":14}}"#,
                    )
                    .body_contains("\"amount\":\"19.99\"")
                    .body_contains("EVERY_30_DAYS");
                then.status(200).json_body(json!({
                    "data": {
                        "appSubscriptionCreate": {
                            "appSubscription": { "id": "gid://shopify/AppSubscription/1", "status": "PENDING" },
                            "confirmationUrl": "https://pilot-demo.myshopify.com/admin/charges/confirm",
                            "userErrors": []
                        }
                    }
                }));
            })
            .await;

        let starter = plan_by_id("starter").unwrap();
        let created = context(&server)
            .create_subscription(starter, "https://pilot.test/app/billing/confirm", true)
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(
            created.confirmation_url,
            "https://pilot-demo.myshopify.com/admin/charges/confirm"
        );
        assert_eq!(created.id.as_deref(), Some("gid://shopify/AppSubscription/1"));
    }

    #[tokio::test]
    async fn test_create_subscription_user_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path(GRAPHQL_PATH);
                then.status(200).json_body(json!({
                    "data": {
                        "appSubscriptionCreate": {
                            "appSubscription": null,
                            "confirmationUrl": null,
                            "userErrors": [
                                { "field": ["returnUrl"], "message": "Return url is invalid" },
                                { "field": null, "message": "second" }
                            ]
                        }
                    }
                }));
            })
            .await;

        let err = context(&server)
            .create_subscription(plan_by_id("professional").unwrap(), "nope", false)
            .await
            .unwrap_err();
        assert!(matches!(err, ShopifyError::UserError(ref m) if m == "Return url is invalid"));
    }

    #[tokio::test]
    async fn test_active_subscription_takes_first() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path(GRAPHQL_PATH).body_contains("ActiveSubscriptions");
                then.status(200).json_body(json!({
                    "data": {
                        "currentAppInstallation": {
                            "activeSubscriptions": [{
                                "id": "gid://shopify/AppSubscription/9",
                                "name": "GrowthPilot AI - Professional",
                                "status": "ACTIVE",
                                "test": true,
                                "trialDays": 14,
                                "currentPeriodEnd": "2025-02-01T00:00:00Z"
                            }]
                        }
                    }
                }));
            })
            .await;

        let sub = context(&server).active_subscription().await.unwrap().unwrap();
        assert_eq!(sub.name, "GrowthPilot AI - Professional");
        assert_eq!(sub.status, "ACTIVE");
        assert!(sub.test);
        assert!(sub.current_period_end.is_some());
    }

    #[tokio::test]
    async fn test_no_active_subscription() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path(GRAPHQL_PATH);
                then.status(200).json_body(json!({
                    "data": { "currentAppInstallation": { "activeSubscriptions": [] } }
                }));
            })
            .await;

        assert!(context(&server).active_subscription().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_cancel_subscription() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path(GRAPHQL_PATH)
                    .json_body_partial(r#"{"variables":{"id":"gid://shopify/AppSubscription/9"}}"#);
                then.status(200).json_body(json!({
                    "data": {
                        "appSubscriptionCancel": {
                            "appSubscription": { "id": "gid://shopify/AppSubscription/9", "status": "CANCELLED" },
                            "userErrors": []
                        }
                    }
                }));
            })
            .await;

        let status = context(&server)
            .cancel_subscription("gid://shopify/AppSubscription/9")
            .await
            .unwrap();
        mock.assert_async().await;
        assert_eq!(status.as_deref(), Some("CANCELLED"));
    }

    fn cancel_payload(status: &str) -> serde_json::Value {
        json!({
            "data": {
                "appSubscriptionCancel": {
                    "appSubscription": { "id": "gid://shopify/AppSubscription/9", "status": status },
                    "userErrors": []
                }
            }
        })
    }

    #[tokio::test]
    async fn test_cancel_current_prefers_live_subscription() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path(GRAPHQL_PATH).body_contains("ActiveSubscriptions");
                then.status(200).json_body(json!({
                    "data": {
                        "currentAppInstallation": {
                            "activeSubscriptions": [{
                                "id": "gid://shopify/AppSubscription/9",
                                "name": "GrowthPilot AI - Starter",
                                "status": "ACTIVE"
                            }]
                        }
                    }
                }));
            })
            .await;
        let cancel = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path(GRAPHQL_PATH)
                    .body_contains("AppSubscriptionCancel")
                    .json_body_partial(r#"{"variables":{"id":"gid://shopify/AppSubscription/9"}}"#);
                then.status(200).json_body(cancel_payload("CANCELLED"));
            })
            .await;

        let cancelled = context(&server)
            .cancel_current_subscription(Some("gid://shopify/AppSubscription/1"))
            .await
            .unwrap();

        cancel.assert_async().await;
        assert_eq!(cancelled.as_deref(), Some("gid://shopify/AppSubscription/9"));
    }

    #[tokio::test]
    async fn test_cancel_current_skips_stale_stored_id() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path(GRAPHQL_PATH).body_contains("ActiveSubscriptions");
                then.status(200).json_body(json!({
                    "data": { "currentAppInstallation": { "activeSubscriptions": [] } }
                }));
            })
            .await;
        let cancel = server
            .mock_async(|when, then| {
                when.method(POST).path(GRAPHQL_PATH).body_contains("AppSubscriptionCancel");
                then.status(200).json_body(cancel_payload("CANCELLED"));
            })
            .await;

        let cancelled = context(&server)
            .cancel_current_subscription(Some("gid://shopify/AppSubscription/1"))
            .await
            .unwrap();

        cancel.assert_hits_async(0).await;
        assert_eq!(cancelled, None);
    }

    #[tokio::test]
    async fn test_cancel_current_treats_user_error_as_cancelled() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path(GRAPHQL_PATH).body_contains("ActiveSubscriptions");
                then.status(503);
            })
            .await;
        let cancel = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path(GRAPHQL_PATH)
                    .body_contains("AppSubscriptionCancel")
                    .json_body_partial(r#"{"variables":{"id":"gid://shopify/AppSubscription/1"}}"#);
                then.status(200).json_body(json!({
                    "data": {
                        "appSubscriptionCancel": {
                            "appSubscription": null,
                            "userErrors": [{ "field": ["id"], "message": "Subscription is not active" }]
                        }
                    }
                }));
            })
            .await;

        let cancelled = context(&server)
            .cancel_current_subscription(Some("gid://shopify/AppSubscription/1"))
            .await
            .unwrap();

        cancel.assert_async().await;
        assert_eq!(cancelled, None);
    }

    #[tokio::test]
    async fn test_cancel_current_without_fallback_propagates() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path(GRAPHQL_PATH);
                then.status(503);
            })
            .await;

        let err = context(&server)
            .cancel_current_subscription(None)
            .await
            .unwrap_err();
        assert!(matches!(err, ShopifyError::Parse(_)));
    }
}
