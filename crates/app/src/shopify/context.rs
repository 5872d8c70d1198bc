//! Per-shop GraphQL execution and the paginated data loaders.

use chrono::NaiveDate;
use graphql_client::QueryBody;
use secrecy::{ExposeSecret, SecretString};
use serde::{Serialize, de::DeserializeOwned};
use tracing::instrument;

use growth_pilot_core::{
    AbandonedCheckoutRecord, CustomerRecord, OrderRecord, ProductRecord, ShopDomain, ShopInfo,
};

use super::conversions::{
    abandoned_checkout_record, customer_record, order_record, product_record, shop_info,
};
use super::queries::{
    AbandonedCheckoutsQuery, CustomersQuery, OrdersQuery, PageVariables, PaginatedQuery,
    ProductsQuery, SHOP_QUERY, ShopData,
};
use super::{ShopifyClient, ShopifyError};

/// Upper bound on pages fetched per query.
pub const MAX_PAGES: usize = 10;

const DEFAULT_RETRY_AFTER: u64 = 2;

/// Shopify sends `Retry-After` as fractional seconds, e.g. `2.0`.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn retry_after_secs(value: &str) -> u64 {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|secs| secs.is_finite() && *secs >= 0.0)
        .map_or(DEFAULT_RETRY_AFTER, |secs| secs.ceil() as u64)
}

/// GraphQL handle for one installed shop.
#[derive(Clone)]
pub struct ShopContext {
    client: ShopifyClient,
    shop: ShopDomain,
    access_token: SecretString,
}

impl ShopContext {
    pub(super) const fn new(
        client: ShopifyClient,
        shop: ShopDomain,
        access_token: SecretString,
    ) -> Self {
        Self {
            client,
            shop,
            access_token,
        }
    }

    #[must_use]
    pub const fn shop(&self) -> &ShopDomain {
        &self.shop
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/admin/api/{}/graphql.json",
            self.client.shop_base(&self.shop),
            self.client.api_version()
        )
    }

    /// Execute one GraphQL operation and return its `data`.
    pub(super) async fn execute<V, D>(
        &self,
        query: &'static str,
        operation_name: &'static str,
        variables: V,
    ) -> Result<D, ShopifyError>
    where
        V: Serialize,
        D: DeserializeOwned,
    {
        let body = QueryBody {
            variables,
            query,
            operation_name,
        };

        let response = self
            .client
            .http()
            .post(self.endpoint())
            .header("X-Shopify-Access-Token", self.access_token.expose_secret())
            .json(&body)
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .map_or(DEFAULT_RETRY_AFTER, retry_after_secs);
            return Err(ShopifyError::RateLimited(retry_after));
        }

        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            return Err(ShopifyError::Unauthorized(
                "Invalid or expired access token".to_string(),
            ));
        }

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(ShopifyError::Parse(format!("HTTP {status}: {text}")));
        }

        let text = response.text().await?;
        let envelope: graphql_client::Response<D> = serde_json::from_str(&text)
            .map_err(|e| ShopifyError::Parse(format!("{operation_name}: {e}")))?;

        if let Some(errors) = envelope.errors
            && !errors.is_empty()
        {
            return Err(ShopifyError::GraphQL(
                errors.into_iter().map(|e| e.message).collect(),
            ));
        }

        envelope
            .data
            .ok_or_else(|| ShopifyError::Parse(format!("{operation_name}: no data in response")))
    }

    /// Follow `pageInfo.endCursor` for up to [`MAX_PAGES`] pages.
    ///
    /// An error on the first page is returned. An error on a later page is
    /// logged and ends the loop with the nodes collected so far.
    ///
    /// # Errors
    ///
    /// Returns the first page's `ShopifyError`.
    #[instrument(skip(self), fields(shop = %self.shop, operation = Q::OPERATION_NAME))]
    pub async fn fetch_all_pages<Q: PaginatedQuery>(
        &self,
        search: Option<String>,
    ) -> Result<Vec<Q::Node>, ShopifyError> {
        let mut nodes = Vec::new();
        let mut after: Option<String> = None;

        for page in 0..MAX_PAGES {
            let variables = PageVariables {
                first: Q::PAGE_SIZE,
                after: after.take(),
                query: search.clone(),
            };

            let data = match self
                .execute::<_, Q::Data>(Q::QUERY, Q::OPERATION_NAME, variables)
                .await
            {
                Ok(data) => data,
                Err(e) if page == 0 => return Err(e),
                Err(e) => {
                    tracing::warn!(
                        page,
                        fetched = nodes.len(),
                        error = %e,
                        "Stopping pagination after page error"
                    );
                    break;
                }
            };

            let connection = Q::connection(data);
            nodes.extend(connection.nodes);

            match connection.page_info.end_cursor {
                Some(cursor) if connection.page_info.has_next_page => after = Some(cursor),
                _ => return Ok(nodes),
            }
        }

        if after.is_some() {
            tracing::debug!(fetched = nodes.len(), "Page limit reached");
        }
        Ok(nodes)
    }

    /// Orders created on or after `since`, newest first.
    ///
    /// # Errors
    ///
    /// Returns `ShopifyError` if the first page fails.
    pub async fn orders_since(&self, since: NaiveDate) -> Result<Vec<OrderRecord>, ShopifyError> {
        let search = format!("created_at:>={}", since.format("%Y-%m-%d"));
        let nodes = self.fetch_all_pages::<OrdersQuery>(Some(search)).await?;
        Ok(nodes.into_iter().map(order_record).collect())
    }

    /// All products.
    ///
    /// # Errors
    ///
    /// Returns `ShopifyError` if the first page fails.
    pub async fn products(&self) -> Result<Vec<ProductRecord>, ShopifyError> {
        let nodes = self.fetch_all_pages::<ProductsQuery>(None).await?;
        Ok(nodes.into_iter().map(product_record).collect())
    }

    /// All customers, most recently updated first.
    ///
    /// # Errors
    ///
    /// Returns `ShopifyError` if the first page fails.
    pub async fn customers(&self) -> Result<Vec<CustomerRecord>, ShopifyError> {
        let nodes = self.fetch_all_pages::<CustomersQuery>(None).await?;
        Ok(nodes.into_iter().map(customer_record).collect())
    }

    /// Abandoned checkouts created on or after `since`.
    ///
    /// # Errors
    ///
    /// Returns `ShopifyError` if the first page fails.
    pub async fn abandoned_checkouts_since(
        &self,
        since: NaiveDate,
    ) -> Result<Vec<AbandonedCheckoutRecord>, ShopifyError> {
        let search = format!("created_at:>={}", since.format("%Y-%m-%d"));
        let nodes = self
            .fetch_all_pages::<AbandonedCheckoutsQuery>(Some(search))
            .await?;
        Ok(nodes.into_iter().map(abandoned_checkout_record).collect())
    }

    /// Shop metadata.
    ///
    /// # Errors
    ///
    /// Returns `ShopifyError` if the query fails.
    #[instrument(skip(self), fields(shop = %self.shop))]
    pub async fn shop_info(&self) -> Result<ShopInfo, ShopifyError> {
        let data: ShopData = self
            .execute(SHOP_QUERY, "Shop", serde_json::json!({}))
            .await?;
        Ok(shop_info(data.shop))
    }
}

#[cfg(test)]
mod tests {
    use httpmock::prelude::*;
    use serde_json::json;

    use super::*;
    use crate::config::tests::test_config;
    use crate::models::ShopSession;

    const GRAPHQL_PATH: &str = "/admin/api/2025-01/graphql.json";

    fn context(server: &MockServer) -> ShopContext {
        let client = ShopifyClient::with_base_url(&test_config().shopify, &server.base_url());
        client.context(&ShopSession {
            shop: ShopDomain::parse("pilot-demo.myshopify.com").unwrap(),
            access_token: SecretString::from("shpat_test"),
            scopes: vec![],
            installed_at: chrono::Utc::now(),
        })
    }

    fn product(n: usize) -> serde_json::Value {
        json!({
            "id": format!("gid://shopify/Product/{n}"),
            "title": format!("Product {n}"),
            "status": "ACTIVE",
            "totalInventory": 5,
            "createdAt": "2024-01-01T00:00:00Z",
            "priceRangeV2": { "minVariantPrice": { "amount": "12.50", "currencyCode": "USD" } }
        })
    }

    fn page(nodes: Vec<serde_json::Value>, next: Option<&str>) -> serde_json::Value {
        json!({
            "data": {
                "products": {
                    "nodes": nodes,
                    "pageInfo": { "hasNextPage": next.is_some(), "endCursor": next }
                }
            }
        })
    }

    #[test]
    fn test_retry_after_parsing() {
        assert_eq!(retry_after_secs("2.0"), 2);
        assert_eq!(retry_after_secs("0.5"), 1);
        assert_eq!(retry_after_secs("soon"), DEFAULT_RETRY_AFTER);
    }

    #[tokio::test]
    async fn test_fetch_follows_cursor() {
        let server = MockServer::start_async().await;
        let first = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path(GRAPHQL_PATH)
                    .header("X-Shopify-Access-Token", "shpat_test")
                    .json_body_partial(r#"{"variables": {"after": null}}"#);
                then.status(200).json_body(page(vec![product(1), product(2)], Some("c1")));
            })
            .await;
        let second = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path(GRAPHQL_PATH)
                    .json_body_partial(r#"{"variables": {"after": "c1"}}"#);
                then.status(200).json_body(page(vec![product(3)], None));
            })
            .await;

        let products = context(&server).products().await.unwrap();

        first.assert_async().await;
        second.assert_async().await;
        assert_eq!(products.len(), 3);
        assert_eq!(products[2].title, "Product 3");
        assert_eq!(products[0].price.to_string(), "12.50");
    }

    #[tokio::test]
    async fn test_fetch_stops_at_max_pages() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path(GRAPHQL_PATH);
                then.status(200).json_body(page(vec![product(1)], Some("again")));
            })
            .await;

        let products = context(&server).products().await.unwrap();

        mock.assert_hits_async(MAX_PAGES).await;
        assert_eq!(products.len(), MAX_PAGES);
    }

    #[tokio::test]
    async fn test_first_page_error_propagates() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path(GRAPHQL_PATH);
                then.status(200)
                    .json_body(json!({ "errors": [{ "message": "Access denied for products field." }] }));
            })
            .await;

        let err = context(&server).products().await.unwrap_err();
        match err {
            ShopifyError::GraphQL(messages) => {
                assert_eq!(messages, vec!["Access denied for products field."]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_later_page_error_keeps_collected_nodes() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST)
                    .path(GRAPHQL_PATH)
                    .json_body_partial(r#"{"variables": {"after": null}}"#);
                then.status(200).json_body(page(vec![product(1), product(2)], Some("c1")));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(POST)
                    .path(GRAPHQL_PATH)
                    .json_body_partial(r#"{"variables": {"after": "c1"}}"#);
                then.status(500).body("upstream exploded");
            })
            .await;

        let products = context(&server).products().await.unwrap();
        assert_eq!(products.len(), 2);
    }

    #[tokio::test]
    async fn test_rate_limit_and_unauthorized() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path(GRAPHQL_PATH);
                then.status(429).header("Retry-After", "2.0");
            })
            .await;
        let err = context(&server).shop_info().await.unwrap_err();
        assert!(matches!(err, ShopifyError::RateLimited(2)));

        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path(GRAPHQL_PATH);
                then.status(401);
            })
            .await;
        let err = context(&server).shop_info().await.unwrap_err();
        assert!(matches!(err, ShopifyError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn test_orders_request_stays_under_cost_limit() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path(GRAPHQL_PATH)
                    .json_body_partial(r#"{"operationName": "Orders", "variables": {"first": 50}}"#)
                    .body_contains("lineItems(first: 5)");
                then.status(200).json_body(json!({
                    "data": {
                        "orders": {
                            "nodes": [],
                            "pageInfo": { "hasNextPage": false, "endCursor": null }
                        }
                    }
                }));
            })
            .await;

        let since = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let orders = context(&server).orders_since(since).await.unwrap();

        mock.assert_async().await;
        assert!(orders.is_empty());
        assert_eq!(OrdersQuery::PAGE_SIZE, 50);
    }

    #[tokio::test]
    async fn test_orders_since_sends_search_query() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path(GRAPHQL_PATH)
                    .json_body_partial(
                        r#"{"operationName": "Orders", "variables": {"query": "created_at:>=2024-03-01"}}"#,
                    );
                then.status(200).json_body(json!({
                    "data": {
                        "orders": {
                            "nodes": [{
                                "id": "gid://shopify/Order/1",
                                "name": "#1001",
                                "createdAt": "2024-03-02T09:30:00Z",
                                "currencyCode": "USD",
                                "displayFinancialStatus": "PAID",
                                "displayFulfillmentStatus": "UNFULFILLED",
                                "totalPriceSet": { "shopMoney": { "amount": "42.00", "currencyCode": "USD" } },
                                "lineItems": { "nodes": [{ "title": "Widget", "quantity": 2 }] }
                            }],
                            "pageInfo": { "hasNextPage": false, "endCursor": null }
                        }
                    }
                }));
            })
            .await;

        let since = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let orders = context(&server).orders_since(since).await.unwrap();

        mock.assert_async().await;
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].total.to_string(), "42.00");
        assert_eq!(orders[0].units(), 2);
        assert_eq!(orders[0].customer_name(), "Guest");
    }
}
