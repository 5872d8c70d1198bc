//! GraphQL documents for the Shopify Admin API and the shapes of their
//! responses.
//!
//! Documents are sent through `graphql_client::QueryBody`; responses are
//! deserialized with serde into the node types below. Only the fields the
//! dashboard reads are requested.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, de::DeserializeOwned};

use growth_pilot_core::{FinancialStatus, FulfillmentStatus, ProductStatus};

// =============================================================================
// Pagination
// =============================================================================

/// Variables shared by every paginated query.
#[derive(Debug, Clone, Serialize)]
pub struct PageVariables {
    pub first: u32,
    pub after: Option<String>,
    pub query: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub has_next_page: bool,
    pub end_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection<T> {
    #[serde(default = "Vec::new")]
    pub nodes: Vec<T>,
    #[serde(default)]
    pub page_info: PageInfo,
}

/// A query that returns one cursor-paginated connection.
pub trait PaginatedQuery {
    type Data: DeserializeOwned;
    type Node;

    const QUERY: &'static str;
    const OPERATION_NAME: &'static str;
    /// Nodes requested per page. Sized so the query's estimated cost stays
    /// under the Admin API limit of 1000 points.
    const PAGE_SIZE: u32;

    fn connection(data: Self::Data) -> Connection<Self::Node>;
}

// =============================================================================
// Shared node shapes
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoneyV2 {
    pub amount: String,
    #[serde(default)]
    pub currency_code: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoneyBag {
    pub shop_money: MoneyV2,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AddressNode {
    pub country: Option<String>,
}

/// `UnsignedInt64` arrives as a string; accept numbers too.
fn lenient_u64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(u64),
        Text(String),
        Missing(Option<()>),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Number(n) => n,
        Raw::Text(s) => s.trim().parse().unwrap_or(0),
        Raw::Missing(_) => 0,
    })
}

// =============================================================================
// Orders
// =============================================================================

pub const ORDERS_QUERY: &str = r"
query Orders($first: Int!, $after: String, $query: String) {
  orders(first: $first, after: $after, query: $query, sortKey: CREATED_AT, reverse: true) {
    pageInfo { hasNextPage endCursor }
    nodes {
      id
      name
      createdAt
      cancelledAt
      currencyCode
      displayFinancialStatus
      displayFulfillmentStatus
      channelInformation { channelDefinition { channelName } }
      paymentGatewayNames
      totalPriceSet { shopMoney { amount currencyCode } }
      subtotalPriceSet { shopMoney { amount } }
      totalTaxSet { shopMoney { amount } }
      totalShippingPriceSet { shopMoney { amount } }
      totalDiscountsSet { shopMoney { amount } }
      totalRefundedSet { shopMoney { amount } }
      billingAddress { country }
      customer { id displayName numberOfOrders }
      lineItems(first: 5) { nodes { title quantity } }
    }
  }
}
";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderCustomerNode {
    pub id: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub number_of_orders: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LineItemNode {
    pub title: String,
    #[serde(default)]
    pub quantity: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LineItemConnection {
    #[serde(default)]
    pub nodes: Vec<LineItemNode>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelDefinitionNode {
    #[serde(default)]
    pub channel_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelInformationNode {
    #[serde(default)]
    pub channel_definition: Option<ChannelDefinitionNode>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderNode {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub cancelled_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub currency_code: Option<String>,
    #[serde(default)]
    pub display_financial_status: Option<FinancialStatus>,
    #[serde(default)]
    pub display_fulfillment_status: Option<FulfillmentStatus>,
    #[serde(default)]
    pub channel_information: Option<ChannelInformationNode>,
    #[serde(default)]
    pub payment_gateway_names: Vec<String>,
    #[serde(default)]
    pub total_price_set: Option<MoneyBag>,
    #[serde(default)]
    pub subtotal_price_set: Option<MoneyBag>,
    #[serde(default)]
    pub total_tax_set: Option<MoneyBag>,
    #[serde(default)]
    pub total_shipping_price_set: Option<MoneyBag>,
    #[serde(default)]
    pub total_discounts_set: Option<MoneyBag>,
    #[serde(default)]
    pub total_refunded_set: Option<MoneyBag>,
    #[serde(default)]
    pub billing_address: Option<AddressNode>,
    #[serde(default)]
    pub customer: Option<OrderCustomerNode>,
    #[serde(default)]
    pub line_items: Option<LineItemConnection>,
}

#[derive(Debug, Deserialize)]
pub struct OrdersData {
    pub orders: Connection<OrderNode>,
}

pub struct OrdersQuery;

impl PaginatedQuery for OrdersQuery {
    type Data = OrdersData;
    type Node = OrderNode;

    const QUERY: &'static str = ORDERS_QUERY;
    const OPERATION_NAME: &'static str = "Orders";
    const PAGE_SIZE: u32 = 50;

    fn connection(data: OrdersData) -> Connection<OrderNode> {
        data.orders
    }
}

// =============================================================================
// Products
// =============================================================================

pub const PRODUCTS_QUERY: &str = r"
query Products($first: Int!, $after: String, $query: String) {
  products(first: $first, after: $after, query: $query, sortKey: TITLE) {
    pageInfo { hasNextPage endCursor }
    nodes {
      id
      title
      status
      totalInventory
      vendor
      productType
      createdAt
      priceRangeV2 { minVariantPrice { amount currencyCode } }
    }
  }
}
";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceRange {
    pub min_variant_price: MoneyV2,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductNode {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub status: Option<ProductStatus>,
    #[serde(default)]
    pub total_inventory: Option<i64>,
    #[serde(default)]
    pub vendor: Option<String>,
    #[serde(default)]
    pub product_type: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub price_range_v2: Option<PriceRange>,
}

#[derive(Debug, Deserialize)]
pub struct ProductsData {
    pub products: Connection<ProductNode>,
}

pub struct ProductsQuery;

impl PaginatedQuery for ProductsQuery {
    type Data = ProductsData;
    type Node = ProductNode;

    const QUERY: &'static str = PRODUCTS_QUERY;
    const OPERATION_NAME: &'static str = "Products";
    const PAGE_SIZE: u32 = 100;

    fn connection(data: ProductsData) -> Connection<ProductNode> {
        data.products
    }
}

// =============================================================================
// Customers
// =============================================================================

pub const CUSTOMERS_QUERY: &str = r"
query Customers($first: Int!, $after: String, $query: String) {
  customers(first: $first, after: $after, query: $query, sortKey: UPDATED_AT, reverse: true) {
    pageInfo { hasNextPage endCursor }
    nodes {
      id
      displayName
      email
      numberOfOrders
      amountSpent { amount currencyCode }
      defaultAddress { country }
      createdAt
      updatedAt
    }
  }
}
";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerNode {
    pub id: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub number_of_orders: u64,
    #[serde(default)]
    pub amount_spent: Option<MoneyV2>,
    #[serde(default)]
    pub default_address: Option<AddressNode>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CustomersData {
    pub customers: Connection<CustomerNode>,
}

pub struct CustomersQuery;

impl PaginatedQuery for CustomersQuery {
    type Data = CustomersData;
    type Node = CustomerNode;

    const QUERY: &'static str = CUSTOMERS_QUERY;
    const OPERATION_NAME: &'static str = "Customers";
    const PAGE_SIZE: u32 = 100;

    fn connection(data: CustomersData) -> Connection<CustomerNode> {
        data.customers
    }
}

// =============================================================================
// Abandoned checkouts
// =============================================================================

pub const ABANDONED_CHECKOUTS_QUERY: &str = r"
query AbandonedCheckouts($first: Int!, $after: String, $query: String) {
  abandonedCheckouts(first: $first, after: $after, query: $query, sortKey: CREATED_AT, reverse: true) {
    pageInfo { hasNextPage endCursor }
    nodes {
      id
      createdAt
      totalPriceSet { shopMoney { amount } }
    }
  }
}
";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AbandonedCheckoutNode {
    pub id: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub total_price_set: Option<MoneyBag>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AbandonedCheckoutsData {
    pub abandoned_checkouts: Connection<AbandonedCheckoutNode>,
}

pub struct AbandonedCheckoutsQuery;

impl PaginatedQuery for AbandonedCheckoutsQuery {
    type Data = AbandonedCheckoutsData;
    type Node = AbandonedCheckoutNode;

    const QUERY: &'static str = ABANDONED_CHECKOUTS_QUERY;
    const OPERATION_NAME: &'static str = "AbandonedCheckouts";
    const PAGE_SIZE: u32 = 100;

    fn connection(data: AbandonedCheckoutsData) -> Connection<AbandonedCheckoutNode> {
        data.abandoned_checkouts
    }
}

// =============================================================================
// Shop
// =============================================================================

pub const SHOP_QUERY: &str = r"
query Shop {
  shop {
    name
    email
    myshopifyDomain
    currencyCode
    plan { displayName }
  }
}
";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShopPlanNode {
    #[serde(default)]
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShopNode {
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    pub myshopify_domain: String,
    #[serde(default)]
    pub currency_code: Option<String>,
    #[serde(default)]
    pub plan: Option<ShopPlanNode>,
}

#[derive(Debug, Deserialize)]
pub struct ShopData {
    pub shop: ShopNode,
}

// =============================================================================
// Billing
// =============================================================================

pub const APP_SUBSCRIPTION_CREATE: &str = r"
mutation AppSubscriptionCreate(
  $name: String!
  $returnUrl: URL!
  $test: Boolean
  $trialDays: Int
  $lineItems: [AppSubscriptionLineItemInput!]!
) {
  appSubscriptionCreate(
    name: $name
    returnUrl: $returnUrl
    test: $test
    trialDays: $trialDays
    lineItems: $lineItems
  ) {
    appSubscription { id status }
    confirmationUrl
    userErrors { field message }
  }
}
";

pub const APP_SUBSCRIPTION_CANCEL: &str = r"
mutation AppSubscriptionCancel($id: ID!) {
  appSubscriptionCancel(id: $id) {
    appSubscription { id status }
    userErrors { field message }
  }
}
";

pub const ACTIVE_SUBSCRIPTIONS_QUERY: &str = r"
query ActiveSubscriptions {
  currentAppInstallation {
    activeSubscriptions {
      id
      name
      status
      test
      trialDays
      currentPeriodEnd
    }
  }
}
";

// =============================================================================
// Webhooks
// =============================================================================

pub const WEBHOOK_SUBSCRIPTION_CREATE: &str = r"
mutation WebhookSubscriptionCreate(
  $topic: WebhookSubscriptionTopic!
  $webhookSubscription: WebhookSubscriptionInput!
) {
  webhookSubscriptionCreate(topic: $topic, webhookSubscription: $webhookSubscription) {
    webhookSubscription { id }
    userErrors { field message }
  }
}
";

#[derive(Debug, Clone, Deserialize)]
pub struct UserError {
    #[serde(default)]
    pub field: Option<Vec<String>>,
    pub message: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppSubscriptionNode {
    pub id: String,
    #[serde(default)]
    pub status: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_node_tolerates_missing_fields() {
        let node: OrderNode = serde_json::from_value(serde_json::json!({
            "id": "gid://shopify/Order/1",
            "name": "#1001",
            "createdAt": "2024-03-01T10:00:00Z",
            "displayFinancialStatus": "PAID",
            "customer": { "id": "gid://shopify/Customer/7", "numberOfOrders": "3" }
        }))
        .unwrap();

        assert_eq!(node.display_financial_status, Some(FinancialStatus::Paid));
        assert!(node.total_price_set.is_none());
        assert!(node.payment_gateway_names.is_empty());
        assert_eq!(node.customer.unwrap().number_of_orders, 3);
    }

    #[test]
    fn test_lenient_u64_accepts_numbers_and_null() {
        let numeric: OrderCustomerNode = serde_json::from_value(serde_json::json!({
            "id": "gid://shopify/Customer/7",
            "numberOfOrders": 12
        }))
        .unwrap();
        assert_eq!(numeric.number_of_orders, 12);

        let null: OrderCustomerNode = serde_json::from_value(serde_json::json!({
            "id": "gid://shopify/Customer/7",
            "numberOfOrders": null
        }))
        .unwrap();
        assert_eq!(null.number_of_orders, 0);
    }

    #[test]
    fn test_connection_defaults() {
        let data: ProductsData = serde_json::from_value(serde_json::json!({
            "products": { "nodes": [] }
        }))
        .unwrap();
        assert!(!data.products.page_info.has_next_page);
        assert!(data.products.page_info.end_cursor.is_none());
    }
}
