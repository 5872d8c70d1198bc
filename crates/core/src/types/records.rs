//! Request-scoped records built from Shopify GraphQL nodes.
//!
//! These are the inputs to every aggregation in [`crate::metrics`]. They are
//! never persisted: a loader fetches them, reduces them and drops them.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::{CheckoutId, CustomerId, OrderId, ProductId};
use super::money::CurrencyCode;
use super::status::{FinancialStatus, FulfillmentStatus, ProductStatus};

/// Customer attached to an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCustomer {
    pub id: CustomerId,
    pub display_name: String,
    /// Lifetime order count at fetch time.
    pub number_of_orders: u64,
}

/// A single order line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub title: String,
    pub quantity: u64,
}

/// An order with the money fields the dashboard aggregates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRecord {
    pub id: OrderId,
    /// Display name, e.g. `#1001`.
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub currency: CurrencyCode,
    pub total: Decimal,
    pub subtotal: Decimal,
    pub total_tax: Decimal,
    pub total_shipping: Decimal,
    pub total_discounts: Decimal,
    pub total_refunded: Decimal,
    pub financial_status: FinancialStatus,
    pub fulfillment_status: FulfillmentStatus,
    /// Sales channel name, if Shopify reported one.
    pub channel: Option<String>,
    /// Payment gateway of the first transaction.
    pub gateway: Option<String>,
    /// Billing address country.
    pub country: Option<String>,
    pub customer: Option<OrderCustomer>,
    pub line_items: Vec<LineItem>,
    pub cancelled: bool,
}

impl OrderRecord {
    /// Total units across all line items.
    #[must_use]
    pub fn units(&self) -> u64 {
        self.line_items.iter().map(|li| li.quantity).sum()
    }

    /// Customer display name, or "Guest".
    #[must_use]
    pub fn customer_name(&self) -> &str {
        self.customer
            .as_ref()
            .map_or("Guest", |c| c.display_name.as_str())
    }

    /// Whether the customer had ordered before this order.
    #[must_use]
    pub fn is_returning_customer(&self) -> bool {
        self.customer
            .as_ref()
            .is_some_and(|c| c.number_of_orders > 1)
    }
}

/// A product with inventory totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub id: ProductId,
    pub title: String,
    pub status: ProductStatus,
    /// Sum of inventory across variants and locations. Can be negative when
    /// overselling is allowed.
    pub total_inventory: i64,
    pub price: Decimal,
    pub currency: CurrencyCode,
    pub vendor: Option<String>,
    pub product_type: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A customer with lifetime spend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerRecord {
    pub id: CustomerId,
    pub display_name: String,
    pub email: Option<String>,
    pub orders_count: u64,
    pub amount_spent: Decimal,
    pub currency: CurrencyCode,
    pub country: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An abandoned checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbandonedCheckoutRecord {
    pub id: CheckoutId,
    pub created_at: DateTime<Utc>,
    pub total: Decimal,
}

/// Shop metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShopInfo {
    pub name: String,
    pub email: Option<String>,
    pub myshopify_domain: String,
    pub plan_name: Option<String>,
    pub currency: CurrencyCode,
}
