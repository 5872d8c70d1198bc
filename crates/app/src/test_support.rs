//! Record fixtures for unit tests.

use chrono::{DateTime, TimeDelta, Utc};
use rust_decimal::Decimal;

use growth_pilot_core::{
    CurrencyCode, CustomerId, FinancialStatus, FulfillmentStatus, LineItem, OrderCustomer,
    OrderId, OrderRecord, ProductId, ProductRecord, ProductStatus,
};

pub fn base_time() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2025-01-15T12:00:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

/// An order placed `minutes` after [`base_time`].
pub fn order(name: &str, minutes: i64, total: &str) -> OrderRecord {
    let total: Decimal = total.parse().unwrap();
    OrderRecord {
        id: OrderId::new(format!("gid://shopify/Order/{}", 1000 + minutes)),
        name: name.to_string(),
        created_at: base_time() + TimeDelta::minutes(minutes),
        currency: CurrencyCode::USD,
        total,
        subtotal: total,
        total_tax: Decimal::ZERO,
        total_shipping: Decimal::ZERO,
        total_discounts: Decimal::ZERO,
        total_refunded: Decimal::ZERO,
        financial_status: FinancialStatus::Paid,
        fulfillment_status: FulfillmentStatus::Unfulfilled,
        channel: Some("web".to_string()),
        gateway: Some("shopify_payments".to_string()),
        country: Some("United States".to_string()),
        customer: Some(OrderCustomer {
            id: CustomerId::new("gid://shopify/Customer/1"),
            display_name: "Ada Lovelace".to_string(),
            number_of_orders: 1,
        }),
        line_items: vec![LineItem {
            title: "Widget".to_string(),
            quantity: 1,
        }],
        cancelled: false,
    }
}

pub fn product(title: &str, status: ProductStatus, inventory: i64) -> ProductRecord {
    ProductRecord {
        id: ProductId::new(format!("gid://shopify/Product/{}", title.len())),
        title: title.to_string(),
        status,
        total_inventory: inventory,
        price: Decimal::new(2500, 2),
        currency: CurrencyCode::USD,
        vendor: None,
        product_type: None,
        created_at: base_time(),
    }
}
