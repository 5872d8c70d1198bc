//! Fixtures shared by the metric tests.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::types::{
    CurrencyCode, CustomerId, CustomerRecord, FinancialStatus, FulfillmentStatus, LineItem,
    OrderCustomer, OrderId, OrderRecord, ProductId, ProductRecord, ProductStatus,
};

pub fn dec(s: &str) -> Decimal {
    s.parse().unwrap()
}

pub fn at(rfc3339: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(rfc3339)
        .unwrap()
        .with_timezone(&Utc)
}

pub fn order(created_at: &str, total: &str) -> OrderRecord {
    let total = dec(total);
    OrderRecord {
        id: OrderId::new(format!("gid://shopify/Order/{}", at(created_at).timestamp())),
        name: "#1001".to_string(),
        created_at: at(created_at),
        currency: CurrencyCode::USD,
        total,
        subtotal: total,
        total_tax: Decimal::ZERO,
        total_shipping: Decimal::ZERO,
        total_discounts: Decimal::ZERO,
        total_refunded: Decimal::ZERO,
        financial_status: FinancialStatus::Paid,
        fulfillment_status: FulfillmentStatus::Fulfilled,
        channel: None,
        gateway: None,
        country: None,
        customer: None,
        line_items: vec![LineItem {
            title: "Widget".to_string(),
            quantity: 1,
        }],
        cancelled: false,
    }
}

pub fn with_customer(mut order: OrderRecord, id: u64, number_of_orders: u64) -> OrderRecord {
    order.customer = Some(OrderCustomer {
        id: CustomerId::new(format!("gid://shopify/Customer/{id}")),
        display_name: format!("Customer {id}"),
        number_of_orders,
    });
    order
}

pub fn product(title: &str, status: ProductStatus, inventory: i64) -> ProductRecord {
    ProductRecord {
        id: ProductId::new(format!("gid://shopify/Product/{title}")),
        title: title.to_string(),
        status,
        total_inventory: inventory,
        price: dec("10.00"),
        currency: CurrencyCode::USD,
        vendor: None,
        product_type: None,
        created_at: at("2024-01-01T00:00:00Z"),
    }
}

pub fn customer(
    id: u64,
    orders_count: u64,
    spent: &str,
    created_at: &str,
    updated_at: &str,
) -> CustomerRecord {
    CustomerRecord {
        id: CustomerId::new(format!("gid://shopify/Customer/{id}")),
        display_name: format!("Customer {id}"),
        email: Some(format!("c{id}@example.com")),
        orders_count,
        amount_spent: dec(spent),
        currency: CurrencyCode::USD,
        country: None,
        created_at: at(created_at),
        updated_at: at(updated_at),
    }
}
