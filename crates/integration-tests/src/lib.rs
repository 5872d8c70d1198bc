//! Integration tests for GrowthPilot AI.
//!
//! # Running Tests
//!
//! ```bash
//! # Core property tests (no server needed)
//! cargo test -p growth-pilot-integration-tests
//!
//! # Server tests, against `cargo run -p growth-pilot-app`
//! GP_BASE_URL=http://localhost:3000 SHOPIFY_API_SECRET=... \
//!     cargo test -p growth-pilot-integration-tests -- --ignored
//! ```
//!
//! # Test Categories
//!
//! - `core_properties` - invariants of the metrics and billing rules over
//!   generated order sets
//! - `server` - HTTP behavior of a running server

use chrono::{DateTime, TimeDelta, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;

use growth_pilot_core::{
    CurrencyCode, CustomerId, FinancialStatus, FulfillmentStatus, LineItem, OrderCustomer,
    OrderId, OrderRecord,
};

/// Base URL of the server under test.
#[must_use]
pub fn base_url() -> String {
    std::env::var("GP_BASE_URL").unwrap_or_else(|_| "http://localhost:3000".to_string())
}

/// Client with a cookie jar that does not follow redirects.
///
/// # Panics
///
/// Panics if the TLS backend cannot be initialized.
#[must_use]
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .cookie_store(true)
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .expect("Failed to create HTTP client")
}

/// Start of the generated order window.
///
/// # Panics
///
/// Never, the timestamp is a constant.
#[must_use]
pub fn window_start() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2025-03-01T00:00:00Z")
        .expect("valid timestamp")
        .with_timezone(&Utc)
}

/// Seeded generator of plausible order sets.
pub struct OrderGenerator {
    rng: StdRng,
    next_id: u64,
}

impl OrderGenerator {
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            next_id: 1000,
        }
    }

    /// One order somewhere in the 60 days after [`window_start`].
    pub fn order(&mut self) -> OrderRecord {
        self.next_id += 1;
        let minutes = self.rng.random_range(0..60 * 24 * 60);
        let total = Decimal::new(self.rng.random_range(0..50_000), 2);
        let customer = self.rng.random_range(1..20_u64);
        let refunded = if self.rng.random_bool(0.1) {
            total / Decimal::TWO
        } else {
            Decimal::ZERO
        };

        OrderRecord {
            id: OrderId::new(format!("gid://shopify/Order/{}", self.next_id)),
            name: format!("#{}", self.next_id),
            created_at: window_start() + TimeDelta::minutes(minutes),
            currency: CurrencyCode::USD,
            total,
            subtotal: total,
            total_tax: Decimal::ZERO,
            total_shipping: Decimal::ZERO,
            total_discounts: Decimal::ZERO,
            total_refunded: refunded,
            financial_status: if refunded.is_zero() {
                FinancialStatus::Paid
            } else {
                FinancialStatus::PartiallyRefunded
            },
            fulfillment_status: if self.rng.random_bool(0.5) {
                FulfillmentStatus::Fulfilled
            } else {
                FulfillmentStatus::Unfulfilled
            },
            channel: Some("web".to_string()),
            gateway: Some("shopify_payments".to_string()),
            country: Some("Canada".to_string()),
            customer: Some(OrderCustomer {
                id: CustomerId::new(format!("gid://shopify/Customer/{customer}")),
                display_name: format!("Customer {customer}"),
                number_of_orders: self.rng.random_range(1..6),
            }),
            line_items: vec![LineItem {
                title: "Widget".to_string(),
                quantity: self.rng.random_range(1..4),
            }],
            cancelled: false,
        }
    }

    /// Between zero and `max` orders.
    pub fn orders(&mut self, max: usize) -> Vec<OrderRecord> {
        let count = self.rng.random_range(0..=max);
        (0..count).map(|_| self.order()).collect()
    }

    pub fn count(&mut self, max: u64) -> u64 {
        self.rng.random_range(0..=max)
    }
}
