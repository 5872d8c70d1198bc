//! View-model pieces shared by the page handlers.
//!
//! View-models carry pre-formatted strings next to the raw numbers so the
//! templates and the `/api` mirrors show the same values.

use chrono::{DateTime, NaiveDate, TimeDelta, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use growth_pilot_core::metrics::bar_heights;
use growth_pilot_core::{
    CurrencyCode, CustomerRecord, OrderRecord, ProductRecord, ProductStatus, format_count,
    format_currency,
};

use crate::models::ShopSession;
use crate::shopify::ShopifyError;

/// Reporting window selected with `?range=`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DateRange {
    Week,
    #[default]
    Month,
    Quarter,
}

impl DateRange {
    pub const ALL: [Self; 3] = [Self::Week, Self::Month, Self::Quarter];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Week => "7d",
            Self::Month => "30d",
            Self::Quarter => "90d",
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Week => "Last 7 days",
            Self::Month => "Last 30 days",
            Self::Quarter => "Last 90 days",
        }
    }

    #[must_use]
    pub const fn days(self) -> u32 {
        match self {
            Self::Week => 7,
            Self::Month => 30,
            Self::Quarter => 90,
        }
    }

    /// First day inside the window ending `today`.
    #[must_use]
    pub fn since(self, today: NaiveDate) -> NaiveDate {
        today - TimeDelta::days(i64::from(self.days()) - 1)
    }
}

impl std::str::FromStr for DateRange {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|r| r.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("invalid range: {s}"))
    }
}

/// `?range=` query. Unknown values fall back to 30 days.
#[derive(Debug, Default, Deserialize)]
pub struct RangeQuery {
    pub range: Option<String>,
}

impl RangeQuery {
    #[must_use]
    pub fn range(&self) -> DateRange {
        self.range
            .as_deref()
            .and_then(|r| r.parse().ok())
            .unwrap_or_default()
    }
}

/// Range picker option.
#[derive(Debug, Clone, Serialize)]
pub struct RangeOption {
    pub value: &'static str,
    pub label: &'static str,
    pub selected: bool,
}

#[must_use]
pub fn range_options(current: DateRange) -> Vec<RangeOption> {
    DateRange::ALL
        .into_iter()
        .map(|r| RangeOption {
            value: r.as_str(),
            label: r.label(),
            selected: r == current,
        })
        .collect()
}

const NAV: [(&str, &str); 9] = [
    ("/app", "Dashboard"),
    ("/app/sales", "Sales"),
    ("/app/products", "Products"),
    ("/app/customers", "Customers"),
    ("/app/orders", "Orders"),
    ("/app/ai-insights", "AI Insights"),
    ("/app/alerts", "Alerts"),
    ("/app/billing", "Billing"),
    ("/app/settings", "Settings"),
];

#[derive(Debug, Clone)]
pub struct NavLink {
    pub href: &'static str,
    pub label: &'static str,
    pub active: bool,
}

/// Layout data every page template needs.
#[derive(Debug, Clone)]
pub struct Chrome {
    pub shop: String,
    pub current_path: &'static str,
}

impl Chrome {
    #[must_use]
    pub fn new(session: &ShopSession, current_path: &'static str) -> Self {
        Self {
            shop: session.shop.as_str().to_string(),
            current_path,
        }
    }

    #[must_use]
    pub fn nav(&self) -> Vec<NavLink> {
        NAV.iter()
            .map(|&(href, label)| NavLink {
                href,
                label,
                active: href == self.current_path,
            })
            .collect()
    }
}

/// A KPI card.
#[derive(Debug, Clone, Serialize)]
pub struct Kpi {
    pub label: &'static str,
    pub value: String,
    pub hint: Option<String>,
}

impl Kpi {
    #[must_use]
    pub const fn new(label: &'static str, value: String) -> Self {
        Self {
            label,
            value,
            hint: None,
        }
    }

    #[must_use]
    pub fn hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

/// A bar in a CSS bar chart. `height` is a percent of the tallest bar.
#[derive(Debug, Clone, Serialize)]
pub struct Bar {
    pub label: String,
    pub value: String,
    pub height: f64,
}

/// Scale `(label, amount)` pairs into bars.
#[must_use]
pub fn money_bars(points: Vec<(String, Decimal)>, currency: CurrencyCode) -> Vec<Bar> {
    let amounts: Vec<Decimal> = points.iter().map(|(_, amount)| *amount).collect();
    points
        .into_iter()
        .zip(bar_heights(&amounts))
        .map(|((label, amount), height)| Bar {
            label,
            value: format_currency(amount, currency),
            height,
        })
        .collect()
}

/// A labelled share of a total, e.g. one sales channel.
#[derive(Debug, Clone, Serialize)]
pub struct ShareRow {
    pub label: String,
    pub value: String,
    pub count: u64,
    pub share: f64,
}

/// Currency of a loaded data set, defaulting to USD.
#[must_use]
pub fn currency_of(orders: &[OrderRecord]) -> CurrencyCode {
    orders.first().map(|o| o.currency).unwrap_or_default()
}

#[must_use]
pub fn short_date(at: DateTime<Utc>) -> String {
    at.format("%b %-d, %Y").to_string()
}

#[must_use]
pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// Keep orders created on or after `since`.
#[must_use]
pub fn orders_from(orders: &[OrderRecord], since: NaiveDate) -> Vec<OrderRecord> {
    orders
        .iter()
        .filter(|o| o.created_at.date_naive() >= since)
        .cloned()
        .collect()
}

/// Unwrap a secondary section's data, logging failures and rendering the
/// section empty.
pub fn or_empty<T: Default>(result: Result<T, ShopifyError>, section: &str) -> T {
    result.unwrap_or_else(|e| {
        tracing::warn!(section, error = %e, "Failed to load section");
        T::default()
    })
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderRow {
    pub id: String,
    pub name: String,
    pub date: String,
    pub customer: String,
    pub total: String,
    pub items: u64,
    pub financial_status: &'static str,
    pub financial_tone: &'static str,
    pub fulfillment_status: &'static str,
}

impl From<&OrderRecord> for OrderRow {
    fn from(order: &OrderRecord) -> Self {
        Self {
            id: order.id.as_str().to_string(),
            name: order.name.clone(),
            date: short_date(order.created_at),
            customer: order.customer_name().to_string(),
            total: format_currency(order.total, order.currency),
            items: order.units(),
            financial_status: order.financial_status.label(),
            financial_tone: order.financial_status.tone(),
            fulfillment_status: order.fulfillment_status.label(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProductRow {
    pub id: String,
    pub title: String,
    pub status: String,
    pub status_tone: &'static str,
    pub inventory: i64,
    pub inventory_tone: &'static str,
    pub price: String,
    pub vendor: String,
}

impl ProductRow {
    #[must_use]
    pub fn new(product: &ProductRecord, low_stock_threshold: i64) -> Self {
        let status_tone = match product.status {
            ProductStatus::Active => "success",
            ProductStatus::Draft => "warning",
            ProductStatus::Archived | ProductStatus::Unknown => "neutral",
        };
        let inventory_tone = if product.total_inventory <= 0 {
            "critical"
        } else if product.total_inventory < low_stock_threshold {
            "warning"
        } else {
            "success"
        };
        Self {
            id: product.id.as_str().to_string(),
            title: product.title.clone(),
            status: product.status.to_string(),
            status_tone,
            inventory: product.total_inventory,
            inventory_tone,
            price: format_currency(product.price, product.currency),
            vendor: product.vendor.clone().unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CustomerRow {
    pub id: String,
    pub name: String,
    pub email: String,
    pub orders: String,
    pub spent: String,
    pub joined: String,
}

impl From<&CustomerRecord> for CustomerRow {
    fn from(customer: &CustomerRecord) -> Self {
        Self {
            id: customer.id.as_str().to_string(),
            name: customer.display_name.clone(),
            email: customer.email.clone().unwrap_or_default(),
            orders: format_count(customer.orders_count),
            spent: format_currency(customer.amount_spent, customer.currency),
            joined: short_date(customer.created_at),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{order, product};

    #[test]
    fn test_range_parsing_falls_back_to_thirty_days() {
        let query = RangeQuery {
            range: Some("7D".to_string()),
        };
        assert_eq!(query.range(), DateRange::Week);

        let query = RangeQuery {
            range: Some("1y".to_string()),
        };
        assert_eq!(query.range(), DateRange::Month);
        assert_eq!(RangeQuery::default().range(), DateRange::Month);
    }

    #[test]
    fn test_range_since_includes_today() {
        let today = NaiveDate::from_ymd_opt(2025, 1, 15).unwrap();
        assert_eq!(
            DateRange::Week.since(today),
            NaiveDate::from_ymd_opt(2025, 1, 9).unwrap()
        );
    }

    #[test]
    fn test_nav_marks_current_page() {
        let chrome = Chrome {
            shop: "pilot-demo.myshopify.com".to_string(),
            current_path: "/app/orders",
        };
        let active: Vec<_> = chrome
            .nav()
            .into_iter()
            .filter(|l| l.active)
            .map(|l| l.label)
            .collect();
        assert_eq!(active, vec!["Orders"]);
    }

    #[test]
    fn test_money_bars_scale_to_tallest() {
        let bars = money_bars(
            vec![
                ("Mon".to_string(), Decimal::new(5000, 2)),
                ("Tue".to_string(), Decimal::new(10000, 2)),
            ],
            CurrencyCode::USD,
        );
        assert_eq!(bars[1].value, "$100.00");
        assert!((bars[1].height - 100.0).abs() < f64::EPSILON);
        assert!((bars[0].height - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_order_row_formats_values() {
        let row = OrderRow::from(&order("#1001", 0, "1234.50"));
        assert_eq!(row.name, "#1001");
        assert_eq!(row.total, "$1,234.50");
        assert_eq!(row.date, "Jan 15, 2025");
        assert_eq!(row.customer, "Ada Lovelace");
        assert_eq!(row.financial_status, "Paid");
    }

    #[test]
    fn test_product_row_tones() {
        let low = ProductRow::new(&product("Lantern", ProductStatus::Active, 3), 10);
        assert_eq!(low.inventory_tone, "warning");
        let out = ProductRow::new(&product("Stove", ProductStatus::Draft, 0), 10);
        assert_eq!(out.inventory_tone, "critical");
        assert_eq!(out.status_tone, "warning");
    }
}
