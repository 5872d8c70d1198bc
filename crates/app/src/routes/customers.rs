//! Customer segments.

use askama::Template;
use askama_web::WebTemplate;
use axum::{Json, extract::State};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::instrument;

use growth_pilot_core::metrics::{CustomerStats, count_share};
use growth_pilot_core::metrics::customers::{AT_RISK_DAYS, NEW_CUSTOMER_DAYS};
use growth_pilot_core::{CurrencyCode, CustomerRecord, format_count, format_currency, format_percent};

use super::view::{Chrome, CustomerRow, Kpi, ShareRow};
use crate::error::{ApiError, AppError};
use crate::filters;
use crate::middleware::RequireShop;
use crate::models::ShopSession;
use crate::state::AppState;

const RECENT_LIMIT: usize = 20;

#[derive(Debug, Clone, Serialize)]
pub struct SegmentView {
    pub label: &'static str,
    pub description: String,
    pub count: String,
    pub share: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TopCustomerRow {
    pub name: String,
    pub email: String,
    pub orders: u64,
    pub spent: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CustomersView {
    pub kpis: Vec<Kpi>,
    pub segments: Vec<SegmentView>,
    pub countries: Vec<ShareRow>,
    pub top_customers: Vec<TopCustomerRow>,
    pub recent: Vec<CustomerRow>,
}

#[must_use]
pub fn build(customers: &[CustomerRecord], now: DateTime<Utc>) -> CustomersView {
    let stats = CustomerStats::from_customers(customers, now);
    let currency = customers
        .first()
        .map_or(CurrencyCode::default(), |c| c.currency);
    let money = |amount| format_currency(amount, currency);

    let kpis = vec![
        Kpi::new("Total Customers", format_count(stats.total)),
        Kpi::new("Total Spent", money(stats.total_spent)),
        Kpi::new("Avg Spent", money(stats.avg_spent)),
        Kpi::new("Returning Rate", format_percent(stats.returning_rate))
            .hint(format!("{} returning", format_count(stats.returning))),
    ];

    let segment = |label, description: String, count| SegmentView {
        label,
        description,
        count: format_count(count),
        share: count_share(count, stats.total),
    };
    let segments = vec![
        segment("VIP", "Spent over $500".to_string(), stats.vip),
        segment("Returning", "More than one order".to_string(), stats.returning),
        segment(
            "New",
            format!("Joined in the last {NEW_CUSTOMER_DAYS} days"),
            stats.new_customers,
        ),
        segment(
            "At risk",
            format!("No activity for {AT_RISK_DAYS} days"),
            stats.at_risk,
        ),
    ];

    let countries = stats
        .top_countries
        .iter()
        .map(|(label, count)| ShareRow {
            label: label.clone(),
            value: format_count(*count),
            count: *count,
            share: count_share(*count, stats.total),
        })
        .collect();

    let top_customers = stats
        .top_customers
        .iter()
        .map(|c| TopCustomerRow {
            name: c.name.clone(),
            email: c.email.clone().unwrap_or_default(),
            orders: c.orders,
            spent: money(c.spent),
        })
        .collect();

    let mut recent: Vec<&CustomerRecord> = customers.iter().collect();
    recent.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    CustomersView {
        kpis,
        segments,
        countries,
        top_customers,
        recent: recent
            .into_iter()
            .take(RECENT_LIMIT)
            .map(CustomerRow::from)
            .collect(),
    }
}

async fn load(state: &AppState, shop: &ShopSession) -> Result<CustomersView, AppError> {
    let customers = state.shopify().context(shop).customers().await?;
    Ok(build(&customers, Utc::now()))
}

#[derive(Template, WebTemplate)]
#[template(path = "customers.html")]
pub struct CustomersTemplate {
    pub chrome: Chrome,
    pub view: CustomersView,
}

#[instrument(skip(state, shop), fields(shop = %shop.shop))]
pub async fn page(
    State(state): State<AppState>,
    RequireShop(shop): RequireShop,
) -> Result<CustomersTemplate, AppError> {
    Ok(CustomersTemplate {
        view: load(&state, &shop).await?,
        chrome: Chrome::new(&shop, "/app/customers"),
    })
}

#[instrument(skip(state, shop), fields(shop = %shop.shop))]
pub async fn api(
    State(state): State<AppState>,
    RequireShop(shop): RequireShop,
) -> Result<Json<CustomersView>, ApiError> {
    Ok(Json(load(&state, &shop).await?))
}

#[cfg(test)]
mod tests {
    use chrono::TimeDelta;
    use rust_decimal::Decimal;

    use growth_pilot_core::CustomerId;

    use super::*;
    use crate::test_support::base_time;

    fn customer(name: &str, orders: u64, spent: i64, age_days: i64) -> CustomerRecord {
        CustomerRecord {
            id: CustomerId::new(format!("gid://shopify/Customer/{name}")),
            display_name: name.to_string(),
            email: Some(format!("{}@example.com", name.to_lowercase())),
            orders_count: orders,
            amount_spent: Decimal::from(spent),
            currency: CurrencyCode::USD,
            country: Some("Canada".to_string()),
            created_at: base_time() - TimeDelta::days(age_days),
            updated_at: base_time() - TimeDelta::days(age_days),
        }
    }

    #[test]
    fn test_customers_view() {
        let customers = vec![
            customer("Ada", 5, 900, 200),
            customer("Grace", 1, 40, 3),
            customer("Linus", 2, 120, 10),
        ];
        let view = build(&customers, base_time());

        assert_eq!(view.kpis[0].value, "3");
        assert_eq!(view.kpis[1].value, "$1,060.00");
        assert_eq!(view.segments[0].label, "VIP");
        assert_eq!(view.segments[0].count, "1");
        assert_eq!(view.segments[1].count, "2");
        assert_eq!(view.segments[2].count, "2");
        assert_eq!(view.segments[3].count, "1");
        assert_eq!(view.top_customers[0].name, "Ada");
        assert_eq!(view.recent[0].name, "Grace");
        assert_eq!(view.countries[0].label, "Canada");
    }
}
