//! Order list with status filters and search.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Json,
    extract::{Query, State},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use growth_pilot_core::metrics::{OrderFilter, OrderStatusCounts, RevenueSummary, filter_orders};
use growth_pilot_core::{OrderRecord, format_count, format_currency, format_percent};

use super::view::{
    Chrome, DateRange, Kpi, OrderRow, RangeOption, currency_of, range_options, today,
};
use crate::error::{ApiError, AppError};
use crate::middleware::RequireShop;
use crate::models::ShopSession;
use crate::state::AppState;

/// `?status=&q=&range=`
#[derive(Debug, Default, Deserialize)]
pub struct OrdersQuery {
    pub status: Option<String>,
    pub q: Option<String>,
    pub range: Option<String>,
}

impl OrdersQuery {
    fn filter(&self) -> OrderFilter {
        self.status
            .as_deref()
            .and_then(|s| s.parse().ok())
            .unwrap_or_default()
    }

    fn range(&self) -> DateRange {
        self.range
            .as_deref()
            .and_then(|r| r.parse().ok())
            .unwrap_or_default()
    }

    fn search(&self) -> Option<&str> {
        self.q.as_deref().map(str::trim).filter(|q| !q.is_empty())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FilterTab {
    pub value: &'static str,
    pub label: &'static str,
    pub count: u64,
    pub active: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrdersView {
    pub range: &'static str,
    pub ranges: Vec<RangeOption>,
    pub status: &'static str,
    pub search: String,
    pub kpis: Vec<Kpi>,
    pub tabs: Vec<FilterTab>,
    pub matched: usize,
    pub orders: Vec<OrderRow>,
}

const fn tab_count(filter: OrderFilter, counts: &OrderStatusCounts) -> u64 {
    match filter {
        OrderFilter::All => counts.total,
        OrderFilter::Paid => counts.paid,
        OrderFilter::Pending => counts.pending,
        OrderFilter::Refunded => counts.refunded + counts.partially_refunded,
        OrderFilter::Unfulfilled => counts.unfulfilled + counts.partially_fulfilled,
        OrderFilter::Fulfilled => counts.fulfilled,
    }
}

#[must_use]
pub fn build(orders: &[OrderRecord], query: &OrdersQuery) -> OrdersView {
    let filter = query.filter();
    let range = query.range();
    let currency = currency_of(orders);
    let counts = OrderStatusCounts::from_orders(orders);
    let summary = RevenueSummary::from_orders(orders);

    let kpis = vec![
        Kpi::new("Orders", format_count(counts.total)),
        Kpi::new("Revenue", format_currency(summary.gross, currency)),
        Kpi::new("Unfulfilled", format_count(counts.unfulfilled)),
        Kpi::new("Fulfillment Rate", format_percent(counts.fulfillment_rate)),
    ];

    let tabs = OrderFilter::ALL
        .into_iter()
        .map(|f| FilterTab {
            value: f.as_str(),
            label: f.label(),
            count: tab_count(f, &counts),
            active: f == filter,
        })
        .collect();

    let mut matched = filter_orders(orders, filter, query.search());
    matched.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    OrdersView {
        range: range.as_str(),
        ranges: range_options(range),
        status: filter.as_str(),
        search: query.search().unwrap_or_default().to_string(),
        kpis,
        tabs,
        matched: matched.len(),
        orders: matched.into_iter().map(OrderRow::from).collect(),
    }
}

async fn load(
    state: &AppState,
    shop: &ShopSession,
    query: &OrdersQuery,
) -> Result<OrdersView, AppError> {
    let since = query.range().since(today());
    let orders = state.shopify().context(shop).orders_since(since).await?;
    Ok(build(&orders, query))
}

#[derive(Template, WebTemplate)]
#[template(path = "orders.html")]
pub struct OrdersTemplate {
    pub chrome: Chrome,
    pub view: OrdersView,
}

#[instrument(skip(state, shop), fields(shop = %shop.shop))]
pub async fn page(
    State(state): State<AppState>,
    RequireShop(shop): RequireShop,
    Query(query): Query<OrdersQuery>,
) -> Result<OrdersTemplate, AppError> {
    Ok(OrdersTemplate {
        view: load(&state, &shop, &query).await?,
        chrome: Chrome::new(&shop, "/app/orders"),
    })
}

#[instrument(skip(state, shop), fields(shop = %shop.shop))]
pub async fn api(
    State(state): State<AppState>,
    RequireShop(shop): RequireShop,
    Query(query): Query<OrdersQuery>,
) -> Result<Json<OrdersView>, ApiError> {
    Ok(Json(load(&state, &shop, &query).await?))
}
