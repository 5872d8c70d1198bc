//! Dashboard overview.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Json,
    extract::{Query, State},
};
use chrono::{DateTime, NaiveDate, TimeDelta, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::instrument;

use growth_pilot_core::metrics::{
    CustomerStats, InventoryHealth, OrderStatusCounts, PerformanceBand, RevenueSummary,
    StoreHealthInputs, StoreHealthScore, daily_buckets, fill_days, hourly_revenue,
    revenue_goal_progress, weekly_scorecard,
};
use growth_pilot_core::{
    CurrencyCode, CustomerRecord, OrderRecord, ProductRecord, ShopInfo, format_count,
    format_currency, format_percent,
};

use super::alerts::{AlertView, build_alerts};
use super::view::{
    Bar, Chrome, CustomerRow, DateRange, Kpi, OrderRow, ProductRow, RangeOption, RangeQuery,
    currency_of, money_bars, or_empty, orders_from, range_options,
};
use crate::db::SettingsRepository;
use crate::error::{ApiError, AppError};
use crate::filters;
use crate::middleware::RequireShop;
use crate::models::{ShopSession, ShopSettings};
use crate::state::AppState;

/// Monthly revenue target shown on the goal card.
pub const REVENUE_GOAL: Decimal = Decimal::from_parts(100_000, 0, 0, false, 0);
const CHART_DAYS: u32 = 14;
const SCORECARD_WEEKS: usize = 12;
const LIST_LIMIT: usize = 10;
const ALERT_PREVIEW: usize = 5;

#[derive(Debug, Clone, Serialize)]
pub struct HourBar {
    pub hour: String,
    pub today: String,
    pub yesterday: String,
    pub today_height: f64,
    pub yesterday_height: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScoreView {
    pub label: &'static str,
    pub value: String,
    pub percentile: f64,
    pub band: &'static str,
    pub tone: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct GoalView {
    pub current: String,
    pub goal: String,
    pub progress: f64,
    pub progress_label: String,
    pub on_track: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthComponentView {
    pub label: &'static str,
    pub score: u8,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthView {
    pub score: u8,
    pub band: &'static str,
    pub tone: &'static str,
    pub components: Vec<HealthComponentView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardView {
    pub shop_name: String,
    pub plan_name: Option<String>,
    pub range: &'static str,
    pub range_label: &'static str,
    pub ranges: Vec<RangeOption>,
    pub currency: CurrencyCode,
    pub kpis: Vec<Kpi>,
    pub daily: Vec<Bar>,
    pub hourly: Vec<HourBar>,
    pub scorecard: Vec<ScoreView>,
    pub goal: GoalView,
    pub health: HealthView,
    pub alerts: Vec<AlertView>,
    pub alert_count: usize,
    pub recent_orders: Vec<OrderRow>,
    pub top_products: Vec<ProductRow>,
    pub recent_customers: Vec<CustomerRow>,
}

/// Everything the dashboard is computed from.
pub struct DashboardData {
    pub shop: ShopInfo,
    /// Orders covering both the range and the scorecard history.
    pub orders: Vec<OrderRecord>,
    pub products: Vec<ProductRecord>,
    pub customers: Vec<CustomerRecord>,
    pub settings: ShopSettings,
}

const fn band_tone(band: PerformanceBand) -> &'static str {
    match band {
        PerformanceBand::Excellent => "success",
        PerformanceBand::Good => "info",
        PerformanceBand::Average => "warning",
        PerformanceBand::Poor => "critical",
    }
}

fn hour_bars(orders: &[OrderRecord], today: NaiveDate, currency: CurrencyCode) -> Vec<HourBar> {
    let rows = hourly_revenue(orders, today);
    let max = rows
        .iter()
        .map(|r| r.today.max(r.yesterday))
        .max()
        .unwrap_or(Decimal::ZERO)
        .max(Decimal::ONE);
    let height = |v: Decimal| growth_pilot_core::metrics::money_share(v, max);

    rows.into_iter()
        .map(|r| HourBar {
            hour: format!("{}:00", r.hour),
            today: format_currency(r.today, currency),
            yesterday: format_currency(r.yesterday, currency),
            today_height: height(r.today),
            yesterday_height: height(r.yesterday),
        })
        .collect()
}

/// Reduce the loaded data into the dashboard view.
#[must_use]
pub fn build(data: &DashboardData, range: DateRange, now: DateTime<Utc>) -> DashboardView {
    let today = now.date_naive();
    let in_range = orders_from(&data.orders, range.since(today));
    let currency = if data.orders.is_empty() {
        data.shop.currency
    } else {
        currency_of(&data.orders)
    };

    let summary = RevenueSummary::from_orders(&in_range);
    let counts = OrderStatusCounts::from_orders(&in_range);
    let threshold = data.settings.notifications.alert_threshold;
    let inventory = InventoryHealth::from_products(&data.products, threshold);
    let customer_stats = CustomerStats::from_customers(&data.customers, now);

    let kpis = vec![
        Kpi::new("Total Revenue", format_currency(summary.gross, currency)).hint(range.label()),
        Kpi::new("Total Orders", format_count(summary.order_count)),
        Kpi::new("Avg Order Value", format_currency(summary.aov, currency)),
        Kpi::new("Total Products", format_count(inventory.total_products))
            .hint(format!("{} active", inventory.active)),
        Kpi::new("Total Customers", format_count(customer_stats.total))
            .hint(format!("{} returning", customer_stats.returning)),
    ];

    let buckets = daily_buckets(&data.orders);
    let daily = money_bars(
        fill_days(&buckets, today, CHART_DAYS)
            .into_iter()
            .map(|(day, bucket)| (day.format("%b %-d").to_string(), bucket.revenue))
            .collect(),
        currency,
    );

    let scorecard = weekly_scorecard(&data.orders, today, SCORECARD_WEEKS)
        .into_iter()
        .map(|m| ScoreView {
            label: m.label,
            value: if m.is_currency {
                format_currency(m.value, currency)
            } else {
                m.value.round().to_string()
            },
            percentile: m.percentile,
            band: m.band.label(),
            tone: band_tone(m.band),
        })
        .collect();

    let progress = revenue_goal_progress(summary.gross, REVENUE_GOAL);
    let goal = GoalView {
        current: format_currency(summary.gross, currency),
        goal: format_currency(REVENUE_GOAL, currency),
        progress,
        progress_label: format_percent(progress),
        on_track: summary.gross >= REVENUE_GOAL,
    };

    let health = StoreHealthScore::compute(StoreHealthInputs {
        in_stock_rate: inventory.in_stock_percent,
        fulfillment_rate: counts.fulfillment_rate,
        refund_rate: summary.refund_rate,
        returning_rate: customer_stats.returning_rate,
    });
    let health = HealthView {
        score: health.score,
        band: health.band.label(),
        tone: health.band.tone(),
        components: health
            .components
            .iter()
            .map(|c| HealthComponentView {
                label: c.label,
                score: c.score,
            })
            .collect(),
    };

    let alerts = build_alerts(
        &data.products,
        &data.orders,
        &data.settings.notifications,
        now,
    );

    let mut recent: Vec<&OrderRecord> = in_range.iter().collect();
    recent.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    let mut top_products: Vec<&ProductRecord> = data.products.iter().collect();
    top_products.sort_by(|a, b| b.total_inventory.cmp(&a.total_inventory));

    let mut recent_customers: Vec<&CustomerRecord> = data.customers.iter().collect();
    recent_customers.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    DashboardView {
        shop_name: data.shop.name.clone(),
        plan_name: data.shop.plan_name.clone(),
        range: range.as_str(),
        range_label: range.label(),
        ranges: range_options(range),
        currency,
        kpis,
        daily,
        hourly: hour_bars(&data.orders, today, currency),
        scorecard,
        goal,
        health,
        alert_count: alerts.total,
        alerts: alerts.alerts.into_iter().take(ALERT_PREVIEW).collect(),
        recent_orders: recent.into_iter().take(LIST_LIMIT).map(OrderRow::from).collect(),
        top_products: top_products
            .into_iter()
            .take(LIST_LIMIT)
            .map(|p| ProductRow::new(p, threshold))
            .collect(),
        recent_customers: recent_customers
            .into_iter()
            .take(LIST_LIMIT)
            .map(CustomerRow::from)
            .collect(),
    }
}

/// First day of order history the dashboard needs.
fn history_start(range: DateRange, today: NaiveDate) -> NaiveDate {
    let scorecard_start = growth_pilot_core::metrics::revenue::week_start(today)
        - TimeDelta::weeks(i64::try_from(SCORECARD_WEEKS).unwrap_or(12) - 1);
    range.since(today).min(scorecard_start)
}

async fn load(
    state: &AppState,
    shop: &ShopSession,
    range: DateRange,
) -> Result<DashboardView, AppError> {
    let ctx = state.shopify().context(shop);
    let now = Utc::now();
    let since = history_start(range, now.date_naive());

    let settings_repo = SettingsRepository::new(state.pool());
    let settings = settings_repo.load(&shop.shop);
    let (shop_info, orders, products, customers, settings) = tokio::join!(
        ctx.shop_info(),
        ctx.orders_since(since),
        ctx.products(),
        ctx.customers(),
        settings,
    );

    let orders = orders?;
    let shop_info = shop_info.unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Failed to load shop info");
        ShopInfo {
            name: shop.shop.handle().to_string(),
            email: None,
            myshopify_domain: shop.shop.as_str().to_string(),
            plan_name: None,
            currency: currency_of(&orders),
        }
    });

    let data = DashboardData {
        shop: shop_info,
        orders,
        products: or_empty(products, "dashboard.products"),
        customers: or_empty(customers, "dashboard.customers"),
        settings: settings?,
    };
    Ok(build(&data, range, now))
}

#[derive(Template, WebTemplate)]
#[template(path = "dashboard.html")]
pub struct DashboardTemplate {
    pub chrome: Chrome,
    pub view: DashboardView,
}

#[instrument(skip(state, shop), fields(shop = %shop.shop))]
pub async fn page(
    State(state): State<AppState>,
    RequireShop(shop): RequireShop,
    Query(query): Query<RangeQuery>,
) -> Result<DashboardTemplate, AppError> {
    Ok(DashboardTemplate {
        view: load(&state, &shop, query.range()).await?,
        chrome: Chrome::new(&shop, "/app"),
    })
}

#[instrument(skip(state, shop), fields(shop = %shop.shop))]
pub async fn api(
    State(state): State<AppState>,
    RequireShop(shop): RequireShop,
    Query(query): Query<RangeQuery>,
) -> Result<Json<DashboardView>, ApiError> {
    Ok(Json(load(&state, &shop, query.range()).await?))
}
