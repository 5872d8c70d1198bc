//! Sales analytics.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Json,
    extract::{Query, State},
};
use chrono::NaiveDate;
use serde::Serialize;
use tracing::instrument;

use growth_pilot_core::metrics::{
    BreakdownRow, Funnel, NewVsReturning, NormalizedHeatmap, RETENTION_MONTHS, RevenueSummary,
    SalesHeatmap, breakdown_by, cohort_retention, daily_buckets, fill_days, weekday_breakdown,
    weekly_velocity,
};
use growth_pilot_core::{
    AbandonedCheckoutRecord, CurrencyCode, OrderRecord, format_count, format_currency,
    format_percent,
};

use super::view::{
    Bar, Chrome, DateRange, Kpi, OrderRow, RangeOption, RangeQuery, ShareRow, currency_of,
    money_bars, or_empty, range_options, today,
};
use crate::error::{ApiError, AppError};
use crate::filters;
use crate::middleware::RequireShop;
use crate::models::ShopSession;
use crate::state::AppState;

const COUNTRY_LIMIT: usize = 8;
const BREAKDOWN_LIMIT: usize = 6;
const TOP_ORDERS: usize = 10;
/// Days listed in the daily breakdown table, newest first.
const BREAKDOWN_DAYS: usize = 14;

#[derive(Debug, Clone, Serialize)]
pub struct SplitView {
    pub new_orders: String,
    pub returning_orders: String,
    pub new_revenue: String,
    pub returning_revenue: String,
    pub returning_share: f64,
    pub returning_share_label: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct VelocityRow {
    pub week: String,
    pub revenue: String,
    pub orders: u64,
    pub aov: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct FunnelRow {
    pub label: String,
    pub count: String,
    pub percent: f64,
    pub percent_label: String,
    pub drop_off: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RefundDay {
    pub label: String,
    pub amount: String,
    pub rate: String,
    pub height: f64,
}

/// One row of the daily revenue breakdown.
#[derive(Debug, Clone, Serialize)]
pub struct DayRow {
    pub date: String,
    pub orders: u64,
    pub revenue: String,
    pub tax: String,
    pub net: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CohortView {
    pub label: String,
    pub size: u64,
    /// One cell per month offset, empty when the offset is in the future.
    pub cells: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SalesView {
    pub range: &'static str,
    pub range_label: &'static str,
    pub ranges: Vec<RangeOption>,
    pub currency: CurrencyCode,
    pub kpis: Vec<Kpi>,
    pub daily: Vec<Bar>,
    pub refund_trend: Vec<RefundDay>,
    pub daily_breakdown: Vec<DayRow>,
    pub channels: Vec<ShareRow>,
    pub gateways: Vec<ShareRow>,
    pub countries: Vec<ShareRow>,
    pub weekdays: Vec<Bar>,
    pub heatmap: NormalizedHeatmap,
    pub new_vs_returning: SplitView,
    pub velocity: Vec<VelocityRow>,
    pub funnel: Vec<FunnelRow>,
    pub conversion_rate: String,
    pub abandoned_checkouts: usize,
    pub cohort_months: Vec<String>,
    pub cohorts: Vec<CohortView>,
    pub top_orders: Vec<OrderRow>,
}

fn share_rows(rows: Vec<BreakdownRow>, currency: CurrencyCode) -> Vec<ShareRow> {
    rows.into_iter()
        .map(|r| ShareRow {
            value: format_currency(r.revenue, currency),
            label: r.label,
            count: r.orders,
            share: r.share,
        })
        .collect()
}

/// Reduce a range of orders and abandoned checkouts into the sales view.
#[must_use]
pub fn build(
    orders: &[OrderRecord],
    checkouts: &[AbandonedCheckoutRecord],
    range: DateRange,
    today: NaiveDate,
) -> SalesView {
    let currency = currency_of(orders);
    let summary = RevenueSummary::from_orders(orders);
    let money = |amount| format_currency(amount, currency);

    let kpis = vec![
        Kpi::new("Gross Revenue", money(summary.gross)),
        Kpi::new("Net Revenue", money(summary.net_revenue)).hint("After refunds and tax"),
        Kpi::new("Orders", format_count(summary.order_count)),
        Kpi::new("Avg Order Value", money(summary.aov)),
        Kpi::new("Units Sold", format_count(summary.units)),
        Kpi::new("Refunded", money(summary.refunded))
            .hint(format!("{} refund rate", format_percent(summary.refund_rate))),
        Kpi::new("Discounts", money(summary.discounts)),
        Kpi::new("Tax Collected", money(summary.tax)),
        Kpi::new("Shipping", money(summary.shipping)),
        Kpi::new("Gross Profit", money(summary.gross_profit)).hint("Subtotal less refunds"),
        Kpi::new("Gross Margin", format_percent(summary.avg_margin)),
    ];

    let days = fill_days(&daily_buckets(orders), today, range.days());
    let daily = money_bars(
        days.iter()
            .map(|(day, bucket)| (day.format("%b %-d").to_string(), bucket.revenue))
            .collect(),
        currency,
    );

    let refund_bars = money_bars(
        days.iter()
            .map(|(day, bucket)| (day.format("%b %-d").to_string(), bucket.refunds))
            .collect(),
        currency,
    );
    let refund_trend = refund_bars
        .into_iter()
        .zip(&days)
        .map(|(bar, (_, bucket))| RefundDay {
            label: bar.label,
            amount: bar.value,
            rate: format_percent(bucket.refund_rate()),
            height: bar.height,
        })
        .collect();

    let daily_breakdown = days
        .iter()
        .rev()
        .take(BREAKDOWN_DAYS)
        .map(|(day, bucket)| DayRow {
            date: day.format("%Y-%m-%d").to_string(),
            orders: bucket.orders,
            revenue: money(bucket.revenue),
            tax: money(bucket.tax),
            net: money(bucket.net()),
        })
        .collect();

    let weekdays = money_bars(
        weekday_breakdown(orders)
            .into_iter()
            .map(|row| (row.label.to_string(), row.revenue))
            .collect(),
        currency,
    );

    let split = NewVsReturning::from_orders(orders);
    let new_vs_returning = SplitView {
        new_orders: format_count(split.new_orders),
        returning_orders: format_count(split.returning_orders),
        new_revenue: money(split.new_revenue),
        returning_revenue: money(split.returning_revenue),
        returning_share: split.returning_share,
        returning_share_label: format_percent(split.returning_share),
    };

    let velocity = weekly_velocity(orders)
        .into_iter()
        .map(|w| VelocityRow {
            week: w.week_start.format("%b %-d").to_string(),
            revenue: money(w.revenue),
            orders: w.orders,
            aov: money(w.aov()),
        })
        .collect();

    let funnel = Funnel::abandonment(summary.order_count, checkouts.len() as u64);
    let conversion_rate = format_percent(funnel.conversion_rate());
    let funnel = funnel
        .stages
        .into_iter()
        .map(|s| FunnelRow {
            count: format_count(s.count),
            percent_label: format_percent(s.percent),
            drop_off: format_percent(s.drop_off),
            percent: s.percent,
            label: s.label,
        })
        .collect();

    let cohorts = cohort_retention(orders)
        .into_iter()
        .map(|c| CohortView {
            cells: c
                .retention
                .iter()
                .map(|cell| cell.map(format_percent).unwrap_or_default())
                .collect(),
            label: c.label,
            size: c.size,
        })
        .collect();

    let mut top: Vec<&OrderRecord> = orders.iter().collect();
    top.sort_by(|a, b| b.total.cmp(&a.total));

    SalesView {
        range: range.as_str(),
        range_label: range.label(),
        ranges: range_options(range),
        currency,
        kpis,
        daily,
        refund_trend,
        daily_breakdown,
        channels: share_rows(
            breakdown_by(orders, |o| o.channel.as_deref(), "Online Store", Some(BREAKDOWN_LIMIT)),
            currency,
        ),
        gateways: share_rows(
            breakdown_by(orders, |o| o.gateway.as_deref(), "Unknown", Some(BREAKDOWN_LIMIT)),
            currency,
        ),
        countries: share_rows(
            breakdown_by(orders, |o| o.country.as_deref(), "Unknown", Some(COUNTRY_LIMIT)),
            currency,
        ),
        weekdays,
        heatmap: SalesHeatmap::from_orders(orders).normalize(),
        new_vs_returning,
        velocity,
        funnel,
        conversion_rate,
        abandoned_checkouts: checkouts.len(),
        cohort_months: (0..RETENTION_MONTHS).map(|m| format!("Month {m}")).collect(),
        cohorts,
        top_orders: top.into_iter().take(TOP_ORDERS).map(OrderRow::from).collect(),
    }
}

async fn load(state: &AppState, shop: &ShopSession, range: DateRange) -> Result<SalesView, AppError> {
    let ctx = state.shopify().context(shop);
    let today = today();
    let since = range.since(today);

    let (orders, checkouts) =
        tokio::join!(ctx.orders_since(since), ctx.abandoned_checkouts_since(since));

    let orders = orders?;
    let checkouts = or_empty(checkouts, "sales.abandoned_checkouts");
    Ok(build(&orders, &checkouts, range, today))
}

#[derive(Template, WebTemplate)]
#[template(path = "sales.html")]
pub struct SalesTemplate {
    pub chrome: Chrome,
    pub view: SalesView,
}

#[instrument(skip(state, shop), fields(shop = %shop.shop))]
pub async fn page(
    State(state): State<AppState>,
    RequireShop(shop): RequireShop,
    Query(query): Query<RangeQuery>,
) -> Result<SalesTemplate, AppError> {
    Ok(SalesTemplate {
        view: load(&state, &shop, query.range()).await?,
        chrome: Chrome::new(&shop, "/app/sales"),
    })
}

#[instrument(skip(state, shop), fields(shop = %shop.shop))]
pub async fn api(
    State(state): State<AppState>,
    RequireShop(shop): RequireShop,
    Query(query): Query<RangeQuery>,
) -> Result<Json<SalesView>, ApiError> {
    Ok(Json(load(&state, &shop, query.range()).await?))
}
