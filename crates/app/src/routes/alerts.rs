//! Stock and fulfillment alerts.

use askama::Template;
use askama_web::WebTemplate;
use axum::{Json, extract::State};
use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;
use tracing::instrument;

use growth_pilot_core::metrics::stale_unfulfilled;
use growth_pilot_core::{OrderRecord, ProductRecord, ProductStatus};

use super::view::{Chrome, or_empty};
use crate::db::SettingsRepository;
use crate::error::{ApiError, AppError};
use crate::middleware::RequireShop;
use crate::models::{NotificationSettings, ShopSession};
use crate::state::AppState;

/// Unfulfilled orders older than this raise an alert.
pub const STALE_ORDER_HOURS: i64 = 48;
const ORDER_LOOKBACK_DAYS: i64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    LowStock,
    OutOfStock,
    UnfulfilledOrder,
}

#[derive(Debug, Clone, Serialize)]
pub struct AlertView {
    pub kind: AlertKind,
    pub title: String,
    pub description: String,
    pub tone: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct AlertsView {
    pub total: usize,
    pub low_stock: usize,
    pub out_of_stock: usize,
    pub unfulfilled: usize,
    pub threshold: i64,
    pub alerts: Vec<AlertView>,
}

/// Build the alert feed.
///
/// Archived products never alert. Low stock alerts are skipped when the
/// merchant turned them off.
#[must_use]
pub fn build_alerts(
    products: &[ProductRecord],
    orders: &[OrderRecord],
    notifications: &NotificationSettings,
    now: DateTime<Utc>,
) -> AlertsView {
    let threshold = notifications.alert_threshold;
    let listed = || {
        products
            .iter()
            .filter(|p| p.status != ProductStatus::Archived)
    };

    let low: Vec<AlertView> = if notifications.low_stock_alert {
        listed()
            .filter(|p| p.total_inventory > 0 && p.total_inventory < threshold)
            .map(|p| AlertView {
                kind: AlertKind::LowStock,
                title: format!("Low Stock: {}", p.title),
                description: format!("Only {} units remaining", p.total_inventory),
                tone: "warning",
            })
            .collect()
    } else {
        Vec::new()
    };

    let out: Vec<AlertView> = listed()
        .filter(|p| p.total_inventory <= 0)
        .map(|p| AlertView {
            kind: AlertKind::OutOfStock,
            title: format!("Out of Stock: {}", p.title),
            description: "Product is completely out of stock".to_string(),
            tone: "critical",
        })
        .collect();

    let stale: Vec<AlertView> = stale_unfulfilled(orders, now, STALE_ORDER_HOURS)
        .into_iter()
        .map(|o| AlertView {
            kind: AlertKind::UnfulfilledOrder,
            title: format!("Unfulfilled: {}", o.name),
            description: format!(
                "Waiting {} hours to ship for {}",
                (now - o.created_at).num_hours(),
                o.customer_name()
            ),
            tone: "warning",
        })
        .collect();

    let (low_stock, out_of_stock, unfulfilled) = (low.len(), out.len(), stale.len());
    let alerts: Vec<AlertView> = out.into_iter().chain(low).chain(stale).collect();

    AlertsView {
        total: alerts.len(),
        low_stock,
        out_of_stock,
        unfulfilled,
        threshold,
        alerts,
    }
}

/// Load the alert feed for a shop.
pub(super) async fn load(state: &AppState, shop: &ShopSession) -> Result<AlertsView, AppError> {
    let ctx = state.shopify().context(shop);
    let now = Utc::now();
    let since = (now - TimeDelta::days(ORDER_LOOKBACK_DAYS)).date_naive();

    let settings_repo = SettingsRepository::new(state.pool());
    let settings = settings_repo.load(&shop.shop);
    let (settings, products, orders) =
        tokio::join!(settings, ctx.products(), ctx.orders_since(since));

    let products = products?;
    let orders = or_empty(orders, "alerts.orders");

    Ok(build_alerts(&products, &orders, &settings?.notifications, now))
}

#[derive(Template, WebTemplate)]
#[template(path = "alerts.html")]
pub struct AlertsTemplate {
    pub chrome: Chrome,
    pub view: AlertsView,
}

#[instrument(skip(state, shop), fields(shop = %shop.shop))]
pub async fn page(
    State(state): State<AppState>,
    RequireShop(shop): RequireShop,
) -> Result<AlertsTemplate, AppError> {
    Ok(AlertsTemplate {
        view: load(&state, &shop).await?,
        chrome: Chrome::new(&shop, "/app/alerts"),
    })
}

#[instrument(skip(state, shop), fields(shop = %shop.shop))]
pub async fn api(
    State(state): State<AppState>,
    RequireShop(shop): RequireShop,
) -> Result<Json<AlertsView>, ApiError> {
    Ok(Json(load(&state, &shop).await?))
}
