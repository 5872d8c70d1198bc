//! Product catalog and inventory health.

use std::collections::HashMap;

use askama::Template;
use askama_web::WebTemplate;
use axum::{Json, extract::State};
use serde::Serialize;
use tracing::instrument;

use growth_pilot_core::metrics::{InventoryHealth, StockItem, count_share};
use growth_pilot_core::{ProductRecord, format_count, format_percent};

use super::view::{Chrome, Kpi, ProductRow, ShareRow};
use crate::db::SettingsRepository;
use crate::error::{ApiError, AppError};
use crate::filters;
use crate::middleware::RequireShop;
use crate::models::ShopSession;
use crate::state::AppState;

const TYPE_LIMIT: usize = 8;

#[derive(Debug, Clone, Serialize)]
pub struct StockRow {
    pub title: String,
    pub inventory: i64,
}

impl From<&StockItem> for StockRow {
    fn from(item: &StockItem) -> Self {
        Self {
            title: item.title.clone(),
            inventory: item.inventory,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StockBar {
    pub label: &'static str,
    pub percent: f64,
    pub percent_label: String,
    pub tone: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProductsView {
    pub threshold: i64,
    pub kpis: Vec<Kpi>,
    pub stock: Vec<StockBar>,
    pub low_stock: Vec<StockRow>,
    pub out_of_stock: Vec<StockRow>,
    pub product_types: Vec<ShareRow>,
    pub products: Vec<ProductRow>,
}

fn stock_bar(label: &'static str, percent: f64, tone: &'static str) -> StockBar {
    StockBar {
        label,
        percent,
        percent_label: format_percent(percent),
        tone,
    }
}

/// Product count per product type, largest first.
fn product_types(products: &[ProductRecord]) -> Vec<ShareRow> {
    let mut counts: HashMap<&str, u64> = HashMap::new();
    for product in products {
        let label = product
            .product_type
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or("Uncategorized");
        *counts.entry(label).or_default() += 1;
    }

    let total = products.len() as u64;
    let mut rows: Vec<ShareRow> = counts
        .into_iter()
        .map(|(label, count)| ShareRow {
            label: label.to_string(),
            value: format_count(count),
            count,
            share: count_share(count, total),
        })
        .collect();
    rows.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.label.cmp(&b.label)));
    rows.truncate(TYPE_LIMIT);
    rows
}

#[must_use]
pub fn build(products: &[ProductRecord], threshold: i64) -> ProductsView {
    let health = InventoryHealth::from_products(products, threshold);

    let kpis = vec![
        Kpi::new("Total Products", format_count(health.total_products)),
        Kpi::new("Active", format_count(health.active)),
        Kpi::new("Draft", format_count(health.draft)),
        Kpi::new("Total Inventory", health.total_inventory.to_string()),
        Kpi::new("Low Stock", health.low_stock.len().to_string())
            .hint(format!("Below {threshold} units")),
        Kpi::new("Out of Stock", health.out_of_stock.len().to_string()),
    ];

    let stock = vec![
        stock_bar("Active", health.active_percent, "success"),
        stock_bar("Draft", health.draft_percent, "info"),
        stock_bar("In stock", health.in_stock_percent, "success"),
        stock_bar("Low stock", health.low_stock_percent, "warning"),
        stock_bar("Out of stock", health.out_of_stock_percent, "critical"),
    ];

    let mut sorted: Vec<&ProductRecord> = products.iter().collect();
    sorted.sort_by(|a, b| {
        a.total_inventory
            .cmp(&b.total_inventory)
            .then_with(|| a.title.cmp(&b.title))
    });

    ProductsView {
        threshold,
        kpis,
        stock,
        low_stock: health.low_stock.iter().map(StockRow::from).collect(),
        out_of_stock: health.out_of_stock.iter().map(StockRow::from).collect(),
        product_types: product_types(products),
        products: sorted
            .into_iter()
            .map(|p| ProductRow::new(p, threshold))
            .collect(),
    }
}

async fn load(state: &AppState, shop: &ShopSession) -> Result<ProductsView, AppError> {
    let ctx = state.shopify().context(shop);
    let settings_repo = SettingsRepository::new(state.pool());
    let settings = settings_repo.load(&shop.shop);
    let (products, settings) = tokio::join!(ctx.products(), settings);
    Ok(build(&products?, settings?.notifications.alert_threshold))
}

#[derive(Template, WebTemplate)]
#[template(path = "products.html")]
pub struct ProductsTemplate {
    pub chrome: Chrome,
    pub view: ProductsView,
}

#[instrument(skip(state, shop), fields(shop = %shop.shop))]
pub async fn page(
    State(state): State<AppState>,
    RequireShop(shop): RequireShop,
) -> Result<ProductsTemplate, AppError> {
    Ok(ProductsTemplate {
        view: load(&state, &shop).await?,
        chrome: Chrome::new(&shop, "/app/products"),
    })
}

#[instrument(skip(state, shop), fields(shop = %shop.shop))]
pub async fn api(
    State(state): State<AppState>,
    RequireShop(shop): RequireShop,
) -> Result<Json<ProductsView>, ApiError> {
    Ok(Json(load(&state, &shop).await?))
}

#[cfg(test)]
mod tests {
    use growth_pilot_core::ProductStatus;

    use super::*;
    use crate::test_support::product;

    #[test]
    fn test_products_view() {
        let mut tent = product("Tent", ProductStatus::Active, 40);
        tent.product_type = Some("Shelter".to_string());
        let products = vec![
            tent,
            product("Lantern", ProductStatus::Active, 4),
            product("Stove", ProductStatus::Draft, 0),
        ];

        let view = build(&products, 10);

        assert_eq!(view.kpis[0].value, "3");
        assert_eq!(view.kpis[4].value, "1");
        assert_eq!(view.kpis[4].hint.as_deref(), Some("Below 10 units"));
        assert_eq!(view.low_stock[0].title, "Lantern");
        assert_eq!(view.out_of_stock[0].title, "Stove");
        assert_eq!(view.products[0].title, "Stove");
        assert_eq!(view.product_types[0].label, "Uncategorized");
        assert_eq!(view.product_types[0].count, 2);
    }
}
