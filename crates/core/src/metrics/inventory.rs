//! Inventory health across the product catalog.

use serde::Serialize;

use super::count_share;
use crate::types::{ProductId, ProductRecord, ProductStatus};

/// Products with fewer units than this are flagged as low stock.
pub const DEFAULT_LOW_STOCK_THRESHOLD: i64 = 10;

/// A product flagged by an inventory check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StockItem {
    pub id: ProductId,
    pub title: String,
    pub inventory: i64,
}

impl From<&ProductRecord> for StockItem {
    fn from(product: &ProductRecord) -> Self {
        Self {
            id: product.id.clone(),
            title: product.title.clone(),
            inventory: product.total_inventory,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InventoryHealth {
    pub threshold: i64,
    pub total_products: u64,
    pub active: u64,
    pub draft: u64,
    pub archived: u64,
    pub total_inventory: i64,
    /// `0 < inventory < threshold`, lowest first.
    pub low_stock: Vec<StockItem>,
    /// `inventory <= 0`. Oversold products report negative stock.
    pub out_of_stock: Vec<StockItem>,
    pub active_percent: f64,
    pub draft_percent: f64,
    pub low_stock_percent: f64,
    pub out_of_stock_percent: f64,
    pub in_stock_percent: f64,
}

impl InventoryHealth {
    /// Archived products are counted but never flagged.
    #[must_use]
    pub fn from_products(products: &[ProductRecord], threshold: i64) -> Self {
        let mut active = 0;
        let mut draft = 0;
        let mut archived = 0;
        let mut total_inventory = 0;
        let mut low_stock = Vec::new();
        let mut out_of_stock = Vec::new();

        for product in products {
            match product.status {
                ProductStatus::Active => active += 1,
                ProductStatus::Draft => draft += 1,
                ProductStatus::Archived => archived += 1,
                ProductStatus::Unknown => {}
            }
            total_inventory += product.total_inventory;

            if product.status == ProductStatus::Archived {
                continue;
            }
            if product.total_inventory <= 0 {
                out_of_stock.push(StockItem::from(product));
            } else if product.total_inventory < threshold {
                low_stock.push(StockItem::from(product));
            }
        }

        low_stock.sort_by(|a, b| a.inventory.cmp(&b.inventory).then_with(|| a.title.cmp(&b.title)));
        out_of_stock.sort_by(|a, b| a.title.cmp(&b.title));

        let total = products.len() as u64;
        let low = low_stock.len() as u64;
        let out = out_of_stock.len() as u64;

        Self {
            threshold,
            total_products: total,
            active,
            draft,
            archived,
            total_inventory,
            active_percent: count_share(active, total),
            draft_percent: count_share(draft, total),
            low_stock_percent: count_share(low, total),
            out_of_stock_percent: count_share(out, total),
            in_stock_percent: if total == 0 {
                0.0
            } else {
                count_share(total - out, total)
            },
            low_stock,
            out_of_stock,
        }
    }
}
