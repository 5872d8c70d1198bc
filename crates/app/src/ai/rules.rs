//! Static insights computed from metrics, shown when no model has run.

use serde::Serialize;

use growth_pilot_core::format_currency;
use growth_pilot_core::metrics::{InventoryHealth, RevenueSummary};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InsightTone {
    Info,
    Success,
    Warning,
    Critical,
}

impl InsightTone {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Success => "success",
            Self::Warning => "warning",
            Self::Critical => "critical",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InsightCard {
    pub kind: &'static str,
    pub title: &'static str,
    pub description: String,
    pub tone: InsightTone,
}

fn titles(items: &[growth_pilot_core::metrics::StockItem]) -> String {
    items
        .iter()
        .map(|i| i.title.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Insights derived from revenue and inventory without an LLM.
#[must_use]
pub fn rule_based_insights(summary: &RevenueSummary, inventory: &InventoryHealth) -> Vec<InsightCard> {
    let mut cards = vec![InsightCard {
        kind: "revenue",
        title: "Revenue Analysis",
        description: format!(
            "Your total revenue from recent {} orders is {}. Average order value is {}.",
            summary.order_count,
            format_currency(summary.gross, summary.currency),
            format_currency(summary.aov, summary.currency),
        ),
        tone: InsightTone::Info,
    }];

    if !inventory.low_stock.is_empty() {
        cards.push(InsightCard {
            kind: "inventory",
            title: "Low Stock Alert",
            description: format!(
                "{} products have low inventory (< {} units): {}",
                inventory.low_stock.len(),
                inventory.threshold,
                titles(&inventory.low_stock)
            ),
            tone: InsightTone::Warning,
        });
    }

    if !inventory.out_of_stock.is_empty() {
        cards.push(InsightCard {
            kind: "inventory",
            title: "Out of Stock Alert",
            description: format!(
                "{} products are out of stock: {}",
                inventory.out_of_stock.len(),
                titles(&inventory.out_of_stock)
            ),
            tone: InsightTone::Critical,
        });
    }

    cards.push(InsightCard {
        kind: "growth",
        title: "Growth Opportunity",
        description: "Consider running targeted email campaigns to increase repeat purchases. \
                      Focus on your top-selling products to maximize revenue."
            .to_string(),
        tone: InsightTone::Success,
    });
    cards.push(InsightCard {
        kind: "optimization",
        title: "Store Optimization",
        description: "Review your product descriptions and images. Well-optimized listings \
                      can increase conversion rates by 20-30%."
            .to_string(),
        tone: InsightTone::Info,
    });

    cards
}

#[cfg(test)]
mod tests {
    use growth_pilot_core::ProductStatus;
    use growth_pilot_core::metrics::DEFAULT_LOW_STOCK_THRESHOLD;

    use super::*;
    use crate::test_support::{order, product};

    #[test]
    fn test_healthy_store_gets_three_cards() {
        let orders = vec![order("#1", 0, "40.00"), order("#2", 5, "60.00")];
        let products = vec![product("Tent", ProductStatus::Active, 40)];
        let cards = rule_based_insights(
            &RevenueSummary::from_orders(&orders),
            &InventoryHealth::from_products(&products, DEFAULT_LOW_STOCK_THRESHOLD),
        );

        let kinds: Vec<_> = cards.iter().map(|c| c.kind).collect();
        assert_eq!(kinds, vec!["revenue", "growth", "optimization"]);
        assert_eq!(
            cards[0].description,
            "Your total revenue from recent 2 orders is $100.00. Average order value is $50.00."
        );
    }

    #[test]
    fn test_stock_problems_are_listed() {
        let products = vec![
            product("Lantern", ProductStatus::Active, 3),
            product("Stove", ProductStatus::Active, 0),
            product("Mug", ProductStatus::Active, 7),
        ];
        let cards = rule_based_insights(
            &RevenueSummary::from_orders(&[]),
            &InventoryHealth::from_products(&products, DEFAULT_LOW_STOCK_THRESHOLD),
        );

        let low = cards.iter().find(|c| c.title == "Low Stock Alert").unwrap();
        assert!(low.description.starts_with("2 products have low inventory (< 10 units): "));
        assert!(low.description.contains("Lantern"));
        assert_eq!(low.tone, InsightTone::Warning);

        let out = cards.iter().find(|c| c.title == "Out of Stock Alert").unwrap();
        assert_eq!(out.description, "1 products are out of stock: Stove");
        assert_eq!(out.tone.as_str(), "critical");
    }
}
