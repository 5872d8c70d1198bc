//! Analysis request and response shapes.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use growth_pilot_core::metrics::RevenueSummary;
use growth_pilot_core::{CustomerRecord, OrderRecord, ProductRecord};

/// Records of each kind forwarded to the model.
pub const SNAPSHOT_LIMIT: usize = 50;

/// Period the analysis covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisType {
    Daily,
    #[default]
    Weekly,
    Monthly,
    Custom,
}

impl AnalysisType {
    pub const ALL: [Self; 4] = [Self::Daily, Self::Weekly, Self::Monthly, Self::Custom];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Custom => "custom",
        }
    }

    /// Days of order history the analysis looks at.
    #[must_use]
    pub const fn lookback_days(self) -> i64 {
        match self {
            Self::Daily => 1,
            Self::Weekly => 7,
            Self::Monthly | Self::Custom => 30,
        }
    }
}

impl std::fmt::Display for AnalysisType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AnalysisType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("invalid analysis type: {s}"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    #[default]
    Info,
    Warning,
    Critical,
    #[serde(other)]
    Unknown,
}

impl AlertLevel {
    /// CSS tone used by the alert badge.
    #[must_use]
    pub const fn tone(self) -> &'static str {
        match self {
            Self::Info | Self::Unknown => "info",
            Self::Warning => "warning",
            Self::Critical => "critical",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    #[serde(default)]
    pub metric: String,
    #[serde(default)]
    pub prediction: String,
    #[serde(default)]
    pub confidence: f64,
}

impl Forecast {
    /// Confidence as a whole percent, clamped to `0..=100`.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn confidence_percent(&self) -> u8 {
        (self.confidence.clamp(0.0, 1.0) * 100.0).round() as u8
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisAlert {
    #[serde(rename = "type", default)]
    pub level: AlertLevel,
    #[serde(default)]
    pub message: String,
}

/// Parsed model output. Missing fields default to empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisResponse {
    pub summary: String,
    pub insights: Vec<String>,
    pub recommendations: Vec<String>,
    pub forecasts: Vec<Forecast>,
    pub alerts: Vec<AnalysisAlert>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderDigest {
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub total: Decimal,
    pub financial_status: String,
    pub items: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProductDigest {
    pub title: String,
    pub status: String,
    pub total_inventory: i64,
    pub price: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct CustomerDigest {
    pub orders_count: u64,
    pub amount_spent: Decimal,
    pub country: Option<String>,
}

/// Aggregated store data sent to the model.
///
/// Customer names and emails are left out.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StoreSnapshot {
    pub period: String,
    pub revenue: Decimal,
    pub order_count: u64,
    pub average_order_value: Decimal,
    pub orders: Vec<OrderDigest>,
    pub products: Vec<ProductDigest>,
    pub customers: Vec<CustomerDigest>,
}

impl StoreSnapshot {
    #[must_use]
    pub fn from_records(
        analysis_type: AnalysisType,
        orders: &[OrderRecord],
        products: &[ProductRecord],
        customers: &[CustomerRecord],
    ) -> Self {
        let summary = RevenueSummary::from_orders(orders);

        let mut recent: Vec<&OrderRecord> = orders.iter().collect();
        recent.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Self {
            period: analysis_type.as_str().to_string(),
            revenue: summary.gross,
            order_count: summary.order_count,
            average_order_value: summary.aov,
            orders: recent
                .into_iter()
                .take(SNAPSHOT_LIMIT)
                .map(|o| OrderDigest {
                    name: o.name.clone(),
                    created_at: o.created_at,
                    total: o.total,
                    financial_status: o.financial_status.label().to_string(),
                    items: o
                        .line_items
                        .iter()
                        .map(|li| format!("{} x{}", li.title, li.quantity))
                        .collect(),
                })
                .collect(),
            products: products
                .iter()
                .take(SNAPSHOT_LIMIT)
                .map(|p| ProductDigest {
                    title: p.title.clone(),
                    status: p.status.to_string(),
                    total_inventory: p.total_inventory,
                    price: p.price,
                })
                .collect(),
            customers: customers
                .iter()
                .take(SNAPSHOT_LIMIT)
                .map(|c| CustomerDigest {
                    orders_count: c.orders_count,
                    amount_spent: c.amount_spent,
                    country: c.country.clone(),
                })
                .collect(),
        }
    }
}
