//! Composite store health score.

use serde::Serialize;

/// Percent inputs to the health score, each in `[0, 100]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct StoreHealthInputs {
    pub in_stock_rate: f64,
    pub fulfillment_rate: f64,
    pub refund_rate: f64,
    pub returning_rate: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthBand {
    Healthy,
    Fair,
    NeedsAttention,
}

impl HealthBand {
    #[must_use]
    pub const fn from_score(score: u8) -> Self {
        match score {
            80.. => Self::Healthy,
            60..=79 => Self::Fair,
            _ => Self::NeedsAttention,
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Healthy => "Healthy",
            Self::Fair => "Fair",
            Self::NeedsAttention => "Needs attention",
        }
    }

    #[must_use]
    pub const fn tone(self) -> &'static str {
        match self {
            Self::Healthy => "success",
            Self::Fair => "warning",
            Self::NeedsAttention => "critical",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthComponent {
    pub label: &'static str,
    pub score: u8,
    pub weight: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoreHealthScore {
    pub score: u8,
    pub band: HealthBand,
    pub components: Vec<HealthComponent>,
}

impl StoreHealthScore {
    /// Weighted blend: stock 30%, fulfillment 30%, refunds 20%, repeat
    /// customers 20%. A 20% refund rate scores zero; a 50% returning rate
    /// scores full marks.
    #[must_use]
    pub fn compute(inputs: StoreHealthInputs) -> Self {
        let components = vec![
            component("Inventory in stock", inputs.in_stock_rate, 0.3),
            component("Orders fulfilled", inputs.fulfillment_rate, 0.3),
            component("Low refunds", 100.0 - inputs.refund_rate * 5.0, 0.2),
            component("Repeat customers", inputs.returning_rate * 2.0, 0.2),
        ];
        let blended: f64 = components
            .iter()
            .map(|c| f64::from(c.score) * c.weight)
            .sum();
        let score = to_score(blended);
        Self {
            score,
            band: HealthBand::from_score(score),
            components,
        }
    }
}

fn component(label: &'static str, raw: f64, weight: f64) -> HealthComponent {
    HealthComponent {
        label,
        score: to_score(raw),
        weight,
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn to_score(raw: f64) -> u8 {
    if raw.is_nan() {
        return 0;
    }
    raw.round().clamp(0.0, 100.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_perfect_store() {
        let score = StoreHealthScore::compute(StoreHealthInputs {
            in_stock_rate: 100.0,
            fulfillment_rate: 100.0,
            refund_rate: 0.0,
            returning_rate: 60.0,
        });
        assert_eq!(score.score, 100);
        assert_eq!(score.band, HealthBand::Healthy);
        assert_eq!(score.components.len(), 4);
    }

    #[test]
    fn test_struggling_store() {
        let score = StoreHealthScore::compute(StoreHealthInputs {
            in_stock_rate: 50.0,
            fulfillment_rate: 40.0,
            refund_rate: 25.0,
            returning_rate: 5.0,
        });
        // 15 + 12 + 0 + 2
        assert_eq!(score.score, 29);
        assert_eq!(score.band, HealthBand::NeedsAttention);
    }

    #[test]
    fn test_band_edges() {
        assert_eq!(HealthBand::from_score(80), HealthBand::Healthy);
        assert_eq!(HealthBand::from_score(79), HealthBand::Fair);
        assert_eq!(HealthBand::from_score(60), HealthBand::Fair);
        assert_eq!(HealthBand::from_score(59), HealthBand::NeedsAttention);
    }
}
