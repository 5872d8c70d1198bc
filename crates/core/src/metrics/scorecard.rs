//! Weekly performance scorecard ranked against recent weeks.

use chrono::{NaiveDate, TimeDelta};
use rust_decimal::Decimal;
use serde::Serialize;

use super::revenue::{WeekBucket, week_start, weekly_velocity};
use super::to_f64;
use crate::types::OrderRecord;

/// Percentile band for a scorecard metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PerformanceBand {
    Excellent,
    Good,
    Average,
    Poor,
}

impl PerformanceBand {
    #[must_use]
    pub fn from_percentile(percentile: f64) -> Self {
        if percentile >= 75.0 {
            Self::Excellent
        } else if percentile >= 50.0 {
            Self::Good
        } else if percentile >= 25.0 {
            Self::Average
        } else {
            Self::Poor
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Excellent => "Excellent",
            Self::Good => "Good",
            Self::Average => "Average",
            Self::Poor => "Needs work",
        }
    }
}

/// Position of `value` in ascending `history`, as a percent of its length.
///
/// Equals the number of history values strictly below `value`, so a value
/// that ties with the lowest week ranks at 0.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn percentile_rank(value: f64, history: &[f64]) -> f64 {
    if history.is_empty() {
        return 0.0;
    }
    let below = history.iter().filter(|&&h| h < value).count();
    below as f64 / history.len() as f64 * 100.0
}

/// One ranked metric.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScorecardMetric {
    pub label: &'static str,
    pub value: Decimal,
    pub is_currency: bool,
    pub percentile: f64,
    pub band: PerformanceBand,
}

/// Rank this week's revenue, order count and AOV against the `weeks` most
/// recent Sunday-start weeks ending with the week containing `today`.
///
/// Weeks without orders count as zero.
#[must_use]
pub fn weekly_scorecard(
    orders: &[OrderRecord],
    today: NaiveDate,
    weeks: usize,
) -> Vec<ScorecardMetric> {
    let current_start = week_start(today);
    let observed = weekly_velocity(orders);

    let series: Vec<WeekBucket> = (0..weeks.max(1))
        .rev()
        .map(|back| {
            let start = current_start - TimeDelta::weeks(i64::try_from(back).unwrap_or(0));
            observed
                .iter()
                .find(|w| w.week_start == start)
                .copied()
                .unwrap_or(WeekBucket {
                    week_start: start,
                    revenue: Decimal::ZERO,
                    orders: 0,
                })
        })
        .collect();

    let Some(current) = series.last().copied() else {
        return Vec::new();
    };

    let rank = |label, value: Decimal, is_currency, pick: fn(&WeekBucket) -> Decimal| {
        let history: Vec<f64> = series.iter().map(|w| to_f64(pick(w))).collect();
        let percentile = percentile_rank(to_f64(value), &history);
        ScorecardMetric {
            label,
            value,
            is_currency,
            percentile,
            band: PerformanceBand::from_percentile(percentile),
        }
    };

    vec![
        rank("Revenue", current.revenue, true, |w| w.revenue),
        rank("Orders", Decimal::from(current.orders), false, |w| {
            Decimal::from(w.orders)
        }),
        rank("Avg order value", current.aov(), true, WeekBucket::aov),
    ]
}
