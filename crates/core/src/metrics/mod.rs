//! Pure aggregations over request-scoped Shopify records.
//!
//! Every function here reduces a slice of records into fixed-size buckets or
//! summary numbers. Divide-by-zero is guarded the same way everywhere: count
//! ratios divide by `max(total, 1)` and money ratios return `0` when the
//! denominator is not positive.

pub mod cohort;
pub mod customers;
pub mod funnel;
pub mod health;
pub mod heatmap;
pub mod inventory;
pub mod orders;
pub mod revenue;
pub mod scorecard;

pub use cohort::{CohortRow, RETENTION_MONTHS, cohort_retention};
pub use customers::{CustomerStats, TopCustomer};
pub use funnel::{Funnel, FunnelStage};
pub use health::{HealthBand, StoreHealthInputs, StoreHealthScore};
pub use heatmap::{HeatLevel, NormalizedHeatmap, SalesHeatmap};
pub use inventory::{DEFAULT_LOW_STOCK_THRESHOLD, InventoryHealth, StockItem};
pub use orders::{OrderFilter, OrderStatusCounts, filter_orders, stale_unfulfilled};
pub use revenue::{
    BreakdownRow, DayBucket, HourRow, NewVsReturning, RevenueSummary, WeekBucket, WeekdayRow,
    bar_heights, breakdown_by, daily_buckets, fill_days, hourly_revenue, percent_change,
    revenue_goal_progress, weekday_breakdown, weekly_velocity,
};
pub use scorecard::{PerformanceBand, ScorecardMetric, percentile_rank, weekly_scorecard};

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

/// `part / max(total, 1) * 100`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn count_share(part: u64, total: u64) -> f64 {
    part as f64 / total.max(1) as f64 * 100.0
}

/// `part / total * 100`, or `0` when `total` is not positive.
#[must_use]
pub fn money_share(part: Decimal, total: Decimal) -> f64 {
    if total <= Decimal::ZERO {
        return 0.0;
    }
    ((part / total) * Decimal::ONE_HUNDRED)
        .to_f64()
        .unwrap_or(0.0)
}

/// Lossy conversion for chart scaling and percentile ranking.
#[must_use]
pub fn to_f64(value: Decimal) -> f64 {
    value.to_f64().unwrap_or(0.0)
}
