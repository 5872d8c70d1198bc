//! Revenue totals and time-bucketed revenue series.

use std::collections::{BTreeMap, HashMap};

use chrono::{Datelike, NaiveDate, TimeDelta, Timelike, Weekday};
use rust_decimal::Decimal;
use serde::Serialize;

use super::{count_share, money_share, to_f64};
use crate::types::{CurrencyCode, OrderRecord};

/// Headline revenue numbers for a set of orders.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RevenueSummary {
    pub currency: CurrencyCode,
    /// Sum of order totals.
    pub gross: Decimal,
    pub subtotal: Decimal,
    pub discounts: Decimal,
    pub tax: Decimal,
    pub shipping: Decimal,
    pub refunded: Decimal,
    /// `gross - discounts`.
    pub net: Decimal,
    /// `gross - refunded - tax`.
    pub net_revenue: Decimal,
    /// `subtotal - refunded`.
    pub gross_profit: Decimal,
    /// Average order value.
    pub aov: Decimal,
    pub order_count: u64,
    pub units: u64,
    /// Orders with any refund.
    pub refunded_order_count: u64,
    /// Share of orders with any refund, `refunded_order_count / order_count * 100`.
    pub refund_rate: f64,
    /// `gross_profit / gross * 100`.
    pub avg_margin: f64,
}

impl RevenueSummary {
    /// Reduce orders into a summary. The currency is taken from the first
    /// order, since Shopify reports every order in shop currency.
    #[must_use]
    pub fn from_orders(orders: &[OrderRecord]) -> Self {
        let mut gross = Decimal::ZERO;
        let mut subtotal = Decimal::ZERO;
        let mut discounts = Decimal::ZERO;
        let mut tax = Decimal::ZERO;
        let mut shipping = Decimal::ZERO;
        let mut refunded = Decimal::ZERO;
        let mut units = 0;
        let mut refunded_order_count = 0;

        for order in orders {
            gross += order.total;
            subtotal += order.subtotal;
            discounts += order.total_discounts;
            tax += order.total_tax;
            shipping += order.total_shipping;
            refunded += order.total_refunded;
            units += order.units();
            if order.total_refunded > Decimal::ZERO {
                refunded_order_count += 1;
            }
        }

        let order_count = orders.len() as u64;
        let aov = if order_count == 0 {
            Decimal::ZERO
        } else {
            gross / Decimal::from(order_count)
        };
        let gross_profit = subtotal - refunded;

        Self {
            currency: orders.first().map(|o| o.currency).unwrap_or_default(),
            gross,
            subtotal,
            discounts,
            tax,
            shipping,
            refunded,
            net: gross - discounts,
            net_revenue: gross - refunded - tax,
            gross_profit,
            aov,
            order_count,
            units,
            refunded_order_count,
            refund_rate: count_share(refunded_order_count, order_count),
            avg_margin: money_share(gross_profit, gross),
        }
    }
}

/// Revenue, order count, refunds, tax and shipping for one calendar day (UTC).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DayBucket {
    pub revenue: Decimal,
    pub orders: u64,
    pub refunds: Decimal,
    pub tax: Decimal,
    pub shipping: Decimal,
}

impl DayBucket {
    /// Revenue less tax and shipping.
    #[must_use]
    pub fn net(&self) -> Decimal {
        self.revenue - self.tax - self.shipping
    }

    /// `refunds / revenue * 100`, 0 on a day without revenue.
    #[must_use]
    pub fn refund_rate(&self) -> f64 {
        money_share(self.refunds, self.revenue)
    }
}

/// Group orders by the UTC date they were created on.
///
/// The per-day revenue values sum exactly to the summed order totals.
#[must_use]
pub fn daily_buckets(orders: &[OrderRecord]) -> BTreeMap<NaiveDate, DayBucket> {
    let mut buckets: BTreeMap<NaiveDate, DayBucket> = BTreeMap::new();
    for order in orders {
        let bucket = buckets.entry(order.created_at.date_naive()).or_default();
        bucket.revenue += order.total;
        bucket.orders += 1;
        bucket.refunds += order.total_refunded;
        bucket.tax += order.total_tax;
        bucket.shipping += order.total_shipping;
    }
    buckets
}

/// Dense series of the `days` days ending at `end` (inclusive), with empty
/// days filled with zeros.
#[must_use]
pub fn fill_days(
    buckets: &BTreeMap<NaiveDate, DayBucket>,
    end: NaiveDate,
    days: u32,
) -> Vec<(NaiveDate, DayBucket)> {
    (0..i64::from(days))
        .rev()
        .map(|offset| {
            let day = end - TimeDelta::days(offset);
            (day, buckets.get(&day).copied().unwrap_or_default())
        })
        .collect()
}

/// Revenue for one hour of the day, today versus yesterday.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HourRow {
    pub hour: u32,
    pub today: Decimal,
    pub yesterday: Decimal,
}

/// Revenue per UTC hour for `today` and the day before.
#[must_use]
pub fn hourly_revenue(orders: &[OrderRecord], today: NaiveDate) -> Vec<HourRow> {
    let yesterday = today - TimeDelta::days(1);
    let mut rows: Vec<HourRow> = (0..24)
        .map(|hour| HourRow {
            hour,
            today: Decimal::ZERO,
            yesterday: Decimal::ZERO,
        })
        .collect();

    for order in orders {
        let day = order.created_at.date_naive();
        let Some(row) = rows.get_mut(order.created_at.hour() as usize) else {
            continue;
        };
        if day == today {
            row.today += order.total;
        } else if day == yesterday {
            row.yesterday += order.total;
        }
    }
    rows
}

/// Orders and revenue for one day of the week.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WeekdayRow {
    pub weekday: Weekday,
    pub label: &'static str,
    pub orders: u64,
    pub revenue: Decimal,
}

pub(crate) const WEEKDAYS: [(Weekday, &str); 7] = [
    (Weekday::Mon, "Mon"),
    (Weekday::Tue, "Tue"),
    (Weekday::Wed, "Wed"),
    (Weekday::Thu, "Thu"),
    (Weekday::Fri, "Fri"),
    (Weekday::Sat, "Sat"),
    (Weekday::Sun, "Sun"),
];

/// Seven rows, Monday first.
#[must_use]
pub fn weekday_breakdown(orders: &[OrderRecord]) -> Vec<WeekdayRow> {
    let mut rows: Vec<WeekdayRow> = WEEKDAYS
        .iter()
        .map(|&(weekday, label)| WeekdayRow {
            weekday,
            label,
            orders: 0,
            revenue: Decimal::ZERO,
        })
        .collect();

    for order in orders {
        let idx = order.created_at.weekday().num_days_from_monday() as usize;
        if let Some(row) = rows.get_mut(idx) {
            row.orders += 1;
            row.revenue += order.total;
        }
    }
    rows
}

/// Revenue and orders for one week.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WeekBucket {
    /// The Sunday the week starts on.
    pub week_start: NaiveDate,
    pub revenue: Decimal,
    pub orders: u64,
}

impl WeekBucket {
    /// Average order value for the week.
    #[must_use]
    pub fn aov(&self) -> Decimal {
        if self.orders == 0 {
            Decimal::ZERO
        } else {
            self.revenue / Decimal::from(self.orders)
        }
    }
}

/// The Sunday on or before `date`.
#[must_use]
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - TimeDelta::days(i64::from(date.weekday().num_days_from_sunday()))
}

/// Sales velocity by Sunday-start week, oldest first.
#[must_use]
pub fn weekly_velocity(orders: &[OrderRecord]) -> Vec<WeekBucket> {
    let mut weeks: BTreeMap<NaiveDate, WeekBucket> = BTreeMap::new();
    for order in orders {
        let start = week_start(order.created_at.date_naive());
        let bucket = weeks.entry(start).or_insert(WeekBucket {
            week_start: start,
            revenue: Decimal::ZERO,
            orders: 0,
        });
        bucket.revenue += order.total;
        bucket.orders += 1;
    }
    weeks.into_values().collect()
}

/// One group in a revenue breakdown (channel, gateway, country).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BreakdownRow {
    pub label: String,
    pub revenue: Decimal,
    pub orders: u64,
    /// Share of total revenue, in percent.
    pub share: f64,
}

/// Group orders by `key`, sorted by revenue descending.
///
/// Orders without a key are grouped under `default`. When `limit` is given
/// only the top groups are returned; shares stay relative to all revenue.
pub fn breakdown_by<F>(
    orders: &[OrderRecord],
    key: F,
    default: &str,
    limit: Option<usize>,
) -> Vec<BreakdownRow>
where
    F: Fn(&OrderRecord) -> Option<&str>,
{
    let mut groups: HashMap<String, (Decimal, u64)> = HashMap::new();
    let mut total = Decimal::ZERO;

    for order in orders {
        let label = key(order)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(default);
        let entry = groups.entry(label.to_string()).or_default();
        entry.0 += order.total;
        entry.1 += 1;
        total += order.total;
    }

    let mut rows: Vec<BreakdownRow> = groups
        .into_iter()
        .map(|(label, (revenue, orders))| BreakdownRow {
            share: money_share(revenue, total),
            label,
            revenue,
            orders,
        })
        .collect();

    rows.sort_by(|a, b| b.revenue.cmp(&a.revenue).then_with(|| a.label.cmp(&b.label)));
    if let Some(limit) = limit {
        rows.truncate(limit);
    }
    rows
}

/// Orders split by whether the customer had ordered before.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct NewVsReturning {
    pub new_orders: u64,
    pub returning_orders: u64,
    pub new_revenue: Decimal,
    pub returning_revenue: Decimal,
    /// Share of orders from returning customers, in percent.
    pub returning_share: f64,
}

impl NewVsReturning {
    /// Guest checkouts count as new.
    #[must_use]
    pub fn from_orders(orders: &[OrderRecord]) -> Self {
        let mut split = Self::default();
        for order in orders {
            if order.is_returning_customer() {
                split.returning_orders += 1;
                split.returning_revenue += order.total;
            } else {
                split.new_orders += 1;
                split.new_revenue += order.total;
            }
        }
        split.returning_share =
            count_share(split.returning_orders, split.new_orders + split.returning_orders);
        split
    }
}

/// Progress toward a revenue goal, capped at 100.
#[must_use]
pub fn revenue_goal_progress(current: Decimal, goal: Decimal) -> f64 {
    money_share(current, goal).clamp(0.0, 100.0)
}

/// Percent change from `previous` to `current`, or `None` without a baseline.
#[must_use]
pub fn percent_change(current: Decimal, previous: Decimal) -> Option<f64> {
    if previous <= Decimal::ZERO {
        return None;
    }
    Some(to_f64((current - previous) / previous * Decimal::ONE_HUNDRED))
}

/// Bar heights in percent of the largest value (scaled against at least 1).
#[must_use]
pub fn bar_heights(values: &[Decimal]) -> Vec<f64> {
    let max = values
        .iter()
        .copied()
        .max()
        .unwrap_or(Decimal::ZERO)
        .max(Decimal::ONE);
    values
        .iter()
        .map(|v| money_share(*v, max).max(0.0))
        .collect()
}
