//! Order status counts, list filtering and stale-order detection.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use super::count_share;
use crate::types::{FinancialStatus, FulfillmentStatus, OrderRecord};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct OrderStatusCounts {
    pub total: u64,
    pub paid: u64,
    pub pending: u64,
    pub refunded: u64,
    pub partially_refunded: u64,
    pub fulfilled: u64,
    pub unfulfilled: u64,
    pub partially_fulfilled: u64,
    /// `fulfilled / max(total, 1) * 100`.
    pub fulfillment_rate: f64,
}

impl OrderStatusCounts {
    #[must_use]
    pub fn from_orders(orders: &[OrderRecord]) -> Self {
        let mut counts = Self {
            total: orders.len() as u64,
            ..Self::default()
        };

        for order in orders {
            match order.financial_status {
                FinancialStatus::Paid => counts.paid += 1,
                FinancialStatus::Pending | FinancialStatus::Authorized => counts.pending += 1,
                FinancialStatus::Refunded => counts.refunded += 1,
                FinancialStatus::PartiallyRefunded => counts.partially_refunded += 1,
                _ => {}
            }
            match order.fulfillment_status {
                FulfillmentStatus::Fulfilled => counts.fulfilled += 1,
                FulfillmentStatus::PartiallyFulfilled => counts.partially_fulfilled += 1,
                status if status.is_pending_shipment() => counts.unfulfilled += 1,
                _ => {}
            }
        }

        counts.fulfillment_rate = count_share(counts.fulfilled, counts.total);
        counts
    }
}

/// Status filter on the orders page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderFilter {
    #[default]
    All,
    Paid,
    Pending,
    Refunded,
    Unfulfilled,
    Fulfilled,
}

impl OrderFilter {
    pub const ALL: [Self; 6] = [
        Self::All,
        Self::Paid,
        Self::Pending,
        Self::Refunded,
        Self::Unfulfilled,
        Self::Fulfilled,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Paid => "paid",
            Self::Pending => "pending",
            Self::Refunded => "refunded",
            Self::Unfulfilled => "unfulfilled",
            Self::Fulfilled => "fulfilled",
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::All => "All",
            Self::Paid => "Paid",
            Self::Pending => "Pending",
            Self::Refunded => "Refunded",
            Self::Unfulfilled => "Unfulfilled",
            Self::Fulfilled => "Fulfilled",
        }
    }

    #[must_use]
    pub fn matches(self, order: &OrderRecord) -> bool {
        match self {
            Self::All => true,
            Self::Paid => order.financial_status == FinancialStatus::Paid,
            Self::Pending => matches!(
                order.financial_status,
                FinancialStatus::Pending | FinancialStatus::Authorized
            ),
            Self::Refunded => matches!(
                order.financial_status,
                FinancialStatus::Refunded | FinancialStatus::PartiallyRefunded
            ),
            Self::Unfulfilled => order.fulfillment_status.is_pending_shipment(),
            Self::Fulfilled => order.fulfillment_status == FulfillmentStatus::Fulfilled,
        }
    }
}

impl std::str::FromStr for OrderFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|f| f.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("invalid order filter: {s}"))
    }
}

/// Apply a status filter and a case-insensitive search over order name and
/// customer name.
#[must_use]
pub fn filter_orders<'a>(
    orders: &'a [OrderRecord],
    filter: OrderFilter,
    query: Option<&str>,
) -> Vec<&'a OrderRecord> {
    let needle = query
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .map(str::to_lowercase);

    orders
        .iter()
        .filter(|o| filter.matches(o))
        .filter(|o| {
            needle.as_deref().is_none_or(|n| {
                o.name.to_lowercase().contains(n) || o.customer_name().to_lowercase().contains(n)
            })
        })
        .collect()
}

/// Open orders awaiting shipment for longer than `hours`.
#[must_use]
pub fn stale_unfulfilled(
    orders: &[OrderRecord],
    now: DateTime<Utc>,
    hours: i64,
) -> Vec<&OrderRecord> {
    let cutoff = now - TimeDelta::hours(hours);
    let mut stale: Vec<&OrderRecord> = orders
        .iter()
        .filter(|o| !o.cancelled)
        .filter(|o| o.fulfillment_status.is_pending_shipment())
        .filter(|o| o.created_at < cutoff)
        .collect();
    stale.sort_by_key(|o| o.created_at);
    stale
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{at, order, with_customer};

    fn status(
        mut order: OrderRecord,
        financial: FinancialStatus,
        fulfillment: FulfillmentStatus,
    ) -> OrderRecord {
        order.financial_status = financial;
        order.fulfillment_status = fulfillment;
        order
    }

    #[test]
    fn test_status_counts() {
        let orders = vec![
            status(order("2024-03-01T10:00:00Z", "1"), FinancialStatus::Paid, FulfillmentStatus::Fulfilled),
            status(order("2024-03-01T10:00:00Z", "1"), FinancialStatus::Paid, FulfillmentStatus::Unfulfilled),
            status(order("2024-03-01T10:00:00Z", "1"), FinancialStatus::Pending, FulfillmentStatus::PartiallyFulfilled),
            status(order("2024-03-01T10:00:00Z", "1"), FinancialStatus::Refunded, FulfillmentStatus::Restocked),
        ];
        let counts = OrderStatusCounts::from_orders(&orders);
        assert_eq!(counts.total, 4);
        assert_eq!(counts.paid, 2);
        assert_eq!(counts.pending, 1);
        assert_eq!(counts.refunded, 1);
        assert_eq!(counts.fulfilled, 1);
        assert_eq!(counts.unfulfilled, 1);
        assert_eq!(counts.partially_fulfilled, 1);
        assert!((counts.fulfillment_rate - 25.0).abs() < 1e-9);
    }

    #[test]
    fn test_filter_parse() {
        assert_eq!("PAID".parse::<OrderFilter>().unwrap(), OrderFilter::Paid);
        assert!("shipped".parse::<OrderFilter>().is_err());
    }

    #[test]
    fn test_filter_orders_status_and_search() {
        let mut a = with_customer(order("2024-03-01T10:00:00Z", "1"), 7, 1);
        a.name = "#1001".into();
        let mut b = status(
            order("2024-03-01T10:00:00Z", "1"),
            FinancialStatus::Refunded,
            FulfillmentStatus::Fulfilled,
        );
        b.name = "#1002".into();

        let orders = vec![a, b];
        assert_eq!(filter_orders(&orders, OrderFilter::All, None).len(), 2);
        assert_eq!(filter_orders(&orders, OrderFilter::Refunded, None).len(), 1);
        assert_eq!(filter_orders(&orders, OrderFilter::All, Some("1002")).len(), 1);
        assert_eq!(filter_orders(&orders, OrderFilter::All, Some("customer 7")).len(), 1);
        assert_eq!(filter_orders(&orders, OrderFilter::All, Some("guest")).len(), 1);
        assert_eq!(filter_orders(&orders, OrderFilter::All, Some("   ")).len(), 2);
    }

    #[test]
    fn test_stale_unfulfilled() {
        let now = at("2024-03-10T12:00:00Z");
        let old = status(
            order("2024-03-07T12:00:00Z", "1"),
            FinancialStatus::Paid,
            FulfillmentStatus::Unfulfilled,
        );
        let fresh = status(
            order("2024-03-10T00:00:00Z", "1"),
            FinancialStatus::Paid,
            FulfillmentStatus::Unfulfilled,
        );
        let mut cancelled = old.clone();
        cancelled.cancelled = true;
        let shipped = order("2024-03-01T00:00:00Z", "1");

        let orders = vec![old, fresh, cancelled, shipped];
        let stale = stale_unfulfilled(&orders, now, 48);
        assert_eq!(stale.len(), 1);
    }
}
