//! Monthly cohort retention.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use super::count_share;
use crate::types::{CustomerId, OrderRecord};

/// Number of month offsets reported per cohort (month 0 through month 5).
pub const RETENTION_MONTHS: usize = 6;

/// Customers acquired in one month and how many kept ordering.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CohortRow {
    /// First day of the acquisition month.
    pub month: NaiveDate,
    /// `YYYY-MM`
    pub label: String,
    pub size: u64,
    /// Retention percent per month offset. `None` once the offset runs past
    /// the newest order in the data.
    pub retention: Vec<Option<f64>>,
}

#[allow(clippy::cast_possible_wrap)]
fn month_index(date: NaiveDate) -> i32 {
    date.year() * 12 + date.month0() as i32
}

fn month_start(index: i32) -> Option<NaiveDate> {
    let year = index.div_euclid(12);
    let month = u32::try_from(index.rem_euclid(12)).ok()? + 1;
    NaiveDate::from_ymd_opt(year, month, 1)
}

/// Group customers by the month of their first order in `orders` and report
/// what share of each cohort ordered again N months later.
///
/// Guest orders are ignored. Month 0 is always 100% for a non-empty cohort.
#[must_use]
pub fn cohort_retention(orders: &[OrderRecord]) -> Vec<CohortRow> {
    let mut activity: HashMap<&CustomerId, BTreeSet<i32>> = HashMap::new();
    for order in orders {
        if let Some(customer) = &order.customer {
            activity
                .entry(&customer.id)
                .or_default()
                .insert(month_index(order.created_at.date_naive()));
        }
    }

    let Some(horizon) = activity.values().filter_map(|m| m.last()).max().copied() else {
        return Vec::new();
    };

    let mut cohorts: BTreeMap<i32, Vec<&BTreeSet<i32>>> = BTreeMap::new();
    for months in activity.values() {
        if let Some(&first) = months.first() {
            cohorts.entry(first).or_default().push(months);
        }
    }

    cohorts
        .into_iter()
        .filter_map(|(first, members)| {
            let month = month_start(first)?;
            let size = members.len() as u64;
            let retention = (0..RETENTION_MONTHS)
                .map(|offset| {
                    let target = first + i32::try_from(offset).ok()?;
                    if target > horizon {
                        return None;
                    }
                    let active = members.iter().filter(|m| m.contains(&target)).count();
                    Some(count_share(active as u64, size))
                })
                .collect();

            Some(CohortRow {
                month,
                label: month.format("%Y-%m").to_string(),
                size,
                retention,
            })
        })
        .collect()
}
