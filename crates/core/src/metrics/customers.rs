//! Customer segmentation.

use std::collections::HashMap;

use chrono::{DateTime, TimeDelta, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use super::count_share;
use crate::types::{CustomerId, CustomerRecord};

/// Lifetime spend above which a customer is a VIP.
pub const VIP_SPEND_THRESHOLD: Decimal = Decimal::from_parts(500, 0, 0, false, 0);
/// Customers inactive this long are at risk.
pub const AT_RISK_DAYS: i64 = 90;
/// Customers created within this window are new.
pub const NEW_CUSTOMER_DAYS: i64 = 30;

const TOP_COUNTRIES: usize = 5;
const TOP_CUSTOMERS: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopCustomer {
    pub id: CustomerId,
    pub name: String,
    pub email: Option<String>,
    pub orders: u64,
    pub spent: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CustomerStats {
    pub total: u64,
    pub total_spent: Decimal,
    pub avg_spent: Decimal,
    /// More than one order.
    pub returning: u64,
    pub new_customers: u64,
    pub vip: u64,
    pub at_risk: u64,
    pub returning_rate: f64,
    pub top_countries: Vec<(String, u64)>,
    pub top_customers: Vec<TopCustomer>,
}

impl CustomerStats {
    #[must_use]
    pub fn from_customers(customers: &[CustomerRecord], now: DateTime<Utc>) -> Self {
        let new_cutoff = now - TimeDelta::days(NEW_CUSTOMER_DAYS);
        let risk_cutoff = now - TimeDelta::days(AT_RISK_DAYS);

        let mut total_spent = Decimal::ZERO;
        let mut returning = 0;
        let mut new_customers = 0;
        let mut vip = 0;
        let mut at_risk = 0;
        let mut countries: HashMap<&str, u64> = HashMap::new();

        for c in customers {
            total_spent += c.amount_spent;
            if c.orders_count > 1 {
                returning += 1;
            }
            if c.created_at >= new_cutoff {
                new_customers += 1;
            }
            if c.amount_spent > VIP_SPEND_THRESHOLD {
                vip += 1;
            }
            if c.orders_count > 0 && c.updated_at < risk_cutoff {
                at_risk += 1;
            }
            let country = c
                .country
                .as_deref()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or("Unknown");
            *countries.entry(country).or_default() += 1;
        }

        let total = customers.len() as u64;
        let avg_spent = if total == 0 {
            Decimal::ZERO
        } else {
            total_spent / Decimal::from(total)
        };

        let mut top_countries: Vec<(String, u64)> = countries
            .into_iter()
            .map(|(name, count)| (name.to_string(), count))
            .collect();
        top_countries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        top_countries.truncate(TOP_COUNTRIES);

        let mut ranked: Vec<&CustomerRecord> = customers.iter().collect();
        ranked.sort_by(|a, b| b.amount_spent.cmp(&a.amount_spent));
        let top_customers = ranked
            .into_iter()
            .take(TOP_CUSTOMERS)
            .map(|c| TopCustomer {
                id: c.id.clone(),
                name: c.display_name.clone(),
                email: c.email.clone(),
                orders: c.orders_count,
                spent: c.amount_spent,
            })
            .collect();

        Self {
            total,
            total_spent,
            avg_spent,
            returning,
            new_customers,
            vip,
            at_risk,
            returning_rate: count_share(returning, total),
            top_countries,
            top_customers,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{at, customer, dec};

    #[test]
    fn test_vip_constant() {
        assert_eq!(VIP_SPEND_THRESHOLD, dec("500"));
    }

    #[test]
    fn test_customer_segments() {
        let now = at("2024-06-30T00:00:00Z");
        let mut customers = vec![
            // new, single order
            customer(1, 1, "50", "2024-06-20T00:00:00Z", "2024-06-20T00:00:00Z"),
            // VIP returning
            customer(2, 8, "900", "2023-01-01T00:00:00Z", "2024-06-01T00:00:00Z"),
            // at risk: last activity in January
            customer(3, 2, "120", "2023-06-01T00:00:00Z", "2024-01-10T00:00:00Z"),
            // never ordered, stale: not at risk
            customer(4, 0, "0", "2023-06-01T00:00:00Z", "2023-06-01T00:00:00Z"),
            // exactly 500 is not VIP
            customer(5, 3, "500", "2023-06-01T00:00:00Z", "2024-06-01T00:00:00Z"),
        ];
        customers[1].country = Some("Canada".to_string());
        customers[2].country = Some("Canada".to_string());

        let stats = CustomerStats::from_customers(&customers, now);
        assert_eq!(stats.total, 5);
        assert_eq!(stats.total_spent, dec("1570"));
        assert_eq!(stats.avg_spent, dec("314"));
        assert_eq!(stats.returning, 3);
        assert_eq!(stats.new_customers, 1);
        assert_eq!(stats.vip, 1);
        assert_eq!(stats.at_risk, 1);
        assert_eq!(stats.top_countries[0], ("Unknown".to_string(), 3));
        assert_eq!(stats.top_countries[1], ("Canada".to_string(), 2));
        assert_eq!(stats.top_customers[0].spent, dec("900"));
        assert_eq!(stats.top_customers.len(), 5);
    }

    #[test]
    fn test_empty_customers() {
        let stats = CustomerStats::from_customers(&[], at("2024-06-30T00:00:00Z"));
        assert_eq!(stats.avg_spent, Decimal::ZERO);
        assert!(stats.top_customers.is_empty());
    }
}
