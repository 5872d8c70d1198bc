//! Subscription plans and the AI analysis usage gate.
//!
//! Plans are static. The app persists only the plan id a shop subscribed to
//! and how many AI analyses it ran this month.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Recurring charge interval, as Shopify's `AppPricingInterval`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BillingInterval {
    Every30Days,
    Annual,
}

impl BillingInterval {
    /// GraphQL enum value.
    #[must_use]
    pub const fn as_graphql(self) -> &'static str {
        match self {
            Self::Every30Days => "EVERY_30_DAYS",
            Self::Annual => "ANNUAL",
        }
    }
}

/// Monthly AI analysis allowance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AiQuota {
    Unlimited,
    PerMonth(u32),
}

impl AiQuota {
    /// Stored and reported as an integer where `-1` means unlimited.
    pub const UNLIMITED_SENTINEL: i32 = -1;

    /// Any negative value is treated as unlimited.
    #[must_use]
    pub fn from_raw(raw: i32) -> Self {
        u32::try_from(raw).map_or(Self::Unlimited, Self::PerMonth)
    }

    #[must_use]
    pub fn as_raw(self) -> i32 {
        match self {
            Self::Unlimited => Self::UNLIMITED_SENTINEL,
            Self::PerMonth(n) => i32::try_from(n).unwrap_or(i32::MAX),
        }
    }

    #[must_use]
    pub const fn is_unlimited(self) -> bool {
        matches!(self, Self::Unlimited)
    }

    /// Monthly cap, `None` when unlimited.
    #[must_use]
    pub const fn cap(self) -> Option<u32> {
        match self {
            Self::Unlimited => None,
            Self::PerMonth(cap) => Some(cap),
        }
    }

    /// Analyses left this month, `None` when unlimited.
    #[must_use]
    pub const fn remaining(self, used: u32) -> Option<u32> {
        match self {
            Self::Unlimited => None,
            Self::PerMonth(cap) => Some(cap.saturating_sub(used)),
        }
    }
}

impl std::fmt::Display for AiQuota {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unlimited => write!(f, "Unlimited AI analyses"),
            Self::PerMonth(n) => write!(f, "{n} AI analyses/month"),
        }
    }
}

/// A subscription plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Plan {
    pub id: &'static str,
    pub name: &'static str,
    pub price: Decimal,
    pub interval: BillingInterval,
    pub trial_days: u32,
    pub ai_analyses: AiQuota,
    pub features: &'static [&'static str],
}

impl Plan {
    #[must_use]
    pub fn is_free(&self) -> bool {
        self.price.is_zero()
    }

    /// Name of the recurring charge shown to the merchant.
    #[must_use]
    pub fn subscription_name(&self) -> String {
        format!("GrowthPilot AI - {}", self.name)
    }
}

/// Identifier of the plan every shop starts on.
pub const FREE_PLAN_ID: &str = "free";

/// All plans, cheapest first.
pub static PLANS: [Plan; 4] = [
    Plan {
        id: FREE_PLAN_ID,
        name: "Free",
        price: Decimal::ZERO,
        interval: BillingInterval::Every30Days,
        trial_days: 0,
        ai_analyses: AiQuota::PerMonth(5),
        features: &[
            "Basic analytics dashboard",
            "5 AI analyses per month",
            "7-day data history",
            "Email support",
        ],
    },
    Plan {
        id: "starter",
        name: "Starter",
        price: Decimal::from_parts(1999, 0, 0, false, 2),
        interval: BillingInterval::Every30Days,
        trial_days: 14,
        ai_analyses: AiQuota::PerMonth(50),
        features: &[
            "Full analytics dashboard",
            "50 AI analyses per month",
            "30-day data history",
            "Sales forecasting",
            "Priority email support",
        ],
    },
    Plan {
        id: "professional",
        name: "Professional",
        price: Decimal::from_parts(4999, 0, 0, false, 2),
        interval: BillingInterval::Every30Days,
        trial_days: 14,
        ai_analyses: AiQuota::Unlimited,
        features: &[
            "Everything in Starter",
            "Unlimited AI analyses",
            "90-day data history",
            "Advanced forecasting",
            "Custom reports",
            "Slack notifications",
            "Phone support",
        ],
    },
    Plan {
        id: "enterprise",
        name: "Enterprise",
        price: Decimal::from_parts(14999, 0, 0, false, 2),
        interval: BillingInterval::Every30Days,
        trial_days: 14,
        ai_analyses: AiQuota::Unlimited,
        features: &[
            "Everything in Professional",
            "Unlimited data history",
            "Multi-store support",
            "API access",
            "Dedicated account manager",
            "Custom integrations",
        ],
    },
];

/// Look up a plan by id.
#[must_use]
pub fn plan_by_id(id: &str) -> Option<&'static Plan> {
    PLANS.iter().find(|p| p.id == id)
}

/// The free plan.
#[must_use]
pub fn free_plan() -> &'static Plan {
    &PLANS[0]
}

/// Whether a shop on `plan` that already ran `used` analyses this month may
/// run another one.
#[must_use]
pub const fn can_use_ai_analysis(plan: &Plan, used: u32) -> bool {
    match plan.ai_analyses {
        AiQuota::Unlimited => true,
        AiQuota::PerMonth(cap) => used < cap,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_catalog() {
        assert_eq!(PLANS.len(), 4);
        assert!(free_plan().is_free());
        assert_eq!(free_plan().id, "free");

        let starter = plan_by_id("starter").unwrap();
        assert_eq!(starter.price.to_string(), "19.99");
        assert_eq!(starter.trial_days, 14);
        assert_eq!(starter.subscription_name(), "GrowthPilot AI - Starter");

        assert_eq!(plan_by_id("professional").unwrap().price.to_string(), "49.99");
        assert_eq!(plan_by_id("enterprise").unwrap().price.to_string(), "149.99");
        assert!(plan_by_id("platinum").is_none());
    }

    #[test]
    fn test_quota_sentinel() {
        assert_eq!(AiQuota::from_raw(-1), AiQuota::Unlimited);
        assert_eq!(AiQuota::from_raw(-42), AiQuota::Unlimited);
        assert_eq!(AiQuota::from_raw(0), AiQuota::PerMonth(0));
        assert_eq!(AiQuota::from_raw(50), AiQuota::PerMonth(50));
        assert_eq!(AiQuota::Unlimited.as_raw(), -1);
        assert_eq!(AiQuota::PerMonth(5).as_raw(), 5);
    }

    #[test]
    fn test_unlimited_plan_always_allowed() {
        let pro = plan_by_id("professional").unwrap();
        assert_eq!(pro.ai_analyses.as_raw(), AiQuota::UNLIMITED_SENTINEL);
        for used in [0, 5, 50, 10_000, u32::MAX] {
            assert!(can_use_ai_analysis(pro, used));
        }
        assert_eq!(pro.ai_analyses.remaining(1_000), None);
    }

    #[test]
    fn test_capped_plan_compares_usage() {
        let free = free_plan();
        assert!(can_use_ai_analysis(free, 0));
        assert!(can_use_ai_analysis(free, 4));
        assert!(!can_use_ai_analysis(free, 5));
        assert!(!can_use_ai_analysis(free, 6));
        assert_eq!(free.ai_analyses.remaining(3), Some(2));
        assert_eq!(free.ai_analyses.remaining(9), Some(0));
        assert_eq!(free.ai_analyses.cap(), Some(5));
        assert_eq!(AiQuota::Unlimited.cap(), None);

        let starter = plan_by_id("starter").unwrap();
        assert!(can_use_ai_analysis(starter, 49));
        assert!(!can_use_ai_analysis(starter, 50));
    }

    #[test]
    fn test_interval_graphql() {
        assert_eq!(BillingInterval::Every30Days.as_graphql(), "EVERY_30_DAYS");
    }
}
