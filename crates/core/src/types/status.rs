//! Status enums for Shopify orders and products.

use serde::{Deserialize, Serialize};

/// Order fulfillment status.
///
/// Maps to Shopify's `OrderDisplayFulfillmentStatus` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FulfillmentStatus {
    #[default]
    Unfulfilled,
    PartiallyFulfilled,
    Fulfilled,
    Restocked,
    PendingFulfillment,
    Open,
    InProgress,
    OnHold,
    Scheduled,
    #[serde(other)]
    Unknown,
}

impl FulfillmentStatus {
    /// Human-readable label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Unfulfilled => "Unfulfilled",
            Self::PartiallyFulfilled => "Partially fulfilled",
            Self::Fulfilled => "Fulfilled",
            Self::Restocked => "Restocked",
            Self::PendingFulfillment => "Pending fulfillment",
            Self::Open => "Open",
            Self::InProgress => "In progress",
            Self::OnHold => "On hold",
            Self::Scheduled => "Scheduled",
            Self::Unknown => "Unknown",
        }
    }

    /// Whether the order still has items waiting to ship.
    #[must_use]
    pub const fn is_pending_shipment(self) -> bool {
        matches!(
            self,
            Self::Unfulfilled
                | Self::PendingFulfillment
                | Self::Open
                | Self::InProgress
                | Self::OnHold
                | Self::Scheduled
        )
    }
}

/// Order financial status.
///
/// Maps to Shopify's `OrderDisplayFinancialStatus` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FinancialStatus {
    #[default]
    Pending,
    Authorized,
    PartiallyPaid,
    Paid,
    PartiallyRefunded,
    Refunded,
    Voided,
    Expired,
    #[serde(other)]
    Unknown,
}

impl FinancialStatus {
    /// Human-readable label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Authorized => "Authorized",
            Self::PartiallyPaid => "Partially paid",
            Self::Paid => "Paid",
            Self::PartiallyRefunded => "Partially refunded",
            Self::Refunded => "Refunded",
            Self::Voided => "Voided",
            Self::Expired => "Expired",
            Self::Unknown => "Unknown",
        }
    }

    /// Badge tone used by templates.
    #[must_use]
    pub const fn tone(self) -> &'static str {
        match self {
            Self::Paid => "success",
            Self::Refunded | Self::Voided | Self::Expired => "critical",
            _ => "warning",
        }
    }
}

/// Product publication status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProductStatus {
    #[default]
    Active,
    Draft,
    Archived,
    #[serde(other)]
    Unknown,
}

impl std::fmt::Display for ProductStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Draft => write!(f, "draft"),
            Self::Archived => write!(f, "archived"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

impl std::str::FromStr for ProductStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "active" => Ok(Self::Active),
            "draft" => Ok(Self::Draft),
            "archived" => Ok(Self::Archived),
            _ => Err(format!("invalid product status: {s}")),
        }
    }
}
