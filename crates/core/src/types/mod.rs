//! Core types for GrowthPilot AI.
//!
//! This module provides type-safe wrappers for Shopify IDs, money and
//! statuses, plus the request-scoped records the metrics operate on.

pub mod id;
pub mod money;
pub mod records;
pub mod status;

pub use id::*;
pub use money::{CurrencyCode, Money, format_count, format_currency, format_percent};
pub use records::*;
pub use status::*;
