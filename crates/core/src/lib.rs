//! GrowthPilot AI Core - Shared types, metrics and billing plans.
//!
//! This crate provides what all GrowthPilot components share:
//! - `app` - The merchant-facing dashboard server
//! - `cli` - Command-line tools for migrations and management
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no
//! database access, no HTTP clients. Loaders in the app fetch Shopify data,
//! convert it into [`types`] records and hand them to [`metrics`].
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for Shopify IDs, money, statuses and records
//! - [`metrics`] - Aggregations: revenue buckets, heatmaps, funnels, cohorts
//! - [`billing`] - Subscription plans and the AI usage gate

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod billing;
pub mod metrics;
pub mod types;

pub use types::*;

#[cfg(test)]
pub(crate) mod test_support;
