//! GrowthPilot AI library.
//!
//! Shopify analytics dashboard with AI-generated insights, served as an
//! embedded-style Shopify app. The binary in `main.rs` wires these modules
//! into an axum server. Integration tests and the CLI use the library.
//!
//! # Access
//!
//! Each installed shop stores an offline Admin API token. Pages under `/app`
//! and `/api` require a shop in the browser session (set by the OAuth
//! callback) and only read store data.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod ai;
pub mod config;
pub mod db;
pub mod error;
pub mod filters;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod shopify;
pub mod state;

#[cfg(test)]
pub(crate) mod test_support;
