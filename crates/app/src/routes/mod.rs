//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                        - Landing page and install form
//!
//! # Auth
//! GET  /auth/login?shop=        - Start the OAuth install
//! GET  /auth/callback           - OAuth callback
//! POST /auth/logout             - Sign out
//!
//! # Pages (require an installed shop)
//! GET  /app                     - Dashboard
//! GET  /app/sales               - Sales analytics
//! GET  /app/products            - Products and inventory
//! GET  /app/customers           - Customer segments
//! GET  /app/orders              - Orders (?status=&q=&range=)
//! GET  /app/ai-insights         - AI insights
//! POST /app/ai-insights         - Run an AI analysis
//! GET  /app/alerts              - Alerts
//! GET  /app/billing             - Plans
//! POST /app/billing/subscribe   - Start a subscription
//! GET  /app/billing/confirm     - Return from Shopify charge approval
//! POST /app/billing/cancel      - Cancel and return to the free plan
//! GET  /app/settings            - Settings
//! POST /app/settings            - Save settings
//!
//! # JSON mirrors
//! GET  /api/dashboard, /api/sales, /api/products, /api/customers,
//!      /api/orders, /api/alerts, /api/billing, /api/settings
//! POST /api/ai-insights         - Run an AI analysis (402 over quota)
//! POST /api/ai-insights/quick   - One-line insight for a metric
//!
//! # Shopify
//! POST /webhooks                - Webhook receiver
//! ```

pub mod ai_insights;
pub mod alerts;
pub mod auth;
pub mod billing;
pub mod customers;
pub mod dashboard;
pub mod landing;
pub mod orders;
pub mod products;
pub mod sales;
pub mod settings;
pub mod view;
pub mod webhooks;

use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

/// Create the OAuth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", get(auth::login))
        .route("/callback", get(auth::callback))
        .route("/logout", post(auth::logout))
}

/// Create the embedded app page routes router.
pub fn app_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(dashboard::page))
        .route("/sales", get(sales::page))
        .route("/products", get(products::page))
        .route("/customers", get(customers::page))
        .route("/orders", get(orders::page))
        .route(
            "/ai-insights",
            get(ai_insights::page).post(ai_insights::analyze),
        )
        .route("/alerts", get(alerts::page))
        .route("/billing", get(billing::page))
        .route("/billing/subscribe", post(billing::subscribe))
        .route("/billing/confirm", get(billing::confirm))
        .route("/billing/cancel", post(billing::cancel))
        .route("/settings", get(settings::page).post(settings::save))
}

/// Create the JSON API routes router.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(dashboard::api))
        .route("/sales", get(sales::api))
        .route("/products", get(products::api))
        .route("/customers", get(customers::api))
        .route("/orders", get(orders::api))
        .route("/ai-insights", post(ai_insights::api))
        .route("/ai-insights/quick", post(ai_insights::quick))
        .route("/alerts", get(alerts::api))
        .route("/billing", get(billing::api))
        .route("/settings", get(settings::api))
}

/// Create all application routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(landing::page))
        .nest("/auth", auth_routes())
        .nest("/app", app_routes())
        .nest("/api", api_routes())
        .route("/webhooks", post(webhooks::receive))
}
