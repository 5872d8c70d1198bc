//! HTTP middleware stack.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layers (capture errors, one hub per request)
//! 2. `TraceLayer` (the `http_request` span)
//! 3. Request ID (recorded in the span and the Sentry scope)
//! 4. Session layer (tower-sessions with `PostgreSQL` store)
//! 5. Security headers
//!
//! Routes that need an installed shop take the [`RequireShop`] extractor.

pub mod auth;
pub mod request_id;
pub mod security_headers;
pub mod session;

pub use auth::{OptionalShop, RequireShop, clear_current_shop, set_current_shop};
pub use request_id::request_id_middleware;
pub use security_headers::security_headers_middleware;
pub use session::create_session_layer;
