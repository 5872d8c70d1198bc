//! Unified error handling with Sentry integration.
//!
//! Route handlers return `Result<T, AppError>`. Server-side failures are
//! captured to Sentry before a generic message is sent to the client.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::ai::AiError;
use crate::db::RepositoryError;
use crate::shopify::ShopifyError;

/// Sentry tag holding the response status of the failed request.
pub const STATUS_TAG: &str = "http.status_code";

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Shopify API operation failed.
    #[error("Shopify error: {0}")]
    Shopify(#[from] ShopifyError),

    /// LLM provider call failed.
    #[error("AI error: {0}")]
    Ai(#[from] AiError),

    /// Session store failed.
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// No installed shop in the session.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// The shop's plan does not allow the action.
    #[error("Payment required: {0}")]
    PaymentRequired(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Database(_) | Self::Session(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::Shopify(ShopifyError::Unauthorized(_)) => StatusCode::UNAUTHORIZED,
            Self::Shopify(_) | Self::Ai(_) => StatusCode::BAD_GATEWAY,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::PaymentRequired(_) => StatusCode::PAYMENT_REQUIRED,
        }
    }

    fn is_server_error(&self) -> bool {
        self.status().is_server_error()
    }

    fn report(&self) {
        let status = self.status().as_u16();
        sentry::configure_scope(|scope| {
            scope.set_tag(STATUS_TAG, status);
        });
        if self.is_server_error() {
            let event_id = sentry::capture_error(self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }
    }

    /// Client-facing message. Internal details are never exposed.
    #[must_use]
    pub fn public_message(&self) -> String {
        match self {
            Self::Database(_) | Self::Session(_) | Self::Internal(_) => {
                "Internal server error".to_string()
            }
            Self::Shopify(ShopifyError::Unauthorized(_)) => {
                "Shopify session expired, please reinstall the app".to_string()
            }
            Self::Shopify(_) | Self::Ai(_) => "External service error".to_string(),
            _ => self.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.report();
        (self.status(), self.public_message()).into_response()
    }
}

/// `AppError` rendered as `{"error": "..."}` for the `/api` routes.
#[derive(Debug)]
pub struct ApiError(pub AppError);

impl<E> From<E> for ApiError
where
    E: Into<AppError>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        self.0.report();
        let body = Json(json!({ "error": self.0.public_message() }));
        (self.0.status(), body).into_response()
    }
}

/// Result type for JSON handlers.
pub type ApiResult<T> = std::result::Result<Json<T>, ApiError>;

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Whether a Sentry event belongs to a request that failed with a 4xx.
#[must_use]
pub fn is_client_error_event(event: &sentry::protocol::Event<'_>) -> bool {
    event
        .tags
        .get(STATUS_TAG)
        .and_then(|s| s.parse::<u16>().ok())
        .is_some_and(|s| (400..500).contains(&s))
}

/// Associate subsequent Sentry events with a shop.
pub fn set_sentry_shop(shop: &str) {
    sentry::configure_scope(|scope| {
        scope.set_tag("shop", shop);
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("order-123".to_string());
        assert_eq!(err.to_string(), "Not found: order-123");

        let err = AppError::PaymentRequired("AI analysis limit reached".to_string());
        assert_eq!(err.to_string(), "Payment required: AI analysis limit reached");
    }

    #[test]
    fn test_app_error_status_codes() {
        fn get_status(err: AppError) -> StatusCode {
            err.into_response().status()
        }

        assert_eq!(
            get_status(AppError::NotFound("test".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::Unauthorized("test".to_string())),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_status(AppError::BadRequest("test".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::PaymentRequired("test".to_string())),
            StatusCode::PAYMENT_REQUIRED
        );
        assert_eq!(
            get_status(AppError::Internal("test".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            get_status(AppError::Shopify(ShopifyError::RateLimited(2))),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            get_status(AppError::Ai(AiError::EmptyResponse)),
            StatusCode::BAD_GATEWAY
        );
    }

    #[tokio::test]
    async fn test_api_error_is_json() {
        let response =
            ApiError::from(AppError::PaymentRequired("AI analysis limit reached".to_string()))
                .into_response();
        assert_eq!(response.status(), StatusCode::PAYMENT_REQUIRED);

        let bytes = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "Payment required: AI analysis limit reached");
    }

    #[test]
    fn test_client_error_events_detected() {
        let mut event = sentry::protocol::Event::default();
        assert!(!is_client_error_event(&event));

        event.tags.insert(STATUS_TAG.to_string(), "404".to_string());
        assert!(is_client_error_event(&event));

        event.tags.insert(STATUS_TAG.to_string(), "502".to_string());
        assert!(!is_client_error_event(&event));
    }

    #[test]
    fn test_internal_details_hidden() {
        let err = AppError::Internal("connection string postgres://user:pw@db".to_string());
        assert_eq!(err.public_message(), "Internal server error");

        let err = AppError::Ai(AiError::UnsupportedModel("llama".to_string()));
        assert_eq!(err.public_message(), "External service error");

        let err = AppError::BadRequest("missing shop".to_string());
        assert_eq!(err.public_message(), "Bad request: missing shop");
    }
}
