//! Public landing page with the install form.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::Query,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;

use crate::filters;
use crate::middleware::OptionalShop;

#[derive(Debug, Default, Deserialize)]
pub struct LandingQuery {
    /// Set when Shopify opens the app from the admin.
    pub shop: Option<String>,
    pub hmac: Option<String>,
    pub error: Option<String>,
}

/// Human-readable text for the `?error=` codes set by the auth routes.
#[must_use]
pub fn error_message(code: &str) -> &'static str {
    match code {
        "invalid_shop" => "Enter a valid store domain ending in .myshopify.com.",
        "invalid_hmac" => "Invalid security signature. Please try again.",
        "invalid_state" => "Your sign-in expired. Please try again.",
        "oauth_denied" => "The app was not authorized.",
        "exchange_failed" => "Could not complete the installation with Shopify.",
        _ => "Something went wrong. Please try again.",
    }
}

#[derive(Template, WebTemplate)]
#[template(path = "landing.html")]
pub struct LandingTemplate {
    pub error: Option<&'static str>,
    pub shop: String,
}

pub async fn page(
    OptionalShop(current): OptionalShop,
    Query(query): Query<LandingQuery>,
) -> Response {
    if current.is_some() {
        return Redirect::to("/app").into_response();
    }

    if let (Some(shop), Some(_)) = (&query.shop, &query.hmac) {
        let target = format!("/auth/login?shop={}", urlencoding::encode(shop));
        return Redirect::to(&target).into_response();
    }

    LandingTemplate {
        error: query.error.as_deref().map(error_message),
        shop: query.shop.unwrap_or_default(),
    }
    .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert!(error_message("invalid_shop").contains(".myshopify.com"));
        assert_eq!(
            error_message("<script>"),
            "Something went wrong. Please try again."
        );
    }

    #[test]
    fn test_landing_renders_error() {
        let html = LandingTemplate {
            error: Some(error_message("invalid_state")),
            shop: "pilot-demo.myshopify.com".to_string(),
        }
        .render()
        .unwrap();

        assert!(html.contains("Your sign-in expired"));
        assert!(html.contains("value=\"pilot-demo.myshopify.com\""));
    }
}
