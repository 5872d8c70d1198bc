//! Extractors for the signed-in shop.

use axum::{
    extract::{FromRequestParts, OriginalUri},
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

use crate::error::{AppError, set_sentry_shop};
use crate::models::session::keys;
use crate::models::{CurrentShop, ShopSession};
use crate::state::AppState;

/// Extractor that requires an installed shop.
///
/// Reads the shop domain from the browser session and loads its offline
/// token. Without one, HTML requests are redirected to the landing page
/// and `/api/` requests get 401.
///
/// # Example
///
/// ```rust,ignore
/// async fn dashboard(RequireShop(shop): RequireShop) -> impl IntoResponse {
///     format!("Hello, {}!", shop.shop)
/// }
/// ```
pub struct RequireShop(pub ShopSession);

/// Rejection for [`RequireShop`].
pub enum ShopAuthRejection {
    RedirectToLanding,
    Unauthorized,
    Error(AppError),
}

impl IntoResponse for ShopAuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToLanding => Redirect::to("/").into_response(),
            Self::Unauthorized => {
                (StatusCode::UNAUTHORIZED, "No installed shop in session").into_response()
            }
            Self::Error(err) => err.into_response(),
        }
    }
}

fn is_api_request(parts: &Parts) -> bool {
    parts
        .extensions
        .get::<OriginalUri>()
        .map_or_else(|| parts.uri.path(), |uri| uri.0.path())
        .starts_with("/api/")
}

impl FromRequestParts<AppState> for RequireShop {
    type Rejection = ShopAuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let missing = if is_api_request(parts) {
            ShopAuthRejection::Unauthorized
        } else {
            ShopAuthRejection::RedirectToLanding
        };

        let Some(session) = parts.extensions.get::<Session>() else {
            return Err(ShopAuthRejection::Unauthorized);
        };

        let Some(current) = session
            .get::<CurrentShop>(keys::CURRENT_SHOP)
            .await
            .ok()
            .flatten()
        else {
            return Err(missing);
        };

        let shop = state
            .shop_session(&current.shop)
            .await
            .map_err(|e| ShopAuthRejection::Error(e.into()))?;

        match shop {
            Some(shop) => {
                set_sentry_shop(shop.shop.as_str());
                Ok(Self(shop))
            }
            None => {
                tracing::info!(shop = %current.shop, "Session refers to an uninstalled shop");
                Err(missing)
            }
        }
    }
}

/// Extractor that optionally gets the signed-in shop domain.
///
/// Does not touch the database.
pub struct OptionalShop(pub Option<CurrentShop>);

impl<S> FromRequestParts<S> for OptionalShop
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let shop = match parts.extensions.get::<Session>() {
            Some(session) => session
                .get::<CurrentShop>(keys::CURRENT_SHOP)
                .await
                .ok()
                .flatten(),
            None => None,
        };

        Ok(Self(shop))
    }
}

/// Sign the browser session in to `shop`.
///
/// Cycles the session id first so a pre-login id cannot be reused.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_shop(
    session: &Session,
    shop: &CurrentShop,
) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session.insert(keys::CURRENT_SHOP, shop).await
}

/// Sign out.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_current_shop(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.flush().await
}
