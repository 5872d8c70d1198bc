//! Shopify OAuth install flow.
//!
//! ```text
//! GET  /auth/login?shop=   - store a state nonce, redirect to Shopify
//! GET  /auth/callback      - verify HMAC and state, exchange the code
//! POST /auth/logout        - sign the browser out
//! ```

use axum::{
    extract::{Query, State},
    response::Redirect,
};
use chrono::Utc;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use growth_pilot_core::ShopDomain;

use crate::db::ShopSessionRepository;
use crate::error::AppError;
use crate::middleware::{clear_current_shop, set_current_shop};
use crate::models::{CurrentShop, ShopSession};
use crate::models::session::keys;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginQuery {
    pub shop: Option<String>,
}

fn landing_error(code: &str) -> Redirect {
    Redirect::to(&format!("/?error={code}"))
}

fn new_state_nonce() -> String {
    hex::encode(rand::random::<[u8; 32]>())
}

/// Value of `key` in the callback query.
fn param<'a>(params: &'a [(String, String)], key: &str) -> Option<&'a str> {
    params
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

#[instrument(skip(state, session))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<LoginQuery>,
) -> Result<Redirect, AppError> {
    let Some(shop) = query
        .shop
        .as_deref()
        .and_then(|s| ShopDomain::parse(s).ok())
    else {
        tracing::info!(shop = ?query.shop, "Rejected install for invalid shop domain");
        return Ok(landing_error("invalid_shop"));
    };

    let nonce = new_state_nonce();
    session.insert(keys::OAUTH_STATE, &nonce).await?;

    let redirect_uri = state.config().url_for("/auth/callback");
    let url = state
        .shopify()
        .authorization_url(&shop, &redirect_uri, &nonce);

    tracing::info!(shop = %shop, "Redirecting to Shopify OAuth");
    Ok(Redirect::to(&url))
}

/// Subscribe the shop to the app's webhooks. Failures are logged and do not
/// block the install.
async fn register_webhooks(state: &AppState, session: &ShopSession) {
    let callback_url = state.config().url_for("/webhooks");
    match state
        .shopify()
        .context(session)
        .register_webhooks(&callback_url)
        .await
    {
        Ok(outcome) => {
            for (topic, reason) in &outcome.failed {
                tracing::warn!(shop = %session.shop, %topic, reason = %reason, "Webhook registration rejected");
            }
            tracing::info!(
                shop = %session.shop,
                registered = outcome.registered.len(),
                failed = outcome.failed.len(),
                "Webhooks registered"
            );
        }
        Err(e) => {
            tracing::warn!(shop = %session.shop, error = %e, "Failed to register webhooks");
        }
    }
}

#[instrument(skip_all)]
pub async fn callback(
    State(state): State<AppState>,
    session: Session,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<Redirect, AppError> {
    if let Some(error) = param(&params, "error") {
        tracing::warn!(error, "Shopify OAuth denied");
        return Ok(landing_error("oauth_denied"));
    }

    let pairs = params.iter().map(|(k, v)| (k.as_str(), v.as_str()));
    if !state.shopify().verify_oauth_hmac(pairs) {
        tracing::warn!("Invalid HMAC signature in OAuth callback");
        return Ok(landing_error("invalid_hmac"));
    }

    let stored: Option<String> = session.remove(keys::OAUTH_STATE).await?;
    let returned = param(&params, "state");
    if stored.is_none() || stored.as_deref() != returned {
        tracing::warn!("OAuth state mismatch");
        return Ok(landing_error("invalid_state"));
    }

    let (Some(shop), Some(code)) = (
        param(&params, "shop").and_then(|s| ShopDomain::parse(s).ok()),
        param(&params, "code"),
    ) else {
        return Ok(landing_error("invalid_shop"));
    };

    let token = match state.shopify().exchange_code(&shop, code).await {
        Ok(token) => token,
        Err(e) => {
            tracing::error!(shop = %shop, error = %e, "Failed to exchange OAuth code");
            return Ok(landing_error("exchange_failed"));
        }
    };

    ShopSessionRepository::new(state.pool())
        .upsert(&shop, &token.access_token, &token.scopes)
        .await?;
    state.evict_shop(&shop).await;

    let installed = ShopSession {
        shop: shop.clone(),
        access_token: token.access_token.clone(),
        scopes: token.scopes.clone(),
        installed_at: Utc::now(),
    };
    register_webhooks(&state, &installed).await;
    set_current_shop(&session, &CurrentShop { shop: shop.clone() }).await?;

    tracing::info!(shop = %shop, scopes = ?token.scopes, "Shop installed");
    Ok(Redirect::to("/app"))
}

pub async fn logout(session: Session) -> Result<Redirect, AppError> {
    clear_current_shop(&session).await?;
    Ok(Redirect::to("/"))
}
