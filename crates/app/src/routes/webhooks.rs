//! Shopify webhook receiver.

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use tracing::instrument;

use growth_pilot_core::ShopDomain;

use crate::db::{PlanRepository, SettingsRepository, ShopSessionRepository, UsageRepository};
use crate::error::AppError;
use crate::shopify::WebhookTopic;
use crate::state::AppState;

const HMAC_HEADER: &str = "X-Shopify-Hmac-Sha256";
const TOPIC_HEADER: &str = "X-Shopify-Topic";
const SHOP_HEADER: &str = "X-Shopify-Shop-Domain";

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Delete everything stored for `shop` and drop it from the cache.
async fn remove_shop(state: &AppState, shop: &ShopDomain) -> Result<(), AppError> {
    let pool = state.pool();
    let removed = ShopSessionRepository::new(pool).delete(shop).await?;
    PlanRepository::new(pool).delete(shop).await?;
    SettingsRepository::new(pool).delete_all(shop).await?;
    UsageRepository::new(pool).delete_all(shop).await?;
    state.evict_shop(shop).await;

    tracing::info!(shop = %shop, removed, "Shop data removed");
    Ok(())
}

#[instrument(skip_all, fields(topic = tracing::field::Empty, shop = tracing::field::Empty))]
pub async fn receive(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, AppError> {
    let signature = header(&headers, HMAC_HEADER).unwrap_or_default();
    if !state.shopify().verify_webhook_hmac(&body, signature) {
        tracing::warn!("Rejected webhook with invalid HMAC");
        return Ok((StatusCode::UNAUTHORIZED, "Invalid webhook signature").into_response());
    }

    let raw_topic = header(&headers, TOPIC_HEADER).unwrap_or_default();
    let Some(topic) = WebhookTopic::parse(raw_topic) else {
        tracing::info!(topic = raw_topic, "Unhandled webhook topic");
        return Ok((StatusCode::NOT_FOUND, "Unhandled webhook topic").into_response());
    };
    tracing::Span::current().record("topic", topic.as_graphql());

    let shop = header(&headers, SHOP_HEADER)
        .and_then(|s| ShopDomain::parse(s).ok())
        .ok_or_else(|| AppError::BadRequest("Missing shop domain header".to_string()))?;
    tracing::Span::current().record("shop", shop.as_str());

    if topic.removes_shop() {
        remove_shop(&state, &shop).await?;
    } else {
        tracing::info!(bytes = body.len(), "Webhook received");
    }

    Ok(StatusCode::OK.into_response())
}
