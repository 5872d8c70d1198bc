//! Application state shared across handlers.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use sqlx::PgPool;

use growth_pilot_core::ShopDomain;

use crate::ai::AiClients;
use crate::config::AppConfig;
use crate::db::{RepositoryError, ShopSessionRepository};
use crate::models::ShopSession;
use crate::shopify::ShopifyClient;

const SHOP_CACHE_TTL: Duration = Duration::from_secs(300);
const SHOP_CACHE_CAPACITY: u64 = 1000;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: AppConfig,
    pool: PgPool,
    shopify: ShopifyClient,
    ai: AiClients,
    shop_cache: Cache<ShopDomain, ShopSession>,
}

impl AppState {
    /// Build state with clients derived from `config`.
    #[must_use]
    pub fn new(config: AppConfig, pool: PgPool) -> Self {
        let shopify = ShopifyClient::new(&config.shopify);
        let ai = AiClients::new(&config.ai);
        Self::with_clients(config, pool, shopify, ai)
    }

    /// Build state with explicit clients (tests point them at mock servers).
    #[must_use]
    pub fn with_clients(
        config: AppConfig,
        pool: PgPool,
        shopify: ShopifyClient,
        ai: AiClients,
    ) -> Self {
        let shop_cache = Cache::builder()
            .max_capacity(SHOP_CACHE_CAPACITY)
            .time_to_live(SHOP_CACHE_TTL)
            .build();

        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                shopify,
                ai,
                shop_cache,
            }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &AppConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    #[must_use]
    pub fn shopify(&self) -> &ShopifyClient {
        &self.inner.shopify
    }

    #[must_use]
    pub fn ai(&self) -> &AiClients {
        &self.inner.ai
    }

    /// Installed shop session, from the cache or the database.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the database lookup fails.
    pub async fn shop_session(
        &self,
        shop: &ShopDomain,
    ) -> Result<Option<ShopSession>, RepositoryError> {
        if let Some(session) = self.inner.shop_cache.get(shop).await {
            return Ok(Some(session));
        }

        let session = ShopSessionRepository::new(self.pool()).get(shop).await?;
        if let Some(session) = &session {
            self.inner
                .shop_cache
                .insert(shop.clone(), session.clone())
                .await;
        }
        Ok(session)
    }

    /// Drop a shop from the session cache.
    pub async fn evict_shop(&self, shop: &ShopDomain) {
        self.inner.shop_cache.invalidate(shop).await;
    }
}
