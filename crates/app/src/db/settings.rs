//! Shop settings repository.
//!
//! Each section of `ShopSettings` is a JSONB row keyed by shop and section
//! name. Missing or unreadable sections fall back to defaults.

use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value as JsonValue;
use sqlx::PgPool;

use growth_pilot_core::ShopDomain;

use super::RepositoryError;
use crate::models::ShopSettings;

const AI_KEY: &str = "ai";
const NOTIFICATIONS_KEY: &str = "notifications";

/// Repository for per-shop settings.
pub struct SettingsRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> SettingsRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Load all settings for a shop.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn load(&self, shop: &ShopDomain) -> Result<ShopSettings, RepositoryError> {
        let rows: Vec<(String, JsonValue)> = sqlx::query_as(
            r"
            SELECT key, value FROM growth_pilot.shop_settings
            WHERE shop = $1
            ",
        )
        .bind(shop)
        .fetch_all(self.pool)
        .await?;

        let mut settings = ShopSettings::default();
        for (key, value) in rows {
            match key.as_str() {
                AI_KEY => settings.ai = decode_or_default(shop, &key, value),
                NOTIFICATIONS_KEY => settings.notifications = decode_or_default(shop, &key, value),
                _ => tracing::debug!(shop = %shop, key = %key, "Ignoring unknown settings key"),
            }
        }
        Ok(settings)
    }

    /// Save all settings for a shop.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn save(
        &self,
        shop: &ShopDomain,
        settings: &ShopSettings,
    ) -> Result<(), RepositoryError> {
        self.set(shop, AI_KEY, &settings.ai).await?;
        self.set(shop, NOTIFICATIONS_KEY, &settings.notifications)
            .await
    }

    async fn set<T: Serialize + Sync>(
        &self,
        shop: &ShopDomain,
        key: &str,
        value: &T,
    ) -> Result<(), RepositoryError> {
        let value = serde_json::to_value(value)
            .map_err(|e| RepositoryError::DataCorruption(format!("unserializable {key}: {e}")))?;

        sqlx::query(
            r"
            INSERT INTO growth_pilot.shop_settings (shop, key, value)
            VALUES ($1, $2, $3)
            ON CONFLICT (shop, key) DO UPDATE SET value = EXCLUDED.value, updated_at = NOW()
            ",
        )
        .bind(shop)
        .bind(key)
        .bind(value)
        .execute(self.pool)
        .await?;

        Ok(())
    }

    /// Delete all settings for a shop.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete_all(&self, shop: &ShopDomain) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM growth_pilot.shop_settings WHERE shop = $1")
            .bind(shop)
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

fn decode_or_default<T: DeserializeOwned + Default>(
    shop: &ShopDomain,
    key: &str,
    value: JsonValue,
) -> T {
    serde_json::from_value(value).unwrap_or_else(|e| {
        tracing::warn!(shop = %shop, key = %key, error = %e, "Unreadable settings, using defaults");
        T::default()
    })
}
