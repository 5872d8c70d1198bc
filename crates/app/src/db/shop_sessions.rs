//! Installed shop repository.
//!
//! Stores the offline access token obtained from the OAuth code exchange.

use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use sqlx::PgPool;

use growth_pilot_core::ShopDomain;

use super::RepositoryError;
use crate::models::ShopSession;

/// Internal row type for `PostgreSQL` queries.
#[derive(Debug, sqlx::FromRow)]
struct ShopSessionRow {
    shop: String,
    access_token: String,
    scope: String,
    installed_at: DateTime<Utc>,
}

impl TryFrom<ShopSessionRow> for ShopSession {
    type Error = RepositoryError;

    fn try_from(row: ShopSessionRow) -> Result<Self, Self::Error> {
        let shop = ShopDomain::parse(&row.shop).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid shop in database: {e}"))
        })?;

        let scopes = row
            .scope
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Ok(Self {
            shop,
            access_token: SecretString::from(row.access_token),
            scopes,
            installed_at: row.installed_at,
        })
    }
}

/// Repository for installed shops.
pub struct ShopSessionRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ShopSessionRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get the session for a shop.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, shop: &ShopDomain) -> Result<Option<ShopSession>, RepositoryError> {
        let row = sqlx::query_as::<_, ShopSessionRow>(
            r"
            SELECT shop, access_token, scope, installed_at
            FROM growth_pilot.shop_sessions
            WHERE shop = $1
            ",
        )
        .bind(shop)
        .fetch_optional(self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Save or replace the token for a shop.
    ///
    /// A reinstall keeps the original `installed_at`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn upsert(
        &self,
        shop: &ShopDomain,
        access_token: &SecretString,
        scopes: &[String],
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO growth_pilot.shop_sessions (shop, access_token, scope)
            VALUES ($1, $2, $3)
            ON CONFLICT (shop) DO UPDATE SET
                access_token = EXCLUDED.access_token,
                scope = EXCLUDED.scope,
                updated_at = NOW()
            ",
        )
        .bind(shop)
        .bind(access_token.expose_secret())
        .bind(scopes.join(","))
        .execute(self.pool)
        .await?;

        Ok(())
    }

    /// Delete the session for a shop. Returns whether a row was removed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete(&self, shop: &ShopDomain) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM growth_pilot.shop_sessions WHERE shop = $1")
            .bind(shop)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// List all installed shops, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<ShopSession>, RepositoryError> {
        let rows = sqlx::query_as::<_, ShopSessionRow>(
            r"
            SELECT shop, access_token, scope, installed_at
            FROM growth_pilot.shop_sessions
            ORDER BY installed_at DESC
            ",
        )
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }
}
