//! AI usage counters, one row per shop per month.

use sqlx::PgPool;

use growth_pilot_core::ShopDomain;

use super::RepositoryError;

/// Repository for monthly AI analysis counts.
pub struct UsageRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> UsageRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Analyses run in `period` (`YYYY-MM`). Zero when no row exists.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count(&self, shop: &ShopDomain, period: &str) -> Result<u32, RepositoryError> {
        let count: Option<i32> = sqlx::query_scalar(
            r"
            SELECT count FROM growth_pilot.ai_usage
            WHERE shop = $1 AND period = $2
            ",
        )
        .bind(shop)
        .bind(period)
        .fetch_optional(self.pool)
        .await?;

        Ok(count.map_or(0, |c| u32::try_from(c).unwrap_or(0)))
    }

    /// Count one analysis in `period` only while the shop is under `cap`.
    ///
    /// The check and the increment are one statement, so concurrent
    /// requests cannot both take the last slot. `None` for `cap` means
    /// unlimited. Returns the new count, or `None` when the cap is reached.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn try_increment(
        &self,
        shop: &ShopDomain,
        period: &str,
        cap: Option<u32>,
    ) -> Result<Option<u32>, RepositoryError> {
        let cap = match cap.map(i32::try_from) {
            Some(Ok(0)) => return Ok(None),
            Some(Ok(n)) => Some(n),
            Some(Err(_)) | None => None,
        };

        let count: Option<i32> = sqlx::query_scalar(
            r"
            INSERT INTO growth_pilot.ai_usage (shop, period, count)
            VALUES ($1, $2, 1)
            ON CONFLICT (shop, period) DO UPDATE SET
                count = growth_pilot.ai_usage.count + 1,
                updated_at = NOW()
            WHERE $3::INTEGER IS NULL OR growth_pilot.ai_usage.count < $3
            RETURNING count
            ",
        )
        .bind(shop)
        .bind(period)
        .bind(cap)
        .fetch_optional(self.pool)
        .await?;

        count
            .map(|c| {
                u32::try_from(c)
                    .map_err(|_| RepositoryError::DataCorruption(format!("negative usage count {c}")))
            })
            .transpose()
    }

    /// Give back a slot taken by [`Self::try_increment`] for an analysis
    /// that did not complete.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn release(&self, shop: &ShopDomain, period: &str) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            UPDATE growth_pilot.ai_usage
            SET count = GREATEST(count - 1, 0), updated_at = NOW()
            WHERE shop = $1 AND period = $2
            ",
        )
        .bind(shop)
        .bind(period)
        .execute(self.pool)
        .await?;
        Ok(())
    }

    /// Delete all usage rows for a shop.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete_all(&self, shop: &ShopDomain) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM growth_pilot.ai_usage WHERE shop = $1")
            .bind(shop)
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use sqlx::PgPool;

    use super::*;

    fn shop() -> ShopDomain {
        ShopDomain::parse("pilot-demo.myshopify.com").unwrap()
    }

    #[sqlx::test(migrator = "crate::db::MIGRATOR")]
    #[ignore = "Requires DATABASE_URL"]
    async fn test_try_increment_stops_at_cap(pool: PgPool) {
        let usage = UsageRepository::new(&pool);
        let shop = shop();

        assert_eq!(usage.try_increment(&shop, "2025-01", Some(2)).await.unwrap(), Some(1));
        assert_eq!(usage.try_increment(&shop, "2025-01", Some(2)).await.unwrap(), Some(2));
        assert_eq!(usage.try_increment(&shop, "2025-01", Some(2)).await.unwrap(), None);
        assert_eq!(usage.count(&shop, "2025-01").await.unwrap(), 2);

        usage.release(&shop, "2025-01").await.unwrap();
        assert_eq!(usage.try_increment(&shop, "2025-01", Some(2)).await.unwrap(), Some(2));
        assert_eq!(usage.try_increment(&shop, "2025-01", None).await.unwrap(), Some(3));
        assert_eq!(usage.try_increment(&shop, "2025-01", Some(0)).await.unwrap(), None);
    }

    #[sqlx::test(migrator = "crate::db::MIGRATOR")]
    #[ignore = "Requires DATABASE_URL"]
    async fn test_concurrent_requests_share_last_slot(pool: PgPool) {
        let shop = shop();
        UsageRepository::new(&pool)
            .try_increment(&shop, "2025-01", None)
            .await
            .unwrap();

        let first = UsageRepository::new(&pool);
        let second = UsageRepository::new(&pool);
        let (a, b) = tokio::join!(
            first.try_increment(&shop, "2025-01", Some(2)),
            second.try_increment(&shop, "2025-01", Some(2)),
        );

        let granted = [a.unwrap(), b.unwrap()].into_iter().flatten().count();
        assert_eq!(granted, 1);
        assert_eq!(first.count(&shop, "2025-01").await.unwrap(), 2);
    }
}
