//! Shop plan repository.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use growth_pilot_core::ShopDomain;
use growth_pilot_core::billing::FREE_PLAN_ID;

use super::RepositoryError;
use crate::models::ShopPlan;

#[derive(Debug, sqlx::FromRow)]
struct ShopPlanRow {
    plan_id: String,
    subscription_id: Option<String>,
    status: String,
    updated_at: DateTime<Utc>,
}

impl From<ShopPlanRow> for ShopPlan {
    fn from(row: ShopPlanRow) -> Self {
        Self {
            plan_id: row.plan_id,
            subscription_id: row.subscription_id,
            status: row.status,
            updated_at: row.updated_at,
        }
    }
}

/// Repository for the plan each shop is on.
pub struct PlanRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> PlanRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// The shop's plan, if one was ever recorded.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, shop: &ShopDomain) -> Result<Option<ShopPlan>, RepositoryError> {
        let row = sqlx::query_as::<_, ShopPlanRow>(
            r"
            SELECT plan_id, subscription_id, status, updated_at
            FROM growth_pilot.shop_plans
            WHERE shop = $1
            ",
        )
        .bind(shop)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(ShopPlan::from))
    }

    /// Record the shop's plan and subscription.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn set(
        &self,
        shop: &ShopDomain,
        plan_id: &str,
        subscription_id: Option<&str>,
        status: &str,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO growth_pilot.shop_plans (shop, plan_id, subscription_id, status)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (shop) DO UPDATE SET
                plan_id = EXCLUDED.plan_id,
                subscription_id = EXCLUDED.subscription_id,
                status = EXCLUDED.status,
                updated_at = NOW()
            ",
        )
        .bind(shop)
        .bind(plan_id)
        .bind(subscription_id)
        .bind(status)
        .execute(self.pool)
        .await?;

        Ok(())
    }

    /// Move the shop back to the free plan.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn reset_to_free(&self, shop: &ShopDomain) -> Result<(), RepositoryError> {
        self.set(shop, FREE_PLAN_ID, None, "ACTIVE").await
    }

    /// Delete the plan row for a shop.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete(&self, shop: &ShopDomain) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM growth_pilot.shop_plans WHERE shop = $1")
            .bind(shop)
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
