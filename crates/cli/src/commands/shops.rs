//! List installed shops.

use growth_pilot::db::{PlanRepository, RepositoryError, ShopSessionRepository};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ShopsError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Print every installed shop with its plan.
#[allow(clippy::print_stdout)]
pub async fn list() -> Result<(), ShopsError> {
    let database_url =
        super::database_url().map_err(|_| ShopsError::MissingEnvVar("DATABASE_URL"))?;
    let pool = growth_pilot::db::create_pool(&database_url).await?;

    let sessions = ShopSessionRepository::new(&pool).list().await?;
    let plans = PlanRepository::new(&pool);

    if sessions.is_empty() {
        println!("No shops installed.");
        return Ok(());
    }

    println!("{:<40} {:<10} {:<12} INSTALLED", "SHOP", "PLAN", "STATUS");
    for session in sessions {
        let plan = plans.get(&session.shop).await?;
        let (plan_id, status) = plan
            .as_ref()
            .map_or(("free", "none"), |p| (p.plan_id.as_str(), p.status.as_str()));
        println!(
            "{:<40} {:<10} {:<12} {}",
            session.shop.as_str(),
            plan_id,
            status,
            session.installed_at.format("%Y-%m-%d %H:%M")
        );
    }

    tracing::info!("Listed installed shops");
    Ok(())
}
