//! Plans and Shopify recurring charges.
//!
//! A paid plan is recorded only after `/app/billing/confirm` finds the
//! approved subscription on the installation. Query parameters on the
//! confirmation redirect are never trusted for the plan choice.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form, Json,
    extract::{Query, State},
    response::Redirect,
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use growth_pilot_core::billing::{self, PLANS, Plan};
use growth_pilot_core::{CurrencyCode, format_currency};

use super::ai_insights::{UsageView, load_usage};
use super::view::{Chrome, or_empty, short_date};
use crate::db::PlanRepository;
use crate::error::{ApiError, AppError};
use crate::middleware::RequireShop;
use crate::models::ShopSession;
use crate::shopify::ActiveSubscription;
use crate::state::AppState;

#[derive(Debug, Clone, Serialize)]
pub struct PlanCard {
    pub id: &'static str,
    pub name: &'static str,
    pub price: String,
    pub trial_days: u32,
    pub quota: String,
    pub features: &'static [&'static str],
    pub current: bool,
    pub free: bool,
}

impl PlanCard {
    fn new(plan: &'static Plan, current: &str) -> Self {
        Self {
            id: plan.id,
            name: plan.name,
            price: format_currency(plan.price, CurrencyCode::USD),
            trial_days: plan.trial_days,
            quota: plan.ai_analyses.to_string(),
            features: plan.features,
            current: plan.id == current,
            free: plan.is_free(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionView {
    pub name: String,
    pub status: String,
    pub test: bool,
    pub trial_days: u32,
    pub renews: Option<String>,
}

impl From<ActiveSubscription> for SubscriptionView {
    fn from(sub: ActiveSubscription) -> Self {
        Self {
            renews: sub.current_period_end.map(short_date),
            name: sub.name,
            status: sub.status,
            test: sub.test,
            trial_days: sub.trial_days,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BillingNotice {
    pub tone: &'static str,
    pub message: &'static str,
}

impl BillingNotice {
    /// Message for the `?status=` set by the billing redirects.
    fn from_status(status: &str) -> Option<Self> {
        let (tone, message) = match status {
            "subscribed" => ("success", "Your subscription is active."),
            "declined" => (
                "warning",
                "The subscription was not approved. You are still on your current plan.",
            ),
            "cancelled" => (
                "info",
                "Your subscription was cancelled. You are now on the Free plan.",
            ),
            _ => return None,
        };
        Some(Self { tone, message })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BillingView {
    pub current_plan: &'static str,
    pub current_plan_name: &'static str,
    pub usage: UsageView,
    pub subscription: Option<SubscriptionView>,
    pub plans: Vec<PlanCard>,
    pub notice: Option<BillingNotice>,
}

#[derive(Debug, Default, Deserialize)]
pub struct BillingQuery {
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SubscribeForm {
    pub plan_id: String,
}

/// The plan an approved subscription belongs to, matched by charge name.
#[must_use]
pub fn plan_for_subscription(sub: &ActiveSubscription) -> Option<&'static Plan> {
    PLANS
        .iter()
        .find(|p| !p.is_free() && p.subscription_name() == sub.name)
}

#[must_use]
pub fn build(
    usage: UsageView,
    subscription: Option<ActiveSubscription>,
    status: Option<&str>,
) -> BillingView {
    let current = billing::plan_by_id(usage.plan_id).unwrap_or_else(billing::free_plan);
    BillingView {
        current_plan: current.id,
        current_plan_name: current.name,
        subscription: subscription.map(SubscriptionView::from),
        plans: PLANS.iter().map(|p| PlanCard::new(p, current.id)).collect(),
        notice: status.and_then(BillingNotice::from_status),
        usage,
    }
}

async fn load(
    state: &AppState,
    shop: &ShopSession,
    status: Option<&str>,
) -> Result<BillingView, AppError> {
    let ctx = state.shopify().context(shop);
    let (usage, subscription) = tokio::join!(load_usage(state, shop), ctx.active_subscription());
    let subscription = or_empty(subscription, "billing.active_subscription");
    Ok(build(usage?, subscription, status))
}

#[derive(Template, WebTemplate)]
#[template(path = "billing.html")]
pub struct BillingTemplate {
    pub chrome: Chrome,
    pub view: BillingView,
}

#[instrument(skip(state, shop), fields(shop = %shop.shop))]
pub async fn page(
    State(state): State<AppState>,
    RequireShop(shop): RequireShop,
    Query(query): Query<BillingQuery>,
) -> Result<BillingTemplate, AppError> {
    Ok(BillingTemplate {
        view: load(&state, &shop, query.status.as_deref()).await?,
        chrome: Chrome::new(&shop, "/app/billing"),
    })
}

#[instrument(skip(state, shop), fields(shop = %shop.shop))]
pub async fn api(
    State(state): State<AppState>,
    RequireShop(shop): RequireShop,
) -> Result<Json<BillingView>, ApiError> {
    Ok(Json(load(&state, &shop, None).await?))
}

/// Cancel the shop's recurring charge, if any, and move it to the free plan.
///
/// The plan row is reset even when the cancellation fails.
async fn downgrade(state: &AppState, shop: &ShopSession) -> Result<(), AppError> {
    let plans = PlanRepository::new(state.pool());
    let stored = plans.get(&shop.shop).await?.and_then(|p| p.subscription_id);

    let cancelled = state
        .shopify()
        .context(shop)
        .cancel_current_subscription(stored.as_deref())
        .await;

    plans.reset_to_free(&shop.shop).await?;

    match cancelled {
        Ok(id) => {
            tracing::info!(subscription = ?id, "Downgraded to free plan");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

/// Start a subscription. Paid plans redirect to Shopify's approval page.
#[instrument(skip(state, shop), fields(shop = %shop.shop, plan = %form.plan_id))]
pub async fn subscribe(
    State(state): State<AppState>,
    RequireShop(shop): RequireShop,
    Form(form): Form<SubscribeForm>,
) -> Result<Redirect, AppError> {
    let plan = billing::plan_by_id(&form.plan_id)
        .ok_or_else(|| AppError::BadRequest(format!("Unknown plan: {}", form.plan_id)))?;

    if plan.is_free() {
        downgrade(&state, &shop).await?;
        return Ok(Redirect::to("/app/billing?status=cancelled"));
    }

    let return_url = state.config().url_for("/app/billing/confirm");
    let created = state
        .shopify()
        .context(&shop)
        .create_subscription(plan, &return_url, state.config().billing_test_mode)
        .await?;

    tracing::info!(subscription = ?created.id, "Subscription pending approval");
    Ok(Redirect::to(&created.confirmation_url))
}

/// Return point after the merchant approves or declines the charge.
#[instrument(skip(state, shop), fields(shop = %shop.shop))]
pub async fn confirm(
    State(state): State<AppState>,
    RequireShop(shop): RequireShop,
) -> Result<Redirect, AppError> {
    let active = state
        .shopify()
        .context(&shop)
        .active_subscription()
        .await?;

    let approved = active.as_ref().and_then(|sub| {
        plan_for_subscription(sub)
            .filter(|_| sub.status.eq_ignore_ascii_case("ACTIVE"))
            .map(|plan| (plan, sub))
    });

    let Some((plan, sub)) = approved else {
        tracing::info!(subscription = ?active, "No approved subscription on confirmation");
        return Ok(Redirect::to("/app/billing?status=declined"));
    };

    PlanRepository::new(state.pool())
        .set(&shop.shop, plan.id, Some(sub.id.as_str()), &sub.status)
        .await?;
    tracing::info!(plan = plan.id, subscription = %sub.id, "Plan activated");

    Ok(Redirect::to("/app/billing?status=subscribed"))
}

#[instrument(skip(state, shop), fields(shop = %shop.shop))]
pub async fn cancel(
    State(state): State<AppState>,
    RequireShop(shop): RequireShop,
) -> Result<Redirect, AppError> {
    downgrade(&state, &shop).await?;
    Ok(Redirect::to("/app/billing?status=cancelled"))
}
