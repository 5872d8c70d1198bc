//! AI insights: rule-based cards plus on-demand LLM analyses gated by plan.

use askama::Template;
use askama_web::WebTemplate;
use axum::{Form, Json, extract::State};
use chrono::{TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::instrument;

use growth_pilot_core::billing::{self, AiQuota, Plan, can_use_ai_analysis};
use growth_pilot_core::metrics::{InventoryHealth, RevenueSummary};

use super::view::{Chrome, or_empty, today};
use crate::ai::{
    AnalysisResponse, AnalysisType, InsightCard, MODEL_CHOICES, StoreSnapshot, model_label,
    rule_based_insights,
};
use crate::db::{PlanRepository, SettingsRepository, UsageRepository, usage_period};
use crate::error::{ApiError, AppError};
use crate::middleware::RequireShop;
use crate::models::{ShopPlan, ShopSession};
use crate::state::AppState;

/// Days of orders behind the rule-based cards.
const RULES_LOOKBACK_DAYS: i64 = 30;

/// The shop's AI allowance for the current month.
#[derive(Debug, Clone, Serialize)]
pub struct UsageView {
    pub plan_id: &'static str,
    pub plan_name: &'static str,
    pub period: String,
    pub used: u32,
    /// `-1` for unlimited plans.
    pub limit: i32,
    pub remaining: Option<u32>,
    pub allowed: bool,
}

impl UsageView {
    #[must_use]
    pub fn new(plan: &'static Plan, period: String, used: u32) -> Self {
        Self {
            plan_id: plan.id,
            plan_name: plan.name,
            period,
            used,
            limit: plan.ai_analyses.as_raw(),
            remaining: plan.ai_analyses.remaining(used),
            allowed: can_use_ai_analysis(plan, used),
        }
    }

    #[must_use]
    pub fn summary(&self) -> String {
        match AiQuota::from_raw(self.limit) {
            AiQuota::Unlimited => format!("{} analyses used, unlimited plan", self.used),
            AiQuota::PerMonth(cap) => format!("{} of {cap} analyses used this month", self.used),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Notice {
    pub tone: &'static str,
    pub message: String,
    pub upgrade: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChoiceOption {
    pub value: &'static str,
    pub label: &'static str,
    pub selected: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct AiInsightsView {
    pub usage: UsageView,
    pub configured: bool,
    pub model: String,
    pub model_label: String,
    pub models: Vec<ChoiceOption>,
    pub analysis_types: Vec<ChoiceOption>,
    pub selected_type: &'static str,
    pub rules: Vec<InsightCard>,
    pub analysis: Option<AnalysisResponse>,
    pub notice: Option<Notice>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AnalyzeForm {
    pub analysis_type: Option<String>,
}

impl AnalyzeForm {
    fn analysis_type(&self) -> AnalysisType {
        self.analysis_type
            .as_deref()
            .and_then(|t| t.parse().ok())
            .unwrap_or_default()
    }
}

/// Result of `POST /api/ai-insights`.
#[derive(Debug, Serialize)]
pub struct AnalysisResult {
    pub analysis_type: AnalysisType,
    pub model: String,
    pub analysis: AnalysisResponse,
    pub usage: UsageView,
}

#[derive(Debug, Deserialize)]
pub struct QuickInsightRequest {
    pub metric: String,
    pub value: serde_json::Value,
    #[serde(default)]
    pub context: serde_json::Value,
}

fn current_plan(plan: Option<&ShopPlan>) -> &'static Plan {
    plan.map_or_else(billing::free_plan, ShopPlan::plan)
}

pub(super) async fn load_usage(state: &AppState, shop: &ShopSession) -> Result<UsageView, AppError> {
    let period = usage_period(Utc::now());
    let plans = PlanRepository::new(state.pool());
    let usage = UsageRepository::new(state.pool());
    let (plan, used) = tokio::join!(plans.get(&shop.shop), usage.count(&shop.shop, &period));
    Ok(UsageView::new(current_plan(plan?.as_ref()), period, used?))
}

async fn selected_model(state: &AppState, shop: &ShopSession) -> Result<String, AppError> {
    let settings = SettingsRepository::new(state.pool()).load(&shop.shop).await?;
    Ok(settings
        .model_or(&state.config().ai.default_model)
        .to_string())
}

/// Page state without an analysis result.
async fn load(state: &AppState, shop: &ShopSession) -> Result<AiInsightsView, AppError> {
    let ctx = state.shopify().context(shop);
    let since = today() - TimeDelta::days(RULES_LOOKBACK_DAYS - 1);

    let settings_repo = SettingsRepository::new(state.pool());
    let settings = settings_repo.load(&shop.shop);
    let (usage, settings, orders, products) = tokio::join!(
        load_usage(state, shop),
        settings,
        ctx.orders_since(since),
        ctx.products(),
    );
    let settings = settings?;
    let model = settings
        .model_or(&state.config().ai.default_model)
        .to_string();
    let threshold = settings.notifications.alert_threshold;

    let orders = or_empty(orders, "ai_insights.orders");
    let products = or_empty(products, "ai_insights.products");
    let rules = rule_based_insights(
        &RevenueSummary::from_orders(&orders),
        &InventoryHealth::from_products(&products, threshold),
    );

    Ok(AiInsightsView {
        usage: usage?,
        configured: state.ai().supports(&model),
        model_label: model_label(&model).to_string(),
        models: MODEL_CHOICES
            .iter()
            .map(|&(value, label)| ChoiceOption {
                value,
                label,
                selected: value == model,
            })
            .collect(),
        model,
        analysis_types: analysis_type_options(AnalysisType::default()),
        selected_type: AnalysisType::default().as_str(),
        rules,
        analysis: None,
        notice: None,
    })
}

fn analysis_type_options(selected: AnalysisType) -> Vec<ChoiceOption> {
    AnalysisType::ALL
        .into_iter()
        .map(|t| ChoiceOption {
            value: t.as_str(),
            label: t.as_str(),
            selected: t == selected,
        })
        .collect()
}

/// Take one slot of the allowance, run the analysis and give the slot back
/// if it fails.
///
/// # Errors
///
/// `AppError::PaymentRequired` when the plan's monthly allowance is used up,
/// `AppError::BadRequest` when the selected model has no API key.
#[instrument(skip(state, shop), fields(shop = %shop.shop, analysis = %analysis_type))]
async fn run_analysis(
    state: &AppState,
    shop: &ShopSession,
    analysis_type: AnalysisType,
) -> Result<AnalysisResult, AppError> {
    let usage = load_usage(state, shop).await?;
    if !usage.allowed {
        return Err(quota_reached());
    }

    let model = selected_model(state, shop).await?;
    if !state.ai().supports(&model) {
        return Err(AppError::BadRequest(format!(
            "No API key configured for model {model}"
        )));
    }

    let plan = billing::plan_by_id(usage.plan_id).unwrap_or_else(billing::free_plan);
    let counter = UsageRepository::new(state.pool());
    let used = counter
        .try_increment(&shop.shop, &usage.period, plan.ai_analyses.cap())
        .await?
        .ok_or_else(quota_reached)?;

    let analysis = match analyze_store(state, shop, &model, analysis_type).await {
        Ok(analysis) => analysis,
        Err(e) => {
            if let Err(release) = counter.release(&shop.shop, &usage.period).await {
                tracing::error!(error = %release, "Failed to release AI usage slot");
            }
            return Err(e);
        }
    };
    tracing::info!(model = %model, used, "AI analysis completed");

    Ok(AnalysisResult {
        analysis_type,
        model,
        analysis,
        usage: UsageView::new(plan, usage.period, used),
    })
}

fn quota_reached() -> AppError {
    AppError::PaymentRequired("AI analysis limit reached".to_string())
}

async fn analyze_store(
    state: &AppState,
    shop: &ShopSession,
    model: &str,
    analysis_type: AnalysisType,
) -> Result<AnalysisResponse, AppError> {
    let ctx = state.shopify().context(shop);
    let since = (Utc::now() - TimeDelta::days(analysis_type.lookback_days())).date_naive();
    let (orders, products, customers) =
        tokio::join!(ctx.orders_since(since), ctx.products(), ctx.customers());
    let orders = orders?;
    let products = or_empty(products, "ai_insights.products");
    let customers = or_empty(customers, "ai_insights.customers");

    let snapshot = StoreSnapshot::from_records(analysis_type, &orders, &products, &customers);
    Ok(state
        .ai()
        .generate_analysis(model, analysis_type, &snapshot)
        .await?)
}

#[derive(Template, WebTemplate)]
#[template(path = "ai_insights.html")]
pub struct AiInsightsTemplate {
    pub chrome: Chrome,
    pub view: AiInsightsView,
}

#[instrument(skip(state, shop), fields(shop = %shop.shop))]
pub async fn page(
    State(state): State<AppState>,
    RequireShop(shop): RequireShop,
) -> Result<AiInsightsTemplate, AppError> {
    Ok(AiInsightsTemplate {
        view: load(&state, &shop).await?,
        chrome: Chrome::new(&shop, "/app/ai-insights"),
    })
}

/// Form post from the page. Quota and provider failures render as notices.
#[instrument(skip(state, shop, form), fields(shop = %shop.shop))]
pub async fn analyze(
    State(state): State<AppState>,
    RequireShop(shop): RequireShop,
    Form(form): Form<AnalyzeForm>,
) -> Result<AiInsightsTemplate, AppError> {
    let analysis_type = form.analysis_type();
    let result = run_analysis(&state, &shop, analysis_type).await;
    let mut view = load(&state, &shop).await?;
    view.selected_type = analysis_type.as_str();
    view.analysis_types = analysis_type_options(analysis_type);

    match result {
        Ok(result) => {
            view.usage = result.usage;
            view.analysis = Some(result.analysis);
        }
        Err(AppError::PaymentRequired(_)) => {
            view.notice = Some(Notice {
                tone: "warning",
                message: format!(
                    "You have used all AI analyses included in the {} plan this month.",
                    view.usage.plan_name
                ),
                upgrade: true,
            });
        }
        Err(err) => {
            if err.status().is_server_error() {
                sentry::capture_error(&err);
            }
            tracing::error!(error = %err, "AI analysis failed");
            view.notice = Some(Notice {
                tone: "critical",
                message: format!("Analysis failed: {}", err.public_message()),
                upgrade: false,
            });
        }
    }

    Ok(AiInsightsTemplate {
        view,
        chrome: Chrome::new(&shop, "/app/ai-insights"),
    })
}

#[instrument(skip(state, shop, form), fields(shop = %shop.shop))]
pub async fn api(
    State(state): State<AppState>,
    RequireShop(shop): RequireShop,
    Json(form): Json<AnalyzeForm>,
) -> Result<Json<AnalysisResult>, ApiError> {
    Ok(Json(run_analysis(&state, &shop, form.analysis_type()).await?))
}

/// One-sentence insight about a single metric. Falls back to a fixed
/// message instead of failing and does not count against the allowance.
#[instrument(skip(state, shop, request), fields(shop = %shop.shop, metric = %request.metric))]
pub async fn quick(
    State(state): State<AppState>,
    RequireShop(shop): RequireShop,
    Json(request): Json<QuickInsightRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let model = selected_model(&state, &shop).await?;
    let data = json!({
        "metric": request.metric,
        "value": request.value,
        "context": request.context,
    });
    let insight = state.ai().generate_quick_insight(&model, &data).await;
    Ok(Json(json!({ "insight": insight })))
}
