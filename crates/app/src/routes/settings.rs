//! Per-shop AI and notification preferences.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form, Json,
    extract::{Query, State},
    response::Redirect,
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::view::Chrome;
use crate::ai::{AiModel, MODEL_CHOICES};
use crate::db::SettingsRepository;
use crate::error::{ApiError, AppError};
use crate::middleware::RequireShop;
use crate::models::{AiFrequency, ReportFrequency, ShopSession, ShopSettings};
use crate::state::AppState;

/// Largest accepted low-stock threshold.
pub const MAX_ALERT_THRESHOLD: i64 = 1000;

#[derive(Debug, Clone, Serialize)]
pub struct SelectOption {
    pub value: &'static str,
    pub label: &'static str,
    pub selected: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SettingsView {
    pub settings: ShopSettings,
    pub model: String,
    pub models: Vec<SelectOption>,
    pub ai_frequencies: Vec<SelectOption>,
    pub report_frequencies: Vec<SelectOption>,
    pub ai_configured: bool,
    pub saved: bool,
}

#[must_use]
pub fn build(
    settings: ShopSettings,
    default_model: &str,
    ai_configured: bool,
    saved: bool,
) -> SettingsView {
    let model = settings.model_or(default_model).to_string();
    let models = MODEL_CHOICES
        .iter()
        .map(|&(value, label)| SelectOption {
            value,
            label,
            selected: value == model,
        })
        .collect();
    let ai_frequencies = AiFrequency::ALL
        .into_iter()
        .map(|f| SelectOption {
            value: f.as_str(),
            label: f.label(),
            selected: f == settings.ai.analysis_frequency,
        })
        .collect();
    let report_frequencies = ReportFrequency::ALL
        .into_iter()
        .map(|f| SelectOption {
            value: f.as_str(),
            label: f.label(),
            selected: f == settings.notifications.report_frequency,
        })
        .collect();

    SettingsView {
        settings,
        model,
        models,
        ai_frequencies,
        report_frequencies,
        ai_configured,
        saved,
    }
}

/// The settings form. Unchecked checkboxes are absent from the body.
#[derive(Debug, Deserialize)]
pub struct SettingsForm {
    pub ai_model: String,
    pub analysis_frequency: AiFrequency,
    pub email_notifications: Option<String>,
    pub low_stock_alert: Option<String>,
    pub daily_report: Option<String>,
    pub alert_threshold: i64,
    pub report_frequency: ReportFrequency,
}

impl SettingsForm {
    /// Validate and convert into stored settings.
    ///
    /// # Errors
    ///
    /// Returns `AppError::BadRequest` for an unknown model or a threshold
    /// outside `0..=1000`.
    pub fn into_settings(self) -> Result<ShopSettings, AppError> {
        let model = self.ai_model.trim();
        AiModel::parse(model).map_err(|e| AppError::BadRequest(e.to_string()))?;

        if !(0..=MAX_ALERT_THRESHOLD).contains(&self.alert_threshold) {
            return Err(AppError::BadRequest(format!(
                "Alert threshold must be between 0 and {MAX_ALERT_THRESHOLD}"
            )));
        }

        let mut settings = ShopSettings::default();
        settings.ai.model = Some(model.to_string());
        settings.ai.analysis_frequency = self.analysis_frequency;
        settings.notifications.email_notifications = self.email_notifications.is_some();
        settings.notifications.low_stock_alert = self.low_stock_alert.is_some();
        settings.notifications.daily_report = self.daily_report.is_some();
        settings.notifications.alert_threshold = self.alert_threshold;
        settings.notifications.report_frequency = self.report_frequency;
        Ok(settings)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct SettingsQuery {
    pub saved: Option<String>,
}

#[derive(Template, WebTemplate)]
#[template(path = "settings.html")]
pub struct SettingsTemplate {
    pub chrome: Chrome,
    pub view: SettingsView,
}

async fn load(
    state: &AppState,
    shop: &ShopSession,
    saved: bool,
) -> Result<SettingsView, AppError> {
    let settings = SettingsRepository::new(state.pool()).load(&shop.shop).await?;
    let default_model = &state.config().ai.default_model;
    let model = settings.model_or(default_model).to_string();
    Ok(build(
        settings,
        default_model,
        state.ai().supports(&model),
        saved,
    ))
}

#[instrument(skip(state, shop), fields(shop = %shop.shop))]
pub async fn page(
    State(state): State<AppState>,
    RequireShop(shop): RequireShop,
    Query(query): Query<SettingsQuery>,
) -> Result<SettingsTemplate, AppError> {
    Ok(SettingsTemplate {
        view: load(&state, &shop, query.saved.is_some()).await?,
        chrome: Chrome::new(&shop, "/app/settings"),
    })
}

#[instrument(skip(state, shop, form), fields(shop = %shop.shop))]
pub async fn save(
    State(state): State<AppState>,
    RequireShop(shop): RequireShop,
    Form(form): Form<SettingsForm>,
) -> Result<Redirect, AppError> {
    let settings = form.into_settings()?;
    SettingsRepository::new(state.pool())
        .save(&shop.shop, &settings)
        .await?;
    tracing::info!(model = ?settings.ai.model, "Settings saved");
    Ok(Redirect::to("/app/settings?saved=1"))
}

#[instrument(skip(state, shop), fields(shop = %shop.shop))]
pub async fn api(
    State(state): State<AppState>,
    RequireShop(shop): RequireShop,
) -> Result<Json<SettingsView>, ApiError> {
    Ok(Json(load(&state, &shop, false).await?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form() -> SettingsForm {
        SettingsForm {
            ai_model: "claude-3-haiku".to_string(),
            analysis_frequency: AiFrequency::Weekly,
            email_notifications: None,
            low_stock_alert: Some("on".to_string()),
            daily_report: Some("on".to_string()),
            alert_threshold: 5,
            report_frequency: ReportFrequency::Monthly,
        }
    }

    #[test]
    fn test_form_checkboxes_and_values() {
        let settings = form().into_settings().unwrap();

        assert_eq!(settings.ai.model.as_deref(), Some("claude-3-haiku"));
        assert_eq!(settings.ai.analysis_frequency, AiFrequency::Weekly);
        assert!(!settings.notifications.email_notifications);
        assert!(settings.notifications.low_stock_alert);
        assert!(settings.notifications.daily_report);
        assert_eq!(settings.notifications.alert_threshold, 5);
        assert_eq!(settings.notifications.report_frequency, ReportFrequency::Monthly);
    }

    #[test]
    fn test_form_rejects_bad_input() {
        let mut bad_model = form();
        bad_model.ai_model = "llama-2".to_string();
        assert!(matches!(
            bad_model.into_settings(),
            Err(AppError::BadRequest(msg)) if msg == "Unsupported model: llama-2"
        ));

        let mut bad_threshold = form();
        bad_threshold.alert_threshold = 5000;
        assert!(matches!(bad_threshold.into_settings(), Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_form_deserializes_from_urlencoded() {
        use axum::body::Body;
        use axum::extract::FromRequest;
        use axum::http::{Request, header};

        let body = "ai_model=gpt-4o&analysis_frequency=realtime&low_stock_alert=on\
                    &alert_threshold=12&report_frequency=daily";
        let request = Request::post("/app/settings")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body))
            .unwrap();
        let Form(form) = Form::<SettingsForm>::from_request(request, &()).await.unwrap();
        let settings = form.into_settings().unwrap();

        assert_eq!(settings.ai.analysis_frequency, AiFrequency::Realtime);
        assert!(!settings.notifications.daily_report);
        assert_eq!(settings.notifications.alert_threshold, 12);
    }

    #[test]
    fn test_view_selects_current_options() {
        let view = build(ShopSettings::default(), "gpt-4", true, true);

        assert_eq!(view.model, "gpt-4");
        let selected: Vec<_> = view.models.iter().filter(|m| m.selected).map(|m| m.value).collect();
        assert_eq!(selected, vec!["gpt-4"]);
        assert!(view.report_frequencies.iter().any(|f| f.selected && f.value == "weekly"));
        assert!(view.saved);
    }
}
