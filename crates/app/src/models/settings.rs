//! Per-shop dashboard preferences, stored as JSONB.

use serde::{Deserialize, Serialize};

use growth_pilot_core::metrics::DEFAULT_LOW_STOCK_THRESHOLD;

/// How often the merchant wants AI analyses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AiFrequency {
    #[default]
    Daily,
    Weekly,
    Realtime,
}

impl AiFrequency {
    pub const ALL: [Self; 3] = [Self::Daily, Self::Weekly, Self::Realtime];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Realtime => "realtime",
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Daily => "Daily",
            Self::Weekly => "Weekly",
            Self::Realtime => "Real-time",
        }
    }
}

/// How often the summary report email goes out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFrequency {
    Daily,
    #[default]
    Weekly,
    Monthly,
}

impl ReportFrequency {
    pub const ALL: [Self; 3] = [Self::Daily, Self::Weekly, Self::Monthly];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Daily => "Daily",
            Self::Weekly => "Weekly",
            Self::Monthly => "Monthly",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AiSettings {
    /// Model name, e.g. `gpt-4` or `claude-3-sonnet`.
    pub model: Option<String>,
    pub analysis_frequency: AiFrequency,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationSettings {
    pub email_notifications: bool,
    pub low_stock_alert: bool,
    pub daily_report: bool,
    /// Units at or below which a product counts as low stock.
    pub alert_threshold: i64,
    pub report_frequency: ReportFrequency,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            email_notifications: true,
            low_stock_alert: true,
            daily_report: false,
            alert_threshold: DEFAULT_LOW_STOCK_THRESHOLD,
            report_frequency: ReportFrequency::Weekly,
        }
    }
}

/// All settings for one shop.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShopSettings {
    pub ai: AiSettings,
    pub notifications: NotificationSettings,
}

impl ShopSettings {
    /// Model to use for AI analyses, falling back to the app default.
    #[must_use]
    pub fn model_or<'a>(&'a self, default: &'a str) -> &'a str {
        self.ai
            .model
            .as_deref()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or(default)
    }
}
