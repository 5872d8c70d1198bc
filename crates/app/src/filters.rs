//! Custom Askama template filters.

#![allow(clippy::unnecessary_wraps)]

use std::fmt::Display;

/// Returns the current year.
///
/// Usage in templates: `{{ ""|current_year }}`
#[allow(clippy::unnecessary_wraps)]
#[askama::filter_fn]
pub fn current_year(_value: impl Display, _env: &dyn askama::Values) -> askama::Result<i32> {
    use chrono::Datelike;
    Ok(chrono::Utc::now().year())
}

fn clamp_percent(raw: &str) -> f64 {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|p| p.is_finite())
        .map_or(0.0, |p| p.clamp(0.0, 100.0))
}

/// Formats a 0..=100 value as a CSS percentage, clamping out-of-range input.
///
/// Usage in templates: `style="height: {{ bar.height|css_percent }}"`
#[allow(clippy::unnecessary_wraps)]
#[askama::filter_fn]
pub fn css_percent(value: impl Display, _env: &dyn askama::Values) -> askama::Result<String> {
    Ok(format!("{:.1}%", clamp_percent(&value.to_string())))
}
