//! Money amounts and display formatting using decimal arithmetic.
//!
//! Shopify returns money as decimal strings (`"19.99"`). Amounts stay in
//! [`Decimal`] through every aggregation so that bucket sums equal totals
//! exactly; conversion to display strings happens once, at the view layer.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// A money amount with currency information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Money {
    /// Amount in the currency's standard unit (e.g., dollars, not cents).
    pub amount: Decimal,
    /// ISO 4217 currency code.
    pub currency_code: CurrencyCode,
}

impl Money {
    /// Create a new money amount.
    #[must_use]
    pub const fn new(amount: Decimal, currency_code: CurrencyCode) -> Self {
        Self {
            amount,
            currency_code,
        }
    }

    /// Zero in the given currency.
    #[must_use]
    pub const fn zero(currency_code: CurrencyCode) -> Self {
        Self::new(Decimal::ZERO, currency_code)
    }

    /// Format for display (e.g., "$1,234.50").
    #[must_use]
    pub fn display(&self) -> String {
        format_currency(self.amount, self.currency_code)
    }
}

/// ISO 4217 currency codes.
///
/// Codes outside this list deserialize to [`CurrencyCode::Other`] and are
/// formatted without a symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    #[default]
    USD,
    EUR,
    GBP,
    CAD,
    AUD,
    NZD,
    JPY,
    INR,
    CHF,
    SEK,
    #[serde(other)]
    Other,
}

impl CurrencyCode {
    /// Display symbol.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::USD | Self::CAD | Self::AUD | Self::NZD => "$",
            Self::EUR => "€",
            Self::GBP => "£",
            Self::JPY => "¥",
            Self::INR => "₹",
            Self::CHF => "CHF ",
            Self::SEK => "kr ",
            Self::Other => "",
        }
    }

    /// ISO code string.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::USD => "USD",
            Self::EUR => "EUR",
            Self::GBP => "GBP",
            Self::CAD => "CAD",
            Self::AUD => "AUD",
            Self::NZD => "NZD",
            Self::JPY => "JPY",
            Self::INR => "INR",
            Self::CHF => "CHF",
            Self::SEK => "SEK",
            Self::Other => "XXX",
        }
    }

    /// Number of minor-unit digits shown when formatting.
    #[must_use]
    pub const fn minor_digits(self) -> u32 {
        match self {
            Self::JPY => 0,
            _ => 2,
        }
    }

    /// Parse a currency code, falling back to `Other`.
    #[must_use]
    pub fn parse(code: &str) -> Self {
        match code.trim().to_ascii_uppercase().as_str() {
            "USD" => Self::USD,
            "EUR" => Self::EUR,
            "GBP" => Self::GBP,
            "CAD" => Self::CAD,
            "AUD" => Self::AUD,
            "NZD" => Self::NZD,
            "JPY" => Self::JPY,
            "INR" => Self::INR,
            "CHF" => Self::CHF,
            "SEK" => Self::SEK,
            _ => Self::Other,
        }
    }
}

impl std::fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// Format an amount as currency with thousands separators (e.g., "$12,345.60").
#[must_use]
pub fn format_currency(amount: Decimal, currency: CurrencyCode) -> String {
    let digits = currency.minor_digits();
    let rounded = amount.round_dp_with_strategy(digits, RoundingStrategy::MidpointAwayFromZero);
    let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
        "-"
    } else {
        ""
    };
    let text = format!("{:.*}", digits as usize, rounded.abs());
    let (whole, frac) = text.split_once('.').unwrap_or((text.as_str(), ""));

    let mut out = String::with_capacity(text.len() + 8);
    out.push_str(sign);
    out.push_str(currency.symbol());
    out.push_str(&group_thousands(whole));
    if !frac.is_empty() {
        out.push('.');
        out.push_str(frac);
    }
    out
}

/// Format a percentage with one decimal place (e.g., "12.5%").
#[must_use]
pub fn format_percent(value: f64) -> String {
    format!("{value:.1}%")
}

/// Format an integer count with thousands separators.
#[must_use]
pub fn format_count(value: u64) -> String {
    group_thousands(&value.to_string())
}

fn group_thousands(digits: &str) -> String {
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn test_format_currency_usd() {
        assert_eq!(format_currency(dec("0"), CurrencyCode::USD), "$0.00");
        assert_eq!(format_currency(dec("19.99"), CurrencyCode::USD), "$19.99");
        assert_eq!(format_currency(dec("1234.5"), CurrencyCode::USD), "$1,234.50");
        assert_eq!(
            format_currency(dec("1234567.891"), CurrencyCode::USD),
            "$1,234,567.89"
        );
    }

    #[test]
    fn test_format_currency_negative_and_rounding() {
        assert_eq!(format_currency(dec("-12.345"), CurrencyCode::USD), "-$12.35");
        assert_eq!(format_currency(dec("-0.001"), CurrencyCode::USD), "$0.00");
    }

    #[test]
    fn test_format_currency_other_symbols() {
        assert_eq!(format_currency(dec("10"), CurrencyCode::EUR), "€10.00");
        assert_eq!(format_currency(dec("1500.4"), CurrencyCode::JPY), "¥1,500");
        assert_eq!(format_currency(dec("5"), CurrencyCode::Other), "5.00");
    }

    #[test]
    fn test_currency_code_parse() {
        assert_eq!(CurrencyCode::parse("usd"), CurrencyCode::USD);
        assert_eq!(CurrencyCode::parse("BRL"), CurrencyCode::Other);
        let parsed: CurrencyCode = serde_json::from_str("\"BRL\"").unwrap();
        assert_eq!(parsed, CurrencyCode::Other);
    }

    #[test]
    fn test_format_count_and_percent() {
        assert_eq!(format_count(0), "0");
        assert_eq!(format_count(999), "999");
        assert_eq!(format_count(1_000), "1,000");
        assert_eq!(format_count(12_345_678), "12,345,678");
        assert_eq!(format_percent(12.345), "12.3%");
    }
}
