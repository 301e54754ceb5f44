//! Amount formatting for rendered settlement reports.

use serde::{Deserialize, Serialize};

/// ISO 4217 currency code used only to pick a symbol and precision.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct CurrencyCode(pub String);

impl CurrencyCode {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into().to_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for CurrencyCode {
    fn default() -> Self {
        Self::new("USD")
    }
}

/// Locale-aware number formatting preferences.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LocaleConfig {
    pub language_tag: String,
    pub decimal_separator: char,
    pub grouping_separator: char,
}

impl Default for LocaleConfig {
    fn default() -> Self {
        Self {
            language_tag: "en-US".into(),
            decimal_separator: '.',
            grouping_separator: ',',
        }
    }
}

impl LocaleConfig {
    /// Separators for a handful of common language tags; unknown tags fall back to `en-US`.
    pub fn for_tag(tag: &str) -> Self {
        let (decimal_separator, grouping_separator) = match tag {
            "de-DE" | "es-ES" | "it-IT" | "pt-BR" | "nl-NL" => (',', '.'),
            "fr-FR" | "pt-PT" | "sv-SE" => (',', ' '),
            "de-CH" => ('.', '\''),
            _ => ('.', ','),
        };
        Self {
            language_tag: tag.to_string(),
            decimal_separator,
            grouping_separator,
        }
    }
}

/// Whether amounts carry a symbol (`$12.50`) or the ISO code (`USD 12.50`).
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CurrencyDisplay {
    #[default]
    Symbol,
    Code,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct FormatOptions {
    pub currency_display: CurrencyDisplay,
}

pub fn symbol_for(code: &str) -> String {
    match code {
        "USD" => "$".into(),
        "EUR" => "€".into(),
        "GBP" => "£".into(),
        "JPY" => "¥".into(),
        "AUD" => "A$".into(),
        _ => code.into(),
    }
}

pub fn minor_units_for(code: &str) -> u8 {
    match code {
        "JPY" => 0,
        "KWD" | "BHD" => 3,
        _ => 2,
    }
}

pub fn format_number(locale: &LocaleConfig, value: f64, precision: u8) -> String {
    let body = format!("{:.*}", precision as usize, value);
    let (int_part, fraction) = match body.split_once('.') {
        Some((int_part, fraction)) => (int_part, Some(fraction)),
        None => (body.as_str(), None),
    };
    let (sign, digits) = match int_part.strip_prefix('-') {
        Some(digits) => ("-", digits),
        None => ("", int_part),
    };
    let mut formatted = format!("{sign}{}", group_digits(digits, locale.grouping_separator));
    if let Some(fraction) = fraction {
        formatted.push(locale.decimal_separator);
        formatted.push_str(fraction);
    }
    formatted
}

fn group_digits(digits: &str, separator: char) -> String {
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (idx, ch) in digits.chars().enumerate() {
        if idx != 0 && (digits.len() - idx) % 3 == 0 {
            grouped.push(separator);
        }
        grouped.push(ch);
    }
    grouped
}

pub fn format_currency_value(
    amount: f64,
    code: &CurrencyCode,
    locale: &LocaleConfig,
    options: &FormatOptions,
) -> String {
    let precision = minor_units_for(code.as_str());
    let mut body = format_number(locale, amount.abs(), precision);
    if amount < 0.0 && body.chars().any(|ch| ch.is_ascii_digit() && ch != '0') {
        body = format!("-{body}");
    }
    match options.currency_display {
        CurrencyDisplay::Symbol => format!("{}{}", symbol_for(code.as_str()), body),
        CurrencyDisplay::Code => format!("{} {}", code.as_str(), body),
    }
}
