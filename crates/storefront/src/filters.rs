//! Custom Askama template filters.

#![allow(clippy::unnecessary_wraps)]

use std::fmt::Display;

use chrono::{Datelike, NaiveDate};

/// Swedish month names, January first.
const MONTHS_SV: [&str; 12] = [
    "januari",
    "februari",
    "mars",
    "april",
    "maj",
    "juni",
    "juli",
    "augusti",
    "september",
    "oktober",
    "november",
    "december",
];

/// Returns the current year.
///
/// Usage in templates: `{{ ""|current_year }}`
#[askama::filter_fn]
pub fn current_year(_value: impl Display, _env: &dyn askama::Values) -> askama::Result<i32> {
    Ok(chrono::Utc::now().year())
}

/// Returns the content hash for main.css.
///
/// The hash is computed at build time from the CSS file content.
///
/// Usage in templates: `{{ ""|css_hash }}`
#[askama::filter_fn]
pub fn css_hash(_value: impl Display, _env: &dyn askama::Values) -> askama::Result<&'static str> {
    Ok(env!("CSS_HASH"))
}

/// Formats a date as `1 februari 2026`.
///
/// Usage in templates: `{{ post.meta.published_at|date_sv }}`
#[askama::filter_fn]
pub fn date_sv(date: impl Display, _env: &dyn askama::Values) -> askama::Result<String> {
    let text = date.to_string();
    Ok(NaiveDate::parse_from_str(&text, "%Y-%m-%d").map_or(text, format_date_sv))
}

fn format_date_sv(date: NaiveDate) -> String {
    let month = MONTHS_SV
        .get(date.month0() as usize)
        .copied()
        .unwrap_or_default();
    format!("{} {month} {}", date.day(), date.year())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_format_date_sv() {
        let date = NaiveDate::from_ymd_opt(2026, 2, 1).unwrap();
        assert_eq!(format_date_sv(date), "1 februari 2026");
        let date = NaiveDate::from_ymd_opt(2025, 12, 24).unwrap();
        assert_eq!(format_date_sv(date), "24 december 2025");
    }
}
