//! Shared utility functions for the storefront.

use chrono::{DateTime, Utc};

/// Convert a decimal major-unit price (e.g. `19.99`) to integer minor units
/// (`1999`), rounding half up.
///
/// Returns `None` for non-finite or non-positive prices and for prices that
/// round down to zero minor units.
pub fn to_minor_units(price: f64) -> Option<i64> {
    if !price.is_finite() || price <= 0.0 {
        return None;
    }
    let cents = (price * 100.0).round();
    if cents < 1.0 || cents > i64::MAX as f64 {
        return None;
    }
    Some(cents as i64)
}

/// Format minor units as a display amount, e.g. `1999, "chf"` -> `"19.99 CHF"`.
pub fn format_amount(minor_units: i64, currency: &str) -> String {
    let sign = if minor_units < 0 { "-" } else { "" };
    let abs = minor_units.unsigned_abs();
    format!(
        "{}{}.{:02} {}",
        sign,
        abs / 100,
        abs % 100,
        currency.to_uppercase()
    )
}

/// Format a Unix timestamp the way Swiss customers read it (e.g. "15.01.2024, 14:03").
pub fn format_timestamp(timestamp: i64) -> String {
    DateTime::<Utc>::from_timestamp(timestamp, 0)
        .map(|dt| dt.format("%d.%m.%Y, %H:%M UTC").to_string())
        .unwrap_or_else(|| "Unknown date".to_string())
}

/// Escape text for interpolation into HTML.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
