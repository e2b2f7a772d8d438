//! HTML fragments for the details box and the prediction output box.
//!
//! Renderers are pure: they take decoded records and return markup that
//! replaces the target container's content wholesale. Every interpolated
//! value is HTML-escaped.

pub mod nutrition;
pub mod results;

use serde_json::Value;

pub use nutrition::render_nutrition;
pub use results::{confusion_headers, render_error, render_results};

/// Placeholder for metrics and nutrition fields the source left out.
pub const NOT_AVAILABLE: &str = "NA";

/// Text of a JSON scalar as a template would print it: strings without
/// quotes, everything else in its JSON form.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Format a metric as a percentage.
///
/// Numbers are fractions in `[0, 1]` and render as `value * 100` with two
/// decimals and a `%` suffix. Anything else is shown verbatim.
pub fn pct(value: &Value) -> String {
    match value.as_f64() {
        Some(fraction) => percent(fraction),
        None => display_value(value),
    }
}

/// `fraction * 100` with two decimals and a `%` suffix.
pub fn percent(fraction: f64) -> String {
    format!("{:.2}%", fraction * 100.0)
}

/// `pct` for an optional metric; absent metrics render as `NA`.
pub fn metric(value: Option<&Value>) -> String {
    match value {
        Some(value) => pct(value),
        None => NOT_AVAILABLE.to_string(),
    }
}

/// Minimal HTML entity escaping for untrusted content.
pub fn html_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
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

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
