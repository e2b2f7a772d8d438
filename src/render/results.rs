use std::fmt::Write;

use serde_json::Value;

use super::{display_value, html_escape, metric, percent};
use crate::predict::{PredictionResponse, is_truthy};

/// Placeholder for missing label fields.
const MISSING: &str = "--";

/// Render a successful prediction: a field/value table followed by the
/// confusion matrix when the response carries a non-empty one.
pub fn render_results(data: &PredictionResponse) -> String {
    let mut html = String::from("<table class=\"pred-table\">\n<tr><th>Field</th><th>Value</th></tr>\n");
    for (field, value) in result_rows(data) {
        let _ = writeln!(
            html,
            "<tr><td>{field}</td><td>{}</td></tr>",
            html_escape(&value)
        );
    }
    html.push_str("</table>\n");

    if let Some(matrix) = data.confusion_matrix_full.as_deref()
        && !matrix.is_empty()
    {
        let labels = data.confusion_matrix_labels.as_deref().unwrap_or_default();
        html.push_str(&render_confusion_matrix(matrix, labels));
    }

    html
}

/// Field/value pairs of the results table, in display order.
pub fn result_rows(data: &PredictionResponse) -> [(&'static str, String); 8] {
    [
        ("Predicted Class", label(data.predicted_label.as_ref())),
        ("Selected Class", label(data.selected_class.as_ref())),
        ("Model Used", label(data.model_used.as_ref())),
        ("Confidence", percent(data.confidence_fraction())),
        ("Accuracy", metric(data.accuracy.as_ref())),
        ("Precision", metric(data.precision.as_ref())),
        ("Recall", metric(data.recall.as_ref())),
        ("F1 Score", metric(data.f1_score.as_ref())),
    ]
}

/// Render a failure message as an error block.
pub fn render_error(message: &str) -> String {
    format!(
        "<div class=\"error\" style=\"color:red;\">Error: {}</div>\n",
        html_escape(message)
    )
}

/// Header labels for an `n`-row confusion matrix.
///
/// The provided labels are used only when there is exactly one per row;
/// otherwise generic `C1..Cn` labels are synthesized. The same list heads
/// both rows and columns, so row `i` and column `i` name the same class.
pub fn confusion_headers(rows: usize, labels: &[Value]) -> Vec<String> {
    if labels.len() == rows {
        labels.iter().map(display_value).collect()
    } else {
        (1..=rows).map(|i| format!("C{i}")).collect()
    }
}

fn render_confusion_matrix(matrix: &[Vec<Value>], labels: &[Value]) -> String {
    let headers = confusion_headers(matrix.len(), labels);

    let mut html = String::from(
        "<div style=\"margin-top:15px;\">\n\
         <strong>Confusion Matrix (rows = actual, cols = predicted)</strong>\n\
         <table class=\"confusion-table\">\n\
         <thead><tr><th></th>",
    );
    for header in &headers {
        let _ = write!(html, "<th>{}</th>", html_escape(header));
    }
    html.push_str("</tr></thead>\n<tbody>\n");

    for (header, row) in headers.iter().zip(matrix) {
        let _ = write!(html, "<tr><th>{}</th>", html_escape(header));
        for cell in row {
            let _ = write!(html, "<td>{}</td>", html_escape(&display_value(cell)));
        }
        html.push_str("</tr>\n");
    }

    html.push_str("</tbody></table></div>\n");
    html
}

/// A label field, or `--` when it is missing or blank.
fn label(value: Option<&Value>) -> String {
    match value {
        Some(value) if is_truthy(value) => display_value(value),
        _ => MISSING.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
