use std::fmt::Write;

use serde_json::Value;

use super::{NOT_AVAILABLE, display_value, html_escape};
use crate::catalog::NutritionRecord;

/// Nutrition fields in display order.
pub fn nutrition_lines(record: &NutritionRecord) -> [(&'static str, String); 5] {
    [
        ("Calories", field(record.calories.as_ref())),
        ("Protein", field(record.protein.as_ref())),
        ("Fat", field(record.fat.as_ref())),
        ("Carbohydrates", field(record.carbohydrates.as_ref())),
        ("Fiber", field(record.fiber.as_ref())),
    ]
}

/// Render a nutrition record for the details box.
pub fn render_nutrition(record: &NutritionRecord) -> String {
    let mut html = String::from("<strong>Nutrition Details</strong><br>\n");
    for (name, value) in nutrition_lines(record) {
        let _ = writeln!(
            html,
            "<div class=\"nutri-line\"><b>{name}:</b> {}</div>",
            html_escape(&value)
        );
    }
    html
}

fn field(value: Option<&Value>) -> String {
    value
        .map(display_value)
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}
