use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Decoded body of `POST /predict`.
///
/// The backend is loosely typed: labels and metrics may arrive as numbers,
/// strings or `null`, so every payload field is kept as a JSON value and
/// interpreted by the renderer. A JSON `null` decodes to `None`, and a
/// value of the wrong shape is dropped instead of failing the whole body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PredictionResponse {
    /// Any truthy value counts: `true`, non-zero numbers, non-empty strings.
    #[serde(deserialize_with = "truthy")]
    pub success: bool,
    /// Server-supplied failure message (only meaningful when `success` is false).
    pub error: Option<Value>,

    #[serde(alias = "predicted_class")]
    pub predicted_label: Option<Value>,
    pub selected_class: Option<Value>,
    pub model_used: Option<Value>,
    /// Fraction in `[0, 1]`.
    pub confidence: Option<Value>,

    pub accuracy: Option<Value>,
    pub precision: Option<Value>,
    pub recall: Option<Value>,
    pub f1_score: Option<Value>,

    /// Square grid, rows = actual, columns = predicted.
    #[serde(alias = "confusion_matrix", deserialize_with = "lenient")]
    pub confusion_matrix_full: Option<Vec<Vec<Value>>>,
    #[serde(deserialize_with = "lenient")]
    pub confusion_matrix_labels: Option<Vec<Value>>,

    /// Where the backend stored the uploaded image.
    #[serde(deserialize_with = "lenient")]
    pub image_url: Option<String>,
}

/// JavaScript truthiness of a JSON value.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn truthy<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    Value::deserialize(deserializer).map(|value| is_truthy(&value))
}

fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

impl PredictionResponse {
    /// A failed response carrying `message`.
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(Value::String(message.into())),
            ..Self::default()
        }
    }

    /// Confidence as a number. Absent or unparseable values count as 0.
    pub fn confidence_fraction(&self) -> f64 {
        match &self.confidence {
            Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
            Some(Value::String(s)) => s.trim().parse().unwrap_or(0.0),
            Some(Value::Bool(true)) => 1.0,
            _ => 0.0,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_success_payload() {
        let resp: PredictionResponse = serde_json::from_value(json!({
            "success": true,
            "predicted_label": "pizza",
            "selected_class": "pizza",
            "model_used": "vgg16.h5",
            "confidence": 0.93,
            "accuracy": 0.9,
            "precision": null,
            "confusion_matrix_full": [[1, 0], [0, 1]],
            "confusion_matrix_labels": ["pizza", "sushi"]
        }))
        .unwrap();

        assert!(resp.success);
        assert_eq!(resp.predicted_label, Some(json!("pizza")));
        assert_eq!(resp.precision, None);
        assert_eq!(resp.recall, None);
        assert_eq!(resp.confusion_matrix_full.as_ref().map(Vec::len), Some(2));
        assert!((resp.confidence_fraction() - 0.93).abs() < f64::EPSILON);
    }

    #[test]
    fn accepts_reference_backend_field_names() {
        let resp: PredictionResponse = serde_json::from_value(json!({
            "success": true,
            "image_url": "/static/uploads/x.jpg",
            "predicted_class": "sushi",
            "confidence": "0.75",
            "confusion_matrix": [[160, 8, 2], [13, 131, 26], [7, 5, 49]]
        }))
        .unwrap();

        assert_eq!(resp.predicted_label, Some(json!("sushi")));
        assert_eq!(resp.image_url.as_deref(), Some("/static/uploads/x.jpg"));
        assert_eq!(resp.confusion_matrix_full.as_ref().map(Vec::len), Some(3));
        assert!((resp.confidence_fraction() - 0.75).abs() < f64::EPSILON);
    }

    #[test]
    fn decodes_failure_payload() {
        let resp: PredictionResponse =
            serde_json::from_str(r#"{"success": false, "error": "bad image"}"#).unwrap();
        assert!(!resp.success);
        assert_eq!(resp.error, Some(json!("bad image")));
    }

    #[test]
    fn missing_success_flag_is_failure() {
        let resp: PredictionResponse = serde_json::from_str("{}").unwrap();
        assert!(!resp.success);
    }

    #[test]
    fn success_flag_follows_truthiness() {
        for (body, expected) in [
            (r#"{"success": 1}"#, true),
            (r#"{"success": "yes"}"#, true),
            (r#"{"success": 0}"#, false),
            (r#"{"success": ""}"#, false),
            (r#"{"success": null}"#, false),
        ] {
            let resp: PredictionResponse = serde_json::from_str(body).unwrap();
            assert_eq!(resp.success, expected, "{body}");
        }
    }

    #[test]
    fn misshapen_optional_fields_are_dropped() {
        let resp: PredictionResponse = serde_json::from_value(json!({
            "success": true,
            "image_url": 5,
            "confusion_matrix_full": "n/a",
            "confusion_matrix_labels": {"a": 1},
            "predicted_label": "pizza"
        }))
        .unwrap();

        assert!(resp.success);
        assert_eq!(resp.image_url, None);
        assert_eq!(resp.confusion_matrix_full, None);
        assert_eq!(resp.confusion_matrix_labels, None);
        assert_eq!(resp.predicted_label, Some(json!("pizza")));
    }

    #[test]
    fn confidence_defaults_to_zero() {
        assert_eq!(PredictionResponse::default().confidence_fraction(), 0.0);
        let resp = PredictionResponse {
            confidence: Some(json!("high")),
            ..PredictionResponse::default()
        };
        assert_eq!(resp.confidence_fraction(), 0.0);
    }
}
