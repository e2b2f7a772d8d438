/// Class catalog: the static class → nutrition mapping.
///
/// The catalog is an external, read-only JSON object whose keys are class
/// name variants (original casing, normalized with underscores, lowercase)
/// and whose values are nutrition records. Because the file's key casing is
/// not guaranteed to match the dropdown text, [`ClassCatalog::resolve`] tries
/// three key variants in a fixed order.
///
/// Two sources are supported:
///
/// - [`HttpCatalog`] fetches `GET {backend}/static/class.json` with `ureq`.
/// - [`FileCatalog`] reads a local JSON file (for offline use).
///
/// A fresh catalog is fetched for every lookup; nothing is cached.
pub mod normalize;

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::NutrilensConfig;

pub use normalize::normalize_key;

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// Nutrition metadata for one class.
///
/// Every field is an arbitrary JSON scalar in the source file (numbers and
/// strings such as `"12 g"` both occur) and may be missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NutritionRecord {
    pub calories: Option<Value>,
    pub protein: Option<Value>,
    pub fat: Option<Value>,
    pub carbohydrates: Option<Value>,
    pub fiber: Option<Value>,
}

/// A decoded catalog file.
///
/// Values stay raw until a lookup reads them, so one malformed entry only
/// affects the classes that resolve to it.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct ClassCatalog {
    entries: BTreeMap<String, Value>,
}

impl ClassCatalog {
    /// Decode a catalog from JSON text.
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).context("class catalog is not a valid JSON object")
    }

    /// Resolve a selected class name to its record.
    ///
    /// Tries, in order: the raw name, its normalized form, its lowercase
    /// form. The first key holding a JSON object wins; `null`, scalars and
    /// arrays are skipped and the next variant is tried.
    pub fn resolve(&self, selected: &str) -> Option<NutritionRecord> {
        let normalized = normalize_key(Some(selected));
        let lower = selected.to_lowercase();

        [selected, normalized.as_str(), lower.as_str()]
            .into_iter()
            .find_map(|key| self.record(key))
    }

    fn record(&self, key: &str) -> Option<NutritionRecord> {
        let value = self.entries.get(key).filter(|v| v.is_object())?;
        serde_json::from_value(value.clone()).ok()
    }

    /// All class keys, sorted.
    pub fn class_names(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Sources
// ---------------------------------------------------------------------------

/// Where the class catalog comes from.
pub trait CatalogSource {
    /// Fetch and decode the full catalog.
    fn fetch(&self) -> Result<ClassCatalog>;

    /// Human-readable origin, for diagnostics.
    fn describe(&self) -> String;
}

/// Catalog served over HTTP by the prediction backend.
#[derive(Debug, Clone)]
pub struct HttpCatalog {
    url: String,
    timeout: Option<Duration>,
}

impl HttpCatalog {
    pub fn new(url: impl Into<String>, timeout: Option<Duration>) -> Self {
        Self {
            url: url.into(),
            timeout,
        }
    }

    /// Build from the backend base URL and catalog path in the config.
    pub fn from_config(config: &NutrilensConfig) -> Self {
        let base = config.backend.url.trim_end_matches('/');
        let path = config.catalog.path.trim_start_matches('/');
        Self::new(format!("{base}/{path}"), config.backend.timeout())
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl CatalogSource for HttpCatalog {
    fn fetch(&self) -> Result<ClassCatalog> {
        let mut request = ureq::get(&self.url);
        if let Some(timeout) = self.timeout {
            request = request.timeout(timeout);
        }

        let body = request
            .call()
            .with_context(|| format!("failed to fetch class catalog from {}", self.url))?
            .into_string()
            .context("failed to read class catalog response")?;

        ClassCatalog::from_json(&body)
    }

    fn describe(&self) -> String {
        self.url.clone()
    }
}

/// Catalog read from a local JSON file.
#[derive(Debug, Clone)]
pub struct FileCatalog {
    path: PathBuf,
}

impl FileCatalog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl CatalogSource for FileCatalog {
    fn fetch(&self) -> Result<ClassCatalog> {
        let text = fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read {}", self.path.display()))?;
        ClassCatalog::from_json(&text)
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Pick the catalog source the config asks for: a local file when
/// `catalog.file` is set, otherwise the backend's static JSON.
pub fn source_from_config(config: &NutrilensConfig) -> Box<dyn CatalogSource + Send + Sync> {
    if config.catalog.file.trim().is_empty() {
        Box::new(HttpCatalog::from_config(config))
    } else {
        Box::new(FileCatalog::new(config.catalog.file.trim()))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(calories: i64) -> NutritionRecord {
        NutritionRecord {
            calories: Some(json!(calories)),
            ..NutritionRecord::default()
        }
    }

    #[test]
    fn resolve_prefers_exact_key() {
        let catalog = ClassCatalog::from_json(
            r#"{
                "Red Apple": {"calories": 1},
                "red_apple": {"calories": 2},
                "red apple": {"calories": 3}
            }"#,
        )
        .unwrap();
        assert_eq!(catalog.resolve("Red Apple"), Some(record(1)));
    }

    #[test]
    fn resolve_falls_back_to_normalized_then_lowercase() {
        let catalog = ClassCatalog::from_json(
            r#"{
                "Red_Apple": {"calories": 1},
                "red_apple": {"calories": 2},
                "red apple": {"calories": 3}
            }"#,
        )
        .unwrap();
        assert_eq!(catalog.resolve("Red Apple"), Some(record(2)));

        let catalog = ClassCatalog::from_json(
            r#"{
                "Red_Apple": {"calories": 1},
                "red apple": {"calories": 3}
            }"#,
        )
        .unwrap();
        assert_eq!(catalog.resolve("Red Apple"), Some(record(3)));
    }

    #[test]
    fn resolve_misses_when_no_variant_matches() {
        let catalog = ClassCatalog::from_json(r#"{"Red_Apple": {"calories": 1}}"#).unwrap();
        assert_eq!(catalog.resolve("Red Apple"), None);
        assert_eq!(catalog.resolve("banana"), None);
    }

    #[test]
    fn null_entries_fall_through() {
        let catalog =
            ClassCatalog::from_json(r#"{"Pizza": null, "pizza": {"calories": 266}}"#).unwrap();
        assert_eq!(catalog.resolve("Pizza"), Some(record(266)));
    }

    #[test]
    fn malformed_entries_only_affect_their_own_key() {
        let catalog = ClassCatalog::from_json(
            r#"{
                "_version": "2",
                "Pizza": 0,
                "pizza": {"calories": 266},
                "sushi": [1, 2],
                "Sushi": false
            }"#,
        )
        .unwrap();
        assert_eq!(catalog.resolve("Pizza"), Some(record(266)));
        assert_eq!(catalog.resolve("Sushi"), None);
        assert_eq!(catalog.resolve("_version"), None);
        assert_eq!(catalog.len(), 5);
    }

    #[test]
    fn records_tolerate_missing_and_string_fields() {
        let catalog =
            ClassCatalog::from_json(r#"{"sushi": {"protein": "6 g", "extra": true}}"#).unwrap();
        let rec = catalog.resolve("sushi").unwrap();
        assert_eq!(rec.protein, Some(json!("6 g")));
        assert!(rec.calories.is_none());
    }

    #[test]
    fn class_names_are_sorted() {
        let catalog =
            ClassCatalog::from_json(r#"{"sushi": {}, "apple_pie": {}, "pizza": {}}"#).unwrap();
        assert_eq!(catalog.class_names(), vec!["apple_pie", "pizza", "sushi"]);
        assert_eq!(catalog.len(), 3);
    }

    #[test]
    fn invalid_json_is_an_error() {
        assert!(ClassCatalog::from_json("not json").is_err());
        assert!(ClassCatalog::from_json("[1, 2]").is_err());
    }

    #[test]
    fn http_catalog_joins_base_and_path() {
        let mut config = NutrilensConfig::default();
        config.backend.url = "http://localhost:5000/".to_string();
        let catalog = HttpCatalog::from_config(&config);
        assert_eq!(catalog.url(), "http://localhost:5000/static/class.json");
    }

    #[test]
    fn file_catalog_reports_missing_file() {
        let source = FileCatalog::new("/definitely/not/here/class.json");
        assert!(source.fetch().is_err());
    }
}
