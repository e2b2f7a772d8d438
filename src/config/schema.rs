/// Configuration schema and defaults for nutrilens.
///
/// Defines the TOML-serializable configuration structure with all sections:
/// `[backend]`, `[catalog]`, `[predict]`, `[web]`, `[ui]` and `[logging]`.
///
/// Every field has a built-in default. Users only need to set the values
/// they want to override.
use std::time::Duration;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Top-level nutrilens configuration.
///
/// Maps directly to the `~/.nutrilens/config.toml` and `.nutrilens.toml`
/// file schemas. All sections and fields are optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NutrilensConfig {
    pub backend: BackendConfig,
    pub catalog: CatalogConfig,
    pub predict: PredictConfig,
    pub web: WebConfig,
    pub ui: UiConfig,
    pub logging: LoggingConfig,
}

// ---------------------------------------------------------------------------
// [backend]
// ---------------------------------------------------------------------------

/// The prediction backend that serves `/predict` and the class catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Base URL of the backend.
    pub url: String,
    /// Request timeout in milliseconds. `0` waits indefinitely.
    pub timeout_ms: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:5000".to_string(),
            timeout_ms: 0,
        }
    }
}

impl BackendConfig {
    /// The request timeout, or `None` when requests may block forever.
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_ms > 0).then(|| Duration::from_millis(self.timeout_ms))
    }
}

// ---------------------------------------------------------------------------
// [catalog]
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Path of the class catalog JSON on the backend.
    pub path: String,
    /// Local catalog file. When non-empty it replaces the HTTP fetch.
    pub file: String,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            path: "/static/class.json".to_string(),
            file: String::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// [predict]
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PredictConfig {
    /// Model families offered as predict buttons, in display order.
    pub model_types: Vec<String>,
    /// Model type used by `nutrilens predict` when `--model` is omitted.
    pub default_model: String,
}

impl Default for PredictConfig {
    fn default() -> Self {
        Self {
            model_types: vec![
                "custom_model".to_string(),
                "resnet_model".to_string(),
                "vgg_model".to_string(),
            ],
            default_model: "custom_model".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// [web]
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebConfig {
    /// Listen address of the dashboard.
    pub addr: String,
    /// Open the dashboard in the default browser on start.
    pub open_browser: bool,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:9747".to_string(),
            open_browser: true,
        }
    }
}

// ---------------------------------------------------------------------------
// [ui]
// ---------------------------------------------------------------------------

/// Page presentation theme.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    /// The other theme.
    pub fn toggled(self) -> Self {
        match self {
            Self::Light => Self::Dark,
            Self::Dark => Self::Light,
        }
    }
}

impl std::fmt::Display for Theme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Light => write!(f, "light"),
            Self::Dark => write!(f, "dark"),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    /// Theme the page starts with.
    pub theme: Theme,
}

// ---------------------------------------------------------------------------
// [logging]
// ---------------------------------------------------------------------------

/// Event log settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Whether lookup failures and prediction attempts are logged.
    pub enabled: bool,
    /// Log file path. Empty means `~/.nutrilens/events.jsonl`.
    pub path: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: String::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Annotated default file
// ---------------------------------------------------------------------------

impl NutrilensConfig {
    /// The annotated default config written by `nutrilens config init`.
    pub fn default_toml() -> String {
        r#"# nutrilens Configuration
#
# Configuration hierarchy (highest precedence wins):
#   1. Environment variables (NUTRILENS_*)
#   2. Project config (.nutrilens.toml in current directory)
#   3. User global config (~/.nutrilens/config.toml)
#   4. Built-in defaults

[backend]
url = "http://127.0.0.1:5000"
timeout_ms = 0                        # 0 = wait indefinitely

[catalog]
path = "/static/class.json"           # Served by the backend
file = ""                             # Set to read a local class.json instead

[predict]
model_types = ["custom_model", "resnet_model", "vgg_model"]
default_model = "custom_model"

[web]
addr = "127.0.0.1:9747"
open_browser = true

[ui]
theme = "light"                       # light | dark

[logging]
enabled = true
path = ""                             # Empty = ~/.nutrilens/events.jsonl
"#
        .to_string()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
