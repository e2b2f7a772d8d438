/// Configuration system for nutrilens.
///
/// Provides a layered configuration hierarchy:
///
/// 1. **Built-in defaults** — hardcoded in [`schema::NutrilensConfig::default()`]
/// 2. **User global config** — `~/.nutrilens/config.toml`
/// 3. **Project local config** — `.nutrilens.toml` in the current working directory
/// 4. **Environment variables** — `NUTRILENS_*` overrides (highest precedence)
///
/// Missing sections in a TOML file fall back to built-in defaults.
pub mod schema;

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};

pub use schema::{NutrilensConfig, Theme};

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Load the fully resolved configuration.
///
/// Merges all layers in order: defaults → global TOML → project TOML → env
/// vars.
pub fn load() -> NutrilensConfig {
    let mut config = NutrilensConfig::default();

    if let Some(global) = load_toml_file(global_config_path()) {
        config = global;
    }

    // A project file is deserialized with defaults for unset keys, so it
    // replaces the global layer wholesale.
    if let Some(project) = load_toml_file(project_config_path()) {
        config = project;
    }

    apply_env_overrides(&mut config);

    config
}

/// Load a TOML config file from the given path (if it exists).
///
/// Malformed files are ignored so a broken config never blocks the page.
fn load_toml_file(path: Option<PathBuf>) -> Option<NutrilensConfig> {
    let path = path?;
    let content = fs::read_to_string(&path).ok()?;
    toml::from_str(&content).ok()
}

// ---------------------------------------------------------------------------
// File paths
// ---------------------------------------------------------------------------

/// Directory holding the global config and the event log: `~/.nutrilens/`.
pub fn home_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".nutrilens"))
}

/// Path to the user global config: `~/.nutrilens/config.toml`.
fn global_config_path() -> Option<PathBuf> {
    home_dir().map(|dir| dir.join("config.toml"))
}

/// Path to the project local config: `.nutrilens.toml` in the current directory.
fn project_config_path() -> Option<PathBuf> {
    std::env::current_dir()
        .ok()
        .map(|cwd| cwd.join(".nutrilens.toml"))
}

/// Return the path to the global config file for display/init purposes.
pub fn global_config_file() -> Option<PathBuf> {
    global_config_path()
}

/// Return the path to the project config file for display purposes.
pub fn project_config_file() -> Option<PathBuf> {
    project_config_path()
}

// ---------------------------------------------------------------------------
// Environment variable overrides
// ---------------------------------------------------------------------------

/// Apply environment variable overrides (highest precedence layer).
///
/// Supported variables:
/// - `NUTRILENS_BACKEND_URL` — backend base URL
/// - `NUTRILENS_TIMEOUT_MS` — request timeout (`0` = none)
/// - `NUTRILENS_CATALOG_FILE` — local class catalog file
/// - `NUTRILENS_WEB_ADDR` — dashboard listen address
/// - `NUTRILENS_THEME` — initial theme (`light`, `dark`)
/// - `NUTRILENS_LOG` — event log on/off
fn apply_env_overrides(config: &mut NutrilensConfig) {
    if let Ok(val) = std::env::var("NUTRILENS_BACKEND_URL")
        && !val.is_empty()
    {
        config.backend.url = val;
    }
    if let Ok(val) = std::env::var("NUTRILENS_TIMEOUT_MS")
        && let Ok(ms) = val.parse::<u64>()
    {
        config.backend.timeout_ms = ms;
    }
    if let Ok(val) = std::env::var("NUTRILENS_CATALOG_FILE") {
        config.catalog.file = val;
    }
    if let Ok(val) = std::env::var("NUTRILENS_WEB_ADDR")
        && !val.is_empty()
    {
        config.web.addr = val;
    }
    if let Ok(val) = std::env::var("NUTRILENS_THEME")
        && let Some(theme) = parse_theme(&val)
    {
        config.ui.theme = theme;
    }
    if let Ok(val) = std::env::var("NUTRILENS_LOG") {
        config.logging.enabled = is_truthy(&val);
    }
}

/// Check if a string value represents a truthy boolean.
fn is_truthy(val: &str) -> bool {
    matches!(
        val.to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Parse a theme string.
fn parse_theme(val: &str) -> Option<Theme> {
    match val.to_ascii_lowercase().as_str() {
        "light" => Some(Theme::Light),
        "dark" => Some(Theme::Dark),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Config init / set / reset
// ---------------------------------------------------------------------------

/// Write the default annotated config to `~/.nutrilens/config.toml`.
///
/// Returns an error if the file already exists (use `force = true` to
/// overwrite).
pub fn init_config(force: bool) -> Result<PathBuf> {
    let path = global_config_path().context("could not determine home directory")?;

    if path.exists() && !force {
        anyhow::bail!(
            "config file already exists at {}. Use --force to overwrite.",
            path.display()
        );
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("failed to create ~/.nutrilens/ directory")?;
    }

    fs::write(&path, NutrilensConfig::default_toml()).context("failed to write config file")?;

    Ok(path)
}

/// Set a single config key to a value in the global config file.
///
/// Supports dotted keys like `backend.url`. The existing value's type
/// decides how `value` is parsed.
pub fn set_config_value(key: &str, value: &str) -> Result<()> {
    let path = global_config_path().context("could not determine home directory")?;

    let content = if path.exists() {
        fs::read_to_string(&path).context("failed to read config file")?
    } else {
        toml::to_string_pretty(&NutrilensConfig::default())
            .context("failed to serialize default config")?
    };

    let mut root: toml::Value =
        toml::from_str(&content).context("failed to parse config as TOML value")?;
    set_toml_value(&mut root, key, value)?;

    // Reject values the schema cannot hold (e.g. `ui.theme = "blue"`).
    let updated = toml::to_string_pretty(&root).context("failed to serialize config")?;
    toml::from_str::<NutrilensConfig>(&updated)
        .with_context(|| format!("invalid value for '{key}': {value}"))?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("failed to create config directory")?;
    }
    fs::write(&path, updated).context("failed to write config file")?;

    Ok(())
}

/// Set a value in a TOML value tree using a dotted key path.
fn set_toml_value(root: &mut toml::Value, key: &str, raw_value: &str) -> Result<()> {
    let parts: Vec<&str> = key.split('.').collect();
    let Some((leaf, sections)) = parts.split_last() else {
        anyhow::bail!("empty config key");
    };

    let mut current = root;
    for &part in sections {
        current = current
            .get_mut(part)
            .with_context(|| format!("config key not found: section '{part}' in '{key}'"))?;
    }

    let table = current.as_table_mut().with_context(|| {
        format!(
            "expected table at '{}'",
            key.rsplit_once('.').map(|(s, _)| s).unwrap_or("")
        )
    })?;

    let new_value = match table.get(*leaf) {
        Some(toml::Value::Boolean(_)) => toml::Value::Boolean(is_truthy(raw_value)),
        Some(toml::Value::Integer(_)) => {
            let n: i64 = raw_value
                .parse()
                .with_context(|| format!("expected integer for '{key}', got '{raw_value}'"))?;
            toml::Value::Integer(n)
        }
        Some(toml::Value::Array(_)) => toml::Value::Array(
            raw_value
                .split(',')
                .map(|s| toml::Value::String(s.trim().to_string()))
                .collect(),
        ),
        Some(_) => toml::Value::String(raw_value.to_string()),
        None => anyhow::bail!("config key not found: '{key}'"),
    };

    table.insert(leaf.to_string(), new_value);
    Ok(())
}

/// Reset the global config to defaults (overwrite the file).
pub fn reset_config() -> Result<PathBuf> {
    init_config(true)
}

/// Show the effective (fully resolved) config as TOML.
pub fn show_effective_config() -> Result<String> {
    let config = load();
    toml::to_string_pretty(&config).context("failed to serialize effective config")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_truthy_accepts_variants() {
        assert!(is_truthy("1"));
        assert!(is_truthy("true"));
        assert!(is_truthy("YES"));
        assert!(is_truthy("on"));
        assert!(!is_truthy("0"));
        assert!(!is_truthy("false"));
        assert!(!is_truthy(""));
    }

    #[test]
    fn parse_theme_handles_variants() {
        assert_eq!(parse_theme("dark"), Some(Theme::Dark));
        assert_eq!(parse_theme("LIGHT"), Some(Theme::Light));
        assert_eq!(parse_theme("blue"), None);
    }

    #[test]
    fn set_toml_value_updates_string() {
        let mut root: toml::Value = toml::from_str(
            r#"
[backend]
url = "http://127.0.0.1:5000"
"#,
        )
        .unwrap();
        set_toml_value(&mut root, "backend.url", "http://10.0.0.2:8000").unwrap();
        assert_eq!(
            root["backend"]["url"].as_str(),
            Some("http://10.0.0.2:8000")
        );
    }

    #[test]
    fn set_toml_value_updates_integer_and_bool() {
        let mut root: toml::Value = toml::from_str(
            r#"
[backend]
timeout_ms = 0

[web]
open_browser = true
"#,
        )
        .unwrap();
        set_toml_value(&mut root, "backend.timeout_ms", "1500").unwrap();
        set_toml_value(&mut root, "web.open_browser", "off").unwrap();
        assert_eq!(root["backend"]["timeout_ms"].as_integer(), Some(1500));
        assert_eq!(root["web"]["open_browser"].as_bool(), Some(false));
    }

    #[test]
    fn set_toml_value_splits_arrays() {
        let mut root: toml::Value = toml::from_str(
            r#"
[predict]
model_types = ["custom_model"]
"#,
        )
        .unwrap();
        set_toml_value(&mut root, "predict.model_types", "vgg_model, resnet_model").unwrap();
        let types: Vec<&str> = root["predict"]["model_types"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|v| v.as_str())
            .collect();
        assert_eq!(types, vec!["vgg_model", "resnet_model"]);
    }

    #[test]
    fn set_toml_value_rejects_unknown_keys() {
        let mut root: toml::Value = toml::from_str(
            r#"
[backend]
url = "x"
"#,
        )
        .unwrap();
        assert!(set_toml_value(&mut root, "nonexistent.key", "value").is_err());
        assert!(set_toml_value(&mut root, "backend.nope", "value").is_err());
    }

    #[test]
    fn integer_key_rejects_text() {
        let mut root: toml::Value = toml::from_str("[backend]\ntimeout_ms = 0\n").unwrap();
        assert!(set_toml_value(&mut root, "backend.timeout_ms", "soon").is_err());
    }

    #[test]
    fn show_effective_config_returns_toml() {
        let toml_str = show_effective_config().unwrap();
        let _: NutrilensConfig = toml::from_str(&toml_str).unwrap();
    }
}
