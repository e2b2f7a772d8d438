//! CLI command implementations for nutrilens.
//!
//! Provides subcommand handlers for:
//! - `nutrilens classes` — list catalog classes
//! - `nutrilens info <class>` — nutrition lookup for one class
//! - `nutrilens predict --file F --class C` — classify an image
//! - `nutrilens web` — start the dashboard
//! - `nutrilens health` — check config, catalog, backend, event log
//! - `nutrilens config show|init|set|reset` — configuration management

use std::path::Path;

use anyhow::{Context, Result};
use colored::Colorize;

use crate::catalog;
use crate::config;
use crate::events::EventLog;
use crate::page::{LookupOutcome, Page, PredictOutcome};
use crate::predict::{HttpPredictor, PredictBackend, Upload};
use crate::render::{self, display_value};
use crate::web::{self, Dashboard};

/// Output format for lookup and prediction commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Html,
    Json,
}

impl OutputFormat {
    pub fn from_str_opt(s: Option<&str>) -> Self {
        match s {
            Some("html") => Self::Html,
            Some("json") => Self::Json,
            _ => Self::Text,
        }
    }
}

// ---------------------------------------------------------------------------
// nutrilens classes
// ---------------------------------------------------------------------------

/// List every class in the catalog, sorted.
pub fn run_classes() -> Result<()> {
    let cfg = config::load();
    let source = catalog::source_from_config(&cfg);
    let catalog = source
        .fetch()
        .with_context(|| format!("could not load catalog from {}", source.describe()))?;

    if catalog.is_empty() {
        println!("{}", "The catalog has no classes.".yellow());
        return Ok(());
    }

    println!(
        "{}",
        format!("Classes ({})", catalog.len()).bold().cyan()
    );
    for name in catalog.class_names() {
        println!("  {name}");
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// nutrilens info
// ---------------------------------------------------------------------------

/// Look up nutrition details for a class.
pub fn run_info(class: &str, format: OutputFormat) -> Result<()> {
    let cfg = config::load();
    let source = catalog::source_from_config(&cfg);
    let mut page = Page::from_config(&cfg);

    let outcome = page.select_class(class, source.as_ref());

    match format {
        OutputFormat::Html => println!("{}", page.details()),
        OutputFormat::Json => print_lookup_json(class, &outcome)?,
        OutputFormat::Text => print_lookup_text(class, &outcome),
    }

    Ok(())
}

fn print_lookup_text(class: &str, outcome: &LookupOutcome) {
    match outcome {
        LookupOutcome::Found(record) => {
            println!("{}", format!("Nutrition Details — {class}").bold().cyan());
            println!("{}", "=".repeat(40));
            for (name, value) in render::nutrition::nutrition_lines(record) {
                println!("  {:<15} {}", format!("{name}:").bold(), value);
            }
        }
        LookupOutcome::Prompt => println!("{}", outcome.to_html().dimmed()),
        LookupOutcome::NotFound => println!("{}", outcome.to_html().yellow()),
        LookupOutcome::LoadFailed(detail) => {
            println!("{}", outcome.to_html().red());
            println!("  {}", detail.dimmed());
        }
    }
}

fn print_lookup_json(class: &str, outcome: &LookupOutcome) -> Result<()> {
    let value = match outcome {
        LookupOutcome::Found(record) => serde_json::json!({
            "class": class,
            "found": true,
            "nutrition": record,
        }),
        LookupOutcome::LoadFailed(detail) => serde_json::json!({
            "class": class,
            "found": false,
            "error": detail,
        }),
        _ => serde_json::json!({
            "class": class,
            "found": false,
            "message": outcome.to_html(),
        }),
    };
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

// ---------------------------------------------------------------------------
// nutrilens predict
// ---------------------------------------------------------------------------

/// Send an image to the backend and show the results.
///
/// Missing `--file` or `--class` stops before any request is made.
pub fn run_predict(
    file: Option<&Path>,
    class: Option<&str>,
    model: Option<&str>,
    format: OutputFormat,
) -> Result<()> {
    let cfg = config::load();
    let backend = HttpPredictor::from_config(&cfg);
    let model_type = model.unwrap_or(&cfg.predict.default_model);

    let upload = file.map(Upload::from_path).transpose()?;

    let mut page = Page::from_config(&cfg);
    page.set_selection(class.unwrap_or_default());

    let outcome = page
        .predict(model_type, upload.as_ref(), &backend)
        .map_err(|precondition| anyhow::anyhow!(precondition))?;

    match format {
        OutputFormat::Html => println!("{}", page.output()),
        OutputFormat::Json => print_prediction_json(&outcome)?,
        OutputFormat::Text => print_prediction_text(&outcome),
    }

    Ok(())
}

fn print_prediction_text(outcome: &PredictOutcome) {
    let PredictOutcome::Rendered(resp) = outcome else {
        println!("{} {}", "Error:".red().bold(), outcome.error_message().unwrap_or_default());
        return;
    };

    println!("{}", "Prediction".bold().cyan());
    println!("{}", "=".repeat(40));
    for (field, value) in render::results::result_rows(resp) {
        println!("  {:<17} {}", format!("{field}:").bold(), value);
    }

    let Some(matrix) = resp.confusion_matrix_full.as_deref() else {
        return;
    };
    if matrix.is_empty() {
        return;
    }

    let labels = resp.confusion_matrix_labels.as_deref().unwrap_or_default();
    let headers = render::confusion_headers(matrix.len(), labels);
    let width = headers
        .iter()
        .map(String::len)
        .chain(matrix.iter().flatten().map(|v| display_value(v).len()))
        .max()
        .unwrap_or(1)
        .max(3);

    println!();
    println!(
        "{}",
        "Confusion Matrix (rows = actual, cols = predicted)"
            .bold()
            .cyan()
    );
    let mut header_line = format!("  {:<width$}", "");
    for header in &headers {
        header_line.push_str(&format!(" {header:>width$}"));
    }
    println!("{}", header_line.bold());
    for (header, row) in headers.iter().zip(matrix) {
        let mut line = format!("  {}", format!("{header:<width$}").bold());
        for cell in row {
            line.push_str(&format!(" {:>width$}", display_value(cell)));
        }
        println!("{line}");
    }
}

fn print_prediction_json(outcome: &PredictOutcome) -> Result<()> {
    let value = match outcome {
        PredictOutcome::Rendered(resp) | PredictOutcome::Rejected(resp) => {
            serde_json::to_value(resp)?
        }
        PredictOutcome::Failed(message) => serde_json::json!({
            "success": false,
            "error": message,
        }),
    };
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

// ---------------------------------------------------------------------------
// nutrilens web
// ---------------------------------------------------------------------------

/// Start the dashboard.
pub fn run_web(addr: Option<&str>, no_open: bool) -> Result<()> {
    let cfg = config::load();
    let addr = addr.unwrap_or(&cfg.web.addr).to_string();
    let open = cfg.web.open_browser && !no_open;
    web::serve(&addr, open, Dashboard::from_config(&cfg))
}

// ---------------------------------------------------------------------------
// nutrilens health
// ---------------------------------------------------------------------------

/// Check config files, catalog reachability and the event log.
pub fn run_health() -> Result<()> {
    println!("{}", "nutrilens Health Check".bold().cyan());
    println!("{}", "=".repeat(40));

    let global_exists = config::global_config_file()
        .map(|p| p.exists())
        .unwrap_or(false);
    let project_exists = config::project_config_file()
        .map(|p| p.exists())
        .unwrap_or(false);
    let cfg = config::load();

    print_health_item(
        "Global config",
        global_exists,
        if global_exists {
            "~/.nutrilens/config.toml found"
        } else {
            "not found (run `nutrilens config init` to create)"
        },
    );
    print_health_item(
        "Project config",
        project_exists,
        if project_exists {
            ".nutrilens.toml found"
        } else {
            "none (optional)"
        },
    );

    let source = catalog::source_from_config(&cfg);
    match source.fetch() {
        Ok(catalog) => print_health_item(
            "Class catalog",
            true,
            &format!("{} classes from {}", catalog.len(), source.describe()),
        ),
        Err(e) => print_health_item(
            "Class catalog",
            false,
            &format!("{} ({e:#})", source.describe()),
        ),
    }

    let backend = HttpPredictor::from_config(&cfg);
    print_health_item("Predict endpoint", true, &backend.describe());
    print_health_item(
        "Model types",
        !cfg.predict.model_types.is_empty(),
        &cfg.predict.model_types.join(", "),
    );

    let log = EventLog::from_config(&cfg.logging);
    match log.path() {
        Some(path) if path.exists() => print_health_item(
            "Event log",
            true,
            &format!("{} entries", log.read_all().len()),
        ),
        Some(_) => print_health_item("Event log", true, "no log file yet"),
        None => print_health_item("Event log", false, "disabled"),
    }

    Ok(())
}

fn print_health_item(name: &str, ok: bool, detail: &str) {
    let status = if ok {
        "✓".green().bold()
    } else {
        "✗".red().bold()
    };
    println!("  {} {:<20} {}", status, name, detail.dimmed());
}

// ---------------------------------------------------------------------------
// nutrilens config show | init | set | reset
// ---------------------------------------------------------------------------

/// Show the effective (merged) configuration as TOML.
pub fn run_config_show() -> Result<()> {
    let toml_str = config::show_effective_config()?;
    println!("{}", "Effective nutrilens Configuration".bold().cyan());
    println!("{}", "=".repeat(50));
    println!();
    println!("{toml_str}");

    let global_exists = config::global_config_file()
        .map(|p| p.exists())
        .unwrap_or(false);
    let project_exists = config::project_config_file()
        .map(|p| p.exists())
        .unwrap_or(false);
    println!("{}", "Sources (highest priority last):".dimmed());
    println!("  {} built-in defaults", "·".dimmed());
    print_source("~/.nutrilens/config.toml", global_exists);
    print_source(".nutrilens.toml", project_exists);
    println!(
        "  {} {}",
        "·".dimmed(),
        "NUTRILENS_* environment variables".dimmed()
    );

    Ok(())
}

fn print_source(name: &str, exists: bool) {
    if exists {
        println!("  {} {}", "✓".green(), name.dimmed());
    } else {
        println!("  {} {}", "·".dimmed(), format!("{name} (not found)").dimmed());
    }
}

/// Initialize a default config file at `~/.nutrilens/config.toml`.
pub fn run_config_init(force: bool) -> Result<()> {
    let path = config::init_config(force)?;
    println!(
        "{} Config written to {}",
        "✓".green().bold(),
        path.display()
    );
    Ok(())
}

/// Set a single configuration value in the global config file.
pub fn run_config_set(key: &str, value: &str) -> Result<()> {
    config::set_config_value(key, value)?;
    println!("{} Set {} = {}", "✓".green().bold(), key.bold(), value);
    Ok(())
}

/// Reset configuration to defaults.
pub fn run_config_reset() -> Result<()> {
    let path = config::reset_config()?;
    println!(
        "{} Config reset to defaults at {}",
        "✓".green().bold(),
        path.display()
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
