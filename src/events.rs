use std::fs::{self, OpenOptions, create_dir_all};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::config::{self, schema::LoggingConfig};

// ---------------------------------------------------------------------------
// Event log entry (JSONL)
// ---------------------------------------------------------------------------

/// What happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// The class catalog could not be fetched or decoded.
    CatalogFailure,
    /// A prediction request was sent (successful or not).
    Prediction,
}

/// A single entry in the event log (`~/.nutrilens/events.jsonl`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEntry {
    pub timestamp: String,
    pub kind: EventKind,
    /// Selected class at the time of the event.
    #[serde(default)]
    pub class: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub model_type: Option<String>,
    pub success: bool,
    /// Error text or predicted label.
    #[serde(default)]
    pub detail: String,
    /// Round-trip time of the backend call in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub latency_ms: Option<u64>,
}

impl EventEntry {
    /// Build an entry stamped with the current time.
    pub fn now(kind: EventKind, class: &str, success: bool, detail: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
            kind,
            class: class.to_string(),
            model_type: None,
            success,
            detail: detail.into(),
            latency_ms: None,
        }
    }

    pub fn with_model(mut self, model_type: &str) -> Self {
        self.model_type = Some(model_type.to_string());
        self
    }

    pub fn with_latency(mut self, latency_ms: u64) -> Self {
        self.latency_ms = Some(latency_ms);
        self
    }
}

// ---------------------------------------------------------------------------
// Writer
// ---------------------------------------------------------------------------

/// Appends events to a JSONL file. Disabled logs drop every entry.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    path: Option<PathBuf>,
}

impl EventLog {
    /// A log that records nothing.
    pub fn disabled() -> Self {
        Self { path: None }
    }

    /// A log that appends to `path`.
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    /// Build from the `[logging]` config section.
    pub fn from_config(config: &LoggingConfig) -> Self {
        if !config.enabled {
            return Self::disabled();
        }
        if config.path.trim().is_empty() {
            Self {
                path: default_log_path(),
            }
        } else {
            Self::at(config.path.trim())
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Record an entry. Failures to write are ignored.
    pub fn record(&self, entry: &EventEntry) {
        if let Some(path) = &self.path {
            let _ = append_entry(path, entry);
        }
    }

    /// Read all entries back, skipping malformed lines.
    pub fn read_all(&self) -> Vec<EventEntry> {
        let Some(path) = &self.path else {
            return Vec::new();
        };
        let Ok(file) = fs::File::open(path) else {
            return Vec::new();
        };

        BufReader::new(file)
            .lines()
            .map_while(Result::ok)
            .filter_map(|line| serde_json::from_str::<EventEntry>(&line).ok())
            .collect()
    }
}

fn append_entry(path: &Path, entry: &EventEntry) -> Result<()> {
    if let Some(parent) = path.parent() {
        create_dir_all(parent)?;
    }

    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    let json = serde_json::to_string(entry)?;
    writeln!(file, "{json}")?;

    Ok(())
}

/// Default event log location: `~/.nutrilens/events.jsonl`.
pub fn default_log_path() -> Option<PathBuf> {
    config::home_dir().map(|dir| dir.join("events.jsonl"))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
