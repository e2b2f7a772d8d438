//! The classification page: UI state plus the two user flows.
//!
//! A [`Page`] owns everything a browser page would keep in globals and
//! DOM nodes: the selected class, the theme flag, the details box, the
//! prediction output box and the predict controls. Both flows read the
//! selected class from here.
//!
//! - **Class selection** ([`Page::select_class`]) fetches the catalog,
//!   resolves the class and paints the nutrition summary.
//! - **Prediction** ([`Page::predict`]) checks preconditions, posts the
//!   upload and paints the results.
//!
//! Neither flow ever returns an I/O error: failures are painted into the
//! page. Precondition failures are returned (and recorded as alerts) so the
//! caller can block on them.
//!
//! Both flows are split into a `begin_*` step that updates the page, the
//! network call on a ticket, and a `finish_*` step that paints the result.
//! Callers sharing a page between threads only need to guard the begin and
//! finish steps.
//!
//! Class lookups are fenced with request tokens. Every selection issues a
//! new token, and a lookup result is applied only while its token is still
//! the latest one, so a slow response can never overwrite a newer selection.
//! A prediction holds its control busy (label `Predicting...`, disabled)
//! from begin to finish.

use std::fmt;
use std::time::Instant;

use crate::catalog::{CatalogSource, NutritionRecord};
use crate::config::{NutrilensConfig, Theme};
use crate::events::{EventEntry, EventKind, EventLog};
use crate::predict::{PredictBackend, PredictionRequest, PredictionResponse, Upload};
use crate::render::{self, display_value};

/// Details box text before any class is chosen.
pub const SELECT_PROMPT: &str = "Select a class to view details...";
/// Details box text when no key variant resolves.
pub const NO_NUTRITION_INFO: &str = "No nutrition info available for this class.";
/// Details box text when the catalog cannot be fetched or decoded.
pub const CATALOG_LOAD_FAILED: &str = "Failed to load class.json";
/// Control label while its prediction is in flight.
pub const BUSY_LABEL: &str = "Predicting...";

// ---------------------------------------------------------------------------
// Preconditions
// ---------------------------------------------------------------------------

/// A user-facing reason a prediction was not attempted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Precondition {
    MissingFile,
    MissingClass,
    UnknownModel(String),
    /// The control for this model type already has a request in flight.
    Busy(String),
}

impl fmt::Display for Precondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingFile => write!(f, "Please upload an image."),
            Self::MissingClass => write!(f, "Please select a class."),
            Self::UnknownModel(model) => write!(f, "Unknown model type: {model}"),
            Self::Busy(model) => write!(f, "A prediction with {model} is already running."),
        }
    }
}

impl std::error::Error for Precondition {}

// ---------------------------------------------------------------------------
// Controls
// ---------------------------------------------------------------------------

/// A predict button tagged with the model type it requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PredictControl {
    pub model_type: String,
    pub label: String,
    pub disabled: bool,
}

impl PredictControl {
    /// A control labelled after its model type (`vgg_model` → `Predict with vgg model`).
    pub fn for_model(model_type: &str) -> Self {
        let name = model_type.replace('_', " ");
        Self {
            model_type: model_type.to_string(),
            label: format!("Predict with {name}"),
            disabled: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// Result of resolving the selected class.
#[derive(Debug, Clone, PartialEq)]
pub enum LookupOutcome {
    /// No class is selected.
    Prompt,
    Found(NutritionRecord),
    NotFound,
    /// The catalog could not be fetched or decoded.
    LoadFailed(String),
}

impl LookupOutcome {
    /// Markup for the details box.
    pub fn to_html(&self) -> String {
        match self {
            Self::Prompt => SELECT_PROMPT.to_string(),
            Self::Found(record) => render::render_nutrition(record),
            Self::NotFound => NO_NUTRITION_INFO.to_string(),
            Self::LoadFailed(_) => CATALOG_LOAD_FAILED.to_string(),
        }
    }
}

/// A lookup in flight: the token it was issued and the class it resolves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupTicket {
    token: u64,
    class: Option<String>,
}

impl LookupTicket {
    pub fn token(&self) -> u64 {
        self.token
    }

    pub fn class(&self) -> Option<&str> {
        self.class.as_deref()
    }

    /// Fetch the catalog and resolve this ticket's class.
    ///
    /// Needs no access to the page, so callers can run it without holding
    /// whatever guards the page.
    pub fn run(&self, source: &dyn CatalogSource) -> LookupOutcome {
        let Some(class) = self.class() else {
            return LookupOutcome::Prompt;
        };

        match source.fetch() {
            Ok(catalog) => match catalog.resolve(class) {
                Some(record) => LookupOutcome::Found(record),
                None => LookupOutcome::NotFound,
            },
            Err(e) => {
                let detail = format!("{e:#}");
                eprintln!("failed to load class catalog from {}: {detail}", source.describe());
                LookupOutcome::LoadFailed(detail)
            }
        }
    }
}

/// A prediction in flight. Its control stays busy until the ticket is
/// handed back to [`Page::finish_predict`].
#[derive(Debug)]
pub struct PredictTicket<'u> {
    index: usize,
    upload: &'u Upload,
    model_type: String,
    class: String,
    idle_label: String,
    started: Instant,
}

impl PredictTicket<'_> {
    /// The request to send for this ticket.
    pub fn request(&self) -> PredictionRequest<'_> {
        PredictionRequest {
            upload: self.upload,
            model_type: &self.model_type,
            selected_class: &self.class,
        }
    }
}

/// Result of a prediction request that was actually sent.
#[derive(Debug, Clone, PartialEq)]
pub enum PredictOutcome {
    /// The backend answered with `success: true`.
    Rendered(PredictionResponse),
    /// The backend answered with `success: false`.
    Rejected(PredictionResponse),
    /// Transport, HTTP status or decode failure.
    Failed(String),
}

impl PredictOutcome {
    /// Markup for the output box.
    pub fn to_html(&self) -> String {
        match self {
            Self::Rendered(resp) => render::render_results(resp),
            Self::Rejected(resp) => render::render_error(&rejection_message(resp)),
            Self::Failed(message) => render::render_error(message),
        }
    }

    /// Error text of a request that did not render; `None` on success.
    pub fn error_message(&self) -> Option<String> {
        match self {
            Self::Rendered(_) => None,
            Self::Rejected(resp) => Some(rejection_message(resp)),
            Self::Failed(message) => Some(message.clone()),
        }
    }
}

fn rejection_message(resp: &PredictionResponse) -> String {
    resp.error
        .as_ref()
        .map(display_value)
        .unwrap_or_else(|| "unknown error".to_string())
}

// ---------------------------------------------------------------------------
// Page
// ---------------------------------------------------------------------------

/// UI state of one classification page.
#[derive(Debug, Clone)]
pub struct Page {
    selected_class: Option<String>,
    theme: Theme,
    details: String,
    output: String,
    controls: Vec<PredictControl>,
    alerts: Vec<String>,
    latest_token: u64,
    events: EventLog,
}

impl Page {
    /// A fresh page with one control per model type.
    pub fn new(model_types: &[String], theme: Theme) -> Self {
        Self {
            selected_class: None,
            theme,
            details: SELECT_PROMPT.to_string(),
            output: String::new(),
            controls: model_types
                .iter()
                .map(|model| PredictControl::for_model(model))
                .collect(),
            alerts: Vec::new(),
            latest_token: 0,
            events: EventLog::disabled(),
        }
    }

    /// A page set up from the resolved config, event log included.
    pub fn from_config(config: &NutrilensConfig) -> Self {
        Self::new(&config.predict.model_types, config.ui.theme)
            .with_event_log(EventLog::from_config(&config.logging))
    }

    pub fn with_event_log(mut self, events: EventLog) -> Self {
        self.events = events;
        self
    }

    pub fn selected_class(&self) -> Option<&str> {
        self.selected_class.as_deref()
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    /// Current details box markup.
    pub fn details(&self) -> &str {
        &self.details
    }

    /// Current prediction output markup.
    pub fn output(&self) -> &str {
        &self.output
    }

    pub fn controls(&self) -> &[PredictControl] {
        &self.controls
    }

    pub fn control(&self, model_type: &str) -> Option<&PredictControl> {
        self.controls.iter().find(|c| c.model_type == model_type)
    }

    /// Alerts raised so far, oldest first.
    pub fn alerts(&self) -> &[String] {
        &self.alerts
    }

    /// Drain the alert queue.
    pub fn take_alerts(&mut self) -> Vec<String> {
        std::mem::take(&mut self.alerts)
    }

    /// Flip between light and dark. Returns the new theme.
    pub fn toggle_theme(&mut self) -> Theme {
        self.theme = self.theme.toggled();
        self.theme
    }

    // -----------------------------------------------------------------------
    // Class selection
    // -----------------------------------------------------------------------

    /// Select a class and repaint the details box.
    ///
    /// An empty value clears the selection and shows the prompt without
    /// fetching anything.
    pub fn select_class(&mut self, value: &str, source: &dyn CatalogSource) -> LookupOutcome {
        let ticket = self.begin_lookup(value);
        let outcome = ticket.run(source);
        self.finish_lookup(&ticket, &outcome);
        outcome
    }

    /// Record the selected class without looking it up. Empty clears it.
    pub fn set_selection(&mut self, value: &str) {
        self.selected_class = (!value.is_empty()).then(|| value.to_string());
    }

    /// Record the selection and issue a new lookup token.
    pub fn begin_lookup(&mut self, value: &str) -> LookupTicket {
        self.set_selection(value);
        self.latest_token += 1;
        LookupTicket {
            token: self.latest_token,
            class: self.selected_class.clone(),
        }
    }

    /// Paint a lookup result if its ticket is still the latest.
    ///
    /// Catalog failures are logged either way. Returns `false` (and leaves
    /// the details box alone) for stale tickets.
    pub fn finish_lookup(&mut self, ticket: &LookupTicket, outcome: &LookupOutcome) -> bool {
        if let LookupOutcome::LoadFailed(detail) = outcome {
            self.events.record(&EventEntry::now(
                EventKind::CatalogFailure,
                ticket.class().unwrap_or_default(),
                false,
                detail.clone(),
            ));
        }
        if ticket.token != self.latest_token {
            return false;
        }
        self.details = outcome.to_html();
        true
    }

    // -----------------------------------------------------------------------
    // Prediction
    // -----------------------------------------------------------------------

    /// Run a prediction from the control tagged `model_type`: begin, send
    /// exactly one request, finish.
    pub fn predict(
        &mut self,
        model_type: &str,
        upload: Option<&Upload>,
        backend: &dyn PredictBackend,
    ) -> Result<PredictOutcome, Precondition> {
        let ticket = self.begin_predict(model_type, upload)?;
        let result = backend.predict(&ticket.request());
        Ok(self.finish_predict(ticket, result))
    }

    /// Check preconditions and mark the control busy.
    ///
    /// A failed check is recorded as an alert and returned; the control is
    /// left untouched and nothing should be sent.
    pub fn begin_predict<'u>(
        &mut self,
        model_type: &str,
        upload: Option<&'u Upload>,
    ) -> Result<PredictTicket<'u>, Precondition> {
        let (index, upload, class) = match self.check_preconditions(model_type, upload) {
            Ok(ready) => ready,
            Err(precondition) => {
                self.alerts.push(precondition.to_string());
                return Err(precondition);
            }
        };

        let control = &mut self.controls[index];
        let idle_label = std::mem::replace(&mut control.label, BUSY_LABEL.to_string());
        control.disabled = true;

        Ok(PredictTicket {
            index,
            upload,
            model_type: model_type.to_string(),
            class,
            idle_label,
            started: Instant::now(),
        })
    }

    /// Restore the ticket's control, log the attempt and repaint the output
    /// box with the backend's answer.
    pub fn finish_predict(
        &mut self,
        ticket: PredictTicket<'_>,
        result: anyhow::Result<PredictionResponse>,
    ) -> PredictOutcome {
        let latency_ms = ticket.started.elapsed().as_millis() as u64;

        let control = &mut self.controls[ticket.index];
        control.label = ticket.idle_label;
        control.disabled = false;

        let outcome = match result {
            Ok(resp) if resp.success => PredictOutcome::Rendered(resp),
            Ok(resp) => PredictOutcome::Rejected(resp),
            Err(e) => PredictOutcome::Failed(format!("{e:#}")),
        };

        self.events.record(&prediction_event(
            &ticket.class,
            &ticket.model_type,
            &outcome,
            latency_ms,
        ));
        self.output = outcome.to_html();
        outcome
    }

    fn check_preconditions<'u>(
        &self,
        model_type: &str,
        upload: Option<&'u Upload>,
    ) -> Result<(usize, &'u Upload, String), Precondition> {
        let upload = upload.ok_or(Precondition::MissingFile)?;
        let class = self
            .selected_class
            .clone()
            .ok_or(Precondition::MissingClass)?;
        let index = self
            .controls
            .iter()
            .position(|c| c.model_type == model_type)
            .ok_or_else(|| Precondition::UnknownModel(model_type.to_string()))?;
        if self.controls[index].disabled {
            return Err(Precondition::Busy(model_type.to_string()));
        }
        Ok((index, upload, class))
    }
}

fn prediction_event(
    class: &str,
    model_type: &str,
    outcome: &PredictOutcome,
    latency_ms: u64,
) -> EventEntry {
    let (success, detail) = match outcome {
        PredictOutcome::Rendered(resp) => (
            true,
            resp.predicted_label
                .as_ref()
                .map(display_value)
                .unwrap_or_default(),
        ),
        _ => (false, outcome.error_message().unwrap_or_default()),
    };
    EventEntry::now(EventKind::Prediction, class, success, detail)
        .with_model(model_type)
        .with_latency(latency_ms)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
