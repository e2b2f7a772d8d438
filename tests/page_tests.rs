/// Page flow tests: class selection and prediction against in-memory
/// collaborators.
///
/// The catalog and backend fakes count every call so the tests can assert
/// how many requests each flow issues.
use std::cell::{Cell, RefCell};

use anyhow::{Result, bail};
use nutrilens::catalog::{CatalogSource, ClassCatalog};
use nutrilens::config::Theme;
use nutrilens::page::{
    BUSY_LABEL, CATALOG_LOAD_FAILED, LookupOutcome, NO_NUTRITION_INFO, Page, PredictOutcome,
    Precondition, SELECT_PROMPT,
};
use nutrilens::predict::{PredictBackend, PredictionRequest, PredictionResponse, Upload};

// ---------------------------------------------------------------------------
// Fakes
// ---------------------------------------------------------------------------

const CATALOG_JSON: &str = r#"{
    "Red Apple": {"calories": 52, "protein": 0.3, "fat": 0.2, "carbohydrates": 14, "fiber": 2.4},
    "fried_rice": {"calories": 163, "protein": 3.3},
    "sushi": {"calories": 130}
}"#;

struct FakeCatalog {
    json: Option<&'static str>,
    fetches: Cell<usize>,
}

impl FakeCatalog {
    fn serving(json: &'static str) -> Self {
        Self {
            json: Some(json),
            fetches: Cell::new(0),
        }
    }

    fn unreachable() -> Self {
        Self {
            json: None,
            fetches: Cell::new(0),
        }
    }
}

impl CatalogSource for FakeCatalog {
    fn fetch(&self) -> Result<ClassCatalog> {
        self.fetches.set(self.fetches.get() + 1);
        match self.json {
            Some(json) => ClassCatalog::from_json(json),
            None => bail!("connection refused"),
        }
    }

    fn describe(&self) -> String {
        "fake catalog".to_string()
    }
}

/// What the backend saw for one request.
#[derive(Debug, Clone)]
struct Seen {
    filename: String,
    model_type: String,
    selected_class: String,
}

enum Answer {
    Json(serde_json::Value),
    Transport(&'static str),
}

struct FakeBackend {
    answer: Answer,
    seen: RefCell<Vec<Seen>>,
}

impl FakeBackend {
    fn answering(value: serde_json::Value) -> Self {
        Self {
            answer: Answer::Json(value),
            seen: RefCell::new(Vec::new()),
        }
    }

    fn failing(message: &'static str) -> Self {
        Self {
            answer: Answer::Transport(message),
            seen: RefCell::new(Vec::new()),
        }
    }

    fn requests(&self) -> usize {
        self.seen.borrow().len()
    }
}

impl PredictBackend for FakeBackend {
    fn predict(&self, request: &PredictionRequest<'_>) -> Result<PredictionResponse> {
        self.seen.borrow_mut().push(Seen {
            filename: request.upload.filename.clone(),
            model_type: request.model_type.to_string(),
            selected_class: request.selected_class.to_string(),
        });
        match &self.answer {
            Answer::Json(value) => Ok(serde_json::from_value(value.clone())?),
            Answer::Transport(message) => bail!("{message}"),
        }
    }

    fn describe(&self) -> String {
        "fake backend".to_string()
    }
}

fn page() -> Page {
    Page::new(
        &[
            "custom_model".to_string(),
            "resnet_model".to_string(),
            "vgg_model".to_string(),
        ],
        Theme::Light,
    )
}

fn image() -> Upload {
    Upload::new("dish.jpg", vec![0xff, 0xd8, 0xff])
}

// ---------------------------------------------------------------------------
// Class selection
// ---------------------------------------------------------------------------

#[test]
fn selecting_known_class_renders_nutrition() {
    let catalog = FakeCatalog::serving(CATALOG_JSON);
    let mut page = page();

    let outcome = page.select_class("Red Apple", &catalog);

    assert!(matches!(outcome, LookupOutcome::Found(_)));
    assert_eq!(page.selected_class(), Some("Red Apple"));
    assert!(page.details().contains("<strong>Nutrition Details</strong>"));
    assert!(page.details().contains("<b>Calories:</b> 52"));
    assert!(page.details().contains("<b>Fiber:</b> 2.4"));
    assert_eq!(catalog.fetches.get(), 1);
}

#[test]
fn selection_resolves_through_normalized_key() {
    let catalog = FakeCatalog::serving(CATALOG_JSON);
    let mut page = page();

    page.select_class("Fried Rice", &catalog);

    assert!(page.details().contains("<b>Calories:</b> 163"));
    assert!(page.details().contains("<b>Fat:</b> NA"));
}

#[test]
fn selection_resolves_through_lowercase_key() {
    let catalog = FakeCatalog::serving(CATALOG_JSON);
    let mut page = page();

    page.select_class("SUSHI", &catalog);

    assert!(page.details().contains("<b>Calories:</b> 130"));
}

#[test]
fn unknown_class_shows_exact_message_after_one_fetch() {
    let catalog = FakeCatalog::serving(CATALOG_JSON);
    let mut page = page();

    let outcome = page.select_class("Dragon Fruit", &catalog);

    assert_eq!(outcome, LookupOutcome::NotFound);
    assert_eq!(page.details(), "No nutrition info available for this class.");
    assert_eq!(page.details(), NO_NUTRITION_INFO);
    assert_eq!(catalog.fetches.get(), 1);
}

#[test]
fn empty_selection_shows_prompt_without_fetching() {
    let catalog = FakeCatalog::serving(CATALOG_JSON);
    let mut page = page();
    page.select_class("sushi", &catalog);

    let outcome = page.select_class("", &catalog);

    assert_eq!(outcome, LookupOutcome::Prompt);
    assert_eq!(page.details(), SELECT_PROMPT);
    assert_eq!(page.selected_class(), None);
    assert_eq!(catalog.fetches.get(), 1);
}

#[test]
fn catalog_failure_is_painted_not_propagated() {
    let catalog = FakeCatalog::unreachable();
    let mut page = page();

    let outcome = page.select_class("sushi", &catalog);

    assert!(matches!(outcome, LookupOutcome::LoadFailed(ref detail) if detail.contains("connection refused")));
    assert_eq!(page.details(), CATALOG_LOAD_FAILED);
    // The selection still counts for the prediction flow.
    assert_eq!(page.selected_class(), Some("sushi"));
}

#[test]
fn invalid_catalog_json_is_a_load_failure() {
    let catalog = FakeCatalog::serving("{not json");
    let mut page = page();

    page.select_class("sushi", &catalog);

    assert_eq!(page.details(), CATALOG_LOAD_FAILED);
}

#[test]
fn malformed_entry_does_not_hide_other_classes() {
    let catalog = FakeCatalog::serving(
        r#"{"_version": "2", "pizza": {"calories": 266}, "Sushi": "soon", "sushi": {"calories": 130}}"#,
    );
    let mut page = page();

    page.select_class("Pizza", &catalog);
    assert!(page.details().contains("<b>Calories:</b> 266"));

    page.select_class("Sushi", &catalog);
    assert!(page.details().contains("<b>Calories:</b> 130"));
    assert_ne!(page.details(), CATALOG_LOAD_FAILED);
}

#[test]
fn slow_lookup_cannot_overwrite_newer_selection() {
    let catalog = FakeCatalog::serving(CATALOG_JSON);
    let mut page = page();

    // Two selections in flight; the older one resolves last.
    let older = page.begin_lookup("Red Apple");
    let newer = page.begin_lookup("Dragon Fruit");

    let newer_outcome = newer.run(&catalog);
    assert!(page.finish_lookup(&newer, &newer_outcome));

    let older_outcome = older.run(&catalog);
    assert!(matches!(older_outcome, LookupOutcome::Found(_)));
    assert!(!page.finish_lookup(&older, &older_outcome));

    assert_eq!(page.details(), NO_NUTRITION_INFO);
    assert_eq!(page.selected_class(), Some("Dragon Fruit"));
}

// ---------------------------------------------------------------------------
// Prediction preconditions
// ---------------------------------------------------------------------------

#[test]
fn predict_without_file_alerts_and_sends_nothing() {
    let catalog = FakeCatalog::serving(CATALOG_JSON);
    let backend = FakeBackend::answering(serde_json::json!({"success": true}));
    let mut page = page();
    page.select_class("sushi", &catalog);

    let result = page.predict("custom_model", None, &backend);

    assert_eq!(result, Err(Precondition::MissingFile));
    assert_eq!(page.alerts(), ["Please upload an image."]);
    assert_eq!(backend.requests(), 0);
    assert_eq!(page.output(), "");
}

#[test]
fn predict_without_class_alerts_and_sends_nothing() {
    let backend = FakeBackend::answering(serde_json::json!({"success": true}));
    let mut page = page();

    let result = page.predict("custom_model", Some(&image()), &backend);

    assert_eq!(result, Err(Precondition::MissingClass));
    assert_eq!(page.take_alerts(), vec!["Please select a class.".to_string()]);
    assert!(page.alerts().is_empty());
    assert_eq!(backend.requests(), 0);
}

#[test]
fn file_check_comes_before_class_check() {
    let backend = FakeBackend::answering(serde_json::json!({"success": true}));
    let mut page = page();

    assert_eq!(
        page.predict("custom_model", None, &backend),
        Err(Precondition::MissingFile)
    );
}

#[test]
fn unknown_model_type_is_rejected() {
    let backend = FakeBackend::answering(serde_json::json!({"success": true}));
    let mut page = page();
    page.set_selection("sushi");

    let result = page.predict("alexnet", Some(&image()), &backend);

    assert_eq!(result, Err(Precondition::UnknownModel("alexnet".to_string())));
    assert_eq!(backend.requests(), 0);
}

// ---------------------------------------------------------------------------
// Prediction results
// ---------------------------------------------------------------------------

#[test]
fn successful_prediction_renders_table_and_matrix() {
    let backend = FakeBackend::answering(serde_json::json!({
        "success": true,
        "predicted_label": "sushi",
        "selected_class": "sushi",
        "model_used": "resnet50.h5",
        "confidence": 0.8765,
        "accuracy": 0.9,
        "confusion_matrix_full": [[160, 8, 2], [13, 131, 26], [7, 5, 49]],
        "confusion_matrix_labels": ["pizza", "sushi"]
    }));
    let mut page = page();
    page.set_selection("sushi");

    let outcome = page
        .predict("resnet_model", Some(&image()), &backend)
        .unwrap();

    assert!(matches!(outcome, PredictOutcome::Rendered(_)));
    assert_eq!(backend.requests(), 1);
    let seen = backend.seen.borrow()[0].clone();
    assert_eq!(seen.filename, "dish.jpg");
    assert_eq!(seen.model_type, "resnet_model");
    assert_eq!(seen.selected_class, "sushi");

    let html = page.output();
    assert!(html.contains("<tr><td>Confidence</td><td>87.65%</td></tr>"));
    assert!(html.contains("<tr><td>Precision</td><td>NA</td></tr>"));
    assert!(html.contains("<th></th><th>C1</th><th>C2</th><th>C3</th>"));
    assert!(html.contains("<tr><th>C2</th><td>13</td><td>131</td><td>26</td></tr>"));
}

#[test]
fn backend_failure_renders_error_without_table() {
    let backend = FakeBackend::answering(serde_json::json!({
        "success": false,
        "error": "bad image"
    }));
    let mut page = page();
    page.set_selection("sushi");

    let outcome = page.predict("vgg_model", Some(&image()), &backend).unwrap();

    assert!(matches!(outcome, PredictOutcome::Rejected(_)));
    assert!(page.output().contains("bad image"));
    assert!(page.output().contains("Error: bad image"));
    assert!(!page.output().contains("pred-table"));
}

#[test]
fn transport_failure_renders_error_text() {
    let backend = FakeBackend::failing("connection reset by peer");
    let mut page = page();
    page.set_selection("sushi");

    let outcome = page.predict("vgg_model", Some(&image()), &backend).unwrap();

    assert!(matches!(outcome, PredictOutcome::Failed(_)));
    assert!(page.output().contains("Error: connection reset by peer"));
    assert_eq!(backend.requests(), 1);
}

#[test]
fn controls_are_restored_after_every_outcome() {
    let backends = [
        FakeBackend::answering(serde_json::json!({"success": true})),
        FakeBackend::answering(serde_json::json!({"success": false, "error": "x"})),
        FakeBackend::failing("timed out"),
    ];
    let mut page = page();
    page.set_selection("sushi");
    let before = page.control("custom_model").cloned().unwrap();

    for backend in &backends {
        page.predict("custom_model", Some(&image()), backend).unwrap();
        let after = page.control("custom_model").unwrap();
        assert_eq!(after, &before);
        assert_ne!(after.label, BUSY_LABEL);
        assert!(!after.disabled);
    }
}

#[test]
fn control_is_busy_while_request_is_out() {
    let backend = FakeBackend::answering(serde_json::json!({"success": true}));
    let mut page = page();
    page.set_selection("sushi");
    let upload = image();

    let ticket = page.begin_predict("resnet_model", Some(&upload)).unwrap();
    assert_eq!(page.control("resnet_model").unwrap().label, BUSY_LABEL);
    assert!(page.control("resnet_model").unwrap().disabled);
    assert_eq!(backend.requests(), 0);

    let result = backend.predict(&ticket.request());
    let outcome = page.finish_predict(ticket, result);

    assert!(matches!(outcome, PredictOutcome::Rendered(_)));
    assert_eq!(backend.requests(), 1);
    assert_eq!(
        page.control("resnet_model").unwrap().label,
        "Predict with resnet model"
    );
    assert!(!page.control("resnet_model").unwrap().disabled);
}

#[test]
fn each_prediction_replaces_previous_output() {
    let mut page = page();
    page.set_selection("sushi");

    page.predict(
        "custom_model",
        Some(&image()),
        &FakeBackend::answering(serde_json::json!({"success": true, "predicted_label": "sushi"})),
    )
    .unwrap();
    assert!(page.output().contains("pred-table"));

    page.predict(
        "custom_model",
        Some(&image()),
        &FakeBackend::failing("offline"),
    )
    .unwrap();
    assert!(!page.output().contains("pred-table"));
    assert!(page.output().contains("Error: offline"));
}

#[test]
fn flows_share_only_the_selected_class() {
    let catalog = FakeCatalog::serving(CATALOG_JSON);
    let backend = FakeBackend::answering(serde_json::json!({"success": true}));
    let mut page = page();

    page.select_class("Red Apple", &catalog);
    let details = page.details().to_string();
    page.predict("vgg_model", Some(&image()), &backend).unwrap();

    assert_eq!(page.details(), details);
    assert_eq!(backend.seen.borrow()[0].selected_class, "Red Apple");
    assert_eq!(catalog.fetches.get(), 1);
}
