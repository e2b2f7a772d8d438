/// Prediction client for the classification backend.
///
/// Packages an uploaded image, the model-type tag of the clicked control and
/// the selected class into a `multipart/form-data` body and posts it to
/// `{backend}/predict` using the synchronous `ureq` client.
///
/// Exactly one request is sent per call. There are no retries: HTTP-level
/// failures (non-2xx), transport failures and non-JSON bodies all surface
/// as errors for the caller to render.
pub mod multipart;
pub mod response;

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::config::NutrilensConfig;

pub use multipart::MultipartForm;
pub use response::{PredictionResponse, is_truthy};

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// An image file attached by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl Upload {
    pub fn new(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            bytes,
        }
    }

    /// Read an upload from disk, keeping only the file name.
    pub fn from_path(path: &Path) -> Result<Self> {
        let bytes =
            fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        Ok(Self::new(filename, bytes))
    }

    /// MIME type guessed from the file extension.
    pub fn content_type(&self) -> String {
        mime_guess::from_path(&self.filename)
            .first_or_octet_stream()
            .to_string()
    }
}

/// Everything one prediction call sends.
#[derive(Debug, Clone, Copy)]
pub struct PredictionRequest<'a> {
    pub upload: &'a Upload,
    pub model_type: &'a str,
    pub selected_class: &'a str,
}

impl PredictionRequest<'_> {
    /// Encode as a multipart form: `file`, `model_type`, `selected_class`.
    pub fn to_form(&self) -> MultipartForm {
        MultipartForm::new()
            .file(
                "file",
                &self.upload.filename,
                &self.upload.content_type(),
                &self.upload.bytes,
            )
            .text("model_type", self.model_type)
            .text("selected_class", self.selected_class)
    }
}

// ---------------------------------------------------------------------------
// Backends
// ---------------------------------------------------------------------------

/// Something that can answer prediction requests.
pub trait PredictBackend {
    /// Send one request and decode the response body.
    fn predict(&self, request: &PredictionRequest<'_>) -> Result<PredictionResponse>;

    /// Human-readable endpoint, for diagnostics.
    fn describe(&self) -> String;
}

/// The backend's `POST /predict` endpoint over HTTP.
#[derive(Debug, Clone)]
pub struct HttpPredictor {
    url: String,
    timeout: Option<Duration>,
}

impl HttpPredictor {
    pub fn new(url: impl Into<String>, timeout: Option<Duration>) -> Self {
        Self {
            url: url.into(),
            timeout,
        }
    }

    /// Build from the resolved config: `{backend.url}/predict`.
    pub fn from_config(config: &NutrilensConfig) -> Self {
        let base = config.backend.url.trim_end_matches('/');
        Self::new(format!("{base}/predict"), config.backend.timeout())
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl PredictBackend for HttpPredictor {
    fn predict(&self, request: &PredictionRequest<'_>) -> Result<PredictionResponse> {
        let (content_type, body) = request.to_form().finish();

        let mut call = ureq::post(&self.url).set("Content-Type", &content_type);
        if let Some(timeout) = self.timeout {
            call = call.timeout(timeout);
        }

        let resp = call
            .send_bytes(&body)
            .with_context(|| format!("prediction request to {} failed", self.url))?;

        resp.into_json()
            .context("prediction response is not a JSON object")
    }

    fn describe(&self) -> String {
        self.url.clone()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
