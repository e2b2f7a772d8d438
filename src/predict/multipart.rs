//! `multipart/form-data` request bodies.
//!
//! `ureq` sends raw bytes only, so the prediction form is encoded here: one
//! part per field, separated by a boundary that is unique per form.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;

static FORM_COUNTER: AtomicU64 = AtomicU64::new(0);

/// An in-progress multipart body.
#[derive(Debug, Clone)]
pub struct MultipartForm {
    boundary: String,
    body: Vec<u8>,
}

impl Default for MultipartForm {
    fn default() -> Self {
        Self::new()
    }
}

impl MultipartForm {
    /// Start a form with a fresh boundary.
    pub fn new() -> Self {
        let nanos = Utc::now().timestamp_nanos_opt().unwrap_or_default();
        let seq = FORM_COUNTER.fetch_add(1, Ordering::Relaxed);
        Self::with_boundary(format!("----nutrilens{nanos:x}{seq:x}"))
    }

    pub fn with_boundary(boundary: impl Into<String>) -> Self {
        Self {
            boundary: boundary.into(),
            body: Vec::new(),
        }
    }

    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// Append a plain text field.
    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.open_part();
        self.push(&format!(
            "Content-Disposition: form-data; name=\"{}\"\r\n\r\n",
            quote(name)
        ));
        self.push(value);
        self.push("\r\n");
        self
    }

    /// Append a file field.
    pub fn file(mut self, name: &str, filename: &str, content_type: &str, bytes: &[u8]) -> Self {
        self.open_part();
        self.push(&format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
            quote(name),
            quote(filename)
        ));
        self.push(&format!("Content-Type: {content_type}\r\n\r\n"));
        self.body.extend_from_slice(bytes);
        self.push("\r\n");
        self
    }

    /// Close the form. Returns the `Content-Type` header value and the body.
    pub fn finish(mut self) -> (String, Vec<u8>) {
        let closing = format!("--{}--\r\n", self.boundary);
        self.push(&closing);
        (
            format!("multipart/form-data; boundary={}", self.boundary),
            self.body,
        )
    }

    fn open_part(&mut self) {
        let delimiter = format!("--{}\r\n", self.boundary);
        self.push(&delimiter);
    }

    fn push(&mut self, text: &str) {
        self.body.extend_from_slice(text.as_bytes());
    }
}

/// Escape a value for use inside a quoted header parameter.
fn quote(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace(['\r', '\n'], " ")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
