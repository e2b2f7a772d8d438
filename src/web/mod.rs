//! Embedded web dashboard for nutrilens.
//!
//! Provides a lightweight HTTP server (sync, via `tiny_http`) that serves:
//! - The classification page (class dropdown, nutrition details, upload
//!   form, one predict button per model type, results, theme toggle)
//! - Fragment endpoints the page script calls to run each flow
//!
//! The server owns a single [`Page`], so the selected class and theme live
//! for as long as the process. Each request runs on its own thread; the page
//! is locked only while a flow begins or finishes, never across catalog or
//! backend I/O, so a stalled prediction does not hold up class selection.
//! Launched via `nutrilens web` (default: `http://127.0.0.1:9747`).

mod api;
mod frontend;

use std::io::{self, Cursor, Read};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;

use anyhow::{Context, Result};
use tiny_http::{Header, Method, Request, Response, Server, StatusCode};

use crate::catalog::{self, CatalogSource};
use crate::config::NutrilensConfig;
use crate::page::Page;
use crate::predict::{HttpPredictor, PredictBackend};

pub use frontend::render_page;

// ---------------------------------------------------------------------------
// Dashboard state
// ---------------------------------------------------------------------------

/// The page plus the collaborators its flows talk to.
pub struct Dashboard {
    page: Mutex<Page>,
    catalog: Box<dyn CatalogSource + Send + Sync>,
    backend: Box<dyn PredictBackend + Send + Sync>,
}

impl Dashboard {
    pub fn new(
        page: Page,
        catalog: Box<dyn CatalogSource + Send + Sync>,
        backend: Box<dyn PredictBackend + Send + Sync>,
    ) -> Self {
        Self {
            page: Mutex::new(page),
            catalog,
            backend,
        }
    }

    /// Wire the page to the catalog and backend named in the config.
    pub fn from_config(config: &NutrilensConfig) -> Self {
        Self::new(
            Page::from_config(config),
            catalog::source_from_config(config),
            Box::new(HttpPredictor::from_config(config)),
        )
    }

    /// Lock the page. Hold the guard only for quick state changes.
    pub fn page(&self) -> MutexGuard<'_, Page> {
        self.page.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Dispatch an incoming request to the appropriate handler.
    pub fn handle(&self, method: &Method, url: &str, body: &[u8]) -> Result<Reply> {
        // Strip query string for path matching
        let path = url.split('?').next().unwrap_or(url);

        match (method, path) {
            (&Method::Get, "/") | (&Method::Get, "/index.html") => Ok(api::get_index(self)),
            (&Method::Post, "/api/select") => Ok(api::post_select(self, url)),
            (&Method::Post, "/api/predict") => api::post_predict(self, url, body),
            (&Method::Post, "/api/theme") => api::post_theme(self),
            (&Method::Get, "/api/health") => api::get_health(self),
            _ => Ok(Reply::not_found()),
        }
    }
}

// ---------------------------------------------------------------------------
// Replies
// ---------------------------------------------------------------------------

/// Body media type of a [`Reply`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    Html,
    Json,
}

/// A handler's answer, converted into a `tiny_http` response at the edge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub status: u16,
    pub content_type: ContentType,
    pub body: Vec<u8>,
}

impl Reply {
    pub fn html(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            content_type: ContentType::Html,
            body: body.into().into_bytes(),
        }
    }

    pub fn json<T: serde::Serialize>(status: u16, data: &T) -> Result<Self> {
        let body = serde_json::to_vec(data).context("failed to serialize JSON response")?;
        Ok(Self {
            status,
            content_type: ContentType::Json,
            body,
        })
    }

    /// A JSON `{"error": message}` reply.
    pub fn error(status: u16, message: &str) -> Self {
        Self {
            status,
            content_type: ContentType::Json,
            body: serde_json::json!({ "error": message }).to_string().into_bytes(),
        }
    }

    fn not_found() -> Self {
        Self::error(404, "not found")
    }

    /// Body as text, for logging and tests.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    fn into_response(self) -> Response<Cursor<Vec<u8>>> {
        let header = match self.content_type {
            ContentType::Html => content_type_html(),
            ContentType::Json => content_type_json(),
        };
        Response::from_data(self.body)
            .with_header(header)
            .with_status_code(StatusCode(self.status))
    }
}

// ---------------------------------------------------------------------------
// Server entry point
// ---------------------------------------------------------------------------

/// Start the dashboard on the given address.
///
/// Blocks the current thread.
pub fn serve(addr: &str, open: bool, dashboard: Dashboard) -> Result<()> {
    let server = Server::http(addr)
        .map_err(|e| anyhow::anyhow!("failed to start HTTP server on {addr}: {e}"))?;

    println!("nutrilens dashboard running at http://{addr}");
    println!("Press Ctrl+C to stop.\n");

    if open {
        let _ = open_browser(&format!("http://{addr}"));
    }

    run(&server, Arc::new(dashboard));
    Ok(())
}

/// Answer requests from `server` until it shuts down, one thread per
/// request.
pub fn run(server: &Server, dashboard: Arc<Dashboard>) {
    for request in server.incoming_requests() {
        let dashboard = Arc::clone(&dashboard);
        thread::spawn(move || respond(&dashboard, request));
    }
}

fn respond(dashboard: &Dashboard, mut request: Request) {
    let method = request.method().clone();
    let url = request.url().to_string();

    let reply = dispatch(dashboard, &method, &url, request.as_reader());
    let status = reply.status;
    let _ = request.respond(reply.into_response());

    // Brief access log
    println!(
        "{} {} {} {}",
        method,
        url,
        status,
        chrono::Local::now().format("%H:%M:%S")
    );
}

/// Read the request body and route it. Body read failures answer 400,
/// handler errors 500.
fn dispatch(dashboard: &Dashboard, method: &Method, url: &str, reader: &mut dyn Read) -> Reply {
    let body = match read_body(method, reader) {
        Ok(body) => body,
        Err(e) => return Reply::error(400, &format!("failed to read request body: {e}")),
    };
    dashboard
        .handle(method, url, &body)
        .unwrap_or_else(|e| Reply::error(500, &format!("{e:#}")))
}

fn read_body(method: &Method, reader: &mut dyn Read) -> io::Result<Vec<u8>> {
    let mut body = Vec::new();
    if matches!(method, Method::Put | Method::Post | Method::Patch) {
        reader.read_to_end(&mut body)?;
    }
    Ok(body)
}

// ---------------------------------------------------------------------------
// Response helpers
// ---------------------------------------------------------------------------

/// JSON content type header.
fn content_type_json() -> Header {
    Header::from_bytes("Content-Type", "application/json; charset=utf-8").unwrap()
}

/// HTML content type header.
fn content_type_html() -> Header {
    Header::from_bytes("Content-Type", "text/html; charset=utf-8").unwrap()
}

/// Attempt to open a URL in the system default browser.
fn open_browser(url: &str) -> Result<()> {
    #[cfg(target_os = "windows")]
    {
        std::process::Command::new("cmd")
            .args(["/C", "start", url])
            .spawn()
            .context("failed to open browser")?;
    }

    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("open")
            .arg(url)
            .spawn()
            .context("failed to open browser")?;
    }

    #[cfg(target_os = "linux")]
    {
        std::process::Command::new("xdg-open")
            .arg(url)
            .spawn()
            .context("failed to open browser")?;
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ClassCatalog;
    use crate::config::Theme;
    use crate::predict::{PredictionRequest, PredictionResponse};

    struct EmptyCatalog;

    impl CatalogSource for EmptyCatalog {
        fn fetch(&self) -> Result<ClassCatalog> {
            ClassCatalog::from_json("{}")
        }

        fn describe(&self) -> String {
            "empty".to_string()
        }
    }

    struct NoBackend;

    impl PredictBackend for NoBackend {
        fn predict(&self, _request: &PredictionRequest<'_>) -> Result<PredictionResponse> {
            anyhow::bail!("not reachable")
        }

        fn describe(&self) -> String {
            "none".to_string()
        }
    }

    /// Yields a few bytes, then fails like a dropped connection.
    struct TruncatedBody {
        sent: bool,
    }

    impl Read for TruncatedBody {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.sent {
                return Err(io::Error::new(io::ErrorKind::ConnectionReset, "connection reset"));
            }
            self.sent = true;
            buf[..4].copy_from_slice(b"\xff\xd8\xff\xe0");
            Ok(4)
        }
    }

    fn dashboard() -> Dashboard {
        Dashboard::new(
            Page::new(&["custom_model".to_string()], Theme::Light),
            Box::new(EmptyCatalog),
            Box::new(NoBackend),
        )
    }

    #[test]
    fn truncated_upload_is_bad_request() {
        let dash = dashboard();
        dash.page().set_selection("pizza");

        let reply = dispatch(
            &dash,
            &Method::Post,
            "/api/predict?model_type=custom_model",
            &mut TruncatedBody { sent: false },
        );

        assert_eq!(reply.status, 400);
        assert!(reply.text().contains("connection reset"));
        assert!(dash.page().alerts().is_empty());
        assert_eq!(dash.page().output(), "");
    }

    #[test]
    fn get_ignores_body() {
        let dash = dashboard();
        let reply = dispatch(
            &dash,
            &Method::Get,
            "/api/health",
            &mut TruncatedBody { sent: true },
        );
        assert_eq!(reply.status, 200);
    }

    #[test]
    fn post_body_reaches_handler() {
        let dash = dashboard();
        dash.page().set_selection("pizza");

        let reply = dispatch(
            &dash,
            &Method::Post,
            "/api/predict?model_type=custom_model&filename=a.jpg",
            &mut Cursor::new(b"jpeg".to_vec()),
        );

        assert_eq!(reply.status, 200);
        assert!(reply.text().contains("Error: not reachable"));
    }

    #[test]
    fn error_reply_is_json() {
        let reply = Reply::error(404, "not found");
        assert_eq!(reply.content_type, ContentType::Json);
        assert_eq!(reply.text(), r#"{"error":"not found"}"#);
    }
}
