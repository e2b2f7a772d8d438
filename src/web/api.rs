//! Request handlers for the dashboard.
//!
//! The page script calls the fragment endpoints and swaps the returned HTML
//! into the matching container; the JSON endpoints report small bits of
//! state.

use anyhow::Result;
use serde::Serialize;

use super::{Dashboard, Reply, frontend};
use crate::predict::Upload;

// ---------------------------------------------------------------------------
// JSON response types
// ---------------------------------------------------------------------------

/// Body of a 422 reply when a prediction precondition fails.
#[derive(Serialize)]
struct AlertResponse {
    alert: String,
}

#[derive(Serialize)]
struct ThemeResponse {
    theme: String,
}

#[derive(Serialize)]
struct HealthResponse {
    catalog_source: String,
    catalog_reachable: bool,
    catalog_classes: usize,
    predict_url: String,
    selected_class: Option<String>,
    theme: String,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Read a percent-decoded query parameter from a URL.
fn query_param(url: &str, name: &str) -> Option<String> {
    let (_, query) = url.split_once('?')?;
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// `GET /` — the full page, dropdown filled from the catalog.
pub fn get_index(dashboard: &Dashboard) -> Reply {
    let classes = dashboard
        .catalog
        .fetch()
        .map(|catalog| catalog.class_names())
        .unwrap_or_default();
    let page = dashboard.page();
    Reply::html(200, frontend::render_page(&page, &classes))
}

/// `POST /api/select?class=NAME` — select a class, return the details box.
pub fn post_select(dashboard: &Dashboard, url: &str) -> Reply {
    let class = query_param(url, "class").unwrap_or_default();
    let ticket = dashboard.page().begin_lookup(&class);

    let outcome = ticket.run(dashboard.catalog.as_ref());

    let mut page = dashboard.page();
    page.finish_lookup(&ticket, &outcome);
    Reply::html(200, page.details())
}

/// `POST /api/predict?model_type=T&filename=F` — body is the raw image.
///
/// Returns the output box on any completed request, or 422 with the alert
/// text when a precondition fails (no request is sent in that case).
pub fn post_predict(dashboard: &Dashboard, url: &str, body: &[u8]) -> Result<Reply> {
    let model_type = query_param(url, "model_type").unwrap_or_default();
    let filename = query_param(url, "filename").unwrap_or_else(|| "upload".to_string());
    let upload = (!body.is_empty()).then(|| Upload::new(filename, body.to_vec()));

    let begun = dashboard.page().begin_predict(&model_type, upload.as_ref());
    let ticket = match begun {
        Ok(ticket) => ticket,
        Err(precondition) => {
            return Reply::json(
                422,
                &AlertResponse {
                    alert: precondition.to_string(),
                },
            );
        }
    };

    let result = dashboard.backend.predict(&ticket.request());

    let mut page = dashboard.page();
    page.finish_predict(ticket, result);
    Ok(Reply::html(200, page.output()))
}

/// `POST /api/theme` — flip the theme.
pub fn post_theme(dashboard: &Dashboard) -> Result<Reply> {
    let theme = dashboard.page().toggle_theme();
    Reply::json(
        200,
        &ThemeResponse {
            theme: theme.to_string(),
        },
    )
}

/// `GET /api/health` — catalog reachability and page state.
pub fn get_health(dashboard: &Dashboard) -> Result<Reply> {
    let catalog = dashboard.catalog.fetch();
    let page = dashboard.page();
    let resp = HealthResponse {
        catalog_source: dashboard.catalog.describe(),
        catalog_reachable: catalog.is_ok(),
        catalog_classes: catalog.map(|c| c.len()).unwrap_or(0),
        predict_url: dashboard.backend.describe(),
        selected_class: page.selected_class().map(str::to_string),
        theme: page.theme().to_string(),
    };
    Reply::json(200, &resp)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_param_decodes_values() {
        assert_eq!(
            query_param("/api/select?class=Red%20Apple", "class").as_deref(),
            Some("Red Apple")
        );
        assert_eq!(
            query_param("/api/select?x=1&class=fried+rice", "class").as_deref(),
            Some("fried rice")
        );
    }

    #[test]
    fn query_param_missing() {
        assert_eq!(query_param("/api/select", "class"), None);
        assert_eq!(query_param("/api/select?other=1", "class"), None);
        assert_eq!(query_param("/api/select?class=", "class").as_deref(), Some(""));
    }

    #[test]
    fn alert_response_serializes() {
        let json = serde_json::to_string(&AlertResponse {
            alert: "Please upload an image.".to_string(),
        })
        .unwrap();
        assert_eq!(json, r#"{"alert":"Please upload an image."}"#);
    }
}
