//! Embedded HTML/CSS/JS frontend for the nutrilens dashboard.
//!
//! The page is compiled into the binary as a template. The server fills in
//! the current page state; the inline script only moves bytes between the
//! form controls and the fragment endpoints.

use std::fmt::Write;

use crate::config::Theme;
use crate::page::Page;
use crate::render::html_escape;

/// Render the full page for the current state.
pub fn render_page(page: &Page, classes: &[String]) -> String {
    let body_class = match page.theme() {
        Theme::Dark => "dark",
        Theme::Light => "",
    };

    fill(
        PAGE_TEMPLATE,
        &[
            ("__BODY_CLASS__", body_class),
            ("__CLASS_OPTIONS__", &class_options(classes, page.selected_class())),
            ("__PREDICT_BUTTONS__", &predict_buttons(page)),
            ("__DETAILS__", page.details()),
            ("__OUTPUT__", page.output()),
        ],
    )
}

/// Substitute markers in one left-to-right pass. Inserted values are never
/// scanned again, so content that happens to contain a marker stays literal.
fn fill(template: &str, slots: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some((at, marker, value)) = slots
        .iter()
        .filter_map(|&(marker, value)| rest.find(marker).map(|at| (at, marker, value)))
        .min_by_key(|&(at, ..)| at)
    {
        out.push_str(&rest[..at]);
        out.push_str(value);
        rest = &rest[at + marker.len()..];
    }
    out.push_str(rest);
    out
}

fn class_options(classes: &[String], selected: Option<&str>) -> String {
    let mut html = String::from("<option value=\"\">-- Select a class --</option>");
    for class in classes {
        let marker = if selected == Some(class.as_str()) {
            " selected"
        } else {
            ""
        };
        let name = html_escape(class);
        let _ = write!(html, "<option value=\"{name}\"{marker}>{name}</option>");
    }
    html
}

fn predict_buttons(page: &Page) -> String {
    let mut html = String::new();
    for control in page.controls() {
        let _ = write!(
            html,
            "<button class=\"predict-btn\" data-type=\"{}\"{}>{}</button>",
            html_escape(&control.model_type),
            if control.disabled { " disabled" } else { "" },
            html_escape(&control.label),
        );
    }
    html
}

/// Page template. `__NAME__` markers are replaced by [`render_page`].
const PAGE_TEMPLATE: &str = r##"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>nutrilens</title>
<style>
:root {
  --bg: #f6f8fa;
  --surface: #ffffff;
  --border: #d0d7de;
  --text: #1f2328;
  --muted: #656d76;
  --accent: #0969da;
  --red: #cf222e;
  --radius: 8px;
  --font: -apple-system, BlinkMacSystemFont, 'Segoe UI', Helvetica, Arial, sans-serif;
}
body.dark {
  --bg: #0d1117;
  --surface: #161b22;
  --border: #30363d;
  --text: #e6edf3;
  --muted: #8b949e;
  --accent: #58a6ff;
  --red: #f85149;
}

* { margin: 0; padding: 0; box-sizing: border-box; }
body {
  background: var(--bg);
  color: var(--text);
  font-family: var(--font);
  font-size: 14px;
  line-height: 1.5;
}

.app { max-width: 960px; margin: 0 auto; padding: 24px; }

header {
  display: flex;
  align-items: center;
  justify-content: space-between;
  margin-bottom: 24px;
  padding-bottom: 16px;
  border-bottom: 1px solid var(--border);
}
header h1 { font-size: 24px; font-weight: 600; }

.card {
  background: var(--surface);
  border: 1px solid var(--border);
  border-radius: var(--radius);
  padding: 16px;
  margin-bottom: 16px;
}
.card h2 { font-size: 16px; margin-bottom: 12px; }

select, input[type=file], button {
  font: inherit;
  color: var(--text);
  background: var(--surface);
  border: 1px solid var(--border);
  border-radius: 6px;
  padding: 6px 10px;
}
button { cursor: pointer; }
button:hover { border-color: var(--accent); }
button:disabled { opacity: 0.6; cursor: progress; }

#class-details-box { margin-top: 12px; color: var(--muted); }
.nutri-line { margin-top: 4px; color: var(--text); }

.predict-row { display: flex; gap: 8px; flex-wrap: wrap; margin-top: 12px; }

table { border-collapse: collapse; margin-top: 8px; }
th, td { border: 1px solid var(--border); padding: 4px 10px; text-align: left; }
.confusion-table td { text-align: right; }
.error { color: var(--red); }
</style>
</head>
<body class="__BODY_CLASS__">
<div class="app">
  <header>
    <h1>nutrilens</h1>
    <button id="theme-toggle" type="button">Toggle theme</button>
  </header>

  <section class="card">
    <h2>Class</h2>
    <select id="class-dropdown">__CLASS_OPTIONS__</select>
    <div id="class-details-box">__DETAILS__</div>
  </section>

  <section class="card">
    <h2>Image</h2>
    <input id="file-input" type="file" accept="image/*">
    <div class="predict-row">__PREDICT_BUTTONS__</div>
  </section>

  <section class="card">
    <h2>Prediction</h2>
    <div id="prediction-output">__OUTPUT__</div>
  </section>
</div>

<script>
const dropdown = document.getElementById("class-dropdown");
const detailsBox = document.getElementById("class-details-box");
const fileInput = document.getElementById("file-input");
const outputBox = document.getElementById("prediction-output");

// Only the newest selection may paint the details box.
let latestLookup = 0;

dropdown.addEventListener("change", async () => {
  const token = ++latestLookup;
  try {
    const res = await fetch("/api/select?class=" + encodeURIComponent(dropdown.value), { method: "POST" });
    const html = await res.text();
    if (token === latestLookup) detailsBox.innerHTML = html;
  } catch (err) {
    if (token === latestLookup) detailsBox.innerText = "Failed to load class.json";
  }
});

document.querySelectorAll(".predict-btn").forEach(btn => {
  btn.addEventListener("click", async () => {
    const file = fileInput.files[0];
    if (!file) {
      alert("Please upload an image.");
      return;
    }
    if (!dropdown.value) {
      alert("Please select a class.");
      return;
    }
    const params = new URLSearchParams({ model_type: btn.dataset.type, filename: file.name });

    const label = btn.innerText;
    btn.innerText = "Predicting...";
    btn.disabled = true;
    try {
      const res = await fetch("/api/predict?" + params, { method: "POST", body: file });
      if (res.status === 422) {
        alert((await res.json()).alert);
      } else {
        outputBox.innerHTML = await res.text();
      }
    } catch (err) {
      outputBox.innerHTML = '<div class="error" style="color:red;">Error: ' + err + '</div>';
    } finally {
      btn.innerText = label;
      btn.disabled = false;
    }
  });
});

document.getElementById("theme-toggle").addEventListener("click", async () => {
  const res = await fetch("/api/theme", { method: "POST" });
  const { theme } = await res.json();
  document.body.classList.toggle("dark", theme === "dark");
});
</script>
</body>
</html>
"##;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
