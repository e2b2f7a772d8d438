//! Canonical lookup keys for class names.
//!
//! Class names come from free-text dropdown labels ("Red Apple") while the
//! catalog file may key them as `red_apple`. The normalized form is trimmed,
//! lowercased and has every space replaced with an underscore.

/// Normalize a class name into its canonical catalog key.
///
/// Absent or empty input yields an empty string.
pub fn normalize_key(name: Option<&str>) -> String {
    match name {
        Some(name) if !name.is_empty() => name.trim().to_lowercase().replace(' ', "_"),
        _ => String::new(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
