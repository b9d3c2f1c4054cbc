//! Input buffer clean-ups. Text that is not JSON is left alone.

use serde_json::Value;

/// Pretty-print JSON with two-space indentation.
pub fn format_json(text: &str) -> String {
    match serde_json::from_str::<Value>(text) {
        Ok(value) => serde_json::to_string_pretty(&value).unwrap_or_else(|_| text.to_string()),
        Err(_) => text.to_string(),
    }
}

/// Collapse JSON onto a single line.
pub fn minify_json(text: &str) -> String {
    match serde_json::from_str::<Value>(text) {
        Ok(value) => serde_json::to_string(&value).unwrap_or_else(|_| text.to_string()),
        Err(_) => text.to_string(),
    }
}
