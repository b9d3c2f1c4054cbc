//! Decides whether run input is JSON or raw text.

use serde_json::Value;

/// How the input will be handed to the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum Classification {
    /// Input parsed as a JSON document.
    Structured(Value),
    /// Input that is not a JSON document, passed through untouched.
    Raw(String),
}

impl Classification {
    /// Short label for logs.
    pub fn mode(&self) -> &'static str {
        match self {
            Self::Structured(_) => "structured",
            Self::Raw(_) => "raw",
        }
    }
}

/// Classify input text. Never fails: anything that is not a single JSON
/// document (including the empty string) falls back to raw mode.
pub fn classify(input: &str) -> Classification {
    match serde_json::from_str::<Value>(input) {
        Ok(value) => Classification::Structured(value),
        Err(_) => Classification::Raw(input.to_string()),
    }
}
