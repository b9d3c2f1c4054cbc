//! The filter engine boundary.
//!
//! The engine is an external capability that shows up at some point after
//! startup. The orchestrator only knows [`EngineHandle`]; where that handle
//! lives until then is an [`EngineSlot`].

pub mod jq;
pub mod mock;

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// What a structured evaluation produced.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineOutput {
    /// Already textual. Shown verbatim.
    Text(String),
    /// A JSON value. The caller decides how to serialize it.
    Value(Value),
}

/// A failure reported by a loaded engine.
///
/// The message is the engine's own text and is shown to the user as-is,
/// so every variant displays only its payload.
///
/// | Variant | When |
/// |---------|------|
/// | [`Syntax`](Self::Syntax) | The filter did not compile |
/// | [`Evaluation`](Self::Evaluation) | The filter failed against the input |
/// | [`Fault`](Self::Fault) | The engine itself broke (spawn failure, panic, bad output) |
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("{0}")]
    Syntax(String),
    #[error("{0}")]
    Evaluation(String),
    #[error("{0}")]
    Fault(String),
}

impl EngineError {
    /// Machine-readable code for logs.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Syntax(_) => "ENGINE_SYNTAX",
            Self::Evaluation(_) => "ENGINE_EVALUATION",
            Self::Fault(_) => "ENGINE_FAULT",
        }
    }

    /// Every engine error is recoverable: the user edits the filter or
    /// input and runs again.
    pub fn is_recoverable(&self) -> bool {
        true
    }
}

/// The engine did not appear in its slot within the wait budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("jq engine failed to load (waited {} ms)", .waited.as_millis())]
pub struct EngineTimeout {
    pub waited: Duration,
}

impl EngineTimeout {
    pub fn code(&self) -> &'static str {
        "ENGINE_TIMEOUT"
    }

    /// A later wait may succeed once the loader finishes.
    pub fn is_recoverable(&self) -> bool {
        true
    }
}

/// A loaded filter engine. Could be a jq process, a test script, or
/// anything else that speaks filters.
#[async_trait]
pub trait EngineHandle: Send + Sync {
    /// Evaluate `filter` against an already-parsed JSON value.
    async fn evaluate_structured(
        &self,
        value: &Value,
        filter: &str,
    ) -> Result<EngineOutput, EngineError>;

    /// Evaluate `filter` against unparsed input text.
    async fn evaluate_raw(&self, text: &str, filter: &str) -> Result<String, EngineError>;
}

/// The process-wide home of the engine. Unset until a loader fills it,
/// then immutable for the rest of the process.
#[derive(Default)]
pub struct EngineSlot {
    engine: OnceLock<Arc<dyn EngineHandle>>,
}

impl EngineSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the engine. Returns `false` if one was already installed;
    /// the first engine stays.
    pub fn set(&self, engine: Arc<dyn EngineHandle>) -> bool {
        let installed = self.engine.set(engine).is_ok();
        if installed {
            tracing::debug!("engine slot populated");
        } else {
            tracing::warn!("engine slot already populated, ignoring second engine");
        }
        installed
    }

    pub fn get(&self) -> Option<Arc<dyn EngineHandle>> {
        self.engine.get().cloned()
    }

    pub fn is_set(&self) -> bool {
        self.engine.get().is_some()
    }
}
