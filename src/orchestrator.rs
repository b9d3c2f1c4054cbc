//! The run state machine.
//!
//! A run resets [`RunState`], waits for the engine, classifies the input,
//! calls the matching engine entry point and records exactly one of output
//! or error. `busy` is cleared on every exit path, engine panics included.

use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use thiserror::Error;
use tracing::Instrument;

use crate::classify::{Classification, classify};
use crate::consts::RUN_TIMEOUT;
use crate::engine::{EngineError, EngineOutput, EngineTimeout};
use crate::readiness::ReadinessGate;
use crate::state::{RunState, RunStateCell};

/// The filter used when none is given.
pub const IDENTITY_FILTER: &str = ".";

/// Shown when an engine fails without saying why.
const UNDESCRIBED_FAILURE: &str = "engine error";

/// A single run's normalized inputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRequest {
    pub filter: String,
    pub input: String,
}

impl RunRequest {
    /// Trim both texts; an empty filter becomes the identity filter.
    pub fn new(filter: &str, input: &str) -> Self {
        let filter = filter.trim();
        Self {
            filter: if filter.is_empty() {
                IDENTITY_FILTER.to_string()
            } else {
                filter.to_string()
            },
            input: input.trim().to_string(),
        }
    }
}

/// Why a run failed.
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Timeout(#[from] EngineTimeout),
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error("cannot render result: {0}")]
    Render(#[from] serde_json::Error),
}

impl RunError {
    /// The text shown to the user.
    pub fn user_message(&self) -> String {
        let message = self.to_string();
        if message.trim().is_empty() {
            UNDESCRIBED_FAILURE.to_string()
        } else {
            message
        }
    }
}

pub struct OrchestratorConfig {
    /// How long a run waits for the engine. Longer than the startup wait,
    /// since a run can come long after startup over a slow load.
    pub engine_timeout: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            engine_timeout: RUN_TIMEOUT,
        }
    }
}

pub struct Orchestrator {
    gate: Arc<ReadinessGate>,
    state: Arc<RunStateCell>,
    config: OrchestratorConfig,
    runs: AtomicU64,
}

impl Orchestrator {
    pub fn new(
        gate: Arc<ReadinessGate>,
        state: Arc<RunStateCell>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            gate,
            state,
            config,
            runs: AtomicU64::new(0),
        }
    }

    pub fn state(&self) -> &Arc<RunStateCell> {
        &self.state
    }

    pub fn gate(&self) -> &Arc<ReadinessGate> {
        &self.gate
    }

    /// How many runs have been started.
    pub fn runs_started(&self) -> u64 {
        self.runs.load(Ordering::SeqCst)
    }

    /// Discard a memoized engine wait so the next run polls again.
    pub fn reset_readiness(&self) {
        self.gate.reset();
    }

    /// Run `filter_text` against `input_text`.
    ///
    /// Returns this run's final state. The shared cell holds the same value
    /// unless an overlapping run finished later.
    pub async fn run(&self, filter_text: &str, input_text: &str) -> RunState {
        let id = self.runs.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.replace(RunState::running());

        let request = RunRequest::new(filter_text, input_text);
        let span = tracing::info_span!("run", id, filter = %request.filter);

        let result = AssertUnwindSafe(self.execute(&request).instrument(span.clone()))
            .catch_unwind()
            .await
            .unwrap_or_else(|_| Err(EngineError::Fault("engine panicked".to_string()).into()));

        let finished = span.in_scope(|| match result {
            Ok(output) => {
                tracing::info!(bytes = output.len(), "run succeeded");
                RunState::finished(Ok(output))
            }
            Err(err) => {
                tracing::info!(error = %err, "run failed");
                RunState::finished(Err(err.user_message()))
            }
        });

        self.state.replace(finished.clone());
        finished
    }

    async fn execute(&self, request: &RunRequest) -> Result<String, RunError> {
        let engine = self.gate.await_engine(self.config.engine_timeout).await?;

        let classification = classify(&request.input);
        tracing::debug!(mode = classification.mode(), "evaluating");

        match classification {
            Classification::Structured(value) => {
                let output = engine.evaluate_structured(&value, &request.filter).await?;
                Ok(render(output)?)
            }
            Classification::Raw(text) => Ok(engine.evaluate_raw(&text, &request.filter).await?),
        }
    }
}

/// Text passes through. Values become two-space indented JSON.
pub fn render(output: EngineOutput) -> Result<String, serde_json::Error> {
    match output {
        EngineOutput::Text(text) => Ok(text),
        EngineOutput::Value(value) => serde_json::to_string_pretty(&value),
    }
}
