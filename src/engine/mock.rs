use async_trait::async_trait;
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use super::{EngineError, EngineHandle, EngineOutput};

/// One call the engine received.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineCall {
    Structured { value: Value, filter: String },
    Raw { text: String, filter: String },
}

/// A scripted engine for tests. Replies are handed out in order; once the
/// script runs out the last reply repeats.
#[derive(Default)]
pub struct MockEngine {
    structured: Vec<Result<EngineOutput, EngineError>>,
    raw: Vec<Result<String, EngineError>>,
    structured_index: AtomicUsize,
    raw_index: AtomicUsize,
    delay: Duration,
    panic_on_call: bool,
    calls: Mutex<Vec<EngineCall>>,
}

impl MockEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_structured(mut self, reply: Result<EngineOutput, EngineError>) -> Self {
        self.structured.push(reply);
        self
    }

    pub fn with_raw(mut self, reply: Result<String, EngineError>) -> Self {
        self.raw.push(reply);
        self
    }

    /// Suspend for `delay` inside every call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Panic inside every call, after recording it.
    pub fn panicking(mut self) -> Self {
        self.panic_on_call = true;
        self
    }

    /// Every call received so far, oldest first.
    pub fn calls(&self) -> Vec<EngineCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn record(&self, call: EngineCall) {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(call);
    }

    async fn pause(&self) {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.panic_on_call {
            panic!("MockEngine: scripted panic");
        }
    }
}

fn next_reply<T: Clone>(
    script: &[Result<T, EngineError>],
    index: &AtomicUsize,
    kind: &str,
) -> Result<T, EngineError> {
    let i = index.fetch_add(1, Ordering::SeqCst);
    match script.get(i).or_else(|| script.last()) {
        Some(reply) => reply.clone(),
        None => Err(EngineError::Fault(format!(
            "MockEngine: no {kind} replies scripted"
        ))),
    }
}

#[async_trait]
impl EngineHandle for MockEngine {
    async fn evaluate_structured(
        &self,
        value: &Value,
        filter: &str,
    ) -> Result<EngineOutput, EngineError> {
        self.record(EngineCall::Structured {
            value: value.clone(),
            filter: filter.to_string(),
        });
        self.pause().await;
        next_reply(&self.structured, &self.structured_index, "structured")
    }

    async fn evaluate_raw(&self, text: &str, filter: &str) -> Result<String, EngineError> {
        self.record(EngineCall::Raw {
            text: text.to_string(),
            filter: filter.to_string(),
        });
        self.pause().await;
        next_reply(&self.raw, &self.raw_index, "raw")
    }
}
