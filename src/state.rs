//! The observable result of the latest run.
//!
//! There is one [`RunState`] per session, held in a [`RunStateCell`]. Runs
//! write it, the front end watches it. Overlapping runs are not serialized:
//! whichever finishes last wins.

use serde::Serialize;
use tokio::sync::watch;

/// Shown in place of a successful result that produced no text, so a
/// finished run always has either an error or an output.
pub const NO_OUTPUT: &str = "(no output)";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunState {
    /// A run is in flight.
    pub busy: bool,
    /// Why the last run failed.
    pub error: Option<String>,
    /// What the last run produced.
    pub output: String,
}

impl RunState {
    /// The state of a run that just started.
    pub fn running() -> Self {
        Self {
            busy: true,
            error: None,
            output: String::new(),
        }
    }

    /// The state of a finished run. An error clears the output; an empty
    /// success becomes [`NO_OUTPUT`].
    pub fn finished(result: Result<String, String>) -> Self {
        match result {
            Ok(output) if output.is_empty() => Self {
                busy: false,
                error: None,
                output: NO_OUTPUT.to_string(),
            },
            Ok(output) => Self {
                busy: false,
                error: None,
                output,
            },
            Err(error) => Self {
                busy: false,
                error: Some(error),
                output: String::new(),
            },
        }
    }

    pub fn succeeded(&self) -> bool {
        !self.busy && self.error.is_none() && !self.output.is_empty()
    }

    pub fn failed(&self) -> bool {
        !self.busy && self.error.as_deref().is_some_and(|e| !e.is_empty())
    }
}

/// Shared, watchable holder of the session's [`RunState`].
#[derive(Debug)]
pub struct RunStateCell {
    tx: watch::Sender<RunState>,
}

impl RunStateCell {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(RunState::default());
        Self { tx }
    }

    /// A copy of the current state.
    pub fn snapshot(&self) -> RunState {
        self.tx.borrow().clone()
    }

    /// Replace the state and notify watchers.
    pub fn replace(&self, state: RunState) {
        self.tx.send_replace(state);
    }

    /// Watch state changes. The receiver starts at the current state.
    pub fn subscribe(&self) -> watch::Receiver<RunState> {
        self.tx.subscribe()
    }
}

impl Default for RunStateCell {
    fn default() -> Self {
        Self::new()
    }
}
