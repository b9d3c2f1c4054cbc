use async_trait::async_trait;
use serde_json::Value;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::task::JoinHandle;

use super::{EngineError, EngineHandle, EngineOutput, EngineSlot};

/// jq's exit status for a filter that failed to compile.
const EXIT_COMPILE_ERROR: i32 = 3;

/// Safe environment variables to pass through. Everything else is stripped.
const SAFE_ENV_VARS: &[&str] = &["PATH", "HOME", "LANG", "LC_ALL", "TZ", "JQ_COLORS"];

/// Configuration for the jq process engine.
#[derive(Debug, Clone)]
pub struct JqConfig {
    /// Executable to run. Looked up on `PATH` when not absolute.
    pub binary: PathBuf,
}

impl Default for JqConfig {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("jq"),
        }
    }
}

/// Evaluates filters by running a `jq` executable once per call.
pub struct JqProcess {
    config: JqConfig,
}

impl JqProcess {
    pub fn new(config: JqConfig) -> Self {
        Self { config }
    }

    /// Check that the executable runs. Returns its version string.
    pub async fn probe(&self) -> Result<String, EngineError> {
        let output = Command::new(&self.config.binary)
            .arg("--version")
            .env_clear()
            .envs(filtered_env())
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| self.spawn_fault(e))?;

        if !output.status.success() {
            return Err(EngineError::Fault(format!(
                "{} --version exited with {}",
                self.config.binary.display(),
                output.status
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    /// Probe jq in the background and install it into `slot` once it
    /// answers. A failed probe leaves the slot empty; waiters time out.
    pub fn load(config: JqConfig, slot: Arc<EngineSlot>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let engine = JqProcess::new(config);
            match engine.probe().await {
                Ok(version) => {
                    tracing::info!(%version, binary = %engine.config.binary.display(), "jq engine loaded");
                    slot.set(Arc::new(engine));
                }
                Err(e) => {
                    tracing::warn!(error = %e, "jq engine unavailable");
                }
            }
        })
    }

    fn spawn_fault(&self, err: std::io::Error) -> EngineError {
        EngineError::Fault(format!(
            "cannot run {}: {}",
            self.config.binary.display(),
            err
        ))
    }

    /// Run jq with `args` then `filter`, feeding `input` on stdin.
    async fn invoke(&self, args: &[&str], filter: &str, input: Vec<u8>) -> Result<String, EngineError> {
        let mut child = Command::new(&self.config.binary)
            .args(args)
            .arg(filter)
            .env_clear()
            .envs(filtered_env())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| self.spawn_fault(e))?;

        // Feed stdin from its own task so a full stdout pipe cannot stall us.
        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| EngineError::Fault("jq stdin unavailable".to_string()))?;
        let writer = tokio::spawn(async move {
            stdin.write_all(&input).await?;
            stdin.shutdown().await?;
            Ok::<_, std::io::Error>(())
        });

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| self.spawn_fault(e))?;
        // A filter that fails to compile closes stdin early; the exit status
        // carries the real error.
        let written = writer.await;

        if output.status.success() {
            match written {
                Ok(Ok(())) => {}
                Ok(Err(e)) => tracing::debug!(error = %e, "jq exited before reading all input"),
                Err(e) => tracing::debug!(error = %e, "jq stdin writer did not finish"),
            }
            Ok(String::from_utf8_lossy(&output.stdout).into_owned())
        } else {
            Err(failure(
                output.status.code(),
                &String::from_utf8_lossy(&output.stderr),
            ))
        }
    }
}

#[async_trait]
impl EngineHandle for JqProcess {
    async fn evaluate_structured(
        &self,
        value: &Value,
        filter: &str,
    ) -> Result<EngineOutput, EngineError> {
        let input = serde_json::to_vec(value).map_err(|e| EngineError::Fault(e.to_string()))?;
        let stdout = self.invoke(&["--compact-output"], filter, input).await?;
        collect_outputs(&stdout)
    }

    async fn evaluate_raw(&self, text: &str, filter: &str) -> Result<String, EngineError> {
        let stdout = self.invoke(&[], filter, text.as_bytes().to_vec()).await?;
        Ok(stdout.trim_end_matches('\n').to_string())
    }
}

fn filtered_env() -> Vec<(String, String)> {
    SAFE_ENV_VARS
        .iter()
        .filter_map(|key| std::env::var(key).ok().map(|val| (key.to_string(), val)))
        .collect()
}

/// Map a non-zero jq exit into an engine error.
fn failure(code: Option<i32>, stderr: &str) -> EngineError {
    let message = stderr.trim();
    let message = if message.is_empty() {
        match code {
            Some(code) => format!("jq exited with status {code}"),
            None => "jq was terminated by a signal".to_string(),
        }
    } else {
        message.to_string()
    };

    match code {
        Some(EXIT_COMPILE_ERROR) => EngineError::Syntax(message),
        _ => EngineError::Evaluation(message),
    }
}

/// Turn compact jq output (one JSON document per line) into an engine result.
///
/// A single string is textual, like a browser engine handing back a JS
/// string. A single other value is structured. Several values are shown the
/// way the jq CLI prints them, one pretty document per line.
fn collect_outputs(stdout: &str) -> Result<EngineOutput, EngineError> {
    let mut values = stdout
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(serde_json::from_str::<Value>)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| EngineError::Fault(format!("unreadable jq output: {e}")))?;

    match values.len() {
        0 => Ok(EngineOutput::Text(String::new())),
        1 => match values.remove(0) {
            Value::String(s) => Ok(EngineOutput::Text(s)),
            value => Ok(EngineOutput::Value(value)),
        },
        _ => {
            let docs = values
                .iter()
                .map(serde_json::to_string_pretty)
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| EngineError::Fault(e.to_string()))?;
            Ok(EngineOutput::Text(docs.join("\n")))
        }
    }
}
