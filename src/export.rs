//! Saving run output to disk.

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use std::path::{Path, PathBuf};

/// File name for output saved at `at`, e.g.
/// `jq-output-2026-10-16T09-04-05-123Z.json`.
pub fn output_filename(at: DateTime<Utc>) -> String {
    let stamp = at
        .to_rfc3339_opts(SecondsFormat::Millis, true)
        .replace([':', '.'], "-");
    format!("jq-output-{stamp}.json")
}

/// Write `output` into `dir` under a timestamped name. Returns the path.
pub async fn save_output(dir: &Path, output: &str, at: DateTime<Utc>) -> Result<PathBuf> {
    let path = dir.join(output_filename(at));
    tokio::fs::write(&path, output)
        .await
        .with_context(|| format!("failed to write {}", path.display()))?;
    tracing::info!(path = %path.display(), bytes = output.len(), "saved output");
    Ok(path)
}
