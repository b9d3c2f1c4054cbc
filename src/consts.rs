//! Project-wide constants.

use std::path::PathBuf;
use std::time::Duration;

pub const AUTHOR: &str = env!("CARGO_PKG_AUTHORS");
pub const HOMEPAGE: &str = env!("CARGO_PKG_HOMEPAGE");
pub const REPO: &str = env!("CARGO_PKG_REPOSITORY");

/// How long startup waits for the engine before warning the user.
pub const STARTUP_TIMEOUT: Duration = Duration::from_secs(10);

/// How long a run waits for the engine.
pub const RUN_TIMEOUT: Duration = Duration::from_secs(20);

/// How often a readiness wait checks the engine slot.
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Preference key for the color theme.
pub const THEME_KEY: &str = "jqweb-theme";

/// Default database path: `~/.jqplay/jqplay.db`.
/// Falls back to the temp dir when there is no home directory.
pub fn default_db_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(".jqplay")
        .join("jqplay.db")
}
