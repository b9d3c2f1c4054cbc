//! Persisted user preferences, backed by SQLite.

pub mod theme;

use anyhow::{Context, Result};
use rusqlite::Connection;
use std::sync::{Mutex, PoisonError};

use crate::consts::THEME_KEY;
use theme::Theme;

/// Key-value preference store.
pub struct Preferences {
    conn: Mutex<Connection>,
}

impl Preferences {
    /// Open or create the preferences table in the given database.
    /// Use `":memory:"` for tests.
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open preferences database {path}"))?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS preferences (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )",
        )
        .context("failed to create preferences table")?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn get(&self, key: &str) -> Result<Option<String>> {
        let conn = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        let mut stmt = conn.prepare("SELECT value FROM preferences WHERE key = ?1")?;
        let mut rows = stmt.query([key])?;
        match rows.next()? {
            Some(row) => Ok(Some(row.get(0)?)),
            None => Ok(None),
        }
    }

    /// Upsert a value.
    pub fn set(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        conn.execute(
            "INSERT INTO preferences (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            [key, value],
        )?;
        Ok(())
    }

    /// The saved theme. Missing or unrecognized values mean light.
    pub fn theme(&self) -> Result<Theme> {
        Ok(self
            .get(THEME_KEY)?
            .and_then(|token| token.parse().ok())
            .unwrap_or_default())
    }

    pub fn set_theme(&self, theme: Theme) -> Result<()> {
        self.set(THEME_KEY, theme.token())
    }

    /// Flip and persist the theme. Returns the new one.
    pub fn toggle_theme(&self) -> Result<Theme> {
        let next = self.theme()?.toggled();
        self.set_theme(next)?;
        tracing::debug!(theme = next.token(), "theme changed");
        Ok(next)
    }
}
