//! Commands that take the last output somewhere else.

use async_trait::async_trait;
use chrono::Utc;
use std::path::Path;

use super::{Command, CommandResult, SessionInfo};
use crate::export::save_output;

pub struct SaveCommand;

#[async_trait]
impl Command for SaveCommand {
    fn name(&self) -> &str {
        "/save"
    }

    fn aliases(&self) -> &[&str] {
        &["/download"]
    }

    fn description(&self) -> &str {
        "write the last output to a timestamped file (optional: directory)"
    }

    async fn execute(&self, args: &str, info: &mut SessionInfo<'_>) -> CommandResult {
        let dir = if args.is_empty() {
            info.save_dir
        } else {
            Path::new(args)
        };
        let output = info.state.snapshot().output;

        match save_output(dir, &output, Utc::now()).await {
            Ok(path) => println!("  ✓ saved to {}", path.display()),
            Err(e) => eprintln!("  ✗ {e:#}"),
        }
        CommandResult::Handled
    }
}

/// The terminal has no clipboard to write to.
pub struct CopyCommand;

#[async_trait]
impl Command for CopyCommand {
    fn name(&self) -> &str {
        "/copy"
    }

    fn description(&self) -> &str {
        "copy the last output (unsupported here, use /save)"
    }

    async fn execute(&self, _args: &str, _info: &mut SessionInfo<'_>) -> CommandResult {
        println!("  clipboard is not available in the terminal, use /save");
        CommandResult::Handled
    }
}
