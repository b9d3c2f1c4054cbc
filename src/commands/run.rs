use async_trait::async_trait;

use super::{Command, CommandResult, SessionInfo};

/// Run the current buffers, optionally replacing the filter first.
pub struct RunCommand;

#[async_trait]
impl Command for RunCommand {
    fn name(&self) -> &str {
        "/run"
    }

    fn aliases(&self) -> &[&str] {
        &["/r"]
    }

    fn description(&self) -> &str {
        "run the current filter (optional: a new filter)"
    }

    async fn execute(&self, args: &str, info: &mut SessionInfo<'_>) -> CommandResult {
        if !args.is_empty() {
            info.workspace.filter = args.to_string();
        }
        CommandResult::Run
    }
}
