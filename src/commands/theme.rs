use async_trait::async_trait;

use super::{Command, CommandResult, SessionInfo};

pub struct ThemeCommand;

#[async_trait]
impl Command for ThemeCommand {
    fn name(&self) -> &str {
        "/theme"
    }

    fn description(&self) -> &str {
        "toggle between light and dark output colors"
    }

    async fn execute(&self, _args: &str, info: &mut SessionInfo<'_>) -> CommandResult {
        match info.prefs.toggle_theme() {
            Ok(theme) => {
                info.workspace.theme = theme;
                println!("  ✓ theme: {theme} ({} next)", theme.toggle_label());
            }
            Err(e) => eprintln!("  ✗ failed to save theme: {e:#}"),
        }
        CommandResult::Handled
    }
}
