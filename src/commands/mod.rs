//! REPL commands prefixed with `/`.
//!
//! Commands implement the [`Command`] trait and are registered in a
//! [`CommandRegistry`]. The registry handles dispatch, alias resolution,
//! argument splitting, and help generation. Anything that is not a command
//! is a filter to run.

mod buffers;
mod output;
mod quit;
mod run;
mod theme;

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

use crate::config::Preferences;
use crate::config::theme::Theme;
use crate::state::RunStateCell;

/// The editable buffers of a session: what the next run will use.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Workspace {
    pub filter: String,
    pub input: String,
    pub theme: Theme,
}

/// Everything a command may read or change.
pub struct SessionInfo<'a> {
    pub workspace: &'a mut Workspace,
    pub prefs: &'a Preferences,
    pub state: &'a RunStateCell,
    /// Where `/save` writes when given no directory.
    pub save_dir: &'a Path,
}

/// What the REPL should do after a command runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandResult {
    /// Not a command. Treat the line as a filter.
    NotACommand,
    /// Command handled, continue the REPL loop.
    Handled,
    /// Run the current filter against the current input.
    Run,
    /// Exit the REPL.
    Quit,
}

/// A REPL command. Implement this trait to add new commands.
#[async_trait]
pub trait Command: Send + Sync {
    /// Primary name, e.g. `"/load"`.
    fn name(&self) -> &str;

    /// Alternative names, e.g. `&["/h", "/?"]`.
    fn aliases(&self) -> &[&str] {
        &[]
    }

    /// One-line description for `/help`.
    fn description(&self) -> &str;

    /// Run the command. `args` is everything after the name, trimmed.
    async fn execute(&self, args: &str, info: &mut SessionInfo<'_>) -> CommandResult;
}

/// Holds registered commands.
pub struct CommandRegistry {
    commands: Vec<Arc<dyn Command>>,
}

impl CommandRegistry {
    /// Create a registry with all built-in commands.
    pub fn new() -> Self {
        let commands: Vec<Arc<dyn Command>> = vec![
            Arc::new(HelpCommand),
            Arc::new(run::RunCommand),
            Arc::new(buffers::FilterCommand),
            Arc::new(buffers::InputCommand),
            Arc::new(buffers::LoadCommand),
            Arc::new(buffers::ExampleCommand),
            Arc::new(buffers::FormatCommand),
            Arc::new(buffers::MinifyCommand),
            Arc::new(buffers::ShowCommand),
            Arc::new(output::SaveCommand),
            Arc::new(output::CopyCommand),
            Arc::new(theme::ThemeCommand),
            Arc::new(quit::QuitCommand),
        ];
        Self { commands }
    }

    pub fn register(&mut self, command: Arc<dyn Command>) {
        self.commands.push(command);
    }

    /// Dispatch input to a matching command, or return `NotACommand`.
    pub async fn dispatch(&self, input: &str, info: &mut SessionInfo<'_>) -> CommandResult {
        let line = input.trim();
        let (cmd, args) = match line.split_once(char::is_whitespace) {
            Some((cmd, args)) => (cmd, args.trim()),
            None => (line, ""),
        };

        for command in &self.commands {
            if cmd == command.name() || command.aliases().contains(&cmd) {
                // /help needs the registry to list all commands
                if command.name() == "/help" {
                    print!("{}", self.help_text());
                    return CommandResult::Handled;
                }
                tracing::debug!(command = command.name(), "dispatching");
                return command.execute(args, info).await;
            }
        }

        if cmd.starts_with('/') {
            println!("unknown command: {cmd}");
            println!("type /help for available commands");
            return CommandResult::Handled;
        }

        CommandResult::NotACommand
    }

    /// Generate help text from all registered commands.
    pub fn help_text(&self) -> String {
        let entries: Vec<(String, &str)> = self
            .commands
            .iter()
            .map(|c| (format_label(c.name(), c.aliases()), c.description()))
            .collect();

        let max_width = entries
            .iter()
            .map(|(label, _)| label.len())
            .max()
            .unwrap_or(10);

        let mut out = String::new();
        for (label, desc) in &entries {
            out.push_str(&format!("  {label:<max_width$}  {desc}\n"));
        }
        out.push_str("\n  any other line is run as a filter against the input\n");
        out
    }

    pub fn names(&self) -> Vec<&str> {
        self.commands.iter().map(|c| c.name()).collect()
    }

    /// All registered names and aliases (for duplicate detection).
    pub fn all_triggers(&self) -> Vec<&str> {
        let mut triggers = Vec::new();
        for cmd in &self.commands {
            triggers.push(cmd.name());
            triggers.extend_from_slice(cmd.aliases());
        }
        triggers
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Placeholder so `/help` shows up in listings; dispatch answers it.
struct HelpCommand;

#[async_trait]
impl Command for HelpCommand {
    fn name(&self) -> &str {
        "/help"
    }

    fn aliases(&self) -> &[&str] {
        &["/h", "/?"]
    }

    fn description(&self) -> &str {
        "show this help"
    }

    async fn execute(&self, _args: &str, _info: &mut SessionInfo<'_>) -> CommandResult {
        CommandResult::Handled
    }
}

fn format_label(name: &str, aliases: &[&str]) -> String {
    if aliases.is_empty() {
        name.to_string()
    } else {
        format!("{} ({})", name, aliases.join(", "))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use tempfile::TempDir;

    /// Owns everything a [`SessionInfo`] borrows.
    pub(crate) struct Fixture {
        pub workspace: Workspace,
        pub prefs: Preferences,
        pub state: RunStateCell,
        pub dir: TempDir,
    }

    impl Fixture {
        pub fn new() -> Self {
            Self {
                workspace: Workspace::default(),
                prefs: Preferences::open(":memory:").unwrap(),
                state: RunStateCell::new(),
                dir: tempfile::tempdir().unwrap(),
            }
        }

        pub fn info(&mut self) -> SessionInfo<'_> {
            SessionInfo {
                workspace: &mut self.workspace,
                prefs: &self.prefs,
                state: &self.state,
                save_dir: self.dir.path(),
            }
        }
    }

    #[test]
    fn all_builtins_registered() {
        let reg = CommandRegistry::new();
        let names = reg.names();
        for name in [
            "/help", "/run", "/filter", "/input", "/load", "/example", "/format", "/minify",
            "/show", "/save", "/copy", "/theme", "/quit",
        ] {
            assert!(names.contains(&name), "missing: {name}");
        }
    }

    #[test]
    fn no_duplicate_triggers() {
        let reg = CommandRegistry::new();
        let triggers = reg.all_triggers();
        let mut seen = Vec::new();
        for t in &triggers {
            assert!(!seen.contains(t), "duplicate trigger: {t}");
            seen.push(t);
        }
    }

    #[test]
    fn help_text_includes_all_commands() {
        let reg = CommandRegistry::new();
        let text = reg.help_text();
        for name in reg.names() {
            assert!(text.contains(name), "help missing: {name}");
        }
        assert!(text.contains("/?"));
    }

    #[tokio::test]
    async fn unknown_slash_command_is_handled() {
        let reg = CommandRegistry::new();
        let mut fx = Fixture::new();
        assert_eq!(
            reg.dispatch("/foobar", &mut fx.info()).await,
            CommandResult::Handled
        );
    }

    #[tokio::test]
    async fn filters_pass_through() {
        let reg = CommandRegistry::new();
        let mut fx = Fixture::new();
        assert_eq!(
            reg.dispatch(".items[] | {id, name}", &mut fx.info()).await,
            CommandResult::NotACommand
        );
        assert_eq!(reg.dispatch(".", &mut fx.info()).await, CommandResult::NotACommand);
    }

    #[tokio::test]
    async fn arguments_are_split_from_name() {
        let reg = CommandRegistry::new();
        let mut fx = Fixture::new();
        reg.dispatch("/filter   .foo | length  ", &mut fx.info()).await;
        assert_eq!(fx.workspace.filter, ".foo | length");
    }

    #[tokio::test]
    async fn plugin_command_works() {
        struct PingCommand;

        #[async_trait]
        impl Command for PingCommand {
            fn name(&self) -> &str {
                "/ping"
            }
            fn description(&self) -> &str {
                "pong"
            }
            async fn execute(&self, _args: &str, _info: &mut SessionInfo<'_>) -> CommandResult {
                CommandResult::Handled
            }
        }

        let mut reg = CommandRegistry::new();
        reg.register(Arc::new(PingCommand));
        let mut fx = Fixture::new();
        assert_eq!(reg.dispatch("/ping", &mut fx.info()).await, CommandResult::Handled);
        assert!(reg.help_text().contains("/ping"));
    }

    #[test]
    fn format_label_with_aliases() {
        assert_eq!(format_label("/help", &["/h", "/?"]), "/help (/h, /?)");
        assert_eq!(format_label("/show", &[]), "/show");
    }
}
