//! Commands that edit the filter and input buffers.

use async_trait::async_trait;

use super::{Command, CommandResult, SessionInfo};
use crate::samples;
use crate::transform::{format_json, minify_json};

pub struct FilterCommand;

#[async_trait]
impl Command for FilterCommand {
    fn name(&self) -> &str {
        "/filter"
    }

    fn aliases(&self) -> &[&str] {
        &["/f"]
    }

    fn description(&self) -> &str {
        "set the filter without running it (no argument: show it)"
    }

    async fn execute(&self, args: &str, info: &mut SessionInfo<'_>) -> CommandResult {
        if args.is_empty() {
            println!("  filter: {}", info.workspace.filter);
        } else {
            info.workspace.filter = args.to_string();
        }
        CommandResult::Handled
    }
}

pub struct InputCommand;

#[async_trait]
impl Command for InputCommand {
    fn name(&self) -> &str {
        "/input"
    }

    fn aliases(&self) -> &[&str] {
        &["/i"]
    }

    fn description(&self) -> &str {
        "replace the input with the rest of the line (no argument: show it)"
    }

    async fn execute(&self, args: &str, info: &mut SessionInfo<'_>) -> CommandResult {
        if args.is_empty() {
            println!("{}", info.workspace.input);
        } else {
            info.workspace.input = args.to_string();
        }
        CommandResult::Handled
    }
}

pub struct LoadCommand;

#[async_trait]
impl Command for LoadCommand {
    fn name(&self) -> &str {
        "/load"
    }

    fn description(&self) -> &str {
        "read the input from a file"
    }

    async fn execute(&self, args: &str, info: &mut SessionInfo<'_>) -> CommandResult {
        if args.is_empty() {
            eprintln!("  usage: /load <path>");
            return CommandResult::Handled;
        }
        match tokio::fs::read_to_string(args).await {
            Ok(text) => {
                println!("  ✓ loaded {} bytes from {args}", text.len());
                info.workspace.input = text;
            }
            Err(e) => eprintln!("  ✗ cannot read {args}: {e}"),
        }
        CommandResult::Handled
    }
}

pub struct ExampleCommand;

#[async_trait]
impl Command for ExampleCommand {
    fn name(&self) -> &str {
        "/example"
    }

    fn description(&self) -> &str {
        "load the example filter and input"
    }

    async fn execute(&self, _args: &str, info: &mut SessionInfo<'_>) -> CommandResult {
        let sample = samples::example();
        info.workspace.filter = sample.filter.to_string();
        info.workspace.input = sample.input;
        println!("  ✓ example loaded, filter: {}", sample.filter);
        CommandResult::Handled
    }
}

pub struct FormatCommand;

#[async_trait]
impl Command for FormatCommand {
    fn name(&self) -> &str {
        "/format"
    }

    fn description(&self) -> &str {
        "pretty-print the input if it is JSON"
    }

    async fn execute(&self, _args: &str, info: &mut SessionInfo<'_>) -> CommandResult {
        info.workspace.input = format_json(&info.workspace.input);
        CommandResult::Handled
    }
}

pub struct MinifyCommand;

#[async_trait]
impl Command for MinifyCommand {
    fn name(&self) -> &str {
        "/minify"
    }

    fn description(&self) -> &str {
        "collapse the input onto one line if it is JSON"
    }

    async fn execute(&self, _args: &str, info: &mut SessionInfo<'_>) -> CommandResult {
        info.workspace.input = minify_json(&info.workspace.input);
        CommandResult::Handled
    }
}

pub struct ShowCommand;

#[async_trait]
impl Command for ShowCommand {
    fn name(&self) -> &str {
        "/show"
    }

    fn description(&self) -> &str {
        "show the filter, input, and last result"
    }

    async fn execute(&self, _args: &str, info: &mut SessionInfo<'_>) -> CommandResult {
        let state = info.state.snapshot();
        println!("  filter: {}", info.workspace.filter);
        println!("  input:\n{}", info.workspace.input);
        if state.busy {
            println!("  (run in progress)");
        } else if let Some(error) = &state.error {
            println!("  error:\n{}", info.workspace.theme.paint_error(error));
        } else {
            println!("  output:\n{}", info.workspace.theme.paint_output(&state.output));
        }
        CommandResult::Handled
    }
}
