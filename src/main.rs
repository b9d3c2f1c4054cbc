use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use jqplay::banner::{BannerInfo, print_banner, print_session_summary};
use jqplay::commands::{CommandRegistry, CommandResult, SessionInfo, Workspace};
use jqplay::config::Preferences;
use jqplay::config::theme::Theme;
use jqplay::consts::{RUN_TIMEOUT, STARTUP_TIMEOUT, default_db_path};
use jqplay::engine::EngineSlot;
use jqplay::engine::jq::{JqConfig, JqProcess};
use jqplay::orchestrator::{Orchestrator, OrchestratorConfig};
use jqplay::readiness::{ReadinessGate, TimeoutPolicy};
use jqplay::samples;
use jqplay::spinner::Spinner;
use jqplay::state::RunState;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Policy {
    /// A timed-out engine wait is final until restart
    Sticky,
    /// The next run waits again after a timeout
    Retry,
}

impl From<Policy> for TimeoutPolicy {
    fn from(policy: Policy) -> Self {
        match policy {
            Policy::Sticky => TimeoutPolicy::Sticky,
            Policy::Retry => TimeoutPolicy::Retry,
        }
    }
}

#[derive(Parser)]
#[command(name = "jqplay", version, about = "A jq playground for the terminal.")]
struct Cli {
    /// Filter to start with (empty means the identity filter)
    #[arg(short, long)]
    filter: Option<String>,

    /// Read the input from this file ("-" for stdin)
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Path to the jq executable
    #[arg(long, default_value = "jq")]
    jq: PathBuf,

    /// SQLite database for preferences (use :memory: for ephemeral)
    #[arg(short, long)]
    db: Option<String>,

    /// Seconds a run waits for the engine to load
    #[arg(short, long, default_value_t = RUN_TIMEOUT.as_secs())]
    timeout: u64,

    /// What a timed-out engine wait means for later runs
    #[arg(long, value_enum, default_value_t = Policy::Retry)]
    policy: Policy,

    /// Run once with --filter and --input, print the result, and exit
    #[arg(long, default_value_t = false)]
    once: bool,

    /// Log run progress
    #[arg(short, long, default_value_t = false)]
    verbose: bool,

    /// Log everything
    #[arg(long, default_value_t = false)]
    debug: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.debug);

    let db = match &cli.db {
        Some(db) => db.clone(),
        None => {
            let path = default_db_path();
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create {}", parent.display()))?;
            }
            path.to_string_lossy().into_owned()
        }
    };
    let prefs = Preferences::open(&db)?;
    let theme = prefs.theme()?;

    // The engine loads in the background; runs wait for it through the gate.
    let slot = Arc::new(EngineSlot::new());
    JqProcess::load(
        JqConfig {
            binary: cli.jq.clone(),
        },
        Arc::clone(&slot),
    );
    let gate = Arc::new(ReadinessGate::new(slot).with_policy(cli.policy.into()));
    let orchestrator = Arc::new(Orchestrator::new(
        Arc::clone(&gate),
        Arc::default(),
        OrchestratorConfig {
            engine_timeout: Duration::from_secs(cli.timeout),
        },
    ));

    let mut workspace = Workspace {
        filter: cli.filter.clone().unwrap_or_default(),
        input: String::new(),
        theme,
    };
    if let Some(path) = &cli.input {
        workspace.input = read_input(path).await?;
    }

    if cli.once {
        let finished = orchestrator.run(&workspace.filter, &workspace.input).await;
        if let Some(error) = finished.error {
            eprintln!("error: {error}");
            std::process::exit(1);
        }
        println!("{}", finished.output);
        return Ok(());
    }

    if workspace.filter.is_empty() && workspace.input.is_empty() {
        let sample = samples::prefill();
        workspace.filter = sample.filter.to_string();
        workspace.input = sample.input;
    }

    print_banner(&BannerInfo {
        engine: &cli.jq.display().to_string(),
        policy: match cli.policy {
            Policy::Sticky => "sticky",
            Policy::Retry => "retry",
        },
        theme: theme.token(),
        preferences: &db,
    });

    // Warn early if the engine never shows up; runs still try on their own.
    {
        let gate = Arc::clone(&gate);
        tokio::spawn(async move {
            if gate.await_engine(STARTUP_TIMEOUT).await.is_err() {
                eprintln!("\nfailed to load jq. Check that it is installed or pass --jq <path>.");
            }
        });
    }

    let registry = CommandRegistry::new();
    let save_dir = std::env::current_dir().context("cannot determine working directory")?;

    // REPL — async stdin so Ctrl+C is caught at the prompt too
    let stdin = BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();

    loop {
        print!("\njq> ");
        io::stdout().flush()?;

        let line = tokio::select! {
            result = lines.next_line() => {
                match result {
                    Ok(Some(line)) => line,
                    Ok(None) => {
                        // Ctrl+D (EOF)
                        println!();
                        break;
                    }
                    Err(e) => {
                        eprintln!("input error: {}", e);
                        break;
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                println!();
                break;
            }
        };

        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let mut info = SessionInfo {
            workspace: &mut workspace,
            prefs: &prefs,
            state: orchestrator.state(),
            save_dir: &save_dir,
        };
        match registry.dispatch(line, &mut info).await {
            CommandResult::Handled => continue,
            CommandResult::Quit => break,
            CommandResult::Run => {}
            CommandResult::NotACommand => workspace.filter = line.to_string(),
        }

        run_and_render(&orchestrator, &workspace).await;
    }

    print_session_summary(orchestrator.runs_started());
    Ok(())
}

fn init_tracing(verbose: bool, debug: bool) {
    // --debug > --verbose > RUST_LOG > "warn"
    let filter = if debug {
        EnvFilter::new("debug")
    } else if verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

async fn read_input(path: &Path) -> anyhow::Result<String> {
    if path == Path::new("-") {
        let mut text = String::new();
        tokio::io::stdin()
            .read_to_string(&mut text)
            .await
            .context("failed to read stdin")?;
        return Ok(text);
    }
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))
}

/// Start a run and show its result. The prompt does not start a second run
/// while one is still in flight.
async fn run_and_render(orchestrator: &Arc<Orchestrator>, workspace: &Workspace) {
    if orchestrator.state().snapshot().busy {
        println!("  a run is still in progress");
        return;
    }

    let spinner = Spinner::follow(orchestrator.state().subscribe(), "running jq");
    let task = {
        let orchestrator = Arc::clone(orchestrator);
        let filter = workspace.filter.clone();
        let input = workspace.input.clone();
        tokio::spawn(async move { orchestrator.run(&filter, &input).await })
    };

    // Ctrl+C stops waiting, not the run: it finishes in the background.
    let finished = tokio::select! {
        joined = task => Some(joined),
        _ = tokio::signal::ctrl_c() => None,
    };
    spinner.stop().await;

    match finished {
        Some(Ok(state)) => render(&state, workspace.theme),
        Some(Err(e)) => eprintln!("run task failed: {e}"),
        None => println!("\n  interrupted, the run finishes in the background"),
    }
}

fn render(state: &RunState, theme: Theme) {
    match &state.error {
        Some(error) => eprintln!("{}", theme.paint_error(error)),
        None => println!("{}", theme.paint_output(&state.output)),
    }
}
