use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use serde_json::json;
use tracing::{error, info};
use willflow::{
    AuthError, Directory, DraftingWorkspace, RunPhase, RunnerConfig, SeedError, SeedSet, Session, UserRole,
    WorkspaceError,
};

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("auth: {0}")]
    Auth(#[from] AuthError),
    #[error("seed data: {0}")]
    Seed(#[from] SeedError),
    #[error(transparent)]
    Workspace(#[from] WorkspaceError),
    #[error("invalid JSON output: {0}")]
    Json(#[from] serde_json::Error),
    #[error("generation ended without completing ({0:?})")]
    Incomplete(RunPhase),
}

#[derive(Parser, Debug)]
#[command(name = "willflow", about = "Simulated will-draft generation and suggestion review")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sign in, run the staged generation, then apply review decisions.
    Run(RunArgs),
    /// Print the built-in seed set as JSON.
    Seeds,
}

#[derive(Args, Debug)]
struct RunArgs {
    #[arg(long, env = "WILLFLOW_EMAIL", default_value = "solicitor@demo.com")]
    email: String,

    #[arg(long, env = "WILLFLOW_PASSWORD", default_value = "demo")]
    password: String,

    /// Switch the session to this role before opening the workspace.
    #[arg(long)]
    role: Option<String>,

    #[arg(long, default_value = "Sarah Thompson")]
    client: String,

    /// JSON seed file; the built-in fixtures are used when absent.
    #[arg(long)]
    seeds: Option<PathBuf>,

    /// Overrides `WILLFLOW_TIME_SCALE`.
    #[arg(long)]
    time_scale: Option<f64>,

    /// Overrides `WILLFLOW_STAGE_GAP_MS`.
    #[arg(long)]
    stage_gap_ms: Option<u64>,

    /// Suggestion ids to accept, in order.
    #[arg(long = "accept")]
    accept: Vec<String>,

    /// Suggestion ids to reject, applied after accepts.
    #[arg(long = "reject")]
    reject: Vec<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let result = match cli.command {
        Command::Run(args) => run(args).await,
        Command::Seeds => print_seeds(),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "willflow failed");
            ExitCode::FAILURE
        }
    }
}

fn print_seeds() -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(&SeedSet::builtin())?);
    Ok(())
}

async fn run(args: RunArgs) -> Result<(), CliError> {
    let directory = Directory::demo();
    let mut session = Session::login(&directory, &args.email, &args.password)?;
    if let Some(role) = &args.role {
        session.switch_role(&directory, role.parse::<UserRole>()?)?;
    }

    let seeds = match &args.seeds {
        Some(path) => SeedSet::from_path(path)?,
        None => SeedSet::builtin(),
    };

    let mut config = RunnerConfig::from_env();
    if let Some(scale) = args.time_scale {
        config = config.with_time_scale(scale);
    }
    if let Some(gap_ms) = args.stage_gap_ms {
        config = config.with_stage_gap(Duration::from_millis(gap_ms));
    }

    let mut workspace = DraftingWorkspace::open(&session, seeds, config, args.client.as_str())?;
    workspace.generate();
    watch_progress(&workspace).await;

    let phase = workspace.runner().phase();
    if phase != RunPhase::Completed {
        return Err(CliError::Incomplete(phase));
    }

    let board = workspace.board_mut();
    for id in &args.accept {
        board.accept(id);
    }
    for id in &args.reject {
        board.reject(id);
    }

    let summary = board.summary();
    let output = json!({
        "client": workspace.client_name(),
        "reviewer": workspace.reviewer(),
        "summary": summary,
        "completion_percent": workspace.board().completion_percent(),
        "accepted_edits": workspace.board().regenerate(),
    });
    println!("{}", serde_json::to_string_pretty(&output)?);

    session.logout();
    Ok(())
}

/// Log each stage transition until the run leaves the running phase.
async fn watch_progress(workspace: &DraftingWorkspace) {
    let runner = workspace.runner();
    let mut rx = runner.subscribe();
    let mut seen = 0;

    loop {
        let state = rx.borrow_and_update().clone();
        for transition in state.history().iter().skip(seen) {
            info!(
                stage = %transition.stage_id,
                status = %transition.to,
                at_ms = transition.at.as_millis(),
                progress = %format!("{:.0}%", runner.progress_percent()),
                "stage update"
            );
        }
        seen = state.history().len();
        if state.phase() != RunPhase::Running {
            break;
        }
        if rx.changed().await.is_err() {
            break;
        }
    }

    info!(elapsed = %runner.elapsed_label(), total = %runner.total_label(), "generation finished");
}
