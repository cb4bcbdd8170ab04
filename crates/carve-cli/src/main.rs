#![forbid(unsafe_code)]

mod cmd;
mod output;

use std::env;
use std::process::ExitCode;

use carve_core::EngineError;
use clap::{Parser, Subcommand};
use output::OutputMode;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "carve: account-to-rep book balancing",
    long_about = None
)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,

    /// Emit JSON output instead of human-readable text.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    fn output_mode(&self) -> OutputMode {
        if self.json {
            OutputMode::Json
        } else {
            OutputMode::Human
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        about = "Run the balancing pipeline over a snapshot",
        after_help = "EXAMPLES:\n    # Optimize all accounts with default config\n    \
                      carve optimize --input snapshot.json\n\n    # Customers only, \
                      machine-readable output\n    carve optimize --input snapshot.json \
                      --batch customer --json"
    )]
    Optimize(cmd::optimize::OptimizeArgs),

    #[command(
        about = "Print the LP text for a snapshot without solving",
        after_help = "EXAMPLES:\n    carve lp --input snapshot.json > problem.lp"
    )]
    Lp(cmd::lp::LpArgs),
}

fn main() -> ExitCode {
    init_tracing();

    let cli = Cli::parse();
    if cli.verbose {
        info!("verbose mode enabled");
    }
    let output = cli.output_mode();

    let result = match cli.command {
        Commands::Optimize(ref args) => cmd::optimize::run_optimize(args, output),
        Commands::Lp(ref args) => cmd::lp::run_lp(args),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::from(exit_code(&err))
        }
    }
}

/// 1 for engine failures (solver, feasibility), 2 for usage and data
/// problems (bad files, bad config, bad snapshot).
fn exit_code(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<EngineError>() {
        Some(
            EngineError::NoEligibleReps
            | EngineError::Infeasible
            | EngineError::TimeoutNoSolution
            | EngineError::SolverFailed { .. }
            | EngineError::SolverUnavailable { .. },
        ) => 1,
        _ => 2,
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("CARVE_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if env::var("DEBUG").is_ok() {
            "carve=debug,info"
        } else {
            "carve=info,warn"
        })
    });
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact().with_writer(std::io::stderr))
        .init();
}
