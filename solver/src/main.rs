use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use pipelink::{Grid, SolverConfig, Solver};
use thiserror::Error;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Solve a Numberlink or Flow Free puzzle from a definition file and print the filled grid.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Puzzle definition: grid rows, then `wall X Y DIRECTION` lines.
    definition: PathBuf,

    /// Reject routes which pass next to their own endpoint without entering it.
    #[arg(long)]
    check_deviation: bool,

    /// Only check formations on complete routes.
    #[arg(long)]
    no_inline_pruning: bool,

    /// Log solver progress to stderr. `RUST_LOG` takes precedence.
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Error)]
enum CliError {
    #[error("could not read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error(transparent)]
    Pipelink(#[from] pipelink::Error),
}

fn run(args: &Args) -> Result<Option<Grid>, CliError> {
    let text = fs::read_to_string(&args.definition)
        .map_err(|source| CliError::Read { path: args.definition.clone(), source })?;
    let grid: Grid = text.parse().map_err(pipelink::Error::from)?;

    let config = SolverConfig {
        check_deviation: args.check_deviation,
        inline_pruning: !args.no_inline_pruning,
    };
    let mut solver = Solver::new(grid, config);
    let solved = solver.solve().map_err(pipelink::Error::from)?;
    info!(stats = ?solver.stats(), "done");

    Ok(solved.then(|| solver.into_grid()))
}

fn main() -> ExitCode {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_level.into()))
        .with_writer(std::io::stderr)
        .init();

    match run(&args) {
        Ok(Some(grid)) => {
            print!("{grid}");
            ExitCode::SUCCESS
        }
        Ok(None) => {
            println!("no solution found");
            ExitCode::from(1)
        }
        Err(error) => {
            error!(%error, "solve failed");
            eprintln!("error: {error}");
            ExitCode::from(2)
        }
    }
}
