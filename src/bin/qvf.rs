#![forbid(unsafe_code)]

use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use qvf_core::ahp::{
    check, most_inconsistent_judgments, solve, ComparisonMatrix, ConsistencyConfig,
    ConsistencyResult, JudgmentDeviation, PriorityVector, SolverConfig,
};
use qvf_core::criteria::CriteriaConfig;
use qvf_core::session::{self, RunRequest};

#[derive(Parser)]
#[command(name = "qvf", version, about = "AHP weighting and QVF scoring CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Derive consensus weights and score a batch of work items
    Run {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        out: PathBuf,
    },
    /// Derive consensus weights only
    Weights {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        out: PathBuf,
    },
    /// Consistency of a single comparison matrix, printed to stdout
    Check {
        #[arg(long)]
        input: PathBuf,
        /// How many of the worst judgments to list
        #[arg(long, default_value_t = 3)]
        limit: usize,
        /// Explicit consistency-ratio acceptance threshold
        #[arg(long)]
        threshold: Option<f64>,
    },
    /// Write the default five-criterion preset
    Preset {
        #[arg(long)]
        out: PathBuf,
    },
}

#[derive(Serialize)]
struct CheckReport {
    priorities: PriorityVector,
    consistency: ConsistencyResult,
    converged: bool,
    most_inconsistent: Vec<JudgmentDeviation>,
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();
    match execute(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn execute(command: Commands) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Commands::Run { input, out } => {
            let req: RunRequest = read_json(&input)?;
            let output = session::run_request(req)?;
            write_json(&out, &output)?;
        }
        Commands::Weights { input, out } => {
            let req: RunRequest = read_json(&input)?;
            let derivation = session::weights_request(&req)?;
            write_json(&out, &derivation)?;
        }
        Commands::Check {
            input,
            limit,
            threshold,
        } => {
            let matrix: ComparisonMatrix = read_json(&input)?;
            let cfg = ConsistencyConfig {
                threshold_override: threshold,
            };
            let solution = solve(&matrix, &SolverConfig::default())?;
            let consistency = check(solution.lambda_max, matrix.size(), &cfg);
            let most_inconsistent =
                most_inconsistent_judgments(&matrix, &solution.priorities, limit)?;
            let report = CheckReport {
                priorities: solution.priorities,
                consistency,
                converged: solution.converged,
                most_inconsistent,
            };
            let mut stdout = io::stdout().lock();
            serde_json::to_writer_pretty(&mut stdout, &report)?;
            writeln!(stdout)?;
        }
        Commands::Preset { out } => {
            write_json(&out, &CriteriaConfig::default_preset())?;
        }
    }
    Ok(())
}

fn read_json<T: serde::de::DeserializeOwned>(
    path: &PathBuf,
) -> Result<T, Box<dyn std::error::Error>> {
    let raw = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

fn write_json<T: Serialize>(path: &PathBuf, value: &T) -> Result<(), io::Error> {
    let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
    std::fs::write(path, json)
}
