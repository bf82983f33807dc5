mod commands;
mod helpers;

use clap::Parser;
use localwl_core::{ConfigError, OrderError};

pub fn run_from_env() -> i32 {
    let args: Vec<String> = std::env::args().collect();
    match parse_and_dispatch(args) {
        Ok(code) => code,
        Err(error) => {
            let order_error = error.as_order_error();
            eprintln!("{}", order_error.diagnostic_line());
            order_error.exit_code()
        }
    }
}

fn parse_and_dispatch(args: Vec<String>) -> Result<i32, CliError> {
    match Cli::try_parse_from(&args) {
        Ok(cli) => {
            helpers::init_tracing(cli.verbose);
            dispatch_parsed(cli.command)
        }
        Err(err) => match err.kind() {
            clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion => {
                print!("{}", err);
                Ok(0)
            }
            _ => Err(CliError::Usage(err.to_string())),
        },
    }
}

#[derive(Parser)]
#[command(
    name = "localwl",
    version,
    about = "Local Steinhardt Wl bond-order parameters for periodic particle systems"
)]
struct Cli {
    /// Log at debug level (overrides RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: CliCommand,
}

#[derive(clap::Subcommand)]
enum CliCommand {
    /// Evaluate a generated face-centered cubic crystal
    Lattice(commands::LatticeArgs),
    /// Evaluate a frame read from a JSON document
    Compute(commands::ComputeArgs),
}

fn dispatch_parsed(command: CliCommand) -> Result<i32, CliError> {
    match command {
        CliCommand::Lattice(args) => commands::run_lattice_command(args),
        CliCommand::Compute(args) => commands::run_compute_command(args),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("{0}")]
    Usage(String),
    #[error("{0}")]
    Compute(#[from] OrderError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl CliError {
    fn as_order_error(&self) -> OrderError {
        match self {
            Self::Usage(message) => {
                OrderError::input_validation("INPUT.CLI_USAGE", message.trim_end().to_string())
            }
            Self::Compute(error) => error.clone(),
            Self::Config(error @ ConfigError::Read { .. }) => {
                OrderError::io_system("IO.CONFIG_READ", error.to_string())
            }
            Self::Config(error @ ConfigError::Parse { .. }) => {
                OrderError::input_validation("INPUT.CONFIG_PARSE", error.to_string())
            }
            Self::Internal(error) if is_io_failure(error) => {
                OrderError::io_system("IO.CLI", format!("{error:#}"))
            }
            Self::Internal(error) => OrderError::internal("INTERNAL.CLI", format!("{error:#}")),
        }
    }
}

fn is_io_failure(error: &anyhow::Error) -> bool {
    error.chain().any(|cause| cause.is::<std::io::Error>())
}
