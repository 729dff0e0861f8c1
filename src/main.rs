use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use repricer::core::log::init_logging;
use std::path::PathBuf;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

impl From<Commands> for repricer::AppCommand {
    fn from(cmd: Commands) -> repricer::AppCommand {
        match cmd {
            Commands::Recommend { input } => repricer::AppCommand::Recommend { input },
            Commands::Report { file, top, save } => {
                repricer::AppCommand::Report { file, top, save }
            }
            Commands::Data { input } => repricer::AppCommand::Data { input },
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Generate weekly pricing recommendations
    Recommend {
        /// Transaction CSV to use instead of the first file in the data folder
        #[arg(short, long)]
        input: Option<PathBuf>,
    },
    /// Summarize saved recommendations
    Report {
        /// Recommendation CSV to summarize instead of the latest output
        #[arg(short, long)]
        file: Option<PathBuf>,
        /// Number of top-priced recommendations to list
        #[arg(short, long, default_value_t = 10)]
        top: usize,
        /// Also write the report as a text file into the output folder
        #[arg(short, long)]
        save: bool,
    },
    /// Display an overview of the transaction data
    Data {
        /// Transaction CSV to use instead of the first file in the data folder
        #[arg(short, long)]
        input: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => repricer::cli::setup::setup(),
        Some(cmd) => repricer::run_command(cmd.into(), cli.config_path.as_deref()),
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
