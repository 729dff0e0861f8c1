pub mod cli;
pub mod core;
pub mod sources;
pub mod store;

use crate::core::config::AppConfig;
use crate::store::disk::DiskStore;
use anyhow::Result;
use std::path::PathBuf;
use tracing::{debug, info};

pub enum AppCommand {
    /// Score the current period and save the recommendation table
    Recommend { input: Option<PathBuf> },
    /// Summarize a saved recommendation table
    Report {
        file: Option<PathBuf>,
        top: usize,
        save: bool,
    },
    /// Describe the transaction export
    Data { input: Option<PathBuf> },
}

pub fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("Repricer starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    match command {
        AppCommand::Recommend { input } => {
            let store = DiskStore::new(&config.output_folder, &config.backup_folder);
            cli::recommend::run(&config, input.as_deref(), &store).map(|_| ())
        }
        AppCommand::Report { file, top, save } => {
            cli::report::run(&config, file.as_deref(), top, save)
        }
        AppCommand::Data { input } => cli::data::run(&config, input.as_deref()),
    }
}
