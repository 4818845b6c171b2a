pub mod cli;
pub mod core;

use crate::core::config::AppConfig;
use anyhow::Result;
use std::path::PathBuf;
use tracing::{debug, info};

/// Options shared by the commands that analyze a budget file.
#[derive(Debug, Clone)]
pub struct BudgetArgs {
    pub input: PathBuf,
    pub name: String,
}

pub enum AppCommand {
    /// Print a summary and write the report, flow data and diagram.
    Analyze {
        budget: BudgetArgs,
        output: Option<PathBuf>,
        write_files: bool,
    },
    /// Print the metrics map as JSON.
    Metrics { budget: BudgetArgs },
}

pub fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("Budget analyzer starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    match command {
        AppCommand::Analyze {
            budget,
            output,
            write_files,
        } => cli::analyze::run(&budget, output.as_deref(), write_files, &config),
        AppCommand::Metrics { budget } => cli::metrics::run(&budget, &config),
    }
}
