use anyhow::Result;
use budgetflow::core::BudgetError;
use budgetflow::core::log::init_logging;
use budgetflow::{AppCommand, BudgetArgs};
use clap::{Args, CommandFactory, Parser, Subcommand};
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

#[derive(Args)]
struct InputArgs {
    /// YAML file containing the monthly budget
    #[arg(short, long)]
    input: PathBuf,

    /// Name of the budget
    #[arg(short, long, default_value = "Untitled Budget")]
    name: String,
}

impl From<InputArgs> for BudgetArgs {
    fn from(args: InputArgs) -> BudgetArgs {
        BudgetArgs {
            input: args.input,
            name: args.name,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Analyze a budget and write the report and flow diagram
    Analyze {
        #[command(flatten)]
        input: InputArgs,

        /// Directory to write the budget report folder into
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Only print the summary, do not write any files
        #[arg(long)]
        no_files: bool,
    },
    /// Print all computed metrics as JSON
    Metrics {
        #[command(flatten)]
        input: InputArgs,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => budgetflow::cli::setup::setup(),
        Some(Commands::Analyze {
            input,
            output,
            no_files,
        }) => budgetflow::run_command(
            AppCommand::Analyze {
                budget: input.into(),
                output,
                write_files: !no_files,
            },
            cli.config_path.as_deref(),
        ),
        Some(Commands::Metrics { input }) => budgetflow::run_command(
            AppCommand::Metrics {
                budget: input.into(),
            },
            cli.config_path.as_deref(),
        ),
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
        let structural = e
            .chain()
            .filter_map(|cause| cause.downcast_ref::<BudgetError>())
            .any(BudgetError::is_structural);
        if structural {
            eprintln!(
                "hint: a budget needs Income, Expenses, Retirement and Savings categories, see docs/example_budget.yaml"
            );
        }
    }
    result
}
