use crate::BudgetArgs;
use crate::core::config::AppConfig;
use crate::core::{Budget, analyze};
use anyhow::{Context, Result};

/// Prints every computed metric as a JSON object, in the order the stages produced them.
pub fn run(args: &BudgetArgs, config: &AppConfig) -> Result<()> {
    let budget = Budget::load_from_path(&args.name, &args.input)?;
    let analysis = analyze(&budget, &config.tax)
        .with_context(|| format!("Failed to analyze {}", args.input.display()))?;
    let json = serde_json::to_string_pretty(&analysis.metrics)
        .context("Failed to serialize metrics")?;
    println!("{json}");
    Ok(())
}
