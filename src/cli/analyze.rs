use super::diagram::FlowDocument;
use super::report;
use super::ui;
use crate::BudgetArgs;
use crate::core::config::AppConfig;
use crate::core::metrics::keys;
use crate::core::{Analysis, Budget, Metrics, analyze};
use anyhow::{Context, Result};
use askama::Template;
use comfy_table::Cell;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

impl Analysis {
    /// Terminal summary: where the money goes, the biggest expenses, and the key ratios.
    pub fn display_as_table(&self, name: &str) -> Result<String> {
        let metrics = &self.metrics;
        let income = metrics.amount(keys::INCOME)?;

        let mut overview = ui::new_styled_table();
        overview.set_header(vec![
            ui::header_cell("Category"),
            ui::header_cell("Monthly"),
            ui::header_cell("Annual"),
            ui::header_cell("Share of Income"),
        ]);
        let rows = [
            ("Income", keys::INCOME),
            ("Taxes", keys::TAXES),
            ("Expenses", keys::EXPENSES),
            ("Retirement", keys::RETIREMENT),
            ("Savings", keys::SAVINGS),
            ("Net Income", keys::NET_INCOME),
        ];
        for (label, key) in rows {
            let monthly = metrics.amount(key)?;
            overview.add_row(vec![
                Cell::new(label),
                ui::money_cell(monthly),
                ui::money_cell(monthly * 12.0),
                ui::format_percentage_cell(monthly / income),
            ]);
        }

        let mut taxes = ui::new_styled_table();
        taxes.set_header(vec![
            ui::header_cell("Tax"),
            ui::header_cell("Monthly"),
            ui::header_cell("Effective Rate"),
        ]);
        let tax_rows = [
            ("Federal", keys::FED_INCOME_TAXES, keys::EFFECTIVE_FED_TAX_RATE),
            ("State", keys::STATE_INCOME_TAXES, keys::EFFECTIVE_STATE_TAX_RATE),
            ("FICA", keys::FICA_TAXES, keys::EFFECTIVE_FICA_TAX_RATE),
            ("Total", keys::TAXES, keys::EFFECTIVE_TAX_RATE),
        ];
        for (label, key, rate_key) in tax_rows {
            taxes.add_row(vec![
                Cell::new(label),
                ui::money_cell(metrics.amount(key)?),
                ui::format_percentage_cell(metrics.amount(rate_key)?),
            ]);
        }

        let mut output = format!(
            "Budget: {}\n\n",
            ui::style_text(name, ui::StyleType::Title)
        );
        output.push_str(&overview.to_string());
        output.push_str("\n\n");
        output.push_str(&taxes.to_string());
        output.push_str(&format!(
            "\nMarginal federal rate: {}",
            ui::format_ratio(metrics.amount(keys::HIGH_TAX_RATE)?)
        ));
        output.push_str("\n\n");
        output.push_str(&ranking_table("Top Expenses", metrics, keys::TOP_EXPENSES)?);
        output.push_str("\n\n");
        output.push_str(&ranking_table("Savings", metrics, keys::TOP_SAVINGS)?);
        output.push_str("\n\n");

        let net_income = metrics.amount(keys::NET_INCOME)?;
        let net_style = if net_income < 0.0 {
            ui::StyleType::Error
        } else {
            ui::StyleType::TotalValue
        };
        output.push_str(&format!(
            "{} {}\n",
            ui::style_text("Left over each month:", ui::StyleType::TotalLabel),
            ui::style_text(&ui::format_money(net_income), net_style)
        ));
        output.push_str(&format!(
            "{} {}\n",
            ui::style_text("Savings rate:", ui::StyleType::TotalLabel),
            ui::style_text(
                &ui::format_ratio(metrics.amount(keys::SAVINGS_RATE)?),
                ui::StyleType::TotalValue
            )
        ));
        output.push_str(&ui::style_text(
            &format!(
                "Mortgage/income {:.2}% | Debt/income {:.2}% | Emergency fund {} | FI number {}",
                metrics.amount(keys::MORTGAGE_INCOME_RATIO)?,
                metrics.amount(keys::DEBT_INCOME_RATIO)?,
                ui::format_money(metrics.amount(keys::EMERGENCY_FUND)?),
                ui::format_money(metrics.amount(keys::FI_NUMBER)?),
            ),
            ui::StyleType::Subtle,
        ));
        Ok(output)
    }
}

fn ranking_table(title: &str, metrics: &Metrics, key: &str) -> Result<String> {
    let mut table = ui::new_styled_table();
    table.set_header(vec![ui::header_cell(title), ui::header_cell("Monthly")]);
    for (label, value) in metrics.ranking(key)? {
        table.add_row(vec![Cell::new(label), ui::money_cell(*value)]);
    }
    Ok(table.to_string())
}

/// Output folder for a budget: `<dir>/<slug>_budget`, where `dir` is the
/// command line value, then the configured directory, then the working directory.
pub fn output_folder(output: Option<&Path>, config: &AppConfig, name: &str) -> PathBuf {
    let base = output
        .map(Path::to_path_buf)
        .or_else(|| config.output_dir.as_ref().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("."));
    base.join(format!("{}_budget", report::slug(name)))
}

/// Writes the markdown report, flow JSON and Sankey page; returns the folder used.
pub fn write_outputs(
    analysis: &Analysis,
    name: &str,
    output: Option<&Path>,
    config: &AppConfig,
) -> Result<PathBuf> {
    let folder = output_folder(output, config, name);
    fs::create_dir_all(&folder)
        .with_context(|| format!("Failed to create directory: {}", folder.display()))?;
    let slug = report::slug(name);

    let markdown = report::BudgetReport::from_metrics(&analysis.metrics)
        .context("Failed to collect report values")?
        .render()
        .context("Failed to render budget report")?;
    let report_path = folder.join(format!("{slug}_budget_report.md"));
    fs::write(&report_path, markdown)
        .with_context(|| format!("Failed to write {}", report_path.display()))?;
    info!("Wrote report to {}", report_path.display());

    let (json_path, html_path) = FlowDocument::new(name, &analysis.flows).write(&folder, &slug)?;
    info!("Wrote flow data to {}", json_path.display());
    info!("Wrote flow diagram to {}", html_path.display());
    Ok(folder)
}

pub fn run(
    args: &BudgetArgs,
    output: Option<&Path>,
    write_files: bool,
    config: &AppConfig,
) -> Result<()> {
    let budget = Budget::load_from_path(&args.name, &args.input)?;
    let analysis = analyze(&budget, &config.tax)
        .with_context(|| format!("Failed to analyze {}", args.input.display()))?;

    println!("{}", analysis.display_as_table(&budget.name)?);

    if write_files {
        let folder = write_outputs(&analysis, &budget.name, output, config)?;
        ui::print_separator();
        println!(
            "{}",
            ui::style_text(
                &format!("Files written to {}", folder.display()),
                ui::StyleType::Subtle
            )
        );
    }
    Ok(())
}
