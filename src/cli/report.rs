//! Markdown report rendered from the metrics map through `templates/report.md`.
use super::ui::{format_money, format_ratio};
use crate::core::error::Result;
use crate::core::metrics::{Metrics, keys};
use askama::Template;

/// Category line of the overview table.
pub struct ShareRow {
    pub label: &'static str,
    pub monthly: String,
    pub annual: String,
    pub share: String,
}

pub struct RateRow {
    pub label: String,
    pub monthly: String,
    pub rate: String,
}

pub struct AmountRow {
    pub label: String,
    pub amount: String,
}

/// Report values, already formatted for display.
#[derive(Template)]
#[template(path = "report.md", escape = "none")]
pub struct BudgetReport {
    pub name: String,
    pub source: String,
    pub overview: Vec<ShareRow>,
    pub income: String,
    pub earned_income: String,
    pub passive_income: String,
    pub discretionary_income: String,
    pub taxable_income: String,
    pub high_tax_rate: String,
    pub taxes: Vec<RateRow>,
    pub total_taxes: String,
    pub effective_tax_rate: String,
    pub expenses: Vec<AmountRow>,
    pub top_expenses: Vec<AmountRow>,
    pub retirement: String,
    pub savings: String,
    pub savings_rate: String,
    pub retire_savings_rate: String,
    pub top_savings: Vec<AmountRow>,
    pub total_mortgage: String,
    pub mortgage_income_ratio: String,
    pub total_debt: String,
    pub debt_income_ratio: String,
    pub emergency_fund: String,
    pub fi_number: String,
}

impl BudgetReport {
    /// Collects every value the report shows; fails if a stage did not run.
    pub fn from_metrics(metrics: &Metrics) -> Result<Self> {
        let money = |key: &str| metrics.amount(key).map(format_money);
        let ratio = |key: &str| metrics.amount(key).map(format_ratio);
        // already scaled to percent
        let percent = |key: &str| metrics.amount(key).map(|v| format!("{v:.2}%"));
        let ranking = |key: &str| -> Result<Vec<AmountRow>> {
            Ok(metrics
                .ranking(key)?
                .iter()
                .map(|(label, amount)| AmountRow {
                    label: label.clone(),
                    amount: format_money(*amount),
                })
                .collect())
        };

        let mut overview = vec![ShareRow {
            label: "Income",
            monthly: money(keys::INCOME)?,
            annual: money(keys::ANNUAL_INCOME)?,
            share: format_ratio(1.0),
        }];
        let shares = [
            ("Taxes", keys::TAXES, keys::ANNUAL_TAXES, keys::ANNUAL_TAXES_PRCT),
            ("Expenses", keys::EXPENSES, keys::ANNUAL_EXPENSES, keys::ANNUAL_EXPENSES_PRCT),
            ("Retirement", keys::RETIREMENT, keys::ANNUAL_RETIREMENT, keys::ANNUAL_RETIREMENT_PRCT),
            ("Savings", keys::SAVINGS, keys::ANNUAL_SAVINGS, keys::ANNUAL_SAVINGS_PRCT),
            ("Net Income", keys::NET_INCOME, keys::ANNUAL_NET_INCOME, keys::ANNUAL_NET_INCOME_PRCT),
        ];
        for (label, monthly, annual, share) in shares {
            overview.push(ShareRow {
                label,
                monthly: money(monthly)?,
                annual: money(annual)?,
                share: ratio(share)?,
            });
        }

        let taxes = vec![
            RateRow {
                label: "Federal income".to_string(),
                monthly: money(keys::FED_INCOME_TAXES)?,
                rate: ratio(keys::EFFECTIVE_FED_TAX_RATE)?,
            },
            RateRow {
                label: "State income".to_string(),
                monthly: money(keys::STATE_INCOME_TAXES)?,
                rate: ratio(keys::EFFECTIVE_STATE_TAX_RATE)?,
            },
            RateRow {
                label: format!(
                    "FICA (OASDI {}, Medicare {})",
                    money(keys::OASDI_TAX)?,
                    money(keys::MED_TAX)?
                ),
                monthly: money(keys::FICA_TAXES)?,
                rate: ratio(keys::EFFECTIVE_FICA_TAX_RATE)?,
            },
        ];

        let expense_rows = [
            ("Personal", keys::PERSONAL_EXPENSES),
            ("Home", keys::HOME_EXPENSES),
            ("Vehicle", keys::VEHICLE_EXPENSES),
            ("Insurance premiums", keys::INSURANCE_PREMIUMS),
            ("Subscriptions", keys::SUBSCRIPTIONS),
        ];
        let mut expenses = Vec::with_capacity(expense_rows.len());
        for (label, key) in expense_rows {
            expenses.push(AmountRow {
                label: label.to_string(),
                amount: money(key)?,
            });
        }

        Ok(BudgetReport {
            name: metrics.text(keys::NAME).unwrap_or_default().to_string(),
            source: metrics.text(keys::SOURCE).unwrap_or("n/a").to_string(),
            overview,
            income: money(keys::INCOME)?,
            earned_income: money(keys::EARNED_INCOME)?,
            passive_income: money(keys::PASSIVE_INCOME)?,
            discretionary_income: money(keys::DISCRETIONARY_INCOME)?,
            taxable_income: money(keys::TAXABLE_INCOME)?,
            high_tax_rate: ratio(keys::HIGH_TAX_RATE)?,
            taxes,
            total_taxes: money(keys::TAXES)?,
            effective_tax_rate: ratio(keys::EFFECTIVE_TAX_RATE)?,
            expenses,
            top_expenses: ranking(keys::TOP_EXPENSES)?,
            retirement: money(keys::RETIREMENT)?,
            savings: money(keys::SAVINGS)?,
            savings_rate: ratio(keys::SAVINGS_RATE)?,
            retire_savings_rate: ratio(keys::RETIRE_SAVINGS_RATE)?,
            top_savings: ranking(keys::TOP_SAVINGS)?,
            total_mortgage: money(keys::TOTAL_MORTGAGE)?,
            mortgage_income_ratio: percent(keys::MORTGAGE_INCOME_RATIO)?,
            total_debt: money(keys::TOTAL_DEBT)?,
            debt_income_ratio: percent(keys::DEBT_INCOME_RATIO)?,
            emergency_fund: money(keys::EMERGENCY_FUND)?,
            fi_number: money(keys::FI_NUMBER)?,
        })
    }
}

/// File-system friendly form of a budget name: `Smith Family` -> `smith_family`.
pub fn slug(name: &str) -> String {
    name.trim().replace(' ', "_").to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::TaxRules;
    use crate::core::error::BudgetError;
    use crate::core::{Budget, analyze};

    const BUDGET: &str = r#"
Income:
  Earned Income:
    Jordan Salary: 10000
    Taylor Business: 2000
  Passive Income:
    Dividends: 100
Expenses:
  Personal Expenses:
    Groceries: 800
  Home Expenses:
    Mortgage: 2000
    Real Estate Tax: 300
    Homeowners Insurance: 100
  Vehicle Expenses:
    Car Loan: 400
    Fuel: 100
  Insurance Premiums:
    Life Insurance: 50
  Subscriptions:
    Streaming: 20
Retirement:
  Jordan 401K: 1000
Savings:
  Supplemental Retirement: 500
  Brokerage: 300
"#;

    fn report() -> BudgetReport {
        let budget = Budget::from_yaml_str("Smith", None, BUDGET).unwrap();
        let analysis = analyze(&budget, &TaxRules::default()).unwrap();
        BudgetReport::from_metrics(&analysis.metrics).unwrap()
    }

    #[test]
    fn test_values_are_formatted_by_kind() {
        let report = report();
        assert_eq!(report.income, "$12,100.00");
        assert_eq!(report.savings_rate, "14.88%");
        assert_eq!(report.debt_income_ratio, "23.14%");
        assert_eq!(report.high_tax_rate, "22.00%");
        assert_eq!(report.source, "n/a");
        assert_eq!(report.overview[0].share, "100.00%");
        assert_eq!(report.overview.len(), 6);
        assert_eq!(
            report.taxes[2].label,
            "FICA (OASDI $868.00, Medicare $203.00)"
        );
    }

    #[test]
    fn test_render_lists_rankings() {
        let text = report().render().unwrap();
        assert!(text.starts_with("# Smith Monthly Budget Report"));
        assert!(text.contains("| Income | $12,100.00 | $145,200.00 | 100.00% |\n| Taxes |"));
        assert!(text.contains("- Mortgage: $2,000.00\n- Groceries: $800.00\n"));
        assert!(text.contains("- Brokerage: $300.00\n\n## Debt"));
        assert!(text.contains("| **Total** | **$2,926.22** |"));
        assert!(!text.contains("{{") && !text.contains("{%"));
    }

    #[test]
    fn test_markdown_is_not_html_escaped() {
        let budget = Budget::from_yaml_str("Smith & Jones", None, BUDGET).unwrap();
        let analysis = analyze(&budget, &TaxRules::default()).unwrap();
        let text = BudgetReport::from_metrics(&analysis.metrics)
            .unwrap()
            .render()
            .unwrap();
        assert!(text.starts_with("# Smith & Jones Monthly Budget Report"));
    }

    #[test]
    fn test_missing_stage_is_an_error() {
        let budget = Budget::from_yaml_str("Smith", None, BUDGET).unwrap();
        let analysis = crate::core::Analysis::new(&budget).unwrap();
        assert_eq!(
            BudgetReport::from_metrics(&analysis.metrics).err(),
            Some(BudgetError::MissingMetric("income".to_string()))
        );
    }

    #[test]
    fn test_slug() {
        assert_eq!(slug("Smith Family"), "smith_family");
        assert_eq!(slug("Untitled Budget"), "untitled_budget");
    }
}
