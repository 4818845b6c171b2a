//! The budget analysis pipeline.
//!
//! Each stage takes the [`Analysis`] produced so far by value, adds its metrics
//! and flow edges, and hands it back. Stages run in a fixed order because later
//! ones read totals written by earlier ones:
//! income, expenses, taxes, retirement, savings, then the budget-wide ratios.
use crate::core::budget::{Budget, BudgetTree};
use crate::core::config::TaxRules;
use crate::core::error::{BudgetError, Result};
use crate::core::flow::{FlowColor, FlowGraph};
use crate::core::metrics::{MetricValue, Metrics, keys, round_to};
use crate::core::normalize::{display_name, metric_key};
use crate::core::tax;
use tracing::{debug, info, warn};

pub const INCOME: &str = "Income";
pub const EARNED_INCOME: &str = "Earned Income";
pub const PASSIVE_INCOME: &str = "Passive Income";
pub const EXPENSES: &str = "Expenses";
pub const TAXES: &str = "Taxes";
pub const RETIREMENT: &str = "Retirement";
pub const SAVINGS: &str = "Savings";
pub const NET_INCOME: &str = "Net Income";
pub const SUPPLEMENTAL_RETIREMENT: &str = "Supplemental Retirement";
pub const HOME_EXPENSES: &str = "Home Expenses";
pub const VEHICLE_EXPENSES: &str = "Vehicle Expenses";

/// Expense subcategories and the metric each total is stored under.
pub const EXPENSE_CATEGORIES: [(&str, &str); 5] = [
    ("Personal Expenses", keys::PERSONAL_EXPENSES),
    (HOME_EXPENSES, keys::HOME_EXPENSES),
    (VEHICLE_EXPENSES, keys::VEHICLE_EXPENSES),
    ("Insurance Premiums", keys::INSURANCE_PREMIUMS),
    ("Subscriptions", keys::SUBSCRIPTIONS),
];

/// Home expense leaves that make up the total housing payment.
pub const MORTGAGE_PARTS: [&str; 3] = ["Mortgage", "Real Estate Tax", "Homeowners Insurance"];
pub const CAR_LOAN: &str = "Car Loan";

const TOP_EXPENSES_LIMIT: usize = 5;
const EMERGENCY_FUND_MONTHS: f64 = 6.0;
/// Multiple of annual expenses needed at a 4% withdrawal rate.
const FI_MULTIPLE: f64 = 25.0;

/// State threaded through the pipeline: the metrics so far and the flow diagram.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub metrics: Metrics,
    pub flows: FlowGraph,
}

impl Analysis {
    /// Fresh state for one budget: identifying metadata and the seeded node labels.
    pub fn new(budget: &Budget) -> Result<Self> {
        let mut metrics = Metrics::new();
        metrics.insert(keys::NAME, MetricValue::Text(budget.name.clone()))?;
        if let Some(source) = &budget.source {
            metrics.insert(keys::SOURCE, MetricValue::Text(source.clone()))?;
        }
        Ok(Analysis {
            metrics,
            flows: FlowGraph::from_tree(&budget.tree),
        })
    }
}

/// Runs every stage over `budget`.
pub fn analyze(budget: &Budget, rules: &TaxRules) -> Result<Analysis> {
    info!(name = %budget.name, "Analyzing budget");
    let tree = &budget.tree;
    let analysis = Analysis::new(budget)?;
    let analysis = analyze_income(tree, analysis)?;
    let analysis = analyze_expenses(tree, analysis)?;
    let analysis = analyze_taxes(tree, rules, analysis)?;
    let analysis = analyze_retirement(tree, analysis)?;
    let analysis = analyze_savings(tree, analysis)?;
    let analysis = analyze_budget(tree, analysis)?;
    debug!(
        metrics = analysis.metrics.len(),
        nodes = analysis.flows.labels().len(),
        edges = analysis.flows.edges().len(),
        "Analysis complete"
    );
    Ok(analysis)
}

/// Sums earned and passive income, with an edge from each source into its subcategory.
///
/// Earned income sources must be plain amounts since each one is taxed on its own.
pub fn analyze_income(tree: &BudgetTree, mut analysis: Analysis) -> Result<Analysis> {
    let income = tree.group(&[INCOME])?;
    if let Some(earned) = income.optional_group(&[EARNED_INCOME])? {
        if let Some((label, _)) = earned.iter().find(|(_, node)| node.as_amount().is_none()) {
            return Err(BudgetError::ExpectedAmount {
                path: format!("{INCOME}/{EARNED_INCOME}/{label}"),
            });
        }
    }

    let mut subtotal = |label: &str| -> Result<f64> {
        let Some(group) = income.optional_group(&[label])? else {
            debug!("No {label} category");
            return Ok(0.0);
        };
        let total = fan_in(&mut analysis.flows, group, label, FlowColor::Inflow);
        analysis
            .flows
            .add_edge(label, INCOME, total, FlowColor::Inflow);
        Ok(total)
    };
    let earned = subtotal(EARNED_INCOME)?;
    let passive = subtotal(PASSIVE_INCOME)?;

    let metrics = &mut analysis.metrics;
    metrics.insert_amount(keys::EARNED_INCOME, earned)?;
    metrics.insert_amount(keys::PASSIVE_INCOME, passive)?;
    metrics.insert_amount(keys::INCOME, round_to(earned + passive, 2))?;
    debug!(earned, passive, "Income aggregated");
    Ok(analysis)
}

/// Totals the fixed expense subcategories and ranks the largest expenses.
pub fn analyze_expenses(tree: &BudgetTree, mut analysis: Analysis) -> Result<Analysis> {
    let expenses = tree.group(&[EXPENSES])?;

    for (label, _) in expenses.iter() {
        if !EXPENSE_CATEGORIES.iter().any(|(known, _)| *known == label) {
            warn!("Ignoring unknown expense category {label} in totals");
        }
    }

    let mut total = 0.0;
    for (label, key) in EXPENSE_CATEGORIES {
        let subtotal = match expenses.optional_group(&[label])? {
            Some(group) => {
                let subtotal = fan_out(&mut analysis.flows, group, label, FlowColor::Outflow);
                analysis
                    .flows
                    .add_edge(EXPENSES, label, subtotal, FlowColor::Outflow);
                subtotal
            }
            None => {
                debug!("No {label} category");
                0.0
            }
        };
        analysis.metrics.insert_amount(key, subtotal)?;
        total += subtotal;
    }

    let total = round_to(total, 2);
    analysis.metrics.insert_amount(keys::EXPENSES, total)?;
    analysis
        .flows
        .add_edge(INCOME, EXPENSES, total, FlowColor::Outflow);
    analysis.metrics.insert(
        keys::TOP_EXPENSES,
        MetricValue::Ranking(rank_leaves(expenses, Some(TOP_EXPENSES_LIMIT))),
    )?;
    Ok(analysis)
}

/// Federal, state and payroll taxes on the monthly income.
pub fn analyze_taxes(
    tree: &BudgetTree,
    rules: &TaxRules,
    mut analysis: Analysis,
) -> Result<Analysis> {
    let income = positive_income(&analysis.metrics)?;

    let federal = tax::federal_tax(income, rules)?;
    let metrics = &mut analysis.metrics;
    metrics.insert_amount(keys::TAXABLE_INCOME, federal.taxable_income)?;
    metrics.insert_amount(keys::HIGH_TAX_RATE, federal.high_tax_rate)?;
    metrics.insert_amount(keys::FED_INCOME_TAXES, federal.tax)?;
    analysis
        .flows
        .add_edge(TAXES, "Federal Income", federal.tax, FlowColor::Outflow);

    let state = tax::state_tax(income, rules);
    analysis
        .metrics
        .insert_amount(keys::STATE_INCOME_TAXES, state)?;
    analysis
        .flows
        .add_edge(TAXES, "State Income", state, FlowColor::Outflow);

    let mut oasdi_total = 0.0;
    let mut medicare_total = 0.0;
    if let Some(earned) = tree.optional_group(&[INCOME, EARNED_INCOME])? {
        for (label, node) in earned.iter() {
            let wages = node.as_amount().ok_or_else(|| BudgetError::ExpectedAmount {
                path: format!("{INCOME}/{EARNED_INCOME}/{label}"),
            })?;
            let fica = tax::fica_tax(label, wages, income, &rules.fica);
            debug!(label, kind = ?fica.kind, oasdi = fica.oasdi, medicare = fica.medicare, "Payroll tax");
            oasdi_total += fica.oasdi;
            medicare_total += fica.medicare;

            let oasdi_key = format!("{}_oasdi_tax", metric_key(label));
            let med_key = format!("{}_med_tax", metric_key(label));
            analysis.metrics.insert_amount(&oasdi_key, fica.oasdi)?;
            analysis.metrics.insert_amount(&med_key, fica.medicare)?;
            analysis.flows.add_edge(
                TAXES,
                &display_name(&oasdi_key),
                fica.oasdi,
                FlowColor::Outflow,
            );
            analysis.flows.add_edge(
                TAXES,
                &display_name(&med_key),
                fica.medicare,
                FlowColor::Outflow,
            );
        }
    }

    let oasdi = round_to(oasdi_total, 2);
    let medicare = round_to(medicare_total, 2);
    let fica = round_to(oasdi + medicare, 2);
    let taxes = round_to(federal.tax + state + oasdi + medicare, 2);

    let metrics = &mut analysis.metrics;
    metrics.insert_amount(keys::OASDI_TAX, oasdi)?;
    metrics.insert_amount(keys::MED_TAX, medicare)?;
    metrics.insert_amount(keys::FICA_TAXES, fica)?;
    metrics.insert_amount(keys::TAXES, taxes)?;
    analysis
        .flows
        .add_edge(INCOME, TAXES, taxes, FlowColor::Outflow);

    let metrics = &mut analysis.metrics;
    metrics.insert_amount(keys::EFFECTIVE_FED_TAX_RATE, round_to(federal.tax / income, 6))?;
    metrics.insert_amount(keys::EFFECTIVE_STATE_TAX_RATE, round_to(state / income, 6))?;
    metrics.insert_amount(keys::EFFECTIVE_FICA_TAX_RATE, round_to(fica / income, 6))?;
    metrics.insert_amount(keys::EFFECTIVE_TAX_RATE, round_to(taxes / income, 6))?;
    debug!(taxes, "Taxes computed");
    Ok(analysis)
}

/// Retirement contributions and the retirement savings rate.
///
/// The rate also counts `Savings/Supplemental Retirement`, which must exist.
pub fn analyze_retirement(tree: &BudgetTree, mut analysis: Analysis) -> Result<Analysis> {
    let income = positive_income(&analysis.metrics)?;
    let retirement = tree.group(&[RETIREMENT])?;

    let total = fan_out(&mut analysis.flows, retirement, RETIREMENT, FlowColor::Reserve);
    analysis.metrics.insert_amount(keys::RETIREMENT, total)?;
    analysis
        .flows
        .add_edge(INCOME, RETIREMENT, total, FlowColor::Reserve);

    let supplemental = tree.amount(&[SAVINGS, SUPPLEMENTAL_RETIREMENT])?;
    analysis.metrics.insert_amount(
        keys::RETIRE_SAVINGS_RATE,
        round_to((total + supplemental) / income, 6),
    )?;
    Ok(analysis)
}

/// Savings contributions plus every savings leaf ranked by amount.
pub fn analyze_savings(tree: &BudgetTree, mut analysis: Analysis) -> Result<Analysis> {
    let savings = tree.group(&[SAVINGS])?;

    let total = fan_out(&mut analysis.flows, savings, SAVINGS, FlowColor::Reserve);
    analysis.metrics.insert_amount(keys::SAVINGS, total)?;
    analysis
        .flows
        .add_edge(INCOME, SAVINGS, total, FlowColor::Reserve);
    analysis.metrics.insert(
        keys::TOP_SAVINGS,
        MetricValue::Ranking(rank_leaves(savings, None)),
    )?;
    Ok(analysis)
}

/// Budget-wide figures derived from the category totals.
pub fn analyze_budget(tree: &BudgetTree, mut analysis: Analysis) -> Result<Analysis> {
    let metrics = &analysis.metrics;
    let income = positive_income(metrics)?;
    let expenses = metrics.amount(keys::EXPENSES)?;
    let taxes = metrics.amount(keys::TAXES)?;
    let retirement = metrics.amount(keys::RETIREMENT)?;
    let savings = metrics.amount(keys::SAVINGS)?;

    let net_income = round_to(income - expenses - taxes - retirement - savings, 2);
    let discretionary = round_to((income - taxes - expenses - retirement).max(0.0), 2);

    let mut total_mortgage = 0.0;
    for part in MORTGAGE_PARTS {
        total_mortgage += tree.amount(&[EXPENSES, HOME_EXPENSES, part])?;
    }
    let total_mortgage = round_to(total_mortgage, 2);
    let car_loan = tree.amount(&[EXPENSES, VEHICLE_EXPENSES, CAR_LOAN])?;
    let total_debt = round_to(total_mortgage + car_loan, 2);

    let metrics = &mut analysis.metrics;
    metrics.insert_amount(keys::NET_INCOME, net_income)?;
    metrics.insert_amount(keys::DISCRETIONARY_INCOME, discretionary)?;

    let annual_income = round_to(income * 12.0, 2);
    let annualized = [
        (keys::ANNUAL_EXPENSES, keys::ANNUAL_EXPENSES_PRCT, expenses),
        (keys::ANNUAL_TAXES, keys::ANNUAL_TAXES_PRCT, taxes),
        (keys::ANNUAL_RETIREMENT, keys::ANNUAL_RETIREMENT_PRCT, retirement),
        (keys::ANNUAL_SAVINGS, keys::ANNUAL_SAVINGS_PRCT, savings),
        (keys::ANNUAL_NET_INCOME, keys::ANNUAL_NET_INCOME_PRCT, net_income),
    ];
    metrics.insert_amount(keys::ANNUAL_INCOME, annual_income)?;
    for (key, _, monthly) in annualized {
        metrics.insert_amount(key, round_to(monthly * 12.0, 2))?;
    }
    for (key, share_key, _) in annualized {
        let annual = metrics.amount(key)?;
        metrics.insert_amount(share_key, round_to(annual / annual_income, 6))?;
    }

    metrics.insert_amount(keys::TOTAL_MORTGAGE, total_mortgage)?;
    metrics.insert_amount(
        keys::MORTGAGE_INCOME_RATIO,
        round_to(total_mortgage / income * 100.0, 6),
    )?;
    metrics.insert_amount(keys::TOTAL_DEBT, total_debt)?;
    metrics.insert_amount(
        keys::DEBT_INCOME_RATIO,
        round_to(total_debt / income * 100.0, 6),
    )?;
    metrics.insert_amount(
        keys::EMERGENCY_FUND,
        round_to(expenses * EMERGENCY_FUND_MONTHS, 2),
    )?;
    metrics.insert_amount(
        keys::SAVINGS_RATE,
        round_to((savings + retirement) / income, 6),
    )?;
    metrics.insert_amount(keys::FI_NUMBER, round_to(expenses * 12.0 * FI_MULTIPLE, 2))?;

    analysis
        .flows
        .add_edge(INCOME, NET_INCOME, net_income, FlowColor::Inflow);
    Ok(analysis)
}

fn positive_income(metrics: &Metrics) -> Result<f64> {
    let income = metrics.amount(keys::INCOME)?;
    if income > 0.0 {
        Ok(income)
    } else {
        Err(BudgetError::InvalidIncome(income))
    }
}

/// Edge from every child of `group` into `target`; returns the rounded sum.
fn fan_in(flows: &mut FlowGraph, group: &BudgetTree, target: &str, color: FlowColor) -> f64 {
    let mut total = 0.0;
    for (label, node) in group.iter() {
        let value = node.total();
        flows.add_edge(label, target, value, color);
        total += value;
    }
    round_to(total, 2)
}

/// Edge from `source` to every child of `group`; returns the rounded sum.
fn fan_out(flows: &mut FlowGraph, group: &BudgetTree, source: &str, color: FlowColor) -> f64 {
    let mut total = 0.0;
    for (label, node) in group.iter() {
        let value = node.total();
        flows.add_edge(source, label, value, color);
        total += value;
    }
    round_to(total, 2)
}

/// Every leaf under `group`, largest first. A label seen twice keeps its first
/// position and its last value. Equal amounts keep traversal order.
pub fn rank_leaves(group: &BudgetTree, limit: Option<usize>) -> Vec<(String, f64)> {
    let mut flat: Vec<(String, f64)> = Vec::new();
    for (label, value) in group.leaves() {
        match flat.iter_mut().find(|(existing, _)| existing == label) {
            Some((_, slot)) => *slot = value,
            None => flat.push((label.to_string(), value)),
        }
    }
    flat.sort_by(|(_, a), (_, b)| b.total_cmp(a));
    if let Some(limit) = limit {
        flat.truncate(limit);
    }
    flat
}
