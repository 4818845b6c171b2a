//! Monthly tax arithmetic: federal brackets, flat state tax and FICA.
use crate::core::config::{FicaRules, TaxRules};
use crate::core::error::Result;
use crate::core::metrics::round_to;

const MONTHS: f64 = 12.0;

/// A federal bracket converted to monthly figures.
#[derive(Debug, Clone, PartialEq)]
pub struct MonthlyBracket {
    pub lower: f64,
    /// `None` for the open top bracket.
    pub upper: Option<f64>,
    pub rate: f64,
    /// Tax owed on income up to `lower`.
    pub base_tax: f64,
}

impl MonthlyBracket {
    pub fn tax_on(&self, taxable_income: f64) -> f64 {
        (taxable_income - self.lower) * self.rate + self.base_tax
    }

    fn contains(&self, taxable_income: f64) -> bool {
        self.upper.is_none_or(|upper| taxable_income <= upper)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FederalTax {
    pub taxable_income: f64,
    /// Marginal rate of the bracket the taxable income falls in.
    pub high_tax_rate: f64,
    /// Bracket tax minus the child tax credit, rounded to cents. May be negative.
    pub tax: f64,
}

/// The marginal federal schedule, with each bracket's base tax accumulated
/// from the brackets below it. Built only from validated brackets, so the
/// schedule is continuous and covers every income.
#[derive(Debug, Clone)]
pub struct TaxSchedule {
    brackets: Vec<MonthlyBracket>,
}

impl TaxSchedule {
    pub fn from_rules(rules: &TaxRules) -> Result<Self> {
        rules.validate_brackets()?;
        let mut brackets = Vec::with_capacity(rules.brackets.len());
        let mut lower_annual = 0.0;
        let mut base_annual = 0.0;
        for bracket in &rules.brackets {
            brackets.push(MonthlyBracket {
                lower: lower_annual / MONTHS,
                upper: bracket.up_to.map(|up_to| up_to / MONTHS),
                rate: bracket.rate,
                base_tax: base_annual / MONTHS,
            });
            match bracket.up_to {
                Some(up_to) => {
                    base_annual += (up_to - lower_annual) * bracket.rate;
                    lower_annual = up_to;
                }
                None => break,
            }
        }
        Ok(TaxSchedule { brackets })
    }

    pub fn brackets(&self) -> &[MonthlyBracket] {
        &self.brackets
    }

    /// The bracket `taxable_income` falls in; below zero maps to the first bracket.
    pub fn bracket_for(&self, taxable_income: f64) -> Option<&MonthlyBracket> {
        self.brackets
            .iter()
            .find(|b| b.contains(taxable_income))
            .or_else(|| self.brackets.last())
    }
}

/// Taxable income after the standard deduction(s), rounded to cents.
pub fn taxable_income(income: f64, rules: &TaxRules) -> f64 {
    let deduction = rules.standard_deduction / MONTHS * f64::from(rules.filers);
    round_to(income - deduction, 2)
}

pub fn federal_tax(income: f64, rules: &TaxRules) -> Result<FederalTax> {
    let taxable_income = taxable_income(income, rules);
    let schedule = TaxSchedule::from_rules(rules)?;
    let (high_tax_rate, bracket_tax) = schedule
        .bracket_for(taxable_income)
        .map_or((0.0, 0.0), |b| (b.rate, b.tax_on(taxable_income)));
    Ok(FederalTax {
        taxable_income,
        high_tax_rate,
        tax: round_to(bracket_tax - rules.child_tax_credit / MONTHS, 2),
    })
}

pub fn state_tax(income: f64, rules: &TaxRules) -> f64 {
    round_to(rules.state_rate * income, 2)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncomeKind {
    Wages,
    /// Pays both the employee and employer halves of FICA.
    SelfEmployment,
}

impl IncomeKind {
    /// Explicit lists win; otherwise a label naming a payroll keyword is wages.
    pub fn classify(label: &str, fica: &FicaRules) -> Self {
        if fica.self_employed.iter().any(|l| l == label) {
            return IncomeKind::SelfEmployment;
        }
        if fica.wages.iter().any(|l| l == label) {
            return IncomeKind::Wages;
        }
        if fica.payroll_keywords.iter().any(|k| label.contains(k.as_str())) {
            IncomeKind::Wages
        } else {
            IncomeKind::SelfEmployment
        }
    }

    fn multiplier(&self) -> f64 {
        match self {
            IncomeKind::Wages => 1.0,
            IncomeKind::SelfEmployment => 2.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FicaTax {
    pub kind: IncomeKind,
    pub oasdi: f64,
    pub medicare: f64,
}

/// Payroll tax on one earned income stream.
///
/// `income` is the household's total monthly income; it decides whether the
/// additional Medicare rate applies, and on which share of `wages`.
pub fn fica_tax(label: &str, wages: f64, income: f64, fica: &FicaRules) -> FicaTax {
    let wage_base = fica.oasdi_wage_base / MONTHS;
    let oasdi = round_to(wages.min(wage_base) * fica.oasdi_rate, 2);

    let threshold = fica.additional_medicare_threshold / MONTHS;
    let medicare = if income <= threshold {
        round_to(wages * fica.medicare_rate, 2)
    } else {
        let extra_ratio = (income - threshold) / income;
        round_to(
            wages * fica.medicare_rate + wages * extra_ratio * fica.additional_medicare_rate,
            2,
        )
    };

    let kind = IncomeKind::classify(label, fica);
    FicaTax {
        kind,
        oasdi: round_to(oasdi * kind.multiplier(), 2),
        medicare: round_to(medicare * kind.multiplier(), 2),
    }
}
