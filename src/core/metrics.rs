//! The metrics map filled in by each analysis stage.
use crate::core::error::{BudgetError, Result};
use rust_decimal::prelude::*;
use serde::ser::{Serialize, SerializeMap, Serializer};

/// Well-known metric keys.
pub mod keys {
    pub const NAME: &str = "name";
    pub const SOURCE: &str = "source";

    pub const EARNED_INCOME: &str = "earned_income";
    pub const PASSIVE_INCOME: &str = "passive_income";
    pub const INCOME: &str = "income";

    pub const PERSONAL_EXPENSES: &str = "personal_expenses";
    pub const HOME_EXPENSES: &str = "home_expenses";
    pub const VEHICLE_EXPENSES: &str = "vehicle_expenses";
    pub const INSURANCE_PREMIUMS: &str = "insurance_premiums";
    pub const SUBSCRIPTIONS: &str = "subscriptions";
    pub const EXPENSES: &str = "expenses";
    pub const TOP_EXPENSES: &str = "top_expenses";

    pub const TAXABLE_INCOME: &str = "taxable_income";
    pub const HIGH_TAX_RATE: &str = "high_tax_rate";
    pub const FED_INCOME_TAXES: &str = "fed_income_taxes";
    pub const STATE_INCOME_TAXES: &str = "state_income_taxes";
    pub const OASDI_TAX: &str = "oasdi_tax";
    pub const MED_TAX: &str = "med_tax";
    pub const FICA_TAXES: &str = "fica_taxes";
    pub const TAXES: &str = "taxes";
    pub const EFFECTIVE_FED_TAX_RATE: &str = "effective_fed_tax_rate";
    pub const EFFECTIVE_STATE_TAX_RATE: &str = "effective_state_tax_rate";
    pub const EFFECTIVE_FICA_TAX_RATE: &str = "effective_fica_tax_rate";
    pub const EFFECTIVE_TAX_RATE: &str = "effective_tax_rate";

    pub const RETIREMENT: &str = "retirement";
    pub const RETIRE_SAVINGS_RATE: &str = "retire_savings_rate";
    pub const SAVINGS: &str = "savings";
    pub const TOP_SAVINGS: &str = "top_savings";

    pub const NET_INCOME: &str = "net_income";
    pub const DISCRETIONARY_INCOME: &str = "discretionary_income";
    pub const ANNUAL_INCOME: &str = "annual_income";
    pub const ANNUAL_EXPENSES: &str = "annual_expenses";
    pub const ANNUAL_TAXES: &str = "annual_taxes";
    pub const ANNUAL_RETIREMENT: &str = "annual_retirement";
    pub const ANNUAL_SAVINGS: &str = "annual_savings";
    pub const ANNUAL_NET_INCOME: &str = "annual_net_income";
    pub const ANNUAL_EXPENSES_PRCT: &str = "annual_expenses_prct";
    pub const ANNUAL_TAXES_PRCT: &str = "annual_taxes_prct";
    pub const ANNUAL_RETIREMENT_PRCT: &str = "annual_retirement_prct";
    pub const ANNUAL_SAVINGS_PRCT: &str = "annual_savings_prct";
    pub const ANNUAL_NET_INCOME_PRCT: &str = "annual_net_income_prct";
    pub const TOTAL_MORTGAGE: &str = "total_mortgage";
    pub const MORTGAGE_INCOME_RATIO: &str = "mortgage_income_ratio";
    pub const TOTAL_DEBT: &str = "total_debt";
    pub const DEBT_INCOME_RATIO: &str = "debt_income_ratio";
    pub const EMERGENCY_FUND: &str = "emergency_fund";
    pub const SAVINGS_RATE: &str = "savings_rate";
    pub const FI_NUMBER: &str = "fi_number";
}

/// Rounds half away from zero to `dp` decimal places.
pub fn round_to(value: f64, dp: u32) -> f64 {
    Decimal::from_f64(value)
        .map(|d| d.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero))
        .and_then(|d| d.to_f64())
        .unwrap_or(value)
}

#[derive(Debug, Clone, PartialEq)]
pub enum MetricValue {
    Amount(f64),
    /// Labelled amounts, largest first.
    Ranking(Vec<(String, f64)>),
    Text(String),
}

/// Insertion-ordered metric name to value map.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Metrics {
    entries: Vec<(String, MetricValue)>,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a new metric. Each key is written by exactly one stage, so a second
    /// write is an error.
    pub fn insert(&mut self, key: &str, value: MetricValue) -> Result<()> {
        if self.get(key).is_some() {
            return Err(BudgetError::MetricOverwrite(key.to_string()));
        }
        self.entries.push((key.to_string(), value));
        Ok(())
    }

    pub fn insert_amount(&mut self, key: &str, value: f64) -> Result<()> {
        self.insert(key, MetricValue::Amount(value))
    }

    pub fn get(&self, key: &str) -> Option<&MetricValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Reads a numeric metric written by an earlier stage.
    pub fn amount(&self, key: &str) -> Result<f64> {
        match self.get(key) {
            Some(MetricValue::Amount(value)) => Ok(*value),
            _ => Err(BudgetError::MissingMetric(key.to_string())),
        }
    }

    pub fn ranking(&self, key: &str) -> Result<&[(String, f64)]> {
        match self.get(key) {
            Some(MetricValue::Ranking(items)) => Ok(items.as_slice()),
            _ => Err(BudgetError::MissingMetric(key.to_string())),
        }
    }

    pub fn text(&self, key: &str) -> Option<&str> {
        match self.get(key) {
            Some(MetricValue::Text(text)) => Some(text.as_str()),
            _ => None,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &MetricValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

struct RankingMap<'a>(&'a [(String, f64)]);

impl Serialize for RankingMap<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (label, value) in self.0 {
            map.serialize_entry(label, value)?;
        }
        map.end()
    }
}

impl Serialize for MetricValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            MetricValue::Amount(value) => serializer.serialize_f64(*value),
            MetricValue::Ranking(items) => RankingMap(items).serialize(serializer),
            MetricValue::Text(text) => serializer.serialize_str(text),
        }
    }
}

impl Serialize for Metrics {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}
