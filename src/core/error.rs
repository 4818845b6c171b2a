//! Error types for the budget analysis engine

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum BudgetError {
    #[error("Missing category: {path}")]
    MissingCategory { path: String },

    #[error("Expected an amount at {path}, found a category")]
    ExpectedAmount { path: String },

    #[error("Expected a category at {path}, found an amount")]
    ExpectedGroup { path: String },

    #[error("Non-numeric value at {path}: {found}")]
    NonNumeric { path: String, found: String },

    #[error("Negative amount at {path}: {value}")]
    NegativeAmount { path: String, value: f64 },

    #[error("Duplicate category after normalization: {path}")]
    DuplicateCategory { path: String },

    #[error("Invalid income: {0} (income must be positive)")]
    InvalidIncome(f64),

    #[error("Metric not computed yet: {0}")]
    MissingMetric(String),

    #[error("Metric already recorded: {0}")]
    MetricOverwrite(String),

    #[error("Invalid tax brackets: {0}")]
    InvalidBrackets(String),
}

impl BudgetError {
    pub fn missing(path: &[&str]) -> Self {
        Self::MissingCategory {
            path: join_path(path),
        }
    }

    /// Check if this is a structural lookup failure
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Self::MissingCategory { .. } | Self::ExpectedAmount { .. } | Self::ExpectedGroup { .. }
        )
    }
}

pub fn join_path(path: &[&str]) -> String {
    path.join("/")
}

pub type Result<T> = std::result::Result<T, BudgetError>;
