use crate::core::error::BudgetError;
use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};
use tracing::debug;

/// One federal bracket. `up_to` is the annual upper bound; `None` is the open top bracket.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct BracketConfig {
    pub up_to: Option<f64>,
    pub rate: f64,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct FicaRules {
    pub oasdi_rate: f64,
    /// Annual OASDI wage base.
    pub oasdi_wage_base: f64,
    pub medicare_rate: f64,
    pub additional_medicare_rate: f64,
    /// Annual income above which the additional Medicare rate applies.
    pub additional_medicare_threshold: f64,
    /// Earned income labels containing any of these are treated as wages.
    pub payroll_keywords: Vec<String>,
    /// Labels always treated as wages.
    pub wages: Vec<String>,
    /// Labels always treated as self-employment income.
    pub self_employed: Vec<String>,
}

impl Default for FicaRules {
    fn default() -> Self {
        FicaRules {
            oasdi_rate: 0.062,
            oasdi_wage_base: 147_000.0,
            medicare_rate: 0.0145,
            additional_medicare_rate: 0.009,
            additional_medicare_threshold: 250_000.0,
            payroll_keywords: vec!["Salary".to_string(), "Bonus".to_string()],
            wages: Vec::new(),
            self_employed: Vec::new(),
        }
    }
}

/// Tax year parameters. All money figures are annual.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct TaxRules {
    pub standard_deduction: f64,
    /// Number of standard deductions taken (2 for a joint return).
    pub filers: u32,
    pub brackets: Vec<BracketConfig>,
    pub child_tax_credit: f64,
    pub state_rate: f64,
    pub fica: FicaRules,
}

impl Default for TaxRules {
    fn default() -> Self {
        let bracket = |up_to: Option<f64>, rate: f64| BracketConfig { up_to, rate };
        TaxRules {
            standard_deduction: 12_550.0,
            filers: 2,
            brackets: vec![
                bracket(Some(20_550.0), 0.10),
                bracket(Some(83_550.0), 0.12),
                bracket(Some(178_150.0), 0.22),
                bracket(Some(340_100.0), 0.24),
                bracket(Some(431_900.0), 0.32),
                bracket(Some(647_850.0), 0.35),
                bracket(None, 0.37),
            ],
            child_tax_credit: 2_000.0,
            state_rate: 0.0455,
            fica: FicaRules::default(),
        }
    }
}

impl TaxRules {
    /// Brackets must be non-empty with strictly increasing positive bounds, a
    /// single open bracket in last place, and every rate within `[0, 1]`.
    pub fn validate_brackets(&self) -> std::result::Result<(), BudgetError> {
        let invalid = |msg: String| Err(BudgetError::InvalidBrackets(msg));
        let Some((last, bounded)) = self.brackets.split_last() else {
            return invalid("at least one bracket is required".to_string());
        };
        if last.up_to.is_some() {
            return invalid("the last bracket must have no upper bound".to_string());
        }
        let mut previous = 0.0;
        for (i, bracket) in bounded.iter().enumerate() {
            let Some(up_to) = bracket.up_to else {
                return invalid(format!(
                    "bracket {} has no upper bound but is not the last",
                    i + 1
                ));
            };
            if !up_to.is_finite() || up_to <= previous {
                return invalid(format!(
                    "bracket {} ends at {up_to}, which must be greater than {previous}",
                    i + 1
                ));
            }
            previous = up_to;
        }
        if let Some((i, bracket)) = self
            .brackets
            .iter()
            .enumerate()
            .find(|(_, b)| !(0.0..=1.0).contains(&b.rate))
        {
            return invalid(format!(
                "bracket {} has rate {}, expected a fraction between 0 and 1",
                i + 1,
                bracket.rate
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub tax: TaxRules,
    /// Directory the report folder is created in.
    pub output_dir: Option<String>,
}

impl AppConfig {
    /// Loads the config from the default location, falling back to defaults when absent.
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        if !config_path.exists() {
            debug!(
                "No config at {}, using built-in tax rules",
                config_path.display()
            );
            return Ok(Self::default());
        }
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("", "", "budgetflow")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        config
            .tax
            .validate_brackets()
            .with_context(|| format!("Invalid config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_deserialization() {
        let yaml_str = r#"
output_dir: "/tmp/budgets"
tax:
  state_rate: 0.05
  fica:
    payroll_keywords: ["Salary", "Wages"]
    self_employed: ["Jordan Salary"]
"#;

        let config: AppConfig = serde_yaml::from_str(yaml_str).expect("Failed to deserialize");
        assert_eq!(config.output_dir.as_deref(), Some("/tmp/budgets"));
        assert_eq!(config.tax.state_rate, 0.05);
        // untouched fields keep the built-in values
        assert_eq!(config.tax.standard_deduction, 12_550.0);
        assert_eq!(config.tax.brackets.len(), 7);
        assert_eq!(config.tax.fica.oasdi_wage_base, 147_000.0);
        assert_eq!(
            config.tax.fica.payroll_keywords,
            vec!["Salary".to_string(), "Wages".to_string()]
        );
        assert_eq!(config.tax.fica.self_employed, vec!["Jordan Salary".to_string()]);
    }

    #[test]
    fn test_empty_config_is_default() {
        let config: AppConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config.tax, TaxRules::default());
        assert!(config.output_dir.is_none());
    }

    #[test]
    fn test_brackets_override() {
        let yaml_str = r#"
tax:
  brackets:
    - up_to: 10000
      rate: 0.1
    - rate: 0.2
"#;
        let config: AppConfig = serde_yaml::from_str(yaml_str).unwrap();
        assert_eq!(
            config.tax.brackets,
            vec![
                BracketConfig {
                    up_to: Some(10_000.0),
                    rate: 0.1
                },
                BracketConfig {
                    up_to: None,
                    rate: 0.2
                },
            ]
        );
    }

    fn rules_with(brackets: Vec<BracketConfig>) -> TaxRules {
        TaxRules {
            brackets,
            ..TaxRules::default()
        }
    }

    fn bracket(up_to: Option<f64>, rate: f64) -> BracketConfig {
        BracketConfig { up_to, rate }
    }

    fn bracket_error(rules: &TaxRules) -> String {
        match rules.validate_brackets() {
            Err(BudgetError::InvalidBrackets(msg)) => msg,
            other => panic!("expected invalid brackets, got {other:?}"),
        }
    }

    #[test]
    fn test_default_brackets_are_valid() {
        assert_eq!(TaxRules::default().validate_brackets(), Ok(()));
        let single = rules_with(vec![bracket(None, 0.2)]);
        assert_eq!(single.validate_brackets(), Ok(()));
    }

    #[test]
    fn test_empty_brackets_rejected() {
        let msg = bracket_error(&rules_with(vec![]));
        assert!(msg.contains("at least one bracket"));
    }

    #[test]
    fn test_bounds_must_increase() {
        let rules = rules_with(vec![
            bracket(Some(100_000.0), 0.10),
            bracket(Some(50_000.0), 0.20),
            bracket(None, 0.30),
        ]);
        assert!(bracket_error(&rules).starts_with("bracket 2 ends at 50000"));

        let repeated = rules_with(vec![
            bracket(Some(100_000.0), 0.10),
            bracket(Some(100_000.0), 0.20),
            bracket(None, 0.30),
        ]);
        assert!(bracket_error(&repeated).starts_with("bracket 2"));

        let zero = rules_with(vec![bracket(Some(0.0), 0.10), bracket(None, 0.30)]);
        assert!(bracket_error(&zero).starts_with("bracket 1"));
    }

    #[test]
    fn test_open_bracket_must_be_last_and_only() {
        let middle = rules_with(vec![
            bracket(Some(10_000.0), 0.10),
            bracket(None, 0.20),
            bracket(None, 0.30),
        ]);
        assert!(bracket_error(&middle).contains("bracket 2 has no upper bound"));

        let closed = rules_with(vec![bracket(Some(10_000.0), 0.10)]);
        assert!(bracket_error(&closed).contains("last bracket"));
    }

    #[test]
    fn test_rates_must_be_fractions() {
        let percent = rules_with(vec![bracket(Some(10_000.0), 10.0), bracket(None, 0.2)]);
        assert!(bracket_error(&percent).starts_with("bracket 1 has rate 10"));
        let negative = rules_with(vec![bracket(None, -0.1)]);
        assert!(bracket_error(&negative).starts_with("bracket 1 has rate"));
    }

    #[test]
    fn test_load_from_path_rejects_bad_brackets() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "tax:
  brackets: []
").unwrap();
        let err = AppConfig::load_from_path(&path).unwrap_err();
        assert!(
            err.chain()
                .any(|cause| cause.downcast_ref::<BudgetError>().is_some()),
            "{err:#}"
        );
    }

    #[test]
    fn test_load_from_path_missing_file_errors() {
        let result = AppConfig::load_from_path("/nonexistent/budgetflow/config.yaml");
        assert!(result.is_err());
    }
}
