//! Key normalization between raw document keys, display labels and metric keys.
use crate::core::budget::{BudgetNode, BudgetTree};
use crate::core::error::{BudgetError, Result};

/// Converts a raw key such as `jordan_salary` into the display label `Jordan Salary`.
///
/// Underscores become spaces and every word is title-cased: a letter is
/// upper-cased when it follows a character that is not a letter, and
/// lower-cased otherwise. `401k` therefore becomes `401K`.
pub fn display_name(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut prev_is_letter = false;
    for ch in raw.chars() {
        let ch = if ch == '_' { ' ' } else { ch };
        if ch.is_alphabetic() {
            if prev_is_letter {
                out.extend(ch.to_lowercase());
            } else {
                out.extend(ch.to_uppercase());
            }
            prev_is_letter = true;
        } else {
            out.push(ch);
            prev_is_letter = false;
        }
    }
    out
}

/// Converts a display label into a snake_case metric key (`Jordan Salary` -> `jordan_salary`).
pub fn metric_key(label: &str) -> String {
    label.replace(' ', "_").to_lowercase()
}

/// Returns a copy of `tree` with every key, at every depth, converted by [`display_name`].
pub fn normalize(tree: &BudgetTree) -> Result<BudgetTree> {
    normalize_at(tree, &mut Vec::new())
}

fn normalize_at(tree: &BudgetTree, path: &mut Vec<String>) -> Result<BudgetTree> {
    let mut out = BudgetTree::new();
    for (key, node) in tree.iter() {
        let label = display_name(key);
        path.push(label.clone());
        if out.contains(&label) {
            return Err(BudgetError::DuplicateCategory {
                path: path.join("/"),
            });
        }
        let node = match node {
            BudgetNode::Amount(value) => BudgetNode::Amount(*value),
            BudgetNode::Group(child) => BudgetNode::Group(normalize_at(child, path)?),
        };
        path.pop();
        out.push(label, node);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name() {
        assert_eq!(display_name("jordan_salary"), "Jordan Salary");
        assert_eq!(display_name("EARNED_INCOME"), "Earned Income");
        assert_eq!(display_name("real estate tax"), "Real Estate Tax");
        assert_eq!(display_name("401k"), "401K");
        assert_eq!(display_name("hsa"), "Hsa");
        assert_eq!(display_name("Already Pretty"), "Already Pretty");
    }

    #[test]
    fn test_metric_key() {
        assert_eq!(metric_key("Taylor Business"), "taylor_business");
        assert_eq!(
            display_name(&format!("{}_oasdi_tax", metric_key("Taylor Business"))),
            "Taylor Business Oasdi Tax"
        );
    }

    #[test]
    fn test_normalize_is_recursive_and_pure() {
        let raw = BudgetTree::new().with_group(
            "income",
            BudgetTree::new().with_group(
                "passive_income",
                BudgetTree::new().with_amount("bank_interest", 12.5),
            ),
        );
        let pretty = normalize(&raw).unwrap();
        assert_eq!(
            pretty.amount(&["Income", "Passive Income", "Bank Interest"]),
            Ok(12.5)
        );
        // input untouched
        assert!(raw.contains("income"));
        assert!(!raw.contains("Income"));
    }

    #[test]
    fn test_normalize_rejects_colliding_keys() {
        let raw = BudgetTree::new()
            .with_amount("car_loan", 1.0)
            .with_amount("Car Loan", 2.0);
        let err = normalize(&raw).unwrap_err();
        assert_eq!(
            err,
            BudgetError::DuplicateCategory {
                path: "Car Loan".to_string()
            }
        );
    }
}
