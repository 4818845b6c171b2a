//! The budget tree: an ordered, nested mapping of category labels to amounts.
use crate::core::error::{BudgetError, Result, join_path};
use crate::core::normalize;
use anyhow::Context;
use serde_yaml::Value;
use std::path::Path;
use tracing::debug;

/// Top-level wrappers that hold the actual budget in a document.
const DOCUMENT_ROOTS: [&str; 2] = ["Montly Budget", "Monthly Budget"];

#[derive(Debug, Clone, PartialEq)]
pub enum BudgetNode {
    Amount(f64),
    Group(BudgetTree),
}

impl BudgetNode {
    /// Sum of every amount at or below this node.
    pub fn total(&self) -> f64 {
        match self {
            BudgetNode::Amount(value) => *value,
            BudgetNode::Group(tree) => tree.leaves().map(|(_, v)| v).sum(),
        }
    }

    pub fn as_amount(&self) -> Option<f64> {
        match self {
            BudgetNode::Amount(value) => Some(*value),
            BudgetNode::Group(_) => None,
        }
    }

    pub fn as_group(&self) -> Option<&BudgetTree> {
        match self {
            BudgetNode::Group(tree) => Some(tree),
            BudgetNode::Amount(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct BudgetTree {
    entries: Vec<(String, BudgetNode)>,
}

impl BudgetTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a child. Labels are expected to be unique within one level.
    pub fn push(&mut self, label: impl Into<String>, node: BudgetNode) {
        self.entries.push((label.into(), node));
    }

    pub fn with_amount(mut self, label: &str, value: f64) -> Self {
        self.push(label, BudgetNode::Amount(value));
        self
    }

    pub fn with_group(mut self, label: &str, tree: BudgetTree) -> Self {
        self.push(label, BudgetNode::Group(tree));
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, label: &str) -> bool {
        self.get(label).is_some()
    }

    pub fn get(&self, label: &str) -> Option<&BudgetNode> {
        self.entries
            .iter()
            .find(|(key, _)| key == label)
            .map(|(_, node)| node)
    }

    /// Direct children in stored order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &BudgetNode)> {
        self.entries.iter().map(|(key, node)| (key.as_str(), node))
    }

    /// Depth-first, parent-before-children traversal of every node.
    pub fn walk(&self) -> Walk<'_> {
        Walk {
            stack: vec![self.entries.iter()],
        }
    }

    /// Every numeric leaf at any depth, in traversal order.
    pub fn leaves(&self) -> impl Iterator<Item = (&str, f64)> {
        self.walk()
            .filter_map(|(key, node)| node.as_amount().map(|value| (key, value)))
    }

    /// Resolves a nested category, failing with the full path when any step is absent.
    pub fn group(&self, path: &[&str]) -> Result<&BudgetTree> {
        let mut current = self;
        for (depth, label) in path.iter().enumerate() {
            let node = current
                .get(label)
                .ok_or_else(|| BudgetError::missing(&path[..=depth]))?;
            current = node.as_group().ok_or_else(|| BudgetError::ExpectedGroup {
                path: join_path(&path[..=depth]),
            })?;
        }
        Ok(current)
    }

    /// Resolves a numeric leaf by path.
    pub fn amount(&self, path: &[&str]) -> Result<f64> {
        let (leaf, parents) = path
            .split_last()
            .ok_or_else(|| BudgetError::missing(path))?;
        let node = self
            .group(parents)?
            .get(leaf)
            .ok_or_else(|| BudgetError::missing(path))?;
        node.as_amount().ok_or_else(|| BudgetError::ExpectedAmount {
            path: join_path(path),
        })
    }

    /// Like [`BudgetTree::group`], but an absent category is `None` rather than an error.
    pub fn optional_group(&self, path: &[&str]) -> Result<Option<&BudgetTree>> {
        match self.group(path) {
            Ok(tree) => Ok(Some(tree)),
            Err(BudgetError::MissingCategory { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Builds a tree from a parsed YAML mapping, keeping the document's key order.
    pub fn from_yaml(value: &Value) -> Result<Self> {
        from_yaml_at(value, &mut Vec::new())
    }
}

fn from_yaml_at(value: &Value, path: &mut Vec<String>) -> Result<BudgetTree> {
    let mapping = match value {
        Value::Mapping(mapping) => mapping,
        Value::Tagged(tagged) => return from_yaml_at(&tagged.value, path),
        _ if path.is_empty() => {
            return Err(BudgetError::ExpectedGroup {
                path: "<document root>".to_string(),
            });
        }
        _ => {
            return Err(BudgetError::ExpectedGroup {
                path: path.join("/"),
            });
        }
    };

    let mut tree = BudgetTree::new();
    for (key, value) in mapping {
        let label = match key {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            other => {
                return Err(BudgetError::NonNumeric {
                    path: path.join("/"),
                    found: format!("unsupported key {}", describe(other)),
                });
            }
        };
        path.push(label.clone());
        let node = match value {
            Value::Mapping(_) | Value::Tagged(_) => BudgetNode::Group(from_yaml_at(value, path)?),
            Value::Number(n) => {
                let amount = n.as_f64().filter(|v| v.is_finite()).ok_or_else(|| {
                    BudgetError::NonNumeric {
                        path: path.join("/"),
                        found: n.to_string(),
                    }
                })?;
                if amount < 0.0 {
                    return Err(BudgetError::NegativeAmount {
                        path: path.join("/"),
                        value: amount,
                    });
                }
                BudgetNode::Amount(amount)
            }
            other => {
                return Err(BudgetError::NonNumeric {
                    path: path.join("/"),
                    found: describe(other),
                });
            }
        };
        path.pop();
        tree.push(label, node);
    }
    Ok(tree)
}

fn describe(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::String(s) => format!("\"{s}\""),
        Value::Sequence(_) => "a list".to_string(),
        Value::Number(n) => n.to_string(),
        Value::Mapping(_) => "a mapping".to_string(),
        Value::Tagged(tagged) => format!("tagged value {}", tagged.tag),
    }
}

/// Lazy depth-first iterator returned by [`BudgetTree::walk`].
pub struct Walk<'a> {
    stack: Vec<std::slice::Iter<'a, (String, BudgetNode)>>,
}

impl<'a> Iterator for Walk<'a> {
    type Item = (&'a str, &'a BudgetNode);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let next = self.stack.last_mut()?.next();
            match next {
                Some((key, node)) => {
                    if let BudgetNode::Group(tree) = node {
                        self.stack.push(tree.entries.iter());
                    }
                    return Some((key.as_str(), node));
                }
                None => {
                    self.stack.pop();
                }
            }
        }
    }
}

/// A loaded budget: normalized tree plus identifying metadata.
#[derive(Debug, Clone)]
pub struct Budget {
    pub name: String,
    pub source: Option<String>,
    pub tree: BudgetTree,
}

impl Budget {
    /// Parses a YAML document, normalizes its keys and unwraps the document root.
    pub fn from_yaml_str(name: &str, source: Option<String>, yaml: &str) -> anyhow::Result<Self> {
        let value: Value = serde_yaml::from_str(yaml).context("Failed to parse budget YAML")?;
        let raw = BudgetTree::from_yaml(&value)?;
        let normalized = normalize::normalize(&raw)?;
        let tree = unwrap_document_root(normalized);
        debug!(categories = tree.len(), "Loaded budget tree");
        Ok(Budget {
            name: name.to_string(),
            source,
            tree,
        })
    }

    pub fn load_from_path<P: AsRef<Path>>(name: &str, path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read budget file: {}", path.display()))?;
        Self::from_yaml_str(name, Some(path.display().to_string()), &content)
            .with_context(|| format!("Failed to load budget file: {}", path.display()))
    }
}

fn unwrap_document_root(tree: BudgetTree) -> BudgetTree {
    let is_wrapped = tree.len() == 1
        && matches!(
            tree.entries.first(),
            Some((label, BudgetNode::Group(_))) if DOCUMENT_ROOTS.contains(&label.as_str())
        );
    if !is_wrapped {
        return tree;
    }
    match tree.entries.into_iter().next() {
        Some((_, BudgetNode::Group(inner))) => inner,
        _ => BudgetTree::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> BudgetTree {
        BudgetTree::new()
            .with_group(
                "Income",
                BudgetTree::new().with_group(
                    "Earned Income",
                    BudgetTree::new()
                        .with_amount("Jordan Salary", 5000.0)
                        .with_amount("Taylor Salary", 3000.0),
                ),
            )
            .with_group(
                "Savings",
                BudgetTree::new().with_group(
                    "Education",
                    BudgetTree::new().with_amount("529 Plan", 200.0),
                ),
            )
    }

    #[test]
    fn test_walk_lists_parent_before_children() {
        let tree = sample();
        let labels: Vec<&str> = tree.walk().map(|(k, _)| k).collect();
        assert_eq!(
            labels,
            vec![
                "Income",
                "Earned Income",
                "Jordan Salary",
                "Taylor Salary",
                "Savings",
                "Education",
                "529 Plan",
            ]
        );
    }

    #[test]
    fn test_walk_is_restartable() {
        let tree = sample();
        assert_eq!(tree.walk().count(), tree.walk().count());
        assert_eq!(tree.leaves().count(), 3);
    }

    #[test]
    fn test_lookup_reports_full_missing_path() {
        let tree = sample();
        assert_eq!(
            tree.amount(&["Income", "Earned Income", "Jordan Salary"]),
            Ok(5000.0)
        );
        let err = tree
            .amount(&["Savings", "Supplemental Retirement"])
            .unwrap_err();
        assert_eq!(
            err,
            BudgetError::MissingCategory {
                path: "Savings/Supplemental Retirement".to_string()
            }
        );
        let err = tree.group(&["Income", "Earned Income", "Jordan Salary"]).unwrap_err();
        assert!(matches!(err, BudgetError::ExpectedGroup { .. }));
        assert!(tree.optional_group(&["Retirement"]).unwrap().is_none());
    }

    #[test]
    fn test_group_total_sums_nested_leaves() {
        let tree = sample();
        assert_eq!(tree.get("Income").unwrap().total(), 8000.0);
        assert_eq!(tree.get("Savings").unwrap().total(), 200.0);
    }

    #[test]
    fn test_from_yaml_keeps_order_and_rejects_bad_leaves() {
        let value: Value = serde_yaml::from_str(
            r#"
income:
  earned_income:
    zed_salary: 10
    abe_bonus: 20.5
"#,
        )
        .unwrap();
        let tree = BudgetTree::from_yaml(&value).unwrap();
        let leaves: Vec<(&str, f64)> = tree.leaves().collect();
        assert_eq!(leaves, vec![("zed_salary", 10.0), ("abe_bonus", 20.5)]);

        let value: Value = serde_yaml::from_str("income:\n  salary: lots\n").unwrap();
        let err = BudgetTree::from_yaml(&value).unwrap_err();
        assert_eq!(
            err,
            BudgetError::NonNumeric {
                path: "income/salary".to_string(),
                found: "\"lots\"".to_string()
            }
        );

        let value: Value = serde_yaml::from_str("income:\n  salary: -5\n").unwrap();
        let err = BudgetTree::from_yaml(&value).unwrap_err();
        assert!(matches!(err, BudgetError::NegativeAmount { .. }));
    }

    #[test]
    fn test_document_root_is_unwrapped() {
        let budget = Budget::from_yaml_str(
            "test",
            None,
            "montly_budget:\n  income:\n    earned_income:\n      salary: 100\n",
        )
        .unwrap();
        assert!(budget.tree.contains("Income"));
        assert_eq!(
            budget.tree.amount(&["Income", "Earned Income", "Salary"]),
            Ok(100.0)
        );
    }
}
