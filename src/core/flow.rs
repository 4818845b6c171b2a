//! Flow edges between budget categories, shaped for a Sankey diagram.
use crate::core::budget::BudgetTree;
use serde::Serialize;
use std::collections::HashMap;
use tracing::debug;

/// Visual grouping of a flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FlowColor {
    /// Money arriving: income sources and the leftover net income.
    Inflow,
    /// Money leaving: taxes and expenses.
    Outflow,
    /// Money set aside: retirement and savings.
    Reserve,
}

impl FlowColor {
    pub fn rgba(&self) -> &'static str {
        match self {
            FlowColor::Inflow => "rgba(0,255,0,0.3)",
            FlowColor::Outflow => "rgba(255,0,0,0.3)",
            FlowColor::Reserve => "rgba(28,67,68,0.3)",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlowEdge {
    pub source: usize,
    pub target: usize,
    pub value: f64,
    pub color: FlowColor,
}

/// Ordered, duplicate-free node labels plus the edges that reference them by position.
#[derive(Debug, Clone, Default)]
pub struct FlowGraph {
    labels: Vec<String>,
    index: HashMap<String, usize>,
    edges: Vec<FlowEdge>,
}

impl FlowGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the label list with every category of `tree`, in depth-first order.
    pub fn from_tree(tree: &BudgetTree) -> Self {
        let mut graph = Self::new();
        for (label, _) in tree.walk() {
            graph.node(label);
        }
        debug!(nodes = graph.labels.len(), "Seeded flow graph labels");
        graph
    }

    /// Returns the position of `label`, appending it on first sight.
    pub fn node(&mut self, label: &str) -> usize {
        if let Some(&position) = self.index.get(label) {
            return position;
        }
        let position = self.labels.len();
        self.labels.push(label.to_string());
        self.index.insert(label.to_string(), position);
        position
    }

    /// Records a flow. Repeated pairs stay separate edges; negative values are drawn as 0.
    pub fn add_edge(&mut self, source: &str, target: &str, value: f64, color: FlowColor) {
        let source = self.node(source);
        let target = self.node(target);
        let value = if value < 0.0 {
            debug!(
                source = %self.labels[source],
                target = %self.labels[target],
                value,
                "Clamping negative flow to zero"
            );
            0.0
        } else {
            value
        };
        self.edges.push(FlowEdge {
            source,
            target,
            value,
            color,
        });
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn edges(&self) -> &[FlowEdge] {
        &self.edges
    }

    /// Edges resolved back to their labels, in insertion order.
    pub fn labeled_edges(&self) -> impl Iterator<Item = (&str, &str, f64, FlowColor)> {
        self.edges.iter().map(|edge| {
            (
                self.labels[edge.source].as_str(),
                self.labels[edge.target].as_str(),
                edge.value,
                edge.color,
            )
        })
    }

    /// Parallel arrays in the layout Sankey renderers consume.
    pub fn to_sankey(&self) -> SankeyData {
        SankeyData {
            labels: self.labels.clone(),
            source: self.edges.iter().map(|e| e.source).collect(),
            target: self.edges.iter().map(|e| e.target).collect(),
            value: self.edges.iter().map(|e| e.value).collect(),
            color: self.edges.iter().map(|e| e.color.rgba().to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SankeyData {
    pub labels: Vec<String>,
    pub source: Vec<usize>,
    pub target: Vec<usize>,
    pub value: Vec<f64>,
    pub color: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_tree_groups_branch_labels() {
        let tree = BudgetTree::new()
            .with_group(
                "Income",
                BudgetTree::new().with_group(
                    "Earned Income",
                    BudgetTree::new().with_amount("Salary", 100.0),
                ),
            )
            .with_group(
                "Expenses",
                BudgetTree::new().with_group(
                    "Home Expenses",
                    BudgetTree::new().with_amount("Salary", 1.0),
                ),
            );
        let graph = FlowGraph::from_tree(&tree);
        assert_eq!(
            graph.labels(),
            &["Income", "Earned Income", "Salary", "Expenses", "Home Expenses"]
        );
    }

    #[test]
    fn test_add_edge_appends_new_labels_and_keeps_parallel_edges() {
        let mut graph = FlowGraph::new();
        graph.node("Income");
        graph.add_edge("Income", "Net Income", 10.0, FlowColor::Inflow);
        graph.add_edge("Income", "Net Income", 5.0, FlowColor::Inflow);
        assert_eq!(graph.labels(), &["Income", "Net Income"]);
        assert_eq!(graph.edges().len(), 2);
        assert_eq!(graph.edges()[1].source, 0);
        assert_eq!(graph.edges()[1].target, 1);
    }

    #[test]
    fn test_negative_flow_is_clamped() {
        let mut graph = FlowGraph::new();
        graph.add_edge("Taxes", "Federal Income", -42.0, FlowColor::Outflow);
        assert_eq!(graph.edges()[0].value, 0.0);
    }

    #[test]
    fn test_sankey_arrays_are_parallel() {
        let mut graph = FlowGraph::new();
        graph.add_edge("Salary", "Earned Income", 100.0, FlowColor::Inflow);
        graph.add_edge("Income", "Taxes", 20.0, FlowColor::Outflow);
        let data = graph.to_sankey();
        assert_eq!(data.labels.len(), 4);
        assert_eq!(data.source, vec![0, 2]);
        assert_eq!(data.target, vec![1, 3]);
        assert_eq!(data.value, vec![100.0, 20.0]);
        assert_eq!(data.color[1], "rgba(255,0,0,0.3)");
    }
}
