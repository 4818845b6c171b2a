//! Budget analysis engine: tree model, normalization, flow graph, tax rules and metrics

pub mod analytics;
pub mod budget;
pub mod config;
pub mod error;
pub mod flow;
pub mod log;
pub mod metrics;
pub mod normalize;
pub mod tax;

// Re-export main types for cleaner imports
pub use analytics::{Analysis, analyze};
pub use budget::{Budget, BudgetNode, BudgetTree};
pub use error::BudgetError;
pub use flow::{FlowColor, FlowEdge, FlowGraph};
pub use metrics::{MetricValue, Metrics};
