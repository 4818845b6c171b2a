//! Sankey flow diagram output: raw flow data as JSON and a standalone Plotly page.
use crate::core::flow::{FlowGraph, SankeyData};
use anyhow::{Context, Result};
use askama::Template;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

const PLOTLY_CDN: &str = "https://cdn.plot.ly/plotly-2.35.2.min.js";
const NODE_COLOR: &str = "rgba(28,67,68,1)";

#[derive(Template)]
#[template(path = "sankey.html")]
struct SankeyPage<'a> {
    title: &'a str,
    plotly_cdn: &'a str,
    trace: serde_json::Value,
    layout: serde_json::Value,
}

#[derive(Debug, Serialize)]
pub struct FlowDocument<'a> {
    pub title: String,
    #[serde(flatten)]
    pub sankey: SankeyData,
    #[serde(skip)]
    name: &'a str,
}

impl<'a> FlowDocument<'a> {
    pub fn new(name: &'a str, flows: &FlowGraph) -> Self {
        FlowDocument {
            title: title(name),
            sankey: flows.to_sankey(),
            name,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize flow data")
    }

    /// A self-contained HTML page drawing the Sankey diagram with Plotly.
    pub fn to_html(&self) -> Result<String> {
        let sankey = &self.sankey;
        let trace = serde_json::json!({
            "type": "sankey",
            "arrangement": "freeform",
            "valueformat": "$,",
            "node": {
                "pad": 10,
                "thickness": 10,
                "line": { "color": "black", "width": 0.15 },
                "label": sankey.labels,
                "color": NODE_COLOR,
            },
            "link": {
                "source": sankey.source,
                "target": sankey.target,
                "value": sankey.value,
                "color": sankey.color,
            },
        });
        let layout = serde_json::json!({
            "title": { "text": self.title },
            "font": { "size": 10, "color": "white" },
            "hovermode": "x",
            "plot_bgcolor": "black",
            "paper_bgcolor": "black",
        });
        let page = SankeyPage {
            title: &self.title,
            plotly_cdn: PLOTLY_CDN,
            trace,
            layout,
        };
        page.render().context("Failed to render Sankey page")
    }

    /// Writes `<slug>_budget_flows.json` and `<slug>_budget_viz.html` into `dir`.
    pub fn write(&self, dir: &Path, slug: &str) -> Result<(PathBuf, PathBuf)> {
        let json_path = dir.join(format!("{slug}_budget_flows.json"));
        fs::write(&json_path, self.to_json()?)
            .with_context(|| format!("Failed to write {}", json_path.display()))?;
        let html_path = dir.join(format!("{slug}_budget_viz.html"));
        fs::write(&html_path, self.to_html()?)
            .with_context(|| format!("Failed to write {}", html_path.display()))?;
        debug!(budget = self.name, "Wrote flow diagram");
        Ok((json_path, html_path))
    }
}

/// Diagram title: the budget name with its first letter capitalized.
pub fn title(name: &str) -> String {
    let mut chars = name.chars();
    let capitalized = match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
        None => String::new(),
    };
    format!("{capitalized} Monthly Budget")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::flow::FlowColor;

    fn flows() -> FlowGraph {
        let mut graph = FlowGraph::new();
        graph.add_edge("Salary", "Earned Income", 5000.0, FlowColor::Inflow);
        graph.add_edge("Income", "Taxes", 800.0, FlowColor::Outflow);
        graph
    }

    #[test]
    fn test_title() {
        assert_eq!(title("smith family"), "Smith family Monthly Budget");
        assert_eq!(title(""), " Monthly Budget");
    }

    #[test]
    fn test_json_layout() {
        let doc = FlowDocument::new("smith", &flows());
        let value: serde_json::Value = serde_json::from_str(&doc.to_json().unwrap()).unwrap();
        assert_eq!(value["title"], "Smith Monthly Budget");
        assert_eq!(value["labels"][0], "Salary");
        assert_eq!(value["source"], serde_json::json!([0, 2]));
        assert_eq!(value["target"], serde_json::json!([1, 3]));
        assert_eq!(value["color"][1], "rgba(255,0,0,0.3)");
    }

    #[test]
    fn test_html_embeds_trace() {
        let doc = FlowDocument::new("smith", &flows());
        let html = doc.to_html().unwrap();
        assert!(html.contains("Plotly.newPlot"));
        assert!(html.contains("\"type\":\"sankey\""));
        assert!(html.contains("\"valueformat\":\"$,\""));
        assert!(html.contains("<title>Smith Monthly Budget</title>"));
    }

    #[test]
    fn test_html_escapes_user_text() {
        let mut graph = flows();
        graph.add_edge("</script><b>", "Income", 1.0, FlowColor::Inflow);
        let doc = FlowDocument::new("<b>", &graph);
        let html = doc.to_html().unwrap();
        assert!(!html.contains("<title><b>"));
        assert!(!html.contains("</script><b>"));
        assert_eq!(html.matches("</script>").count(), 2);
    }

    #[test]
    fn test_write_creates_both_files() {
        let dir = tempfile::TempDir::new().unwrap();
        let doc = FlowDocument::new("smith", &flows());
        let (json, html) = doc.write(dir.path(), "smith").unwrap();
        assert!(json.ends_with("smith_budget_flows.json"));
        assert!(html.exists());
    }
}
