//! SVG rendering of the model graph
//!
//! Writes an image of the layer DAG (boxes with names and output shapes,
//! arrows along the edges). The SVG is assembled by hand with format
//! strings; no drawing library is involved.

use std::fs;
use std::path::Path;

use crate::model::graph::{Lane, ModelGraph};
use crate::utils::error::Result;

const NODE_WIDTH: f64 = 220.0;
const NODE_HEIGHT: f64 = 44.0;
const ROW_GAP: f64 = 28.0;
const LANE_GAP: f64 = 40.0;
const MARGIN: f64 = 40.0;

const COLOR_NODE: &str = "#eaf2f8";
const COLOR_PARAM_NODE: &str = "#d6eaf8";
const COLOR_BORDER: &str = "#2c3e50";
const COLOR_EDGE: &str = "#7f8c8d";
const COLOR_TEXT: &str = "#2c3e50";

/// Render the model graph to an SVG file
pub fn render_svg(graph: &ModelGraph, path: impl AsRef<Path>) -> Result<()> {
    let svg = render_svg_string(graph);
    fs::write(path.as_ref(), svg)?;
    Ok(())
}

/// Render the model graph to an SVG string
pub fn render_svg_string(graph: &ModelGraph) -> String {
    let max_branches = graph
        .nodes
        .iter()
        .filter_map(|node| match node.lane {
            Lane::Branch(i) => Some(i + 1),
            Lane::Main => None,
        })
        .max()
        .unwrap_or(1);

    let lane_span = max_branches as f64 * (NODE_WIDTH + LANE_GAP);
    let width = 2.0 * MARGIN + lane_span.max(NODE_WIDTH + LANE_GAP);
    let height = 2.0 * MARGIN + graph.num_rows() as f64 * (NODE_HEIGHT + ROW_GAP);
    let center_x = width / 2.0;

    // Box center for a node, given its row and lane.
    let position = |row: usize, lane: Lane| -> (f64, f64) {
        let y = MARGIN + row as f64 * (NODE_HEIGHT + ROW_GAP) + NODE_HEIGHT / 2.0;
        let x = match lane {
            Lane::Main => center_x,
            Lane::Branch(i) => {
                let offset = i as f64 - (max_branches as f64 - 1.0) / 2.0;
                center_x + offset * (NODE_WIDTH + LANE_GAP)
            }
        };
        (x, y)
    };

    let mut svg = String::new();
    svg.push_str(&format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 {w} {h}" width="{w}" height="{h}">"#,
        w = width,
        h = height
    ));
    svg.push_str(&format!(
        r#"<rect width="{}" height="{}" fill="white"/>"#,
        width, height
    ));
    svg.push_str(&format!(
        r#"<defs><marker id="arrow" markerWidth="8" markerHeight="8" refX="7" refY="4" orient="auto"><path d="M0,0 L8,4 L0,8 z" fill="{}"/></marker></defs>"#,
        COLOR_EDGE
    ));

    // Edges first so the boxes draw over the arrow tails.
    for &(from, to) in &graph.edges {
        let (x1, y1) = position(graph.nodes[from].row, graph.nodes[from].lane);
        let (x2, y2) = position(graph.nodes[to].row, graph.nodes[to].lane);
        svg.push_str(&format!(
            r#"<line x1="{:.1}" y1="{:.1}" x2="{:.1}" y2="{:.1}" stroke="{}" stroke-width="1.5" marker-end="url(#arrow)"/>"#,
            x1,
            y1 + NODE_HEIGHT / 2.0,
            x2,
            y2 - NODE_HEIGHT / 2.0,
            COLOR_EDGE
        ));
    }

    for node in &graph.nodes {
        let (x, y) = position(node.row, node.lane);
        let fill = if node.params > 0 {
            COLOR_PARAM_NODE
        } else {
            COLOR_NODE
        };
        svg.push_str(&format!(
            r#"<rect x="{:.1}" y="{:.1}" width="{}" height="{}" rx="6" fill="{}" stroke="{}" stroke-width="1.5"/>"#,
            x - NODE_WIDTH / 2.0,
            y - NODE_HEIGHT / 2.0,
            NODE_WIDTH,
            NODE_HEIGHT,
            fill,
            COLOR_BORDER
        ));

        let shape = node
            .output
            .iter()
            .map(|d| d.to_string())
            .collect::<Vec<_>>()
            .join("×");
        svg.push_str(&format!(
            r#"<text x="{:.1}" y="{:.1}" text-anchor="middle" font-family="Arial, sans-serif" font-size="12" font-weight="bold" fill="{}">{}</text>"#,
            x,
            y - 4.0,
            COLOR_TEXT,
            escape_xml(&node.detail)
        ));
        svg.push_str(&format!(
            r#"<text x="{:.1}" y="{:.1}" text-anchor="middle" font-family="Arial, sans-serif" font-size="11" fill="{}">{} → {}</text>"#,
            x,
            y + 12.0,
            COLOR_TEXT,
            escape_xml(&node.name),
            shape
        ));
    }

    svg.push_str("</svg>");
    svg
}

fn escape_xml(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::network::MaxoutNetworkConfig;

    #[test]
    fn test_render_contains_every_node() {
        let graph = ModelGraph::from_config(&MaxoutNetworkConfig::new());
        let svg = render_svg_string(&graph);

        assert!(svg.starts_with("<svg"));
        assert!(svg.ends_with("</svg>"));
        for node in &graph.nodes {
            assert!(svg.contains(&node.name), "missing node {}", node.name);
        }
    }

    #[test]
    fn test_render_draws_all_edges() {
        let graph = ModelGraph::from_config(&MaxoutNetworkConfig::new());
        let svg = render_svg_string(&graph);

        let lines = svg.matches("<line").count();
        assert_eq!(lines, graph.edges.len());
    }

    #[test]
    fn test_escape_xml() {
        assert_eq!(escape_xml("a<b>&\"c\""), "a&lt;b&gt;&amp;&quot;c&quot;");
    }

    #[test]
    fn test_render_to_file() {
        let graph = ModelGraph::from_config(&MaxoutNetworkConfig::new());
        let dir = std::env::temp_dir().join("cifar_maxout_plot_test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("model.svg");

        render_svg(&graph, &path).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("maxout_dense"));

        std::fs::remove_file(&path).ok();
    }
}
