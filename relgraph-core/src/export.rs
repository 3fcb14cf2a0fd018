use crate::aggregate::ChannelGraph;
use crate::error::{CrawlError, Result};
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::info;

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("static regex"));
static NON_WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^\w\s-]").expect("static regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    #[default]
    GraphMl,
    Json,
}

impl ExportFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "graphml" => Some(ExportFormat::GraphMl),
            "json" => Some(ExportFormat::Json),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::GraphMl => "graphml",
            ExportFormat::Json => "json",
        }
    }
}

/// Turn a channel name into a file stem: whitespace runs become `_`, then
/// anything that is not a word character or dash is dropped.
pub fn sanitize_file_stem(name: &str) -> String {
    let underscored = WHITESPACE.replace_all(name.trim(), "_");
    NON_WORD.replace_all(&underscored, "").into_owned()
}

pub fn generate_graphml(graph: &ChannelGraph) -> String {
    let mut out = String::new();
    out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    out.push_str("<graphml xmlns=\"http://graphml.graphdrawing.org/xmlns\" ");
    out.push_str("xmlns:xsi=\"http://www.w3.org/2001/XMLSchema-instance\" ");
    out.push_str("xsi:schemaLocation=\"http://graphml.graphdrawing.org/xmlns http://graphml.graphdrawing.org/xmlns/1.0/graphml.xsd\">\n");
    out.push_str("  <key id=\"d0\" for=\"node\" attr.name=\"size\" attr.type=\"double\"/>\n");
    out.push_str("  <key id=\"d1\" for=\"edge\" attr.name=\"weight\" attr.type=\"int\"/>\n");
    out.push_str("  <graph edgedefault=\"undirected\">\n");

    for node in graph.nodes() {
        out.push_str(&format!(
            "    <node id=\"{}\">\n      <data key=\"d0\">{}</data>\n    </node>\n",
            escape_xml(&node.name),
            format_size(node.size)
        ));
    }
    for (source, target, weight) in graph.edges() {
        out.push_str(&format!(
            "    <edge source=\"{}\" target=\"{}\">\n      <data key=\"d1\">{}</data>\n    </edge>\n",
            escape_xml(source),
            escape_xml(target),
            weight
        ));
    }

    out.push_str("  </graph>\n</graphml>\n");
    out
}

/// Node-link JSON, the layout most graph tooling imports directly.
pub fn generate_json(graph: &ChannelGraph) -> std::result::Result<String, serde_json::Error> {
    let nodes: Vec<_> = graph
        .nodes()
        .map(|node| serde_json::json!({ "id": node.name, "size": round_size(node.size) }))
        .collect();
    let links: Vec<_> = graph
        .edges()
        .map(|(source, target, weight)| {
            serde_json::json!({ "source": source, "target": target, "weight": weight })
        })
        .collect();

    serde_json::to_string_pretty(&serde_json::json!({
        "directed": false,
        "multigraph": false,
        "nodes": nodes,
        "links": links,
    }))
}

/// Write `graph` to `<dir>/<stem>.<ext>`, creating `dir` if needed.
pub fn export_graph(
    graph: &ChannelGraph,
    format: ExportFormat,
    dir: &Path,
    stem: &str,
) -> Result<PathBuf> {
    fs::create_dir_all(dir).map_err(|e| CrawlError::io(dir, e))?;
    let path = dir.join(format!("{}.{}", stem, format.extension()));

    let content = match format {
        ExportFormat::GraphMl => generate_graphml(graph),
        ExportFormat::Json => generate_json(graph).map_err(|e| CrawlError::Corrupt {
            path: path.clone(),
            line: 0,
            reason: e.to_string(),
        })?,
    };
    fs::write(&path, content).map_err(|e| CrawlError::io(&path, e))?;
    info!("Created graph: {}", path.display());
    Ok(path)
}

// Sizes accumulate in tenths; drop the float noise before writing them out.
fn round_size(size: f64) -> f64 {
    (size * 1e6).round() / 1e6
}

fn format_size(size: f64) -> String {
    let rounded = round_size(size);
    if rounded.fract() == 0.0 {
        format!("{:.1}", rounded)
    } else {
        rounded.to_string()
    }
}

fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
