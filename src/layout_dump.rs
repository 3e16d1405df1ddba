use crate::layout::EdgePathDictionary;
use crate::pipeline::TraceGraphs;
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceDump<'a> {
    pub width: f32,
    pub height: f32,
    pub loop_back: usize,
    pub graphs: Vec<GraphDump>,
    /// Written once; every graph's edges refer into it by id.
    pub edge_paths: &'a EdgePathDictionary,
    pub warnings: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphDump {
    pub id: String,
    pub source_index: usize,
    pub projected: Vec<String>,
    pub nodes: Vec<NodeDump>,
    pub edges: Vec<EdgeDump>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeDump {
    pub id: String,
    #[serde(rename = "type")]
    pub type_name: String,
    pub label: Vec<String>,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub round: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeDump {
    pub id: String,
    pub relation: String,
    pub source: String,
    pub target: String,
    pub label: String,
}

impl<'a> TraceDump<'a> {
    pub fn from_graphs(graphs: &'a TraceGraphs) -> Self {
        let dumps = graphs
            .graphs
            .iter()
            .map(|graph| GraphDump {
                id: graph.id.clone(),
                source_index: graph.source_index,
                projected: graph.projected.clone(),
                nodes: graph
                    .nodes()
                    .map(|entry| NodeDump {
                        id: entry.node.id.clone(),
                        type_name: entry.node.type_name.clone(),
                        label: entry.node.label.clone(),
                        x: entry.position.x,
                        y: entry.position.y,
                        width: entry.position.width,
                        height: entry.position.height,
                        round: entry.position.round,
                    })
                    .collect(),
                edges: graph
                    .edges()
                    .map(|entry| EdgeDump {
                        id: entry.edge.id.to_string(),
                        relation: entry.edge.relation.clone(),
                        source: entry.edge.source.clone(),
                        target: entry.edge.target.clone(),
                        label: entry.edge.label.clone(),
                    })
                    .collect(),
            })
            .collect();

        TraceDump {
            width: graphs.layout.width,
            height: graphs.layout.height,
            loop_back: graphs.loop_back,
            graphs: dumps,
            edge_paths: &graphs.layout.edge_paths,
            warnings: graphs.warnings.iter().map(ToString::to_string).collect(),
        }
    }
}

pub fn trace_dump_json(graphs: &TraceGraphs) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&TraceDump::from_graphs(graphs))
}

/// Writes the dump to `path`, or to stdout when no path is given.
pub fn write_trace_dump(path: Option<&Path>, graphs: &TraceGraphs) -> anyhow::Result<()> {
    let dump = TraceDump::from_graphs(graphs);
    match path {
        Some(path) => {
            let file = File::create(path)?;
            let writer = BufWriter::new(file);
            serde_json::to_writer_pretty(writer, &dump)?;
        }
        None => {
            let stdout = std::io::stdout();
            let mut writer = stdout.lock();
            serde_json::to_writer_pretty(&mut writer, &dump)?;
            writer.write_all(b"\n")?;
        }
    }
    Ok(())
}
