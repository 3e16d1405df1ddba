use std::sync::Arc;

use crate::components::{AlloyEdge, AtomNode, EdgeId, GraphComponents};
use crate::error::{GraphError, Result};
use crate::layout::{EdgePath, EdgePathDictionary, PositionedNode, TraceLayout};
use crate::registry::GraphRegistry;

/// The renderable graph of one instance. It stores only ids; node records,
/// positions and edge paths are shared with every other graph of the trace.
#[derive(Debug, Clone)]
pub struct AlloyGraph {
    pub id: String,
    /// Position of this graph in the build output.
    pub index: usize,
    /// Index of the trace instance this graph was projected from.
    pub source_index: usize,
    /// Atoms projected away to produce this graph.
    pub projected: Vec<String>,
    node_ids: Vec<String>,
    edge_ids: Vec<EdgeId>,
    registry: Arc<GraphRegistry>,
    layout: Arc<TraceLayout>,
}

/// Where one component set came from: the trace instance it was projected
/// from and the atoms projected away.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComponentOrigin {
    pub source_index: usize,
    pub projected: Vec<String>,
}

#[derive(Debug, Clone, Copy)]
pub struct GraphNode<'a> {
    pub node: &'a AtomNode,
    pub position: &'a PositionedNode,
}

#[derive(Debug, Clone, Copy)]
pub struct GraphEdge<'a> {
    pub edge: &'a AlloyEdge,
    pub path: &'a EdgePath,
}

impl AlloyGraph {
    pub fn node_ids(&self) -> &[String] {
        &self.node_ids
    }

    pub fn edge_ids(&self) -> &[EdgeId] {
        &self.edge_ids
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.node_ids.iter().any(|node_id| node_id == id)
    }

    pub fn position(&self, id: &str) -> Option<&PositionedNode> {
        if !self.contains_node(id) {
            return None;
        }
        self.layout.node(id)
    }

    /// Nodes of this instance with their shared positions.
    ///
    /// Node records come from the registry, so every graph sees the record
    /// of the first instance that showed the atom. Set and attribute label
    /// lines (`(root)`, `next: L0`) are therefore those of that instance, and
    /// node sizes in the shared layout are measured from them.
    pub fn nodes(&self) -> impl Iterator<Item = GraphNode<'_>> + '_ {
        self.node_ids.iter().filter_map(|id| {
            Some(GraphNode {
                node: self.registry.node(id)?,
                position: self.layout.node(id)?,
            })
        })
    }

    pub fn edges(&self) -> impl Iterator<Item = GraphEdge<'_>> + '_ {
        self.edge_ids.iter().filter_map(|id| {
            Some(GraphEdge {
                edge: self.registry.edge(id)?,
                path: self.layout.edge_paths.get(id)?,
            })
        })
    }

    /// The trace's shared path dictionary (the same allocation for every
    /// graph of the trace).
    pub fn edge_paths(&self) -> &Arc<EdgePathDictionary> {
        &self.layout.edge_paths
    }

    pub fn layout(&self) -> &TraceLayout {
        &self.layout
    }
}

/// Re-projects the shared layout onto each instance's own components.
/// `origins` runs parallel to `component_sets`. A referenced node or edge the
/// layout does not cover, or a set without an origin, is an internal error.
pub fn assemble(
    component_sets: &[GraphComponents],
    origins: &[ComponentOrigin],
    registry: &Arc<GraphRegistry>,
    layout: &Arc<TraceLayout>,
) -> Result<Vec<AlloyGraph>> {
    component_sets
        .iter()
        .enumerate()
        .map(|(index, components)| {
            let origin = origins
                .get(index)
                .ok_or(GraphError::MissingOrigin { graph: index })?;
            let mut node_ids = Vec::with_capacity(components.nodes.len());
            for node in &components.nodes {
                if layout.node(&node.id).is_none() || !registry.contains_node(&node.id) {
                    return Err(GraphError::MissingPosition {
                        node_id: node.id.clone(),
                    });
                }
                node_ids.push(node.id.clone());
            }
            let mut edge_ids = Vec::with_capacity(components.edges.len());
            for edge in &components.edges {
                if !layout.edge_paths.contains(&edge.id) || !registry.contains_edge(&edge.id) {
                    return Err(GraphError::MissingPath {
                        edge_id: edge.id.to_string(),
                    });
                }
                edge_ids.push(edge.id.clone());
            }
            Ok(AlloyGraph {
                id: format!("instance-{index}"),
                index,
                source_index: origin.source_index,
                projected: origin.projected.clone(),
                node_ids,
                edge_ids,
                registry: Arc::clone(registry),
                layout: Arc::clone(layout),
            })
        })
        .collect()
}
