use std::collections::HashMap;

use crate::components::{AlloyEdge, AtomNode, EdgeId, GraphComponents};

/// Identity-indexed union of every instance's components: one canonical
/// record per atom id and per edge id, in first-seen order.
#[derive(Debug, Clone, Default)]
pub struct GraphRegistry {
    nodes: Vec<AtomNode>,
    edges: Vec<AlloyEdge>,
    node_index: HashMap<String, usize>,
    edge_index: HashMap<EdgeId, usize>,
}

impl GraphRegistry {
    /// Scans instances in order; the first record seen for an id is kept and
    /// later ones are dropped.
    pub fn from_components(component_sets: &[GraphComponents]) -> Self {
        let mut registry = Self::default();
        for components in component_sets {
            for node in &components.nodes {
                registry.insert_node(node);
            }
            for edge in &components.edges {
                registry.insert_edge(edge);
            }
        }
        tracing::debug!(
            instances = component_sets.len(),
            nodes = registry.nodes.len(),
            edges = registry.edges.len(),
            "deduplicated trace components"
        );
        registry
    }

    fn insert_node(&mut self, node: &AtomNode) {
        if self.node_index.contains_key(&node.id) {
            return;
        }
        self.node_index.insert(node.id.clone(), self.nodes.len());
        self.nodes.push(node.clone());
    }

    fn insert_edge(&mut self, edge: &AlloyEdge) {
        if self.edge_index.contains_key(&edge.id) {
            return;
        }
        self.edge_index.insert(edge.id.clone(), self.edges.len());
        self.edges.push(edge.clone());
    }

    pub fn nodes(&self) -> &[AtomNode] {
        &self.nodes
    }

    pub fn edges(&self) -> &[AlloyEdge] {
        &self.edges
    }

    pub fn node(&self, id: &str) -> Option<&AtomNode> {
        self.node_index.get(id).map(|&idx| &self.nodes[idx])
    }

    pub fn edge(&self, id: &EdgeId) -> Option<&AlloyEdge> {
        self.edge_index.get(id).map(|&idx| &self.edges[idx])
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.node_index.contains_key(id)
    }

    pub fn contains_edge(&self, id: &EdgeId) -> bool {
        self.edge_index.contains_key(id)
    }
}
