use std::sync::Arc;

use crate::assemble::{AlloyGraph, ComponentOrigin, assemble};
use crate::components::{GraphComponents, extract_visible};
use crate::config::LayoutConfig;
use crate::error::{Result, ThemeWarning};
use crate::instance::Trace;
use crate::layout::{EdgePathDictionary, TraceLayout, layout_graph};
use crate::projection::project_instances;
use crate::registry::GraphRegistry;
use crate::theme::{DEFAULT_THEME, Theme};

/// Everything one build produces: a graph per (projected) instance, all
/// drawn from a single shared layout.
#[derive(Debug, Clone)]
pub struct TraceGraphs {
    pub graphs: Vec<AlloyGraph>,
    pub registry: Arc<GraphRegistry>,
    pub layout: Arc<TraceLayout>,
    /// Theme rules that were skipped.
    pub warnings: Vec<ThemeWarning>,
    pub loop_back: usize,
}

impl TraceGraphs {
    /// Each graph paired with the shared edge-path dictionary.
    pub fn pairs(&self) -> impl Iterator<Item = (&AlloyGraph, Arc<EdgePathDictionary>)> + '_ {
        self.graphs
            .iter()
            .map(|graph| (graph, Arc::clone(&self.layout.edge_paths)))
    }

    pub fn edge_paths(&self) -> &Arc<EdgePathDictionary> {
        &self.layout.edge_paths
    }

    pub fn graph(&self, id: &str) -> Option<&AlloyGraph> {
        self.graphs.iter().find(|graph| graph.id == id)
    }

    pub fn graph_ids(&self) -> impl Iterator<Item = &str> + '_ {
        self.graphs.iter().map(|graph| graph.id.as_str())
    }

    pub fn len(&self) -> usize {
        self.graphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.graphs.is_empty()
    }

    /// Index of the graph shown after `index`. Past the last graph this
    /// returns to the first graph of the trace's loop-back instance.
    pub fn next_graph(&self, index: usize) -> usize {
        if index + 1 < self.graphs.len() {
            return index + 1;
        }
        self.graphs
            .iter()
            .position(|graph| graph.source_index == self.loop_back)
            .unwrap_or(0)
    }
}

pub fn build_trace_graphs(trace: &Trace, theme: Option<&Theme>) -> Result<TraceGraphs> {
    build_trace_graphs_with_config(trace, theme, &LayoutConfig::default())
}

/// Runs projection, extraction, deduplication, layout and assembly for one
/// trace. Nothing is cached between calls.
pub fn build_trace_graphs_with_config(
    trace: &Trace,
    theme: Option<&Theme>,
    config: &LayoutConfig,
) -> Result<TraceGraphs> {
    trace.validate()?;
    let (rules, warnings) = theme.unwrap_or(&DEFAULT_THEME).validated();

    let mut origins = Vec::new();
    let mut instances = Vec::new();
    for (source_index, instance) in trace.instances.iter().enumerate() {
        let variants = project_instances(std::slice::from_ref(instance), &rules.projections)?;
        origins.extend(variants.iter().map(|variant| ComponentOrigin {
            source_index,
            projected: variant.projected.clone(),
        }));
        instances.extend(variants);
    }

    let component_sets = instances
        .iter()
        .map(|instance| extract_visible(instance, &rules))
        .collect::<Result<Vec<GraphComponents>>>()?;

    let registry = Arc::new(GraphRegistry::from_components(&component_sets));
    let layout = Arc::new(layout_graph(registry.nodes(), registry.edges(), config)?);
    let graphs = assemble(&component_sets, &origins, &registry, &layout)?;

    tracing::debug!(
        instances = trace.len(),
        graphs = graphs.len(),
        warnings = warnings.len(),
        "built trace graphs"
    );

    Ok(TraceGraphs {
        graphs,
        registry,
        layout,
        warnings,
        loop_back: trace.loop_back,
    })
}
