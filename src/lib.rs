pub mod assemble;
#[cfg(feature = "cli")]
pub mod cli;
pub mod components;
pub mod config;
pub mod error;
pub mod instance;
pub mod layout;
pub mod layout_dump;
pub mod pipeline;
pub mod projection;
pub mod registry;
pub mod theme;

pub use assemble::{AlloyGraph, ComponentOrigin, GraphEdge, GraphNode};
pub use components::{AlloyEdge, AtomNode, EdgeId, GraphComponents, extract_components};
pub use config::{Config, Direction, LayoutConfig, load_config};
pub use error::{GraphError, Result, ThemeWarning};
pub use instance::{AlloyType, Atom, Instance, Relation, Trace, Tuple, TypeHierarchy};
pub use layout::{EdgePath, EdgePathDictionary, PathKind, PositionedNode, TraceLayout, layout_graph};
pub use pipeline::{TraceGraphs, build_trace_graphs, build_trace_graphs_with_config};
pub use projection::project_instances;
pub use registry::GraphRegistry;
pub use theme::{DEFAULT_THEME, Target, Theme};

#[cfg(feature = "cli")]
pub use cli::run;
