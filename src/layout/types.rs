use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;

use crate::components::EdgeId;

pub type Point = (f32, f32);

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextBlock {
    pub lines: Vec<String>,
    pub width: f32,
    pub height: f32,
}

/// A node of the deduplicated superset with its shared position. `x`/`y`
/// are the top-left corner.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PositionedNode {
    pub id: String,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub rank: usize,
    pub order: usize,
    pub round: bool,
}

impl PositionedNode {
    pub fn center(&self) -> Point {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PathKind {
    Straight,
    Curved,
    SelfLoop,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EdgePath {
    pub kind: PathKind,
    pub points: Vec<Point>,
    pub label_anchor: Option<Point>,
}

/// Routed geometry for every edge of a trace, keyed by edge id. Built once
/// by the layout and handed out behind an `Arc`; there is no way to mutate
/// it after construction.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct EdgePathDictionary {
    paths: BTreeMap<EdgeId, EdgePath>,
}

impl EdgePathDictionary {
    pub(crate) fn from_paths(paths: BTreeMap<EdgeId, EdgePath>) -> Self {
        Self { paths }
    }

    pub fn get(&self, id: &EdgeId) -> Option<&EdgePath> {
        self.paths.get(id)
    }

    pub fn contains(&self, id: &EdgeId) -> bool {
        self.paths.contains_key(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&EdgeId, &EdgePath)> {
        self.paths.iter()
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

/// One static layout for a whole trace.
#[derive(Debug, Clone, PartialEq)]
pub struct TraceLayout {
    pub nodes: BTreeMap<String, PositionedNode>,
    pub edge_paths: Arc<EdgePathDictionary>,
    pub width: f32,
    pub height: f32,
}

impl TraceLayout {
    pub fn node(&self, id: &str) -> Option<&PositionedNode> {
        self.nodes.get(id)
    }
}
