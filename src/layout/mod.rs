mod ranking;
mod routing;
mod text;
pub(crate) mod types;
pub use types::*;
use ranking::*;
use routing::*;
use text::*;

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::components::{AlloyEdge, AtomNode};
use crate::config::{Direction, LayoutConfig};
use crate::error::{GraphError, Result};
use crate::theme::NodeShape;

/// Lays out the deduplicated superset of a trace once: one position per
/// node and one routed path per edge. Identical input always produces
/// identical output; positions depend only on node and edge order.
pub fn layout_graph(nodes: &[AtomNode], edges: &[AlloyEdge], config: &LayoutConfig) -> Result<TraceLayout> {
    let config = config.sanitized();
    let index: HashMap<&str, usize> = nodes
        .iter()
        .enumerate()
        .map(|(idx, node)| (node.id.as_str(), idx))
        .collect();

    let mut index_edges: Vec<(usize, usize)> = Vec::with_capacity(edges.len());
    for edge in edges {
        let from = endpoint_index(&index, &edge.source)?;
        let to = endpoint_index(&index, &edge.target)?;
        index_edges.push((from, to));
    }

    let dag = acyclic_edges(nodes.len(), &index_edges);
    let mut ranks = assign_ranks(nodes.len(), &dag);
    let (expanded, chains) = insert_virtual_nodes(&dag, &mut ranks);
    let mut buckets = rank_buckets(&ranks);
    order_rank_nodes(&mut buckets, &expanded, config.order_passes);
    tracing::trace!(
        ranks = buckets.len(),
        virtual_slots = ranks.len() - nodes.len(),
        crossings = count_crossings(&buckets, &ranks, &expanded),
        "ordered ranks"
    );

    let horizontal = config.direction == Direction::LeftRight;
    let mut sizes: Vec<(f32, f32)> = nodes.iter().map(|node| node_size(node, &config)).collect();
    sizes.resize(ranks.len(), (0.0, 0.0));
    // A virtual slot is as wide as the lanes of every edge sharing it.
    let lanes = lane_counts(&index_edges, &ranks);
    for (key, chain) in &chains {
        let width = config.multi_edge_spacing * lanes.get(key).copied().unwrap_or(1) as f32;
        let size = if horizontal { (0.0, width) } else { (width, 0.0) };
        for &slot in chain {
            sizes[slot] = size;
        }
    }

    let (mut positioned, bands, cross_centers) = assign_positions(nodes, &sizes, &buckets, &config);
    let placement = Placement {
        horizontal,
        bands,
        ranks,
        cross_centers,
        chains,
    };
    let mut paths = route_edges(edges, &positioned, &index, &placement, &config);
    let (width, height) = normalize_layout(&mut positioned, &mut paths, config.padding);

    tracing::debug!(
        nodes = positioned.len(),
        edges = paths.len(),
        width,
        height,
        "computed trace layout"
    );

    Ok(TraceLayout {
        nodes: positioned,
        edge_paths: Arc::new(EdgePathDictionary::from_paths(paths)),
        width,
        height,
    })
}

fn endpoint_index(index: &HashMap<&str, usize>, id: &str) -> Result<usize> {
    index
        .get(id)
        .copied()
        .ok_or_else(|| GraphError::MissingPosition {
            node_id: id.to_string(),
        })
}

fn node_size(node: &AtomNode, config: &LayoutConfig) -> (f32, f32) {
    if let Some(shape) = node.shape {
        let (width, height) = shape.size();
        return (width.max(1.0), height.max(1.0));
    }
    let label = measure_label(&node.label, config);
    (
        (label.width + config.node_padding_x * 2.0).max(config.min_node_width),
        (label.height + config.node_padding_y * 2.0).max(config.min_node_height),
    )
}

/// Non-self-loop edges per node pair, keyed by (upper, lower) rank order.
fn lane_counts(edges: &[(usize, usize)], ranks: &[usize]) -> HashMap<(usize, usize), usize> {
    let mut lanes: HashMap<(usize, usize), usize> = HashMap::new();
    for &(from, to) in edges {
        if from == to {
            continue;
        }
        let key = if ranks[from] < ranks[to] { (from, to) } else { (to, from) };
        *lanes.entry(key).or_default() += 1;
    }
    lanes
}

/// Places ranks along the main axis and each rank's slots side by side
/// across it, every rank centered on the same line. Returns the real nodes,
/// the main-axis band of each rank and the cross-axis center of every slot.
fn assign_positions(
    nodes: &[AtomNode],
    sizes: &[(f32, f32)],
    buckets: &[Vec<usize>],
    config: &LayoutConfig,
) -> (BTreeMap<String, PositionedNode>, Vec<(f32, f32)>, Vec<f32>) {
    let horizontal = config.direction == Direction::LeftRight;
    // (main, cross) extent of a node.
    let extent = |idx: usize| -> (f32, f32) {
        let (w, h) = sizes[idx];
        if horizontal { (w, h) } else { (h, w) }
    };

    let mut positioned = BTreeMap::new();
    let mut bands = Vec::with_capacity(buckets.len());
    let mut cross_centers = vec![0.0f32; sizes.len()];
    let mut main_cursor = 0.0f32;
    for (rank, bucket) in buckets.iter().enumerate() {
        let rank_depth = bucket.iter().map(|&idx| extent(idx).0).fold(0.0, f32::max);
        let total_cross: f32 = bucket.iter().map(|&idx| extent(idx).1).sum::<f32>()
            + config.node_spacing * bucket.len().saturating_sub(1) as f32;
        let mut cross_cursor = -total_cross / 2.0;
        let mut order = 0;
        for &idx in bucket {
            let (main, cross) = extent(idx);
            cross_centers[idx] = cross_cursor + cross / 2.0;
            let Some(node) = nodes.get(idx) else {
                cross_cursor += cross + config.node_spacing;
                continue;
            };
            let main_pos = main_cursor + (rank_depth - main) / 2.0;
            let (x, y) = if horizontal {
                (main_pos, cross_cursor)
            } else {
                (cross_cursor, main_pos)
            };
            let (width, height) = sizes[idx];
            positioned.insert(
                node.id.clone(),
                PositionedNode {
                    id: node.id.clone(),
                    x,
                    y,
                    width,
                    height,
                    rank,
                    order,
                    round: matches!(node.shape, Some(NodeShape::Circle { .. })),
                },
            );
            order += 1;
            cross_cursor += cross + config.node_spacing;
        }
        bands.push((main_cursor, main_cursor + rank_depth));
        main_cursor += rank_depth + config.rank_spacing;
    }
    (positioned, bands, cross_centers)
}

/// Shifts everything so the drawing starts at `padding`; returns the
/// overall width and height.
fn normalize_layout(
    nodes: &mut BTreeMap<String, PositionedNode>,
    paths: &mut BTreeMap<crate::components::EdgeId, EdgePath>,
    padding: f32,
) -> (f32, f32) {
    if nodes.is_empty() {
        return (padding * 2.0, padding * 2.0);
    }
    let mut min_x = f32::MAX;
    let mut min_y = f32::MAX;
    let mut max_x = f32::MIN;
    let mut max_y = f32::MIN;
    for node in nodes.values() {
        min_x = min_x.min(node.x);
        min_y = min_y.min(node.y);
        max_x = max_x.max(node.x + node.width);
        max_y = max_y.max(node.y + node.height);
    }
    // Curves and loops may reach past the node bounds.
    for path in paths.values() {
        for point in &path.points {
            min_x = min_x.min(point.0);
            min_y = min_y.min(point.1);
            max_x = max_x.max(point.0);
            max_y = max_y.max(point.1);
        }
    }

    let shift_x = padding - min_x;
    let shift_y = padding - min_y;
    for node in nodes.values_mut() {
        node.x += shift_x;
        node.y += shift_y;
    }
    for path in paths.values_mut() {
        for point in path.points.iter_mut() {
            point.0 += shift_x;
            point.1 += shift_y;
        }
        if let Some(anchor) = path.label_anchor.as_mut() {
            anchor.0 += shift_x;
            anchor.1 += shift_y;
        }
    }
    (max_x - min_x + padding * 2.0, max_y - min_y + padding * 2.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::EdgeId;
    use crate::theme::StyleMap;

    fn make_node(id: &str) -> AtomNode {
        AtomNode {
            id: id.to_string(),
            type_name: "Node".to_string(),
            label: vec![id.to_string()],
            shape: None,
            node_style: StyleMap::new(),
            label_style: StyleMap::new(),
            label_props: StyleMap::new(),
        }
    }

    fn make_edge(relation: &str, from: &str, to: &str) -> AlloyEdge {
        AlloyEdge {
            id: EdgeId::new(relation, from, to, None),
            relation: relation.to_string(),
            source: from.to_string(),
            target: to.to_string(),
            label: relation.to_string(),
            edge_style: StyleMap::new(),
            label_style: StyleMap::new(),
        }
    }

    #[test]
    fn layout_places_chain_top_down() {
        let nodes = vec![make_node("A"), make_node("B"), make_node("C")];
        let edges = vec![make_edge("r", "A", "B"), make_edge("r", "B", "C")];
        let layout = layout_graph(&nodes, &edges, &LayoutConfig::default()).unwrap();
        let a = layout.node("A").unwrap();
        let b = layout.node("B").unwrap();
        let c = layout.node("C").unwrap();
        assert!(a.y < b.y && b.y < c.y);
        assert_eq!((a.rank, b.rank, c.rank), (0, 1, 2));
        assert_eq!(layout.edge_paths.len(), 2);
    }

    #[test]
    fn left_right_direction_uses_x_for_ranks() {
        let nodes = vec![make_node("A"), make_node("B")];
        let edges = vec![make_edge("r", "A", "B")];
        let config = LayoutConfig {
            direction: Direction::LeftRight,
            ..LayoutConfig::default()
        };
        let layout = layout_graph(&nodes, &edges, &config).unwrap();
        assert!(layout.node("A").unwrap().x < layout.node("B").unwrap().x);
    }

    #[test]
    fn isolated_nodes_get_distinct_positions() {
        let nodes: Vec<AtomNode> = (0..5).map(|i| make_node(&format!("N{i}"))).collect();
        let layout = layout_graph(&nodes, &[], &LayoutConfig::default()).unwrap();
        let mut seen: Vec<(f32, f32)> = layout.nodes.values().map(|n| (n.x, n.y)).collect();
        seen.sort_by(|a, b| a.0.total_cmp(&b.0));
        seen.dedup();
        assert_eq!(seen.len(), 5);
    }

    #[test]
    fn geometry_starts_at_padding() {
        let nodes = vec![make_node("A"), make_node("B")];
        let edges = vec![make_edge("r", "A", "A"), make_edge("r", "A", "B")];
        let config = LayoutConfig::default();
        let layout = layout_graph(&nodes, &edges, &config).unwrap();
        let min_x = layout
            .edge_paths
            .iter()
            .flat_map(|(_, path)| path.points.iter().map(|p| p.0))
            .chain(layout.nodes.values().map(|n| n.x))
            .fold(f32::MAX, f32::min);
        assert!((min_x - config.padding).abs() < 1e-3);
        assert!(layout.width > 0.0 && layout.height > 0.0);
    }

    #[test]
    fn edge_to_unknown_node_is_an_internal_error() {
        let nodes = vec![make_node("A")];
        let edges = vec![make_edge("r", "A", "Z")];
        let err = layout_graph(&nodes, &edges, &LayoutConfig::default()).unwrap_err();
        assert!(err.is_internal());
    }

    #[test]
    fn shaped_nodes_use_shape_size() {
        let mut node = make_node("A");
        node.shape = Some(NodeShape::Circle { radius: 15.0 });
        let layout = layout_graph(&[node], &[], &LayoutConfig::default()).unwrap();
        let a = layout.node("A").unwrap();
        assert_eq!((a.width, a.height), (30.0, 30.0));
        assert!(a.round);
    }

    /// True when segment `a`-`b` reaches the strict interior of the node box.
    fn segment_enters_box(a: Point, b: Point, node: &PositionedNode) -> bool {
        let eps = 0.5;
        let (min_x, max_x) = (node.x + eps, node.x + node.width - eps);
        let (min_y, max_y) = (node.y + eps, node.y + node.height - eps);
        let (dx, dy) = (b.0 - a.0, b.1 - a.1);
        let (mut t0, mut t1) = (0.0f32, 1.0f32);
        for (p, q) in [(-dx, a.0 - min_x), (dx, max_x - a.0), (-dy, a.1 - min_y), (dy, max_y - a.1)] {
            if p == 0.0 {
                if q < 0.0 {
                    return false;
                }
                continue;
            }
            let t = q / p;
            if p < 0.0 {
                t0 = t0.max(t);
            } else {
                t1 = t1.min(t);
            }
            if t0 > t1 {
                return false;
            }
        }
        true
    }

    fn assert_edges_avoid_other_nodes(layout: &TraceLayout, edges: &[AlloyEdge]) {
        for edge in edges {
            let path = layout.edge_paths.get(&edge.id).unwrap();
            for node in layout.nodes.values() {
                if node.id == edge.source || node.id == edge.target {
                    continue;
                }
                for seg in path.points.windows(2) {
                    assert!(
                        !segment_enters_box(seg[0], seg[1], node),
                        "{} crosses {}",
                        edge.id,
                        node.id
                    );
                }
            }
        }
    }

    #[test]
    fn long_edge_routes_around_intermediate_node() {
        let nodes = vec![make_node("A"), make_node("B"), make_node("C")];
        let edges = vec![
            make_edge("r", "A", "B"),
            make_edge("r", "B", "C"),
            make_edge("r", "A", "C"),
        ];
        for direction in [Direction::TopDown, Direction::LeftRight] {
            let config = LayoutConfig {
                direction,
                ..LayoutConfig::default()
            };
            let layout = layout_graph(&nodes, &edges, &config).unwrap();
            assert_eq!(layout.node("B").unwrap().rank, 1);
            let long = layout.edge_paths.get(&edges[2].id).unwrap();
            assert_eq!(long.kind, PathKind::Curved);
            assert_edges_avoid_other_nodes(&layout, &edges);
        }
    }

    #[test]
    fn edges_skipping_several_ranks_avoid_every_node_between() {
        let ids = ["A", "B", "C", "D", "E"];
        let nodes: Vec<AtomNode> = ids.iter().map(|id| make_node(id)).collect();
        let mut edges: Vec<AlloyEdge> = ids.windows(2).map(|w| make_edge("next", w[0], w[1])).collect();
        edges.push(make_edge("jump", "A", "E"));
        edges.push(make_edge("jump", "B", "E"));
        edges.push(make_edge("back", "E", "A"));
        let layout = layout_graph(&nodes, &edges, &LayoutConfig::default()).unwrap();
        assert_edges_avoid_other_nodes(&layout, &edges);
    }

    #[test]
    fn parallel_edges_get_distinct_paths() {
        let nodes = vec![make_node("A"), make_node("B")];
        let edges = vec![
            make_edge("r", "A", "B"),
            make_edge("s", "A", "B"),
            make_edge("r", "B", "A"),
        ];
        let layout = layout_graph(&nodes, &edges, &LayoutConfig::default()).unwrap();
        let paths: Vec<&EdgePath> = edges
            .iter()
            .map(|edge| layout.edge_paths.get(&edge.id).unwrap())
            .collect();
        for (i, a) in paths.iter().enumerate() {
            for b in &paths[i + 1..] {
                assert_ne!(a.label_anchor, b.label_anchor);
            }
        }
        // The reversed edge starts at B.
        let b = layout.node("B").unwrap();
        let start = paths[2].points.first().unwrap();
        assert!((start.1 - b.y).abs() < 1e-3);
    }

    #[test]
    fn empty_graph_has_empty_layout() {
        let layout = layout_graph(&[], &[], &LayoutConfig::default()).unwrap();
        assert!(layout.nodes.is_empty());
        assert!(layout.edge_paths.is_empty());
    }
}
