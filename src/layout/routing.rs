use std::collections::{BTreeMap, HashMap};

use crate::components::{AlloyEdge, EdgeId};
use crate::config::LayoutConfig;

use super::{EdgePath, PathKind, Point, PositionedNode};

// ── Parallel edges ──────────────────────────────────────────────────
/// Share of the narrower endpoint's width that parallel edges may fan over.
const PARALLEL_FAN_RATIO: f32 = 0.8;
/// Points closer than this are merged.
const POINT_EPSILON: f32 = 1e-3;

// ── Self-loops ──────────────────────────────────────────────────────
/// Corners a node's self-loops are spread over before padding grows.
const SELF_LOOP_CORNERS: usize = 4;
/// Extra padding per full round of corners, as a ratio of the base pad.
const SELF_LOOP_GROWTH: f32 = 0.75;

/// Rank geometry the router follows. Slots `0..n` are the real nodes, the
/// rest are virtual slots that carry long edges across intermediate ranks.
#[derive(Debug, Clone)]
pub(super) struct Placement {
    pub horizontal: bool,
    /// `(start, end)` of each rank band along the main axis. Every node of a
    /// rank lies inside its band; nothing lies between bands.
    pub bands: Vec<(f32, f32)>,
    pub ranks: Vec<usize>,
    pub cross_centers: Vec<f32>,
    /// Virtual slots of each long edge, keyed by (upper, lower) slot.
    pub chains: HashMap<(usize, usize), Vec<usize>>,
}

impl Placement {
    fn point(&self, (main, cross): (f32, f32)) -> Point {
        if self.horizontal { (main, cross) } else { (cross, main) }
    }

    fn band(&self, slot: usize) -> (f32, f32) {
        self.bands[self.ranks[slot]]
    }

    fn main_extent(&self, node: &PositionedNode) -> (f32, f32) {
        if self.horizontal {
            (node.x + node.width / 2.0, node.width / 2.0)
        } else {
            (node.y + node.height / 2.0, node.height / 2.0)
        }
    }

    fn cross_half(&self, node: &PositionedNode) -> f32 {
        if self.horizontal { node.height / 2.0 } else { node.width / 2.0 }
    }
}

/// Routes every edge against the final node positions.
pub(super) fn route_edges(
    edges: &[AlloyEdge],
    nodes: &BTreeMap<String, PositionedNode>,
    index: &HashMap<&str, usize>,
    placement: &Placement,
    config: &LayoutConfig,
) -> BTreeMap<EdgeId, EdgePath> {
    let pair_slots = parallel_edge_slots(edges);
    let mut loop_counts: HashMap<&str, usize> = HashMap::new();
    let mut paths = BTreeMap::new();

    for (idx, edge) in edges.iter().enumerate() {
        let (Some(from), Some(to)) = (nodes.get(&edge.source), nodes.get(&edge.target)) else {
            continue;
        };
        let path = if edge.is_self_loop() {
            let slot = loop_counts.entry(edge.source.as_str()).or_insert(0);
            let path = route_self_loop(from, *slot, config.self_loop_padding);
            *slot += 1;
            path
        } else {
            let (Some(&from_slot), Some(&to_slot)) =
                (index.get(edge.source.as_str()), index.get(edge.target.as_str()))
            else {
                continue;
            };
            let (slot, count) = pair_slots[idx];
            route_ranked((from_slot, from), (to_slot, to), slot, count, placement, config)
        };
        paths.insert(edge.id.clone(), path);
    }
    paths
}

/// For each edge, its slot among the edges joining the same unordered node
/// pair and the size of that group. Self-loops get `(0, 1)`.
pub(super) fn parallel_edge_slots(edges: &[AlloyEdge]) -> Vec<(usize, usize)> {
    let mut groups: HashMap<(&str, &str), Vec<usize>> = HashMap::new();
    for (idx, edge) in edges.iter().enumerate() {
        if edge.is_self_loop() {
            continue;
        }
        groups.entry(pair_key(edge)).or_default().push(idx);
    }
    let mut slots = vec![(0, 1); edges.len()];
    for members in groups.values() {
        for (slot, &idx) in members.iter().enumerate() {
            slots[idx] = (slot, members.len());
        }
    }
    slots
}

fn pair_key(edge: &AlloyEdge) -> (&str, &str) {
    if edge.source <= edge.target {
        (edge.source.as_str(), edge.target.as_str())
    } else {
        (edge.target.as_str(), edge.source.as_str())
    }
}

/// Signed distance of slot `slot` out of `count` from the straight line.
pub(super) fn slot_offset(slot: usize, count: usize, spacing: f32) -> f32 {
    (slot as f32 - (count as f32 - 1.0) / 2.0) * spacing
}

/// Path between nodes on different ranks. It leaves the upper node straight
/// out of its band, passes each virtual slot of the edge straight through
/// that slot's band, and bends only in the empty gaps between bands, so it
/// never crosses another node. Parallel edges keep a fixed cross-axis offset
/// along the whole route.
fn route_ranked(
    from: (usize, &PositionedNode),
    to: (usize, &PositionedNode),
    slot: usize,
    count: usize,
    placement: &Placement,
    config: &LayoutConfig,
) -> EdgePath {
    let reversed = placement.ranks[from.0] > placement.ranks[to.0];
    let (upper, lower) = if reversed { (to, from) } else { (from, to) };

    let narrowest = placement.cross_half(upper.1).min(placement.cross_half(lower.1)) * 2.0;
    let spacing = config
        .multi_edge_spacing
        .min(narrowest * PARALLEL_FAN_RATIO / count.max(1) as f32);
    let offset = slot_offset(slot, count, spacing);

    // (main, cross) stops in pairs: where the route enters and leaves a band.
    let mut stops: Vec<(f32, f32)> = Vec::new();
    let upper_cross = placement.cross_centers[upper.0] + offset;
    stops.push((port_main(placement, upper.1, offset, true), upper_cross));
    stops.push((placement.band(upper.0).1, upper_cross));
    if let Some(chain) = placement.chains.get(&(upper.0, lower.0)) {
        for &virtual_slot in chain {
            let cross = placement.cross_centers[virtual_slot] + offset;
            let (start, end) = placement.band(virtual_slot);
            stops.push((start, cross));
            stops.push((end, cross));
        }
    }
    let lower_cross = placement.cross_centers[lower.0] + offset;
    stops.push((placement.band(lower.0).0, lower_cross));
    stops.push((port_main(placement, lower.1, offset, false), lower_cross));

    let mut route: Vec<(f32, f32)> = vec![stops[0]];
    let mut bent = false;
    for (idx, pair) in stops.chunks(2).enumerate() {
        route.push(pair[1]);
        let Some(&next) = stops.get(idx * 2 + 2) else {
            break;
        };
        if (next.1 - pair[1].1).abs() > POINT_EPSILON {
            bent = true;
            route.extend(gap_curve(pair[1], next, config.curve_samples));
        } else {
            route.push(next);
        }
    }

    let mut points: Vec<Point> = simplify(route.into_iter().map(|stop| placement.point(stop)).collect());
    if reversed {
        points.reverse();
    }
    let kind = if !bent && points.len() == 2 {
        PathKind::Straight
    } else {
        PathKind::Curved
    };
    let label_anchor = point_at_half_length(&points);
    EdgePath {
        kind,
        points,
        label_anchor,
    }
}

/// Main-axis coordinate where a route at cross offset `offset` from the
/// node's center meets the node's lower (or upper) boundary.
fn port_main(placement: &Placement, node: &PositionedNode, offset: f32, lower_side: bool) -> f32 {
    let (center, half) = placement.main_extent(node);
    let reach = if node.round {
        let t = (offset / placement.cross_half(node).max(POINT_EPSILON)).clamp(-1.0, 1.0);
        half * (1.0 - t * t).max(0.0).sqrt()
    } else {
        half
    };
    if lower_side { center + reach } else { center - reach }
}

/// S-shaped cubic from `start` to `end` in (main, cross) space, excluding
/// `start`. Both control points sit on the gap's midline, so the curve never
/// leaves the gap.
fn gap_curve(start: (f32, f32), end: (f32, f32), samples: usize) -> Vec<(f32, f32)> {
    let samples = samples.max(2);
    let mid = (start.0 + end.0) / 2.0;
    let c1 = (mid, start.1);
    let c2 = (mid, end.1);
    (1..=samples)
        .map(|i| cubic_point(start, c1, c2, end, i as f32 / samples as f32))
        .collect()
}

fn cubic_point(p0: Point, p1: Point, p2: Point, p3: Point, t: f32) -> Point {
    let u = 1.0 - t;
    let a = u * u * u;
    let b = 3.0 * u * u * t;
    let c = 3.0 * u * t * t;
    let d = t * t * t;
    (
        a * p0.0 + b * p1.0 + c * p2.0 + d * p3.0,
        a * p0.1 + b * p1.1 + c * p2.1 + d * p3.1,
    )
}

/// Drops repeated points and the middle of collinear runs.
fn simplify(points: Vec<Point>) -> Vec<Point> {
    let mut out: Vec<Point> = Vec::with_capacity(points.len());
    for point in points {
        if let Some(&last) = out.last() {
            if (point.0 - last.0).abs() < POINT_EPSILON && (point.1 - last.1).abs() < POINT_EPSILON {
                continue;
            }
        }
        if out.len() >= 2 {
            let a = out[out.len() - 2];
            let b = out[out.len() - 1];
            let turn = (b.0 - a.0) * (point.1 - b.1) - (b.1 - a.1) * (point.0 - b.0);
            let forward = (b.0 - a.0) * (point.0 - b.0) + (b.1 - a.1) * (point.1 - b.1);
            if turn.abs() < POINT_EPSILON && forward >= 0.0 {
                out.pop();
            }
        }
        out.push(point);
    }
    out
}

fn path_length(points: &[Point]) -> f32 {
    points
        .windows(2)
        .map(|seg| (seg[1].0 - seg[0].0).hypot(seg[1].1 - seg[0].1))
        .sum()
}

fn point_at_half_length(points: &[Point]) -> Option<Point> {
    let first = *points.first()?;
    let mut remaining = path_length(points) / 2.0;
    for seg in points.windows(2) {
        let len = (seg[1].0 - seg[0].0).hypot(seg[1].1 - seg[0].1);
        if len >= remaining && len > 0.0 {
            let t = remaining / len;
            return Some((
                seg[0].0 + (seg[1].0 - seg[0].0) * t,
                seg[0].1 + (seg[1].1 - seg[0].1) * t,
            ));
        }
        remaining -= len;
    }
    Some(first)
}

/// Rectangular loop around one corner of the node. Loops rotate through the
/// corners and move further out once every corner is used.
pub(super) fn route_self_loop(node: &PositionedNode, index: usize, base_pad: f32) -> EdgePath {
    let round = (index / SELF_LOOP_CORNERS) as f32;
    let pad = base_pad * (1.0 + round * SELF_LOOP_GROWTH);
    let x = node.x;
    let y = node.y;
    let w = node.width;
    let h = node.height;
    let cx = x + w / 2.0;
    let cy = y + h / 2.0;
    let left_x = x - pad;
    let right_x = x + w + pad;
    let top_y = y - pad;
    let bottom_y = y + h + pad;

    let (points, corner) = match index % SELF_LOOP_CORNERS {
        0 => (
            vec![(x + w, cy), (right_x, cy), (right_x, top_y), (cx, top_y), (cx, y)],
            (right_x, top_y),
        ),
        1 => (
            vec![(cx, y), (cx, top_y), (left_x, top_y), (left_x, cy), (x, cy)],
            (left_x, top_y),
        ),
        2 => (
            vec![(x, cy), (left_x, cy), (left_x, bottom_y), (cx, bottom_y), (cx, y + h)],
            (left_x, bottom_y),
        ),
        _ => (
            vec![(cx, y + h), (cx, bottom_y), (right_x, bottom_y), (right_x, cy), (x + w, cy)],
            (right_x, bottom_y),
        ),
    };
    EdgePath {
        kind: PathKind::SelfLoop,
        points,
        label_anchor: Some(corner),
    }
}
