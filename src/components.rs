use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::Serialize;

use crate::error::Result;
use crate::instance::{Instance, LineageCache};
use crate::theme::{
    DEFAULT_THEME, EdgeRule, NodeShape, StyleMap, Theme, ValidTheme, is_hidden, resolve_rule,
};

/// Structural edge identity: relation, endpoints and, for relations of arity
/// three or more, the tuple's position in the relation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct EdgeId(String);

impl EdgeId {
    pub fn new(relation: &str, source: &str, target: &str, tuple_index: Option<usize>) -> Self {
        match tuple_index {
            Some(index) => Self(format!("{relation}:{source}->{target}#{index}")),
            None => Self(format!("{relation}:{source}->{target}")),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A visible atom together with the styling its theme rule assigned.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AtomNode {
    /// Atom id; the node's identity across every instance of a trace.
    pub id: String,
    pub type_name: String,
    pub label: Vec<String>,
    pub shape: Option<NodeShape>,
    pub node_style: StyleMap,
    pub label_style: StyleMap,
    pub label_props: StyleMap,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlloyEdge {
    pub id: EdgeId,
    pub relation: String,
    pub source: String,
    pub target: String,
    pub label: String,
    pub edge_style: StyleMap,
    pub label_style: StyleMap,
}

impl AlloyEdge {
    pub fn is_self_loop(&self) -> bool {
        self.source == self.target
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GraphComponents {
    pub nodes: Vec<AtomNode>,
    pub edges: Vec<AlloyEdge>,
}

/// Visible nodes and edges of one instance under `theme` (the built-in
/// theme when `None`). Malformed rules are skipped and returned as
/// warnings.
pub fn extract_components(
    instance: &Instance,
    theme: Option<&Theme>,
) -> Result<(GraphComponents, Vec<crate::error::ThemeWarning>)> {
    instance.validate(0)?;
    let (rules, warnings) = theme.unwrap_or(&DEFAULT_THEME).validated();
    let components = extract_visible(instance, &rules)?;
    Ok((components, warnings))
}

pub(crate) fn extract_visible(instance: &Instance, theme: &ValidTheme) -> Result<GraphComponents> {
    let hierarchy = instance.hierarchy();
    let mut lineages = LineageCache::default();

    let mut nodes: Vec<AtomNode> = Vec::new();
    let mut node_index: HashMap<&str, usize> = HashMap::new();
    for atom in &instance.atoms {
        let lineage = lineages.lineage(&hierarchy, &atom.type_name)?;
        if is_hidden(&theme.nodes, lineage) {
            continue;
        }
        let Some(rule) = resolve_rule(&theme.nodes, lineage) else {
            continue;
        };
        node_index.insert(atom.id.as_str(), nodes.len());
        nodes.push(AtomNode {
            id: atom.id.clone(),
            type_name: atom.type_name.clone(),
            label: vec![atom.id.clone()],
            shape: rule.shape,
            node_style: rule.node_style.clone(),
            label_style: rule.label_style.clone(),
            label_props: rule.label_props.clone(),
        });
    }

    let mut sets: Vec<Vec<String>> = vec![Vec::new(); nodes.len()];
    let mut attributes: Vec<Vec<String>> = vec![Vec::new(); nodes.len()];
    let mut edges: Vec<AlloyEdge> = Vec::new();
    let mut seen_edges: HashSet<EdgeId> = HashSet::new();

    for relation in &instance.relations {
        let lineage = [relation.name.as_str()];
        if is_hidden(&theme.edges, &lineage) {
            continue;
        }
        let Some(rule) = resolve_rule(&theme.edges, &lineage) else {
            continue;
        };
        for (tuple_index, tuple) in relation.tuples.iter().enumerate() {
            let (Some(source), Some(target)) = (tuple.atoms.first(), tuple.atoms.last()) else {
                continue;
            };
            let Some(&source_idx) = node_index.get(source.as_str()) else {
                continue;
            };
            if tuple.arity() == 1 {
                sets[source_idx].push(format!("({})", relation.name));
                continue;
            }
            if !tuple
                .atoms
                .iter()
                .all(|id| node_index.contains_key(id.as_str()))
            {
                continue;
            }
            let label = edge_label(&relation.name, &tuple.atoms[1..tuple.arity() - 1]);
            if rule.collapse {
                attributes[source_idx].push(format!("{label}: {target}"));
                continue;
            }
            let tuple_index = (tuple.arity() > 2).then_some(tuple_index);
            let id = EdgeId::new(&relation.name, source, target, tuple_index);
            if !seen_edges.insert(id.clone()) {
                continue;
            }
            edges.push(new_edge(id, &relation.name, source, target, label, rule));
        }
    }

    for ((node, sets), attributes) in nodes.iter_mut().zip(sets).zip(attributes) {
        node.label.extend(sets);
        node.label.extend(attributes);
    }

    tracing::trace!(
        nodes = nodes.len(),
        edges = edges.len(),
        "extracted visible components"
    );
    Ok(GraphComponents { nodes, edges })
}

fn edge_label(relation: &str, middle: &[String]) -> String {
    if middle.is_empty() {
        relation.to_string()
    } else {
        format!("{relation}[{}]", middle.join(", "))
    }
}

fn new_edge(
    id: EdgeId,
    relation: &str,
    source: &str,
    target: &str,
    label: String,
    rule: &EdgeRule,
) -> AlloyEdge {
    AlloyEdge {
        id,
        relation: relation.to_string(),
        source: source.to_string(),
        target: target.to_string(),
        label,
        edge_style: rule.edge_style.clone(),
        label_style: rule.label_style.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{GraphError, ThemeWarningKind};
    use crate::instance::{AlloyType, Atom, Relation, Tuple};
    use crate::theme::{EdgeStyleSpec, NodeStyleSpec, ShapeSpec, Target};

    fn atom(id: &str, type_name: &str) -> Atom {
        Atom {
            id: id.to_string(),
            type_name: type_name.to_string(),
        }
    }

    fn relation(name: &str, tuples: &[&[&str]]) -> Relation {
        Relation {
            name: name.to_string(),
            tuples: tuples.iter().map(|t| Tuple::new(t.iter().copied())).collect(),
        }
    }

    fn sample() -> Instance {
        Instance {
            types: vec![
                AlloyType {
                    id: "Node".to_string(),
                    parent: None,
                },
                AlloyType {
                    id: "Leaf".to_string(),
                    parent: Some("Node".to_string()),
                },
            ],
            atoms: vec![atom("N0", "Node"), atom("L0", "Leaf"), atom("X0", "Other")],
            relations: vec![
                relation("next", &[&["N0", "L0"], &["L0", "L0"]]),
                relation("root", &[&["N0"]]),
                relation("edge", &[&["N0", "X0", "L0"]]),
            ],
            projected: Vec::new(),
        }
    }

    fn wildcard_nodes() -> NodeStyleSpec {
        NodeStyleSpec {
            targets: Some(vec![Target::Wildcard]),
            ..NodeStyleSpec::default()
        }
    }

    fn wildcard_edges() -> EdgeStyleSpec {
        EdgeStyleSpec {
            targets: Some(vec![Target::Wildcard]),
            ..EdgeStyleSpec::default()
        }
    }

    #[test]
    fn default_theme_shows_all_atoms_and_tuples() {
        let (components, warnings) = extract_components(&sample(), None).unwrap();
        assert!(warnings.is_empty());
        let ids: Vec<&str> = components.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["N0", "L0", "X0"]);
        let edges: Vec<&str> = components.edges.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(edges, vec!["next:N0->L0", "next:L0->L0", "edge:N0->L0#0"]);
        assert_eq!(components.edges[2].label, "edge[X0]");
        assert_eq!(components.nodes[0].label, vec!["N0", "(root)"]);
    }

    #[test]
    fn hiding_a_type_hides_subtypes_and_their_edges() {
        let theme = Theme {
            nodes: vec![
                NodeStyleSpec {
                    targets: Some(vec![Target::exact("Node")]),
                    visible: Some(false),
                    ..NodeStyleSpec::default()
                },
                wildcard_nodes(),
            ],
            edges: vec![wildcard_edges()],
            projections: Vec::new(),
        };
        let (components, _) = extract_components(&sample(), Some(&theme)).unwrap();
        let ids: Vec<&str> = components.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["X0"]);
        assert!(components.edges.is_empty());
    }

    #[test]
    fn unmatched_atoms_are_excluded() {
        let theme = Theme {
            nodes: vec![NodeStyleSpec {
                targets: Some(vec![Target::exact("Node")]),
                ..NodeStyleSpec::default()
            }],
            edges: vec![wildcard_edges()],
            projections: Vec::new(),
        };
        let (components, _) = extract_components(&sample(), Some(&theme)).unwrap();
        let ids: Vec<&str> = components.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["N0", "L0"]);
        let edges: Vec<&str> = components.edges.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(edges, vec!["next:N0->L0", "next:L0->L0"]);
    }

    #[test]
    fn hidden_wildcard_keeps_types_with_their_own_rule() {
        let theme = Theme {
            nodes: vec![
                NodeStyleSpec {
                    visible: Some(false),
                    ..wildcard_nodes()
                },
                NodeStyleSpec {
                    targets: Some(vec![Target::exact("Node")]),
                    ..NodeStyleSpec::default()
                },
            ],
            edges: vec![wildcard_edges()],
            projections: Vec::new(),
        };
        let (components, _) = extract_components(&sample(), Some(&theme)).unwrap();
        let ids: Vec<&str> = components.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["N0", "L0"]);
        let edges: Vec<&str> = components.edges.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(edges, vec!["next:N0->L0", "next:L0->L0"]);
    }

    #[test]
    fn collapsed_relation_becomes_attribute() {
        let theme = Theme {
            nodes: vec![wildcard_nodes()],
            edges: vec![
                EdgeStyleSpec {
                    targets: Some(vec![Target::exact("next")]),
                    collapse: Some(true),
                    ..EdgeStyleSpec::default()
                },
                wildcard_edges(),
            ],
            projections: Vec::new(),
        };
        let (components, _) = extract_components(&sample(), Some(&theme)).unwrap();
        assert!(components.edges.iter().all(|edge| edge.relation != "next"));
        assert_eq!(components.nodes[0].label, vec!["N0", "(root)", "next: L0"]);
        assert_eq!(components.nodes[1].label, vec!["L0", "next: L0"]);
    }

    #[test]
    fn malformed_rule_is_skipped_with_warning() {
        let theme = Theme {
            nodes: vec![
                NodeStyleSpec {
                    targets: Some(vec![Target::exact("Node")]),
                    shape: Some(ShapeSpec {
                        shape: Some("hexagon".to_string()),
                        ..ShapeSpec::default()
                    }),
                    ..NodeStyleSpec::default()
                },
                NodeStyleSpec {
                    targets: Some(vec![Target::exact("Node")]),
                    shape: Some(ShapeSpec {
                        shape: Some("circle".to_string()),
                        radius: Some(10.0),
                        ..ShapeSpec::default()
                    }),
                    ..NodeStyleSpec::default()
                },
            ],
            edges: Vec::new(),
            projections: Vec::new(),
        };
        let (components, warnings) = extract_components(&sample(), Some(&theme)).unwrap();
        assert_eq!(warnings.len(), 1);
        assert_eq!(
            warnings[0].kind,
            ThemeWarningKind::UnknownShape("hexagon".to_string())
        );
        assert_eq!(components.nodes.len(), 2);
        assert_eq!(
            components.nodes[0].shape,
            Some(NodeShape::Circle { radius: 10.0 })
        );
        assert!(components.edges.is_empty());
    }

    #[test]
    fn hidden_relation_drops_edges() {
        let theme = Theme {
            nodes: vec![wildcard_nodes()],
            edges: vec![
                EdgeStyleSpec {
                    targets: Some(vec![Target::exact("next")]),
                    visible: Some(false),
                    ..EdgeStyleSpec::default()
                },
                wildcard_edges(),
            ],
            projections: Vec::new(),
        };
        let (components, _) = extract_components(&sample(), Some(&theme)).unwrap();
        let edges: Vec<&str> = components.edges.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(edges, vec!["edge:N0->L0#0"]);
    }

    #[test]
    fn type_cycle_is_reported() {
        let mut instance = sample();
        instance.types.push(AlloyType {
            id: "Other".to_string(),
            parent: Some("Other".to_string()),
        });
        let err = extract_components(&instance, None).unwrap_err();
        assert!(matches!(err, GraphError::TypeHierarchyCycle { .. }));
        assert!(err.is_config_error());
    }
}
