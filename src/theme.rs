use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::error::{RuleSection, ThemeWarning, ThemeWarningKind};

/// CSS-equivalent property bag. Ordered so that output is deterministic.
pub type StyleMap = BTreeMap<String, serde_json::Value>;

/// Used whenever a build is not given a theme: every atom and relation is
/// shown with plain styling.
pub static DEFAULT_THEME: Lazy<Theme> = Lazy::new(|| Theme {
    nodes: vec![NodeStyleSpec {
        targets: Some(vec![Target::Wildcard]),
        styles: NodeStyles {
            node: style_map(&[("fill", "#ffffff"), ("stroke", "#333333")]),
            label: style_map(&[("fill", "#333333")]),
        },
        visible: Some(true),
        ..NodeStyleSpec::default()
    }],
    edges: vec![EdgeStyleSpec {
        targets: Some(vec![Target::Wildcard]),
        styles: EdgeStyles {
            edge: style_map(&[("stroke", "#333333")]),
            label: StyleMap::new(),
        },
        visible: Some(true),
        collapse: None,
    }],
    projections: Vec::new(),
});

fn style_map(entries: &[(&str, &str)]) -> StyleMap {
    entries
        .iter()
        .map(|(key, value)| (key.to_string(), serde_json::Value::from(*value)))
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Theme {
    #[serde(default)]
    pub nodes: Vec<NodeStyleSpec>,
    #[serde(default)]
    pub edges: Vec<EdgeStyleSpec>,
    #[serde(default)]
    pub projections: Vec<Projection>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeStyleSpec {
    #[serde(default)]
    pub targets: Option<Vec<Target>>,
    #[serde(default)]
    pub shape: Option<ShapeSpec>,
    #[serde(default)]
    pub styles: NodeStyles,
    #[serde(default)]
    pub props: LabelProps,
    #[serde(default)]
    pub visible: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeStyles {
    #[serde(default)]
    pub node: StyleMap,
    #[serde(default)]
    pub label: StyleMap,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LabelProps {
    #[serde(default)]
    pub label: StyleMap,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EdgeStyleSpec {
    #[serde(default)]
    pub targets: Option<Vec<Target>>,
    #[serde(default)]
    pub styles: EdgeStyles,
    #[serde(default)]
    pub visible: Option<bool>,
    #[serde(default)]
    pub collapse: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EdgeStyles {
    #[serde(default)]
    pub edge: StyleMap,
    #[serde(default)]
    pub label: StyleMap,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Projection {
    #[serde(rename = "type")]
    pub type_name: String,
}

/// Shape as written in a theme file; see [`ShapeSpec::validate`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShapeSpec {
    #[serde(default)]
    pub shape: Option<String>,
    #[serde(default)]
    pub width: Option<f32>,
    #[serde(default)]
    pub height: Option<f32>,
    #[serde(default)]
    pub radius: Option<f32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "shape", rename_all = "lowercase")]
pub enum NodeShape {
    Rectangle { width: f32, height: f32 },
    Circle { radius: f32 },
}

impl NodeShape {
    pub fn size(&self) -> (f32, f32) {
        match *self {
            Self::Rectangle { width, height } => (width, height),
            Self::Circle { radius } => (radius * 2.0, radius * 2.0),
        }
    }
}

impl ShapeSpec {
    pub fn validate(&self) -> Result<NodeShape, ThemeWarningKind> {
        let Some(shape) = self.shape.as_deref() else {
            return Err(ThemeWarningKind::MissingShapeField {
                shape: String::new(),
                field: "shape",
            });
        };
        let require = |value: Option<f32>, field: &'static str| {
            value
                .filter(|v| v.is_finite() && *v > 0.0)
                .ok_or_else(|| ThemeWarningKind::MissingShapeField {
                    shape: shape.to_string(),
                    field,
                })
        };
        match shape {
            "rectangle" | "rect" => Ok(NodeShape::Rectangle {
                width: require(self.width, "width")?,
                height: require(self.height, "height")?,
            }),
            "circle" => Ok(NodeShape::Circle {
                radius: require(self.radius, "radius")?,
            }),
            other => Err(ThemeWarningKind::UnknownShape(other.to_string())),
        }
    }
}

/// Rule selector: every element, or the element (or descendant type) with
/// the given name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawTarget", into = "String")]
pub enum Target {
    Wildcard,
    Exact(String),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawTarget {
    Bare(String),
    Type {
        #[serde(rename = "type")]
        name: String,
    },
    Relation {
        relation: String,
    },
}

impl From<RawTarget> for Target {
    fn from(raw: RawTarget) -> Self {
        match raw {
            RawTarget::Bare(name) if name == "*" => Target::Wildcard,
            RawTarget::Bare(name) | RawTarget::Type { name } | RawTarget::Relation { relation: name } => {
                Target::Exact(name)
            }
        }
    }
}

impl From<Target> for String {
    fn from(target: Target) -> Self {
        match target {
            Target::Wildcard => "*".to_string(),
            Target::Exact(name) => name,
        }
    }
}

impl Target {
    pub fn exact(name: impl Into<String>) -> Self {
        Self::Exact(name.into())
    }

    pub fn matches_name(&self, name: &str) -> bool {
        matches!(self, Self::Exact(target) if target == name)
    }
}

pub trait Targeted {
    fn targets(&self) -> &[Target];

    fn targets_name(&self, name: &str) -> bool {
        self.targets().iter().any(|target| target.matches_name(name))
    }

    fn is_wildcard(&self) -> bool {
        self.targets().contains(&Target::Wildcard)
    }
}

/// Picks the rule for an element. `lineage` is the element's own name
/// followed by its ancestors, nearest first. Exact matches are tried name by
/// name along the lineage; wildcard rules only apply when nothing matched.
/// Within each tier the first declared rule wins.
pub fn resolve_rule<'a, R, S>(rules: &'a [R], lineage: &[S]) -> Option<&'a R>
where
    R: Targeted,
    S: AsRef<str>,
{
    lineage
        .iter()
        .find_map(|name| rules.iter().find(|rule| rule.targets_name(name.as_ref())))
        .or_else(|| rules.iter().find(|rule| rule.is_wildcard()))
}

#[derive(Debug, Clone, PartialEq)]
pub struct NodeRule {
    pub index: usize,
    pub targets: Vec<Target>,
    pub shape: Option<NodeShape>,
    pub node_style: StyleMap,
    pub label_style: StyleMap,
    pub label_props: StyleMap,
    pub visible: Option<bool>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EdgeRule {
    pub index: usize,
    pub targets: Vec<Target>,
    pub edge_style: StyleMap,
    pub label_style: StyleMap,
    pub visible: Option<bool>,
    pub collapse: bool,
}

impl Targeted for NodeRule {
    fn targets(&self) -> &[Target] {
        &self.targets
    }
}

impl Targeted for EdgeRule {
    fn targets(&self) -> &[Target] {
        &self.targets
    }
}

pub trait Visibility: Targeted {
    fn visible(&self) -> Option<bool>;
}

impl Visibility for NodeRule {
    fn visible(&self) -> Option<bool> {
        self.visible
    }
}

impl Visibility for EdgeRule {
    fn visible(&self) -> Option<bool> {
        self.visible
    }
}

/// Whether an element is hidden. Each name on the lineage takes its
/// visibility from the first rule naming it that declares one; the element
/// is hidden if any of them is hidden, so hiding a type hides every subtype.
/// Wildcard visibility only applies when no rule names anything on the
/// lineage, the same case in which `resolve_rule` falls back to a wildcard.
pub fn is_hidden<R, S>(rules: &[R], lineage: &[S]) -> bool
where
    R: Visibility,
    S: AsRef<str>,
{
    let mut matched = false;
    for name in lineage {
        let mut naming = rules
            .iter()
            .filter(|rule| rule.targets_name(name.as_ref()))
            .peekable();
        matched |= naming.peek().is_some();
        if naming.find_map(|rule| rule.visible()) == Some(false) {
            return true;
        }
    }
    if matched {
        return false;
    }
    rules
        .iter()
        .filter(|rule| rule.is_wildcard())
        .find_map(|rule| rule.visible())
        == Some(false)
}

/// Theme with every rule checked; malformed rules are dropped and reported.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidTheme {
    pub nodes: Vec<NodeRule>,
    pub edges: Vec<EdgeRule>,
    pub projections: Vec<String>,
}

fn validate_targets(targets: &Option<Vec<Target>>) -> Result<Vec<Target>, ThemeWarningKind> {
    match targets {
        None => Err(ThemeWarningKind::MissingTargets),
        Some(targets) if targets.is_empty() => Err(ThemeWarningKind::MissingTargets),
        Some(targets) => {
            if targets
                .iter()
                .any(|target| matches!(target, Target::Exact(name) if name.trim().is_empty()))
            {
                return Err(ThemeWarningKind::EmptyTargetName);
            }
            Ok(targets.clone())
        }
    }
}

impl Theme {
    pub fn validated(&self) -> (ValidTheme, Vec<ThemeWarning>) {
        let mut warnings = Vec::new();
        let mut valid = ValidTheme::default();

        for (index, spec) in self.nodes.iter().enumerate() {
            let checked = validate_targets(&spec.targets).and_then(|targets| {
                let shape = spec.shape.as_ref().map(ShapeSpec::validate).transpose()?;
                Ok((targets, shape))
            });
            match checked {
                Ok((targets, shape)) => valid.nodes.push(NodeRule {
                    index,
                    targets,
                    shape,
                    node_style: spec.styles.node.clone(),
                    label_style: spec.styles.label.clone(),
                    label_props: spec.props.label.clone(),
                    visible: spec.visible,
                }),
                Err(kind) => warnings.push(ThemeWarning {
                    section: RuleSection::Nodes,
                    index,
                    kind,
                }),
            }
        }

        for (index, spec) in self.edges.iter().enumerate() {
            match validate_targets(&spec.targets) {
                Ok(targets) => valid.edges.push(EdgeRule {
                    index,
                    targets,
                    edge_style: spec.styles.edge.clone(),
                    label_style: spec.styles.label.clone(),
                    visible: spec.visible,
                    collapse: spec.collapse.unwrap_or(false),
                }),
                Err(kind) => warnings.push(ThemeWarning {
                    section: RuleSection::Edges,
                    index,
                    kind,
                }),
            }
        }

        for (index, projection) in self.projections.iter().enumerate() {
            let type_name = projection.type_name.trim();
            if type_name.is_empty() {
                warnings.push(ThemeWarning {
                    section: RuleSection::Projections,
                    index,
                    kind: ThemeWarningKind::EmptyProjectionType,
                });
            } else {
                valid.projections.push(type_name.to_string());
            }
        }

        for warning in &warnings {
            tracing::warn!(%warning, "skipping theme rule");
        }

        (valid, warnings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node_rule(index: usize, targets: Vec<Target>, visible: Option<bool>) -> NodeRule {
        NodeRule {
            index,
            targets,
            shape: None,
            node_style: StyleMap::new(),
            label_style: StyleMap::new(),
            label_props: StyleMap::new(),
            visible,
        }
    }

    #[test]
    fn first_exact_match_wins() {
        let rules = vec![
            node_rule(0, vec![Target::exact("Node")], None),
            node_rule(1, vec![Target::exact("Node")], None),
        ];
        let rule = resolve_rule(&rules, &["Node"]).unwrap();
        assert_eq!(rule.index, 0);
    }

    #[test]
    fn wildcard_only_matches_what_nothing_else_did() {
        let rules = vec![
            node_rule(0, vec![Target::Wildcard], None),
            node_rule(1, vec![Target::exact("Node")], None),
        ];
        assert_eq!(resolve_rule(&rules, &["Node"]).unwrap().index, 1);
        assert_eq!(resolve_rule(&rules, &["Edge"]).unwrap().index, 0);
    }

    #[test]
    fn nearer_ancestor_beats_farther_one() {
        let rules = vec![
            node_rule(0, vec![Target::exact("univ")], None),
            node_rule(1, vec![Target::exact("Node")], None),
        ];
        let rule = resolve_rule(&rules, &["Leaf", "Node", "univ"]).unwrap();
        assert_eq!(rule.index, 1);
    }

    #[test]
    fn unmatched_element_has_no_rule() {
        let rules = vec![node_rule(0, vec![Target::exact("Node")], None)];
        assert!(resolve_rule(&rules, &["Other"]).is_none());
    }

    #[test]
    fn hidden_ancestor_hides_descendants() {
        let rules = vec![
            node_rule(0, vec![Target::exact("Leaf")], Some(true)),
            node_rule(1, vec![Target::exact("Node")], Some(false)),
        ];
        assert!(is_hidden(&rules, &["Leaf", "Node"]));
        assert!(is_hidden(&rules, &["Node"]));
        assert!(!is_hidden(&rules, &["Other"]));
    }

    #[test]
    fn wildcard_visibility_applies_when_undeclared() {
        let rules = vec![
            node_rule(0, vec![Target::exact("Node")], Some(true)),
            node_rule(1, vec![Target::Wildcard], Some(false)),
        ];
        assert!(!is_hidden(&rules, &["Node"]));
        assert!(is_hidden(&rules, &["Other"]));
    }

    #[test]
    fn hidden_wildcard_spares_types_with_their_own_rule() {
        let rules = vec![
            node_rule(0, vec![Target::Wildcard], Some(false)),
            node_rule(1, vec![Target::exact("Node")], None),
        ];
        assert!(!is_hidden(&rules, &["Node"]));
        assert!(!is_hidden(&rules, &["Leaf", "Node"]));
        assert!(is_hidden(&rules, &["Other"]));
        assert_eq!(resolve_rule(&rules, &["Leaf", "Node"]).unwrap().index, 1);
    }

    #[test]
    fn parses_theme_targets() {
        let json = r#"{
            "nodes": [
                {"targets": [{"type": "Node"}, "*"], "shape": {"shape": "circle", "radius": 12}},
                {"shape": {"shape": "rectangle", "width": 10}}
            ],
            "edges": [{"targets": [{"relation": "next"}], "collapse": true}],
            "projections": [{"type": "Time"}]
        }"#;
        let theme: Theme = serde_json::from_str(json).unwrap();
        assert_eq!(
            theme.nodes[0].targets,
            Some(vec![Target::exact("Node"), Target::Wildcard])
        );
        let (valid, warnings) = theme.validated();
        assert_eq!(valid.nodes.len(), 1);
        assert_eq!(valid.nodes[0].shape, Some(NodeShape::Circle { radius: 12.0 }));
        assert!(valid.edges[0].collapse);
        assert_eq!(valid.projections, vec!["Time".to_string()]);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].index, 1);
        assert_eq!(warnings[0].kind, ThemeWarningKind::MissingTargets);
    }

    #[test]
    fn malformed_shape_skips_rule() {
        let theme = Theme {
            nodes: vec![NodeStyleSpec {
                targets: Some(vec![Target::Wildcard]),
                shape: Some(ShapeSpec {
                    shape: Some("rectangle".to_string()),
                    width: Some(20.0),
                    ..ShapeSpec::default()
                }),
                ..NodeStyleSpec::default()
            }],
            ..Theme::default()
        };
        let (valid, warnings) = theme.validated();
        assert!(valid.nodes.is_empty());
        assert_eq!(
            warnings[0].kind,
            ThemeWarningKind::MissingShapeField {
                shape: "rectangle".to_string(),
                field: "height"
            }
        );
    }

    #[test]
    fn default_theme_shows_everything() {
        let (valid, warnings) = DEFAULT_THEME.validated();
        assert!(warnings.is_empty());
        assert!(resolve_rule(&valid.nodes, &["Anything"]).is_some());
        assert!(resolve_rule(&valid.edges, &["rel"]).is_some());
        assert!(!is_hidden(&valid.nodes, &["Anything"]));
    }
}
