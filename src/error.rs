use std::fmt;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, GraphError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("trace has no instances")]
    EmptyTrace,
    #[error("loop-back index {loop_back} is outside a trace of {len} instances")]
    LoopBackOutOfRange { loop_back: usize, len: usize },
    #[error("instance {instance}: atom #{position} has no id")]
    MissingAtomId { instance: usize, position: usize },
    #[error("instance {instance}: atom {atom_id} has no type")]
    MissingAtomType { instance: usize, atom_id: String },
    #[error("instance {instance}: atom {atom_id} appears more than once")]
    DuplicateAtom { instance: usize, atom_id: String },
    #[error("instance {instance}: relation {relation} references unknown atom {atom_id}")]
    UnknownAtom {
        instance: usize,
        relation: String,
        atom_id: String,
    },
    #[error("type {type_name} is declared as its own ancestor")]
    TypeHierarchyCycle { type_name: String },
    #[error("no layout position for node {node_id}; the layout does not cover the trace")]
    MissingPosition { node_id: String },
    #[error("no routed path for edge {edge_id}; the layout does not cover the trace")]
    MissingPath { edge_id: String },
    #[error("graph {graph} has no source instance")]
    MissingOrigin { graph: usize },
}

impl GraphError {
    /// Errors caused by a malformed trace handed to the pipeline.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Self::EmptyTrace
                | Self::LoopBackOutOfRange { .. }
                | Self::MissingAtomId { .. }
                | Self::MissingAtomType { .. }
                | Self::DuplicateAtom { .. }
                | Self::UnknownAtom { .. }
        )
    }

    pub fn is_config_error(&self) -> bool {
        matches!(self, Self::TypeHierarchyCycle { .. })
    }

    /// Pipeline bugs: a stage broke the contract of an earlier one.
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            Self::MissingPosition { .. } | Self::MissingPath { .. } | Self::MissingOrigin { .. }
        )
    }
}

/// A theme rule that could not be used. The rule is skipped and the build
/// carries on with the remaining rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThemeWarning {
    pub section: RuleSection,
    pub index: usize,
    pub kind: ThemeWarningKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleSection {
    Nodes,
    Edges,
    Projections,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThemeWarningKind {
    MissingTargets,
    EmptyTargetName,
    UnknownShape(String),
    MissingShapeField { shape: String, field: &'static str },
    EmptyProjectionType,
}

impl fmt::Display for RuleSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Nodes => "nodes",
            Self::Edges => "edges",
            Self::Projections => "projections",
        };
        f.write_str(name)
    }
}

impl fmt::Display for ThemeWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "theme {}[{}]: ", self.section, self.index)?;
        match &self.kind {
            ThemeWarningKind::MissingTargets => f.write_str("rule has no targets"),
            ThemeWarningKind::EmptyTargetName => f.write_str("rule target has an empty name"),
            ThemeWarningKind::UnknownShape(shape) => write!(f, "unknown shape {shape:?}"),
            ThemeWarningKind::MissingShapeField { shape, field } => {
                write!(f, "shape {shape:?} is missing {field}")
            }
            ThemeWarningKind::EmptyProjectionType => f.write_str("projection has no type"),
        }
    }
}
