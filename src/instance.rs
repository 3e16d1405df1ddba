use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::{GraphError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trace {
    pub instances: Vec<Instance>,
    pub loop_back: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Instance {
    #[serde(default)]
    pub types: Vec<AlloyType>,
    #[serde(default)]
    pub atoms: Vec<Atom>,
    #[serde(default)]
    pub relations: Vec<Relation>,
    /// Atoms projected away to produce this instance, in projection order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub projected: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlloyType {
    pub id: String,
    #[serde(default)]
    pub parent: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Atom {
    pub id: String,
    #[serde(rename = "type")]
    pub type_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relation {
    pub name: String,
    #[serde(default)]
    pub tuples: Vec<Tuple>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tuple {
    pub atoms: Vec<String>,
}

impl Trace {
    pub fn new(instances: Vec<Instance>, loop_back: usize) -> Result<Self> {
        let trace = Self {
            instances,
            loop_back,
        };
        trace.validate()?;
        Ok(trace)
    }

    /// Checks everything the pipeline relies on: a non-empty trace, a
    /// loop-back inside it and well-formed atom identities in every instance.
    pub fn validate(&self) -> Result<()> {
        if self.instances.is_empty() {
            return Err(GraphError::EmptyTrace);
        }
        if self.loop_back >= self.instances.len() {
            return Err(GraphError::LoopBackOutOfRange {
                loop_back: self.loop_back,
                len: self.instances.len(),
            });
        }
        for (idx, instance) in self.instances.iter().enumerate() {
            instance.validate(idx)?;
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Index of the step after `index`; the last instance steps back to the
    /// loop-back instance.
    pub fn next_index(&self, index: usize) -> usize {
        if index + 1 >= self.instances.len() {
            self.loop_back
        } else {
            index + 1
        }
    }
}

impl Instance {
    pub fn validate(&self, index: usize) -> Result<()> {
        let mut seen: HashSet<&str> = HashSet::new();
        for (position, atom) in self.atoms.iter().enumerate() {
            if atom.id.trim().is_empty() {
                return Err(GraphError::MissingAtomId {
                    instance: index,
                    position,
                });
            }
            if atom.type_name.trim().is_empty() {
                return Err(GraphError::MissingAtomType {
                    instance: index,
                    atom_id: atom.id.clone(),
                });
            }
            if !seen.insert(atom.id.as_str()) {
                return Err(GraphError::DuplicateAtom {
                    instance: index,
                    atom_id: atom.id.clone(),
                });
            }
        }
        for relation in &self.relations {
            for tuple in &relation.tuples {
                if let Some(unknown) = tuple.atoms.iter().find(|id| !seen.contains(id.as_str())) {
                    return Err(GraphError::UnknownAtom {
                        instance: index,
                        relation: relation.name.clone(),
                        atom_id: unknown.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    pub fn atom(&self, id: &str) -> Option<&Atom> {
        self.atoms.iter().find(|atom| atom.id == id)
    }

    pub fn hierarchy(&self) -> TypeHierarchy {
        TypeHierarchy::from_types(&self.types)
    }
}

impl Tuple {
    pub fn new<I, S>(atoms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            atoms: atoms.into_iter().map(Into::into).collect(),
        }
    }

    pub fn arity(&self) -> usize {
        self.atoms.len()
    }
}

/// Parent-pointer view over an instance's declared types.
#[derive(Debug, Clone, Default)]
pub struct TypeHierarchy {
    parents: BTreeMap<String, String>,
}

impl TypeHierarchy {
    pub fn from_types(types: &[AlloyType]) -> Self {
        let mut parents = BTreeMap::new();
        for ty in types {
            if let Some(parent) = ty.parent.as_ref().filter(|parent| !parent.is_empty()) {
                parents.insert(ty.id.clone(), parent.clone());
            }
        }
        Self { parents }
    }

    pub fn parent(&self, type_name: &str) -> Option<&str> {
        self.parents.get(type_name).map(String::as_str)
    }

    /// The type itself followed by its ancestors, nearest first.
    pub fn lineage<'a>(&'a self, type_name: &'a str) -> Result<Vec<&'a str>> {
        let mut lineage = vec![type_name];
        let mut visited: HashSet<&str> = HashSet::new();
        visited.insert(type_name);
        let mut current = type_name;
        while let Some(parent) = self.parent(current) {
            if !visited.insert(parent) {
                return Err(GraphError::TypeHierarchyCycle {
                    type_name: type_name.to_string(),
                });
            }
            lineage.push(parent);
            current = parent;
        }
        Ok(lineage)
    }

    pub fn is_a(&self, type_name: &str, ancestor: &str) -> Result<bool> {
        Ok(self.lineage(type_name)?.contains(&ancestor))
    }
}

/// Lineage lookups cached per type for one extraction pass.
#[derive(Debug, Default)]
pub(crate) struct LineageCache {
    lineages: HashMap<String, Vec<String>>,
}

impl LineageCache {
    pub(crate) fn lineage(&mut self, hierarchy: &TypeHierarchy, type_name: &str) -> Result<&[String]> {
        if !self.lineages.contains_key(type_name) {
            let lineage = hierarchy
                .lineage(type_name)?
                .into_iter()
                .map(str::to_string)
                .collect();
            self.lineages.insert(type_name.to_string(), lineage);
        }
        Ok(self
            .lineages
            .get(type_name)
            .map(Vec::as_slice)
            .unwrap_or_default())
    }
}
