use std::collections::HashSet;

use crate::error::Result;
use crate::instance::{Instance, Relation, Tuple};

/// Applies each projection in order. An instance holding atoms of the
/// projected type (or a subtype) becomes one variant per such atom, in atom
/// order; instances without any are passed through untouched.
pub fn project_instances(instances: &[Instance], projections: &[String]) -> Result<Vec<Instance>> {
    let mut current = instances.to_vec();
    for type_name in projections {
        let mut next = Vec::with_capacity(current.len());
        for instance in &current {
            next.extend(project_instance(instance, type_name)?);
        }
        tracing::debug!(
            projection = %type_name,
            before = current.len(),
            after = next.len(),
            "applied projection"
        );
        current = next;
    }
    Ok(current)
}

pub fn project_instance(instance: &Instance, type_name: &str) -> Result<Vec<Instance>> {
    let hierarchy = instance.hierarchy();
    let mut projected: Vec<&str> = Vec::new();
    for atom in &instance.atoms {
        if hierarchy.is_a(&atom.type_name, type_name)? {
            projected.push(atom.id.as_str());
        }
    }
    if projected.is_empty() {
        return Ok(vec![instance.clone()]);
    }

    let projected_set: HashSet<&str> = projected.iter().copied().collect();
    let atoms: Vec<_> = instance
        .atoms
        .iter()
        .filter(|atom| !projected_set.contains(atom.id.as_str()))
        .cloned()
        .collect();

    Ok(projected
        .iter()
        .map(|focus| {
            let relations = instance
                .relations
                .iter()
                .map(|relation| collapse_relation(relation, focus, &projected_set))
                .collect();
            let mut trail = instance.projected.clone();
            trail.push(focus.to_string());
            Instance {
                types: instance.types.clone(),
                atoms: atoms.clone(),
                relations,
                projected: trail,
            }
        })
        .collect())
}

/// Keeps the tuples that mention no projected atom other than `focus` and
/// strips the projected columns from them.
fn collapse_relation(relation: &Relation, focus: &str, projected: &HashSet<&str>) -> Relation {
    let tuples = relation
        .tuples
        .iter()
        .filter(|tuple| {
            tuple
                .atoms
                .iter()
                .all(|id| !projected.contains(id.as_str()) || id == focus)
        })
        .map(|tuple| {
            Tuple::new(
                tuple
                    .atoms
                    .iter()
                    .filter(|id| !projected.contains(id.as_str())),
            )
        })
        .filter(|tuple| tuple.arity() > 0)
        .collect();
    Relation {
        name: relation.name.clone(),
        tuples,
    }
}
