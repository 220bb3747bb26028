use std::collections::BTreeMap;

use crate::types::{Kind, TypeNode, UnionType};

/// Canonical union of any number of observations.
///
/// Alternatives are bucketed by outer kind and each bucket is folded with
/// [`super::unify`]; nested unions are flattened and `Unknown` contributes
/// nothing. Zero buckets give `Unknown`, one bucket gives its node, more give
/// a `UnionType` sorted by kind. Since the result only depends on the
/// per-kind folds, building it is order-independent.
pub fn from_alternatives<I>(alternatives: I) -> TypeNode
where
    I: IntoIterator<Item = TypeNode>,
{
    let mut arms: BTreeMap<Kind, TypeNode> = BTreeMap::new();
    for alt in alternatives {
        insert(&mut arms, alt);
    }
    match arms.len() {
        0 => TypeNode::Unknown,
        1 => arms.into_values().next().unwrap_or_default(),
        _ => TypeNode::Union(UnionType { alternatives: arms.into_values().collect() }),
    }
}

fn insert(arms: &mut BTreeMap<Kind, TypeNode>, alt: TypeNode) {
    match alt {
        TypeNode::Unknown => {}
        TypeNode::Union(u) => {
            for inner in u.alternatives {
                insert(arms, inner);
            }
        }
        node => {
            let Some(kind) = node.kind() else { return };
            match arms.remove(&kind) {
                Some(existing) => {
                    arms.insert(kind, super::unify(existing, node));
                }
                None => {
                    arms.insert(kind, node);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AttributeType, ObjectType};

    #[test]
    fn empty_and_unknown_collapse_to_unknown() {
        assert_eq!(from_alternatives([]), TypeNode::Unknown);
        assert_eq!(from_alternatives([TypeNode::Unknown, TypeNode::Unknown]), TypeNode::Unknown);
    }

    #[test]
    fn single_kind_collapses_to_member() {
        assert_eq!(from_alternatives([TypeNode::NUMBER, TypeNode::NUMBER, TypeNode::Unknown]), TypeNode::NUMBER);
    }

    #[test]
    fn alternatives_are_sorted_by_kind() {
        let u = from_alternatives([TypeNode::STRING, TypeNode::list(TypeNode::BOOL), TypeNode::BOOL]);
        let u = u.as_union().unwrap();
        assert_eq!(u.alternatives(), &[TypeNode::BOOL, TypeNode::STRING, TypeNode::list(TypeNode::BOOL)]);
    }

    #[test]
    fn same_kind_alternatives_are_unified() {
        let a: ObjectType = [("x", AttributeType::required(TypeNode::NUMBER))].into_iter().collect();
        let b: ObjectType = [("y", AttributeType::required(TypeNode::STRING))].into_iter().collect();
        let u = from_alternatives([TypeNode::from(a), TypeNode::BOOL, TypeNode::from(b)]);
        let expected: ObjectType = [
            ("x", AttributeType::nullable(TypeNode::NUMBER)),
            ("y", AttributeType::nullable(TypeNode::STRING)),
        ]
        .into_iter()
        .collect();
        assert_eq!(u.as_union().unwrap().alternatives(), &[TypeNode::BOOL, TypeNode::from(expected)]);
    }

    #[test]
    fn nested_unions_flatten() {
        let inner = from_alternatives([TypeNode::NUMBER, TypeNode::STRING]);
        let outer = from_alternatives([inner, TypeNode::BOOL]);
        let u = outer.as_union().unwrap();
        assert_eq!(u.len(), 3);
        assert!(u.alternatives().iter().all(|a| a.as_union().is_none()));
    }
}
