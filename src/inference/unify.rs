use crate::types::{ListType, ObjectType, TypeNode};

use super::union;

/// Merge two observations into the most specific node describing both.
///
/// Commutative, associative and idempotent; `Unknown` is the identity.
/// Incompatible kinds widen to a union instead of failing.
///
/// | a | b | result |
/// |---|---|---|
/// | `Unknown` | x | x |
/// | `Primitive(k)` | `Primitive(k)` | `Primitive(k)` |
/// | `List(e1)` | `List(e2)` | `List(unify(e1, e2))` |
/// | `Object(a)` | `Object(b)` | `Object(merge_attrs(a, b))` |
/// | `Ref(a)` | `Ref(b)` | `Ref` with both target sets |
/// | union | anything | per-kind fold of all alternatives |
/// | otherwise | | `Union{a, b}` |
pub fn unify(a: TypeNode, b: TypeNode) -> TypeNode {
    match (a, b) {
        (TypeNode::Unknown, x) | (x, TypeNode::Unknown) => x,
        (TypeNode::Primitive(p), TypeNode::Primitive(q)) if p == q => TypeNode::Primitive(p),
        (TypeNode::List(x), TypeNode::List(y)) => TypeNode::List(ListType {
            element: Box::new(unify(*x.element, *y.element)),
        }),
        (TypeNode::Object(x), TypeNode::Object(y)) => TypeNode::Object(ObjectType::join(x, y)),
        (TypeNode::Ref(x), TypeNode::Ref(y)) => TypeNode::Ref(x.join(y)),
        // unions (either side) and incompatible kinds
        (a, b) => union::from_alternatives([a, b]),
    }
}

/// Fold any number of observations; `Unknown` when empty.
pub fn unify_all<I>(nodes: I) -> TypeNode
where
    I: IntoIterator<Item = TypeNode>,
{
    nodes.into_iter().fold(TypeNode::Unknown, unify)
}
