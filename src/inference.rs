//! Value → TypeNode inference and the join (⊔) that merges observations.
//!
//! Inference is a pure, total walk over one document. The join is
//! associative, commutative and idempotent with `Unknown` as identity, so
//! any fold order over any batching of documents gives the same type.
//! Conflicting observations widen to a union; they are never errors.
pub mod union;
pub mod unify;
mod obj;

use crate::types::{AttributeType, ObjectType, PrimitiveKind, TypeNode};
use crate::value::Value;

pub use unify::{unify, unify_all};

// ------------------------------ Observe ---------------------------------- //

/// Infer the type of one document.
///
/// `Null` infers `Unknown`; whether an attribute is nullable is decided by
/// the enclosing object. List elements are folded with [`unify`], so null
/// elements add nothing and element nullability is not tracked. If an object
/// repeats a key (a broken value model) the repeated observations are
/// unified; the registry rejects such values before they get here.
pub fn infer(v: &Value) -> TypeNode {
    match v {
        Value::Null => TypeNode::Unknown,
        Value::Bool(_) => TypeNode::Primitive(PrimitiveKind::Bool),
        Value::Number(_) => TypeNode::Primitive(PrimitiveKind::Number),
        Value::String(_) => TypeNode::Primitive(PrimitiveKind::String),
        Value::List(xs) => TypeNode::list(unify_all(xs.iter().map(infer))),
        Value::Object(fields) => TypeNode::Object(infer_object(fields)),
    }
}

fn infer_object(fields: &[(String, Value)]) -> ObjectType {
    let mut obj = ObjectType::default();
    for (k, v) in fields {
        let attr = AttributeType { ty: infer(v), nullable: v.is_null() };
        let attr = match obj.attributes.remove(k) {
            Some(prev) => AttributeType {
                ty: unify(prev.ty, attr.ty),
                nullable: prev.nullable || attr.nullable,
            },
            None => attr,
        };
        obj.attributes.insert(k.clone(), attr);
    }
    obj
}

/// Infer and fold a batch of documents into a single type.
pub fn infer_from_values<'a, I>(values: I) -> TypeNode
where
    I: IntoIterator<Item = &'a Value>,
{
    unify_all(values.into_iter().map(infer))
}

// ------------------------------- Tests ------------------------------------ //
