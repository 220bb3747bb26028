#![allow(dead_code)]

use json_shapes::{Kind, TypeNode, Value};
use proptest::prelude::*;

/// Small JSON-like trees: few attribute names so objects overlap often.
pub fn arb_value() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        (-3i32..3).prop_map(|n| Value::number(f64::from(n))),
        "[xy]{0,2}".prop_map(Value::String),
    ];
    leaf.prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::List),
            prop::collection::btree_map("[a-d]", inner, 0..4)
                .prop_map(|m| Value::Object(m.into_iter().collect())),
        ]
    })
}

/// Top-level documents are mostly objects, like a record stream.
pub fn arb_document() -> impl Strategy<Value = Value> {
    prop_oneof![
        4 => prop::collection::btree_map("[a-d]", arb_value(), 0..4)
            .prop_map(|m| Value::Object(m.into_iter().collect())),
        1 => arb_value(),
    ]
}

/// Inferred nodes, including unions built from several observations.
pub fn arb_type() -> impl Strategy<Value = TypeNode> {
    prop::collection::vec(arb_value(), 1..3)
        .prop_map(|vs| json_shapes::inference::infer_from_values(vs.iter()))
}

/// Every union has ≥ 2 alternatives, one per kind in ascending order, and
/// no nested union or unknown member.
pub fn assert_canonical(t: &TypeNode) {
    match t {
        TypeNode::Unknown | TypeNode::Primitive(_) | TypeNode::Ref(_) => {}
        TypeNode::List(l) => assert_canonical(&l.element),
        TypeNode::Object(o) => o.attributes.values().for_each(|a| assert_canonical(&a.ty)),
        TypeNode::Union(u) => {
            assert!(u.len() >= 2, "degenerate union {t}");
            let kinds: Vec<Kind> = u.alternatives().iter().map(|a| a.kind().expect("union member has a kind")).collect();
            assert!(kinds.windows(2).all(|w| w[0] < w[1]), "union kinds not unique/sorted in {t}");
            u.alternatives().iter().for_each(assert_canonical);
        }
    }
}

pub fn doc(v: serde_json::Value) -> Value {
    Value::from(v)
}

/// All orderings of `0..n`.
pub fn permutations(n: usize) -> Vec<Vec<usize>> {
    if n == 0 {
        return vec![Vec::new()];
    }
    let mut out = Vec::new();
    for rest in permutations(n - 1) {
        for slot in 0..=rest.len() {
            let mut p = rest.clone();
            p.insert(slot, n - 1);
            out.push(p);
        }
    }
    out
}
