mod common;

use common::{arb_document, doc, permutations};
use json_shapes::inference::union;
use json_shapes::shard::infer_sharded;
use json_shapes::{AttributeType, Grouping, Registry, RegistryConfig, Shape, TypeNode, Value};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use serde_json::json;

fn run(config: &RegistryConfig, docs: &[Value]) -> (Vec<Shape>, TypeNode, u64) {
    let mut reg = Registry::new(config.clone());
    reg.register_all(docs).expect("generated documents have unique keys");
    (reg.shapes().cloned().collect(), reg.root().clone(), reg.documents())
}

fn configs() -> Vec<RegistryConfig> {
    vec![
        RegistryConfig::default(),
        RegistryConfig::default().with_grouping(Grouping::Merged),
        RegistryConfig::default().with_discriminator("a"),
    ]
}

#[test]
fn every_permutation_of_a_fixed_set_agrees() {
    let docs = [
        doc(json!({"id": 1, "name": "Alice", "tags": ["x"]})),
        doc(json!({"id": "2", "email": null})),
        doc(json!({"email": "b@example.com", "tags": []})),
        doc(json!({"size": [1, "s", null]})),
        doc(json!([{"id": 1}])),
        doc(json!({"owner": {"a": "x", "name": "B"}, "size": 3})),
    ];
    for config in configs() {
        let expected = run(&config, &docs);
        for order in permutations(docs.len()) {
            let shuffled: Vec<Value> = order.iter().map(|&ix| docs[ix].clone()).collect();
            assert_eq!(run(&config, &shuffled), expected, "order {order:?} under {config:?}");
        }
    }
}

#[test]
fn nullable_on_absence() {
    let mut reg = Registry::new(RegistryConfig::default().with_grouping(Grouping::Merged));
    reg.register(&doc(json!({"a": 1}))).unwrap();
    reg.register(&doc(json!({"b": 2}))).unwrap();
    let shape = reg.shapes().next().unwrap();
    assert_eq!(shape.ty.get("a"), Some(&AttributeType::nullable(TypeNode::NUMBER)));
    assert_eq!(shape.ty.get("b"), Some(&AttributeType::nullable(TypeNode::NUMBER)));
}

#[test]
fn union_widening() {
    let mut reg = Registry::default();
    reg.register(&doc(json!({"x": 1}))).unwrap();
    reg.register(&doc(json!({"x": "s"}))).unwrap();
    let shape = reg.shapes().next().unwrap();
    assert_eq!(
        shape.ty.get("x").map(|a| &a.ty),
        Some(&union::from_alternatives([TypeNode::NUMBER, TypeNode::STRING]))
    );
}

#[test]
fn dedup() {
    let mut reg = Registry::default();
    reg.register(&doc(json!({"a": 1, "b": true}))).unwrap();
    reg.register(&doc(json!({"a": 1, "b": true}))).unwrap();
    assert_eq!(reg.shapes().count(), 1);
}

#[test]
fn list_document_goes_to_root() {
    let mut reg = Registry::default();
    let t = reg.register(&doc(json!([1, "s", null]))).unwrap();
    assert_eq!(t, TypeNode::list(union::from_alternatives([TypeNode::NUMBER, TypeNode::STRING])));
    assert_eq!(reg.shapes().count(), 0);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn random_permutations_agree(
        (docs, shuffled) in prop::collection::vec(arb_document(), 1..7)
            .prop_flat_map(|docs| (Just(docs.clone()), Just(docs).prop_shuffle()))
    ) {
        for config in configs() {
            prop_assert_eq!(run(&config, &docs), run(&config, &shuffled));
        }
    }

    #[test]
    fn sharding_agrees_with_sequential(
        docs in prop::collection::vec(arb_document(), 0..8),
        chunk in 1usize..4,
    ) {
        for config in configs() {
            let batches: Vec<Vec<Value>> = docs.chunks(chunk).map(<[Value]>::to_vec).collect();
            let sharded = infer_sharded(batches, &config).unwrap();
            let sharded = (sharded.shapes().cloned().collect::<Vec<_>>(), sharded.root().clone(), sharded.documents());
            prop_assert_eq!(sharded, run(&config, &docs));
        }
    }

    #[test]
    fn reregistering_never_grows(docs in prop::collection::vec(arb_document(), 1..6)) {
        let mut reg = Registry::default();
        reg.register_all(&docs).unwrap();
        let before: Vec<_> = reg.shapes().map(|s| s.ty.clone()).collect();
        reg.register_all(&docs).unwrap();
        let after: Vec<_> = reg.shapes().map(|s| s.ty.clone()).collect();
        prop_assert_eq!(before, after);
    }
}
