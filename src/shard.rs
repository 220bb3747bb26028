//! Registering from several workers.
//!
//! Either share one registry behind a lock ([`SharedRegistry`]), or give each
//! batch its own registry and fold them afterwards ([`infer_sharded`]). The
//! join is associative and commutative, so both give the same shapes as a
//! sequential run.
use std::sync::{Mutex, PoisonError};

use rayon::prelude::*;

use crate::error::RegistryError;
use crate::registry::{Registry, RegistryConfig};
use crate::types::TypeNode;
use crate::value::Value;

/// One lock region per registration.
#[derive(Debug, Default)]
pub struct SharedRegistry {
    inner: Mutex<Registry>,
}

impl SharedRegistry {
    pub fn new(config: RegistryConfig) -> Self {
        Self { inner: Mutex::new(Registry::new(config)) }
    }

    pub fn register(&self, value: &Value) -> Result<TypeNode, RegistryError> {
        // A merge is computed before it is stored, so a panicking holder
        // never leaves an entry half-written.
        let mut registry = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        registry.register(value)
    }

    pub fn absorb(&self, other: Registry) {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).absorb(other);
    }

    pub fn into_inner(self) -> Registry {
        self.inner.into_inner().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Map-reduce over document batches on the rayon pool: one registry per
/// batch, folded with [`Registry::absorb`].
pub fn infer_sharded<B>(batches: Vec<B>, config: &RegistryConfig) -> Result<Registry, RegistryError>
where
    B: AsRef<[Value]> + Send,
{
    batches
        .into_par_iter()
        .map(|batch| {
            let mut registry = Registry::new(config.clone());
            registry.register_all(batch.as_ref())?;
            Ok::<_, RegistryError>(registry)
        })
        .try_reduce(
            || Registry::new(config.clone()),
            |mut acc, part| {
                acc.absorb(part);
                Ok(acc)
            },
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn docs() -> Vec<Value> {
        [
            json!({"id": 1, "tags": ["a"]}),
            json!({"id": "x", "meta": null}),
            json!({"other": true}),
            json!({"id": 3, "tags": [], "meta": {"k": 1}}),
            json!([1, 2]),
            json!({"other": 5}),
        ]
        .into_iter()
        .map(Value::from)
        .collect()
    }

    #[test]
    fn sharded_matches_sequential() {
        let config = RegistryConfig::default();
        let mut sequential = Registry::new(config.clone());
        sequential.register_all(&docs()).unwrap();

        let batches: Vec<Vec<Value>> = docs().chunks(2).map(<[Value]>::to_vec).collect();
        let sharded = infer_sharded(batches, &config).unwrap();

        assert_eq!(sharded.documents(), sequential.documents());
        assert_eq!(sharded.root(), sequential.root());
        assert_eq!(sharded.shapes().collect::<Vec<_>>(), sequential.shapes().collect::<Vec<_>>());
    }

    #[test]
    fn sharded_propagates_precondition_errors() {
        let bad = Value::Object(vec![("k".into(), Value::Null), ("k".into(), Value::Null)]);
        let batches = vec![docs(), vec![bad]];
        let err = infer_sharded(batches, &RegistryConfig::default()).unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateAttribute { .. }));
    }

    #[test]
    fn shared_registry_serializes_workers() {
        let shared = SharedRegistry::new(RegistryConfig::default());
        let docs = docs();
        docs.par_iter().for_each(|d| {
            shared.register(d).unwrap();
        });
        let registry = shared.into_inner();

        let mut sequential = Registry::default();
        sequential.register_all(&docs).unwrap();
        assert_eq!(registry.shapes().collect::<Vec<_>>(), sequential.shapes().collect::<Vec<_>>());
        assert_eq!(registry.documents(), 6);
    }
}
