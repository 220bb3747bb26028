//! Stateful interning of object shapes.
//!
//! Every object of a registered document, at any depth, is merged into the
//! shape it is grouped with. Inside their parent an interned object is
//! replaced by a [`RefType`] naming its partition and attribute names.
//! A top-level non-object is folded into a single root slot. Grouping only
//! depends on each object itself (its attribute names and discriminator
//! values), so the final set of shapes is independent of registration order
//! and batching.
use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};
use std::fmt;

use indexmap::IndexMap;

use crate::error::RegistryError;
use crate::inference::{self, union, unify};
use crate::types::{AttributeType, Kind, ObjectType, RefType, TypeNode};
use crate::value::Value;

// ————————————————————————————————————————————————————————————————————————————
// CONFIG
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Grouping {
    /// Objects sharing at least one attribute name end up in the same shape;
    /// objects without attributes group with each other.
    #[default]
    SharedAttribute,
    /// Every object of a partition merges into one shape.
    Merged,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistryConfig {
    /// Attributes whose literal values partition shapes. Objects with
    /// different discriminator values never merge.
    pub discriminators: Vec<String>,
    pub grouping: Grouping,
}

impl RegistryConfig {
    #[must_use]
    pub fn with_discriminator(mut self, name: impl Into<String>) -> Self {
        self.discriminators.push(name.into());
        self
    }

    #[must_use]
    pub fn with_grouping(mut self, grouping: Grouping) -> Self {
        self.grouping = grouping;
        self
    }
}

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

pub use crate::types::Discriminator;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Shape {
    pub discriminator: Discriminator,
    pub ty: ObjectType,
    /// Number of objects merged into this shape.
    pub observations: u64,
}

/// First-seen sequence number of a shape. Internal bookkeeping only; not
/// stable across registration orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShapeId(u64);

/// Sorted `(name, kinds, nullable)` per attribute. A cheap first comparison
/// for finding identical shapes; never the equality test itself.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ShapeSignature {
    attributes: Vec<(String, Vec<Kind>, bool)>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Bucket {
    Attribute(String),
    Empty,
    All,
}

#[derive(Debug, Clone)]
struct Entry {
    shape: Shape,
    signature: ShapeSignature,
}

#[derive(Debug, Clone, Default)]
pub struct Registry {
    config: RegistryConfig,
    entries: IndexMap<ShapeId, Entry>,
    /// partition → bucket → shapes holding it
    index: HashMap<Discriminator, HashMap<Bucket, BTreeSet<ShapeId>>>,
    root: TypeNode,
    documents: u64,
    next_id: u64,
}

/// Shapes in canonical order. Finite; call [`Registry::shapes`] again to
/// restart.
pub struct Shapes<'a> {
    inner: std::vec::IntoIter<&'a Shape>,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl Registry {
    pub fn new(config: RegistryConfig) -> Self {
        Self { config, ..Self::default() }
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Infer `value` and fold it in, interning every object inside it.
    /// Returns the merged shape for objects, the running root type otherwise.
    ///
    /// Fails only when `value` repeats a key inside one object.
    pub fn register(&mut self, value: &Value) -> Result<TypeNode, RegistryError> {
        value.ensure_unique_keys()?;
        self.documents += 1;
        Ok(match value {
            Value::Object(fields) => {
                let discriminator = self.discriminator_of(Some(value));
                let ty = self.observe_object(fields);
                self.intern_top_level(discriminator, ty)
            }
            other => {
                let ty = self.observe(other);
                self.fold_root(ty)
            }
        })
    }

    pub fn register_all<'a, I>(&mut self, values: I) -> Result<(), RegistryError>
    where
        I: IntoIterator<Item = &'a Value>,
    {
        for v in values {
            self.register(v)?;
        }
        Ok(())
    }

    /// Fold an already-inferred node. Discriminators count as absent.
    pub fn register_type(&mut self, ty: TypeNode) -> TypeNode {
        self.documents += 1;
        match ty {
            TypeNode::Object(obj) => {
                let ty = self.externalize_attributes(obj);
                let discriminator = self.discriminator_of(None);
                self.intern_top_level(discriminator, ty)
            }
            other => {
                let ty = self.externalize(other);
                self.fold_root(ty)
            }
        }
    }

    /// Fold a registry built with the same config (e.g. over another batch
    /// of documents). Equivalent to having registered both batches here.
    pub fn absorb(&mut self, other: Registry) {
        if other.config != self.config {
            tracing::warn!("absorbing a registry built with a different configuration");
        }
        tracing::debug!(shapes = other.len(), documents = other.documents, "absorbing partial registry");
        self.documents += other.documents;
        self.root = unify(std::mem::take(&mut self.root), other.root);
        for (_, entry) in other.entries {
            self.intern(entry.shape);
        }
    }

    /// Current shapes, sorted by discriminator, then attribute names, then
    /// structure.
    pub fn shapes(&self) -> Shapes<'_> {
        let mut shapes: Vec<&Shape> = self.entries.values().map(|e| &e.shape).collect();
        shapes.sort_by(|a, b| a.canonical_cmp(b));
        Shapes { inner: shapes.into_iter() }
    }

    /// Shapes a reference points at, in canonical order.
    pub fn resolve(&self, reference: &RefType) -> Vec<&Shape> {
        let mut ids = BTreeSet::new();
        for (discriminator, names) in &reference.targets {
            let Some(partition) = self.index.get(discriminator) else { continue };
            for bucket in self.buckets_for(names.iter().map(String::as_str)) {
                if let Some(found) = partition.get(&bucket) {
                    ids.extend(found.iter().copied());
                }
            }
        }
        let mut shapes: Vec<&Shape> = ids.iter().filter_map(|id| self.entries.get(id)).map(|e| &e.shape).collect();
        shapes.sort_by(|a, b| a.canonical_cmp(b));
        shapes
    }

    /// Fold of every non-object top-level document; `Unknown` if none.
    pub fn root(&self) -> &TypeNode {
        &self.root
    }

    pub fn documents(&self) -> u64 {
        self.documents
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop all shapes and the root type; keeps the configuration.
    pub fn reset(&mut self) {
        self.entries.clear();
        self.index.clear();
        self.root = TypeNode::Unknown;
        self.documents = 0;
        self.next_id = 0;
    }

    fn intern_top_level(&mut self, discriminator: Discriminator, ty: ObjectType) -> TypeNode {
        let id = self.intern(Shape { discriminator, ty, observations: 1 });
        self.entries
            .get(&id)
            .map(|e| TypeNode::Object(e.shape.ty.clone()))
            .unwrap_or_default()
    }

    fn intern_nested(&mut self, discriminator: Discriminator, ty: ObjectType) -> TypeNode {
        let reference = RefType::to(discriminator.clone(), ty.names());
        self.intern(Shape { discriminator, ty, observations: 1 });
        TypeNode::Ref(reference)
    }

    fn fold_root(&mut self, ty: TypeNode) -> TypeNode {
        self.root = unify(std::mem::take(&mut self.root), ty);
        self.root.clone()
    }

    /// Type of `value` with every object in it interned and referenced.
    fn observe(&mut self, value: &Value) -> TypeNode {
        match value {
            Value::Object(fields) => {
                let discriminator = self.discriminator_of(Some(value));
                let ty = self.observe_object(fields);
                self.intern_nested(discriminator, ty)
            }
            Value::List(items) => {
                let mut element = TypeNode::Unknown;
                for item in items {
                    let ty = self.observe(item);
                    element = unify(element, ty);
                }
                TypeNode::list(element)
            }
            scalar => inference::infer(scalar),
        }
    }

    // keys are unique here; `register` checks before observing
    fn observe_object(&mut self, fields: &[(String, Value)]) -> ObjectType {
        fields
            .iter()
            .map(|(name, v)| (name.as_str(), AttributeType { ty: self.observe(v), nullable: v.is_null() }))
            .collect()
    }

    /// `observe` for an inferred node: inline objects become references.
    fn externalize(&mut self, ty: TypeNode) -> TypeNode {
        match ty {
            TypeNode::Object(obj) => {
                let ty = self.externalize_attributes(obj);
                let discriminator = self.discriminator_of(None);
                self.intern_nested(discriminator, ty)
            }
            TypeNode::List(l) => TypeNode::list(self.externalize(*l.element)),
            TypeNode::Union(u) => {
                let alternatives: Vec<TypeNode> = u.alternatives.into_iter().map(|a| self.externalize(a)).collect();
                union::from_alternatives(alternatives)
            }
            leaf => leaf,
        }
    }

    fn externalize_attributes(&mut self, obj: ObjectType) -> ObjectType {
        obj.attributes
            .into_iter()
            .map(|(name, attr)| (name, AttributeType { ty: self.externalize(attr.ty), nullable: attr.nullable }))
            .collect()
    }

    fn discriminator_of(&self, value: Option<&Value>) -> Discriminator {
        self.config
            .discriminators
            .iter()
            .map(|name| {
                let literal = value
                    .and_then(|v| v.get(name))
                    .filter(|v| !v.is_null())
                    .map(Value::literal);
                (name.clone(), literal)
            })
            .collect()
    }

    fn buckets_of(&self, ty: &ObjectType) -> Vec<Bucket> {
        self.buckets_for(ty.names())
    }

    fn buckets_for<'a>(&self, names: impl Iterator<Item = &'a str>) -> Vec<Bucket> {
        match self.config.grouping {
            Grouping::Merged => vec![Bucket::All],
            Grouping::SharedAttribute => {
                let buckets: Vec<Bucket> = names.map(|n| Bucket::Attribute(n.to_string())).collect();
                if buckets.is_empty() { vec![Bucket::Empty] } else { buckets }
            }
        }
    }

    fn candidates(&self, shape: &Shape) -> BTreeSet<ShapeId> {
        let Some(partition) = self.index.get(&shape.discriminator) else {
            return BTreeSet::new();
        };
        self.buckets_of(&shape.ty)
            .iter()
            .filter_map(|b| partition.get(b))
            .flatten()
            .copied()
            .collect()
    }

    /// Merge `incoming` with every shape it is grouped with. When it bridges
    /// several existing shapes they collapse into the oldest one.
    fn intern(&mut self, incoming: Shape) -> ShapeId {
        let mut candidates = self.candidates(&incoming).into_iter();
        let Some(target) = candidates.next() else {
            return self.insert(incoming);
        };
        let mut incoming = incoming;
        for id in candidates {
            if let Some(bridged) = self.detach(id) {
                tracing::debug!(into = %target, from = %id, "joining shapes through a bridging object");
                incoming = incoming.merge(bridged.shape);
            }
        }
        match self.entries.get_mut(&target) {
            Some(entry) => entry.absorb(incoming),
            None => return self.insert(incoming),
        }
        self.index_entry(target);
        target
    }

    fn insert(&mut self, shape: Shape) -> ShapeId {
        let id = ShapeId(self.next_id);
        self.next_id += 1;
        tracing::debug!(shape = %id, attributes = shape.ty.len(), "new shape");
        let signature = ShapeSignature::of(&shape.ty);
        self.entries.insert(id, Entry { shape, signature });
        self.index_entry(id);
        id
    }

    fn index_entry(&mut self, id: ShapeId) {
        let Some(entry) = self.entries.get(&id) else { return };
        let buckets = self.buckets_of(&entry.shape.ty);
        let partition = self.index.entry(entry.shape.discriminator.clone()).or_default();
        for b in buckets {
            partition.entry(b).or_default().insert(id);
        }
    }

    fn detach(&mut self, id: ShapeId) -> Option<Entry> {
        let entry = self.entries.shift_remove(&id)?;
        let buckets = self.buckets_of(&entry.shape.ty);
        if let Some(partition) = self.index.get_mut(&entry.shape.discriminator) {
            for b in buckets {
                if let Some(ids) = partition.get_mut(&b) {
                    ids.remove(&id);
                    if ids.is_empty() {
                        partition.remove(&b);
                    }
                }
            }
        }
        Some(entry)
    }
}

impl Entry {
    fn absorb(&mut self, incoming: Shape) {
        self.shape.observations += incoming.observations;
        if ShapeSignature::of(&incoming.ty) == self.signature && incoming.ty == self.shape.ty {
            tracing::trace!(attributes = incoming.ty.len(), "shape already known");
            return;
        }
        self.shape.ty = ObjectType::join(std::mem::take(&mut self.shape.ty), incoming.ty);
        self.signature = ShapeSignature::of(&self.shape.ty);
    }
}

impl Shape {
    fn merge(self, other: Shape) -> Shape {
        Shape {
            discriminator: self.discriminator,
            ty: ObjectType::join(self.ty, other.ty),
            observations: self.observations + other.observations,
        }
    }

    pub fn signature(&self) -> ShapeSignature {
        ShapeSignature::of(&self.ty)
    }

    fn canonical_cmp(&self, other: &Shape) -> Ordering {
        self.discriminator
            .cmp(&other.discriminator)
            .then_with(|| self.ty.names().cmp(other.ty.names()))
            .then_with(|| self.ty.cmp(&other.ty))
            .then_with(|| self.observations.cmp(&other.observations))
    }
}

impl ShapeSignature {
    pub fn of(ty: &ObjectType) -> Self {
        let attributes = ty
            .attributes
            .iter()
            .map(|(name, attr)| (name.clone(), attr.ty.kinds(), attr.nullable))
            .collect();
        Self { attributes }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.attributes.iter().map(|(n, _, _)| n.as_str())
    }
}

impl fmt::Display for ShapeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl<'a> Iterator for Shapes<'a> {
    type Item = &'a Shape;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for Shapes<'_> {}

// ————————————————————————————————————————————————————————————————————————————
// TESTS
// ————————————————————————————————————————————————————————————————————————————
