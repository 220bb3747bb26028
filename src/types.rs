//! Inferred type vocabulary.
//!
//! Equality is structural everywhere: object attributes live in a `BTreeMap`
//! (insertion order is irrelevant) and union alternatives are kept sorted by
//! outer kind, so two nodes describing the same shape compare equal.
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PrimitiveKind {
    Bool,
    Number,
    String,
}

/// Outer kind of a non-union, non-unknown node. A canonical union holds at
/// most one alternative per kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Kind {
    Bool,
    Number,
    String,
    List,
    Object,
    Ref,
}

/// `(attribute, literal value)` per configured discriminator; `None` when the
/// attribute was absent or null.
pub type Discriminator = Vec<(String, Option<String>)>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TypeNode {
    /// Only null observed so far, or the element of an empty list.
    #[default]
    Unknown,
    Primitive(PrimitiveKind),
    Object(ObjectType),
    List(ListType),
    Union(UnionType),
    /// Nested object interned by a registry as a shape of its own.
    Ref(RefType),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectType {
    pub attributes: BTreeMap<String, AttributeType>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AttributeType {
    pub ty: TypeNode,
    /// Observed as null, or absent from at least one merged object.
    pub nullable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListType {
    pub element: Box<TypeNode>,
}

/// Points at registry shapes: per discriminator partition, the attribute
/// names the referenced objects carried. A registry resolves it to the
/// shapes holding any of those names (or the empty shape when the set is
/// empty). Joining two references unions their targets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RefType {
    pub targets: BTreeMap<Discriminator, BTreeSet<String>>,
}

/// At least two alternatives, sorted by [`Kind`], one per kind, never
/// containing `Unknown` or another union. Only [`crate::inference::union`]
/// builds these.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UnionType {
    pub(crate) alternatives: Vec<TypeNode>,
}

impl TypeNode {
    pub const BOOL: TypeNode = TypeNode::Primitive(PrimitiveKind::Bool);
    pub const NUMBER: TypeNode = TypeNode::Primitive(PrimitiveKind::Number);
    pub const STRING: TypeNode = TypeNode::Primitive(PrimitiveKind::String);

    pub fn list(element: TypeNode) -> Self {
        TypeNode::List(ListType { element: Box::new(element) })
    }

    pub fn kind(&self) -> Option<Kind> {
        match self {
            TypeNode::Unknown | TypeNode::Union(_) => None,
            TypeNode::Primitive(PrimitiveKind::Bool) => Some(Kind::Bool),
            TypeNode::Primitive(PrimitiveKind::Number) => Some(Kind::Number),
            TypeNode::Primitive(PrimitiveKind::String) => Some(Kind::String),
            TypeNode::List(_) => Some(Kind::List),
            TypeNode::Object(_) => Some(Kind::Object),
            TypeNode::Ref(_) => Some(Kind::Ref),
        }
    }

    /// Every outer kind this node may take, sorted.
    pub fn kinds(&self) -> Vec<Kind> {
        match self {
            TypeNode::Unknown => Vec::new(),
            TypeNode::Union(u) => u.alternatives.iter().filter_map(TypeNode::kind).collect(),
            other => other.kind().into_iter().collect(),
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, TypeNode::Unknown)
    }

    pub fn as_object(&self) -> Option<&ObjectType> {
        match self {
            TypeNode::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_union(&self) -> Option<&UnionType> {
        match self {
            TypeNode::Union(u) => Some(u),
            _ => None,
        }
    }

    /// Merge with another observation. See [`crate::inference::unify`].
    pub fn join(&self, other: &TypeNode) -> TypeNode {
        crate::inference::unify(self.clone(), other.clone())
    }
}

impl ObjectType {
    pub fn get(&self, name: &str) -> Option<&AttributeType> {
        self.attributes.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.attributes.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }
}

impl RefType {
    pub fn to<'a>(discriminator: Discriminator, names: impl IntoIterator<Item = &'a str>) -> Self {
        let names = names.into_iter().map(str::to_string).collect();
        Self { targets: BTreeMap::from([(discriminator, names)]) }
    }

    pub(crate) fn join(mut self, other: RefType) -> RefType {
        for (discriminator, names) in other.targets {
            self.targets.entry(discriminator).or_default().extend(names);
        }
        self
    }
}

impl AttributeType {
    pub fn required(ty: TypeNode) -> Self {
        Self { ty, nullable: false }
    }

    pub fn nullable(ty: TypeNode) -> Self {
        Self { ty, nullable: true }
    }
}

impl UnionType {
    pub fn alternatives(&self) -> &[TypeNode] {
        &self.alternatives
    }

    pub fn len(&self) -> usize {
        self.alternatives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.alternatives.is_empty()
    }
}

impl From<ObjectType> for TypeNode {
    fn from(o: ObjectType) -> Self {
        TypeNode::Object(o)
    }
}

impl<K: Into<String>> FromIterator<(K, AttributeType)> for ObjectType {
    fn from_iter<I: IntoIterator<Item = (K, AttributeType)>>(iter: I) -> Self {
        Self { attributes: iter.into_iter().map(|(k, a)| (k.into(), a)).collect() }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// DISPLAY
// ————————————————————————————————————————————————————————————————————————————

impl fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PrimitiveKind::Bool => "bool",
            PrimitiveKind::Number => "number",
            PrimitiveKind::String => "string",
        })
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Kind::Bool => "bool",
            Kind::Number => "number",
            Kind::String => "string",
            Kind::List => "list",
            Kind::Object => "object",
            Kind::Ref => "ref",
        })
    }
}

/// Compact form: `{a: number, b?: [string | bool]}`; `?` marks nullable.
impl fmt::Display for TypeNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeNode::Unknown => f.write_str("unknown"),
            TypeNode::Primitive(p) => write!(f, "{p}"),
            TypeNode::Object(o) => write!(f, "{o}"),
            TypeNode::List(l) => write!(f, "[{}]", l.element),
            TypeNode::Ref(r) => write!(f, "{r}"),
            TypeNode::Union(u) => {
                for (ix, alt) in u.alternatives.iter().enumerate() {
                    if ix > 0 {
                        f.write_str(" | ")?;
                    }
                    write!(f, "{alt}")?;
                }
                Ok(())
            }
        }
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (ix, (name, attr)) in self.attributes.iter().enumerate() {
            if ix > 0 {
                f.write_str(", ")?;
            }
            let mark = if attr.nullable { "?" } else { "" };
            write!(f, "{name}{mark}: {}", attr.ty)?;
        }
        f.write_str("}")
    }
}

/// `&person` when the partition has discriminator values, `&{a, b}` otherwise.
impl fmt::Display for RefType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (ix, (discriminator, names)) in self.targets.iter().enumerate() {
            if ix > 0 {
                f.write_str(" | ")?;
            }
            let values: Vec<&str> = discriminator.iter().filter_map(|(_, v)| v.as_deref()).collect();
            if values.is_empty() {
                let names: Vec<&str> = names.iter().map(String::as_str).collect();
                write!(f, "&{{{}}}", names.join(", "))?;
            } else {
                write!(f, "&{}", values.join("_"))?;
            }
        }
        Ok(())
    }
}
