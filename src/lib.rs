//! Infer a unified, deduplicated description of the shapes found in a
//! stream of JSON documents.
//!
//! Documents are parsed into [`value::Value`] trees, inferred into
//! [`types::TypeNode`]s and folded into a [`registry::Registry`] that interns
//! structurally distinct object shapes. The fold is associative and
//! commutative, so documents can be registered in any order or in parallel
//! batches ([`shard`]) with the same result.
pub mod error;
pub mod value;
pub mod parse;
pub mod types;
pub mod inference;
pub mod registry;
pub mod shard;
pub mod schema;
pub mod cli;
pub mod jq_exec;

pub use error::{ParseError, Position, RegistryError};
pub use inference::{infer, unify};
pub use registry::{Grouping, Registry, RegistryConfig, Shape};
pub use types::{AttributeType, Kind, ObjectType, PrimitiveKind, RefType, TypeNode, UnionType};
pub use value::Value;
