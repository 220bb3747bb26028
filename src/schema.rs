//! JSON-Schema-flavoured rendering of a registry.
use std::collections::HashSet;

use serde_json::{json, Map, Value};

use crate::registry::{Registry, Shape};
use crate::types::{AttributeType, ObjectType, PrimitiveKind, RefType, TypeNode};

/// Whole registry:
/// `{"shapes": [{name, discriminator, observations, schema}], "root": ...}`.
/// `root` only appears once a non-object document was registered. Nested
/// objects render as `{"$ref": <shape name>}`.
pub fn emit_document(registry: &Registry) -> Value {
    let renderer = Renderer { registry: Some(registry), names: shape_names(registry) };
    let shapes = renderer
        .names
        .iter()
        .map(|(shape, name)| {
            let discriminator: Map<String, Value> = shape
                .discriminator
                .iter()
                .map(|(k, v)| (k.clone(), v.clone().map(Value::from).unwrap_or(Value::Null)))
                .collect();
            json!({
                "name": name,
                "discriminator": discriminator,
                "observations": shape.observations,
                "schema": renderer.object(&shape.ty)
            })
        })
        .collect::<Vec<_>>();

    let mut doc = json!({ "shapes": shapes });
    if !registry.root().is_unknown() {
        doc["root"] = renderer.schema(registry.root());
    }
    doc
}

/// Every shape in canonical order with a unique name.
pub fn shape_names(registry: &Registry) -> Vec<(&Shape, String)> {
    let mut used = HashSet::new();
    registry
        .shapes()
        .enumerate()
        .map(|(ix, shape)| {
            let mut name = shape_name(shape, ix);
            if !used.insert(name.clone()) {
                name = format!("{name}_{}", ix + 1);
                used.insert(name.clone());
            }
            (shape, name)
        })
        .collect()
}

/// Discriminator values joined with `_`, or `Shape<n>` without them.
pub fn shape_name(shape: &Shape, index: usize) -> String {
    let parts: Vec<&str> = shape.discriminator.iter().filter_map(|(_, v)| v.as_deref()).collect();
    if parts.is_empty() {
        format!("Shape{}", index + 1)
    } else {
        parts.join("_")
    }
}

/// Schema of a free-standing node. References have no registry to resolve
/// against and render as a bare object.
pub fn emit_schema(ty: &TypeNode) -> Value {
    Renderer { registry: None, names: Vec::new() }.schema(ty)
}

pub fn emit_object(obj: &ObjectType) -> Value {
    Renderer { registry: None, names: Vec::new() }.object(obj)
}

struct Renderer<'a> {
    registry: Option<&'a Registry>,
    names: Vec<(&'a Shape, String)>,
}

impl Renderer<'_> {
    fn schema(&self, ty: &TypeNode) -> Value {
        match ty {
            TypeNode::Unknown => json!({}),
            TypeNode::Primitive(PrimitiveKind::Bool) => json!({ "type": "boolean" }),
            TypeNode::Primitive(PrimitiveKind::Number) => json!({ "type": "number" }),
            TypeNode::Primitive(PrimitiveKind::String) => json!({ "type": "string" }),
            TypeNode::List(l) => json!({ "type": "array", "items": self.schema(&l.element) }),
            TypeNode::Object(o) => self.object(o),
            TypeNode::Union(u) => {
                json!({ "oneOf": u.alternatives().iter().map(|a| self.schema(a)).collect::<Vec<_>>() })
            }
            TypeNode::Ref(r) => self.reference(r),
        }
    }

    fn object(&self, obj: &ObjectType) -> Value {
        let mut props = Map::new();
        let mut required: Vec<Value> = Vec::new();
        for (name, attr) in &obj.attributes {
            props.insert(name.clone(), self.attribute(attr));
            if !attr.nullable {
                required.push(Value::from(name.clone()));
            }
        }
        let mut o = json!({ "type": "object", "properties": props });
        if !required.is_empty() {
            o["required"] = Value::Array(required);
        }
        o
    }

    fn attribute(&self, attr: &AttributeType) -> Value {
        match (&attr.ty, attr.nullable) {
            // exactly null → Null (not oneOf[any, null])
            (TypeNode::Unknown, true) => json!({ "type": "null" }),
            (ty, true) => json!({ "oneOf": [self.schema(ty), { "type": "null" }] }),
            (ty, false) => self.schema(ty),
        }
    }

    fn reference(&self, reference: &RefType) -> Value {
        let Some(registry) = self.registry else {
            return json!({ "type": "object" });
        };
        let mut refs: Vec<Value> = registry
            .resolve(reference)
            .into_iter()
            .filter_map(|target| self.names.iter().find(|(shape, _)| std::ptr::eq(*shape, target)))
            .map(|(_, name)| json!({ "$ref": name }))
            .collect();
        match refs.len() {
            0 => json!({ "type": "object" }),
            1 => refs.remove(0),
            _ => json!({ "oneOf": refs }),
        }
    }
}
