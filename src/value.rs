//! The parsed document tree the engine consumes.
//!
//! Unlike `serde_json::Value`, objects keep every `(name, value)` pair in
//! source order, so a document that repeats a key is still observable as
//! such and can be rejected before inference.
use std::collections::HashSet;
use std::fmt;

use ordered_float::OrderedFloat;
use serde::de::{self, Deserialize, Deserializer, MapAccess, SeqAccess, Visitor};

use crate::error::RegistryError;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Value {
    Null,
    Bool(bool),
    Number(OrderedFloat<f64>),
    String(String),
    Object(Vec<(String, Value)>),
    List(Vec<Value>),
}

impl Value {
    pub fn number(n: f64) -> Self {
        Value::Number(OrderedFloat(n))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// First value stored under `name`, if this is an object.
    pub fn get(&self, name: &str) -> Option<&Value> {
        match self {
            Value::Object(fields) => fields.iter().find(|(k, _)| k == name).map(|(_, v)| v),
            _ => None,
        }
    }

    /// RFC 6901 lookup. An empty pointer selects the whole document.
    pub fn pointer(&self, pointer: &str) -> Option<&Value> {
        if pointer.is_empty() {
            return Some(self);
        }
        let rest = pointer.strip_prefix('/')?;
        rest.split('/')
            .map(|token| token.replace("~1", "/").replace("~0", "~"))
            .try_fold(self, |node, token| match node {
                Value::Object(_) => node.get(&token),
                Value::List(items) => {
                    if token.starts_with('+') || (token.len() > 1 && token.starts_with('0')) {
                        return None;
                    }
                    token.parse::<usize>().ok().and_then(|ix| items.get(ix))
                }
                _ => None,
            })
    }

    /// Rendering used for discriminator values: scalars bare, composites as
    /// compact JSON.
    pub fn literal(&self) -> String {
        match self {
            Value::Null => "null".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => render_number(n.0),
            Value::String(s) => s.clone(),
            Value::Object(_) | Value::List(_) => serde_json::Value::from(self).to_string(),
        }
    }

    /// Reject objects that repeat an attribute name, anywhere in the tree.
    pub fn ensure_unique_keys(&self) -> Result<(), RegistryError> {
        self.check_keys(&mut String::from("$"))
    }

    fn check_keys(&self, path: &mut String) -> Result<(), RegistryError> {
        match self {
            Value::Object(fields) => {
                let mut seen = HashSet::with_capacity(fields.len());
                for (name, _) in fields {
                    if !seen.insert(name.as_str()) {
                        return Err(RegistryError::DuplicateAttribute {
                            path: path.clone(),
                            name: name.clone(),
                        });
                    }
                }
                for (name, v) in fields {
                    let len = path.len();
                    path.push('.');
                    path.push_str(name);
                    v.check_keys(path)?;
                    path.truncate(len);
                }
                Ok(())
            }
            Value::List(items) => {
                for (ix, v) in items.iter().enumerate() {
                    let len = path.len();
                    path.push_str(&format!("[{ix}]"));
                    v.check_keys(path)?;
                    path.truncate(len);
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }
}

// Prefer integer rendering when exact.
fn render_number(n: f64) -> String {
    match as_exact_i64(n) {
        Some(i) => i.to_string(),
        None => n.to_string(),
    }
}

// `i64::MAX as f64` rounds up to 2^63, hence the strict upper bound.
fn as_exact_i64(n: f64) -> Option<i64> {
    (n.is_finite() && n.fract() == 0.0 && n >= i64::MIN as f64 && n < i64::MAX as f64).then_some(n as i64)
}

/// Repeated keys collapse to the last value, as in any `serde_json` map.
impl From<&Value> for serde_json::Value {
    fn from(v: &Value) -> Self {
        match v {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Number(n) => match as_exact_i64(n.0) {
                Some(i) => serde_json::Value::from(i),
                None => serde_json::Number::from_f64(n.0)
                    .map(serde_json::Value::Number)
                    .unwrap_or(serde_json::Value::Null),
            },
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::List(xs) => serde_json::Value::Array(xs.iter().map(serde_json::Value::from).collect()),
            Value::Object(fields) => serde_json::Value::Object(
                fields.iter().map(|(k, v)| (k.clone(), serde_json::Value::from(v))).collect(),
            ),
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(xs) => Value::List(xs.into_iter().map(Value::from).collect()),
            serde_json::Value::Object(m) => {
                Value::Object(m.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// DESERIALIZATION
// ————————————————————————————————————————————————————————————————————————————

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(ValueVisitor)
    }
}

struct ValueVisitor;

impl<'de> Visitor<'de> for ValueVisitor {
    type Value = Value;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("any JSON value")
    }

    fn visit_bool<E: de::Error>(self, b: bool) -> Result<Value, E> {
        Ok(Value::Bool(b))
    }

    fn visit_i64<E: de::Error>(self, n: i64) -> Result<Value, E> {
        Ok(Value::number(n as f64))
    }

    fn visit_u64<E: de::Error>(self, n: u64) -> Result<Value, E> {
        Ok(Value::number(n as f64))
    }

    fn visit_f64<E: de::Error>(self, n: f64) -> Result<Value, E> {
        Ok(Value::number(n))
    }

    fn visit_str<E: de::Error>(self, s: &str) -> Result<Value, E> {
        Ok(Value::String(s.to_owned()))
    }

    fn visit_string<E: de::Error>(self, s: String) -> Result<Value, E> {
        Ok(Value::String(s))
    }

    fn visit_unit<E: de::Error>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_none<E: de::Error>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_some<D: Deserializer<'de>>(self, d: D) -> Result<Value, D::Error> {
        Deserialize::deserialize(d)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Value, A::Error> {
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(item) = seq.next_element()? {
            items.push(item);
        }
        Ok(Value::List(items))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Value, A::Error> {
        let mut fields = Vec::with_capacity(map.size_hint().unwrap_or(0));
        while let Some((k, v)) = map.next_entry::<String, Value>()? {
            fields.push((k, v));
        }
        Ok(Value::Object(fields))
    }
}
