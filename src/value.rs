//! Value projection: converts the decoded graph into the language-neutral
//! value tree handed back to callers (§4.7).

use std::rc::Rc;

use serde::Serialize;

use crate::error::Handle;
use crate::object::ObjectData;

/// An array entity: element type code plus its decoded elements. Element
/// type `[` nests further `Value::Seq`s for multi-dimensional arrays.
pub struct ArrayData {
    pub element_type: u8,
    pub elements: Vec<Value>,
}

/// The reserved projection key for the raw bytes of an unrecognized
/// `SC_WRITE_METHOD` annotation block (§4.6, Open Question in §9).
pub const RAW_ANNOTATION_KEY: &str = "__annotation__";

/// The language-neutral projected value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Rc<str>),
    Bytes(Vec<u8>),
    Seq(Vec<Value>),
    Set(Vec<Value>),
    Map(Vec<(Value, Value)>),
    Object {
        class: Rc<str>,
        fields: Vec<(Rc<str>, Value)>,
    },
    /// A back-reference to an entity already visited during this
    /// projection, standing in for a genuine cycle (§4.7, §9).
    Ref(Handle),
}

impl Value {
    pub fn string<S: Into<Rc<str>>>(s: S) -> Value {
        Value::Str(s.into())
    }
}

/// Projects a fully-decoded object into a `Value::Object`, collapsing the
/// per-level field maps top-down with subclass fields overwriting
/// superclass fields on name collision (§4.5).
///
/// Cyclic/shared structure is not handled here: a field value that points
/// back into the graph already carries `Value::Ref` from whoever read it
/// (see `Decoder::value_from_content` in `content.rs`), since only the
/// REFERENCE token — not the projector — knows an occurrence is a repeat.
pub fn project_object(data: &ObjectData) -> Value {
    if let Some(value) = &data.well_known_value {
        return value.clone();
    }
    let mut fields: Vec<(Rc<str>, Value)> = Vec::new();
    for level in &data.levels {
        for (name, value) in &level.fields {
            if let Some(slot) = fields.iter_mut().find(|(n, _)| n == name) {
                slot.1 = value.clone();
            } else {
                fields.push((name.clone(), value.clone()));
            }
        }
        if let Some(raw) = &level.raw_annotation {
            let key: Rc<str> = Rc::from(RAW_ANNOTATION_KEY);
            let v = Value::Bytes(raw.clone());
            if let Some(slot) = fields.iter_mut().find(|(n, _)| *n == key) {
                slot.1 = v;
            } else {
                fields.push((key, v));
            }
        }
    }
    let class = data
        .levels
        .last()
        .map(|l| l.class.name.clone())
        .unwrap_or_else(|| Rc::from(""));
    Value::Object { class, fields }
}

/// Projects a fully-decoded array into a `Value::Seq` (§4.4). Elements are
/// already `Value`s by the time they land in `ArrayData`, so this is a
/// direct copy; nested arrays (multi-dimensional arrays) are already
/// `Value::Seq` within `elements`.
pub fn project_array(data: &ArrayData) -> Value {
    Value::Seq(data.elements.clone())
}
