//! Closed dispatch table from class name to the handler that reads its
//! custom annotation-block format (§4.6).
//!
//! A `HashMap<&'static str, WellKnownHandler>` built once would need to be
//! generic over the decoder's `Source` parameter, which runs into
//! `'static`-bound headaches for a type built per monomorphization, so
//! `dispatch` is a `match` instead — the same closed-table property (one
//! name, one arm, no trait-hierarchy change to add a class) without the
//! statics dance.

use std::rc::Rc;

use crate::decoder::Decoder;
use crate::descriptor::ClassDesc;
use crate::error::Result;
use crate::reader::Source;
use crate::value::Value;

/// A well-known class's annotation-block reader: given control right after
/// the class's own fields (or, for externalizables, right after the tag),
/// it consumes exactly its class's custom format and returns the projected
/// value.
pub(crate) type WellKnownHandler<S> = fn(&mut Decoder<S>, &ClassDesc) -> Result<Value>;

/// Looks up the annotation-block handler for a class name, for the
/// write-method/externalizable collection classes whose payload is a
/// length-prefixed run of block data and/or object tokens.
pub(crate) fn dispatch<S: Source>(class_name: &str) -> Option<WellKnownHandler<S>> {
    match class_name {
        "java.util.ArrayList" | "java.util.LinkedList" | "java.util.PriorityQueue" => Some(read_ordered_collection),
        "java.util.HashMap" | "java.util.Hashtable" => Some(read_map),
        "java.util.HashSet" | "java.util.LinkedHashSet" => Some(read_set),
        _ => None,
    }
}

/// `ArrayList`/`LinkedList`/`PriorityQueue`: `I` size, then that many object
/// tokens, projected in emission order (§4.6, §9 — the source's
/// `PriorityQueue` projection follows stream order, not heap order).
fn read_ordered_collection<S: Source>(decoder: &mut Decoder<S>, _class: &ClassDesc) -> Result<Value> {
    let size = decoder.read_block_i32()? as usize;
    let mut elements = Vec::with_capacity(size);
    for _ in 0..size {
        elements.push(decoder.read_value()?);
    }
    Ok(Value::Seq(elements))
}

/// `HashMap`/`Hashtable`: `loadFactor`/`threshold` are declared fields read
/// by the generic field loop, not part of this block; the annotation block
/// itself holds only `I` bucket count, `I` size, then that many (key, value)
/// object-token pairs.
fn read_map<S: Source>(decoder: &mut Decoder<S>, _class: &ClassDesc) -> Result<Value> {
    let _buckets = decoder.read_block_i32()?;
    let size = decoder.read_block_i32()? as usize;
    let mut pairs = Vec::with_capacity(size);
    for _ in 0..size {
        let key = decoder.read_value()?;
        let value = decoder.read_value()?;
        pairs.push((key, value));
    }
    Ok(Value::Map(pairs))
}

/// `HashSet`/`LinkedHashSet`: `I` capacity, `F` load factor, `I` size, then
/// that many object tokens.
fn read_set<S: Source>(decoder: &mut Decoder<S>, _class: &ClassDesc) -> Result<Value> {
    let _capacity = decoder.read_block_i32()?;
    let _load_factor = decoder.read_block_f32()?;
    let size = decoder.read_block_i32()? as usize;
    let mut elements = Vec::with_capacity(size);
    for _ in 0..size {
        elements.push(decoder.read_value()?);
    }
    Ok(Value::Set(elements))
}

const WRAPPER_CLASSES: &[&str] = &[
    "java.lang.Double",
    "java.lang.Float",
    "java.lang.Integer",
    "java.lang.Long",
    "java.lang.Short",
    "java.lang.Byte",
    "java.lang.Boolean",
    "java.lang.Character",
];

/// Primitive wrapper classes (`java.lang.Double`, …) declare their payload
/// as an ordinary single field rather than a custom annotation block, so
/// they're recognized after normal field decoding rather than through
/// [`dispatch`]: the projection is simply that field's value, not an
/// object wrapping it.
pub(crate) fn wrapper_value(class_name: &str, fields: &[(Rc<str>, Value)]) -> Option<Value> {
    if WRAPPER_CLASSES.contains(&class_name) {
        fields.first().map(|(_, v)| v.clone())
    } else {
        None
    }
}

/// `java.util.BitSet` declares its payload as an ordinary `long[] bits`
/// field; the projection is the set of indices whose bit is 1, not the raw
/// word array.
pub(crate) fn bitset_value(class_name: &str, fields: &[(Rc<str>, Value)]) -> Option<Value> {
    if class_name != "java.util.BitSet" {
        return None;
    }
    let bits = fields.iter().find(|(name, _)| &**name == "bits")?.1.clone();
    let words = match bits {
        Value::Seq(words) => words,
        _ => return None,
    };
    let mut indices = Vec::new();
    for (word_index, word) in words.iter().enumerate() {
        let Value::Int(word) = word else { continue };
        let word = *word as u64;
        for bit in 0..64u32 {
            if word & (1u64 << bit) != 0 {
                indices.push(Value::Int((word_index as i64) * 64 + bit as i64));
            }
        }
    }
    Some(Value::Set(indices))
}
