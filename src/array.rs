//! Primitive and object array decoding (§4.4, tag `0x75`).
//!
//! An array's class descriptor carries its element type in the class name
//! itself (`[I`, `[[D`, `[Ljava.lang.String;`), so decoding one is a matter
//! of parsing that name once and then looping: primitive element codes read
//! inline, everything else (`[` for a nested array, `L` for an object
//! element) falls through to a normal content-token read, which is what
//! makes multi-dimensional arrays fall out for free.

use std::cell::RefCell;
use std::rc::Rc;

use crate::decoder::Decoder;
use crate::error::{Error, Handle, Result};
use crate::handle::Entity;
use crate::reader::Source;
use crate::value::{ArrayData, Value};

fn element_kind(class_name: &str, position: u64) -> Result<u8> {
    let rest = class_name.strip_prefix('[').ok_or_else(|| Error::InconsistentDescriptor {
        detail: format!("array class name `{class_name}` is missing its '[' prefix"),
        position,
    })?;
    rest.as_bytes().first().copied().ok_or_else(|| Error::InconsistentDescriptor {
        detail: format!("array class name `{class_name}` has no element descriptor"),
        position,
    })
}

impl<S: Source> Decoder<S> {
    /// Reads an array instance: class descriptor, 32-bit length, then that
    /// many elements. Registers the handle before the length is even read,
    /// matching the registration-precedes-population rule every other
    /// entity kind follows.
    pub(crate) fn read_array_instance(&mut self) -> Result<Handle> {
        let desc = self.read_class_desc()?.ok_or_else(|| Error::InconsistentDescriptor {
            detail: "array with a NULL class descriptor".into(),
            position: self.position(),
        })?;
        let handle = self.handles.assign(Entity::Pending);
        let element_type = element_kind(&desc.name, self.position())?;
        let len = self.reader.read_u32()? as usize;
        let mut elements = Vec::with_capacity(len);
        for _ in 0..len {
            elements.push(self.read_array_element(element_type)?);
        }
        log::trace!(
            "decoded array `{}` ({} element(s)) at {:#x}",
            desc.name,
            elements.len(),
            handle
        );
        let data = ArrayData {
            element_type,
            elements,
        };
        self.handles
            .populate(handle, Entity::Array(Rc::new(RefCell::new(data))));
        Ok(handle)
    }

    fn read_array_element(&mut self, element_type: u8) -> Result<Value> {
        Ok(match element_type {
            b'B' => Value::Int(self.reader.read_i8()? as i64),
            b'C' => Value::Str(Rc::from(String::from_utf16_lossy(&[self.reader.read_u16()?]))),
            b'D' => Value::Float(self.reader.read_f64()?),
            b'F' => Value::Float(self.reader.read_f32()? as f64),
            b'I' => Value::Int(self.reader.read_i32()? as i64),
            b'J' => Value::Int(self.reader.read_i64()?),
            b'S' => Value::Int(self.reader.read_i16()? as i64),
            b'Z' => Value::Bool(self.reader.read_u8()? != 0),
            // '[' (nested array) or 'L' (object element): an ordinary
            // content token, possibly NULL or a back-REFERENCE.
            b'[' | b'L' => self.read_value()?,
            other => {
                return Err(Error::BadTypeCode {
                    code: other,
                    position: self.position(),
                })
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::SliceSource;

    fn decoder(bytes: &[u8]) -> Decoder<SliceSource<'_>> {
        Decoder::new(SliceSource::new(bytes))
    }

    fn int_array_class_desc() -> Vec<u8> {
        // TC_CLASSDESC "[I" serialVersion=0 flags=SC_SERIALIZABLE 0 fields,
        // empty annotation, NULL super.
        let mut bytes = vec![0x72];
        bytes.extend_from_slice(&2u16.to_be_bytes());
        bytes.extend_from_slice(b"[I");
        bytes.extend_from_slice(&0i64.to_be_bytes());
        bytes.push(0x02); // SC_SERIALIZABLE
        bytes.extend_from_slice(&0u16.to_be_bytes());
        bytes.push(0x78); // ENDBLOCKDATA
        bytes.push(0x70); // NULL super
        bytes
    }

    #[test]
    fn decodes_int_array() {
        let mut bytes = int_array_class_desc();
        bytes.extend_from_slice(&3u32.to_be_bytes());
        bytes.extend_from_slice(&1i32.to_be_bytes());
        bytes.extend_from_slice(&2i32.to_be_bytes());
        bytes.extend_from_slice(&3i32.to_be_bytes());

        let mut d = decoder(&bytes);
        let handle = d.read_array_instance().unwrap();
        let value = match d.handles.resolve(handle, 0).unwrap() {
            Entity::Array(rc) => crate::value::project_array(&rc.borrow()),
            _ => panic!("expected an array entity"),
        };
        assert_eq!(
            value,
            Value::Seq(vec![Value::Int(1), Value::Int(2), Value::Int(3)])
        );
    }
}
