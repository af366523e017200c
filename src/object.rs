//! Object instance decoding: the super-first class-hierarchy walk at the
//! heart of the decoder (§4.5).

use std::cell::RefCell;
use std::rc::Rc;

use crate::decoder::Decoder;
use crate::descriptor::{ClassDesc, FieldDesc};
use crate::error::{Error, Handle, Result};
use crate::handle::Entity;
use crate::reader::Source;
use crate::value::Value;
use crate::wellknown;

/// One class level's share of an instance: its declared fields, plus
/// whatever the class annotation attached (raw bytes only — a level whose
/// annotation was handled by a well-known handler instead surfaces through
/// `ObjectData::well_known_value`, not here).
#[derive(Debug)]
pub struct ObjectLevel {
    pub class: Rc<ClassDesc>,
    pub fields: Vec<(Rc<str>, Value)>,
    pub raw_annotation: Option<Vec<u8>>,
}

/// A fully-decoded object: its class hierarchy's per-level field maps,
/// super-first (§4.5), plus an optional override when some level turned out
/// to be a recognized well-known class (a wrapper, a collection, `BitSet`)
/// whose projected value supersedes the generic field-map form entirely.
#[derive(Debug)]
pub struct ObjectData {
    pub levels: Vec<ObjectLevel>,
    pub well_known_value: Option<Value>,
}

impl<S: Source> Decoder<S> {
    /// Reads an object instance: class descriptor, then a fresh object
    /// handle, then each level of the hierarchy super-first.
    pub(crate) fn read_object_instance(&mut self) -> Result<Handle> {
        let desc = self.read_class_desc()?.ok_or_else(|| Error::InconsistentDescriptor {
            detail: "object with a NULL class descriptor".into(),
            position: self.position(),
        })?;
        let handle = self.handles.assign(Entity::Pending);
        let hierarchy = desc.hierarchy();
        let mut levels = Vec::with_capacity(hierarchy.len());
        let mut well_known_value = None;
        for class in &hierarchy {
            let (level, value) = self.read_object_level(class)?;
            levels.push(level);
            if value.is_some() {
                well_known_value = value;
            }
        }
        let data = ObjectData {
            levels,
            well_known_value,
        };
        self.handles
            .populate(handle, Entity::Object(Rc::new(RefCell::new(data))));
        log::trace!("decoded object `{}` at {:#x}", desc.name, handle);
        Ok(handle)
    }

    /// Reads an ENUM content token: class descriptor, then a string token
    /// naming the constant (§4.5).
    pub(crate) fn read_enum_instance(&mut self) -> Result<Handle> {
        let desc = self.read_class_desc()?.ok_or_else(|| Error::InconsistentDescriptor {
            detail: "enum with a NULL class descriptor".into(),
            position: self.position(),
        })?;
        let handle = self.handles.assign(Entity::Pending);
        let name = self.read_string_token()?;
        self.handles.populate(handle, Entity::Enum { class: desc, name });
        Ok(handle)
    }

    fn read_object_level(&mut self, class: &Rc<ClassDesc>) -> Result<(ObjectLevel, Option<Value>)> {
        if class.is_externalizable() && !class.is_block_data_externalizable() {
            let handler = wellknown::dispatch(&class.name).ok_or_else(|| Error::UnsupportedExternalizable {
                class_name: class.name.to_string(),
                position: self.position(),
            })?;
            let value = handler(self, class)?;
            let level = ObjectLevel {
                class: class.clone(),
                fields: Vec::new(),
                raw_annotation: None,
            };
            return Ok((level, Some(value)));
        }

        if class.is_externalizable() {
            let (value, raw) = self.read_level_annotation(class)?;
            let level = ObjectLevel {
                class: class.clone(),
                fields: Vec::new(),
                raw_annotation: raw,
            };
            return Ok((level, value));
        }

        let mut fields = Vec::with_capacity(class.fields.len());
        for field in &class.fields {
            fields.push((field.name.clone(), self.read_field_value(field)?));
        }
        let mut well_known_value =
            wellknown::wrapper_value(&class.name, &fields).or_else(|| wellknown::bitset_value(&class.name, &fields));

        if class.has_write_method() {
            let (value, raw) = self.read_level_annotation(class)?;
            if value.is_some() {
                well_known_value = value;
            }
            let level = ObjectLevel {
                class: class.clone(),
                fields,
                raw_annotation: raw,
            };
            return Ok((level, well_known_value));
        }

        Ok((
            ObjectLevel {
                class: class.clone(),
                fields,
                raw_annotation: None,
            },
            well_known_value,
        ))
    }

    /// Dispatches a level's annotation block to its well-known handler if
    /// one is registered for the class name; otherwise captures the raw
    /// block-data bytes and attaches them instead of failing (§4.6, §9).
    fn read_level_annotation(&mut self, class: &ClassDesc) -> Result<(Option<Value>, Option<Vec<u8>>)> {
        match wellknown::dispatch(&class.name) {
            Some(handler) => {
                let value = handler(self, class)?;
                self.expect_end_block_data()?;
                Ok((Some(value), None))
            }
            None => Ok((None, Some(self.read_annotation_block()?))),
        }
    }

    fn read_field_value(&mut self, field: &FieldDesc) -> Result<Value> {
        let pos = self.position();
        Ok(match field.type_code {
            b'B' => Value::Int(self.reader.read_i8()? as i64),
            b'C' => Value::Str(Rc::from(String::from_utf16_lossy(&[self.reader.read_u16()?]))),
            b'D' => Value::Float(self.reader.read_f64()?),
            b'F' => Value::Float(self.reader.read_f32()? as f64),
            b'I' => Value::Int(self.reader.read_i32()? as i64),
            b'J' => Value::Int(self.reader.read_i64()?),
            b'S' => Value::Int(self.reader.read_i16()? as i64),
            b'Z' => Value::Bool(self.reader.read_u8()? != 0),
            b'L' | b'[' => self.read_value()?,
            other => {
                return Err(Error::BadTypeCode {
                    code: other,
                    position: pos,
                })
            }
        })
    }
}
