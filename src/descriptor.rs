//! Class-descriptor decoding: inline class metadata (name, serial version,
//! flags, field descriptors, super-class descriptor) and its proxy-class
//! variant.
//!
//! The flags byte uses plain `const` bitmasks rather than pulling in the
//! `bitflags` crate for five bits.

use std::rc::Rc;

use crate::content::{
    TC_CLASSDESC, TC_LONGSTRING, TC_NULL, TC_PROXYCLASSDESC, TC_REFERENCE, TC_STRING,
};
use crate::decoder::Decoder;
use crate::error::{Error, Result};
use crate::handle::Entity;
use crate::reader::Source;

/// Written with a custom `writeObject`/`writeExternal` method; its data is
/// followed by a terminated annotation block.
pub const SC_WRITE_METHOD: u8 = 0x01;
/// Implements `java.io.Serializable`.
pub const SC_SERIALIZABLE: u8 = 0x02;
/// Implements `java.io.Externalizable`.
pub const SC_EXTERNALIZABLE: u8 = 0x04;
/// Externalizable data is written using the block-data format.
pub const SC_BLOCK_DATA: u8 = 0x08;
/// The class is an enum constant.
pub const SC_ENUM: u8 = 0x10;

pub fn has_flag(flags: u8, mask: u8) -> bool {
    flags & mask == mask
}

/// A single declared field of a class descriptor.
#[derive(Debug, Clone)]
pub struct FieldDesc {
    pub type_code: u8,
    pub name: Rc<str>,
    /// Present only for object (`L`) and array (`[`) fields: the declared
    /// element/field class name.
    pub class_name: Option<Rc<str>>,
}

impl FieldDesc {
    pub fn is_primitive(&self) -> bool {
        self.class_name.is_none()
    }
}

/// Inline class metadata, registered in the handle table at its opening tag
/// byte (before its name is even read) so that a forward reference occurring
/// inside its own subtree can resolve.
#[derive(Debug)]
pub struct ClassDesc {
    pub name: Rc<str>,
    pub serial_version: i64,
    pub flags: u8,
    pub fields: Vec<FieldDesc>,
    pub class_annotation: Vec<u8>,
    pub super_desc: Option<Rc<ClassDesc>>,
    pub is_proxy: bool,
    pub proxy_interfaces: Vec<Rc<str>>,
}

impl ClassDesc {
    pub fn is_enum(&self) -> bool {
        has_flag(self.flags, SC_ENUM)
    }

    pub fn has_write_method(&self) -> bool {
        has_flag(self.flags, SC_WRITE_METHOD)
    }

    pub fn is_serializable(&self) -> bool {
        has_flag(self.flags, SC_SERIALIZABLE)
    }

    pub fn is_externalizable(&self) -> bool {
        has_flag(self.flags, SC_EXTERNALIZABLE)
    }

    pub fn is_block_data_externalizable(&self) -> bool {
        has_flag(self.flags, SC_BLOCK_DATA)
    }

    /// The class hierarchy from the topmost ancestor down to `self`,
    /// super-first, as instance decoding needs to walk it (§4.5).
    pub fn hierarchy(self: &Rc<Self>) -> Vec<Rc<ClassDesc>> {
        let mut chain = Vec::new();
        let mut current = Some(self.clone());
        while let Some(desc) = current {
            current = desc.super_desc.clone();
            chain.push(desc);
        }
        chain.reverse();
        chain
    }
}

impl<S: Source> Decoder<S> {
    /// Reads a class-descriptor token: NULL, REFERENCE, CLASSDESC, or
    /// PROXYCLASSDESC.
    pub(crate) fn read_class_desc(&mut self) -> Result<Option<Rc<ClassDesc>>> {
        let tag_pos = self.position();
        let tag = self.reader.read_u8()?;
        match tag {
            TC_NULL => Ok(None),
            TC_REFERENCE => {
                let pos = self.position();
                let handle = self.reader.read_u32()?;
                match self.handles.resolve(handle, pos)? {
                    Entity::ClassDesc(desc) | Entity::Class(desc) => Ok(Some(desc)),
                    _ => Err(Error::InconsistentDescriptor {
                        detail: format!("handle {handle:#x} does not name a class descriptor"),
                        position: pos,
                    }),
                }
            }
            TC_CLASSDESC => self.read_new_class_desc(false).map(Some),
            TC_PROXYCLASSDESC => self.read_new_class_desc(true).map(Some),
            other => Err(Error::UnknownTag {
                tag: other,
                position: tag_pos,
            }),
        }
    }

    fn read_new_class_desc(&mut self, is_proxy: bool) -> Result<Rc<ClassDesc>> {
        let handle = self.handles.assign(Entity::Pending);
        let desc = if is_proxy {
            let count = self.reader.read_u32()?;
            let mut proxy_interfaces = Vec::with_capacity(count as usize);
            for _ in 0..count {
                proxy_interfaces.push(Rc::from(self.reader.read_utf_short()?));
            }
            let class_annotation = self.read_annotation_block()?;
            let super_desc = self.read_class_desc()?;
            let name = proxy_interfaces
                .first()
                .cloned()
                .unwrap_or_else(|| Rc::from(""));
            ClassDesc {
                name,
                serial_version: 0,
                flags: 0,
                fields: Vec::new(),
                class_annotation,
                super_desc,
                is_proxy: true,
                proxy_interfaces,
            }
        } else {
            let name: Rc<str> = Rc::from(self.reader.read_utf_short()?);
            let serial_version = self.reader.read_i64()?;
            let flags = self.reader.read_u8()?;
            let field_count = self.reader.read_u16()?;
            let mut fields = Vec::with_capacity(field_count as usize);
            for _ in 0..field_count {
                fields.push(self.read_field_desc()?);
            }
            if fields.len() != field_count as usize {
                return Err(Error::InconsistentDescriptor {
                    detail: "field count disagrees with the number of fields read".into(),
                    position: self.position(),
                });
            }
            let class_annotation = self.read_annotation_block()?;
            let super_desc = self.read_class_desc()?;
            ClassDesc {
                name,
                serial_version,
                flags,
                fields,
                class_annotation,
                super_desc,
                is_proxy: false,
                proxy_interfaces: Vec::new(),
            }
        };
        let rc = Rc::new(desc);
        self.handles.populate(handle, Entity::ClassDesc(rc.clone()));
        log::trace!("registered class descriptor `{}` at {:#x}", rc.name, handle);
        Ok(rc)
    }

    fn read_field_desc(&mut self) -> Result<FieldDesc> {
        let pos = self.position();
        let type_code = self.reader.read_u8()?;
        let name: Rc<str> = Rc::from(self.reader.read_utf_short()?);
        let class_name = match type_code {
            b'B' | b'C' | b'D' | b'F' | b'I' | b'J' | b'S' | b'Z' => None,
            b'[' | b'L' => Some(self.read_string_token()?),
            other => {
                return Err(Error::BadTypeCode {
                    code: other,
                    position: pos,
                })
            }
        };
        Ok(FieldDesc {
            type_code,
            name,
            class_name,
        })
    }

    /// Reads a "string token": a field/array class-name reference, which is
    /// itself either a reference to an already-registered string or a new
    /// short/long string that gets registered here.
    pub(crate) fn read_string_token(&mut self) -> Result<Rc<str>> {
        let tag_pos = self.position();
        let tag = self.reader.read_u8()?;
        match tag {
            TC_STRING => {
                let s: Rc<str> = Rc::from(self.reader.read_utf_short()?);
                self.handles.assign(Entity::Str(s.clone()));
                Ok(s)
            }
            TC_LONGSTRING => {
                let s: Rc<str> = Rc::from(self.reader.read_utf_long()?);
                self.handles.assign(Entity::Str(s.clone()));
                Ok(s)
            }
            TC_REFERENCE => {
                let pos = self.position();
                let handle = self.reader.read_u32()?;
                match self.handles.resolve(handle, pos)? {
                    Entity::Str(s) => Ok(s),
                    _ => Err(Error::InconsistentDescriptor {
                        detail: format!("handle {handle:#x} does not name a string"),
                        position: pos,
                    }),
                }
            }
            TC_NULL => Err(Error::InconsistentDescriptor {
                detail: "expected a string token, found NULL".into(),
                position: tag_pos,
            }),
            other => Err(Error::UnknownTag {
                tag: other,
                position: tag_pos,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::SliceSource;

    fn decoder(bytes: &[u8]) -> Decoder<SliceSource<'_>> {
        Decoder::new(SliceSource::new(bytes))
    }

    #[test]
    fn reads_simple_class_descriptor() {
        // TC_CLASSDESC, name="Foo", serialVersion=1, flags=SC_SERIALIZABLE,
        // 0 fields, empty annotation, TC_NULL super.
        let mut bytes = vec![0x72];
        bytes.extend_from_slice(&3u16.to_be_bytes());
        bytes.extend_from_slice(b"Foo");
        bytes.extend_from_slice(&1i64.to_be_bytes());
        bytes.push(SC_SERIALIZABLE);
        bytes.extend_from_slice(&0u16.to_be_bytes());
        bytes.push(0x78); // ENDBLOCKDATA terminates the (empty) class annotation
        bytes.push(0x70); // TC_NULL super

        let mut d = decoder(&bytes);
        let desc = d.read_class_desc().unwrap().unwrap();
        assert_eq!(&*desc.name, "Foo");
        assert_eq!(desc.serial_version, 1);
        assert!(desc.is_serializable());
        assert!(desc.super_desc.is_none());
        assert!(desc.fields.is_empty());
    }

    #[test]
    fn null_class_desc_yields_none() {
        let mut d = decoder(&[0x70]);
        assert!(d.read_class_desc().unwrap().is_none());
    }
}
