//! Content-token dispatch: the single point every reading path funnels
//! through (§4.5, §9). `ContentItem` is a closed tagged union mirroring the
//! wire grammar's own tag byte, an opcode-table dispatch rather than a
//! hand-rolled `match` scattered across call sites.

use std::rc::Rc;

use crate::decoder::Decoder;
use crate::descriptor::ClassDesc;
use crate::error::{Error, Handle, Result};
use crate::handle::Entity;
use crate::reader::Source;
use crate::value::{project_array, project_object, Value};

pub(crate) const TC_NULL: u8 = 0x70;
pub(crate) const TC_REFERENCE: u8 = 0x71;
pub(crate) const TC_CLASSDESC: u8 = 0x72;
pub(crate) const TC_OBJECT: u8 = 0x73;
pub(crate) const TC_STRING: u8 = 0x74;
pub(crate) const TC_ARRAY: u8 = 0x75;
pub(crate) const TC_CLASS: u8 = 0x76;
pub(crate) const TC_BLOCKDATA: u8 = 0x77;
pub(crate) const TC_ENDBLOCKDATA: u8 = 0x78;
pub(crate) const TC_RESET: u8 = 0x79;
pub(crate) const TC_BLOCKDATALONG: u8 = 0x7A;
pub(crate) const TC_EXCEPTION: u8 = 0x7B;
pub(crate) const TC_LONGSTRING: u8 = 0x7C;
pub(crate) const TC_PROXYCLASSDESC: u8 = 0x7D;
pub(crate) const TC_ENUM: u8 = 0x7E;

/// One content token, tagged exactly like the wire format's own dispatch
/// byte (§4.5).
#[derive(Debug, Clone)]
pub(crate) enum ContentItem {
    Null,
    Reference(Handle),
    ClassDescItem(Option<Rc<ClassDesc>>),
    Object(Handle),
    Str(Handle),
    Array(Handle),
    Class(Handle),
    BlockData(Vec<u8>),
    EndBlockData,
    Reset,
    Exception(Handle),
    Enum(Handle),
}

impl<S: Source> Decoder<S> {
    /// Reads the next content token, dispatching on its tag byte. Guards
    /// recursion depth since this is the one place every nested read
    /// eventually passes through.
    pub(crate) fn read_content(&mut self) -> Result<ContentItem> {
        self.enter()?;
        let result = self.read_content_inner();
        self.leave();
        result
    }

    fn read_content_inner(&mut self) -> Result<ContentItem> {
        let tag_pos = self.position();
        let tag = self.reader.peek_u8()?;
        match tag {
            TC_NULL => {
                self.reader.read_u8()?;
                Ok(ContentItem::Null)
            }
            TC_REFERENCE => {
                self.reader.read_u8()?;
                let handle = self.reader.read_u32()?;
                Ok(ContentItem::Reference(handle))
            }
            TC_CLASSDESC | TC_PROXYCLASSDESC => {
                Ok(ContentItem::ClassDescItem(self.read_class_desc()?))
            }
            TC_OBJECT => {
                self.reader.read_u8()?;
                Ok(ContentItem::Object(self.read_object_instance()?))
            }
            TC_STRING => {
                self.reader.read_u8()?;
                let s: Rc<str> = Rc::from(self.reader.read_utf_short()?);
                let handle = self.handles.assign(Entity::Str(s));
                Ok(ContentItem::Str(handle))
            }
            TC_LONGSTRING => {
                self.reader.read_u8()?;
                let s: Rc<str> = Rc::from(self.reader.read_utf_long()?);
                let handle = self.handles.assign(Entity::Str(s));
                Ok(ContentItem::Str(handle))
            }
            TC_ARRAY => {
                self.reader.read_u8()?;
                Ok(ContentItem::Array(self.read_array_instance()?))
            }
            TC_CLASS => {
                self.reader.read_u8()?;
                let desc = self.read_class_desc()?.ok_or_else(|| Error::InconsistentDescriptor {
                    detail: "TC_CLASS with a NULL class descriptor".into(),
                    position: self.position(),
                })?;
                let handle = self.handles.assign(Entity::Class(desc));
                Ok(ContentItem::Class(handle))
            }
            TC_BLOCKDATA => {
                self.reader.read_u8()?;
                let len = self.reader.read_u8()? as usize;
                Ok(ContentItem::BlockData(self.reader.read_bytes(len)?))
            }
            TC_BLOCKDATALONG => {
                self.reader.read_u8()?;
                let len = self.reader.read_u32()? as usize;
                Ok(ContentItem::BlockData(self.reader.read_bytes(len)?))
            }
            TC_ENDBLOCKDATA => {
                self.reader.read_u8()?;
                Ok(ContentItem::EndBlockData)
            }
            TC_RESET => {
                self.reader.read_u8()?;
                Ok(ContentItem::Reset)
            }
            TC_EXCEPTION => {
                self.reader.read_u8()?;
                Ok(ContentItem::Exception(self.read_object_instance()?))
            }
            TC_ENUM => {
                self.reader.read_u8()?;
                Ok(ContentItem::Enum(self.read_enum_instance()?))
            }
            other => Err(Error::UnknownTag {
                tag: other,
                position: tag_pos,
            }),
        }
    }

    /// Reads one content token and projects it straight to a `Value`.
    pub(crate) fn read_value(&mut self) -> Result<Value> {
        let item = self.read_content()?;
        self.value_from_content(item)
    }

    pub(crate) fn value_from_content(&mut self, item: ContentItem) -> Result<Value> {
        match item {
            ContentItem::Null => Ok(Value::Null),
            ContentItem::Reference(handle) => self.project_handle(handle),
            ContentItem::Object(handle) => self.project_handle(handle),
            ContentItem::Array(handle) => self.project_handle(handle),
            ContentItem::Class(handle) => self.project_handle(handle),
            ContentItem::Enum(handle) => self.project_handle(handle),
            ContentItem::Exception(handle) => self.project_handle(handle),
            ContentItem::Str(handle) => {
                let pos = self.position();
                match self.handles.resolve(handle, pos)? {
                    Entity::Str(s) => Ok(Value::Str(s)),
                    _ => unreachable!("a freshly-read Str content item always registers Entity::Str"),
                }
            }
            ContentItem::ClassDescItem(desc) => Ok(match desc {
                Some(d) => Value::Str(d.name.clone()),
                None => Value::Null,
            }),
            ContentItem::BlockData(bytes) => Ok(Value::Bytes(bytes)),
            ContentItem::EndBlockData | ContentItem::Reset => Err(Error::InconsistentDescriptor {
                detail: "unexpected control token where a value was expected".into(),
                position: self.position(),
            }),
        }
    }

    /// Resolves `handle` to its projected value, returning `Value::Ref` on
    /// every visit after the first — the proxy-node approach for shared and
    /// cyclic structure (§4.7, §9).
    fn project_handle(&mut self, handle: Handle) -> Result<Value> {
        if !self.handles.visit(handle) {
            return Ok(Value::Ref(handle));
        }
        let pos = self.position();
        match self.handles.resolve(handle, pos)? {
            Entity::Object(rc) => Ok(project_object(&rc.borrow())),
            Entity::Array(rc) => Ok(project_array(&rc.borrow())),
            Entity::Str(s) => Ok(Value::Str(s)),
            Entity::ClassDesc(d) | Entity::Class(d) => Ok(Value::Str(d.name.clone())),
            Entity::Enum { class, name } => Ok(Value::Object {
                class: class.name.clone(),
                fields: vec![(Rc::from("name"), Value::Str(name))],
            }),
            // Still under construction: a genuine cycle reached through this
            // handle before its owning instance finished decoding.
            Entity::Pending => Ok(Value::Ref(handle)),
        }
    }

    /// Reads a class-annotation block: zero or more block-data records
    /// concatenated, terminated by `ENDBLOCKDATA` (§4.3, §4.5). Any other
    /// token inside is a malformed stream — unlike an object-level
    /// write-method annotation, a class annotation never interleaves object
    /// tokens.
    pub(crate) fn read_annotation_block(&mut self) -> Result<Vec<u8>> {
        let mut bytes = Vec::new();
        loop {
            match self.read_content()? {
                ContentItem::EndBlockData => return Ok(bytes),
                ContentItem::BlockData(mut chunk) => bytes.append(&mut chunk),
                _ => {
                    return Err(Error::InconsistentDescriptor {
                        detail: "annotation block contains a non-block-data token".into(),
                        position: self.position(),
                    })
                }
            }
        }
    }

    /// Reads one content token and requires it to be `ENDBLOCKDATA`, the way
    /// a well-known handler finishes consuming its annotation block.
    pub(crate) fn expect_end_block_data(&mut self) -> Result<()> {
        match self.read_content()? {
            ContentItem::EndBlockData => Ok(()),
            _ => Err(Error::InconsistentDescriptor {
                detail: "expected ENDBLOCKDATA after well-known class annotation".into(),
                position: self.position(),
            }),
        }
    }

    fn fill_block_buffer(&mut self, need: usize) -> Result<()> {
        while self.block_buffer.len() < need {
            let tag = self.reader.peek_u8()?;
            match tag {
                TC_BLOCKDATA => {
                    self.reader.read_u8()?;
                    let len = self.reader.read_u8()? as usize;
                    let bytes = self.reader.read_bytes(len)?;
                    self.block_buffer.extend(bytes);
                }
                TC_BLOCKDATALONG => {
                    self.reader.read_u8()?;
                    let len = self.reader.read_u32()? as usize;
                    let bytes = self.reader.read_bytes(len)?;
                    self.block_buffer.extend(bytes);
                }
                other => {
                    return Err(Error::InconsistentDescriptor {
                        detail: format!(
                            "expected block data while reading a well-known class's primitives, found tag {other:#04x}"
                        ),
                        position: self.position(),
                    })
                }
            }
        }
        Ok(())
    }

    /// Pulls `n` bytes out of the block-data stream, fetching additional
    /// `TC_BLOCKDATA(LONG)` records as needed. Well-known handlers
    /// (`java.util.ArrayList`'s leading size, `HashMap`'s load factor, …)
    /// read their primitives this way since the writer is free to split them
    /// across block-data records however it pleases.
    pub(crate) fn read_block_bytes(&mut self, n: usize) -> Result<Vec<u8>> {
        self.fill_block_buffer(n)?;
        Ok(self.block_buffer.drain(..n).collect())
    }

    pub(crate) fn read_block_i32(&mut self) -> Result<i32> {
        let b = self.read_block_bytes(4)?;
        Ok(i32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub(crate) fn read_block_f32(&mut self) -> Result<f32> {
        Ok(f32::from_bits(self.read_block_i32()? as u32))
    }

    pub(crate) fn read_block_i64(&mut self) -> Result<i64> {
        let b = self.read_block_bytes(8)?;
        let mut arr = [0u8; 8];
        arr.copy_from_slice(&b);
        Ok(i64::from_be_bytes(arr))
    }
}
