//! The central decoder: owns the byte reader and handle table, and hosts the
//! three external entry points (§6). Every other `read_*` method lives in
//! the module most relevant to what it reads (`descriptor.rs`,
//! `content.rs`, `array.rs`, `object.rs`) as an `impl<S: Source>
//! Decoder<S>` block, rather than one file.

use std::collections::VecDeque;

use crate::content::ContentItem;
use crate::error::{Error, Result};
use crate::handle::HandleTable;
use crate::reader::{ByteReader, Source};
use crate::value::Value;

/// Recursion guard default (§5): deep nesting converts to a hard error
/// rather than a stack overflow.
pub const DEFAULT_DEPTH_LIMIT: usize = 2048;

/// Owns everything one top-level decode needs. `!Sync` by construction (a
/// plain, non-atomic `HandleTable`) — concurrent streams get one `Decoder`
/// each rather than sharing one (§5).
pub struct Decoder<S> {
    pub(crate) reader: ByteReader<S>,
    pub(crate) handles: HandleTable,
    pub(crate) block_buffer: VecDeque<u8>,
    depth: usize,
    depth_limit: usize,
}

impl<S: Source> Decoder<S> {
    pub fn new(source: S) -> Self {
        Decoder {
            reader: ByteReader::new(source),
            handles: HandleTable::new(),
            block_buffer: VecDeque::new(),
            depth: 0,
            depth_limit: DEFAULT_DEPTH_LIMIT,
        }
    }

    pub fn with_depth_limit(source: S, depth_limit: usize) -> Self {
        Decoder {
            depth_limit,
            ..Decoder::new(source)
        }
    }

    pub fn position(&self) -> u64 {
        self.reader.position()
    }

    pub(crate) fn enter(&mut self) -> Result<()> {
        if self.depth >= self.depth_limit {
            return Err(Error::DepthLimitExceeded {
                position: self.position(),
            });
        }
        self.depth += 1;
        Ok(())
    }

    pub(crate) fn leave(&mut self) {
        self.depth -= 1;
    }

    /// Decodes a full stream on an already-constructed decoder: magic,
    /// version, then one content token, or a sequence of them concatenated
    /// into a `Value::Seq` if more than one top-level value is present
    /// (§6). The instance form lets a caller (the CLI, property tests)
    /// control construction, e.g. a non-default depth limit via
    /// [`Decoder::with_depth_limit`].
    pub fn decode(&mut self) -> Result<Value> {
        self.reader.read_magic_and_version()?;
        log::debug!("stream magic/version accepted");
        let mut values = Vec::new();
        while self.reader.peek_u8().is_ok() {
            values.push(self.read_top_level_value()?);
        }
        log::debug!(
            "decode complete: {} top-level value(s), {} handle(s) assigned",
            values.len(),
            self.handles.size()
        );
        Ok(match values.len() {
            1 => values.into_iter().next().unwrap(),
            _ => Value::Seq(values),
        })
    }

    /// Decodes a full stream: magic, version, then one content token, or a
    /// sequence of them concatenated into a `Value::Seq` if more than one
    /// top-level value is present (§6).
    pub fn parse_stream(source: S) -> Result<Value> {
        Decoder::new(source).decode()
    }

    /// Decodes a stream whose sole content is one primitive or object array
    /// (§6, a testing aid rather than a distinct grammar).
    pub fn parse_primitive_array(source: S) -> Result<Value> {
        let mut decoder = Decoder::new(source);
        decoder.reader.read_magic_and_version()?;
        decoder.read_top_level_value()
    }

    /// Decodes a stream whose sole content is one wrapper/string instance
    /// (§6, a testing aid rather than a distinct grammar).
    pub fn parse_class_descriptor(source: S) -> Result<Value> {
        let mut decoder = Decoder::new(source);
        decoder.reader.read_magic_and_version()?;
        decoder.read_top_level_value()
    }

    /// Reads one top-level content token, transparently applying a RESET
    /// token (clearing the handle table and looping for the next value) and
    /// the implicit reset that follows an EXCEPTION token.
    fn read_top_level_value(&mut self) -> Result<Value> {
        loop {
            let item = self.read_content()?;
            match item {
                ContentItem::Reset => {
                    self.handles.reset();
                    log::debug!("handle table reset at offset {}", self.position());
                    continue;
                }
                ContentItem::Exception(_) => {
                    let value = self.value_from_content(item)?;
                    self.handles.reset();
                    log::warn!(
                        "stream exception object at offset {}, handle table reset",
                        self.position()
                    );
                    return Ok(value);
                }
                other => return self.value_from_content(other),
            }
        }
    }
}
