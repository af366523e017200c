//! Handle table: the single source of truth for every referenceable entity
//! a stream allocates (class descriptors, objects, arrays, strings, enums).
//!
//! One unified table shared by every entity kind, since here a reference may
//! resolve to any of them, rather than separate per-kind caches.

use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

use crate::descriptor::ClassDesc;
use crate::error::{Error, Handle, Result};
use crate::object::ObjectData;
use crate::value::ArrayData;

/// The first handle assigned in a stream, per the wire format.
pub const HANDLE_BASE: Handle = 0x7E0000;

/// An entity registered in the handle table.
///
/// Objects and arrays are registered as `Pending` the instant their tag
/// byte is read, then swapped in place once allocated — this is what lets a
/// back-reference inside an entity's own subtree resolve to it before it is
/// fully populated: registration precedes population.
#[derive(Clone)]
pub enum Entity {
    Pending,
    ClassDesc(Rc<ClassDesc>),
    Object(Rc<RefCell<ObjectData>>),
    Array(Rc<RefCell<ArrayData>>),
    Str(Rc<str>),
    Enum { class: Rc<ClassDesc>, name: Rc<str> },
    Class(Rc<ClassDesc>),
}

/// Append-only registry of every entity introduced by the current
/// top-level decode (reset mid-stream by a RESET token, §4.5).
#[derive(Default)]
pub struct HandleTable {
    entities: Vec<Entity>,
    /// Handles already embedded as a full value during the current
    /// projection; a second visit yields `Value::Ref` instead of
    /// re-descending (§4.7, §9).
    seen: HashSet<Handle>,
}

impl HandleTable {
    pub fn new() -> Self {
        HandleTable {
            entities: Vec::new(),
            seen: HashSet::new(),
        }
    }

    /// Records a projection visit to `handle`. Returns `true` the first
    /// time, `false` on every subsequent visit (a shared or cyclic
    /// reference).
    pub fn visit(&mut self, handle: Handle) -> bool {
        self.seen.insert(handle)
    }

    /// Number of handles assigned since the last reset.
    pub fn size(&self) -> usize {
        self.entities.len()
    }

    /// The handle that will be returned by the next `assign` call.
    pub fn next_handle(&self) -> Handle {
        HANDLE_BASE + self.entities.len() as u32
    }

    /// Registers a new entity, returning its freshly assigned handle.
    pub fn assign(&mut self, entity: Entity) -> Handle {
        let handle = self.next_handle();
        self.entities.push(entity);
        handle
    }

    /// Overwrites a previously `Pending` entry once its node is allocated.
    pub fn populate(&mut self, handle: Handle, entity: Entity) {
        let idx = (handle - HANDLE_BASE) as usize;
        self.entities[idx] = entity;
    }

    /// Resolves a handle to its entity, failing with `BadHandle` if the
    /// handle was never assigned (including handles from before a RESET).
    pub fn resolve(&self, handle: Handle, position: u64) -> Result<Entity> {
        let idx = handle.checked_sub(HANDLE_BASE).map(|i| i as usize);
        match idx.and_then(|i| self.entities.get(i)) {
            Some(entity) => Ok(entity.clone()),
            None => Err(Error::BadHandle { handle, position }),
        }
    }

    /// Clears the table and rewinds the handle counter to `HANDLE_BASE`,
    /// implementing the RESET content token.
    pub fn reset(&mut self) {
        self.entities.clear();
        self.seen.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handles_are_assigned_monotonically() {
        let mut table = HandleTable::new();
        let h0 = table.assign(Entity::Pending);
        let h1 = table.assign(Entity::Pending);
        let h2 = table.assign(Entity::Pending);
        assert_eq!(h0, HANDLE_BASE);
        assert_eq!(h1, HANDLE_BASE + 1);
        assert_eq!(h2, HANDLE_BASE + 2);
    }

    #[test]
    fn resolve_unassigned_handle_fails() {
        let table = HandleTable::new();
        let err = table.resolve(HANDLE_BASE, 42).unwrap_err();
        assert!(matches!(err, Error::BadHandle { handle, position } if handle == HANDLE_BASE && position == 42));
    }

    #[test]
    fn reset_clears_table_and_rewinds_counter() {
        let mut table = HandleTable::new();
        table.assign(Entity::Pending);
        table.assign(Entity::Pending);
        table.reset();
        assert_eq!(table.size(), 0);
        assert_eq!(table.next_handle(), HANDLE_BASE);
    }

    #[test]
    fn reference_across_reset_is_bad_handle() {
        let mut table = HandleTable::new();
        let h = table.assign(Entity::Pending);
        table.reset();
        assert!(table.resolve(h, 0).is_err());
    }
}
