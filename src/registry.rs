//! Reference-counted slot arena.
//!
//! A [`Registry`] maps [`ObjectId`]s to kind-tagged slots with a local
//! reference count. Identifiers are issued from a monotonically increasing
//! counter and never reused, so a released identifier stays invalid for the
//! lifetime of the registry.

use std::collections::HashMap;

use crate::engine::ObjectId;
use crate::handle::ObjectKind;

/// One live resource.
#[derive(Debug)]
pub struct Slot<T> {
    kind: ObjectKind,
    refs: usize,
    value: T,
}

impl<T> Slot<T> {
    #[inline]
    pub fn kind(&self) -> ObjectKind {
        self.kind
    }

    #[inline]
    pub fn refs(&self) -> usize {
        self.refs
    }

    #[inline]
    pub fn value(&self) -> &T {
        &self.value
    }
}

/// Outcome of dropping a reference.
#[derive(Debug)]
pub enum DecRef<T> {
    /// Other references remain.
    Alive(usize),
    /// That was the last reference; the slot's value is handed back.
    Freed(T),
}

/// Arena of reference-counted slots.
#[derive(Debug)]
pub struct Registry<T> {
    slots: HashMap<ObjectId, Slot<T>>,
    next: u64,
}

impl<T> Default for Registry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Registry<T> {
    pub fn new() -> Self {
        Self { slots: HashMap::new(), next: 1 }
    }

    /// Insert a value holding one reference.
    pub fn insert(&mut self, kind: ObjectKind, value: T) -> ObjectId {
        let raw = self.next;
        self.next += 1;
        // `next` starts at 1 and only grows.
        let id = ObjectId::new(raw).unwrap_or_else(|| unreachable!("identifier counter wrapped"));
        self.slots.insert(id, Slot { kind, refs: 1, value });
        id
    }

    #[inline]
    pub fn contains(&self, id: ObjectId) -> bool {
        self.slots.contains_key(&id)
    }

    pub fn slot(&self, id: ObjectId) -> Option<&Slot<T>> {
        self.slots.get(&id)
    }

    pub fn get(&self, id: ObjectId) -> Option<&T> {
        self.slots.get(&id).map(|s| &s.value)
    }

    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut T> {
        self.slots.get_mut(&id).map(|s| &mut s.value)
    }

    pub fn kind(&self, id: ObjectId) -> Option<ObjectKind> {
        self.slots.get(&id).map(|s| s.kind)
    }

    pub fn refs(&self, id: ObjectId) -> Option<usize> {
        self.slots.get(&id).map(|s| s.refs)
    }

    /// Add a reference; returns the new count, or None for unknown ids.
    pub fn inc_ref(&mut self, id: ObjectId) -> Option<usize> {
        let slot = self.slots.get_mut(&id)?;
        slot.refs += 1;
        Some(slot.refs)
    }

    /// Drop a reference, removing the slot when the count reaches zero.
    pub fn dec_ref(&mut self, id: ObjectId) -> Option<DecRef<T>> {
        let slot = self.slots.get_mut(&id)?;
        slot.refs -= 1;
        if slot.refs > 0 {
            return Some(DecRef::Alive(slot.refs));
        }
        self.slots.remove(&id).map(|s| DecRef::Freed(s.value))
    }

    /// Iterate over live slots, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (ObjectId, &Slot<T>)> + '_ {
        self.slots.iter().map(|(&id, slot)| (id, slot))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
