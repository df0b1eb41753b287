// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Object scopes.
//!
//! A fresh object points at a shared [`EmptyScope`] cached on its
//! prototype. The first property addition gives it an owned [`Scope`]
//! that tracks the terminal shape, the slot watermark and, for larger
//! objects, a hash table from id to shape.

use crate::class::{ClassRef, same_class};
use crate::config::SlotGrowth;
use crate::error::{Error, Result};
use crate::id::PropertyId;
use crate::shape::{Attrs, PropertyOp, PropertyTree, Shape, ShapeId};
use crate::slots::Slots;
use crate::value::Value;
use rustc_hash::FxHashMap;
use std::fmt;
use std::sync::Arc;

/// Unique scope identity, for diagnostics and tests.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeId(pub(crate) u64);

impl fmt::Debug for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "scope#{}", self.0)
    }
}

impl fmt::Display for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A property-less scope shared by fresh objects of one class and proto.
pub struct EmptyScope {
    id: ScopeId,
    class: ClassRef,
    freeslot: u32,
}

impl EmptyScope {
    pub(crate) fn new(id: ScopeId, class: ClassRef) -> Self {
        Self {
            id,
            class,
            freeslot: class.reserved_slots(),
        }
    }

    /// Scope identity.
    pub fn id(&self) -> ScopeId {
        self.id
    }

    /// Class of the objects sharing this scope.
    pub fn class(&self) -> ClassRef {
        self.class
    }

    /// First slot past the class's reserved slots.
    pub fn freeslot(&self) -> u32 {
        self.freeslot
    }
}

impl fmt::Debug for EmptyScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmptyScope")
            .field("id", &self.id)
            .field("class", &self.class.name())
            .finish()
    }
}

/// Either a shared empty scope or an object-owned one.
#[derive(Debug)]
pub enum ScopeRef {
    /// Shared, read-only, no properties.
    Shared(Arc<EmptyScope>),
    /// Owned by one object.
    Own(Box<Scope>),
}

impl ScopeRef {
    /// True for a shared empty scope.
    pub fn is_shared(&self) -> bool {
        matches!(self, ScopeRef::Shared(_))
    }

    /// Scope identity.
    pub fn id(&self) -> ScopeId {
        match self {
            ScopeRef::Shared(es) => es.id,
            ScopeRef::Own(s) => s.id,
        }
    }

    /// Terminal shape.
    pub fn last_prop(&self) -> ShapeId {
        match self {
            ScopeRef::Shared(_) => ShapeId::EMPTY,
            ScopeRef::Own(s) => s.last_prop,
        }
    }

    /// Slot watermark. Only meaningful for owned scopes.
    pub fn freeslot(&self) -> u32 {
        match self {
            ScopeRef::Shared(es) => es.freeslot,
            ScopeRef::Own(s) => s.freeslot,
        }
    }

    /// Number of properties.
    pub fn entry_count(&self) -> usize {
        match self {
            ScopeRef::Shared(_) => 0,
            ScopeRef::Own(s) => s.entries,
        }
    }

    /// The owned scope, if any.
    pub fn as_own(&self) -> Option<&Scope> {
        match self {
            ScopeRef::Own(s) => Some(s),
            ScopeRef::Shared(_) => None,
        }
    }

    /// The owned scope, mutably.
    pub fn as_own_mut(&mut self) -> Option<&mut Scope> {
        match self {
            ScopeRef::Own(s) => Some(s),
            ScopeRef::Shared(_) => None,
        }
    }

    /// Look up `id`. Shared scopes have no properties.
    pub fn lookup(&self, tree: &PropertyTree, id: &PropertyId) -> Option<ShapeId> {
        self.as_own().and_then(|s| s.lookup(tree, id))
    }
}

/// An object-owned scope.
#[derive(Debug)]
pub struct Scope {
    id: ScopeId,
    last_prop: ShapeId,
    freeslot: u32,
    entries: usize,
    table: Option<FxHashMap<PropertyId, ShapeId>>,
    /// One shared empty scope per instance class, for objects using the
    /// owner as their prototype.
    empty_scopes: Vec<Arc<EmptyScope>>,
}

impl Scope {
    pub(crate) fn new(id: ScopeId, freeslot: u32) -> Self {
        Self {
            id,
            last_prop: ShapeId::EMPTY,
            freeslot,
            entries: 0,
            table: None,
            empty_scopes: Vec::new(),
        }
    }

    /// Scope identity.
    pub fn id(&self) -> ScopeId {
        self.id
    }

    /// Terminal shape.
    pub fn last_prop(&self) -> ShapeId {
        self.last_prop
    }

    /// First unused slot.
    pub fn freeslot(&self) -> u32 {
        self.freeslot
    }

    /// Number of properties.
    pub fn entry_count(&self) -> usize {
        self.entries
    }

    /// True once the lookup table has been built.
    pub fn is_hashed(&self) -> bool {
        self.table.is_some()
    }

    pub(crate) fn raise_freeslot(&mut self, nslots: u32) {
        self.freeslot = self.freeslot.max(nslots);
    }

    /// Find the shape for `id`.
    pub fn lookup(&self, tree: &PropertyTree, id: &PropertyId) -> Option<ShapeId> {
        match &self.table {
            Some(table) => table.get(id).copied(),
            None => tree.search(self.last_prop, id),
        }
    }

    /// Shapes in insertion order.
    pub fn shapes(&self, tree: &PropertyTree) -> Vec<(ShapeId, Shape)> {
        let mut shapes: Vec<_> = tree
            .chain(self.last_prop)
            .map(|(sid, s)| (sid, s.clone()))
            .collect();
        shapes.reverse();
        shapes
    }

    /// Script getter and setter objects along the chain.
    pub fn accessor_objects(&self, tree: &PropertyTree) -> Vec<crate::object::ObjectRef> {
        let mut out = Vec::new();
        for (_, shape) in tree.chain(self.last_prop) {
            out.extend(shape.getter.as_function());
            out.extend(shape.setter.as_function());
        }
        out
    }

    /// Add `shape`, or replace the existing property with the same id.
    ///
    /// Non-shared properties without a slot get one; a replaced property
    /// keeps its slot. Returns the shape now describing the property.
    pub fn put_property(
        &mut self,
        tree: &mut PropertyTree,
        slots: &mut Slots,
        growth: &SlotGrowth,
        mut shape: Shape,
    ) -> Result<ShapeId> {
        if shape.attrs.contains(Attrs::SHARED) {
            shape.slot = None;
        }
        let existing = self.lookup(tree, &shape.id);
        let Some(old_id) = existing else {
            let mut fresh_slot = None;
            if !shape.attrs.contains(Attrs::SHARED) && shape.slot.is_none() {
                let slot = self.alloc_slot(slots, growth)?;
                shape.slot = Some(slot);
                fresh_slot = Some(slot);
            }
            let id = shape.id.clone();
            let kid = match tree.get_child(self.last_prop, shape) {
                Ok(kid) => kid,
                Err(e) => {
                    if let Some(slot) = fresh_slot {
                        self.free_slot(slots, slot);
                    }
                    return Err(e);
                }
            };
            self.set_last_prop(tree, kid);
            self.entries += 1;
            match &mut self.table {
                Some(table) => {
                    table.insert(id, kid);
                }
                None => self.maybe_hash(tree),
            }
            return Ok(kid);
        };

        let old = tree
            .get(old_id)
            .cloned()
            .ok_or_else(|| Error::internal("scope references a freed shape"))?;
        if !shape.attrs.contains(Attrs::SHARED) && shape.slot.is_none() {
            shape.slot = match old.slot {
                Some(slot) => Some(slot),
                None => Some(self.alloc_slot(slots, growth)?),
            };
        }
        if shape == old {
            return Ok(old_id);
        }
        let freed = old.slot.filter(|s| shape.slot != Some(*s));
        let new_id = self.replace(tree, old_id, Some(shape))?;
        if let Some(slot) = freed {
            self.free_slot(slots, slot);
        }
        Ok(new_id)
    }

    /// Change attributes and accessors of an existing property. Bits in
    /// `mask` are kept from the old attributes.
    #[allow(clippy::too_many_arguments)]
    pub fn change_property(
        &mut self,
        tree: &mut PropertyTree,
        slots: &mut Slots,
        growth: &SlotGrowth,
        shape_id: ShapeId,
        attrs: Attrs,
        mask: Attrs,
        getter: PropertyOp,
        setter: PropertyOp,
    ) -> Result<ShapeId> {
        let old = tree
            .get(shape_id)
            .cloned()
            .ok_or_else(|| Error::internal("changing a freed shape"))?;
        let attrs = attrs | (old.attrs & mask);
        let slot = if attrs.contains(Attrs::SHARED) {
            None
        } else {
            old.slot
        };
        self.put_property(
            tree,
            slots,
            growth,
            Shape {
                getter,
                setter,
                attrs,
                slot,
                ..old
            },
        )
    }

    /// Remove `id`. Returns the removed shape.
    pub fn remove_property(
        &mut self,
        tree: &mut PropertyTree,
        slots: &mut Slots,
        id: &PropertyId,
    ) -> Result<Option<Shape>> {
        let Some(old_id) = self.lookup(tree, id) else {
            return Ok(None);
        };
        let old = tree
            .get(old_id)
            .cloned()
            .ok_or_else(|| Error::internal("scope references a freed shape"))?;
        if old_id == self.last_prop {
            let parent = tree.parent(old_id).unwrap_or(ShapeId::EMPTY);
            self.set_last_prop(tree, parent);
            if let Some(table) = &mut self.table {
                table.remove(id);
            }
        } else {
            self.replace(tree, old_id, None)?;
        }
        self.entries -= 1;
        if let Some(slot) = old.slot {
            self.free_slot(slots, slot);
        }
        Ok(Some(old))
    }

    /// Drop every property. Slots from `reserved` on are reset.
    pub fn clear(&mut self, tree: &mut PropertyTree, slots: &mut Slots, reserved: u32) {
        self.set_last_prop(tree, ShapeId::EMPTY);
        self.entries = 0;
        self.table = None;
        self.freeslot = reserved;
        slots.clear_from(reserved as usize);
    }

    /// Release the terminal shape. Called when the owner dies.
    pub(crate) fn release_shapes(&mut self, tree: &mut PropertyTree) {
        self.set_last_prop(tree, ShapeId::EMPTY);
    }

    /// The empty scope handed to fresh objects of `class` using this
    /// scope's owner as their prototype.
    pub(crate) fn empty_scope_for(
        &mut self,
        class: ClassRef,
        make: impl FnOnce() -> Arc<EmptyScope>,
    ) -> Arc<EmptyScope> {
        if let Some(es) = self.cached_empty_scope(class) {
            return es.clone();
        }
        let es = make();
        self.empty_scopes.push(es.clone());
        es
    }

    /// The cached empty scope for instances of `class`, if any.
    pub fn cached_empty_scope(&self, class: ClassRef) -> Option<&Arc<EmptyScope>> {
        self.empty_scopes.iter().find(|es| same_class(es.class, class))
    }

    fn alloc_slot(&mut self, slots: &mut Slots, growth: &SlotGrowth) -> Result<u32> {
        let slot = self.freeslot;
        if slot as usize >= slots.num_slots() {
            slots.grow_slots(slot as usize + 1, growth)?;
        }
        self.freeslot += 1;
        Ok(slot)
    }

    fn free_slot(&mut self, slots: &mut Slots, slot: u32) {
        slots.set(slot as usize, Value::Undefined);
        if slot + 1 == self.freeslot {
            self.freeslot -= 1;
        }
    }

    fn set_last_prop(&mut self, tree: &mut PropertyTree, id: ShapeId) {
        tree.hold(id);
        tree.release(self.last_prop);
        self.last_prop = id;
    }

    /// Rebuild the chain from `target` forward, substituting `replacement`
    /// for it or dropping it. Later properties keep their order and slots.
    /// Returns the node for the replacement, or the new terminal.
    fn replace(
        &mut self,
        tree: &mut PropertyTree,
        target: ShapeId,
        replacement: Option<Shape>,
    ) -> Result<ShapeId> {
        let mut suffix = Vec::new();
        let mut cur = self.last_prop;
        while cur != target {
            let shape = tree
                .get(cur)
                .cloned()
                .ok_or_else(|| Error::internal("broken shape chain"))?;
            suffix.push(shape);
            cur = tree
                .parent(cur)
                .ok_or_else(|| Error::internal("shape not on scope chain"))?;
        }
        let mut base = tree.parent(target).unwrap_or(ShapeId::EMPTY);
        if let Some(shape) = replacement {
            base = tree.get_child(base, shape)?;
        }
        let replaced = base;
        for shape in suffix.into_iter().rev() {
            base = tree.get_child(base, shape)?;
        }
        self.set_last_prop(tree, base);
        self.rehash(tree);
        Ok(if replaced.is_empty() { base } else { replaced })
    }

    fn maybe_hash(&mut self, tree: &PropertyTree) {
        if self.table.is_none() && self.entries >= tree.hash_threshold() {
            self.rehash(tree);
        }
    }

    fn rehash(&mut self, tree: &PropertyTree) {
        if self.table.is_none() && self.entries < tree.hash_threshold() {
            return;
        }
        let mut table = FxHashMap::default();
        for (sid, shape) in tree.chain(self.last_prop) {
            table.entry(shape.id.clone()).or_insert(sid);
        }
        self.table = Some(table);
    }
}
