// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Property lookup along the prototype chain.

use crate::class::{ObjectKind, Resolution, ResolveFlags};
use crate::context::{Context, ResolvingKey, ResolvingKind};
use crate::error::Result;
use crate::id::PropertyId;
use crate::object::ObjectRef;
use crate::shape::{Shape, ShapeId};

/// A property found by lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyRef {
    /// Object whose scope holds the property.
    pub holder: ObjectRef,
    /// Shape node describing it.
    pub shape_id: ShapeId,
    /// Copy of the shape.
    pub shape: Shape,
    /// Number of prototype links followed from the start object.
    pub proto_index: u32,
}

impl PropertyRef {
    /// True if found on the start object itself.
    pub fn is_own(&self) -> bool {
        self.proto_index == 0
    }
}

enum ResolveOutcome {
    NotFound,
    Found(ObjectRef),
    Recursion,
}

impl Context {
    /// Find `id` on `obj` or its prototypes.
    pub fn lookup_property(&mut self, obj: ObjectRef, id: &PropertyId) -> Result<Option<PropertyRef>> {
        self.lookup_property_with_flags(obj, id, ResolveFlags::empty())
    }

    /// Find `id` on `obj` or its prototypes, passing `flags` to resolve
    /// hooks. A resolve hook re-entered for the same object and id makes
    /// the whole lookup report not found.
    pub fn lookup_property_with_flags(
        &mut self,
        obj: ObjectRef,
        id: &PropertyId,
        flags: ResolveFlags,
    ) -> Result<Option<PropertyRef>> {
        let mut cur = obj;
        let mut proto_index = 0;
        loop {
            let o = self.heap.get(cur)?;
            let class = o.class;
            let proto = o.proto;

            // with objects have no properties of their own
            if class.kind() == ObjectKind::With {
                match proto {
                    Some(target) => {
                        cur = target;
                        continue;
                    }
                    None => return Ok(None),
                }
            }

            if let Some((shape_id, shape)) = self.lookup_own_shape(cur, id)? {
                return Ok(Some(PropertyRef {
                    holder: cur,
                    shape_id,
                    shape,
                    proto_index,
                }));
            }

            if class.has_resolve_hook() {
                match self.call_resolve(cur, id, flags, obj)? {
                    ResolveOutcome::Recursion => return Ok(None),
                    ResolveOutcome::Found(holder) => {
                        if let Some((shape_id, shape)) = self.lookup_own_shape(holder, id)? {
                            let proto_index = if holder == cur { proto_index } else { proto_index + 1 };
                            return Ok(Some(PropertyRef {
                                holder,
                                shape_id,
                                shape,
                                proto_index,
                            }));
                        }
                    }
                    ResolveOutcome::NotFound => {}
                }
            }

            match self.heap.get(cur)?.proto {
                Some(p) => {
                    cur = p;
                    proto_index += 1;
                }
                None => return Ok(None),
            }
        }
    }

    /// Look `id` up in the scope of `obj` only, without resolve hooks.
    pub fn lookup_own_shape(&mut self, obj: ObjectRef, id: &PropertyId) -> Result<Option<(ShapeId, Shape)>> {
        let o = self.heap.get(obj)?;
        let last = o.scope.last_prop();
        if last.is_empty() {
            return Ok(None);
        }
        let tree = self.rt.tree();
        if let Some(sid) = self.cache.get(last, id) {
            if let Some(shape) = tree.get(sid) {
                return Ok(Some((sid, shape.clone())));
            }
        }
        let Some(sid) = o.scope.lookup(&tree, id) else {
            return Ok(None);
        };
        let Some(shape) = tree.get(sid).cloned() else {
            return Ok(None);
        };
        self.cache.insert(last, id.clone(), sid);
        Ok(Some((sid, shape)))
    }

    /// True if the scope of `obj` still maps `id` to `shape_id`.
    pub(crate) fn scope_has(&mut self, obj: ObjectRef, id: &PropertyId, shape_id: ShapeId) -> Result<bool> {
        Ok(matches!(self.lookup_own_shape(obj, id)?, Some((sid, _)) if sid == shape_id))
    }

    fn call_resolve(
        &mut self,
        obj: ObjectRef,
        id: &PropertyId,
        flags: ResolveFlags,
        start: ObjectRef,
    ) -> Result<ResolveOutcome> {
        let key = ResolvingKey {
            obj,
            id: id.clone(),
            kind: ResolvingKind::Lookup,
        };
        if !self.start_resolving(key.clone()) {
            return Ok(ResolveOutcome::Recursion);
        }
        let class = self.class_of(obj)?;
        let result = self.with_depth(|cx| class.resolve(cx, obj, id, flags, start));
        self.stop_resolving(&key);
        Ok(match result? {
            Resolution::NotFound => ResolveOutcome::NotFound,
            Resolution::Defined => ResolveOutcome::Found(obj),
            Resolution::DefinedOn(holder) => ResolveOutcome::Found(holder),
        })
    }
}
