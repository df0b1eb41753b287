// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Execution contexts.
//!
//! A [`Context`] is the single-threaded half of the object model: it owns
//! the object heap, the stack frames, the resolving set and the property
//! cache. Contexts of one [`Runtime`] share the property tree and may run
//! on different threads; objects never move between contexts.

use crate::builtins::global::GLOBAL_CLASS;
use crate::cache::{CacheStats, PropertyCache};
use crate::class::{ClassRef, ObjectKind};
use crate::config::RuntimeOptions;
use crate::error::{Error, Result};
use crate::gc::Heap;
use crate::id::PropertyId;
use crate::object::{JsObject, ObjectFlags, ObjectRef, PrivateData};
use crate::runtime::Runtime;
use crate::scope::{Scope, ScopeId, ScopeRef};
use crate::scope_chain::StackFrame;
use crate::shape::ShapeId;
use crate::value::Value;
use rustc_hash::{FxHashMap, FxHashSet};
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// What an in-flight resolution is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum ResolvingKind {
    /// A resolve hook call during property lookup.
    Lookup,
    /// Lazy initialisation of a standard class.
    ClassInit,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct ResolvingKey {
    pub(crate) obj: ObjectRef,
    pub(crate) id: PropertyId,
    pub(crate) kind: ResolvingKind,
}

/// Per-thread execution state.
pub struct Context {
    pub(crate) rt: Arc<Runtime>,
    pub(crate) heap: Heap,
    pub(crate) frames: Vec<StackFrame>,
    pub(crate) frame_serial: u32,
    resolving: FxHashSet<ResolvingKey>,
    pub(crate) roots: FxHashMap<ObjectRef, u32>,
    global: ObjectRef,
    pub(crate) cache: PropertyCache,
    depth: u32,
    strict: bool,
    gc_poke: bool,
}

impl Context {
    pub(crate) fn new(rt: Arc<Runtime>) -> Self {
        let cache = PropertyCache::new(rt.options().property_cache_capacity);
        let strict = rt.options().strict;
        let mut heap = Heap::new();
        let class: ClassRef = &GLOBAL_CLASS;
        let scope = Scope::new(rt.next_scope_id(), class.reserved_slots());
        let global = heap.allocate(JsObject::new(
            class,
            None,
            None,
            ScopeRef::Own(Box::new(scope)),
        ));
        debug!(global = ?global, "created context");
        Self {
            cache,
            strict,
            rt,
            heap,
            frames: Vec::new(),
            frame_serial: 0,
            resolving: FxHashSet::default(),
            roots: FxHashMap::default(),
            global,
            depth: 0,
            gc_poke: false,
        }
    }

    /// The runtime this context belongs to.
    pub fn runtime(&self) -> &Arc<Runtime> {
        &self.rt
    }

    /// Runtime options.
    pub fn options(&self) -> &RuntimeOptions {
        self.rt.options()
    }

    /// The global object.
    pub fn global(&self) -> ObjectRef {
        self.global
    }

    /// True if rejected writes raise TypeErrors.
    pub fn is_strict(&self) -> bool {
        self.strict
    }

    /// Switch strict mode.
    pub fn set_strict(&mut self, strict: bool) {
        self.strict = strict;
    }

    /// Resolve a handle.
    pub fn object(&self, obj: ObjectRef) -> Result<&JsObject> {
        self.heap.get(obj)
    }

    pub(crate) fn object_mut(&mut self, obj: ObjectRef) -> Result<&mut JsObject> {
        self.heap.get_mut(obj)
    }

    /// The object heap.
    pub fn heap(&self) -> &Heap {
        &self.heap
    }

    /// Class of `obj`.
    pub fn class_of(&self, obj: ObjectRef) -> Result<ClassRef> {
        Ok(self.heap.get(obj)?.class)
    }

    /// Flavour of `obj`.
    pub fn kind_of(&self, obj: ObjectRef) -> Result<ObjectKind> {
        Ok(self.heap.get(obj)?.class.kind())
    }

    /// Prototype of `obj`.
    pub fn get_proto(&self, obj: ObjectRef) -> Result<Option<ObjectRef>> {
        Ok(self.heap.get(obj)?.proto)
    }

    /// Parent of `obj`.
    pub fn get_parent(&self, obj: ObjectRef) -> Result<Option<ObjectRef>> {
        Ok(self.heap.get(obj)?.parent)
    }

    /// Set the parent of `obj`.
    pub fn set_parent(&mut self, obj: ObjectRef, parent: Option<ObjectRef>) -> Result<()> {
        self.heap.get_mut(obj)?.parent = parent;
        Ok(())
    }

    /// Private data of `obj`.
    pub fn get_private(&self, obj: ObjectRef) -> Result<PrivateData> {
        Ok(self.heap.get(obj)?.private.clone())
    }

    /// Replace the private data of `obj`.
    pub fn set_private(&mut self, obj: ObjectRef, private: PrivateData) -> Result<()> {
        self.heap.get_mut(obj)?.private = private;
        Ok(())
    }

    /// True if `obj` has been used as a prototype.
    pub fn is_delegate(&self, obj: ObjectRef) -> Result<bool> {
        Ok(self.heap.get(obj)?.is_delegate())
    }

    pub(crate) fn mark_delegate(&mut self, obj: ObjectRef) -> Result<()> {
        self.heap.get_mut(obj)?.flags.insert(ObjectFlags::DELEGATE);
        Ok(())
    }

    /// Identity of the scope `obj` currently uses.
    pub fn scope_id(&self, obj: ObjectRef) -> Result<ScopeId> {
        Ok(self.heap.get(obj)?.scope.id())
    }

    /// True if `obj` still shares an empty scope.
    pub fn has_shared_scope(&self, obj: ObjectRef) -> Result<bool> {
        Ok(self.heap.get(obj)?.scope.is_shared())
    }

    /// Terminal shape of `obj`.
    pub fn last_shape(&self, obj: ObjectRef) -> Result<ShapeId> {
        Ok(self.heap.get(obj)?.scope.last_prop())
    }

    /// Read slot `slot` of `obj`.
    pub fn slot(&self, obj: ObjectRef, slot: u32) -> Result<Value> {
        let o = self.heap.get(obj)?;
        if slot as usize >= o.slots.num_slots() {
            return Ok(Value::Undefined);
        }
        Ok(o.slots.get(slot as usize).clone())
    }

    /// Write slot `slot` of `obj`.
    pub fn set_slot(&mut self, obj: ObjectRef, slot: u32, value: Value) -> Result<()> {
        let o = self.heap.get_mut(obj)?;
        if !o.slots.set(slot as usize, value) {
            return Err(Error::internal(format!("slot {} out of range", slot)));
        }
        Ok(())
    }

    /// Property cache counters.
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Record that a value possibly still referenced from a running
    /// frame was dropped, so the next collection should run.
    pub(crate) fn poke_gc(&mut self) {
        self.gc_poke = true;
    }

    /// True if a deletion since the last collection dropped an object
    /// reference.
    pub fn gc_poked(&self) -> bool {
        self.gc_poke
    }

    pub(crate) fn clear_gc_poke(&mut self) {
        self.gc_poke = false;
    }

    /// Enter a resolution. Returns false if `key` is already in flight.
    pub(crate) fn start_resolving(&mut self, key: ResolvingKey) -> bool {
        if self.resolving.contains(&key) {
            trace!(obj = ?key.obj, id = ?key.id, kind = ?key.kind, "suppressed recursive resolve");
            return false;
        }
        self.resolving.insert(key);
        true
    }

    pub(crate) fn stop_resolving(&mut self, key: &ResolvingKey) {
        self.resolving.remove(key);
    }

    /// Run `f` one native level deeper, failing once the configured depth
    /// is exceeded.
    pub(crate) fn with_depth<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        if self.depth >= self.rt.options().max_native_depth {
            warn!(depth = self.depth, "native recursion limit reached");
            return Err(Error::TooMuchRecursion);
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }
}

impl Drop for Context {
    fn drop(&mut self) {
        let mut tree = self.rt.tree_mut();
        for handle in self.heap.handles() {
            if let Ok(obj) = self.heap.get_mut(handle) {
                if let Some(scope) = obj.scope.as_own_mut() {
                    scope.release_shapes(&mut tree);
                }
            }
        }
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("global", &self.global)
            .field("objects", &self.heap.live())
            .field("frames", &self.frames.len())
            .field("strict", &self.strict)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spacey_macros::assert_matches;

    #[test]
    fn test_context_has_global() {
        let rt = Runtime::new(RuntimeOptions::default());
        let cx = rt.new_context();
        let global = cx.global();
        assert_eq!(cx.kind_of(global).unwrap(), ObjectKind::Global);
        assert!(!cx.has_shared_scope(global).unwrap());
        assert_eq!(cx.heap().live(), 1);
    }

    #[test]
    fn test_resolving_set() {
        let rt = Runtime::new(RuntimeOptions::default());
        let mut cx = rt.new_context();
        let key = ResolvingKey {
            obj: cx.global(),
            id: PropertyId::from("x"),
            kind: ResolvingKind::Lookup,
        };
        assert!(cx.start_resolving(key.clone()));
        assert!(!cx.start_resolving(key.clone()));
        let other = ResolvingKey {
            kind: ResolvingKind::ClassInit,
            ..key.clone()
        };
        assert!(cx.start_resolving(other));
        cx.stop_resolving(&key);
        assert!(cx.start_resolving(key));
    }

    #[test]
    fn test_depth_limit() {
        let options = RuntimeOptions {
            max_native_depth: 2,
            ..Default::default()
        };
        let rt = Runtime::new(options);
        let mut cx = rt.new_context();
        let result = cx.with_depth(|cx| cx.with_depth(|cx| cx.with_depth(|_| Ok(()))));
        assert_matches!(result, Err(Error::TooMuchRecursion));
        assert!(cx.with_depth(|_| Ok(())).is_ok());
    }
}
