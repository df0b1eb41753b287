// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Mark-and-sweep collection over a context's heap.
//!
//! Marking starts from the global object, explicit roots and every stack
//! frame, then follows [`Context::trace_object`]. Between mark and sweep,
//! owned scopes that use at most half of their slots give the rest back.

mod heap;

pub use heap::Heap;

use crate::context::Context;
use crate::error::Result;
use crate::object::ObjectRef;
use crate::scope::ScopeRef;
use crate::value::Value;
use heap::Cell;
use tracing::debug;

/// Receives the outgoing edges of an object.
pub trait Tracer {
    /// Report a reachable object.
    fn trace_object(&mut self, obj: ObjectRef);

    /// Report a value, which matters only if it is an object.
    fn trace_value(&mut self, value: &Value) {
        if let Value::Object(obj) = value {
            self.trace_object(*obj);
        }
    }
}

/// Outcome of one collection.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct GcStats {
    /// Objects found reachable.
    pub marked: usize,
    /// Objects freed.
    pub swept: usize,
    /// Objects whose slot storage was shrunk.
    pub shrunk: usize,
    /// Objects alive afterwards.
    pub live: usize,
}

struct Marker {
    pending: Vec<ObjectRef>,
}

impl Tracer for Marker {
    fn trace_object(&mut self, obj: ObjectRef) {
        self.pending.push(obj);
    }
}

impl Context {
    /// Report every object `obj` refers to: its prototype and parent,
    /// whatever its class holds, accessor functions on its own shapes, and
    /// its slots up to the scope's `freeslot`.
    pub fn trace_object(&self, obj: ObjectRef, tracer: &mut dyn Tracer) -> Result<()> {
        let o = self.heap.get(obj)?;
        if let Some(proto) = o.proto {
            tracer.trace_object(proto);
        }
        if let Some(parent) = o.parent {
            tracer.trace_object(parent);
        }
        o.class.trace(o, tracer);
        if let ScopeRef::Own(scope) = &o.scope {
            let tree = self.rt.tree();
            for f in scope.accessor_objects(&tree) {
                tracer.trace_object(f);
            }
        }
        for value in o.slots.iter(o.trace_slot_count()) {
            tracer.trace_value(value);
        }
        Ok(())
    }

    /// Keep `obj` alive across collections. Roots nest.
    pub fn add_root(&mut self, obj: ObjectRef) {
        *self.roots.entry(obj).or_insert(0) += 1;
    }

    /// Drop one root of `obj`. Returns false if it was not rooted.
    pub fn remove_root(&mut self, obj: ObjectRef) -> bool {
        match self.roots.get_mut(&obj) {
            Some(n) if *n > 1 => {
                *n -= 1;
                true
            }
            Some(_) => {
                self.roots.remove(&obj);
                true
            }
            None => false,
        }
    }

    fn root_set(&self) -> Vec<ObjectRef> {
        let mut roots = vec![self.global()];
        roots.extend(self.roots.keys().copied());
        for frame in &self.frames {
            roots.extend(frame.objects());
        }
        roots
    }

    /// Collect unreachable objects.
    pub fn gc(&mut self) -> Result<GcStats> {
        let mut marker = Marker {
            pending: self.root_set(),
        };
        let mut marked = 0;
        while let Some(obj) = marker.pending.pop() {
            if !self.heap.mark(obj) {
                continue;
            }
            marked += 1;
            self.trace_object(obj, &mut marker)?;
        }

        let shrunk = if self.rt.options().shrink_slots_on_gc {
            shrink_cells(self.heap.cells_mut())
        } else {
            0
        };

        let dead = self.heap.unmarked();
        let swept = dead.len();
        {
            let mut tree = self.rt.tree_mut();
            for r in dead {
                if let Some(mut obj) = self.heap.free(r) {
                    let class = obj.class;
                    class.finalize(&mut obj);
                    if let Some(scope) = obj.scope.as_own_mut() {
                        scope.release_shapes(&mut tree);
                    }
                }
            }
        }

        self.cache.purge();
        self.heap.clear_marks();
        self.clear_gc_poke();
        let stats = GcStats {
            marked,
            swept,
            shrunk,
            live: self.heap.live(),
        };
        debug!(marked, swept, shrunk, live = stats.live, "gc finished");
        Ok(stats)
    }
}

fn shrink_cell(cell: &mut Cell) -> usize {
    if !cell.header.marked {
        return 0;
    }
    let Some(obj) = cell.object.as_mut() else {
        return 0;
    };
    let ScopeRef::Own(scope) = &obj.scope else {
        return 0;
    };
    let freeslot = (scope.freeslot() as usize).max(obj.reserved as usize);
    if obj.slots.has_dynamic() && freeslot * 2 <= obj.slots.num_slots() {
        obj.slots.shrink_slots(freeslot);
        1
    } else {
        0
    }
}

#[cfg(feature = "parallel")]
fn shrink_cells(cells: &mut [Cell]) -> usize {
    use rayon::prelude::*;
    cells.par_iter_mut().map(shrink_cell).sum()
}

#[cfg(not(feature = "parallel"))]
fn shrink_cells(cells: &mut [Cell]) -> usize {
    cells.iter_mut().map(shrink_cell).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class::{JsClass, OBJECT_CLASS};
    use crate::config::RuntimeOptions;
    use crate::id::PropertyId;
    use crate::object::JsObject;
    use crate::runtime::Runtime;
    use crate::shape::{Attrs, PropertyOp};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_unreachable_objects_are_swept() {
        let rt = Runtime::new(RuntimeOptions::default());
        let mut cx = rt.new_context();
        cx.init_standard_classes().unwrap();
        let baseline = cx.gc().unwrap().live;
        let garbage = cx.new_object(&OBJECT_CLASS, None, None).unwrap();
        let kept = cx.new_object(&OBJECT_CLASS, None, None).unwrap();
        cx.add_root(kept);
        let stats = cx.gc().unwrap();
        assert_eq!(stats.swept, 1);
        assert_eq!(stats.live, baseline + 1);
        assert!(cx.object(garbage).is_err());
        assert!(cx.object(kept).is_ok());
    }

    #[test]
    fn test_slots_and_accessors_keep_objects_alive() {
        let rt = Runtime::new(RuntimeOptions::default());
        let mut cx = rt.new_context();
        let holder = cx.new_object(&OBJECT_CLASS, None, None).unwrap();
        cx.add_root(holder);
        let child = cx.new_object(&OBJECT_CLASS, None, None).unwrap();
        cx.set_property(holder, &"child".into(), child.into()).unwrap();
        let getter = cx.new_object(&OBJECT_CLASS, None, None).unwrap();
        cx.define_property(
            holder,
            &"g".into(),
            Value::Undefined,
            PropertyOp::Function(getter),
            PropertyOp::Stub,
            Attrs::GETTER,
        )
        .unwrap();
        cx.gc().unwrap();
        assert!(cx.object(child).is_ok());
        assert!(cx.object(getter).is_ok());
    }

    #[test]
    fn test_roots_nest() {
        let rt = Runtime::new(RuntimeOptions::default());
        let mut cx = rt.new_context();
        let obj = cx.new_object(&OBJECT_CLASS, None, None).unwrap();
        cx.add_root(obj);
        cx.add_root(obj);
        assert!(cx.remove_root(obj));
        cx.gc().unwrap();
        assert!(cx.object(obj).is_ok());
        assert!(cx.remove_root(obj));
        assert!(!cx.remove_root(obj));
        cx.gc().unwrap();
        assert!(cx.object(obj).is_err());
    }

    #[test]
    fn test_frames_are_roots() {
        let rt = Runtime::new(RuntimeOptions::default());
        let mut cx = rt.new_context();
        let obj = cx.new_object(&OBJECT_CLASS, None, None).unwrap();
        let frame = cx.push_frame(1, None);
        cx.set_frame_slot(frame, 0, obj.into()).unwrap();
        cx.gc().unwrap();
        assert!(cx.object(obj).is_ok());
        cx.pop_frame(true).unwrap();
        cx.gc().unwrap();
        assert!(cx.object(obj).is_err());
    }

    #[test]
    fn test_gc_shrinks_sparse_slots() {
        let rt = Runtime::new(RuntimeOptions::default());
        let mut cx = rt.new_context();
        let obj = cx.new_object(&OBJECT_CLASS, None, None).unwrap();
        cx.add_root(obj);
        let ids: Vec<PropertyId> = (0..20).map(|i| PropertyId::atom(&format!("p{}", i))).collect();
        for id in &ids {
            cx.set_property(obj, id, 1.into()).unwrap();
        }
        for id in ids[2..].iter().rev() {
            cx.delete_property(obj, id).unwrap();
        }
        assert!(cx.object(obj).unwrap().slots().has_dynamic());
        let stats = cx.gc().unwrap();
        assert!(stats.shrunk >= 1);
        assert!(!cx.object(obj).unwrap().slots().has_dynamic());
        assert_eq!(cx.get_property(obj, &ids[1]).unwrap(), Value::Number(1.0));
    }

    #[test]
    fn test_released_shapes_are_freed() {
        let rt = Runtime::new(RuntimeOptions::default());
        let mut cx = rt.new_context();
        let obj = cx.new_object(&OBJECT_CLASS, None, None).unwrap();
        cx.set_property(obj, &"unique_to_this_test".into(), 1.into()).unwrap();
        let freed_before = rt.shape_stats().freed;
        cx.gc().unwrap();
        assert!(rt.shape_stats().freed > freed_before);
    }

    static FINALIZED: AtomicUsize = AtomicUsize::new(0);

    struct Finalizing;

    impl JsClass for Finalizing {
        fn name(&self) -> &'static str {
            "Finalizing"
        }

        fn finalize(&self, _obj: &mut JsObject) {
            FINALIZED.fetch_add(1, Ordering::SeqCst);
        }
    }

    static FINALIZING: Finalizing = Finalizing;

    #[test]
    fn test_finalize_hook_runs() {
        let rt = Runtime::new(RuntimeOptions::default());
        let mut cx = rt.new_context();
        cx.new_object(&FINALIZING, None, None).unwrap();
        let before = FINALIZED.load(Ordering::SeqCst);
        cx.gc().unwrap();
        assert_eq!(FINALIZED.load(Ordering::SeqCst), before + 1);
    }
}
