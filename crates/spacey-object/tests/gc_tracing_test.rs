// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! GC Tracing Integration Tests
//!
//! Exact tracing of object edges and what survives a collection.

use spacey_object::object::JsObject;
use spacey_object::{
    Attrs, ClassFlags, JsClass, OBJECT_CLASS, ObjectRef, PrivateData, PropertyOp, Runtime, RuntimeOptions, Tracer,
    Value,
};
use std::sync::Arc;

#[derive(Default)]
struct EdgeCollector {
    edges: Vec<ObjectRef>,
}

impl Tracer for EdgeCollector {
    fn trace_object(&mut self, obj: ObjectRef) {
        self.edges.push(obj);
    }
}

/// Holds one object in its private data and traces it.
struct Holder;

static HOLDER_CLASS: Holder = Holder;

impl JsClass for Holder {
    fn name(&self) -> &'static str {
        "Holder"
    }

    fn flags(&self) -> ClassFlags {
        ClassFlags::HAS_PRIVATE
    }

    fn trace(&self, obj: &JsObject, tracer: &mut dyn Tracer) {
        if let PrivateData::Opaque(data) = obj.private() {
            if let Some(held) = data.downcast_ref::<ObjectRef>() {
                tracer.trace_object(*held);
            }
        }
    }
}

#[test]
fn test_trace_reports_every_edge() {
    let rt = Runtime::new(RuntimeOptions::default());
    let mut cx = rt.new_context();
    let proto = cx.new_object(&OBJECT_CLASS, None, None).unwrap();
    let parent = cx.new_object(&OBJECT_CLASS, None, None).unwrap();
    let obj = cx.new_object(&OBJECT_CLASS, Some(proto), Some(parent)).unwrap();
    let value = cx.new_object(&OBJECT_CLASS, None, None).unwrap();
    let getter = cx.new_object(&OBJECT_CLASS, None, None).unwrap();
    cx.set_property(obj, &"v".into(), value.into()).unwrap();
    cx.define_property(
        obj,
        &"g".into(),
        Value::Undefined,
        PropertyOp::Function(getter),
        PropertyOp::Stub,
        Attrs::GETTER,
    )
    .unwrap();

    let mut collector = EdgeCollector::default();
    cx.trace_object(obj, &mut collector).unwrap();
    for expected in [proto, parent, value, getter] {
        assert!(collector.edges.contains(&expected), "missing edge {:?}", expected);
    }
}

#[test]
fn test_class_trace_hook_keeps_private_referent() {
    let rt = Runtime::new(RuntimeOptions::default());
    let mut cx = rt.new_context();
    let held = cx.new_object(&OBJECT_CLASS, None, None).unwrap();
    let holder = cx.new_object(&HOLDER_CLASS, None, None).unwrap();
    cx.set_private(holder, PrivateData::Opaque(Arc::new(held))).unwrap();
    cx.add_root(holder);

    cx.gc().unwrap();
    assert!(cx.object(held).is_ok());

    cx.remove_root(holder);
    cx.gc().unwrap();
    assert!(cx.object(holder).is_err());
    assert!(cx.object(held).is_err());
}

#[test]
fn test_prototype_chain_survives_through_child() {
    let rt = Runtime::new(RuntimeOptions::default());
    let mut cx = rt.new_context();
    let grand = cx.new_object(&OBJECT_CLASS, None, None).unwrap();
    cx.set_property(grand, &"deep".into(), true.into()).unwrap();
    let proto = cx.new_object(&OBJECT_CLASS, Some(grand), None).unwrap();
    let child = cx.new_object(&OBJECT_CLASS, Some(proto), None).unwrap();
    cx.add_root(child);

    cx.gc().unwrap();
    assert_eq!(cx.get_property(child, &"deep".into()).unwrap(), Value::Boolean(true));
}

#[test]
fn test_scope_objects_on_frames_survive() {
    let rt = Runtime::new(RuntimeOptions::default());
    let mut cx = rt.new_context();
    let proto_block = cx.new_block_object(0).unwrap();
    cx.define_block_variable(proto_block, &"x".into(), 0).unwrap();
    let target = cx.new_object(&OBJECT_CLASS, None, None).unwrap();

    let frame = cx.push_frame(1, None);
    let block = cx.enter_block(proto_block).unwrap();
    let with = cx.new_with_object(target, Some(block), 1).unwrap();
    let value = cx.new_object(&OBJECT_CLASS, None, None).unwrap();
    cx.set_frame_slot(frame, 0, value.into()).unwrap();

    cx.gc().unwrap();
    for obj in [proto_block, block, with, target, value] {
        assert!(cx.object(obj).is_ok(), "{:?} was swept", obj);
    }

    cx.pop_frame(true).unwrap();
    cx.gc().unwrap();
    assert!(cx.object(with).is_err());
    assert!(cx.object(block).is_err());
}

#[test]
fn test_deleting_object_value_pokes_gc() {
    let rt = Runtime::new(RuntimeOptions::default());
    let mut cx = rt.new_context();
    let obj = cx.new_object(&OBJECT_CLASS, None, None).unwrap();
    cx.add_root(obj);
    cx.set_property(obj, &"n".into(), 1.into()).unwrap();
    cx.delete_property(obj, &"n".into()).unwrap();
    assert!(!cx.gc_poked());

    let child = cx.new_object(&OBJECT_CLASS, None, None).unwrap();
    cx.set_property(obj, &"child".into(), child.into()).unwrap();
    cx.delete_property(obj, &"child".into()).unwrap();
    assert!(cx.gc_poked());
    cx.gc().unwrap();
    assert!(!cx.gc_poked());
    assert!(cx.object(child).is_err());
}

#[test]
fn test_shrinking_can_be_disabled() {
    let options = RuntimeOptions {
        shrink_slots_on_gc: false,
        ..Default::default()
    };
    let rt = Runtime::new(options);
    let mut cx = rt.new_context();
    let obj = cx.new_object(&OBJECT_CLASS, None, None).unwrap();
    cx.add_root(obj);
    let ids: Vec<_> = (0..10).map(|i| spacey_object::PropertyId::atom(&format!("p{}", i))).collect();
    for id in &ids {
        cx.set_property(obj, id, 1.into()).unwrap();
    }
    for id in ids.iter().rev() {
        cx.delete_property(obj, id).unwrap();
    }
    let stats = cx.gc().unwrap();
    assert_eq!(stats.shrunk, 0);
    assert!(cx.object(obj).unwrap().slots().has_dynamic());
}
