// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Scope Chain Integration Tests
//!
//! Name resolution through with objects, lexical blocks and the global
//! object, and what happens to them when frames unwind.

use spacey_macros::assert_matches;
use spacey_object::{BlockState, Context, Error, OBJECT_CLASS, ObjectRef, PropertyId, Runtime, RuntimeOptions, Value};

fn proto_block(cx: &mut Context, depth: u32, names: &[&str]) -> ObjectRef {
    let block = cx.new_block_object(depth).unwrap();
    for (i, name) in names.iter().enumerate() {
        cx.define_block_variable(block, &PropertyId::atom(name), i as u16).unwrap();
    }
    block
}

#[test]
fn test_with_assignment_targets() {
    let rt = Runtime::new(RuntimeOptions::default());
    let mut cx = rt.new_context();
    let global = cx.global();
    let target = cx.new_object(&OBJECT_CLASS, None, None).unwrap();
    cx.set_property(target, &"x".into(), 1.into()).unwrap();

    cx.push_frame(0, None);
    let with = cx.new_with_object(target, Some(global), 0).unwrap();

    assert_eq!(cx.find_identifier_base(with, &"x".into()).unwrap(), with);
    cx.set_name(with, &"x".into(), 2.into()).unwrap();
    assert_eq!(cx.get_property(target, &"x".into()).unwrap(), Value::Number(2.0));

    // unbound names land on the outermost scope object
    assert_eq!(cx.find_identifier_base(with, &"fresh".into()).unwrap(), global);
    cx.set_name(with, &"fresh".into(), 3.into()).unwrap();
    assert_eq!(cx.get_property(global, &"fresh".into()).unwrap(), Value::Number(3.0));
    assert!(!cx.has_own_property(target, &"fresh".into()).unwrap());
}

#[test]
fn test_with_this_is_the_target() {
    let rt = Runtime::new(RuntimeOptions::default());
    let mut cx = rt.new_context();
    let target = cx.new_object(&OBJECT_CLASS, None, None).unwrap();
    let with = cx.new_with_object(target, None, 3).unwrap();
    assert_eq!(cx.this_object(with).unwrap(), target);
    assert_eq!(cx.with_depth_of(with).unwrap(), 3);
    assert_eq!(cx.type_of(&with.into()).unwrap(), "object");
}

#[test]
fn test_with_released_when_frame_pops() {
    let rt = Runtime::new(RuntimeOptions::default());
    let mut cx = rt.new_context();
    let target = cx.new_object(&OBJECT_CLASS, None, None).unwrap();
    let frame = cx.push_frame(0, None);
    let with = cx.new_with_object(target, None, 0).unwrap();
    assert_eq!(cx.get_private(with).unwrap().as_frame(), Some(frame));
    cx.pop_frame(true).unwrap();
    assert!(cx.get_private(with).unwrap().is_none());
    assert!(cx.current_frame().is_none());
}

#[test]
fn test_nested_blocks_resolve_outward() {
    let rt = Runtime::new(RuntimeOptions::default());
    let mut cx = rt.new_context();
    let outer_proto = proto_block(&mut cx, 0, &["a"]);
    let inner_proto = proto_block(&mut cx, 1, &["b"]);
    let frame = cx.push_frame(2, None);

    let outer = cx.enter_block(outer_proto).unwrap();
    let inner = cx.enter_block(inner_proto).unwrap();
    assert_eq!(cx.frame_scope_chain(frame).unwrap(), inner);
    assert_eq!(cx.get_parent(inner).unwrap(), Some(outer));

    cx.set_frame_slot(frame, 0, "outer".into()).unwrap();
    cx.set_name(inner, &"b".into(), "inner".into()).unwrap();
    assert_eq!(cx.get_name(inner, &"a".into()).unwrap(), Value::string("outer"));
    assert_eq!(cx.frame_slot(frame, 1).unwrap(), Value::string("inner"));
    assert_matches!(cx.get_name(inner, &"missing".into()), Err(Error::Reference(_)));

    cx.leave_block().unwrap();
    assert_eq!(cx.frame_scope_chain(frame).unwrap(), outer);
    assert_eq!(cx.block_state(inner).unwrap(), BlockState::ClonedDetached);
    assert_eq!(cx.get_property(inner, &"b".into()).unwrap(), Value::string("inner"));
}

#[test]
fn test_abrupt_unwind_detaches_every_block() {
    let rt = Runtime::new(RuntimeOptions::default());
    let mut cx = rt.new_context();
    let outer_proto = proto_block(&mut cx, 0, &["a"]);
    let inner_proto = proto_block(&mut cx, 1, &["b"]);
    let frame = cx.push_frame(2, None);
    let outer = cx.enter_block(outer_proto).unwrap();
    let inner = cx.enter_block(inner_proto).unwrap();
    cx.set_frame_slot(frame, 0, 10.into()).unwrap();
    cx.set_frame_slot(frame, 1, 20.into()).unwrap();

    cx.pop_frame(false).unwrap();
    for block in [outer, inner] {
        assert_eq!(cx.block_state(block).unwrap(), BlockState::ClonedDetached);
    }
    assert_eq!(cx.get_name(inner, &"a".into()).unwrap(), Value::Number(10.0));
    assert_eq!(cx.get_name(inner, &"b".into()).unwrap(), Value::Number(20.0));
    assert!(cx.frame_slot(frame, 0).is_err());
}

#[test]
fn test_with_inside_block() {
    let rt = Runtime::new(RuntimeOptions::default());
    let mut cx = rt.new_context();
    let proto = proto_block(&mut cx, 0, &["shadowed"]);
    let frame = cx.push_frame(1, None);
    let block = cx.enter_block(proto).unwrap();
    cx.set_frame_slot(frame, 0, "block".into()).unwrap();

    let target = cx.new_object(&OBJECT_CLASS, None, None).unwrap();
    cx.set_property(target, &"shadowed".into(), "with".into()).unwrap();
    let with = cx.new_with_object(target, Some(block), 1).unwrap();

    assert_eq!(cx.get_name(with, &"shadowed".into()).unwrap(), Value::string("with"));
    cx.delete_property(with, &"shadowed".into()).unwrap();
    assert_eq!(cx.get_name(with, &"shadowed".into()).unwrap(), Value::string("block"));
}
