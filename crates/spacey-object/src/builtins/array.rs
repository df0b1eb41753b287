// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Array class.
//!
//! The length lives in a reserved slot. `length` itself is a shared
//! permanent accessor on `Array.prototype`, so every array reports it as
//! an own property without carrying a shape for it.

use super::object::to_display_string;
use crate::class::{JsClass, ObjectKind, ProtoKey};
use crate::construct::{ClassSpec, FunctionSpec};
use crate::context::Context;
use crate::error::{Error, Result, TypeError};
use crate::id::{PropertyId, atoms};
use crate::object::{CallArgs, ObjectFlags, ObjectRef};
use crate::shape::{Attrs, PropertyOp};
use crate::value::Value;

/// Reserved slot holding the length.
pub(crate) const LENGTH_SLOT: u32 = 0;

/// Array class.
pub struct ArrayClass;

/// The array class.
pub static ARRAY_CLASS: ArrayClass = ArrayClass;

impl JsClass for ArrayClass {
    fn name(&self) -> &'static str {
        "Array"
    }

    fn kind(&self) -> ObjectKind {
        ObjectKind::Array
    }

    fn reserved_slots(&self) -> u32 {
        1
    }

    fn proto_key(&self) -> ProtoKey {
        ProtoKey::Array
    }

    fn add_property(&self, cx: &mut Context, obj: ObjectRef, id: &PropertyId, _value: &mut Value) -> Result<()> {
        match id.as_index() {
            Some(index) => ensure_length(cx, obj, index.saturating_add(1)),
            None => Ok(()),
        }
    }
}

const ARRAY_SPEC: ClassSpec = ClassSpec {
    constructor: array_constructor,
    nargs: 1,
    methods: &[
        FunctionSpec::new("push", 1, array_push),
        FunctionSpec::new("pop", 0, array_pop),
        FunctionSpec::new("join", 1, array_join),
        FunctionSpec::new("toString", 0, array_to_string),
    ],
    statics: &[FunctionSpec::new("isArray", 1, array_is_array)],
};

pub(crate) fn init(cx: &mut Context) -> Result<()> {
    let parent = cx.get_class_prototype(ProtoKey::Object)?;
    let (_, proto) = cx.init_class(parent, &ARRAY_CLASS, &ARRAY_SPEC)?;
    cx.define_property(
        proto,
        &PropertyId::atom(atoms::LENGTH),
        Value::Undefined,
        PropertyOp::Native(length_getter),
        PropertyOp::Native(length_setter),
        Attrs::SHARED | Attrs::PERMANENT,
    )?;
    Ok(())
}

fn range_error(msg: &str) -> Error {
    Error::Exception(Value::String(format!("RangeError: {}", msg).into()))
}

/// Length of array `obj`.
pub fn array_length(cx: &Context, obj: ObjectRef) -> Result<u32> {
    Ok(cx.get_reserved_slot(obj, LENGTH_SLOT)?.to_uint32())
}

/// Raise the length of `obj` to at least `len`. Non-arrays are ignored.
pub(crate) fn ensure_length(cx: &mut Context, obj: ObjectRef, len: u32) -> Result<()> {
    if cx.kind_of(obj)? != ObjectKind::Array {
        return Ok(());
    }
    if len > array_length(cx, obj)? {
        cx.set_reserved_slot(obj, LENGTH_SLOT, len.into())?;
    }
    Ok(())
}

fn length_getter(cx: &mut Context, obj: ObjectRef, _id: &PropertyId, value: &mut Value) -> Result<()> {
    if cx.kind_of(obj)? == ObjectKind::Array {
        *value = array_length(cx, obj)?.into();
    }
    Ok(())
}

fn length_setter(cx: &mut Context, obj: ObjectRef, id: &PropertyId, value: &mut Value) -> Result<()> {
    if cx.kind_of(obj)? != ObjectKind::Array {
        return Ok(());
    }
    if cx.object(obj)?.flags().contains(ObjectFlags::FROZEN) {
        cx.reject_write(TypeError::ReadOnly(id.clone()))?;
        *value = array_length(cx, obj)?.into();
        return Ok(());
    }
    let new_len = value.to_uint32();
    if new_len as f64 != value.to_number() {
        return Err(range_error("invalid array length"));
    }
    let old_len = array_length(cx, obj)?;
    if new_len < old_len {
        let doomed: Vec<PropertyId> = cx
            .own_shapes(obj)?
            .into_iter()
            .filter(|s| s.id.as_index().is_some_and(|i| i >= new_len))
            .map(|s| s.id)
            .collect();
        for id in doomed.iter().rev() {
            cx.delete_property(obj, id)?;
        }
    }
    cx.set_reserved_slot(obj, LENGTH_SLOT, new_len.into())?;
    *value = new_len.into();
    Ok(())
}

/// Create an array holding `values`.
pub fn new_array(cx: &mut Context, values: Vec<Value>) -> Result<ObjectRef> {
    let obj = cx.new_object(&ARRAY_CLASS, None, None)?;
    for (i, value) in values.into_iter().enumerate() {
        let id = PropertyId::index(i as u32);
        cx.define_property(obj, &id, value, PropertyOp::Stub, PropertyOp::Stub, Attrs::ENUMERATE)?;
    }
    Ok(obj)
}

/// Array(len) / Array(...items)
pub fn array_constructor(cx: &mut Context, args: &CallArgs<'_>) -> Result<Value> {
    let obj = match (args.constructing, args.this_object()) {
        (true, Some(obj)) => obj,
        _ => cx.new_object(&ARRAY_CLASS, None, None)?,
    };
    if let [Value::Number(n)] = args.args {
        let len = Value::Number(*n).to_uint32();
        if len as f64 != *n {
            return Err(range_error("invalid array length"));
        }
        cx.set_reserved_slot(obj, LENGTH_SLOT, len.into())?;
        return Ok(obj.into());
    }
    for (i, value) in args.args.iter().enumerate() {
        let id = PropertyId::index(i as u32);
        cx.define_property(obj, &id, value.clone(), PropertyOp::Stub, PropertyOp::Stub, Attrs::ENUMERATE)?;
    }
    Ok(obj.into())
}

fn generic_length(cx: &mut Context, obj: ObjectRef) -> Result<u32> {
    Ok(cx.get_property(obj, &PropertyId::atom(atoms::LENGTH))?.to_uint32())
}

/// Id of element `index`, which may lie past the array index range.
fn element_id(index: f64) -> PropertyId {
    PropertyId::from_value(&Value::Number(index))
}

fn this_array(args: &CallArgs<'_>) -> Result<ObjectRef> {
    super::object_arg(&args.this)
}

/// Array.prototype.push(...items) - returns the new length.
pub fn array_push(cx: &mut Context, args: &CallArgs<'_>) -> Result<Value> {
    let obj = this_array(args)?;
    // may pass 2^32 - 1; arrays then reject the length with a RangeError
    let mut len = f64::from(generic_length(cx, obj)?);
    for value in args.args {
        cx.set_property(obj, &element_id(len), value.clone())?;
        len += 1.0;
    }
    cx.set_property(obj, &PropertyId::atom(atoms::LENGTH), Value::Number(len))?;
    Ok(Value::Number(len))
}

/// Array.prototype.pop() - removes and returns the last element.
pub fn array_pop(cx: &mut Context, args: &CallArgs<'_>) -> Result<Value> {
    let obj = this_array(args)?;
    let len = generic_length(cx, obj)?;
    if len == 0 {
        cx.set_property(obj, &PropertyId::atom(atoms::LENGTH), 0u32.into())?;
        return Ok(Value::Undefined);
    }
    let id = PropertyId::index(len - 1);
    let value = cx.get_property(obj, &id)?;
    cx.delete_property(obj, &id)?;
    cx.set_property(obj, &PropertyId::atom(atoms::LENGTH), (len - 1).into())?;
    Ok(value)
}

/// Array.prototype.join(sep)
pub fn array_join(cx: &mut Context, args: &CallArgs<'_>) -> Result<Value> {
    let obj = this_array(args)?;
    let sep = match args.arg(0) {
        Value::Undefined => ",".to_string(),
        other => to_display_string(cx, &other)?,
    };
    let len = generic_length(cx, obj)?;
    let mut out = String::new();
    for i in 0..len {
        if i > 0 {
            out.try_reserve(sep.len())?;
            out.push_str(&sep);
        }
        let v = cx.get_property(obj, &PropertyId::index(i))?;
        if !v.is_nullish() {
            let part = to_display_string(cx, &v)?;
            out.try_reserve(part.len())?;
            out.push_str(&part);
        }
    }
    Ok(Value::String(out.into()))
}

/// Array.prototype.toString()
pub fn array_to_string(cx: &mut Context, args: &CallArgs<'_>) -> Result<Value> {
    let join = CallArgs {
        callee: args.callee,
        this: args.this.clone(),
        args: &[],
        constructing: false,
    };
    array_join(cx, &join)
}

/// Array.isArray(v)
pub fn array_is_array(cx: &mut Context, args: &CallArgs<'_>) -> Result<Value> {
    Ok(match args.arg(0).as_object() {
        Some(obj) => (cx.kind_of(obj)? == ObjectKind::Array).into(),
        None => false.into(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RuntimeOptions;
    use crate::ops::Deletion;
    use crate::runtime::Runtime;
    use spacey_macros::assert_err;

    fn length(cx: &mut Context, obj: ObjectRef) -> Value {
        cx.get_property(obj, &"length".into()).unwrap()
    }

    #[test]
    fn test_index_definition_extends_length() {
        let rt = Runtime::new(RuntimeOptions::default());
        let mut cx = rt.new_context();
        let arr = new_array(&mut cx, vec![1.into(), 2.into()]).unwrap();
        assert_eq!(length(&mut cx, arr), Value::Number(2.0));
        cx.set_property(arr, &9u32.into(), 3.into()).unwrap();
        assert_eq!(length(&mut cx, arr), Value::Number(10.0));
    }

    #[test]
    fn test_length_is_own_but_shared() {
        let rt = Runtime::new(RuntimeOptions::default());
        let mut cx = rt.new_context();
        let arr = new_array(&mut cx, vec![]).unwrap();
        assert!(cx.has_own_property(arr, &"length".into()).unwrap());
        assert!(cx.has_shared_scope(arr).unwrap());
        assert_eq!(cx.delete_property(arr, &"length".into()).unwrap(), Deletion::Refused);
    }

    #[test]
    fn test_shrinking_length_deletes_elements() {
        let rt = Runtime::new(RuntimeOptions::default());
        let mut cx = rt.new_context();
        let arr = new_array(&mut cx, vec![1.into(), 2.into(), 3.into()]).unwrap();
        cx.set_property(arr, &"length".into(), 1.into()).unwrap();
        assert_eq!(length(&mut cx, arr), Value::Number(1.0));
        assert!(!cx.has_own_property(arr, &2u32.into()).unwrap());
        assert!(cx.has_own_property(arr, &0u32.into()).unwrap());
    }

    #[test]
    fn test_invalid_length_is_range_error() {
        let rt = Runtime::new(RuntimeOptions::default());
        let mut cx = rt.new_context();
        let arr = new_array(&mut cx, vec![]).unwrap();
        assert_err!(cx.set_property(arr, &"length".into(), Value::Number(1.5)), Error::Exception(_));
    }

    #[test]
    fn test_push_pop_join() {
        let rt = Runtime::new(RuntimeOptions::default());
        let mut cx = rt.new_context();
        let arr = new_array(&mut cx, vec!["a".into()]).unwrap();
        let push = cx.get_property(arr, &"push".into()).unwrap();
        let n = cx.call_function(&push, &arr.into(), &["b".into(), "c".into()]).unwrap();
        assert_eq!(n, Value::Number(3.0));
        let join = cx.get_property(arr, &"join".into()).unwrap();
        assert_eq!(cx.call_function(&join, &arr.into(), &["-".into()]).unwrap(), Value::string("a-b-c"));
        let pop = cx.get_property(arr, &"pop".into()).unwrap();
        assert_eq!(cx.call_function(&pop, &arr.into(), &[]).unwrap(), Value::string("c"));
        assert_eq!(length(&mut cx, arr), Value::Number(2.0));
    }

    #[test]
    fn test_push_past_max_length_is_range_error() {
        let rt = Runtime::new(RuntimeOptions::default());
        let mut cx = rt.new_context();
        let arr = new_array(&mut cx, vec![]).unwrap();
        cx.set_property(arr, &"length".into(), Value::Number(4294967295.0)).unwrap();
        let push = cx.get_property(arr, &"push".into()).unwrap();
        assert_err!(cx.call_function(&push, &arr.into(), &[1.into()]), Error::Exception(_));
        assert_eq!(length(&mut cx, arr), Value::Number(4294967295.0));
    }

    #[test]
    fn test_join_generic_object_with_holes() {
        let rt = Runtime::new(RuntimeOptions::default());
        let mut cx = rt.new_context();
        let obj = cx.new_object(&crate::class::OBJECT_CLASS, None, None).unwrap();
        cx.set_property(obj, &"length".into(), Value::Number(3.0)).unwrap();
        cx.set_property(obj, &1u32.into(), "x".into()).unwrap();
        let arr = new_array(&mut cx, vec![]).unwrap();
        let join = cx.get_property(arr, &"join".into()).unwrap();
        assert_eq!(cx.call_function(&join, &obj.into(), &[]).unwrap(), Value::string(",x,"));
    }

    #[test]
    fn test_frozen_array_length_is_pinned() {
        let rt = Runtime::new(RuntimeOptions::default());
        let mut cx = rt.new_context();
        let arr = new_array(&mut cx, vec![1.into(), 2.into()]).unwrap();
        cx.freeze(arr).unwrap();
        cx.set_property(arr, &"length".into(), 0.into()).unwrap();
        assert_eq!(length(&mut cx, arr), Value::Number(2.0));
        assert!(cx.has_own_property(arr, &1u32.into()).unwrap());

        cx.set_strict(true);
        assert_err!(cx.set_property(arr, &"length".into(), 0.into()), Error::Type(_));
        assert_eq!(length(&mut cx, arr), Value::Number(2.0));
    }

    #[test]
    fn test_constructor_with_length() {
        let rt = Runtime::new(RuntimeOptions::default());
        let mut cx = rt.new_context();
        let ctor = cx.find_class_object("Array").unwrap();
        let arr = cx.construct(&ctor, &[Value::Number(4.0)]).unwrap().as_object().unwrap();
        assert_eq!(length(&mut cx, arr), Value::Number(4.0));
        assert_eq!(cx.kind_of(arr).unwrap(), ObjectKind::Array);
    }
}
