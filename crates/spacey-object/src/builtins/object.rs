// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Object constructor and prototype methods.
//!
//! `Object.prototype` and `Function.prototype` depend on each other, so
//! both classes are bootstrapped here in one step.

use super::array::new_array;
use super::function::{FUNCTION_CLASS, FUNCTION_METHODS, function_constructor, function_empty};
use super::object_arg;
use crate::class::{ConvertHint, OBJECT_CLASS, ProtoKey};
use crate::construct::{FunctionSpec, proto_slot};
use crate::context::Context;
use crate::error::{Result, TypeError};
use crate::id::PropertyId;
use crate::object::{CallArgs, NativeFunction, ObjectRef, PrivateData};
use crate::ops::{EnumerateMode, PropDesc};
use crate::shape::{Attrs, PropertyOp};
use crate::value::Value;
use std::sync::Arc;
use tracing::debug;

const OBJECT_METHODS: &[FunctionSpec] = &[
    FunctionSpec::new("toString", 0, object_to_string),
    FunctionSpec::new("valueOf", 0, object_value_of),
    FunctionSpec::new("hasOwnProperty", 1, object_has_own_property),
    FunctionSpec::new("propertyIsEnumerable", 1, object_property_is_enumerable),
    FunctionSpec::new("isPrototypeOf", 1, object_is_prototype_of),
    FunctionSpec::new("__defineGetter__", 2, object_define_getter),
    FunctionSpec::new("__defineSetter__", 2, object_define_setter),
    FunctionSpec::new("__lookupGetter__", 1, object_lookup_getter),
    FunctionSpec::new("__lookupSetter__", 1, object_lookup_setter),
];

const OBJECT_STATICS: &[FunctionSpec] = &[
    FunctionSpec::new("getPrototypeOf", 1, object_get_prototype_of),
    FunctionSpec::new("getOwnPropertyDescriptor", 2, object_get_own_property_descriptor),
    FunctionSpec::new("getOwnPropertyNames", 1, object_get_own_property_names),
    FunctionSpec::new("keys", 1, object_keys),
    FunctionSpec::new("defineProperty", 3, object_define_property),
    FunctionSpec::new("defineProperties", 2, object_define_properties),
    FunctionSpec::new("create", 2, object_create),
    FunctionSpec::new("preventExtensions", 1, object_prevent_extensions),
    FunctionSpec::new("isExtensible", 1, object_is_extensible),
    FunctionSpec::new("seal", 1, object_seal),
    FunctionSpec::new("isSealed", 1, object_is_sealed),
    FunctionSpec::new("freeze", 1, object_freeze),
    FunctionSpec::new("isFrozen", 1, object_is_frozen),
];

/// Bootstrap `Object` and `Function`.
pub(crate) fn init(cx: &mut Context) -> Result<()> {
    let global = cx.global();
    if cx.get_reserved_slot(global, ProtoKey::Object as u32)?.is_object() {
        return Ok(());
    }

    let obj_proto = cx.new_object_with_given_proto(&OBJECT_CLASS, None, Some(global))?;
    cx.set_reserved_slot(global, proto_slot(ProtoKey::Object), obj_proto.into())?;

    // Function.prototype is itself a function that ignores its arguments
    let fun_proto = cx.new_object_with_given_proto(&FUNCTION_CLASS, Some(obj_proto), Some(global))?;
    cx.set_private(
        fun_proto,
        PrivateData::Function(Arc::new(NativeFunction {
            name: Arc::from(""),
            nargs: 0,
            call: Arc::new(function_empty),
            constructor: false,
            instance_class: None,
        })),
    )?;
    cx.set_reserved_slot(global, proto_slot(ProtoKey::Function), fun_proto.into())?;

    let object_ctor = cx.new_native_function("Object", 1, Arc::new(object_constructor), true, Some(&OBJECT_CLASS))?;
    let function_ctor =
        cx.new_native_function("Function", 1, Arc::new(function_constructor), true, Some(&FUNCTION_CLASS))?;

    cx.link_constructor(object_ctor, obj_proto)?;
    cx.link_constructor(function_ctor, fun_proto)?;
    cx.define_functions(obj_proto, OBJECT_METHODS)?;
    cx.define_functions(object_ctor, OBJECT_STATICS)?;
    cx.define_functions(fun_proto, FUNCTION_METHODS)?;
    cx.set_class_object(ProtoKey::Object, object_ctor, obj_proto)?;
    cx.set_class_object(ProtoKey::Function, function_ctor, fun_proto)?;

    for (name, ctor) in [("Object", object_ctor), ("Function", function_ctor)] {
        cx.define_property(
            global,
            &PropertyId::atom(name),
            ctor.into(),
            PropertyOp::Stub,
            PropertyOp::Stub,
            Attrs::empty(),
        )?;
    }
    cx.set_proto(global, Some(obj_proto))?;
    debug!("bootstrapped Object and Function");
    Ok(())
}

/// Object() / new Object() - wraps nothing; objects pass through.
pub fn object_constructor(cx: &mut Context, args: &CallArgs<'_>) -> Result<Value> {
    let arg = args.arg(0);
    if arg.is_object() {
        return Ok(arg);
    }
    if args.constructing {
        if let Some(this) = args.this_object() {
            return Ok(this.into());
        }
    }
    Ok(cx.new_object(&OBJECT_CLASS, None, None)?.into())
}

fn this_or_error(args: &CallArgs<'_>) -> Result<ObjectRef> {
    object_arg(&args.this)
}

/// Object.prototype.toString() - "[object Class]".
pub fn object_to_string(cx: &mut Context, args: &CallArgs<'_>) -> Result<Value> {
    match args.this_object() {
        Some(obj) => {
            let obj = cx.this_object(obj)?;
            Ok(Value::String(format!("[object {}]", cx.class_of(obj)?.name()).into()))
        }
        None if args.this.is_null() => Ok(Value::string("[object Null]")),
        None => Ok(Value::string("[object Undefined]")),
    }
}

/// Object.prototype.valueOf() - the object itself.
pub fn object_value_of(_cx: &mut Context, args: &CallArgs<'_>) -> Result<Value> {
    Ok(args.this.clone())
}

/// Object.prototype.hasOwnProperty(name)
pub fn object_has_own_property(cx: &mut Context, args: &CallArgs<'_>) -> Result<Value> {
    let obj = this_or_error(args)?;
    let id = PropertyId::from_value(&args.arg(0));
    Ok(cx.has_own_property(obj, &id)?.into())
}

/// Object.prototype.propertyIsEnumerable(name)
pub fn object_property_is_enumerable(cx: &mut Context, args: &CallArgs<'_>) -> Result<Value> {
    let obj = this_or_error(args)?;
    let id = PropertyId::from_value(&args.arg(0));
    let Some(prop) = cx.lookup_property(obj, &id)? else {
        return Ok(false.into());
    };
    // inherited properties only count when they stand in for own ones
    if prop.holder != obj && !cx.has_own_property(obj, &id)? {
        return Ok(false.into());
    }
    Ok(prop.shape.enumerable().into())
}

/// Object.prototype.isPrototypeOf(v)
pub fn object_is_prototype_of(cx: &mut Context, args: &CallArgs<'_>) -> Result<Value> {
    let proto = this_or_error(args)?;
    match args.arg(0).as_object() {
        Some(obj) => Ok(cx.is_prototype_of(proto, obj)?.into()),
        None => Ok(false.into()),
    }
}

fn define_accessor_half(cx: &mut Context, args: &CallArgs<'_>, getter: bool) -> Result<Value> {
    let obj = this_or_error(args)?;
    let id = PropertyId::from_value(&args.arg(0));
    let f = args.arg(1);
    if !cx.is_callable(&f)? {
        let which = if getter { "getter" } else { "setter" };
        return Err(TypeError::BadGetterOrSetter(which).into());
    }
    let op = PropertyOp::Function(f.as_object().ok_or_else(|| TypeError::NotFunction(f.to_string()))?);
    let (get, set, half) = if getter {
        (op, PropertyOp::Stub, Attrs::GETTER)
    } else {
        (PropertyOp::Stub, op, Attrs::SETTER)
    };
    // an existing data property is replaced; an accessor keeps its other half
    if let Some((_, shape)) = cx.lookup_own_shape(obj, &id)? {
        if shape.is_data_descriptor() && !shape.configurable() {
            return Err(TypeError::CantRedefineProperty(id).into());
        }
    }
    cx.define_property(obj, &id, Value::Undefined, get, set, half | Attrs::SHARED | Attrs::ENUMERATE)?;
    Ok(Value::Undefined)
}

/// Object.prototype.__defineGetter__(name, fn)
pub fn object_define_getter(cx: &mut Context, args: &CallArgs<'_>) -> Result<Value> {
    define_accessor_half(cx, args, true)
}

/// Object.prototype.__defineSetter__(name, fn)
pub fn object_define_setter(cx: &mut Context, args: &CallArgs<'_>) -> Result<Value> {
    define_accessor_half(cx, args, false)
}

/// Object.prototype.__lookupGetter__(name)
pub fn object_lookup_getter(cx: &mut Context, args: &CallArgs<'_>) -> Result<Value> {
    let obj = this_or_error(args)?;
    let id = PropertyId::from_value(&args.arg(0));
    Ok(match cx.lookup_property(obj, &id)? {
        Some(p) if p.shape.attrs.contains(Attrs::GETTER) => p.shape.getter_value(),
        _ => Value::Undefined,
    })
}

/// Object.prototype.__lookupSetter__(name)
pub fn object_lookup_setter(cx: &mut Context, args: &CallArgs<'_>) -> Result<Value> {
    let obj = this_or_error(args)?;
    let id = PropertyId::from_value(&args.arg(0));
    Ok(match cx.lookup_property(obj, &id)? {
        Some(p) if p.shape.attrs.contains(Attrs::SETTER) => p.shape.setter_value(),
        _ => Value::Undefined,
    })
}

/// Object.getPrototypeOf(obj)
pub fn object_get_prototype_of(cx: &mut Context, args: &CallArgs<'_>) -> Result<Value> {
    let obj = object_arg(&args.arg(0))?;
    Ok(cx.get_proto(obj)?.map(Value::Object).unwrap_or(Value::Null))
}

/// Object.getOwnPropertyDescriptor(obj, name)
pub fn object_get_own_property_descriptor(cx: &mut Context, args: &CallArgs<'_>) -> Result<Value> {
    let obj = object_arg(&args.arg(0))?;
    let id = PropertyId::from_value(&args.arg(1));
    let desc = cx.get_own_property_descriptor(obj, &id)?;
    cx.from_property_descriptor(desc.as_ref())
}

fn names_array(cx: &mut Context, obj: Value, mode: EnumerateMode) -> Result<Value> {
    let obj = object_arg(&obj)?;
    let ids = cx.enumerate(obj, mode)?;
    let values = ids.iter().map(PropertyId::to_value).collect();
    Ok(new_array(cx, values)?.into())
}

/// Object.getOwnPropertyNames(obj) - every own property name.
pub fn object_get_own_property_names(cx: &mut Context, args: &CallArgs<'_>) -> Result<Value> {
    names_array(cx, args.arg(0), EnumerateMode::OwnAll)
}

/// Object.keys(obj) - own enumerable property names.
pub fn object_keys(cx: &mut Context, args: &CallArgs<'_>) -> Result<Value> {
    names_array(cx, args.arg(0), EnumerateMode::OwnEnumerable)
}

/// Object.defineProperty(obj, name, descriptor)
pub fn object_define_property(cx: &mut Context, args: &CallArgs<'_>) -> Result<Value> {
    let target = args.arg(0);
    let obj = object_arg(&target)?;
    let id = PropertyId::from_value(&args.arg(1));
    let desc = PropDesc::from_object(cx, &args.arg(2))?;
    cx.define_own_property(obj, &id, &desc, true)?;
    Ok(target)
}

/// Object.defineProperties(obj, props)
pub fn object_define_properties(cx: &mut Context, args: &CallArgs<'_>) -> Result<Value> {
    let target = args.arg(0);
    let obj = object_arg(&target)?;
    let props = object_arg(&args.arg(1))?;
    cx.define_properties(obj, props)?;
    Ok(target)
}

/// Object.create(proto, props)
pub fn object_create(cx: &mut Context, args: &CallArgs<'_>) -> Result<Value> {
    let proto = match args.arg(0) {
        Value::Null => None,
        Value::Object(p) => Some(p),
        other => return Err(TypeError::NotNonNullObject(other.to_string()).into()),
    };
    let parent = Some(cx.global());
    let obj = cx.new_object_with_given_proto(&OBJECT_CLASS, proto, parent)?;
    let props = args.arg(1);
    if !props.is_undefined() {
        let props = object_arg(&props)?;
        cx.define_properties(obj, props)?;
    }
    Ok(obj.into())
}

/// Object.preventExtensions(obj)
pub fn object_prevent_extensions(cx: &mut Context, args: &CallArgs<'_>) -> Result<Value> {
    let target = args.arg(0);
    cx.prevent_extensions(object_arg(&target)?)?;
    Ok(target)
}

/// Object.isExtensible(obj)
pub fn object_is_extensible(cx: &mut Context, args: &CallArgs<'_>) -> Result<Value> {
    Ok(cx.is_extensible(object_arg(&args.arg(0))?)?.into())
}

/// Object.seal(obj)
pub fn object_seal(cx: &mut Context, args: &CallArgs<'_>) -> Result<Value> {
    let target = args.arg(0);
    cx.seal(object_arg(&target)?)?;
    Ok(target)
}

/// Object.isSealed(obj)
pub fn object_is_sealed(cx: &mut Context, args: &CallArgs<'_>) -> Result<Value> {
    Ok(cx.is_sealed(object_arg(&args.arg(0))?)?.into())
}

/// Object.freeze(obj)
pub fn object_freeze(cx: &mut Context, args: &CallArgs<'_>) -> Result<Value> {
    let target = args.arg(0);
    cx.freeze(object_arg(&target)?)?;
    Ok(target)
}

/// Object.isFrozen(obj)
pub fn object_is_frozen(cx: &mut Context, args: &CallArgs<'_>) -> Result<Value> {
    Ok(cx.is_frozen(object_arg(&args.arg(0))?)?.into())
}

/// The string form of `value`, calling its class conversion for objects.
pub fn to_display_string(cx: &mut Context, value: &Value) -> Result<String> {
    match value {
        Value::Object(o) => Ok(cx.default_value(*o, ConvertHint::String)?.to_string()),
        other => Ok(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RuntimeOptions;
    use crate::runtime::Runtime;

    fn object_ctor(cx: &mut Context) -> Value {
        cx.find_class_object("Object").unwrap()
    }

    fn call_static(cx: &mut Context, name: &str, args: &[Value]) -> Result<Value> {
        let ctor = object_ctor(cx).as_object().unwrap();
        let f = cx.get_property(ctor, &PropertyId::atom(name)).unwrap();
        cx.call_function(&f, &Value::Object(ctor), args)
    }

    #[test]
    fn test_bootstrap_links_prototypes() {
        let rt = Runtime::new(RuntimeOptions::default());
        let mut cx = rt.new_context();
        let obj_proto = cx.get_class_prototype(ProtoKey::Object).unwrap().unwrap();
        let fun_proto = cx.get_class_prototype(ProtoKey::Function).unwrap().unwrap();
        assert_eq!(cx.get_proto(fun_proto).unwrap(), Some(obj_proto));
        assert_eq!(cx.get_proto(obj_proto).unwrap(), None);
        let global = cx.global();
        assert_eq!(cx.get_proto(global).unwrap(), Some(obj_proto));
        assert!(cx.is_callable(&Value::Object(fun_proto)).unwrap());
    }

    #[test]
    fn test_keys_and_names() {
        let rt = Runtime::new(RuntimeOptions::default());
        let mut cx = rt.new_context();
        let obj = cx.new_object(&OBJECT_CLASS, None, None).unwrap();
        cx.set_property(obj, &"a".into(), 1.into()).unwrap();
        cx.define_property(obj, &"hidden".into(), 2.into(), PropertyOp::Stub, PropertyOp::Stub, Attrs::empty())
            .unwrap();
        let keys = call_static(&mut cx, "keys", &[obj.into()]).unwrap().as_object().unwrap();
        assert_eq!(cx.get_property(keys, &"length".into()).unwrap(), Value::Number(1.0));
        let names = call_static(&mut cx, "getOwnPropertyNames", &[obj.into()]).unwrap().as_object().unwrap();
        assert_eq!(cx.get_property(names, &"length".into()).unwrap(), Value::Number(2.0));
        assert_eq!(cx.get_property(names, &1u32.into()).unwrap(), Value::string("hidden"));
    }

    #[test]
    fn test_keys_rejects_primitives() {
        let rt = Runtime::new(RuntimeOptions::default());
        let mut cx = rt.new_context();
        let err = call_static(&mut cx, "keys", &[Value::Number(1.0)]).unwrap_err();
        assert!(err.is_type_error());
    }

    #[test]
    fn test_create_with_null_proto() {
        let rt = Runtime::new(RuntimeOptions::default());
        let mut cx = rt.new_context();
        let obj = call_static(&mut cx, "create", &[Value::Null]).unwrap().as_object().unwrap();
        assert_eq!(cx.get_proto(obj).unwrap(), None);
        assert!(!cx.has_property(obj, &"toString".into()).unwrap());
    }

    #[test]
    fn test_define_getter_then_setter_merges() {
        let rt = Runtime::new(RuntimeOptions::default());
        let mut cx = rt.new_context();
        let obj = cx.new_object(&OBJECT_CLASS, None, None).unwrap();
        let seven = |_: &mut Context, _: &CallArgs<'_>| -> Result<Value> { Ok(Value::Number(7.0)) };
        let getter = cx.new_native_function("g", 0, Arc::new(seven), false, None).unwrap();
        let setter = cx.new_native_function("s", 1, Arc::new(function_empty), false, None).unwrap();
        let this = Value::Object(obj);
        let define_getter = cx.get_property(obj, &"__defineGetter__".into()).unwrap();
        let define_setter = cx.get_property(obj, &"__defineSetter__".into()).unwrap();
        cx.call_function(&define_getter, &this, &["x".into(), getter.into()]).unwrap();
        cx.call_function(&define_setter, &this, &["x".into(), setter.into()]).unwrap();

        assert_eq!(cx.get_property(obj, &"x".into()).unwrap(), Value::Number(7.0));
        let lookup_getter = cx.get_property(obj, &"__lookupGetter__".into()).unwrap();
        let lookup_setter = cx.get_property(obj, &"__lookupSetter__".into()).unwrap();
        assert_eq!(cx.call_function(&lookup_getter, &this, &["x".into()]).unwrap(), Value::Object(getter));
        assert_eq!(cx.call_function(&lookup_setter, &this, &["x".into()]).unwrap(), Value::Object(setter));
    }

    #[test]
    fn test_define_getter_requires_function() {
        let rt = Runtime::new(RuntimeOptions::default());
        let mut cx = rt.new_context();
        let obj = cx.new_object(&OBJECT_CLASS, None, None).unwrap();
        let define_getter = cx.get_property(obj, &"__defineGetter__".into()).unwrap();
        let err = cx
            .call_function(&define_getter, &obj.into(), &["x".into(), Value::Number(1.0)])
            .unwrap_err();
        assert!(err.is_type_error());
    }

    #[test]
    fn test_to_string_reports_class() {
        let rt = Runtime::new(RuntimeOptions::default());
        let mut cx = rt.new_context();
        let obj = cx.new_object(&OBJECT_CLASS, None, None).unwrap();
        let f = cx.get_property(obj, &"toString".into()).unwrap();
        assert_eq!(cx.call_function(&f, &obj.into(), &[]).unwrap(), Value::string("[object Object]"));
        assert_eq!(cx.call_function(&f, &Value::Null, &[]).unwrap(), Value::string("[object Null]"));
    }
}
