// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Native function objects.

use crate::class::{ClassFlags, JsClass, OBJECT_CLASS, ObjectKind, ProtoKey};
use crate::construct::FunctionSpec;
use crate::context::Context;
use crate::error::{Error, Result, TypeError};
use crate::id::{PropertyId, atoms};
use crate::object::{CallArgs, NativeFunction, ObjectRef};
use crate::value::Value;
use spacey_macros::ensure;
use std::sync::Arc;

/// Class of native function objects.
pub struct FunctionClass;

/// The function class.
pub static FUNCTION_CLASS: FunctionClass = FunctionClass;

pub(crate) const FUNCTION_METHODS: &[FunctionSpec] = &[
    FunctionSpec::new("call", 1, function_call),
    FunctionSpec::new("apply", 2, function_apply),
];

impl JsClass for FunctionClass {
    fn name(&self) -> &'static str {
        "Function"
    }

    fn flags(&self) -> ClassFlags {
        ClassFlags::HAS_PRIVATE
    }

    fn kind(&self) -> ObjectKind {
        ObjectKind::Function
    }

    fn proto_key(&self) -> ProtoKey {
        ProtoKey::Function
    }

    fn is_callable(&self) -> bool {
        true
    }

    fn call(&self, cx: &mut Context, args: &CallArgs<'_>) -> Result<Value> {
        let nf = native_function(cx, args.callee)?;
        (nf.call)(cx, args)
    }

    fn construct(&self, cx: &mut Context, args: &CallArgs<'_>) -> Result<Value> {
        let nf = native_function(cx, args.callee)?;
        ensure!(nf.constructor, TypeError::NotConstructor(nf.name.to_string()));
        let class = nf.instance_class.unwrap_or(&OBJECT_CLASS);
        let proto = cx
            .get_property(args.callee, &PropertyId::atom(atoms::PROTOTYPE))?
            .as_object();
        let parent = Some(cx.global());
        let obj = match proto {
            Some(p) => cx.new_object_with_given_proto(class, Some(p), parent)?,
            None => cx.new_object(class, None, parent)?,
        };
        let call = CallArgs {
            callee: args.callee,
            this: obj.into(),
            args: args.args,
            constructing: true,
        };
        let rval = (nf.call)(cx, &call)?;
        Ok(if rval.is_object() { rval } else { obj.into() })
    }
}

fn native_function(cx: &Context, f: ObjectRef) -> Result<Arc<NativeFunction>> {
    cx.get_private(f)?
        .as_function()
        .cloned()
        .ok_or_else(|| Error::internal("function object without native data"))
}

/// Invoke the native body of `callee` directly with an explicit `this`.
pub(crate) fn call_native(
    cx: &mut Context,
    callee: ObjectRef,
    this: Value,
    args: &[Value],
    constructing: bool,
) -> Result<Value> {
    let nf = native_function(cx, callee)?;
    let call = CallArgs {
        callee,
        this,
        args,
        constructing,
    };
    cx.with_depth(|cx| (nf.call)(cx, &call))
}

/// Function() / new Function() - only the empty function can be built
/// without a compiler.
pub fn function_constructor(cx: &mut Context, args: &CallArgs<'_>) -> Result<Value> {
    if !args.args.is_empty() {
        return Err(Error::internal("Function constructor cannot compile source"));
    }
    let f = cx.new_native_function("anonymous", 0, Arc::new(function_empty), true, None)?;
    Ok(f.into())
}

/// The empty function body.
pub fn function_empty(_cx: &mut Context, _args: &CallArgs<'_>) -> Result<Value> {
    Ok(Value::Undefined)
}

/// Function.prototype.call(thisArg, ...args)
pub fn function_call(cx: &mut Context, args: &CallArgs<'_>) -> Result<Value> {
    let rest = args.args.get(1..).unwrap_or(&[]);
    cx.call_function(&args.this, &args.arg(0), rest)
}

/// Function.prototype.apply(thisArg, argsArray)
pub fn function_apply(cx: &mut Context, args: &CallArgs<'_>) -> Result<Value> {
    let list = match args.arg(1) {
        Value::Undefined | Value::Null => Vec::new(),
        Value::Object(arr) => {
            let len = cx.get_property(arr, &PropertyId::atom(atoms::LENGTH))?.to_uint32();
            let mut list = Vec::with_capacity(len as usize);
            for i in 0..len {
                list.push(cx.get_property(arr, &PropertyId::index(i))?);
            }
            list
        }
        other => return Err(TypeError::NotNonNullObject(other.to_string()).into()),
    };
    cx.call_function(&args.this, &args.arg(0), &list)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RuntimeOptions;
    use crate::runtime::Runtime;
    use spacey_macros::assert_err;

    #[test]
    fn test_native_function_properties() {
        let rt = Runtime::new(RuntimeOptions::default());
        let mut cx = rt.new_context();
        let twice = |_: &mut Context, a: &CallArgs<'_>| -> Result<Value> { Ok(Value::Number(a.arg(0).to_number() * 2.0)) };
        let f = cx.new_native_function("twice", 1, Arc::new(twice), false, None).unwrap();
        assert_eq!(cx.get_property(f, &"length".into()).unwrap(), Value::Number(1.0));
        assert_eq!(cx.get_property(f, &"name".into()).unwrap(), Value::string("twice"));
        assert_eq!(cx.type_of(&f.into()).unwrap(), "function");
        let r = cx.call_function(&f.into(), &Value::Undefined, &[Value::Number(4.0)]).unwrap();
        assert_eq!(r, Value::Number(8.0));
    }

    #[test]
    fn test_non_constructor_rejects_new() {
        let rt = Runtime::new(RuntimeOptions::default());
        let mut cx = rt.new_context();
        let f = cx.new_native_function("f", 0, Arc::new(function_empty), false, None).unwrap();
        assert_err!(cx.construct(&f.into(), &[]), Error::Type(TypeError::NotConstructor(_)));
    }

    #[test]
    fn test_construct_uses_prototype_property() {
        let rt = Runtime::new(RuntimeOptions::default());
        let mut cx = rt.new_context();
        let f = cx.new_native_function("Point", 0, Arc::new(function_empty), true, None).unwrap();
        let proto = cx.new_object(&OBJECT_CLASS, None, None).unwrap();
        cx.set_property(f, &"prototype".into(), proto.into()).unwrap();
        let obj = cx.construct(&f.into(), &[]).unwrap().as_object().unwrap();
        assert_eq!(cx.get_proto(obj).unwrap(), Some(proto));
    }

    #[test]
    fn test_call_and_apply_pass_this() {
        let rt = Runtime::new(RuntimeOptions::default());
        let mut cx = rt.new_context();
        let this_of = |_: &mut Context, a: &CallArgs<'_>| -> Result<Value> { Ok(a.this.clone()) };
        let f = cx.new_native_function("self", 0, Arc::new(this_of), false, None).unwrap();
        let this = Value::string("me");
        let call = cx.get_property(f, &"call".into()).unwrap();
        assert_eq!(cx.call_function(&call, &f.into(), &[this.clone()]).unwrap(), this);
        let apply = cx.get_property(f, &"apply".into()).unwrap();
        assert_eq!(cx.call_function(&apply, &f.into(), &[this.clone(), Value::Null]).unwrap(), this);
    }
}
