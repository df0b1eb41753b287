// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Typing, conversion and invocation.

use crate::class::{AccessMode, ConvertHint, ObjectKind};
use crate::context::Context;
use crate::error::{Result, TypeError};
use crate::id::PropertyId;
use crate::object::{CallArgs, ObjectRef};
use crate::scope_chain::with::WITH_THIS_SLOT;
use crate::value::Value;

impl Context {
    /// `typeof value`.
    pub fn type_of(&self, value: &Value) -> Result<&'static str> {
        match value {
            Value::Object(o) if self.class_of(*o)?.is_callable() => Ok("function"),
            other => Ok(other.type_of()),
        }
    }

    /// True if `value` is a callable object.
    pub fn is_callable(&self, value: &Value) -> Result<bool> {
        match value {
            Value::Object(o) => Ok(self.class_of(*o)?.is_callable()),
            _ => Ok(false),
        }
    }

    /// The object to use as `this` when `obj` is the base of a call. With
    /// objects answer the `this` of the object they wrap.
    pub fn this_object(&mut self, obj: ObjectRef) -> Result<ObjectRef> {
        if self.kind_of(obj)? == ObjectKind::With {
            if let Some(this) = self.get_reserved_slot(obj, WITH_THIS_SLOT)?.as_object() {
                return Ok(this);
            }
        }
        let class = self.class_of(obj)?;
        Ok(class.outer_object(self, obj))
    }

    /// Ask the class of `obj` whether `mode` access to `id` is allowed.
    pub fn check_access(&mut self, obj: ObjectRef, id: &PropertyId, mode: AccessMode) -> Result<bool> {
        let class = self.class_of(obj)?;
        class.check_access(self, obj, id, mode)
    }

    /// Convert `obj` to a primitive through its class.
    pub fn default_value(&mut self, obj: ObjectRef, hint: ConvertHint) -> Result<Value> {
        let class = self.class_of(obj)?;
        self.with_depth(|cx| class.convert(cx, obj, hint))
    }

    /// Call `callee` with `this` and `args`.
    pub fn call_function(&mut self, callee: &Value, this: &Value, args: &[Value]) -> Result<Value> {
        let f = match callee.as_object() {
            Some(f) if self.class_of(f)?.is_callable() => f,
            _ => return Err(TypeError::NotFunction(callee.to_string()).into()),
        };
        let class = self.class_of(f)?;
        let call = CallArgs {
            callee: f,
            this: this.clone(),
            args,
            constructing: false,
        };
        self.with_depth(|cx| class.call(cx, &call))
    }

    /// `new callee(...args)`.
    pub fn construct(&mut self, callee: &Value, args: &[Value]) -> Result<Value> {
        let Some(f) = callee.as_object() else {
            return Err(TypeError::NotConstructor(callee.to_string()).into());
        };
        let class = self.class_of(f)?;
        let call = CallArgs {
            callee: f,
            this: Value::Undefined,
            args,
            constructing: true,
        };
        self.with_depth(|cx| class.construct(cx, &call))
    }
}
