// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Date class: a time value in a reserved slot.

use crate::class::{ConvertHint, JsClass, ObjectKind, ProtoKey};
use crate::construct::{ClassSpec, FunctionSpec};
use crate::context::Context;
use crate::error::{Result, TypeError};
use crate::object::{CallArgs, ObjectRef};
use crate::value::Value;
use std::time::{SystemTime, UNIX_EPOCH};

/// Reserved slot holding milliseconds since the epoch.
pub(crate) const TIME_SLOT: u32 = 0;

/// Date class.
pub struct DateClass;

/// The date class.
pub static DATE_CLASS: DateClass = DateClass;

impl JsClass for DateClass {
    fn name(&self) -> &'static str {
        "Date"
    }

    fn kind(&self) -> ObjectKind {
        ObjectKind::Date
    }

    fn reserved_slots(&self) -> u32 {
        1
    }

    fn proto_key(&self) -> ProtoKey {
        ProtoKey::Date
    }

    fn convert(&self, cx: &mut Context, obj: ObjectRef, hint: ConvertHint) -> Result<Value> {
        let t = cx.get_reserved_slot(obj, TIME_SLOT)?.to_number();
        Ok(match hint {
            ConvertHint::Number => Value::Number(t),
            ConvertHint::String | ConvertHint::Void => Value::String(date_string(t).into()),
        })
    }
}

const DATE_SPEC: ClassSpec = ClassSpec {
    constructor: date_constructor,
    nargs: 1,
    methods: &[
        FunctionSpec::new("getTime", 0, date_get_time),
        FunctionSpec::new("valueOf", 0, date_get_time),
        FunctionSpec::new("setTime", 1, date_set_time),
        FunctionSpec::new("toString", 0, date_to_string),
    ],
    statics: &[FunctionSpec::new("now", 0, date_now)],
};

pub(crate) fn init(cx: &mut Context) -> Result<()> {
    let parent = cx.get_class_prototype(ProtoKey::Object)?;
    let (_, proto) = cx.init_class(parent, &DATE_CLASS, &DATE_SPEC)?;
    cx.set_reserved_slot(proto, TIME_SLOT, Value::Number(f64::NAN))?;
    Ok(())
}

fn now_millis() -> f64 {
    match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(d) => d.as_millis() as f64,
        Err(_) => 0.0,
    }
}

fn time_clip(t: f64) -> f64 {
    if !t.is_finite() || t.abs() > 8.64e15 { f64::NAN } else { t.trunc() + 0.0 }
}

fn date_string(t: f64) -> String {
    if t.is_nan() { "Invalid Date".to_string() } else { format!("Date({})", t) }
}

fn this_date(cx: &Context, args: &CallArgs<'_>, method: &'static str) -> Result<ObjectRef> {
    match args.this_object() {
        Some(obj) if cx.kind_of(obj)? == ObjectKind::Date => Ok(obj),
        Some(obj) => Err(TypeError::IncompatibleObject {
            method,
            class: cx.class_of(obj)?.name(),
        }
        .into()),
        None => Err(TypeError::IncompatibleObject {
            method,
            class: args.this.type_of(),
        }
        .into()),
    }
}

/// new Date() / new Date(ms); Date() returns a string.
pub fn date_constructor(cx: &mut Context, args: &CallArgs<'_>) -> Result<Value> {
    if !args.constructing {
        return Ok(Value::String(date_string(now_millis()).into()));
    }
    let t = match args.args.first() {
        None => now_millis(),
        Some(v) => time_clip(v.to_number()),
    };
    match args.this_object() {
        Some(obj) => {
            cx.set_reserved_slot(obj, TIME_SLOT, Value::Number(t))?;
            Ok(obj.into())
        }
        None => Err(TypeError::NotConstructor("Date".to_string()).into()),
    }
}

/// Date.now()
pub fn date_now(_cx: &mut Context, _args: &CallArgs<'_>) -> Result<Value> {
    Ok(Value::Number(now_millis()))
}

/// Date.prototype.getTime()
pub fn date_get_time(cx: &mut Context, args: &CallArgs<'_>) -> Result<Value> {
    let obj = this_date(cx, args, "getTime")?;
    cx.get_reserved_slot(obj, TIME_SLOT)
}

/// Date.prototype.setTime(ms)
pub fn date_set_time(cx: &mut Context, args: &CallArgs<'_>) -> Result<Value> {
    let obj = this_date(cx, args, "setTime")?;
    let t = Value::Number(time_clip(args.arg(0).to_number()));
    cx.set_reserved_slot(obj, TIME_SLOT, t.clone())?;
    Ok(t)
}

/// Date.prototype.toString()
pub fn date_to_string(cx: &mut Context, args: &CallArgs<'_>) -> Result<Value> {
    let obj = this_date(cx, args, "toString")?;
    let t = cx.get_reserved_slot(obj, TIME_SLOT)?.to_number();
    Ok(Value::String(date_string(t).into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class::OBJECT_CLASS;
    use crate::config::RuntimeOptions;
    use crate::error::Error;
    use crate::runtime::Runtime;
    use spacey_macros::assert_err;

    #[test]
    fn test_construct_and_get_time() {
        let rt = Runtime::new(RuntimeOptions::default());
        let mut cx = rt.new_context();
        let ctor = cx.find_class_object("Date").unwrap();
        let d = cx.construct(&ctor, &[Value::Number(1234.5)]).unwrap().as_object().unwrap();
        let get_time = cx.get_property(d, &"getTime".into()).unwrap();
        assert_eq!(cx.call_function(&get_time, &d.into(), &[]).unwrap(), Value::Number(1234.0));
        assert_eq!(cx.default_value(d, ConvertHint::Number).unwrap(), Value::Number(1234.0));
    }

    #[test]
    fn test_get_time_on_wrong_class() {
        let rt = Runtime::new(RuntimeOptions::default());
        let mut cx = rt.new_context();
        let ctor = cx.find_class_object("Date").unwrap();
        let d = cx.construct(&ctor, &[]).unwrap().as_object().unwrap();
        let get_time = cx.get_property(d, &"getTime".into()).unwrap();
        let plain = cx.new_object(&OBJECT_CLASS, None, None).unwrap();
        assert_err!(
            cx.call_function(&get_time, &plain.into(), &[]),
            Error::Type(TypeError::IncompatibleObject { method: "getTime", .. })
        );
    }

    #[test]
    fn test_out_of_range_time_is_invalid() {
        let rt = Runtime::new(RuntimeOptions::default());
        let mut cx = rt.new_context();
        let ctor = cx.find_class_object("Date").unwrap();
        let d = cx.construct(&ctor, &[Value::Number(1e20)]).unwrap().as_object().unwrap();
        assert_eq!(cx.default_value(d, ConvertHint::String).unwrap(), Value::string("Invalid Date"));
    }
}
