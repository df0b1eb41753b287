// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! RegExp class.
//!
//! Only the object-model surface is provided: the source and flags live in
//! reserved slots and are exposed through shared permanent accessors on
//! the prototype, distinguished by short id. Matching is not implemented.

use super::object::to_display_string;
use crate::class::{JsClass, ObjectKind, ProtoKey};
use crate::construct::{ClassSpec, FunctionSpec};
use crate::context::Context;
use crate::error::{Error, Result, TypeError};
use crate::id::{PropertyId, atoms};
use crate::object::{CallArgs, ObjectRef};
use crate::shape::{Attrs, PropertyOp, ShapeFlags};
use crate::value::Value;

/// Reserved slot holding the pattern source.
pub(crate) const SOURCE_SLOT: u32 = 0;
/// Reserved slot holding the flag string.
pub(crate) const FLAGS_SLOT: u32 = 1;

const SOURCE_ID: i32 = -1;
const GLOBAL_ID: i32 = -2;
const IGNORE_CASE_ID: i32 = -3;
const MULTILINE_ID: i32 = -4;

const REGEXP_PROPS: &[(&str, i32)] = &[
    ("source", SOURCE_ID),
    ("global", GLOBAL_ID),
    ("ignoreCase", IGNORE_CASE_ID),
    ("multiline", MULTILINE_ID),
];

/// RegExp class.
pub struct RegExpClass;

/// The regexp class.
pub static REGEXP_CLASS: RegExpClass = RegExpClass;

impl JsClass for RegExpClass {
    fn name(&self) -> &'static str {
        "RegExp"
    }

    fn kind(&self) -> ObjectKind {
        ObjectKind::RegExp
    }

    fn reserved_slots(&self) -> u32 {
        2
    }

    fn proto_key(&self) -> ProtoKey {
        ProtoKey::RegExp
    }
}

const REGEXP_SPEC: ClassSpec = ClassSpec {
    constructor: regexp_constructor,
    nargs: 2,
    methods: &[FunctionSpec::new("toString", 0, regexp_to_string)],
    statics: &[],
};

pub(crate) fn init(cx: &mut Context) -> Result<()> {
    let parent = cx.get_class_prototype(ProtoKey::Object)?;
    let (_, proto) = cx.init_class(parent, &REGEXP_CLASS, &REGEXP_SPEC)?;
    for &(name, shortid) in REGEXP_PROPS {
        cx.define_native_property(
            proto,
            &PropertyId::atom(name),
            Value::Undefined,
            PropertyOp::Native(regexp_getter),
            PropertyOp::Stub,
            Attrs::SHARED | Attrs::PERMANENT | Attrs::READONLY,
            ShapeFlags::HAS_SHORTID,
            shortid,
        )?;
    }
    Ok(())
}

fn regexp_getter(cx: &mut Context, obj: ObjectRef, id: &PropertyId, value: &mut Value) -> Result<()> {
    if cx.kind_of(obj)? != ObjectKind::RegExp {
        return Ok(());
    }
    let PropertyId::Int(shortid) = id else {
        return Ok(());
    };
    let flags = match cx.get_reserved_slot(obj, FLAGS_SLOT)? {
        Value::String(s) => s,
        _ => "".into(),
    };
    *value = match *shortid {
        SOURCE_ID => match cx.get_reserved_slot(obj, SOURCE_SLOT)? {
            Value::String(s) if !s.is_empty() => Value::String(s),
            _ => Value::string("(?:)"),
        },
        GLOBAL_ID => flags.contains('g').into(),
        IGNORE_CASE_ID => flags.contains('i').into(),
        MULTILINE_ID => flags.contains('m').into(),
        _ => return Ok(()),
    };
    Ok(())
}

fn syntax_error(msg: String) -> Error {
    Error::Exception(Value::String(format!("SyntaxError: {}", msg).into()))
}

fn check_flags(flags: &str) -> Result<()> {
    let mut seen = String::new();
    for c in flags.chars() {
        if !"gim".contains(c) || seen.contains(c) {
            return Err(syntax_error(format!("invalid regular expression flag {}", c)));
        }
        seen.push(c);
    }
    Ok(())
}

/// new RegExp(source, flags)
pub fn regexp_constructor(cx: &mut Context, args: &CallArgs<'_>) -> Result<Value> {
    let obj = match (args.constructing, args.this_object()) {
        (true, Some(obj)) => obj,
        _ => cx.new_object(&REGEXP_CLASS, None, None)?,
    };
    let source = match args.arg(0) {
        Value::Undefined => String::new(),
        other => to_display_string(cx, &other)?,
    };
    let flags = match args.arg(1) {
        Value::Undefined => String::new(),
        other => to_display_string(cx, &other)?,
    };
    check_flags(&flags)?;
    cx.set_reserved_slot(obj, SOURCE_SLOT, Value::String(source.into()))?;
    cx.set_reserved_slot(obj, FLAGS_SLOT, Value::String(flags.into()))?;
    cx.define_property(
        obj,
        &PropertyId::atom(atoms::LAST_INDEX),
        Value::Number(0.0),
        PropertyOp::Stub,
        PropertyOp::Stub,
        Attrs::PERMANENT,
    )?;
    Ok(obj.into())
}

/// RegExp.prototype.toString() - "/source/flags".
pub fn regexp_to_string(cx: &mut Context, args: &CallArgs<'_>) -> Result<Value> {
    let obj = match args.this_object() {
        Some(obj) if cx.kind_of(obj)? == ObjectKind::RegExp => obj,
        _ => {
            return Err(TypeError::IncompatibleObject {
                method: "toString",
                class: args.this.type_of(),
            }
            .into());
        }
    };
    let source = cx.get_property(obj, &PropertyId::atom("source"))?;
    let flags = cx.get_reserved_slot(obj, FLAGS_SLOT)?;
    Ok(Value::String(format!("/{}/{}", source, flags).into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RuntimeOptions;
    use crate::runtime::Runtime;

    fn new_regexp(cx: &mut Context, source: &str, flags: &str) -> Result<ObjectRef> {
        let ctor = cx.find_class_object("RegExp")?;
        Ok(cx.construct(&ctor, &[source.into(), flags.into()])?.as_object().unwrap())
    }

    #[test]
    fn test_flag_accessors_share_one_getter() {
        let rt = Runtime::new(RuntimeOptions::default());
        let mut cx = rt.new_context();
        let re = new_regexp(&mut cx, "a+", "gi").unwrap();
        assert_eq!(cx.get_property(re, &"source".into()).unwrap(), Value::string("a+"));
        assert_eq!(cx.get_property(re, &"global".into()).unwrap(), Value::Boolean(true));
        assert_eq!(cx.get_property(re, &"ignoreCase".into()).unwrap(), Value::Boolean(true));
        assert_eq!(cx.get_property(re, &"multiline".into()).unwrap(), Value::Boolean(false));
        // shared permanent on a same-class prototype: reported as own
        assert!(cx.has_own_property(re, &"global".into()).unwrap());
    }

    #[test]
    fn test_last_index_is_own_and_hidden() {
        let rt = Runtime::new(RuntimeOptions::default());
        let mut cx = rt.new_context();
        let re = new_regexp(&mut cx, "x", "").unwrap();
        let (_, shape) = cx.lookup_own_shape(re, &"lastIndex".into()).unwrap().unwrap();
        assert!(!shape.enumerable());
        assert!(!shape.configurable());
        assert!(shape.writable());
    }

    #[test]
    fn test_invalid_flag() {
        let rt = Runtime::new(RuntimeOptions::default());
        let mut cx = rt.new_context();
        let err = new_regexp(&mut cx, "x", "gg").unwrap_err();
        assert!(matches!(err, Error::Exception(_)));
    }

    #[test]
    fn test_to_string() {
        let rt = Runtime::new(RuntimeOptions::default());
        let mut cx = rt.new_context();
        let re = new_regexp(&mut cx, "", "m").unwrap();
        let f = cx.get_property(re, &"toString".into()).unwrap();
        assert_eq!(cx.call_function(&f, &re.into(), &[]).unwrap(), Value::string("/(?:)/m"));
    }
}
