// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Class dispatch.
//!
//! A class is a capability descriptor attached to an object: a name, a few
//! flags, and a set of hooks the property layer calls at well defined
//! points. Every hook has a default that behaves like the plain-object
//! stub, so a class only implements what makes it different.

use crate::context::Context;
use crate::error::{Result, TypeError};
use crate::gc::Tracer;
use crate::id::PropertyId;
use crate::object::{CallArgs, JsObject, ObjectRef};
use crate::value::Value;
use spacey_macros::{bitflags, int_enum};
use std::fmt;

/// A class descriptor with static lifetime.
pub type ClassRef = &'static dyn JsClass;

bitflags! {
    /// Class capability flags.
    pub ClassFlags: u8 {
        /// Objects carry private data.
        HAS_PRIVATE = 0x01,
        /// The class of global objects.
        IS_GLOBAL = 0x02,
        /// `init_class` does not bind the constructor on the global.
        IS_ANONYMOUS = 0x04,
        /// Properties default to the class getter and setter hooks
        /// instead of the stubs.
        PROPERTY_OPS = 0x08,
    }
}

bitflags! {
    /// Context passed to resolve hooks.
    pub ResolveFlags: u8 {
        /// The id appeared in a qualified reference (`o.x`).
        QUALIFIED = 0x01,
        /// The lookup is for an assignment.
        ASSIGNING = 0x02,
        /// The lookup only tests for presence.
        DETECTING = 0x04,
        /// The lookup is for a declaration.
        DECLARING = 0x08,
        /// The id names a class being initialised.
        CLASSNAME = 0x10,
        /// The lookup came through a with object.
        WITH = 0x20,
    }
}

int_enum! {
    /// Standard class keys. The global object reserves a constructor and a
    /// prototype slot per key.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub enum ProtoKey: u8 {
        /// No standard class.
        Null = 0,
        /// `Object`
        Object = 1,
        /// `Function`
        Function = 2,
        /// `Array`
        Array = 3,
        /// `Date`
        Date = 4,
        /// `RegExp`
        RegExp = 5,
    }
}

impl ProtoKey {
    /// Global binding name.
    pub fn name(self) -> &'static str {
        match self {
            ProtoKey::Null => "null",
            ProtoKey::Object => "Object",
            ProtoKey::Function => "Function",
            ProtoKey::Array => "Array",
            ProtoKey::Date => "Date",
            ProtoKey::RegExp => "RegExp",
        }
    }

    /// Look up a standard class by global name.
    pub fn from_name(name: &str) -> Option<ProtoKey> {
        ProtoKey::ALL
            .iter()
            .copied()
            .find(|k| *k != ProtoKey::Null && k.name() == name)
    }
}

/// The closed set of object flavours the property layer special-cases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    /// Ordinary object.
    Plain,
    /// Array with a length slot.
    Array,
    /// Callable native function.
    Function,
    /// Date with a time value slot.
    Date,
    /// Regular expression with source and flags slots.
    RegExp,
    /// `with` scope object forwarding to its proto.
    With,
    /// Lexical block scope object.
    Block,
    /// Global object.
    Global,
}

/// Access being checked by [`JsClass::check_access`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    /// Reading a property.
    Read,
    /// Writing a property.
    Write,
    /// Installing a watchpoint.
    Watch,
    /// Reading or writing the prototype link.
    Proto,
}

/// Hint passed to [`JsClass::convert`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConvertHint {
    /// No preference.
    Void,
    /// Prefer a number.
    Number,
    /// Prefer a string.
    String,
}

/// Outcome of a resolve hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Nothing was defined.
    NotFound,
    /// The property now exists on the object passed to the hook.
    Defined,
    /// The property now exists on another object.
    DefinedOn(ObjectRef),
}

/// Hooks and metadata for a class of objects.
#[allow(unused_variables)]
pub trait JsClass: Send + Sync {
    /// Class name, as reported by `[object Name]`.
    fn name(&self) -> &'static str;

    /// Capability flags.
    fn flags(&self) -> ClassFlags {
        ClassFlags::empty()
    }

    /// Flavour of object this class produces.
    fn kind(&self) -> ObjectKind {
        ObjectKind::Plain
    }

    /// Slots reserved ahead of property slots.
    fn reserved_slots(&self) -> u32 {
        0
    }

    /// Standard class key, used to find the default prototype.
    fn proto_key(&self) -> ProtoKey {
        ProtoKey::Null
    }

    /// Called after a property is added. An error removes the property.
    fn add_property(
        &self,
        cx: &mut Context,
        obj: ObjectRef,
        id: &PropertyId,
        value: &mut Value,
    ) -> Result<()> {
        Ok(())
    }

    /// Called before a property is deleted. Returning false refuses the
    /// deletion.
    fn del_property(&self, cx: &mut Context, obj: ObjectRef, id: &PropertyId) -> Result<bool> {
        Ok(true)
    }

    /// Getter for properties using the class op, and for misses.
    fn get_property(
        &self,
        cx: &mut Context,
        obj: ObjectRef,
        id: &PropertyId,
        value: &mut Value,
    ) -> Result<()> {
        Ok(())
    }

    /// Setter for properties using the class op.
    fn set_property(
        &self,
        cx: &mut Context,
        obj: ObjectRef,
        id: &PropertyId,
        value: &mut Value,
    ) -> Result<()> {
        Ok(())
    }

    /// Custom enumeration. `None` falls through to the shape chain walk.
    fn enumerate(&self, cx: &mut Context, obj: ObjectRef) -> Result<Option<Vec<PropertyId>>> {
        Ok(None)
    }

    /// True if [`JsClass::resolve`] should be consulted on misses.
    fn has_resolve_hook(&self) -> bool {
        false
    }

    /// Lazily materialise `id` on `obj`. `start` is the object the lookup
    /// began at.
    fn resolve(
        &self,
        cx: &mut Context,
        obj: ObjectRef,
        id: &PropertyId,
        flags: ResolveFlags,
        start: ObjectRef,
    ) -> Result<Resolution> {
        Ok(Resolution::NotFound)
    }

    /// Convert to a primitive.
    fn convert(&self, cx: &mut Context, obj: ObjectRef, hint: ConvertHint) -> Result<Value> {
        match hint {
            ConvertHint::Number => Ok(Value::Number(f64::NAN)),
            ConvertHint::String | ConvertHint::Void => {
                Ok(Value::String(format!("[object {}]", self.name()).into()))
            }
        }
    }

    /// Called when the collector frees the object.
    fn finalize(&self, obj: &mut JsObject) {}

    /// Report objects held outside of slots and the proto/parent links.
    fn trace(&self, obj: &JsObject, tracer: &mut dyn Tracer) {}

    /// Allow or deny an access.
    fn check_access(
        &self,
        cx: &mut Context,
        obj: ObjectRef,
        id: &PropertyId,
        mode: AccessMode,
    ) -> Result<bool> {
        Ok(true)
    }

    /// True if objects of this class can be called.
    fn is_callable(&self) -> bool {
        false
    }

    /// Call the object.
    fn call(&self, cx: &mut Context, args: &CallArgs<'_>) -> Result<Value> {
        Err(TypeError::NotFunction(self.name().to_string()).into())
    }

    /// Construct with the object.
    fn construct(&self, cx: &mut Context, args: &CallArgs<'_>) -> Result<Value> {
        Err(TypeError::NotConstructor(self.name().to_string()).into())
    }

    /// Outer object for split objects. Identity by default.
    fn outer_object(&self, cx: &mut Context, obj: ObjectRef) -> ObjectRef {
        obj
    }

    /// Inner object for split objects. Identity by default.
    fn inner_object(&self, cx: &mut Context, obj: ObjectRef) -> ObjectRef {
        obj
    }

    /// Object wrapped by a security or cross-context wrapper.
    fn wrapped_object(&self, cx: &mut Context, obj: ObjectRef) -> Option<ObjectRef> {
        None
    }
}

impl fmt::Debug for dyn JsClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Class({})", self.name())
    }
}

/// Class identity.
pub fn same_class(a: ClassRef, b: ClassRef) -> bool {
    std::ptr::addr_eq(a as *const dyn JsClass, b as *const dyn JsClass) && a.name() == b.name()
}

/// The plain object class with every hook stubbed.
pub struct PlainClass;

impl JsClass for PlainClass {
    fn name(&self) -> &'static str {
        "Object"
    }

    fn proto_key(&self) -> ProtoKey {
        ProtoKey::Object
    }
}

/// The plain object class.
pub static OBJECT_CLASS: PlainClass = PlainClass;

#[cfg(test)]
mod tests {
    use super::*;

    struct Other;

    impl JsClass for Other {
        fn name(&self) -> &'static str {
            "Other"
        }
    }

    static OTHER: Other = Other;

    #[test]
    fn test_proto_key_names() {
        assert_eq!(ProtoKey::from_name("Array"), Some(ProtoKey::Array));
        assert_eq!(ProtoKey::from_name("null"), None);
        assert_eq!(ProtoKey::from_name("Math"), None);
        assert_eq!(ProtoKey::COUNT, 6);
        assert_eq!(ProtoKey::try_from(4u8), Ok(ProtoKey::Date));
    }

    #[test]
    fn test_same_class() {
        assert!(same_class(&OBJECT_CLASS, &OBJECT_CLASS));
        assert!(!same_class(&OBJECT_CLASS, &OTHER));
    }

    #[test]
    fn test_class_defaults() {
        let class: ClassRef = &OTHER;
        assert_eq!(class.kind(), ObjectKind::Plain);
        assert_eq!(class.reserved_slots(), 0);
        assert!(!class.is_callable());
        assert!(class.flags().is_empty());
    }
}
