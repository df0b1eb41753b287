// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! `with` objects.
//!
//! A with object's prototype is its target. Property operations on it
//! forward to the target; its parent, class and `typeof` are its own.

use crate::class::{ClassFlags, JsClass, ObjectKind};
use crate::context::Context;
use crate::error::Result;
use crate::object::{ObjectRef, PrivateData};
use crate::slots::INITIAL_NSLOTS;
use spacey_macros::const_assert;

/// Reserved slot holding the block depth at which the with was entered.
pub(crate) const WITH_DEPTH_SLOT: u32 = 0;
/// Reserved slot holding the `this` object of the target.
pub(crate) const WITH_THIS_SLOT: u32 = 1;

const_assert!((WITH_THIS_SLOT as usize) < INITIAL_NSLOTS, "with slots must be inline");

/// With object class.
pub struct WithClass;

/// The with class.
pub static WITH_CLASS: WithClass = WithClass;

impl JsClass for WithClass {
    fn name(&self) -> &'static str {
        "With"
    }

    fn flags(&self) -> ClassFlags {
        ClassFlags::HAS_PRIVATE | ClassFlags::IS_ANONYMOUS
    }

    fn kind(&self) -> ObjectKind {
        ObjectKind::With
    }

    fn reserved_slots(&self) -> u32 {
        2
    }
}

impl Context {
    /// Put `target` on the scope chain above `parent`. Inside a frame the
    /// with object is tied to it until the frame pops.
    pub fn new_with_object(&mut self, target: ObjectRef, parent: Option<ObjectRef>, depth: u32) -> Result<ObjectRef> {
        let this = self.this_object(target)?;
        let with = self.new_object_with_given_proto(&WITH_CLASS, Some(target), parent)?;
        self.set_reserved_slot(with, WITH_DEPTH_SLOT, depth.into())?;
        self.set_reserved_slot(with, WITH_THIS_SLOT, this.into())?;
        if let Some(frame) = self.current_frame() {
            self.set_private(with, PrivateData::Frame(frame))?;
            self.frame_mut(frame)?.withs.push(with);
        }
        Ok(with)
    }

    /// Block depth recorded for with object `with`.
    pub fn with_depth_of(&self, with: ObjectRef) -> Result<u32> {
        Ok(self.get_reserved_slot(with, WITH_DEPTH_SLOT)?.to_uint32())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class::OBJECT_CLASS;
    use crate::config::RuntimeOptions;
    use crate::error::{Error, TypeError};
    use crate::id::PropertyId;
    use crate::ops::EnumerateMode;
    use spacey_macros::assert_matches;
    use crate::runtime::Runtime;
    use crate::shape::{Attrs, PropertyOp};
    use crate::value::Value;

    #[test]
    fn test_operations_forward_to_target() {
        let rt = Runtime::new(RuntimeOptions::default());
        let mut cx = rt.new_context();
        let target = cx.new_object(&OBJECT_CLASS, None, None).unwrap();
        cx.set_property(target, &"a".into(), 1.into()).unwrap();
        let global = cx.global();
        let with = cx.new_with_object(target, Some(global), 0).unwrap();

        assert_eq!(cx.get_property(with, &"a".into()).unwrap(), Value::Number(1.0));
        cx.set_property(with, &"b".into(), 2.into()).unwrap();
        assert_eq!(cx.get_property(target, &"b".into()).unwrap(), Value::Number(2.0));
        assert!(cx.has_own_property(with, &"b".into()).unwrap());
        assert_eq!(
            cx.enumerate(with, EnumerateMode::OwnEnumerable).unwrap(),
            vec![PropertyId::from("a"), PropertyId::from("b")]
        );
        assert!(cx.delete_property(with, &"a".into()).unwrap().removed());
        assert!(!cx.has_property(target, &"a".into()).unwrap());

        // answered locally
        assert_eq!(cx.get_parent(with).unwrap(), Some(global));
        assert_eq!(cx.class_of(with).unwrap().name(), "With");
        assert_eq!(cx.this_object(with).unwrap(), target);
    }

    #[test]
    fn test_define_on_with_is_rejected() {
        let rt = Runtime::new(RuntimeOptions::default());
        let mut cx = rt.new_context();
        let target = cx.new_object(&OBJECT_CLASS, None, None).unwrap();
        let with = cx.new_with_object(target, None, 0).unwrap();
        let err = cx
            .define_property(with, &"x".into(), Value::Null, PropertyOp::Stub, PropertyOp::Stub, Attrs::ENUMERATE)
            .unwrap_err();
        assert!(matches!(err, Error::Type(TypeError::NotExtensible(_))));
    }

    #[test]
    fn test_name_lookup_through_with() {
        let rt = Runtime::new(RuntimeOptions::default());
        let mut cx = rt.new_context();
        let target = cx.new_object(&OBJECT_CLASS, None, None).unwrap();
        cx.set_property(target, &"x".into(), "inner".into()).unwrap();
        let global = cx.global();
        cx.set_property(global, &"y".into(), "outer".into()).unwrap();
        let with = cx.new_with_object(target, Some(global), 0).unwrap();
        assert_eq!(cx.get_name(with, &"x".into()).unwrap(), Value::string("inner"));
        assert_eq!(cx.get_name(with, &"y".into()).unwrap(), Value::string("outer"));
        assert_matches!(cx.get_name(with, &"z".into()), Err(Error::Reference(_)));
    }

    #[test]
    fn test_with_tied_to_frame() {
        let rt = Runtime::new(RuntimeOptions::default());
        let mut cx = rt.new_context();
        let target = cx.new_object(&OBJECT_CLASS, None, None).unwrap();
        let frame = cx.push_frame(0, None);
        let with = cx.new_with_object(target, None, 3).unwrap();
        assert_eq!(cx.get_private(with).unwrap().as_frame(), Some(frame));
        assert_eq!(cx.with_depth_of(with).unwrap(), 3);
        cx.pop_frame(true).unwrap();
        assert!(cx.get_private(with).unwrap().is_none());
    }
}
