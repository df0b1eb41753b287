// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! The global object class.
//!
//! The global reserves a constructor slot and a prototype slot for every
//! [`ProtoKey`]. Standard class names resolve lazily: looking up `Array`
//! on the global initialises the class and binds it.

use crate::class::{ClassFlags, JsClass, ObjectKind, ProtoKey, Resolution, ResolveFlags};
use crate::context::Context;
use crate::error::Result;
use crate::id::PropertyId;
use crate::object::ObjectRef;

/// Global object class.
pub struct GlobalClass;

/// The global object class.
pub static GLOBAL_CLASS: GlobalClass = GlobalClass;

impl JsClass for GlobalClass {
    fn name(&self) -> &'static str {
        "global"
    }

    fn flags(&self) -> ClassFlags {
        ClassFlags::IS_GLOBAL | ClassFlags::IS_ANONYMOUS
    }

    fn kind(&self) -> ObjectKind {
        ObjectKind::Global
    }

    fn reserved_slots(&self) -> u32 {
        2 * ProtoKey::COUNT as u32
    }

    fn has_resolve_hook(&self) -> bool {
        true
    }

    fn resolve(
        &self,
        cx: &mut Context,
        obj: ObjectRef,
        id: &PropertyId,
        _flags: ResolveFlags,
        _start: ObjectRef,
    ) -> Result<Resolution> {
        let Some(key) = id.as_atom().and_then(ProtoKey::from_name) else {
            return Ok(Resolution::NotFound);
        };
        if obj != cx.global() {
            return Ok(Resolution::NotFound);
        }
        cx.get_class_object(key)?;
        Ok(match cx.lookup_own_shape(obj, id)? {
            Some(_) => Resolution::Defined,
            None => Resolution::NotFound,
        })
    }

    fn enumerate(&self, cx: &mut Context, _obj: ObjectRef) -> Result<Option<Vec<PropertyId>>> {
        cx.init_standard_classes()?;
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RuntimeOptions;
    use crate::ops::EnumerateMode;
    use crate::runtime::Runtime;

    #[test]
    fn test_standard_class_resolves_lazily() {
        let rt = Runtime::new(RuntimeOptions::default());
        let mut cx = rt.new_context();
        let global = cx.global();
        let id = PropertyId::from("Date");
        assert!(cx.lookup_own_shape(global, &id).unwrap().is_none());
        let ctor = cx.get_property(global, &id).unwrap();
        assert!(cx.is_callable(&ctor).unwrap());
        assert!(cx.lookup_own_shape(global, &id).unwrap().is_some());
    }

    #[test]
    fn test_enumerate_initialises_everything() {
        let rt = Runtime::new(RuntimeOptions::default());
        let mut cx = rt.new_context();
        let global = cx.global();
        let names = cx.enumerate(global, EnumerateMode::OwnAll).unwrap();
        for name in ["Object", "Function", "Array", "Date", "RegExp"] {
            assert!(names.contains(&PropertyId::from(name)), "{}", name);
        }
        // class bindings are not enumerable
        assert!(cx.enumerate(global, EnumerateMode::OwnEnumerable).unwrap().is_empty());
    }
}
