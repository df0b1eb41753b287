// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Object construction, reserved slots and standard class lookup.

use crate::builtins::{self, function::FUNCTION_CLASS};
use crate::class::{ClassFlags, ClassRef, ProtoKey};
use crate::context::{Context, ResolvingKey, ResolvingKind};
use crate::error::{Error, Result};
use crate::id::{PropertyId, atoms};
use crate::object::{CallArgs, JsObject, NativeFn, NativeFunction, ObjectRef, PrivateData};
use crate::scope::{EmptyScope, Scope, ScopeRef};
use crate::shape::{Attrs, PropertyOp};
use crate::value::Value;
use spacey_macros::ensure;
use std::sync::Arc;
use tracing::{debug, trace};

/// Plain native function pointer, for static method tables.
pub type NativeFnPtr = fn(&mut Context, &CallArgs<'_>) -> Result<Value>;

/// A method installed by [`Context::init_class`].
#[derive(Debug, Clone, Copy)]
pub struct FunctionSpec {
    /// Property name.
    pub name: &'static str,
    /// Declared argument count.
    pub nargs: u32,
    /// Body.
    pub call: NativeFnPtr,
}

impl FunctionSpec {
    /// A method spec.
    pub const fn new(name: &'static str, nargs: u32, call: NativeFnPtr) -> Self {
        Self { name, nargs, call }
    }
}

/// Constructor and method tables for [`Context::init_class`].
#[derive(Debug, Clone, Copy)]
pub struct ClassSpec {
    /// Constructor body.
    pub constructor: NativeFnPtr,
    /// Constructor argument count.
    pub nargs: u32,
    /// Prototype methods.
    pub methods: &'static [FunctionSpec],
    /// Constructor methods.
    pub statics: &'static [FunctionSpec],
}

impl Context {
    /// Create an object of `class`. Without a prototype, the class's
    /// standard prototype is used (`Object.prototype` for classes without
    /// a key); without a parent, the prototype's parent.
    pub fn new_object(
        &mut self,
        class: ClassRef,
        proto: Option<ObjectRef>,
        parent: Option<ObjectRef>,
    ) -> Result<ObjectRef> {
        let proto = match proto {
            Some(p) => Some(p),
            None => {
                let key = match class.proto_key() {
                    ProtoKey::Null => ProtoKey::Object,
                    key => key,
                };
                self.get_class_prototype(key)?
            }
        };
        let parent = match (parent, proto) {
            (Some(parent), _) => Some(parent),
            (None, Some(p)) => self.get_parent(p)?,
            (None, None) => None,
        };
        self.new_object_with_given_proto(class, proto, parent)
    }

    /// Create an object with exactly `proto` (possibly none). Fresh
    /// instances share an empty scope cached on their prototype.
    pub fn new_object_with_given_proto(
        &mut self,
        class: ClassRef,
        proto: Option<ObjectRef>,
        parent: Option<ObjectRef>,
    ) -> Result<ObjectRef> {
        let empty = match proto {
            Some(p) => {
                self.mark_delegate(p)?;
                self.empty_scope_for(p, class)?
            }
            None => Arc::new(EmptyScope::new(self.rt.next_scope_id(), class)),
        };
        let object = JsObject::new(class, proto, parent, ScopeRef::Shared(empty));
        Ok(self.heap.allocate(object))
    }

    fn empty_scope_for(&mut self, proto: ObjectRef, class: ClassRef) -> Result<Arc<EmptyScope>> {
        self.get_mutable_scope(proto)?;
        let rt = self.rt.clone();
        let o = self.heap.get_mut(proto)?;
        let scope = o
            .scope
            .as_own_mut()
            .ok_or_else(|| Error::internal("prototype scope is not mutable"))?;
        Ok(scope.empty_scope_for(class, || Arc::new(EmptyScope::new(rt.next_scope_id(), class))))
    }

    /// Give `obj` its own scope if it still shares an empty one.
    pub fn get_mutable_scope(&mut self, obj: ObjectRef) -> Result<()> {
        if !self.has_shared_scope(obj)? {
            return Ok(());
        }
        let id = self.rt.next_scope_id();
        let o = self.heap.get_mut(obj)?;
        o.scope = ScopeRef::Own(Box::new(Scope::new(id, o.reserved)));
        trace!(obj = ?obj, scope = ?id, "scope became mutable");
        Ok(())
    }

    /// Grow the reserved slots of `obj` to `nreserved`.
    pub fn ensure_reserved_slots(&mut self, obj: ObjectRef, nreserved: u32) -> Result<()> {
        if nreserved <= self.object(obj)?.reserved {
            return Ok(());
        }
        self.get_mutable_scope(obj)?;
        let growth = self.rt.options().slot_growth;
        let o = self.heap.get_mut(obj)?;
        let scope = o
            .scope
            .as_own_mut()
            .ok_or_else(|| Error::internal("scope is not mutable"))?;
        ensure!(
            scope.freeslot() <= o.reserved,
            Error::internal("reserved slots must be added before properties")
        );
        o.slots.grow_slots(nreserved as usize, &growth)?;
        scope.raise_freeslot(nreserved);
        o.reserved = nreserved;
        Ok(())
    }

    /// Read reserved slot `index` of `obj`.
    pub fn get_reserved_slot(&self, obj: ObjectRef, index: u32) -> Result<Value> {
        let o = self.object(obj)?;
        if index >= o.reserved {
            return Err(Error::internal(format!(
                "reserved slot {} out of range for {}",
                index,
                o.class.name()
            )));
        }
        Ok(o.slots.get(index as usize).clone())
    }

    /// Write reserved slot `index` of `obj`.
    pub fn set_reserved_slot(&mut self, obj: ObjectRef, index: u32, value: Value) -> Result<()> {
        let reserved = self.object(obj)?.reserved;
        ensure!(index < reserved, Error::internal(format!("reserved slot {} out of range", index)));
        self.set_slot(obj, index, value)
    }

    /// The constructor of a standard class, initialising the class on
    /// first use. Re-entrant initialisation of the same class yields
    /// `None`.
    pub fn get_class_object(&mut self, key: ProtoKey) -> Result<Option<ObjectRef>> {
        if key == ProtoKey::Null {
            return Ok(None);
        }
        let global = self.global();
        if let Some(ctor) = self.get_reserved_slot(global, key as u32)?.as_object() {
            return Ok(Some(ctor));
        }
        let rkey = ResolvingKey {
            obj: global,
            id: PropertyId::atom(key.name()),
            kind: ResolvingKind::ClassInit,
        };
        if !self.start_resolving(rkey.clone()) {
            return Ok(None);
        }
        debug!(class = key.name(), "lazily initialising class");
        let result = builtins::init_for_key(self, key);
        self.stop_resolving(&rkey);
        result?;
        Ok(self.get_reserved_slot(global, key as u32)?.as_object())
    }

    /// Record the constructor and prototype of a standard class.
    pub fn set_class_object(&mut self, key: ProtoKey, ctor: ObjectRef, proto: ObjectRef) -> Result<()> {
        let global = self.global();
        self.set_reserved_slot(global, key as u32, ctor.into())?;
        self.set_reserved_slot(global, proto_slot(key), proto.into())
    }

    /// The prototype of a standard class, initialising it if needed.
    pub fn get_class_prototype(&mut self, key: ProtoKey) -> Result<Option<ObjectRef>> {
        if key == ProtoKey::Null {
            return Ok(None);
        }
        let global = self.global();
        if let Some(proto) = self.get_reserved_slot(global, proto_slot(key))?.as_object() {
            return Ok(Some(proto));
        }
        self.get_class_object(key)?;
        Ok(self.get_reserved_slot(global, proto_slot(key))?.as_object())
    }

    /// Find a constructor by global name: standard classes first, then a
    /// global property.
    pub fn find_class_object(&mut self, name: &str) -> Result<Value> {
        if let Some(key) = ProtoKey::from_name(name) {
            if let Some(ctor) = self.get_class_object(key)? {
                return Ok(ctor.into());
            }
        }
        let global = self.global();
        self.get_property(global, &PropertyId::atom(name))
    }

    /// Create a class: a prototype of `class` inheriting from
    /// `parent_proto`, a constructor, their methods, and, unless the class
    /// is anonymous, a global binding.
    pub fn init_class(
        &mut self,
        parent_proto: Option<ObjectRef>,
        class: ClassRef,
        spec: &ClassSpec,
    ) -> Result<(ObjectRef, ObjectRef)> {
        let global = self.global();
        let key = class.proto_key();
        let proto = self.new_object_with_given_proto(class, parent_proto, Some(global))?;
        // instances of the class share this empty scope from the start
        self.empty_scope_for(proto, class)?;
        if key != ProtoKey::Null {
            // visible before the constructor exists, to break init cycles
            self.set_reserved_slot(global, proto_slot(key), proto.into())?;
        }

        let ctor = self.new_native_function(
            class.name(),
            spec.nargs,
            Arc::new(spec.constructor),
            true,
            Some(class),
        )?;
        self.link_constructor(ctor, proto)?;
        self.define_functions(proto, spec.methods)?;
        self.define_functions(ctor, spec.statics)?;
        if key != ProtoKey::Null {
            self.set_class_object(key, ctor, proto)?;
        }
        if !class.flags().contains(ClassFlags::IS_ANONYMOUS) {
            self.define_property(
                global,
                &PropertyId::atom(class.name()),
                ctor.into(),
                PropertyOp::Stub,
                PropertyOp::Stub,
                Attrs::empty(),
            )?;
        }
        debug!(class = class.name(), "initialised class");
        Ok((ctor, proto))
    }

    pub(crate) fn link_constructor(&mut self, ctor: ObjectRef, proto: ObjectRef) -> Result<()> {
        self.define_property(
            ctor,
            &PropertyId::atom(atoms::PROTOTYPE),
            proto.into(),
            PropertyOp::Stub,
            PropertyOp::Stub,
            Attrs::PERMANENT | Attrs::READONLY,
        )?;
        self.define_property(
            proto,
            &PropertyId::atom(atoms::CONSTRUCTOR),
            ctor.into(),
            PropertyOp::Stub,
            PropertyOp::Stub,
            Attrs::empty(),
        )?;
        Ok(())
    }

    /// Define each function in `specs` on `obj` as a hidden property.
    pub fn define_functions(&mut self, obj: ObjectRef, specs: &[FunctionSpec]) -> Result<()> {
        for spec in specs {
            let f = self.new_native_function(spec.name, spec.nargs, Arc::new(spec.call), false, None)?;
            self.define_property(
                obj,
                &PropertyId::atom(spec.name),
                f.into(),
                PropertyOp::Stub,
                PropertyOp::Stub,
                Attrs::empty(),
            )?;
        }
        Ok(())
    }

    /// Create a native function object.
    pub fn new_native_function(
        &mut self,
        name: &str,
        nargs: u32,
        call: NativeFn,
        constructor: bool,
        instance_class: Option<ClassRef>,
    ) -> Result<ObjectRef> {
        let global = self.global();
        let proto = self.get_class_prototype(ProtoKey::Function)?;
        let f = self.new_object_with_given_proto(&FUNCTION_CLASS, proto, Some(global))?;
        let name: Arc<str> = Arc::from(name);
        self.set_private(
            f,
            PrivateData::Function(Arc::new(NativeFunction {
                name: name.clone(),
                nargs,
                call,
                constructor,
                instance_class,
            })),
        )?;
        let hidden = Attrs::PERMANENT | Attrs::READONLY;
        self.define_property(
            f,
            &PropertyId::atom(atoms::LENGTH),
            nargs.into(),
            PropertyOp::Stub,
            PropertyOp::Stub,
            hidden,
        )?;
        self.define_property(
            f,
            &PropertyId::atom(atoms::NAME),
            Value::String(name),
            PropertyOp::Stub,
            PropertyOp::Stub,
            hidden,
        )?;
        Ok(f)
    }

    /// Create an instance of `class` and run its standard constructor on
    /// it. A constructor returning an object replaces the instance.
    pub fn construct_object(
        &mut self,
        class: ClassRef,
        proto: Option<ObjectRef>,
        parent: Option<ObjectRef>,
        args: &[Value],
    ) -> Result<ObjectRef> {
        let ctor = self.get_class_object(class.proto_key())?;
        let proto = match (proto, ctor) {
            (Some(p), _) => Some(p),
            (None, Some(c)) => self.get_property(c, &PropertyId::atom(atoms::PROTOTYPE))?.as_object(),
            (None, None) => self.get_class_prototype(ProtoKey::Object)?,
        };
        let parent = parent.or(Some(self.global()));
        let obj = self.new_object_with_given_proto(class, proto, parent)?;
        if let Some(ctor) = ctor {
            let rval = builtins::function::call_native(self, ctor, Value::Object(obj), args, true)?;
            if let Some(o) = rval.as_object() {
                return Ok(o);
            }
        }
        Ok(obj)
    }
}

/// Global reserved slot holding the prototype for `key`.
pub(crate) fn proto_slot(key: ProtoKey) -> u32 {
    (ProtoKey::COUNT + key as usize) as u32
}
