// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Property get and set.

use super::lookup::PropertyRef;
use crate::class::{ClassFlags, ObjectKind, ResolveFlags};
use crate::context::Context;
use crate::error::{Error, Result, TypeError};
use crate::id::PropertyId;
use crate::object::ObjectRef;
use crate::shape::{Attrs, PropertyOp, Shape, ShapeFlags, ShapeId};
use crate::value::Value;
use tracing::trace;

impl Context {
    /// The object property operations act on: with objects forward to the
    /// object they were created for.
    pub(crate) fn forward_with(&self, obj: ObjectRef) -> Result<ObjectRef> {
        let mut cur = obj;
        loop {
            let o = self.heap.get(cur)?;
            match (o.class.kind(), o.proto) {
                (ObjectKind::With, Some(target)) => cur = target,
                _ => return Ok(cur),
            }
        }
    }

    /// Get `obj[id]`. A miss asks the class getter, which leaves the value
    /// undefined by default.
    pub fn get_property(&mut self, obj: ObjectRef, id: &PropertyId) -> Result<Value> {
        let obj = self.forward_with(obj)?;
        match self.lookup_property(obj, id)? {
            Some(prop) => self.native_get(obj, &prop),
            None => {
                let class = self.class_of(obj)?;
                let mut value = Value::Undefined;
                class.get_property(self, obj, id, &mut value)?;
                Ok(value)
            }
        }
    }

    /// Read a found property with `receiver` as `this`. Getter results for
    /// slotful properties are written back unless the property was removed
    /// while the getter ran.
    pub fn native_get(&mut self, receiver: ObjectRef, prop: &PropertyRef) -> Result<Value> {
        let shape = &prop.shape;
        let mut value = match shape.slot {
            Some(slot) => self.slot(prop.holder, slot)?,
            None => Value::Undefined,
        };
        if shape.has_default_getter() && !shape.has_getter_value() {
            return Ok(value);
        }
        let epoch = self.rt.property_removals();
        self.call_getter(receiver, prop.holder, shape, &mut value)?;
        if let Some(slot) = shape.slot {
            self.write_back(prop.holder, prop.shape_id, shape, slot, epoch, value.clone())?;
        }
        Ok(value)
    }

    /// Write a found own property. The setter runs first; its result is
    /// stored unless the property was removed meanwhile.
    pub fn native_set(&mut self, obj: ObjectRef, shape_id: ShapeId, shape: &Shape, value: Value) -> Result<()> {
        if shape.has_default_setter() && !shape.has_setter_value() {
            if let Some(slot) = shape.slot {
                self.set_slot(obj, slot, value)?;
            }
            return Ok(());
        }
        let mut value = value;
        let epoch = self.rt.property_removals();
        self.call_setter(obj, obj, shape, &mut value)?;
        if let Some(slot) = shape.slot {
            self.write_back(obj, shape_id, shape, slot, epoch, value)?;
        }
        Ok(())
    }

    fn write_back(
        &mut self,
        holder: ObjectRef,
        shape_id: ShapeId,
        shape: &Shape,
        slot: u32,
        epoch: u64,
        value: Value,
    ) -> Result<()> {
        let in_scope = {
            let o = self.heap.get(holder)?;
            (slot as usize) < o.slots.num_slots() && slot < o.scope.freeslot()
        };
        if !in_scope {
            return Ok(());
        }
        if self.rt.property_removals() != epoch && !self.scope_has(holder, &shape.id, shape_id)? {
            trace!(id = ?shape.id, "property removed by hook; dropping write");
            return Ok(());
        }
        self.set_slot(holder, slot, value)
    }

    fn call_getter(
        &mut self,
        receiver: ObjectRef,
        holder: ObjectRef,
        shape: &Shape,
        value: &mut Value,
    ) -> Result<()> {
        if shape.has_getter_value() {
            *value = match shape.getter {
                PropertyOp::Function(f) => self.call_function(&Value::Object(f), &Value::Object(receiver), &[])?,
                _ => Value::Undefined,
            };
            return Ok(());
        }
        let id = shape.user_id();
        match shape.getter {
            PropertyOp::Stub | PropertyOp::Function(_) => Ok(()),
            PropertyOp::Class => {
                let class = self.class_of(holder)?;
                class.get_property(self, receiver, &id, value)
            }
            PropertyOp::Native(op) => op(self, receiver, &id, value),
        }
    }

    fn call_setter(&mut self, receiver: ObjectRef, holder: ObjectRef, shape: &Shape, value: &mut Value) -> Result<()> {
        if shape.has_setter_value() {
            if let PropertyOp::Function(f) = shape.setter {
                self.call_function(&Value::Object(f), &Value::Object(receiver), std::slice::from_ref(value))?;
            }
            return Ok(());
        }
        let id = shape.user_id();
        match shape.setter {
            PropertyOp::Stub | PropertyOp::Function(_) => Ok(()),
            PropertyOp::Class => {
                let class = self.class_of(holder)?;
                class.set_property(self, receiver, &id, value)
            }
            PropertyOp::Native(op) => op(self, receiver, &id, value),
        }
    }

    /// Report a rejected write: a TypeError in strict mode, `Ok(false)`
    /// otherwise.
    pub(crate) fn reject_write(&self, err: TypeError) -> Result<bool> {
        if self.is_strict() {
            Err(err.into())
        } else {
            Ok(false)
        }
    }

    /// Set `obj[id] = value`.
    ///
    /// Own data properties are written in place. Inherited data properties
    /// are shadowed by a new own property; inherited slotless properties
    /// run their setter on `obj`. Returns `Ok(false)` for writes rejected
    /// outside strict mode.
    pub fn set_property(&mut self, obj: ObjectRef, id: &PropertyId, value: Value) -> Result<bool> {
        let obj = self.forward_with(obj)?;
        let found = self.lookup_property_with_flags(obj, id, ResolveFlags::QUALIFIED | ResolveFlags::ASSIGNING)?;

        let mut shadow = Shape::data(id.clone(), Attrs::ENUMERATE);
        let mut inherited_ops = false;
        if let Some(prop) = found {
            let shape = &prop.shape;
            let no_setter = shape.is_accessor_descriptor() && shape.setter_value().is_undefined();
            if no_setter {
                return self.reject_write(TypeError::GetterOnly);
            }
            if !shape.writable() {
                return self.reject_write(TypeError::ReadOnly(id.clone()));
            }
            if prop.holder == obj {
                self.native_set(obj, prop.shape_id, shape, value)?;
                return Ok(true);
            }
            if shape.attrs.contains(Attrs::SHARED) {
                if shape.has_default_setter() && !shape.has_setter_value() {
                    return Ok(true);
                }
                let mut value = value;
                self.call_setter(obj, prop.holder, shape, &mut value)?;
                return Ok(true);
            }
            if shape.flags.contains(ShapeFlags::HAS_SHORTID) {
                shadow.flags = ShapeFlags::HAS_SHORTID;
                shadow.shortid = shape.shortid;
                shadow.getter = shape.getter;
                shadow.setter = shape.setter;
                inherited_ops = true;
            }
        }

        if !self.object(obj)?.is_extensible() {
            return self.reject_write(TypeError::NotExtensible(self.describe(obj)?));
        }
        let class = self.class_of(obj)?;
        if !inherited_ops && class.flags().contains(ClassFlags::PROPERTY_OPS) {
            shadow.getter = PropertyOp::Class;
            shadow.setter = PropertyOp::Class;
        }
        let (shape_id, shape) = self.add_native_property(obj, shadow)?;
        let mut value = value;
        if let Err(e) = class.add_property(self, obj, id, &mut value) {
            self.remove_native_property(obj, id)?;
            return Err(e);
        }
        self.native_set(obj, shape_id, &shape, value)?;
        Ok(true)
    }

    /// Put `shape` into the scope of `obj`, making the scope mutable first.
    pub(crate) fn add_native_property(&mut self, obj: ObjectRef, shape: Shape) -> Result<(ShapeId, Shape)> {
        self.get_mutable_scope(obj)?;
        let growth = self.rt.options().slot_growth;
        let mut tree = self.rt.tree_mut();
        let o = self.heap.get_mut(obj)?;
        let scope = o
            .scope
            .as_own_mut()
            .ok_or_else(|| Error::internal("scope is not mutable"))?;
        let sid = scope.put_property(&mut tree, &mut o.slots, &growth, shape)?;
        let shape = tree
            .get(sid)
            .cloned()
            .ok_or_else(|| Error::internal("put returned a freed shape"))?;
        Ok((sid, shape))
    }

    /// Change attributes and accessors of the property at `shape_id`.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn change_native_property(
        &mut self,
        obj: ObjectRef,
        shape_id: ShapeId,
        attrs: Attrs,
        mask: Attrs,
        getter: PropertyOp,
        setter: PropertyOp,
    ) -> Result<(ShapeId, Shape)> {
        self.get_mutable_scope(obj)?;
        let growth = self.rt.options().slot_growth;
        let mut tree = self.rt.tree_mut();
        let o = self.heap.get_mut(obj)?;
        let scope = o
            .scope
            .as_own_mut()
            .ok_or_else(|| Error::internal("scope is not mutable"))?;
        let sid = scope.change_property(&mut tree, &mut o.slots, &growth, shape_id, attrs, mask, getter, setter)?;
        let shape = tree
            .get(sid)
            .cloned()
            .ok_or_else(|| Error::internal("change returned a freed shape"))?;
        Ok((sid, shape))
    }

    /// Remove `id` from the scope of `obj`, bumping the removal epoch.
    pub(crate) fn remove_native_property(&mut self, obj: ObjectRef, id: &PropertyId) -> Result<Option<Shape>> {
        let removed = {
            let mut tree = self.rt.tree_mut();
            let o = self.heap.get_mut(obj)?;
            match o.scope.as_own_mut() {
                Some(scope) => scope.remove_property(&mut tree, &mut o.slots, id)?,
                None => None,
            }
        };
        if removed.is_some() {
            self.rt.note_property_removal();
        }
        Ok(removed)
    }

    /// Short description of `obj` for error messages.
    pub(crate) fn describe(&self, obj: ObjectRef) -> Result<String> {
        Ok(format!("[object {}]", self.class_of(obj)?.name()))
    }
}
