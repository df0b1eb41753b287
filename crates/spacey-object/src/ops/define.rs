// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Property definition.

use super::descriptor::PropDesc;
use super::enumerate::EnumerateMode;
use super::lookup::PropertyRef;
use crate::builtins::array;
use crate::class::{ClassFlags, ObjectKind, OBJECT_CLASS};
use crate::context::Context;
use crate::error::{Result, TypeError};
use crate::id::{PropertyId, atoms};
use crate::object::ObjectRef;
use crate::shape::{Attrs, PropertyOp, Shape, ShapeFlags, ShapeId};
use crate::value::Value;
use spacey_macros::ensure;

fn reject(throw_error: bool, err: TypeError) -> Result<bool> {
    if throw_error { Err(err.into()) } else { Ok(false) }
}

impl Context {
    /// Define `id` on `obj` with the given value, accessors and attributes,
    /// replacing any own property of that id.
    pub fn define_property(
        &mut self,
        obj: ObjectRef,
        id: &PropertyId,
        value: Value,
        getter: PropertyOp,
        setter: PropertyOp,
        attrs: Attrs,
    ) -> Result<ShapeId> {
        self.define_native_property(obj, id, value, getter, setter, attrs, ShapeFlags::empty(), 0)
    }

    /// [`Context::define_property`] with shape flags and a short id.
    ///
    /// Defining one accessor half onto an existing accessor property keeps
    /// the other half. The class `add_property` hook runs afterwards; if it
    /// fails the property is removed again.
    #[allow(clippy::too_many_arguments)]
    pub fn define_native_property(
        &mut self,
        obj: ObjectRef,
        id: &PropertyId,
        value: Value,
        getter: PropertyOp,
        setter: PropertyOp,
        attrs: Attrs,
        flags: ShapeFlags,
        shortid: i32,
    ) -> Result<ShapeId> {
        let class = self.class_of(obj)?;
        ensure!(class.kind() != ObjectKind::With, TypeError::NotExtensible(self.describe(obj)?));

        let mut attrs = attrs;
        let (mut getter, mut setter) = (getter, setter);
        if attrs.intersects(Attrs::GETTER | Attrs::SETTER) {
            attrs |= Attrs::SHARED;
            if let Some((sid, existing)) = self.lookup_own_shape(obj, id)? {
                if existing.is_accessor_descriptor() {
                    if !attrs.contains(Attrs::GETTER) {
                        getter = existing.getter;
                    }
                    if !attrs.contains(Attrs::SETTER) {
                        setter = existing.setter;
                    }
                    let mask = Attrs::GETTER | Attrs::SETTER;
                    let (sid, _) = self.change_native_property(obj, sid, attrs, mask, getter, setter)?;
                    return Ok(sid);
                }
            }
        }

        if class.flags().contains(ClassFlags::PROPERTY_OPS) {
            if getter.is_stub() && !attrs.contains(Attrs::GETTER) {
                getter = PropertyOp::Class;
            }
            if setter.is_stub() && !attrs.contains(Attrs::SETTER) {
                setter = PropertyOp::Class;
            }
        }

        let shape = Shape {
            id: id.clone(),
            getter,
            setter,
            slot: None,
            attrs,
            flags,
            shortid,
        };
        let (sid, shape) = self.add_native_property(obj, shape)?;
        let mut value = value;
        if let Err(e) = class.add_property(self, obj, id, &mut value) {
            self.remove_native_property(obj, id)?;
            return Err(e);
        }
        if let Some(slot) = shape.slot {
            self.set_slot(obj, slot, value)?;
        }
        Ok(sid)
    }

    /// [[DefineOwnProperty]] (ES5 8.12.9, and 15.4.5.1 for arrays).
    ///
    /// Incompatible redefinitions return `Ok(false)`, or a TypeError when
    /// `throw_error` is set.
    pub fn define_own_property(
        &mut self,
        obj: ObjectRef,
        id: &PropertyId,
        desc: &PropDesc,
        throw_error: bool,
    ) -> Result<bool> {
        if self.kind_of(obj)? == ObjectKind::Array {
            return self.define_own_array_property(obj, id, desc, throw_error);
        }
        self.define_own_plain_property(obj, id, desc, throw_error)
    }

    fn define_own_array_property(
        &mut self,
        obj: ObjectRef,
        id: &PropertyId,
        desc: &PropDesc,
        throw_error: bool,
    ) -> Result<bool> {
        if id.is_atom(atoms::LENGTH) {
            return Err(TypeError::DefineArrayLength.into());
        }
        let Some(index) = id.as_index() else {
            return self.define_own_plain_property(obj, id, desc, throw_error);
        };
        if !self.define_own_plain_property(obj, id, desc, false)? {
            return reject(throw_error, TypeError::CantDefineArrayIndex);
        }
        array::ensure_length(self, obj, index.saturating_add(1))?;
        Ok(true)
    }

    fn define_own_plain_property(
        &mut self,
        obj: ObjectRef,
        id: &PropertyId,
        desc: &PropDesc,
        throw_error: bool,
    ) -> Result<bool> {
        let current = self
            .lookup_property(obj, id)?
            .filter(|prop| prop.holder == obj);

        let Some(prop) = current else {
            if !self.object(obj)?.is_extensible() {
                return reject(throw_error, TypeError::NotExtensible(self.describe(obj)?));
            }
            let attrs = desc.attrs();
            if desc.is_accessor_descriptor() {
                self.define_property(obj, id, Value::Undefined, desc.getter_op(), desc.setter_op(), attrs)?;
            } else {
                let value = desc.value.clone().unwrap_or_default();
                self.define_property(obj, id, value, PropertyOp::Stub, PropertyOp::Stub, attrs)?;
            }
            return Ok(true);
        };

        if desc.is_empty() || self.descriptor_matches(obj, &prop, desc)? {
            return Ok(true);
        }

        let shape = &prop.shape;
        let cant_redefine = || TypeError::CantRedefineProperty(id.clone());
        if !shape.configurable() {
            if desc.configurable == Some(true) {
                return reject(throw_error, cant_redefine());
            }
            if desc.enumerable.is_some_and(|e| e != shape.enumerable()) {
                return reject(throw_error, cant_redefine());
            }
        }

        if desc.is_generic_descriptor() {
            // attributes only
        } else if desc.is_data_descriptor() != shape.is_data_descriptor() {
            if !shape.configurable() {
                return reject(throw_error, cant_redefine());
            }
        } else if desc.is_data_descriptor() {
            if !shape.configurable() && !shape.writable() {
                if desc.writable == Some(true) {
                    return reject(throw_error, cant_redefine());
                }
                if let Some(v) = &desc.value {
                    let current = self.native_get(obj, &prop)?;
                    if !v.same_value(&current) {
                        return reject(throw_error, cant_redefine());
                    }
                }
            }
        } else if !shape.configurable() {
            let setter_differs = desc.set.as_ref().is_some_and(|s| !s.same_value(&shape.setter_value()));
            let getter_differs = desc.get.as_ref().is_some_and(|g| !g.same_value(&shape.getter_value()));
            if setter_differs || getter_differs {
                return reject(throw_error, cant_redefine());
            }
        }

        self.apply_descriptor(obj, &prop, desc)?;
        Ok(true)
    }

    fn descriptor_matches(&mut self, obj: ObjectRef, prop: &PropertyRef, desc: &PropDesc) -> Result<bool> {
        let shape = &prop.shape;
        if desc.enumerable.is_some_and(|e| e != shape.enumerable()) {
            return Ok(false);
        }
        if desc.configurable.is_some_and(|c| c != shape.configurable()) {
            return Ok(false);
        }
        if desc.is_accessor_descriptor() {
            if !shape.is_accessor_descriptor() {
                return Ok(false);
            }
            if desc.get.as_ref().is_some_and(|g| !g.same_value(&shape.getter_value())) {
                return Ok(false);
            }
            if desc.set.as_ref().is_some_and(|s| !s.same_value(&shape.setter_value())) {
                return Ok(false);
            }
        }
        if desc.is_data_descriptor() {
            if shape.is_accessor_descriptor() {
                return Ok(false);
            }
            if desc.writable.is_some_and(|w| w != shape.writable()) {
                return Ok(false);
            }
            if let Some(v) = &desc.value {
                if !v.same_value(&self.native_get(obj, prop)?) {
                    return Ok(false);
                }
            }
        }
        Ok(true)
    }

    fn apply_descriptor(&mut self, obj: ObjectRef, prop: &PropertyRef, desc: &PropDesc) -> Result<()> {
        let shape = &prop.shape;
        let accessor_bits = Attrs::GETTER | Attrs::SETTER | Attrs::SHARED;
        let mut attrs;
        let (getter, setter);

        if desc.is_generic_descriptor() {
            attrs = shape.attrs;
            getter = shape.getter;
            setter = shape.setter;
        } else if desc.is_data_descriptor() {
            if shape.is_accessor_descriptor() {
                attrs = shape.attrs.without(accessor_bits) | Attrs::READONLY;
                getter = PropertyOp::Stub;
                setter = PropertyOp::Stub;
            } else {
                attrs = shape.attrs;
                getter = shape.getter;
                setter = shape.setter;
            }
            if let Some(w) = desc.writable {
                attrs.set(Attrs::READONLY, !w);
            }
        } else {
            attrs = if shape.is_accessor_descriptor() {
                shape.attrs
            } else {
                shape.attrs.without(Attrs::READONLY)
            };
            attrs |= Attrs::SHARED;
            let keep = shape.is_accessor_descriptor();
            getter = match &desc.get {
                Some(_) => {
                    attrs |= Attrs::GETTER;
                    desc.getter_op()
                }
                None if keep => shape.getter,
                None => PropertyOp::Stub,
            };
            setter = match &desc.set {
                Some(_) => {
                    attrs |= Attrs::SETTER;
                    desc.setter_op()
                }
                None if keep => shape.setter,
                None => PropertyOp::Stub,
            };
        }
        if let Some(e) = desc.enumerable {
            attrs.set(Attrs::ENUMERATE, e);
        }
        if let Some(c) = desc.configurable {
            attrs.set(Attrs::PERMANENT, !c);
        }

        let (sid, changed) =
            self.change_native_property(obj, prop.shape_id, attrs, Attrs::empty(), getter, setter)?;
        if let Some(value) = &desc.value {
            match changed.slot {
                Some(slot) => self.set_slot(obj, slot, value.clone())?,
                None => self.native_set(obj, sid, &changed, value.clone())?,
            }
        }
        Ok(())
    }

    /// Define every own enumerable property of `props` on `obj`. All
    /// descriptors are parsed before any is applied.
    pub fn define_properties(&mut self, obj: ObjectRef, props: ObjectRef) -> Result<()> {
        let ids = self.enumerate(props, EnumerateMode::OwnEnumerable)?;
        let mut descs = Vec::with_capacity(ids.len());
        for id in ids {
            let v = self.get_property(props, &id)?;
            descs.push((id, PropDesc::from_object(self, &v)?));
        }
        for (id, desc) in descs {
            self.define_own_property(obj, &id, &desc, true)?;
        }
        Ok(())
    }

    /// Own property descriptor of `obj[id]`.
    pub fn get_own_property_descriptor(&mut self, obj: ObjectRef, id: &PropertyId) -> Result<Option<PropDesc>> {
        let Some(prop) = self.lookup_property(obj, id)?.filter(|p| p.holder == obj) else {
            return Ok(None);
        };
        let shape = &prop.shape;
        let mut desc = if shape.is_accessor_descriptor() {
            PropDesc::accessor(Some(shape.getter_value()), Some(shape.setter_value()))
        } else {
            PropDesc::data(self.native_get(obj, &prop)?).with_writable(shape.writable())
        };
        desc.enumerable = Some(shape.enumerable());
        desc.configurable = Some(shape.configurable());
        Ok(Some(desc))
    }

    /// FromPropertyDescriptor (ES5 8.10.4): the script-visible object for
    /// `desc`, or undefined.
    pub fn from_property_descriptor(&mut self, desc: Option<&PropDesc>) -> Result<Value> {
        let Some(desc) = desc else {
            return Ok(Value::Undefined);
        };
        let obj = self.new_object(&OBJECT_CLASS, None, None)?;
        let mut fields: Vec<(&str, Value)> = Vec::new();
        if desc.is_accessor_descriptor() {
            fields.push((atoms::GET, desc.get.clone().unwrap_or_default()));
            fields.push((atoms::SET, desc.set.clone().unwrap_or_default()));
        } else {
            fields.push((atoms::VALUE, desc.value.clone().unwrap_or_default()));
            fields.push((atoms::WRITABLE, desc.writable.unwrap_or(false).into()));
        }
        fields.push((atoms::ENUMERABLE, desc.enumerable.unwrap_or(false).into()));
        fields.push((atoms::CONFIGURABLE, desc.configurable.unwrap_or(false).into()));
        for (name, value) in fields {
            let attrs = Attrs::ENUMERATE;
            self.define_property(obj, &PropertyId::atom(name), value, PropertyOp::Stub, PropertyOp::Stub, attrs)?;
        }
        Ok(Value::Object(obj))
    }

    /// Attributes of `obj[id]`, own or inherited.
    pub fn get_attributes(&mut self, obj: ObjectRef, id: &PropertyId) -> Result<Option<Attrs>> {
        Ok(self.lookup_property(obj, id)?.map(|p| p.shape.attrs))
    }

    /// Replace the attributes of own property `obj[id]`, keeping its
    /// accessor bits. Returns false if there is no such own property.
    pub fn set_attributes(&mut self, obj: ObjectRef, id: &PropertyId, attrs: Attrs) -> Result<bool> {
        let Some((sid, shape)) = self.lookup_own_shape(obj, id)? else {
            return Ok(false);
        };
        let accessor_bits = Attrs::GETTER | Attrs::SETTER | Attrs::SHARED;
        let mask = if shape.is_accessor_descriptor() {
            shape.attrs & accessor_bits
        } else {
            Attrs::empty()
        };
        let attrs = attrs.without(Attrs::GETTER | Attrs::SETTER);
        self.change_native_property(obj, sid, attrs, mask, shape.getter, shape.setter)?;
        Ok(true)
    }
}
