// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Property descriptors (ES5 8.10).

use crate::context::Context;
use crate::error::{Result, TypeError};
use crate::id::{PropertyId, atoms};
use crate::object::ObjectRef;
use crate::shape::{Attrs, PropertyOp};
use crate::value::Value;

/// A parsed property descriptor. Absent fields are `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropDesc {
    /// `value`
    pub value: Option<Value>,
    /// `writable`
    pub writable: Option<bool>,
    /// `get`
    pub get: Option<Value>,
    /// `set`
    pub set: Option<Value>,
    /// `enumerable`
    pub enumerable: Option<bool>,
    /// `configurable`
    pub configurable: Option<bool>,
}

impl PropDesc {
    /// An empty (generic) descriptor.
    pub fn new() -> Self {
        Self::default()
    }

    /// A data descriptor with only `value` present.
    pub fn data(value: Value) -> Self {
        Self {
            value: Some(value),
            ..Self::default()
        }
    }

    /// An accessor descriptor.
    pub fn accessor(get: Option<Value>, set: Option<Value>) -> Self {
        Self {
            get,
            set,
            ..Self::default()
        }
    }

    /// Set `value`.
    pub fn with_value(mut self, value: Value) -> Self {
        self.value = Some(value);
        self
    }

    /// Set `writable`.
    pub fn with_writable(mut self, writable: bool) -> Self {
        self.writable = Some(writable);
        self
    }

    /// Set `enumerable`.
    pub fn with_enumerable(mut self, enumerable: bool) -> Self {
        self.enumerable = Some(enumerable);
        self
    }

    /// Set `configurable`.
    pub fn with_configurable(mut self, configurable: bool) -> Self {
        self.configurable = Some(configurable);
        self
    }

    /// Set `get`.
    pub fn with_get(mut self, get: Value) -> Self {
        self.get = Some(get);
        self
    }

    /// Set `set`.
    pub fn with_set(mut self, set: Value) -> Self {
        self.set = Some(set);
        self
    }

    /// IsAccessorDescriptor.
    pub fn is_accessor_descriptor(&self) -> bool {
        self.get.is_some() || self.set.is_some()
    }

    /// IsDataDescriptor.
    pub fn is_data_descriptor(&self) -> bool {
        self.value.is_some() || self.writable.is_some()
    }

    /// IsGenericDescriptor.
    pub fn is_generic_descriptor(&self) -> bool {
        !self.is_accessor_descriptor() && !self.is_data_descriptor()
    }

    /// True if no field is present.
    pub fn is_empty(&self) -> bool {
        self.is_generic_descriptor() && self.enumerable.is_none() && self.configurable.is_none()
    }

    /// Attributes for a new property. Absent booleans default to false,
    /// so a bare descriptor yields a read-only, permanent property.
    pub fn attrs(&self) -> Attrs {
        let mut attrs = Attrs::empty();
        if self.enumerable.unwrap_or(false) {
            attrs |= Attrs::ENUMERATE;
        }
        if !self.configurable.unwrap_or(false) {
            attrs |= Attrs::PERMANENT;
        }
        if self.is_accessor_descriptor() {
            attrs |= Attrs::SHARED;
            if self.get.is_some() {
                attrs |= Attrs::GETTER;
            }
            if self.set.is_some() {
                attrs |= Attrs::SETTER;
            }
        } else if !self.writable.unwrap_or(false) {
            attrs |= Attrs::READONLY;
        }
        attrs
    }

    /// Getter op for `get`.
    pub fn getter_op(&self) -> PropertyOp {
        accessor_op(self.get.as_ref())
    }

    /// Setter op for `set`.
    pub fn setter_op(&self) -> PropertyOp {
        accessor_op(self.set.as_ref())
    }

    /// ToPropertyDescriptor (ES5 8.10.5).
    pub fn from_object(cx: &mut Context, desc: &Value) -> Result<PropDesc> {
        let Some(obj) = desc.as_object() else {
            return Err(TypeError::NotNonNullObject(desc.to_string()).into());
        };
        let mut pd = PropDesc::new();
        if let Some(v) = field(cx, obj, atoms::ENUMERABLE)? {
            pd.enumerable = Some(v.to_boolean());
        }
        if let Some(v) = field(cx, obj, atoms::CONFIGURABLE)? {
            pd.configurable = Some(v.to_boolean());
        }
        pd.value = field(cx, obj, atoms::VALUE)?;
        if let Some(v) = field(cx, obj, atoms::WRITABLE)? {
            pd.writable = Some(v.to_boolean());
        }
        if let Some(v) = field(cx, obj, atoms::GET)? {
            if !v.is_undefined() && !cx.is_callable(&v)? {
                return Err(TypeError::BadGetterOrSetter("getter").into());
            }
            pd.get = Some(v);
        }
        if let Some(v) = field(cx, obj, atoms::SET)? {
            if !v.is_undefined() && !cx.is_callable(&v)? {
                return Err(TypeError::BadGetterOrSetter("setter").into());
            }
            pd.set = Some(v);
        }
        if pd.is_accessor_descriptor() && pd.is_data_descriptor() {
            return Err(TypeError::InvalidDescriptor.into());
        }
        Ok(pd)
    }
}

fn accessor_op(v: Option<&Value>) -> PropertyOp {
    match v.and_then(Value::as_object) {
        Some(f) => PropertyOp::Function(f),
        None => PropertyOp::Stub,
    }
}

fn field(cx: &mut Context, obj: ObjectRef, name: &str) -> Result<Option<Value>> {
    let id = PropertyId::atom(name);
    if !cx.has_property(obj, &id)? {
        return Ok(None);
    }
    cx.get_property(obj, &id).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_attrs() {
        let attrs = PropDesc::data(Value::from(1)).attrs();
        assert_eq!(attrs, Attrs::READONLY | Attrs::PERMANENT);

        let attrs = PropDesc::data(Value::from(1))
            .with_writable(true)
            .with_enumerable(true)
            .with_configurable(true)
            .attrs();
        assert_eq!(attrs, Attrs::ENUMERATE);
    }

    #[test]
    fn test_accessor_attrs() {
        let attrs = PropDesc::accessor(Some(Value::Undefined), None).attrs();
        assert_eq!(attrs, Attrs::GETTER | Attrs::SHARED | Attrs::PERMANENT);
    }

    #[test]
    fn test_descriptor_kinds() {
        assert!(PropDesc::new().is_generic_descriptor());
        assert!(PropDesc::new().is_empty());
        assert!(!PropDesc::new().with_enumerable(true).is_empty());
        assert!(PropDesc::new().with_writable(false).is_data_descriptor());
        assert!(PropDesc::new().with_set(Value::Undefined).is_accessor_descriptor());
    }
}
