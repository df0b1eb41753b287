// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Enumeration and presence tests.

use crate::class::same_class;
use crate::context::Context;
use crate::error::Result;
use crate::id::PropertyId;
use crate::object::ObjectRef;
use crate::shape::Shape;

/// Which own properties [`Context::enumerate`] reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumerateMode {
    /// Enumerable own properties.
    OwnEnumerable,
    /// Every own property, hidden ones included.
    OwnAll,
}

impl Context {
    /// Own property ids of `obj` in insertion order. A class enumerate
    /// hook may replace the walk entirely.
    pub fn enumerate(&mut self, obj: ObjectRef, mode: EnumerateMode) -> Result<Vec<PropertyId>> {
        let obj = self.forward_with(obj)?;
        let class = self.class_of(obj)?;
        if let Some(ids) = class.enumerate(self, obj)? {
            return Ok(ids);
        }
        Ok(self
            .own_shapes(obj)?
            .into_iter()
            .filter(|s| mode == EnumerateMode::OwnAll || s.enumerable())
            .map(|s| s.id)
            .collect())
    }

    /// Own shapes of `obj` in insertion order.
    pub fn own_shapes(&self, obj: ObjectRef) -> Result<Vec<Shape>> {
        let o = self.heap.get(obj)?;
        let Some(scope) = o.scope.as_own() else {
            return Ok(Vec::new());
        };
        let tree = self.rt.tree();
        Ok(scope.shapes(&tree).into_iter().map(|(_, s)| s).collect())
    }

    /// True if `obj` or a prototype has `id`.
    pub fn has_property(&mut self, obj: ObjectRef, id: &PropertyId) -> Result<bool> {
        Ok(self.lookup_property(obj, id)?.is_some())
    }

    /// True if `obj` has own property `id`. A shared permanent property on
    /// a prototype of the same class counts as own, since it stands in for
    /// a per-instance property.
    pub fn has_own_property(&mut self, obj: ObjectRef, id: &PropertyId) -> Result<bool> {
        let obj = self.forward_with(obj)?;
        let Some(prop) = self.lookup_property(obj, id)? else {
            return Ok(false);
        };
        if prop.holder == obj {
            return Ok(true);
        }
        if !prop.shape.is_shared_permanent() {
            return Ok(false);
        }
        let (a, b) = (self.class_of(obj)?, self.class_of(prop.holder)?);
        Ok(same_class(a, b))
    }
}
