// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Name resolution along the scope chain.
//!
//! The scope chain is the parent chain starting at the innermost scope
//! object: block objects, with objects, then the global.

use super::lookup::PropertyRef;
use crate::class::ResolveFlags;
use crate::context::Context;
use crate::error::{Error, Result};
use crate::id::PropertyId;
use crate::object::ObjectRef;
use crate::value::Value;

impl Context {
    /// Find the scope object binding `id`, starting at `scope_chain`.
    /// Returns the scope object and the property found through it.
    pub fn find_property(
        &mut self,
        scope_chain: ObjectRef,
        id: &PropertyId,
    ) -> Result<Option<(ObjectRef, PropertyRef)>> {
        let mut cur = Some(scope_chain);
        while let Some(obj) = cur {
            if let Some(prop) = self.lookup_property_with_flags(obj, id, ResolveFlags::empty())? {
                return Ok(Some((obj, prop)));
            }
            cur = self.get_parent(obj)?;
        }
        Ok(None)
    }

    /// The scope object an assignment to `id` should target: the one
    /// binding it, or the outermost object on the chain.
    pub fn find_identifier_base(&mut self, scope_chain: ObjectRef, id: &PropertyId) -> Result<ObjectRef> {
        if let Some((obj, _)) = self.find_property(scope_chain, id)? {
            return Ok(obj);
        }
        let mut last = scope_chain;
        while let Some(parent) = self.get_parent(last)? {
            last = parent;
        }
        Ok(last)
    }

    /// Read the binding of `id`. Unbound names are a ReferenceError.
    pub fn get_name(&mut self, scope_chain: ObjectRef, id: &PropertyId) -> Result<Value> {
        match self.find_property(scope_chain, id)? {
            Some((obj, _)) => self.get_property(obj, id),
            None => Err(Error::Reference(id.to_string())),
        }
    }

    /// Assign the binding of `id`, creating it on the outermost scope
    /// object when unbound.
    pub fn set_name(&mut self, scope_chain: ObjectRef, id: &PropertyId, value: Value) -> Result<bool> {
        let base = self.find_identifier_base(scope_chain, id)?;
        self.set_property(base, id, value)
    }
}
