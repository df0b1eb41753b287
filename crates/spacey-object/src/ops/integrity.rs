// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Prototype links and object integrity levels.

use crate::class::AccessMode;
use crate::context::Context;
use crate::error::{Result, TypeError};
use crate::id::PropertyId;
use crate::object::{ObjectFlags, ObjectRef};
use crate::shape::Attrs;
use spacey_macros::{bail, ensure};
use tracing::debug;

const PROTO_ID: &str = "__proto__";

impl Context {
    /// Set the prototype of `obj`, refusing cycles.
    pub fn set_proto(&mut self, obj: ObjectRef, proto: Option<ObjectRef>) -> Result<()> {
        let id = PropertyId::atom(PROTO_ID);
        let allowed = self.check_access(obj, &id, AccessMode::Proto)?;
        ensure!(allowed, TypeError::AccessDenied(id));
        let mut cur = proto;
        while let Some(p) = cur {
            if p == obj {
                bail!(TypeError::CyclicProto);
            }
            cur = self.get_proto(p)?;
        }
        if let Some(p) = proto {
            self.mark_delegate(p)?;
        }
        self.object_mut(obj)?.proto = proto;
        Ok(())
    }

    /// True if `proto` is on the prototype chain of `obj`.
    pub fn is_prototype_of(&self, proto: ObjectRef, obj: ObjectRef) -> Result<bool> {
        let mut cur = self.get_proto(obj)?;
        while let Some(p) = cur {
            if p == proto {
                return Ok(true);
            }
            cur = self.get_proto(p)?;
        }
        Ok(false)
    }

    /// True if properties may be added to `obj`.
    pub fn is_extensible(&self, obj: ObjectRef) -> Result<bool> {
        Ok(self.object(obj)?.is_extensible())
    }

    /// Forbid adding properties to `obj`.
    pub fn prevent_extensions(&mut self, obj: ObjectRef) -> Result<()> {
        self.object_mut(obj)?.flags.insert(ObjectFlags::NOT_EXTENSIBLE);
        Ok(())
    }

    /// Make `obj` non-extensible and every own property permanent.
    pub fn seal(&mut self, obj: ObjectRef) -> Result<()> {
        self.set_integrity(obj, false)
    }

    /// Seal `obj` and make its own data properties read-only.
    pub fn freeze(&mut self, obj: ObjectRef) -> Result<()> {
        self.set_integrity(obj, true)
    }

    /// True if `obj` is non-extensible with only permanent own properties.
    pub fn is_sealed(&self, obj: ObjectRef) -> Result<bool> {
        self.test_integrity(obj, false)
    }

    /// True if `obj` is sealed and its own data properties are read-only.
    pub fn is_frozen(&self, obj: ObjectRef) -> Result<bool> {
        self.test_integrity(obj, true)
    }

    fn set_integrity(&mut self, obj: ObjectRef, freeze: bool) -> Result<()> {
        self.prevent_extensions(obj)?;
        if freeze {
            self.object_mut(obj)?.flags.insert(ObjectFlags::FROZEN);
        }
        for shape in self.own_shapes(obj)? {
            let mut attrs = shape.attrs | Attrs::PERMANENT;
            if freeze && shape.is_data_descriptor() {
                attrs |= Attrs::READONLY;
            }
            if attrs == shape.attrs {
                continue;
            }
            self.set_attributes(obj, &shape.id, attrs)?;
        }
        debug!(obj = ?obj, freeze, "sealed object");
        Ok(())
    }

    fn test_integrity(&self, obj: ObjectRef, frozen: bool) -> Result<bool> {
        if self.is_extensible(obj)? {
            return Ok(false);
        }
        Ok(self.own_shapes(obj)?.iter().all(|s| {
            !s.configurable() && (!frozen || s.is_accessor_descriptor() || !s.writable())
        }))
    }
}
