// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Property deletion.

use crate::context::Context;
use crate::error::Result;
use crate::id::PropertyId;
use crate::object::ObjectRef;
use crate::value::Value;
use tracing::trace;

/// Outcome of [`Context::delete_property`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deletion {
    /// An own property was removed.
    Removed,
    /// There was no own property to remove.
    NotFound,
    /// The property is permanent, or a class hook refused.
    Refused,
}

impl Deletion {
    /// True if a property was actually removed.
    pub fn removed(self) -> bool {
        self == Deletion::Removed
    }

    /// The script-visible result of `delete`: false only when refused.
    pub fn succeeded(self) -> bool {
        self != Deletion::Refused
    }
}

impl Context {
    /// Delete own property `obj[id]`.
    ///
    /// Inherited properties are left alone, but the class `del_property`
    /// hook of `obj` still runs; shared permanent properties found on a
    /// prototype refuse outright.
    pub fn delete_property(&mut self, obj: ObjectRef, id: &PropertyId) -> Result<Deletion> {
        let obj = self.forward_with(obj)?;
        let class = self.class_of(obj)?;
        let found = self.lookup_property(obj, id)?;

        let prop = match found {
            Some(prop) if prop.holder == obj => prop,
            other => {
                if other.is_some_and(|p| p.shape.is_shared_permanent()) {
                    return Ok(Deletion::Refused);
                }
                return Ok(if class.del_property(self, obj, id)? {
                    Deletion::NotFound
                } else {
                    Deletion::Refused
                });
            }
        };

        if !prop.shape.configurable() {
            return Ok(Deletion::Refused);
        }
        if !class.del_property(self, obj, id)? {
            return Ok(Deletion::Refused);
        }

        if let Some(slot) = prop.shape.slot {
            if let Value::Object(_) = self.slot(obj, slot)? {
                self.poke_gc();
            }
        }
        self.remove_native_property(obj, id)?;
        trace!(obj = ?obj, id = ?id, "deleted property");
        Ok(Deletion::Removed)
    }
}
