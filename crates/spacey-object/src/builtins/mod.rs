// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Standard classes.
//!
//! Each class is initialised lazily the first time its name or prototype
//! is needed:
//! - `Object` and `Function` (bootstrapped together)
//! - `Array`, `Date`, `RegExp`

pub mod array;
pub mod date;
pub mod function;
pub mod global;
pub mod object;
pub mod regexp;

use crate::class::ProtoKey;
use crate::context::Context;
use crate::error::{Result, TypeError};
use crate::object::ObjectRef;
use crate::value::Value;

/// Initialise the standard class for `key`.
pub(crate) fn init_for_key(cx: &mut Context, key: ProtoKey) -> Result<()> {
    match key {
        ProtoKey::Null => Ok(()),
        ProtoKey::Object | ProtoKey::Function => object::init(cx),
        ProtoKey::Array => array::init(cx),
        ProtoKey::Date => date::init(cx),
        ProtoKey::RegExp => regexp::init(cx),
    }
}

impl Context {
    /// Initialise every standard class now.
    pub fn init_standard_classes(&mut self) -> Result<()> {
        for key in ProtoKey::ALL {
            self.get_class_object(key)?;
        }
        Ok(())
    }
}

/// The object argument of a native that requires one.
pub(crate) fn object_arg(value: &Value) -> Result<ObjectRef> {
    value
        .as_object()
        .ok_or_else(|| TypeError::NotNonNullObject(value.to_string()).into())
}
