// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Error types for the object model.

use crate::id::PropertyId;
use crate::value::Value;
use thiserror::Error;

/// Result type for object model operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by object model operations.
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// Slot or shape allocation failed. Fatal to the current operation.
    #[error("out of memory")]
    OutOfMemory,

    /// An ECMAScript invariant was violated.
    #[error("TypeError: {0}")]
    Type(#[from] TypeError),

    /// An unbound name was read through the scope chain.
    #[error("ReferenceError: {0} is not defined")]
    Reference(String),

    /// Hook re-entry exceeded the native depth limit.
    #[error("InternalError: too much recursion")]
    TooMuchRecursion,

    /// A value thrown by a native function.
    #[error("uncaught exception: {0}")]
    Exception(Value),

    /// Misuse of the embedding API, such as a dangling object handle.
    #[error("InternalError: {0}")]
    Internal(String),
}

/// TypeError message kinds.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TypeError {
    /// Adding a property to a non-extensible object.
    #[error("{0} is not extensible")]
    NotExtensible(String),

    /// Incompatible redefinition of a non-configurable property.
    #[error("can't redefine non-configurable property '{0}'")]
    CantRedefineProperty(PropertyId),

    /// Strict-mode write to a read-only property.
    #[error("{0} is read-only")]
    ReadOnly(PropertyId),

    /// Strict-mode write to an accessor without a setter.
    #[error("setting a property that has only a getter")]
    GetterOnly,

    /// A descriptor mixing accessor and data fields.
    #[error("property descriptors must not specify a value or be writable when a getter or setter has been specified")]
    InvalidDescriptor,

    /// A non-callable `get` or `set` field.
    #[error("{0} field of property descriptor is not a function")]
    BadGetterOrSetter(&'static str),

    /// A primitive passed where an object is required.
    #[error("{0} is not a non-null object")]
    NotNonNullObject(String),

    /// `Object.defineProperty` on an array's length.
    #[error("defining the length property on an array is not currently supported")]
    DefineArrayLength,

    /// A rejected definition of an array index.
    #[error("can't define array index property")]
    CantDefineArrayIndex,

    /// Setting a prototype that would create a cycle.
    #[error("cyclic __proto__ value")]
    CyclicProto,

    /// Calling a non-callable value.
    #[error("{0} is not a function")]
    NotFunction(String),

    /// Constructing with a non-constructor.
    #[error("{0} is not a constructor")]
    NotConstructor(String),

    /// A native called with an object of the wrong class.
    #[error("{method} called on incompatible {class}")]
    IncompatibleObject {
        /// Method name.
        method: &'static str,
        /// Class of the receiver.
        class: &'static str,
    },

    /// A class hook denied access.
    #[error("permission denied to access property '{0}'")]
    AccessDenied(PropertyId),
}

impl Error {
    /// Build an internal error from a message.
    pub fn internal(msg: impl Into<String>) -> Self {
        Error::Internal(msg.into())
    }

    /// True for errors that abort the whole engine instance.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::OutOfMemory)
    }

    /// True for TypeError conditions.
    pub fn is_type_error(&self) -> bool {
        matches!(self, Error::Type(_))
    }
}

impl From<std::collections::TryReserveError> for Error {
    fn from(_: std::collections::TryReserveError) -> Self {
        Error::OutOfMemory
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::from(TypeError::CantRedefineProperty(PropertyId::from("x")));
        assert_eq!(err.to_string(), "TypeError: can't redefine non-configurable property 'x'");
        assert!(err.is_type_error());
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_out_of_memory_is_fatal() {
        let mut v: Vec<u64> = Vec::new();
        let err: Error = v.try_reserve(usize::MAX).unwrap_err().into();
        assert!(err.is_fatal());
        assert_eq!(err.to_string(), "out of memory");
    }

    #[test]
    fn test_reference_error() {
        assert_eq!(
            Error::Reference("zork".into()).to_string(),
            "ReferenceError: zork is not defined"
        );
    }
}
