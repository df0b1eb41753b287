// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Early-return macros for fallible property operations.

/// Return `Err` from the enclosing function.
///
/// The argument goes through `Into`, so a specific error kind converts into
/// the function's wider error type. A string literal or format string
/// builds a `String` first.
///
/// ```
/// use spacey_macros::bail;
///
/// #[derive(Debug, PartialEq)]
/// enum DefineError { Cyclic }
///
/// fn set_proto(obj: u32, proto: u32) -> Result<(), DefineError> {
///     if obj == proto {
///         bail!(DefineError::Cyclic);
///     }
///     Ok(())
/// }
///
/// assert_eq!(set_proto(1, 1), Err(DefineError::Cyclic));
/// ```
#[macro_export]
macro_rules! bail {
    ($msg:literal $(,)?) => {
        return Err($msg.into())
    };
    ($fmt:literal, $($arg:tt)*) => {
        return Err(format!($fmt, $($arg)*).into())
    };
    ($err:expr $(,)?) => {
        return Err($err.into())
    };
}

/// Return `Err` unless `cond` holds. Takes the same error forms as [`bail!`].
///
/// ```
/// use spacey_macros::ensure;
///
/// fn reserved_slot(index: u32, reserved: u32) -> Result<u32, String> {
///     ensure!(index < reserved, "slot {} out of range", index);
///     Ok(index)
/// }
///
/// assert_eq!(reserved_slot(1, 2), Ok(1));
/// assert!(reserved_slot(2, 2).is_err());
/// ```
#[macro_export]
macro_rules! ensure {
    ($cond:expr, $($err:tt)+) => {
        if !$cond {
            $crate::bail!($($err)+);
        }
    };
}

#[cfg(test)]
mod tests {
    #[derive(Debug, PartialEq)]
    enum WriteError {
        ReadOnly(&'static str),
        Other(String),
    }

    impl From<String> for WriteError {
        fn from(s: String) -> Self {
            WriteError::Other(s)
        }
    }

    impl From<&'static str> for WriteError {
        fn from(s: &'static str) -> Self {
            WriteError::Other(s.to_string())
        }
    }

    fn write(id: &'static str, writable: bool) -> Result<(), WriteError> {
        ensure!(writable, WriteError::ReadOnly(id));
        Ok(())
    }

    #[test]
    fn test_ensure_error_value() {
        assert_eq!(write("x", true), Ok(()));
        assert_eq!(write("length", false), Err(WriteError::ReadOnly("length")));
    }

    #[test]
    fn test_bail_literal_and_format() {
        fn literal() -> Result<(), WriteError> {
            bail!("not extensible");
        }
        fn formatted(slot: u32) -> Result<(), WriteError> {
            bail!("slot {} is reserved", slot);
        }

        assert_eq!(literal(), Err(WriteError::Other("not extensible".into())));
        assert_eq!(formatted(2), Err(WriteError::Other("slot 2 is reserved".into())));
    }
}
