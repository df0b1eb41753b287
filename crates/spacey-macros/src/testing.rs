// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Assertions used by the object model tests.
//!
//! Each macro evaluates to the inspected value so a test can keep going
//! with the unwrapped result.

/// Assert that a value matches a pattern, with an optional guard.
///
/// ```
/// use spacey_macros::assert_matches;
///
/// #[derive(Debug)]
/// enum Slot { Inline(usize), Dynamic(usize) }
///
/// assert_matches!(Slot::Inline(2), Slot::Inline(i) if i < 3);
/// ```
#[macro_export]
macro_rules! assert_matches {
    ($expr:expr, $pat:pat $(if $guard:expr)? $(,)?) => {
        match $expr {
            $pat $(if $guard)? => {}
            ref other => panic!(
                "`{}` does not match pattern `{}`: {:?}",
                stringify!($expr),
                stringify!($pat $(if $guard)?),
                other
            ),
        }
    };
}

/// Unwrap an `Err`, optionally checking it against a pattern.
///
/// The pattern is matched against a reference to the error, so match
/// variants without binding by value.
///
/// ```
/// use spacey_macros::assert_err;
///
/// #[derive(Debug)]
/// enum DefineError { NotExtensible, ReadOnly(&'static str) }
///
/// let r: Result<(), DefineError> = Err(DefineError::ReadOnly("length"));
/// assert_err!(r, DefineError::ReadOnly(_));
/// ```
#[macro_export]
macro_rules! assert_err {
    ($expr:expr $(,)?) => {
        match $expr {
            Ok(value) => panic!("`{}` unexpectedly succeeded: {:?}", stringify!($expr), value),
            Err(err) => err,
        }
    };
    ($expr:expr, $pat:pat $(,)?) => {{
        let err = $crate::assert_err!($expr);
        $crate::assert_matches!(&err, $pat);
        err
    }};
}

/// Unwrap a `Some`, panicking with the expression text on `None`.
///
/// ```
/// use spacey_macros::assert_some;
///
/// let shape = [3u32, 7].iter().find(|s| **s > 5);
/// assert_eq!(*assert_some!(shape), 7);
/// ```
#[macro_export]
macro_rules! assert_some {
    ($expr:expr $(,)?) => {
        match $expr {
            Some(value) => value,
            None => panic!("`{}` is None", stringify!($expr)),
        }
    };
}

#[cfg(test)]
mod tests {
    #[derive(Debug, PartialEq)]
    enum Lookup {
        Own(u32),
        Inherited { depth: usize },
        Missing,
    }

    #[test]
    fn test_assert_err_returns_error() {
        let r: Result<(), Lookup> = Err(Lookup::Inherited { depth: 2 });
        let e = assert_err!(r, Lookup::Inherited { .. });
        assert_eq!(e, Lookup::Inherited { depth: 2 });
    }

    #[test]
    #[should_panic(expected = "unexpectedly succeeded")]
    fn test_assert_err_on_ok() {
        let r: Result<Lookup, ()> = Ok(Lookup::Missing);
        assert_err!(r);
    }

    #[test]
    #[should_panic(expected = "does not match pattern")]
    fn test_assert_matches_guard_failure() {
        assert_matches!(Lookup::Own(1), Lookup::Own(n) if n > 1);
    }

    #[test]
    fn test_assert_some_unwraps() {
        assert_eq!(assert_some!(Some(Lookup::Missing)), Lookup::Missing);
    }
}
