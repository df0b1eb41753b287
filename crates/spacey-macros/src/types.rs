// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Type definition macros.

/// Assert at compile time, typically a slot layout constraint.
///
/// ```
/// use spacey_macros::const_assert;
///
/// const INLINE_SLOTS: usize = 3;
/// const PRIVATE_SLOT: usize = 2;
/// const_assert!(PRIVATE_SLOT < INLINE_SLOTS, "private slot must be inline");
/// ```
#[macro_export]
macro_rules! const_assert {
    ($cond:expr) => {
        const _: () = assert!($cond);
    };
    ($cond:expr, $msg:literal) => {
        const _: () = assert!($cond, $msg);
    };
}

/// An enum with a fixed integer repr, convertible back with `TryFrom`.
///
/// The enum also gains `COUNT` and `ALL`, so reserved-slot tables can be
/// sized and walked by it.
///
/// ```
/// use spacey_macros::int_enum;
///
/// int_enum! {
///     #[derive(Debug, Clone, Copy, PartialEq)]
///     pub enum Key: u8 {
///         Object = 0,
///         Function = 1,
///         Array = 2,
///     }
/// }
///
/// assert_eq!(Key::Function as u8, 1);
/// assert_eq!(Key::try_from(2u8), Ok(Key::Array));
/// assert_eq!(Key::COUNT, 3);
/// assert_eq!(Key::ALL[1], Key::Function);
/// ```
#[macro_export]
macro_rules! int_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident : $repr:ty {
            $($(#[$vmeta:meta])* $variant:ident = $value:expr),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[repr($repr)]
        $vis enum $name {
            $($(#[$vmeta])* $variant = $value),+
        }

        impl $name {
            /// Number of variants.
            pub const COUNT: usize = [$(Self::$variant),+].len();

            /// Every variant, in declaration order.
            pub const ALL: [Self; Self::COUNT] = [$(Self::$variant),+];
        }

        impl TryFrom<$repr> for $name {
            type Error = ();

            fn try_from(value: $repr) -> ::core::result::Result<Self, ()> {
                match value {
                    $(v if v == $value => Ok(Self::$variant),)+
                    _ => Err(()),
                }
            }
        }
    };
}

/// A `Copy` flag set over an integer, as used for property attributes.
///
/// Flags may carry doc attributes. The type hashes, defaults to empty and
/// lists its set flags in `Debug` output.
///
/// ```
/// use spacey_macros::bitflags;
///
/// bitflags! {
///     /// Property attributes.
///     pub Attrs: u8 {
///         /// Shows up in enumeration.
///         ENUMERATE = 0x01,
///         /// Rejects writes.
///         READONLY = 0x02,
///         /// Cannot be deleted.
///         PERMANENT = 0x04,
///     }
/// }
///
/// let frozen = Attrs::READONLY | Attrs::PERMANENT;
/// assert!(frozen.contains(Attrs::PERMANENT));
/// assert!(!frozen.contains(Attrs::ENUMERATE));
/// assert!(frozen.intersects(Attrs::ENUMERATE | Attrs::READONLY));
/// assert_eq!(format!("{:?}", frozen), "Attrs(READONLY | PERMANENT)");
/// ```
#[macro_export]
macro_rules! bitflags {
    (
        $(#[$meta:meta])*
        $vis:vis $name:ident : $repr:ty {
            $($(#[$fmeta:meta])* $flag:ident = $value:expr),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
        $vis struct $name($repr);

        impl $name {
            $($(#[$fmeta])* pub const $flag: Self = Self($value);)+

            /// The empty set.
            pub const fn empty() -> Self {
                Self(0)
            }

            /// Every declared flag.
            pub const fn all() -> Self {
                Self($($value)|+)
            }

            /// Raw bits.
            pub const fn bits(&self) -> $repr {
                self.0
            }

            /// Build from raw bits, dropping undeclared ones.
            pub const fn from_bits_truncate(bits: $repr) -> Self {
                Self(bits & Self::all().0)
            }

            /// True if every flag in `other` is set.
            pub const fn contains(&self, other: Self) -> bool {
                (self.0 & other.0) == other.0
            }

            /// True if any flag in `other` is set.
            pub const fn intersects(&self, other: Self) -> bool {
                (self.0 & other.0) != 0
            }

            /// True if no flag is set.
            pub const fn is_empty(&self) -> bool {
                self.0 == 0
            }

            /// Set the flags in `other`.
            pub fn insert(&mut self, other: Self) {
                self.0 |= other.0;
            }

            /// Clear the flags in `other`.
            pub fn remove(&mut self, other: Self) {
                self.0 &= !other.0;
            }

            /// Set or clear the flags in `other`.
            pub fn set(&mut self, other: Self, value: bool) {
                if value {
                    self.insert(other);
                } else {
                    self.remove(other);
                }
            }

            /// Copy of `self` with `other` set.
            #[must_use]
            pub const fn with(self, other: Self) -> Self {
                Self(self.0 | other.0)
            }

            /// Copy of `self` with `other` cleared.
            #[must_use]
            pub const fn without(self, other: Self) -> Self {
                Self(self.0 & !other.0)
            }
        }

        impl ::std::ops::BitOr for $name {
            type Output = Self;
            fn bitor(self, rhs: Self) -> Self {
                Self(self.0 | rhs.0)
            }
        }

        impl ::std::ops::BitOrAssign for $name {
            fn bitor_assign(&mut self, rhs: Self) {
                self.0 |= rhs.0;
            }
        }

        impl ::std::ops::BitAnd for $name {
            type Output = Self;
            fn bitand(self, rhs: Self) -> Self {
                Self(self.0 & rhs.0)
            }
        }

        impl ::std::ops::Not for $name {
            type Output = Self;
            fn not(self) -> Self {
                Self(!self.0 & Self::all().0)
            }
        }

        impl ::std::fmt::Debug for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                let mut first = true;
                write!(f, "{}(", stringify!($name))?;
                $(
                    if $value != 0 && self.contains(Self::$flag) {
                        if !first {
                            f.write_str(" | ")?;
                        }
                        f.write_str(stringify!($flag))?;
                        first = false;
                    }
                )+
                if first {
                    f.write_str("empty")?;
                }
                f.write_str(")")
            }
        }
    };
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_int_enum_table() {
        int_enum! {
            #[derive(Debug, Clone, Copy, PartialEq)]
            enum Kind: u8 {
                Plain = 0,
                Block = 4,
                With = 5,
            }
        }

        assert_eq!(Kind::Block as u8, 4);
        assert_eq!(Kind::try_from(5u8), Ok(Kind::With));
        assert!(Kind::try_from(1u8).is_err());
        assert_eq!(Kind::COUNT, 3);
        let slots: Vec<usize> = Kind::ALL.iter().map(|k| *k as usize * 2).collect();
        assert_eq!(slots, vec![0, 8, 10]);
    }

    mod with_result_alias {
        #[allow(dead_code)]
        type Result<T> = std::result::Result<T, String>;

        int_enum! {
            #[derive(Debug, Clone, Copy, PartialEq)]
            pub enum Key: u8 {
                Null = 0,
                Object = 1,
            }
        }
    }

    #[test]
    fn test_int_enum_ignores_caller_result_alias() {
        use with_result_alias::Key;
        assert_eq!(Key::try_from(1u8), Ok(Key::Object));
        assert_eq!(Key::try_from(7u8), Err(()));
    }

    #[test]
    fn test_bitflags_attribute_masks() {
        bitflags! {
            Attrs: u8 {
                ENUMERATE = 0x01,
                READONLY = 0x02,
                PERMANENT = 0x04,
                SHARED = 0x40,
            }
        }

        let mut attrs = Attrs::ENUMERATE | Attrs::SHARED;
        attrs.set(Attrs::PERMANENT, true);
        attrs.remove(Attrs::ENUMERATE);
        assert_eq!(attrs, Attrs::PERMANENT | Attrs::SHARED);
        assert!(attrs.intersects(Attrs::READONLY | Attrs::PERMANENT));
        assert_eq!(!attrs, Attrs::ENUMERATE | Attrs::READONLY);
        assert_eq!(attrs.without(Attrs::SHARED).with(Attrs::READONLY), Attrs::READONLY | Attrs::PERMANENT);
        assert_eq!(Attrs::from_bits_truncate(0xff), Attrs::all());
        assert!(Attrs::default().is_empty());
    }

    #[test]
    fn test_bitflags_debug() {
        bitflags! {
            Flags: u8 {
                HAS_SHORTID = 1,
                DELEGATE = 2,
            }
        }

        assert_eq!(format!("{:?}", Flags::empty()), "Flags(empty)");
        assert_eq!(format!("{:?}", Flags::all()), "Flags(HAS_SHORTID | DELEGATE)");
    }
}
