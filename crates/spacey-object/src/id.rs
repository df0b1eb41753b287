// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Property identifiers.
//!
//! A [`PropertyId`] is either an atom (a string key) or a small integer.
//! Strings that spell a canonical array index are always stored as
//! integers so `o["3"]` and `o[3]` name the same property.

use crate::value::Value;
use std::fmt;
use std::sync::Arc;

/// Largest integer stored inline as an id. Larger indices become atoms.
pub const MAX_INT_ID: i32 = 0x3fff_ffff;

/// A property key.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PropertyId {
    /// An integer key in `0..=MAX_INT_ID`.
    Int(i32),
    /// A string key.
    Atom(Arc<str>),
}

impl PropertyId {
    /// Build an id from a string, normalizing canonical indices.
    pub fn atom(s: &str) -> Self {
        match parse_index(s) {
            Some(i) if i <= MAX_INT_ID as u32 => PropertyId::Int(i as i32),
            _ => PropertyId::Atom(Arc::from(s)),
        }
    }

    /// Build an id from an integer, falling back to an atom outside the
    /// inline range.
    pub fn index(i: u32) -> Self {
        if i <= MAX_INT_ID as u32 {
            PropertyId::Int(i as i32)
        } else {
            PropertyId::Atom(Arc::from(i.to_string()))
        }
    }

    /// Convert a value to an id the way a computed member access would.
    pub fn from_value(v: &Value) -> Self {
        match v {
            Value::Number(n) if n.fract() == 0.0 && *n >= 0.0 && *n <= u32::MAX as f64 => {
                PropertyId::index(*n as u32)
            }
            Value::String(s) => PropertyId::atom(s),
            other => PropertyId::atom(&other.to_string()),
        }
    }

    /// The array index this id names, if any.
    pub fn as_index(&self) -> Option<u32> {
        match self {
            PropertyId::Int(i) if *i >= 0 => Some(*i as u32),
            PropertyId::Int(_) => None,
            PropertyId::Atom(s) => parse_index(s).filter(|&i| i != u32::MAX),
        }
    }

    /// The string form of an atom id.
    pub fn as_atom(&self) -> Option<&str> {
        match self {
            PropertyId::Atom(s) => Some(s),
            PropertyId::Int(_) => None,
        }
    }

    /// True if this id is the atom `name`.
    pub fn is_atom(&self, name: &str) -> bool {
        self.as_atom() == Some(name)
    }

    /// The id as a script value.
    pub fn to_value(&self) -> Value {
        match self {
            PropertyId::Int(i) => Value::Number(*i as f64),
            PropertyId::Atom(s) => Value::String(s.clone()),
        }
    }
}

/// Parse a canonical unsigned decimal: no sign, no leading zeros.
fn parse_index(s: &str) -> Option<u32> {
    let bytes = s.as_bytes();
    if bytes.is_empty() || bytes.len() > 10 || (bytes.len() > 1 && bytes[0] == b'0') {
        return None;
    }
    if !bytes.iter().all(u8::is_ascii_digit) {
        return None;
    }
    s.parse::<u32>().ok()
}

impl From<&str> for PropertyId {
    fn from(s: &str) -> Self {
        PropertyId::atom(s)
    }
}

impl From<String> for PropertyId {
    fn from(s: String) -> Self {
        PropertyId::atom(&s)
    }
}

impl From<u32> for PropertyId {
    fn from(i: u32) -> Self {
        PropertyId::index(i)
    }
}

impl From<i32> for PropertyId {
    fn from(i: i32) -> Self {
        if i >= 0 {
            PropertyId::index(i as u32)
        } else {
            PropertyId::Atom(Arc::from(i.to_string()))
        }
    }
}

impl fmt::Display for PropertyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyId::Int(i) => write!(f, "{}", i),
            PropertyId::Atom(s) => f.write_str(s),
        }
    }
}

impl fmt::Debug for PropertyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyId::Int(i) => write!(f, "#{}", i),
            PropertyId::Atom(s) => write!(f, "{:?}", s),
        }
    }
}

/// Well-known atoms used by the object model.
pub mod atoms {
    /// `length`
    pub const LENGTH: &str = "length";
    /// `prototype`
    pub const PROTOTYPE: &str = "prototype";
    /// `constructor`
    pub const CONSTRUCTOR: &str = "constructor";
    /// `value`
    pub const VALUE: &str = "value";
    /// `writable`
    pub const WRITABLE: &str = "writable";
    /// `enumerable`
    pub const ENUMERABLE: &str = "enumerable";
    /// `configurable`
    pub const CONFIGURABLE: &str = "configurable";
    /// `get`
    pub const GET: &str = "get";
    /// `set`
    pub const SET: &str = "set";
    /// `name`
    pub const NAME: &str = "name";
    /// `lastIndex`
    pub const LAST_INDEX: &str = "lastIndex";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_strings_normalize() {
        assert_eq!(PropertyId::from("3"), PropertyId::Int(3));
        assert_eq!(PropertyId::from("0"), PropertyId::Int(0));
        assert!(matches!(PropertyId::from("03"), PropertyId::Atom(_)));
        assert!(matches!(PropertyId::from("-1"), PropertyId::Atom(_)));
        assert!(matches!(PropertyId::from("x"), PropertyId::Atom(_)));
    }

    #[test]
    fn test_large_index_is_atom() {
        let id = PropertyId::index(0x4000_0000);
        assert!(matches!(id, PropertyId::Atom(_)));
        assert_eq!(id.as_index(), Some(0x4000_0000));
        assert_eq!(PropertyId::from("4294967295").as_index(), None);
    }

    #[test]
    fn test_from_value() {
        assert_eq!(PropertyId::from_value(&Value::Number(7.0)), PropertyId::Int(7));
        assert_eq!(
            PropertyId::from_value(&Value::Number(1.5)),
            PropertyId::from("1.5")
        );
        assert_eq!(PropertyId::from_value(&Value::Boolean(true)), PropertyId::from("true"));
    }
}
