// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Object representation.

use crate::class::{ClassRef, ObjectKind};
use crate::context::Context;
use crate::error::Result;
use crate::scope::ScopeRef;
use crate::scope_chain::FrameId;
use crate::slots::Slots;
use crate::value::Value;
use spacey_macros::bitflags;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Handle to an object in a [`Context`] heap.
///
/// Handles are generational: once the collector frees an object, stale
/// handles to its cell stop resolving.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectRef {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

impl ObjectRef {
    /// Heap cell index.
    pub fn index(&self) -> u32 {
        self.index
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "obj#{}.{}", self.index, self.generation)
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.index)
    }
}

bitflags! {
    /// Per-object state bits.
    pub ObjectFlags: u8 {
        /// Some object uses this one as its prototype.
        DELEGATE = 0x01,
        /// New properties may not be added.
        NOT_EXTENSIBLE = 0x02,
        /// Frozen; also pins lengths kept outside the shape chain.
        FROZEN = 0x04,
    }
}

/// Native function body.
pub type NativeFn = Arc<dyn Fn(&mut Context, &CallArgs<'_>) -> Result<Value> + Send + Sync>;

/// A native function's private data.
pub struct NativeFunction {
    /// Function name.
    pub name: Arc<str>,
    /// Declared argument count, reported as `length`.
    pub nargs: u32,
    /// Body.
    pub call: NativeFn,
    /// True if the function may be used with `new`.
    pub constructor: bool,
    /// Class of objects created by `new`.
    pub instance_class: Option<ClassRef>,
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeFunction")
            .field("name", &self.name)
            .field("nargs", &self.nargs)
            .field("constructor", &self.constructor)
            .finish()
    }
}

/// Arguments of a native call.
#[derive(Debug, Clone)]
pub struct CallArgs<'a> {
    /// The function object being called.
    pub callee: ObjectRef,
    /// The `this` value.
    pub this: Value,
    /// Actual arguments.
    pub args: &'a [Value],
    /// True when called through `new`.
    pub constructing: bool,
}

impl CallArgs<'_> {
    /// Argument `i`, or undefined when absent.
    pub fn arg(&self, i: usize) -> Value {
        self.args.get(i).cloned().unwrap_or_default()
    }

    /// The `this` object, if `this` is one.
    pub fn this_object(&self) -> Option<ObjectRef> {
        self.this.as_object()
    }
}

/// Class-specific private data.
#[derive(Clone, Default)]
pub enum PrivateData {
    /// Nothing.
    #[default]
    None,
    /// The stack frame a live block or with object is tied to.
    Frame(FrameId),
    /// Native function data.
    Function(Arc<NativeFunction>),
    /// Embedder data.
    Opaque(Arc<dyn Any + Send + Sync>),
}

impl PrivateData {
    /// True when empty.
    pub fn is_none(&self) -> bool {
        matches!(self, PrivateData::None)
    }

    /// The frame, for live scope objects.
    pub fn as_frame(&self) -> Option<FrameId> {
        match self {
            PrivateData::Frame(f) => Some(*f),
            _ => None,
        }
    }

    /// The native function, for function objects.
    pub fn as_function(&self) -> Option<&Arc<NativeFunction>> {
        match self {
            PrivateData::Function(nf) => Some(nf),
            _ => None,
        }
    }
}

impl fmt::Debug for PrivateData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrivateData::None => write!(f, "None"),
            PrivateData::Frame(id) => write!(f, "Frame({:?})", id),
            PrivateData::Function(nf) => write!(f, "Function({})", nf.name),
            PrivateData::Opaque(_) => write!(f, "Opaque"),
        }
    }
}

/// An object: class, links, private data, scope and slots.
pub struct JsObject {
    pub(crate) class: ClassRef,
    pub(crate) proto: Option<ObjectRef>,
    pub(crate) parent: Option<ObjectRef>,
    pub(crate) private: PrivateData,
    pub(crate) scope: ScopeRef,
    pub(crate) slots: Slots,
    pub(crate) reserved: u32,
    pub(crate) flags: ObjectFlags,
}

impl JsObject {
    pub(crate) fn new(
        class: ClassRef,
        proto: Option<ObjectRef>,
        parent: Option<ObjectRef>,
        scope: ScopeRef,
    ) -> Self {
        let reserved = class.reserved_slots();
        Self {
            class,
            proto,
            parent,
            private: PrivateData::None,
            scope,
            slots: Slots::with_slots(reserved as usize),
            reserved,
            flags: ObjectFlags::empty(),
        }
    }

    /// Class.
    pub fn class(&self) -> ClassRef {
        self.class
    }

    /// Flavour, from the class.
    pub fn kind(&self) -> ObjectKind {
        self.class.kind()
    }

    /// Prototype.
    pub fn proto(&self) -> Option<ObjectRef> {
        self.proto
    }

    /// Parent (enclosing scope).
    pub fn parent(&self) -> Option<ObjectRef> {
        self.parent
    }

    /// Private data.
    pub fn private(&self) -> &PrivateData {
        &self.private
    }

    /// Scope.
    pub fn scope(&self) -> &ScopeRef {
        &self.scope
    }

    /// Slot storage.
    pub fn slots(&self) -> &Slots {
        &self.slots
    }

    /// Number of reserved slots.
    pub fn reserved_slots(&self) -> u32 {
        self.reserved
    }

    /// State bits.
    pub fn flags(&self) -> ObjectFlags {
        self.flags
    }

    /// True if new properties may be added.
    pub fn is_extensible(&self) -> bool {
        !self.flags.contains(ObjectFlags::NOT_EXTENSIBLE)
    }

    /// True if some object has used this one as its prototype.
    pub fn is_delegate(&self) -> bool {
        self.flags.contains(ObjectFlags::DELEGATE)
    }

    /// Slots the collector must visit. A shared scope's watermark may
    /// underestimate, so every slot is traced then.
    pub fn trace_slot_count(&self) -> usize {
        let n = self.slots.num_slots();
        match &self.scope {
            ScopeRef::Shared(_) => n,
            ScopeRef::Own(scope) => n.min(scope.freeslot() as usize),
        }
    }
}

impl fmt::Debug for JsObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsObject")
            .field("class", &self.class.name())
            .field("proto", &self.proto)
            .field("parent", &self.parent)
            .field("scope", &self.scope.id())
            .field("flags", &self.flags)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class::OBJECT_CLASS;
    use crate::scope::{EmptyScope, ScopeId};

    #[test]
    fn test_trace_slot_count_shared() {
        let es = Arc::new(EmptyScope::new(ScopeId(1), &OBJECT_CLASS));
        let obj = JsObject::new(&OBJECT_CLASS, None, None, ScopeRef::Shared(es));
        assert_eq!(obj.trace_slot_count(), 3);
        assert!(obj.is_extensible());
        assert!(!obj.is_delegate());
    }

    #[test]
    fn test_call_args() {
        let args = [Value::from(1)];
        let call = CallArgs {
            callee: ObjectRef {
                index: 1,
                generation: 0,
            },
            this: Value::Undefined,
            args: &args,
            constructing: false,
        };
        assert_eq!(call.arg(0), Value::from(1));
        assert!(call.arg(1).is_undefined());
        assert!(call.this_object().is_none());
    }
}
