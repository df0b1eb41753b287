// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! # spacey-object
//!
//! The object and property model of the Spacey JavaScript engine.
//!
//! ## Overview
//!
//! - Shapes: an immutable, reference-counted property tree shared by every
//!   context of a [`Runtime`], so objects built the same way share their
//!   layout
//! - Scopes and slots: per-object property tables over inline plus
//!   dynamically grown slot storage
//! - Property operations with ECMAScript attribute semantics, resolve
//!   hooks and prototype-chain inheritance
//! - Classes as hook tables, with `Object`, `Function`, `Array`, `Date`
//!   and `RegExp` initialised lazily on the global object
//! - `with` and lexical block objects on the scope chain
//! - Exact tracing for a mark-and-sweep collector
//!
//! ## Quick Start
//!
//! ```rust
//! use spacey_object::{OBJECT_CLASS, PropertyId, Runtime, RuntimeOptions, Value};
//!
//! let rt = Runtime::new(RuntimeOptions::default());
//! let mut cx = rt.new_context();
//! let a = cx.new_object(&OBJECT_CLASS, None, None)?;
//! let b = cx.new_object(&OBJECT_CLASS, None, None)?;
//! cx.set_property(a, &PropertyId::from("x"), Value::Number(1.0))?;
//! cx.set_property(b, &PropertyId::from("x"), Value::Number(2.0))?;
//! assert_eq!(cx.last_shape(a)?, cx.last_shape(b)?);
//! # Ok::<(), spacey_object::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod builtins;
pub mod cache;
pub mod class;
pub mod config;
pub mod construct;
pub mod context;
pub mod error;
pub mod gc;
pub mod id;
pub mod object;
pub mod ops;
pub mod runtime;
pub mod scope;
pub mod scope_chain;
pub mod shape;
pub mod slots;
pub mod value;

// Re-exports for convenience
pub use class::{ClassFlags, ClassRef, JsClass, OBJECT_CLASS, ObjectKind, ProtoKey, Resolution, ResolveFlags};
pub use config::{ConfigError, RuntimeOptions, SlotGrowth};
pub use construct::{ClassSpec, FunctionSpec};
pub use context::Context;
pub use error::{Error, Result, TypeError};
pub use gc::{GcStats, Tracer};
pub use id::PropertyId;
pub use object::{CallArgs, ObjectRef, PrivateData};
pub use ops::{Deletion, EnumerateMode, PropDesc, PropertyRef};
pub use runtime::Runtime;
pub use scope_chain::{BlockState, FrameId};
pub use shape::{Attrs, PropertyOp, Shape, ShapeFlags, ShapeId, TreeStats};
pub use value::Value;
