// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Scope-chain objects.
//!
//! Stack frames hold local values. `with` objects put a target object on
//! the scope chain; block objects expose a frame's let-bound slots as
//! properties and keep a copy once the frame is gone.

pub mod block;
mod frame;
pub mod with;

pub use block::BlockState;
pub use frame::{FrameId, StackFrame};
