// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Property operations.
//!
//! Every operation is a method on [`Context`](crate::Context). Scope
//! mutations take the property tree's write lock only for the mutation
//! itself; class hooks always run with no lock held, and anything they
//! may have invalidated is re-checked afterwards.

mod access;
mod call;
mod define;
mod delete;
mod descriptor;
mod enumerate;
mod integrity;
mod lookup;
mod name;

pub use delete::Deletion;
pub use descriptor::PropDesc;
pub use enumerate::EnumerateMode;
pub use lookup::PropertyRef;
