// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Declarative macros shared by the Spacey crates.
//!
//! # Macros Overview
//!
//! ## Types
//! - [`bitflags!`] - Flag sets such as property attributes and class flags
//! - [`int_enum!`] - Enums convertible to and from their integer repr
//! - [`const_assert!`] - Compile-time layout assertions
//!
//! ## Error Handling
//! - [`bail!`] - Early return with an error
//! - [`ensure!`] - Return an error unless a condition holds
//!
//! ## Testing
//! - [`assert_err!`], [`assert_matches!`], [`assert_some!`]
//!
//! # Examples
//!
//! ```
//! use spacey_macros::*;
//!
//! bitflags! {
//!     /// Access bits.
//!     pub Access: u8 {
//!         /// May read.
//!         READ = 0b01,
//!         /// May write.
//!         WRITE = 0b10,
//!     }
//! }
//!
//! fn check(a: Access) -> Result<(), String> {
//!     ensure!(a.contains(Access::READ), "not readable");
//!     Ok(())
//! }
//!
//! assert!(check(Access::READ | Access::WRITE).is_ok());
//! assert_err!(check(Access::WRITE));
//! ```

#![warn(missing_docs)]

mod error;
mod testing;
mod types;
