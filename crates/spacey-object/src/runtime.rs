// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! The runtime: state shared by every context.

use crate::config::RuntimeOptions;
use crate::context::Context;
use crate::scope::ScopeId;
use crate::shape::{PropertyTree, TreeStats};
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

/// Shared runtime state.
///
/// The property tree is runtime-wide so that objects built the same way in
/// different contexts converge on the same shapes. Everything else that
/// mutates lives in the per-thread [`Context`].
pub struct Runtime {
    options: RuntimeOptions,
    tree: RwLock<PropertyTree>,
    property_removals: AtomicU64,
    next_scope_id: AtomicU64,
    contexts: AtomicU64,
}

impl Runtime {
    /// Creates a runtime.
    pub fn new(options: RuntimeOptions) -> Arc<Self> {
        debug!(
            hash_threshold = options.scope_hash_threshold,
            strict = options.strict,
            "creating runtime"
        );
        Arc::new(Self {
            tree: RwLock::new(PropertyTree::new(options.scope_hash_threshold)),
            options,
            property_removals: AtomicU64::new(0),
            next_scope_id: AtomicU64::new(1),
            contexts: AtomicU64::new(0),
        })
    }

    /// Creates a context bound to this runtime.
    pub fn new_context(self: &Arc<Self>) -> Context {
        self.contexts.fetch_add(1, Ordering::Relaxed);
        Context::new(self.clone())
    }

    /// Options.
    pub fn options(&self) -> &RuntimeOptions {
        &self.options
    }

    /// Read access to the property tree.
    pub fn tree(&self) -> RwLockReadGuard<'_, PropertyTree> {
        self.tree.read()
    }

    pub(crate) fn tree_mut(&self) -> RwLockWriteGuard<'_, PropertyTree> {
        self.tree.write()
    }

    /// Property tree counters.
    pub fn shape_stats(&self) -> TreeStats {
        self.tree.read().stats()
    }

    /// Number of property deletions so far. Operations that run hooks
    /// sample this before the hook and compare after.
    pub fn property_removals(&self) -> u64 {
        self.property_removals.load(Ordering::Acquire)
    }

    pub(crate) fn note_property_removal(&self) {
        self.property_removals.fetch_add(1, Ordering::AcqRel);
    }

    pub(crate) fn next_scope_id(&self) -> ScopeId {
        ScopeId(self.next_scope_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Contexts created so far.
    pub fn context_count(&self) -> u64 {
        self.contexts.load(Ordering::Relaxed)
    }
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("options", &self.options)
            .field("shapes", &self.shape_stats())
            .finish()
    }
}
