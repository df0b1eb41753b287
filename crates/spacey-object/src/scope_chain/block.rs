// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Lexical block objects.
//!
//! A compiler-built prototype block carries one shared permanent property
//! per let variable, its short id being the variable's index. Entering the
//! block clones the prototype onto a frame; while the frame is live the
//! variables read and write frame slots `depth + index`. When the clone
//! is put (the block is left or the frame pops), the values are copied
//! into the clone's reserved slots and the clone detaches.
//!
//! ```text
//! Uninitialized --clone--> ClonedLive --put--> ClonedDetached
//! ```

use super::frame::FrameId;
use crate::class::{ClassFlags, JsClass, ObjectKind};
use crate::context::Context;
use crate::error::{Error, Result};
use crate::id::PropertyId;
use crate::object::{ObjectRef, PrivateData};
use crate::shape::{Attrs, PropertyOp, ShapeFlags, ShapeId};
use crate::value::Value;
use tracing::trace;

/// Reserved slot holding the block's stack depth.
pub(crate) const DEPTH_SLOT: u32 = 0;

/// First reserved slot holding a detached variable.
const FIRST_VAR_SLOT: u32 = 1;

/// Block object class.
pub struct BlockClass;

/// The block class.
pub static BLOCK_CLASS: BlockClass = BlockClass;

impl JsClass for BlockClass {
    fn name(&self) -> &'static str {
        "Block"
    }

    fn flags(&self) -> ClassFlags {
        ClassFlags::HAS_PRIVATE | ClassFlags::IS_ANONYMOUS
    }

    fn kind(&self) -> ObjectKind {
        ObjectKind::Block
    }

    fn reserved_slots(&self) -> u32 {
        1
    }
}

/// Lifecycle state of a block object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockState {
    /// A prototype block: variables declared, no values.
    Uninitialized,
    /// A clone reading through to a live frame.
    ClonedLive,
    /// A clone holding its own copy of the values.
    ClonedDetached,
}

impl Context {
    /// Create a prototype block whose variables start at frame slot
    /// `depth`.
    pub fn new_block_object(&mut self, depth: u32) -> Result<ObjectRef> {
        let block = self.new_object_with_given_proto(&BLOCK_CLASS, None, None)?;
        self.set_reserved_slot(block, DEPTH_SLOT, depth.into())?;
        Ok(block)
    }

    /// Declare variable `index` of prototype block `block` under `id`.
    pub fn define_block_variable(&mut self, block: ObjectRef, id: &PropertyId, index: u16) -> Result<ShapeId> {
        if self.block_state(block)? != BlockState::Uninitialized {
            return Err(Error::internal("variables are declared on prototype blocks"));
        }
        self.define_native_property(
            block,
            id,
            Value::Undefined,
            PropertyOp::Native(block_get),
            PropertyOp::Native(block_set),
            Attrs::ENUMERATE | Attrs::PERMANENT | Attrs::SHARED,
            ShapeFlags::HAS_SHORTID,
            i32::from(index),
        )
    }

    /// Number of variables declared on prototype block `block`.
    pub fn block_variable_count(&self, block: ObjectRef) -> Result<u32> {
        Ok(self.object(block)?.scope().entry_count() as u32)
    }

    /// Clone prototype block `proto` onto frame `frame`, with `parent` as
    /// the enclosing scope.
    pub fn clone_block_object(&mut self, proto: ObjectRef, frame: FrameId, parent: ObjectRef) -> Result<ObjectRef> {
        if self.kind_of(proto)? != ObjectKind::Block {
            return Err(Error::internal("cloning a non-block object"));
        }
        let depth = self.get_reserved_slot(proto, DEPTH_SLOT)?;
        let count = self.block_variable_count(proto)?;
        let clone = self.new_object_with_given_proto(&BLOCK_CLASS, Some(proto), Some(parent))?;
        self.ensure_reserved_slots(clone, FIRST_VAR_SLOT + count)?;
        self.set_reserved_slot(clone, DEPTH_SLOT, depth)?;
        self.set_private(clone, PrivateData::Frame(frame))?;
        Ok(clone)
    }

    /// Detach clone `block` from its frame, copying the frame's values
    /// into the block. Detached or uninitialised blocks are left alone.
    pub fn put_block_object(&mut self, block: ObjectRef, normal_unwind: bool) -> Result<()> {
        let Some(frame_id) = self.get_private(block)?.as_frame() else {
            return Ok(());
        };
        let depth = self.get_reserved_slot(block, DEPTH_SLOT)?.to_uint32() as usize;
        let count = self.object(block)?.reserved_slots() - FIRST_VAR_SLOT;
        for i in 0..count {
            let value = self.frame_slot(frame_id, depth + i as usize)?;
            self.set_reserved_slot(block, FIRST_VAR_SLOT + i, value)?;
        }
        self.set_private(block, PrivateData::None)?;
        let frame = self.frame_mut(frame_id)?;
        frame.blocks.retain(|b| *b != block);
        trace!(block = ?block, count, normal_unwind, "detached block");
        Ok(())
    }

    /// Where `block` is in its lifecycle.
    pub fn block_state(&self, block: ObjectRef) -> Result<BlockState> {
        if self.get_private(block)?.as_frame().is_some() {
            return Ok(BlockState::ClonedLive);
        }
        match self.get_proto(block)? {
            Some(p) if self.kind_of(p)? == ObjectKind::Block => Ok(BlockState::ClonedDetached),
            _ => Ok(BlockState::Uninitialized),
        }
    }
}

fn variable_index(id: &PropertyId) -> Option<u32> {
    match id {
        PropertyId::Int(i) => u32::try_from(*i).ok(),
        PropertyId::Atom(_) => None,
    }
}

fn block_get(cx: &mut Context, obj: ObjectRef, id: &PropertyId, value: &mut Value) -> Result<()> {
    let Some(index) = variable_index(id) else {
        return Ok(());
    };
    *value = match cx.block_state(obj)? {
        BlockState::ClonedLive => {
            let frame = cx.get_private(obj)?.as_frame();
            let depth = cx.get_reserved_slot(obj, DEPTH_SLOT)?.to_uint32();
            match frame {
                Some(f) => cx.frame_slot(f, (depth + index) as usize)?,
                None => Value::Undefined,
            }
        }
        BlockState::ClonedDetached => {
            let slot = FIRST_VAR_SLOT + index;
            if slot < cx.object(obj)?.reserved_slots() {
                cx.get_reserved_slot(obj, slot)?
            } else {
                Value::Undefined
            }
        }
        BlockState::Uninitialized => Value::Undefined,
    };
    Ok(())
}

fn block_set(cx: &mut Context, obj: ObjectRef, id: &PropertyId, value: &mut Value) -> Result<()> {
    let Some(index) = variable_index(id) else {
        return Ok(());
    };
    match cx.block_state(obj)? {
        BlockState::ClonedLive => {
            let depth = cx.get_reserved_slot(obj, DEPTH_SLOT)?.to_uint32();
            if let Some(f) = cx.get_private(obj)?.as_frame() {
                cx.set_frame_slot(f, (depth + index) as usize, value.clone())?;
            }
        }
        BlockState::ClonedDetached => {
            let slot = FIRST_VAR_SLOT + index;
            if slot < cx.object(obj)?.reserved_slots() {
                cx.set_reserved_slot(obj, slot, value.clone())?;
            }
        }
        BlockState::Uninitialized => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RuntimeOptions;
    use crate::runtime::Runtime;

    fn proto_block(cx: &mut Context, depth: u32, names: &[&str]) -> ObjectRef {
        let block = cx.new_block_object(depth).unwrap();
        for (i, name) in names.iter().enumerate() {
            cx.define_block_variable(block, &PropertyId::atom(name), i as u16).unwrap();
        }
        block
    }

    #[test]
    fn test_live_block_reads_frame() {
        let rt = Runtime::new(RuntimeOptions::default());
        let mut cx = rt.new_context();
        let proto = proto_block(&mut cx, 1, &["x", "y"]);
        assert_eq!(cx.block_state(proto).unwrap(), BlockState::Uninitialized);
        let f = cx.push_frame(3, None);
        let block = cx.enter_block(proto).unwrap();
        assert_eq!(cx.block_state(block).unwrap(), BlockState::ClonedLive);
        cx.set_frame_slot(f, 2, 42.into()).unwrap();
        assert_eq!(cx.get_property(block, &"y".into()).unwrap(), Value::Number(42.0));
        cx.set_property(block, &"x".into(), 7.into()).unwrap();
        assert_eq!(cx.frame_slot(f, 1).unwrap(), Value::Number(7.0));
        // variables live on the prototype; the clone has no own shapes
        assert_eq!(cx.block_variable_count(block).unwrap(), 0);
    }

    #[test]
    fn test_values_survive_frame_pop() {
        let rt = Runtime::new(RuntimeOptions::default());
        let mut cx = rt.new_context();
        let proto = proto_block(&mut cx, 0, &["x"]);
        let f = cx.push_frame(1, None);
        let block = cx.enter_block(proto).unwrap();
        cx.set_frame_slot(f, 0, "kept".into()).unwrap();
        cx.pop_frame(false).unwrap();
        assert_eq!(cx.block_state(block).unwrap(), BlockState::ClonedDetached);
        assert_eq!(cx.get_property(block, &"x".into()).unwrap(), Value::string("kept"));
        cx.set_property(block, &"x".into(), "changed".into()).unwrap();
        assert_eq!(cx.get_property(block, &"x".into()).unwrap(), Value::string("changed"));
    }

    #[test]
    fn test_leave_block_restores_scope_chain() {
        let rt = Runtime::new(RuntimeOptions::default());
        let mut cx = rt.new_context();
        let proto = proto_block(&mut cx, 0, &["x"]);
        let f = cx.push_frame(1, None);
        let block = cx.enter_block(proto).unwrap();
        assert_eq!(cx.frame_scope_chain(f).unwrap(), block);
        assert_eq!(cx.get_name(block, &"x".into()).unwrap(), Value::Undefined);
        cx.leave_block().unwrap();
        assert_eq!(cx.frame_scope_chain(f).unwrap(), cx.global());
        assert_eq!(cx.block_state(block).unwrap(), BlockState::ClonedDetached);
        // no block left on the frame
        assert!(cx.leave_block().is_err());
    }

    #[test]
    fn test_block_variables_are_permanent() {
        let rt = Runtime::new(RuntimeOptions::default());
        let mut cx = rt.new_context();
        let proto = proto_block(&mut cx, 0, &["x"]);
        cx.push_frame(1, None);
        let block = cx.enter_block(proto).unwrap();
        assert!(cx.has_own_property(block, &"x".into()).unwrap());
        assert!(!cx.delete_property(block, &"x".into()).unwrap().succeeded());
    }
}
